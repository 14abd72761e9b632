//! Foundation module - Core utilities and types
//!
//! This module provides small utilities used throughout the runtime:
//! - Logging setup
//! - Timeout conversion for blocking waits

pub mod logging;
pub mod time;
