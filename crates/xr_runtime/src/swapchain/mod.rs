//! # Swapchain Lifecycle
//!
//! Backend-independent swapchain state: descriptor validation, the
//! acquire/wait/release ring protocol and handle-based lifetime management.
//!
//! - [`SwapchainCreateInfo`]: creation parameters and their validation
//! - [`Swapchain`]: one image ring bound to a backend adapter
//! - [`SwapchainManager`]: handle-indexed creation, dispatch and teardown

mod descriptor;
mod manager;
mod object;
mod state;


pub use descriptor::{SwapchainCreateFlags, SwapchainCreateInfo, SwapchainUsageFlags};
pub use manager::{SwapchainKey, SwapchainManager};
pub use object::Swapchain;
pub use state::SwapchainState;
