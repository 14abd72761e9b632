//! # XR Runtime Core
//!
//! Object/handle management and swapchain lifecycle for an XR runtime.
//!
//! ## Features
//!
//! - **Handle Registry**: Opaque 64-bit handles resolved in O(1), with
//!   teardown that makes handles unresolvable before destruction starts
//! - **Backend Adapters**: Vulkan, D3D12 and OpenGL image sets behind one
//!   capability trait
//! - **Swapchain Lifecycle**: Validation and the acquire/wait/release ring
//!   protocol, identical for every graphics API
//! - **Headless Compositor**: In-memory native image source for tests and tools
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use xr_runtime::prelude::*;
//! use xr_runtime::compositor::headless::VK_FORMAT_R8G8B8A8_SRGB;
//!
//! fn main() -> Result<(), XrError> {
//!     let compositor = Arc::new(HeadlessCompositor::new());
//!     let binding = GraphicsBinding::new(GraphicsApi::Vulkan, compositor);
//!     let swapchains = SwapchainManager::default();
//!
//!     let info = SwapchainCreateInfo::new(VK_FORMAT_R8G8B8A8_SRGB, 1440, 1600);
//!     let handle = swapchains.create(&info, &binding)?;
//!
//!     let index = swapchains.acquire(handle)?;
//!     swapchains.wait(handle, Duration::from_millis(100))?;
//!     // ... render into image `index` ...
//!     swapchains.release(handle)?;
//!
//!     swapchains.destroy(handle)
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names)]

pub mod backend;
pub mod compositor;
pub mod config;
pub mod error;
pub mod foundation;
pub mod registry;
pub mod swapchain;

pub use error::{XrError, XrResult};

/// Common imports for runtime users
pub mod prelude {
    pub use crate::{
        XrError, XrResult,
        backend::{BackendAdapter, GraphicsApi, GraphicsBinding, SwapchainImage},
        compositor::{HeadlessCompositor, NativeCompositor, NativeSwapchain, WaitStatus},
        config::{Config, RuntimeConfig, SwapchainLimits},
        registry::{Handle, HandleRegistry},
        swapchain::{
            SwapchainCreateFlags, SwapchainCreateInfo, SwapchainManager, SwapchainState,
            SwapchainUsageFlags,
        },
    };
}
