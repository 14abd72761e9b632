//! # Native Compositor Interface
//!
//! The compositor client owns the actual native images behind a swapchain.
//! Backend adapters ask it for a native image set and translate the raw
//! handles it returns into API-specific image descriptors; the lifecycle
//! controller never looks at those handles itself.
//!
//! Native handles are plain `u64` values: a `VkImage`, an `ID3D12Resource*`
//! pointer value or a GL texture name, depending on the graphics API the
//! set was created for.

pub mod headless;

pub use headless::{HeadlessCompositor, HeadlessConfig};

use crate::backend::GraphicsApi;
use crate::swapchain::SwapchainCreateInfo;
use std::time::Duration;
use thiserror::Error;

/// Outcome of waiting on a native image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    /// The image is safe for the application to write
    Ready,
    /// The timeout expired first
    TimedOut,
}

/// Compositor-side failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompositorError {
    /// The format is not supported for this graphics API
    #[error("Unsupported swapchain format: {0}")]
    UnsupportedFormat(i64),

    /// Native image memory could not be allocated
    #[error("Out of image memory: requested {requested} images, limit {limit}")]
    OutOfMemory {
        /// Images requested
        requested: u32,
        /// Images the compositor can provide
        limit: u32,
    },

    /// Index outside the native image set
    #[error("Invalid image index: {0}")]
    InvalidImageIndex(u32),

    /// The compositor is gone or in an unusable state
    #[error("Compositor lost: {0}")]
    Lost(String),
}

/// A native image set allocated by the compositor
///
/// Dropping the set frees its native images.
pub trait NativeSwapchain: Send + Sync {
    /// Raw native handles, in ring order
    fn image_handles(&self) -> &[u64];

    /// Block until image `index` is writable or `timeout` expires
    fn wait_image(&self, index: u32, timeout: Duration) -> Result<WaitStatus, CompositorError>;

    /// Hand image `index` back to the compositor
    fn release_image(&self, index: u32) -> Result<(), CompositorError>;
}

/// Allocator of native image sets for one session
pub trait NativeCompositor: Send + Sync {
    /// Allocate `info.image_count` native images for `api`
    fn create_swapchain(
        &self,
        info: &SwapchainCreateInfo,
        api: GraphicsApi,
    ) -> Result<Box<dyn NativeSwapchain>, CompositorError>;

    /// Formats accepted by [`create_swapchain`](Self::create_swapchain), most preferred first
    fn supported_formats(&self, api: GraphicsApi) -> Vec<i64>;
}
