//! # Backend Adapter Abstraction
//!
//! This module provides the abstraction layer between the generic swapchain
//! lifecycle controller and the native graphics APIs. It defines the
//! `BackendAdapter` trait that each graphics backend (Vulkan, D3D12, OpenGL)
//! implements.
//!
//! ## Design Goals
//!
//! - **API Agnostic**: One state machine, one validation path and one error
//!   model regardless of the graphics API behind a swapchain
//! - **Bound Once**: The adapter is selected from the session's graphics
//!   binding when the swapchain is created and never swapped afterwards
//! - **Opaque Images**: The controller never inspects native image
//!   representations; it only forwards enumeration into caller buffers
//!
//! ## Architecture
//!
//! Every adapter wraps a [`NativeImageSet`] obtained from the session's
//! [`NativeCompositor`] and translates raw native handles into its own
//! [`SwapchainImage`] variant.

pub mod d3d12;
pub mod opengl;
pub mod vulkan;

pub use d3d12::D3D12Adapter;
pub use opengl::OpenGlAdapter;
pub use vulkan::VulkanAdapter;

use crate::compositor::{CompositorError, NativeCompositor, NativeSwapchain, WaitStatus};
use crate::swapchain::{SwapchainCreateInfo, SwapchainUsageFlags};
use ash::vk;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Native graphics API a session was created against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GraphicsApi {
    /// Vulkan
    Vulkan,
    /// Direct3D 12
    D3D12,
    /// OpenGL
    OpenGl,
}

impl fmt::Display for GraphicsApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GraphicsApi::Vulkan => "Vulkan",
            GraphicsApi::D3D12 => "D3D12",
            GraphicsApi::OpenGl => "OpenGL",
        };
        f.write_str(name)
    }
}

/// The graphics binding of the session that owns a swapchain
#[derive(Clone)]
pub struct GraphicsBinding {
    /// Graphics API of the session
    pub api: GraphicsApi,
    /// Compositor that allocates native images for the session
    pub compositor: Arc<dyn NativeCompositor>,
}

impl GraphicsBinding {
    /// Bind `compositor` for `api`
    pub fn new(api: GraphicsApi, compositor: Arc<dyn NativeCompositor>) -> Self {
        Self { api, compositor }
    }
}

impl fmt::Debug for GraphicsBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphicsBinding")
            .field("api", &self.api)
            .finish_non_exhaustive()
    }
}

/// Backend-specific swapchain image descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwapchainImage {
    /// Not written by any backend yet
    #[default]
    Unset,
    /// A `VkImage`
    Vulkan {
        /// Image handle
        image: vk::Image,
    },
    /// An `ID3D12Resource*`, as a pointer value
    D3D12 {
        /// Resource pointer
        texture: u64,
    },
    /// A GL texture name
    OpenGl {
        /// Texture name
        image: u32,
    },
}

/// Backend failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The compositor refused or failed the request
    #[error("Compositor error: {0}")]
    Compositor(#[from] CompositorError),

    /// The format cannot be expressed in this graphics API
    #[error("Format {format} is not representable in {api}")]
    UnsupportedFormat {
        /// Requested format
        format: i64,
        /// Backend that rejected it
        api: GraphicsApi,
    },

    /// A native handle does not fit this API's image type
    #[error("Native image handle {handle:#x} is not valid for {api}")]
    InvalidNativeHandle {
        /// Offending handle
        handle: u64,
        /// Backend that rejected it
        api: GraphicsApi,
    },

    /// The compositor returned a different number of images than requested
    #[error("Compositor returned {actual} images, expected {expected}")]
    ImageCountMismatch {
        /// Requested image count
        expected: u32,
        /// Images actually returned
        actual: usize,
    },

    /// Mutually exclusive usage flags reached the backend
    #[error("Inconsistent usage flags reached the backend: {0:?}")]
    InconsistentUsage(SwapchainUsageFlags),

    /// Image operation before allocation or after release
    #[error("Swapchain images are not allocated")]
    NotAllocated,

    /// Caller buffer larger than the image ring
    #[error("Enumeration buffer holds {requested} entries but only {available} images exist")]
    BufferOutOfRange {
        /// Entries requested
        requested: usize,
        /// Images available
        available: usize,
    },
}

/// # Backend Adapter Trait
///
/// Capability set each graphics backend implements. One adapter instance is
/// bound per swapchain at creation time.
///
/// ## Implementation Notes
///
/// Adapters should:
/// - Treat the descriptor's usage flags as authoritative and report
///   [`BackendError::InconsistentUsage`] rather than reinterpret them
/// - Report allocation failures instead of substituting another format
/// - Write images in ring order, starting at index 0
pub trait BackendAdapter: Send + Sync {
    /// Graphics API this adapter serves
    fn api(&self) -> GraphicsApi;

    /// Create or import `info.image_count` native images
    ///
    /// # Returns
    /// The number of images in the ring
    fn allocate_images(&mut self, info: &SwapchainCreateInfo) -> BackendResult<u32>;

    /// Number of allocated images, 0 before allocation
    fn image_count(&self) -> u32;

    /// Write one backend-specific descriptor per entry of `out`
    ///
    /// # Arguments
    /// * `out` - Caller buffer; entry `i` receives ring image `i`
    fn enumerate_images(&self, out: &mut [SwapchainImage]) -> BackendResult<()>;

    /// Block until image `index` is safe to write, up to `timeout`
    fn wait_image(&self, index: u32, timeout: Duration) -> BackendResult<WaitStatus>;

    /// Return image `index` to the compositor
    fn release_image(&self, index: u32) -> BackendResult<()>;

    /// Free the native images; later image calls report [`BackendError::NotAllocated`]
    fn release_images(&mut self);
}

/// Select the adapter for a session's graphics binding
pub fn create_adapter(binding: &GraphicsBinding) -> Box<dyn BackendAdapter> {
    let compositor = Arc::clone(&binding.compositor);
    match binding.api {
        GraphicsApi::Vulkan => Box::new(VulkanAdapter::new(compositor)),
        GraphicsApi::D3D12 => Box::new(D3D12Adapter::new(compositor)),
        GraphicsApi::OpenGl => Box::new(OpenGlAdapter::new(compositor)),
    }
}

/// Native image set plus its API-specific translation
///
/// Shared plumbing for the adapters: allocation through the compositor,
/// bounds-checked enumeration and forwarding of wait/release.
pub(crate) struct NativeImageSet<I> {
    native: Box<dyn NativeSwapchain>,
    images: Vec<I>,
}

impl<I: Copy> NativeImageSet<I> {
    /// Allocate through `compositor` and translate every native handle
    pub(crate) fn allocate<F>(
        compositor: &dyn NativeCompositor,
        info: &SwapchainCreateInfo,
        api: GraphicsApi,
        translate: F,
    ) -> BackendResult<Self>
    where
        F: Fn(u64) -> BackendResult<I>,
    {
        if let Some(conflict) = info.usage_flags.exclusive_conflict() {
            return Err(BackendError::InconsistentUsage(conflict));
        }

        let native = compositor.create_swapchain(info, api)?;
        let handles = native.image_handles();
        if handles.len() != info.image_count as usize {
            return Err(BackendError::ImageCountMismatch {
                expected: info.image_count,
                actual: handles.len(),
            });
        }

        let images = handles
            .iter()
            .map(|&handle| translate(handle))
            .collect::<BackendResult<Vec<_>>>()?;

        Ok(Self { native, images })
    }

    pub(crate) fn len(&self) -> u32 {
        // Bounded by SwapchainLimits::max_image_count
        self.images.len() as u32
    }

    /// Write `wrap(image i)` into `out[i]`
    pub(crate) fn enumerate<F>(&self, out: &mut [SwapchainImage], wrap: F) -> BackendResult<()>
    where
        F: Fn(I) -> SwapchainImage,
    {
        if out.len() > self.images.len() {
            return Err(BackendError::BufferOutOfRange {
                requested: out.len(),
                available: self.images.len(),
            });
        }
        for (slot, &image) in out.iter_mut().zip(&self.images) {
            *slot = wrap(image);
        }
        Ok(())
    }

    pub(crate) fn wait(&self, index: u32, timeout: Duration) -> BackendResult<WaitStatus> {
        Ok(self.native.wait_image(index, timeout)?)
    }

    pub(crate) fn release(&self, index: u32) -> BackendResult<()> {
        Ok(self.native.release_image(index)?)
    }
}

/// Forward an image call to an allocated set, or fail with `NotAllocated`
pub(crate) fn allocated<I>(set: &Option<NativeImageSet<I>>) -> BackendResult<&NativeImageSet<I>> {
    set.as_ref().ok_or(BackendError::NotAllocated)
}
