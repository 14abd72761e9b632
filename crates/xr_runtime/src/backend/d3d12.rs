//! D3D12 backend adapter
//!
//! Native handles are `ID3D12Resource*` values, carried through unchanged.

use super::{allocated, BackendAdapter, BackendError, BackendResult, GraphicsApi, NativeImageSet, SwapchainImage};
use crate::compositor::{NativeCompositor, WaitStatus};
use crate::swapchain::SwapchainCreateInfo;
use std::sync::Arc;
use std::time::Duration;

/// Adapter for sessions created with a D3D12 graphics binding
pub struct D3D12Adapter {
    compositor: Arc<dyn NativeCompositor>,
    textures: Option<NativeImageSet<u64>>,
}

impl D3D12Adapter {
    /// Create an adapter that allocates through `compositor`
    pub fn new(compositor: Arc<dyn NativeCompositor>) -> Self {
        Self {
            compositor,
            textures: None,
        }
    }
}

impl BackendAdapter for D3D12Adapter {
    fn api(&self) -> GraphicsApi {
        GraphicsApi::D3D12
    }

    fn allocate_images(&mut self, info: &SwapchainCreateInfo) -> BackendResult<u32> {
        // DXGI_FORMAT is a 32-bit enum
        if u32::try_from(info.format).is_err() {
            return Err(BackendError::UnsupportedFormat {
                format: info.format,
                api: GraphicsApi::D3D12,
            });
        }

        let set = NativeImageSet::allocate(
            self.compositor.as_ref(),
            info,
            GraphicsApi::D3D12,
            |texture| match texture {
                0 => Err(BackendError::InvalidNativeHandle {
                    handle: texture,
                    api: GraphicsApi::D3D12,
                }),
                texture => Ok(texture),
            },
        )?;
        let count = set.len();
        self.textures = Some(set);
        Ok(count)
    }

    fn image_count(&self) -> u32 {
        self.textures.as_ref().map_or(0, NativeImageSet::len)
    }

    fn enumerate_images(&self, out: &mut [SwapchainImage]) -> BackendResult<()> {
        allocated(&self.textures)?.enumerate(out, |texture| SwapchainImage::D3D12 { texture })
    }

    fn wait_image(&self, index: u32, timeout: Duration) -> BackendResult<WaitStatus> {
        allocated(&self.textures)?.wait(index, timeout)
    }

    fn release_image(&self, index: u32) -> BackendResult<()> {
        allocated(&self.textures)?.release(index)
    }

    fn release_images(&mut self) {
        self.textures = None;
    }
}
