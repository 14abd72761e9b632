//! OpenGL backend adapter
//!
//! Native handles are GL texture names and must fit a `GLuint`.

use super::{allocated, BackendAdapter, BackendError, BackendResult, GraphicsApi, NativeImageSet, SwapchainImage};
use crate::compositor::{NativeCompositor, WaitStatus};
use crate::swapchain::SwapchainCreateInfo;
use std::sync::Arc;
use std::time::Duration;

/// Adapter for sessions created with an OpenGL graphics binding
pub struct OpenGlAdapter {
    compositor: Arc<dyn NativeCompositor>,
    textures: Option<NativeImageSet<u32>>,
}

impl OpenGlAdapter {
    /// Create an adapter that allocates through `compositor`
    pub fn new(compositor: Arc<dyn NativeCompositor>) -> Self {
        Self {
            compositor,
            textures: None,
        }
    }
}

fn texture_name(handle: u64) -> BackendResult<u32> {
    match u32::try_from(handle) {
        Ok(name) if name != 0 => Ok(name),
        _ => Err(BackendError::InvalidNativeHandle {
            handle,
            api: GraphicsApi::OpenGl,
        }),
    }
}

impl BackendAdapter for OpenGlAdapter {
    fn api(&self) -> GraphicsApi {
        GraphicsApi::OpenGl
    }

    fn allocate_images(&mut self, info: &SwapchainCreateInfo) -> BackendResult<u32> {
        let set = NativeImageSet::allocate(
            self.compositor.as_ref(),
            info,
            GraphicsApi::OpenGl,
            texture_name,
        )?;
        let count = set.len();
        self.textures = Some(set);
        Ok(count)
    }

    fn image_count(&self) -> u32 {
        self.textures.as_ref().map_or(0, NativeImageSet::len)
    }

    fn enumerate_images(&self, out: &mut [SwapchainImage]) -> BackendResult<()> {
        allocated(&self.textures)?.enumerate(out, |image| SwapchainImage::OpenGl { image })
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::headless::{HeadlessCompositor, GL_SRGB8_ALPHA8, VK_FORMAT_R8G8B8A8_SRGB};
    use crate::compositor::CompositorError;

    #[test]
    fn test_texture_names_must_fit_gluint() {
        assert_eq!(texture_name(7), Ok(7));
        assert!(texture_name(0).is_err());
        assert!(texture_name(u64::from(u32::MAX) + 1).is_err());
    }

    #[test]
    fn test_allocates_gl_textures() {
        let mut adapter = OpenGlAdapter::new(Arc::new(HeadlessCompositor::new()));
        let info = SwapchainCreateInfo::new(GL_SRGB8_ALPHA8, 256, 256).with_image_count(2);
        assert_eq!(adapter.allocate_images(&info), Ok(2));

        let mut out = [SwapchainImage::Unset; 2];
        adapter.enumerate_images(&mut out).unwrap();
        assert!(out.iter().all(|image| matches!(image, SwapchainImage::OpenGl { .. })));
    }

    #[test]
    fn test_foreign_format_is_reported_not_substituted() {
        let mut adapter = OpenGlAdapter::new(Arc::new(HeadlessCompositor::new()));
        let info = SwapchainCreateInfo::new(VK_FORMAT_R8G8B8A8_SRGB, 256, 256);
        assert_eq!(
            adapter.allocate_images(&info),
            Err(BackendError::Compositor(CompositorError::UnsupportedFormat(
                VK_FORMAT_R8G8B8A8_SRGB
            )))
        );
        assert_eq!(adapter.image_count(), 0);
    }
}
