//! Vulkan backend adapter
//!
//! Native handles from the compositor are `VkImage`s. Formats are `VkFormat`
//! values and must fit in an `i32`.

use super::{allocated, BackendAdapter, BackendError, BackendResult, GraphicsApi, NativeImageSet, SwapchainImage};
use crate::compositor::{NativeCompositor, WaitStatus};
use crate::swapchain::{SwapchainCreateInfo, SwapchainUsageFlags};
use ash::vk::{self, Handle};
use std::sync::Arc;
use std::time::Duration;

/// Adapter for sessions created with a Vulkan graphics binding
pub struct VulkanAdapter {
    compositor: Arc<dyn NativeCompositor>,
    images: Option<NativeImageSet<vk::Image>>,
}

impl VulkanAdapter {
    /// Create an adapter that allocates through `compositor`
    pub fn new(compositor: Arc<dyn NativeCompositor>) -> Self {
        Self {
            compositor,
            images: None,
        }
    }
}

/// Image usage the native images must be created with
pub fn image_usage(usage: SwapchainUsageFlags) -> vk::ImageUsageFlags {
    let mut flags = vk::ImageUsageFlags::empty();
    if usage.contains(SwapchainUsageFlags::COLOR_ATTACHMENT) {
        flags |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
    }
    if usage.contains(SwapchainUsageFlags::DEPTH_STENCIL_ATTACHMENT) {
        flags |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
    }
    if usage.contains(SwapchainUsageFlags::UNORDERED_ACCESS) {
        flags |= vk::ImageUsageFlags::STORAGE;
    }
    if usage.contains(SwapchainUsageFlags::TRANSFER_SRC) {
        flags |= vk::ImageUsageFlags::TRANSFER_SRC;
    }
    if usage.contains(SwapchainUsageFlags::TRANSFER_DST) {
        flags |= vk::ImageUsageFlags::TRANSFER_DST;
    }
    if usage.contains(SwapchainUsageFlags::SAMPLED) {
        flags |= vk::ImageUsageFlags::SAMPLED;
    }
    if usage.contains(SwapchainUsageFlags::INPUT_ATTACHMENT) {
        flags |= vk::ImageUsageFlags::INPUT_ATTACHMENT;
    }
    flags
}

impl BackendAdapter for VulkanAdapter {
    fn api(&self) -> GraphicsApi {
        GraphicsApi::Vulkan
    }

    fn allocate_images(&mut self, info: &SwapchainCreateInfo) -> BackendResult<u32> {
        let format = i32::try_from(info.format)
            .map(vk::Format::from_raw)
            .map_err(|_| BackendError::UnsupportedFormat {
                format: info.format,
                api: GraphicsApi::Vulkan,
            })?;
        log::trace!(
            "Allocating {} Vulkan images {:?} usage {:?}",
            info.image_count,
            format,
            image_usage(info.usage_flags)
        );

        let set = NativeImageSet::allocate(
            self.compositor.as_ref(),
            info,
            GraphicsApi::Vulkan,
            |handle| match handle {
                0 => Err(BackendError::InvalidNativeHandle {
                    handle,
                    api: GraphicsApi::Vulkan,
                }),
                raw => Ok(vk::Image::from_raw(raw)),
            },
        )?;
        let count = set.len();
        self.images = Some(set);
        Ok(count)
    }

    fn image_count(&self) -> u32 {
        self.images.as_ref().map_or(0, NativeImageSet::len)
    }

    fn enumerate_images(&self, out: &mut [SwapchainImage]) -> BackendResult<()> {
        allocated(&self.images)?.enumerate(out, |image| SwapchainImage::Vulkan { image })
    }

    fn wait_image(&self, index: u32, timeout: Duration) -> BackendResult<WaitStatus> {
        allocated(&self.images)?.wait(index, timeout)
    }

    fn release_image(&self, index: u32) -> BackendResult<()> {
        allocated(&self.images)?.release(index)
    }

    fn release_images(&mut self) {
        self.images = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::headless::{HeadlessCompositor, VK_FORMAT_B8G8R8A8_SRGB};

    #[test]
    fn test_enumerates_vk_images_in_ring_order() {
        let compositor = Arc::new(HeadlessCompositor::new());
        let mut adapter = VulkanAdapter::new(compositor.clone());
        let info = SwapchainCreateInfo::new(VK_FORMAT_B8G8R8A8_SRGB, 128, 128).with_image_count(3);

        assert_eq!(adapter.allocate_images(&info), Ok(3));

        let mut out = [SwapchainImage::Unset; 3];
        adapter.enumerate_images(&mut out).unwrap();
        let raws: Vec<u64> = out
            .iter()
            .map(|image| match image {
                SwapchainImage::Vulkan { image } => image.as_raw(),
                other => panic!("unexpected image {:?}", other),
            })
            .collect();
        assert_eq!(raws.len(), 3);
        assert!(raws.windows(2).all(|pair| pair[0] < pair[1]));

        adapter.release_images();
        assert_eq!(adapter.image_count(), 0);
        assert_eq!(compositor.live_swapchains(), 0);
    }

    #[test]
    fn test_format_outside_vk_range_is_rejected() {
        let compositor = Arc::new(HeadlessCompositor::new());
        let mut adapter = VulkanAdapter::new(compositor.clone());
        let info = SwapchainCreateInfo::new(i64::from(i32::MAX) + 1, 16, 16);

        assert!(matches!(
            adapter.allocate_images(&info),
            Err(BackendError::UnsupportedFormat { api: GraphicsApi::Vulkan, .. })
        ));
        assert_eq!(compositor.swapchains_created(), 0);
    }

    #[test]
    fn test_usage_translation() {
        let usage = SwapchainUsageFlags::COLOR_ATTACHMENT | SwapchainUsageFlags::SAMPLED;
        assert_eq!(
            image_usage(usage),
            vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED
        );
        assert_eq!(
            image_usage(SwapchainUsageFlags::UNORDERED_ACCESS),
            vk::ImageUsageFlags::STORAGE
        );
    }
}
