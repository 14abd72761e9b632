//! Swapchain creation parameters and their validation

use crate::config::SwapchainLimits;
use crate::error::{XrError, XrResult};
use bitflags::bitflags;

bitflags! {
    /// How the application intends to use the swapchain images
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SwapchainUsageFlags: u64 {
        /// Render target for color output
        const COLOR_ATTACHMENT = 1 << 0;
        /// Depth/stencil target
        const DEPTH_STENCIL_ATTACHMENT = 1 << 1;
        /// Storage image / UAV access
        const UNORDERED_ACCESS = 1 << 2;
        /// Copy source
        const TRANSFER_SRC = 1 << 3;
        /// Copy destination
        const TRANSFER_DST = 1 << 4;
        /// Sampled in shaders
        const SAMPLED = 1 << 5;
        /// Views may use a different format
        const MUTABLE_FORMAT = 1 << 6;
        /// Input attachment
        const INPUT_ATTACHMENT = 1 << 7;
    }
}

bitflags! {
    /// Creation-time behavior flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SwapchainCreateFlags: u64 {
        /// A single image that is acquired once and never changes afterwards
        const STATIC_IMAGE = 1 << 1;
    }
}

/// Usage pairs that may not be requested together
const EXCLUSIVE_USAGE: [(SwapchainUsageFlags, SwapchainUsageFlags); 2] = [
    (
        SwapchainUsageFlags::COLOR_ATTACHMENT,
        SwapchainUsageFlags::DEPTH_STENCIL_ATTACHMENT,
    ),
    (
        SwapchainUsageFlags::UNORDERED_ACCESS,
        SwapchainUsageFlags::DEPTH_STENCIL_ATTACHMENT,
    ),
];

impl SwapchainUsageFlags {
    /// The first mutually exclusive pair contained in `self`, if any
    pub fn exclusive_conflict(self) -> Option<SwapchainUsageFlags> {
        EXCLUSIVE_USAGE
            .iter()
            .map(|&(a, b)| a | b)
            .find(|&pair| self.contains(pair))
    }
}

/// Immutable creation-time parameters of a swapchain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapchainCreateInfo {
    /// Creation behavior flags
    pub create_flags: SwapchainCreateFlags,
    /// Intended image usage
    pub usage_flags: SwapchainUsageFlags,
    /// Native API format value (`VkFormat`, `DXGI_FORMAT` or GL internal format)
    pub format: i64,
    /// Samples per pixel
    pub sample_count: u32,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// 1 for flat images, 6 for cubemaps
    pub face_count: u32,
    /// Array layers per image
    pub array_size: u32,
    /// Mip levels per image
    pub mip_count: u32,
    /// Images in the ring
    pub image_count: u32,
}

impl SwapchainCreateInfo {
    /// Single-sampled, single-layer color swapchain with three images
    pub fn new(format: i64, width: u32, height: u32) -> Self {
        Self {
            create_flags: SwapchainCreateFlags::empty(),
            usage_flags: SwapchainUsageFlags::COLOR_ATTACHMENT | SwapchainUsageFlags::SAMPLED,
            format,
            sample_count: 1,
            width,
            height,
            face_count: 1,
            array_size: 1,
            mip_count: 1,
            image_count: 3,
        }
    }

    /// Replace the usage flags
    pub fn with_usage(mut self, usage: SwapchainUsageFlags) -> Self {
        self.usage_flags = usage;
        self
    }

    /// Replace the creation flags
    pub fn with_create_flags(mut self, flags: SwapchainCreateFlags) -> Self {
        self.create_flags = flags;
        self
    }

    /// Set the ring size
    pub fn with_image_count(mut self, image_count: u32) -> Self {
        self.image_count = image_count;
        self
    }

    /// Set array layers and mip levels
    pub fn with_layers(mut self, array_size: u32, mip_count: u32) -> Self {
        self.array_size = array_size;
        self.mip_count = mip_count;
        self
    }

    /// Set the sample count
    pub fn with_samples(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    /// Whether this describes a static-image swapchain
    pub fn is_static(&self) -> bool {
        self.create_flags.contains(SwapchainCreateFlags::STATIC_IMAGE)
    }

    /// Check every backend-independent constraint
    ///
    /// Runs once, before any backend work. Usage flags are never re-checked
    /// after creation.
    pub fn validate(&self, limits: &SwapchainLimits) -> XrResult<()> {
        if let Some(conflict) = self.usage_flags.exclusive_conflict() {
            return Err(invalid(format!(
                "usage flags {:?} are mutually exclusive",
                conflict
            )));
        }
        if self.usage_flags.is_empty() {
            return Err(invalid("usage flags are empty"));
        }
        if self.format == 0 {
            return Err(invalid("format is undefined"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(invalid(format!(
                "extent {}x{} has a zero dimension",
                self.width, self.height
            )));
        }
        if self.width > limits.max_dimension || self.height > limits.max_dimension {
            return Err(invalid(format!(
                "extent {}x{} exceeds the {} pixel limit",
                self.width, self.height, limits.max_dimension
            )));
        }
        if self.face_count != 1 && self.face_count != 6 {
            return Err(invalid(format!("face count {} is not 1 or 6", self.face_count)));
        }
        if self.array_size == 0 {
            return Err(invalid("array size is zero"));
        }
        let max_mips = 32 - self.width.max(self.height).leading_zeros();
        if self.mip_count == 0 || self.mip_count > max_mips {
            return Err(invalid(format!(
                "mip count {} is outside 1..={}",
                self.mip_count, max_mips
            )));
        }
        if !self.sample_count.is_power_of_two() {
            return Err(invalid(format!(
                "sample count {} is not a power of two",
                self.sample_count
            )));
        }
        if self.image_count == 0 || self.image_count > limits.max_image_count {
            return Err(invalid(format!(
                "image count {} is outside 1..={}",
                self.image_count, limits.max_image_count
            )));
        }
        if self.is_static() && self.image_count != 1 {
            return Err(invalid(format!(
                "static swapchains hold exactly one image, {} requested",
                self.image_count
            )));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> XrError {
    XrError::InvalidArgument(reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> SwapchainLimits {
        SwapchainLimits::default()
    }

    fn base() -> SwapchainCreateInfo {
        SwapchainCreateInfo::new(43, 1024, 512)
    }

    fn is_invalid(info: &SwapchainCreateInfo) -> bool {
        matches!(info.validate(&limits()), Err(XrError::InvalidArgument(_)))
    }

    #[test]
    fn test_default_descriptor_is_valid() {
        assert_eq!(base().validate(&limits()), Ok(()));
    }

    #[test]
    fn test_mutually_exclusive_usage() {
        let color_depth = base().with_usage(
            SwapchainUsageFlags::COLOR_ATTACHMENT | SwapchainUsageFlags::DEPTH_STENCIL_ATTACHMENT,
        );
        let uav_depth = base().with_usage(
            SwapchainUsageFlags::UNORDERED_ACCESS | SwapchainUsageFlags::DEPTH_STENCIL_ATTACHMENT,
        );
        assert!(is_invalid(&color_depth));
        assert!(is_invalid(&uav_depth));

        // Color + unordered access is fine
        let color_uav = base().with_usage(
            SwapchainUsageFlags::COLOR_ATTACHMENT | SwapchainUsageFlags::UNORDERED_ACCESS,
        );
        assert_eq!(color_uav.validate(&limits()), Ok(()));
        assert_eq!(color_uav.usage_flags.exclusive_conflict(), None);
    }

    #[test]
    fn test_dimension_and_count_sanity() {
        assert!(is_invalid(&SwapchainCreateInfo::new(43, 0, 16)));
        assert!(is_invalid(&SwapchainCreateInfo::new(43, 16, 0)));
        assert!(is_invalid(&SwapchainCreateInfo::new(43, 1 << 20, 16)));
        assert!(is_invalid(&SwapchainCreateInfo::new(0, 16, 16)));
        assert!(is_invalid(&base().with_image_count(0)));
        assert!(is_invalid(&base().with_image_count(limits().max_image_count + 1)));
        assert!(is_invalid(&base().with_layers(0, 1)));
        assert!(is_invalid(&base().with_samples(3)));
        assert!(is_invalid(&base().with_usage(SwapchainUsageFlags::empty())));

        let mut cube = base();
        cube.face_count = 6;
        assert_eq!(cube.validate(&limits()), Ok(()));
        cube.face_count = 2;
        assert!(is_invalid(&cube));
    }

    #[test]
    fn test_mip_chain_bounded_by_extent() {
        // 1024 -> 11 levels
        assert_eq!(base().with_layers(1, 11).validate(&limits()), Ok(()));
        assert!(is_invalid(&base().with_layers(1, 12)));
        assert!(is_invalid(&base().with_layers(1, 0)));
    }

    #[test]
    fn test_static_image_requires_single_image() {
        let static_info = base().with_create_flags(SwapchainCreateFlags::STATIC_IMAGE);
        assert!(is_invalid(&static_info.clone().with_image_count(3)));
        assert_eq!(static_info.with_image_count(1).validate(&limits()), Ok(()));
    }
}
