//! In-memory compositor without a GPU
//!
//! Hands out fake native handles and models image readiness with a single
//! shared gate, so the wait path can be driven deterministically: open the
//! gate and every wait returns immediately, close it and waits block until
//! the timeout or until another thread opens it again.

use super::{CompositorError, NativeCompositor, NativeSwapchain, WaitStatus};
use crate::backend::GraphicsApi;
use crate::foundation::time::Deadline;
use crate::swapchain::SwapchainCreateInfo;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

/// VK_FORMAT_R8G8B8A8_SRGB
pub const VK_FORMAT_R8G8B8A8_SRGB: i64 = 43;
/// VK_FORMAT_B8G8R8A8_SRGB
pub const VK_FORMAT_B8G8R8A8_SRGB: i64 = 50;
/// VK_FORMAT_D32_SFLOAT
pub const VK_FORMAT_D32_SFLOAT: i64 = 126;
/// DXGI_FORMAT_R8G8B8A8_UNORM_SRGB
pub const DXGI_FORMAT_R8G8B8A8_UNORM_SRGB: i64 = 29;
/// DXGI_FORMAT_D32_FLOAT
pub const DXGI_FORMAT_D32_FLOAT: i64 = 40;
/// GL_SRGB8_ALPHA8
pub const GL_SRGB8_ALPHA8: i64 = 0x8C43;
/// GL_DEPTH_COMPONENT32F
pub const GL_DEPTH_COMPONENT32F: i64 = 0x8CAC;

/// First native handle value handed out
const FIRST_NATIVE_HANDLE: u64 = 0x1000;

/// Headless compositor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadlessConfig {
    /// Most images a single native swapchain may hold
    pub max_image_count: u32,
    /// Whether images start out ready
    pub images_ready: bool,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            max_image_count: 8,
            images_ready: true,
        }
    }
}

/// Shared readiness gate for every image of a compositor
#[derive(Debug)]
struct ReadinessGate {
    open: Mutex<bool>,
    changed: Condvar,
}

impl ReadinessGate {
    fn new(open: bool) -> Self {
        Self {
            open: Mutex::new(open),
            changed: Condvar::new(),
        }
    }

    fn set(&self, open: bool) {
        *self.open.lock().unwrap_or_else(PoisonError::into_inner) = open;
        self.changed.notify_all();
    }

    fn wait(&self, timeout: Duration) -> WaitStatus {
        let deadline = Deadline::after(timeout);
        let mut open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        while !*open {
            open = match deadline.remaining() {
                None => self
                    .changed
                    .wait(open)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(left) if left.is_zero() => return WaitStatus::TimedOut,
                Some(left) => {
                    self.changed
                        .wait_timeout(open, left)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
        WaitStatus::Ready
    }
}

/// Counters shared between the compositor and its swapchains
#[derive(Debug, Default)]
struct Stats {
    created: AtomicUsize,
    live: AtomicUsize,
    releases: AtomicUsize,
}

/// Compositor that allocates fake native images in memory
pub struct HeadlessCompositor {
    config: HeadlessConfig,
    gate: Arc<ReadinessGate>,
    stats: Arc<Stats>,
    next_handle: AtomicU64,
}

impl HeadlessCompositor {
    /// Create a compositor with default settings
    pub fn new() -> Self {
        Self::with_config(HeadlessConfig::default())
    }

    /// Create a compositor with explicit settings
    pub fn with_config(config: HeadlessConfig) -> Self {
        Self {
            gate: Arc::new(ReadinessGate::new(config.images_ready)),
            config,
            stats: Arc::new(Stats::default()),
            next_handle: AtomicU64::new(FIRST_NATIVE_HANDLE),
        }
    }

    /// Open or close the readiness gate for all images
    pub fn set_images_ready(&self, ready: bool) {
        self.gate.set(ready);
    }

    /// Native swapchains created so far
    pub fn swapchains_created(&self) -> usize {
        self.stats.created.load(Ordering::SeqCst)
    }

    /// Native swapchains not yet freed
    pub fn live_swapchains(&self) -> usize {
        self.stats.live.load(Ordering::SeqCst)
    }

    /// Images handed back through [`NativeSwapchain::release_image`]
    pub fn images_released(&self) -> usize {
        self.stats.releases.load(Ordering::SeqCst)
    }
}

impl Default for HeadlessCompositor {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeCompositor for HeadlessCompositor {
    fn create_swapchain(
        &self,
        info: &SwapchainCreateInfo,
        api: GraphicsApi,
    ) -> Result<Box<dyn NativeSwapchain>, CompositorError> {
        if !self.supported_formats(api).contains(&info.format) {
            return Err(CompositorError::UnsupportedFormat(info.format));
        }
        if info.image_count > self.config.max_image_count {
            return Err(CompositorError::OutOfMemory {
                requested: info.image_count,
                limit: self.config.max_image_count,
            });
        }

        let count = u64::from(info.image_count);
        let first = self.next_handle.fetch_add(count, Ordering::Relaxed);
        let images = (first..first + count).collect();

        self.stats.created.fetch_add(1, Ordering::SeqCst);
        self.stats.live.fetch_add(1, Ordering::SeqCst);
        log::trace!(
            "Headless compositor allocated {} {:?} images starting at {:#x}",
            count,
            api,
            first
        );

        Ok(Box::new(HeadlessSwapchain {
            images,
            gate: Arc::clone(&self.gate),
            stats: Arc::clone(&self.stats),
        }))
    }

    fn supported_formats(&self, api: GraphicsApi) -> Vec<i64> {
        match api {
            GraphicsApi::Vulkan => vec![
                VK_FORMAT_R8G8B8A8_SRGB,
                VK_FORMAT_B8G8R8A8_SRGB,
                VK_FORMAT_D32_SFLOAT,
            ],
            GraphicsApi::D3D12 => vec![DXGI_FORMAT_R8G8B8A8_UNORM_SRGB, DXGI_FORMAT_D32_FLOAT],
            GraphicsApi::OpenGl => vec![GL_SRGB8_ALPHA8, GL_DEPTH_COMPONENT32F],
        }
    }
}

struct HeadlessSwapchain {
    images: Vec<u64>,
    gate: Arc<ReadinessGate>,
    stats: Arc<Stats>,
}

impl HeadlessSwapchain {
    fn check_index(&self, index: u32) -> Result<(), CompositorError> {
        if (index as usize) < self.images.len() {
            Ok(())
        } else {
            Err(CompositorError::InvalidImageIndex(index))
        }
    }
}

impl NativeSwapchain for HeadlessSwapchain {
    fn image_handles(&self) -> &[u64] {
        &self.images
    }

    fn wait_image(&self, index: u32, timeout: Duration) -> Result<WaitStatus, CompositorError> {
        self.check_index(index)?;
        Ok(self.gate.wait(timeout))
    }

    fn release_image(&self, index: u32) -> Result<(), CompositorError> {
        self.check_index(index)?;
        self.stats.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for HeadlessSwapchain {
    fn drop(&mut self) {
        self.stats.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    fn color_info(image_count: u32) -> SwapchainCreateInfo {
        SwapchainCreateInfo::new(VK_FORMAT_R8G8B8A8_SRGB, 64, 64).with_image_count(image_count)
    }

    #[test]
    fn test_allocates_distinct_handles() {
        let compositor = HeadlessCompositor::new();
        let a = compositor.create_swapchain(&color_info(3), GraphicsApi::Vulkan).unwrap();
        let b = compositor.create_swapchain(&color_info(2), GraphicsApi::Vulkan).unwrap();

        assert_eq!(a.image_handles().len(), 3);
        assert_eq!(b.image_handles().len(), 2);
        assert!(a.image_handles().iter().all(|h| !b.image_handles().contains(h)));
        assert_eq!(compositor.swapchains_created(), 2);
        assert_eq!(compositor.live_swapchains(), 2);

        drop(a);
        assert_eq!(compositor.live_swapchains(), 1);
    }

    #[test]
    fn test_rejects_unsupported_format_and_oversized_sets() {
        let compositor = HeadlessCompositor::with_config(HeadlessConfig {
            max_image_count: 2,
            images_ready: true,
        });

        let wrong_api = compositor.create_swapchain(&color_info(2), GraphicsApi::D3D12);
        assert!(matches!(
            wrong_api,
            Err(CompositorError::UnsupportedFormat(VK_FORMAT_R8G8B8A8_SRGB))
        ));

        let too_many = compositor.create_swapchain(&color_info(3), GraphicsApi::Vulkan);
        assert!(matches!(
            too_many,
            Err(CompositorError::OutOfMemory { requested: 3, limit: 2 })
        ));
        assert_eq!(compositor.swapchains_created(), 0);
    }

    #[test]
    fn test_closed_gate_times_out() {
        let compositor = HeadlessCompositor::with_config(HeadlessConfig {
            images_ready: false,
            ..HeadlessConfig::default()
        });
        let native = compositor.create_swapchain(&color_info(2), GraphicsApi::Vulkan).unwrap();

        let start = Instant::now();
        let status = native.wait_image(0, Duration::from_millis(20)).unwrap();
        assert_eq!(status, WaitStatus::TimedOut);
        assert!(start.elapsed() >= Duration::from_millis(20));

        assert_eq!(
            native.wait_image(5, Duration::ZERO),
            Err(CompositorError::InvalidImageIndex(5))
        );
    }

    #[test]
    fn test_gate_opened_from_another_thread() {
        let compositor = Arc::new(HeadlessCompositor::with_config(HeadlessConfig {
            images_ready: false,
            ..HeadlessConfig::default()
        }));
        let native = compositor.create_swapchain(&color_info(2), GraphicsApi::Vulkan).unwrap();

        let opener = {
            let compositor = Arc::clone(&compositor);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                compositor.set_images_ready(true);
            })
        };

        let status = native.wait_image(1, Duration::from_secs(5)).unwrap();
        assert_eq!(status, WaitStatus::Ready);
        opener.join().unwrap();
    }
}
