//! Swapchain object and its acquire/wait/release protocol
//!
//! The ring is cycled strictly in order: acquisition hands out slot
//! `next_index` and advances it modulo the image count, waits and releases
//! always target the oldest acquired slot. Because releases are FIFO the
//! acquired slots always form a contiguous window of the ring, so the next
//! slot in ring order is free whenever fewer than `image_count` slots are
//! held.
//!
//! A swapchain is driven by one thread at a time; the manager serializes
//! access per object but the protocol itself is sequential.

use super::descriptor::SwapchainCreateInfo;
use super::state::SwapchainState;
use crate::backend::{BackendAdapter, GraphicsApi, SwapchainImage};
use crate::compositor::WaitStatus;
use crate::error::{XrError, XrResult};
use crate::registry::Handle;
use std::collections::VecDeque;
use std::time::Duration;

/// A ring of images bound to one backend adapter
pub struct Swapchain {
    handle: Handle,
    info: SwapchainCreateInfo,
    adapter: Box<dyn BackendAdapter>,
    image_count: u32,
    state: SwapchainState,
    /// Acquired and not yet released, oldest first
    acquired: VecDeque<u32>,
    /// Slot currently waited on; always the front of `acquired`
    waited: Option<u32>,
    next_index: u32,
    last_acquired: Option<u32>,
    /// Static swapchains allow a single acquisition
    acquired_once: bool,
}

impl Swapchain {
    /// Allocate native images through `adapter` and build a ready swapchain
    ///
    /// The object only exists once its images are bound, so `Created` is
    /// never observable from outside. `info` must already be validated; on
    /// failure nothing is retained.
    pub(crate) fn create(
        handle: Handle,
        info: SwapchainCreateInfo,
        mut adapter: Box<dyn BackendAdapter>,
    ) -> XrResult<Self> {
        let count = adapter.allocate_images(&info)?;
        if count != info.image_count {
            adapter.release_images();
            return Err(XrError::Internal(format!(
                "{} adapter allocated {} images, {} requested",
                adapter.api(),
                count,
                info.image_count
            )));
        }

        Ok(Self {
            handle,
            image_count: count,
            state: SwapchainState::Ready,
            acquired: VecDeque::with_capacity(count as usize),
            waited: None,
            next_index: 0,
            last_acquired: None,
            acquired_once: false,
            adapter,
            info,
        })
    }

    /// Handle this swapchain is registered under
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Creation parameters
    pub fn info(&self) -> &SwapchainCreateInfo {
        &self.info
    }

    /// Graphics API of the bound adapter
    pub fn api(&self) -> GraphicsApi {
        self.adapter.api()
    }

    /// Current lifecycle state
    pub fn state(&self) -> SwapchainState {
        self.state
    }

    /// Images in the ring
    pub fn image_count(&self) -> u32 {
        self.image_count
    }

    /// Slot returned by the most recent acquisition
    pub fn last_acquired_index(&self) -> Option<u32> {
        self.last_acquired
    }

    /// Images acquired and not yet released
    pub fn acquired_count(&self) -> usize {
        self.acquired.len()
    }

    /// Write the first `out.len()` ring images into `out`
    ///
    /// An empty buffer only queries the image count.
    ///
    /// # Returns
    /// The image count for an empty buffer, otherwise the number of entries written
    pub fn enumerate_images(&self, out: &mut [SwapchainImage]) -> XrResult<u32> {
        self.ensure_live()?;
        if out.is_empty() {
            return Ok(self.image_count);
        }
        if out.len() > self.image_count as usize {
            return Err(XrError::InvalidArgument(format!(
                "enumeration count {} exceeds the {} swapchain images",
                out.len(),
                self.image_count
            )));
        }
        self.adapter.enumerate_images(out)?;
        Ok(out.len() as u32)
    }

    /// Take the next slot in ring order
    ///
    /// Fails with `ResourceExhausted` when every image is already held;
    /// acquisition is refused, not queued.
    pub fn acquire_image(&mut self) -> XrResult<u32> {
        self.ensure_live()?;
        if self.info.is_static() && self.acquired_once {
            return Err(XrError::CallOrderInvalid(
                "static swapchain image was already acquired".to_string(),
            ));
        }
        if self.acquired.len() >= self.image_count as usize {
            return Err(XrError::ResourceExhausted(format!(
                "all {} swapchain images are acquired",
                self.image_count
            )));
        }

        let index = self.next_index;
        self.next_index = (self.next_index + 1) % self.image_count;
        self.acquired.push_back(index);
        self.last_acquired = Some(index);
        self.acquired_once = true;
        self.refresh_state();
        Ok(index)
    }

    /// Wait until the oldest acquired image is writable
    ///
    /// On timeout the swapchain stays `Acquired`; the caller may wait again
    /// or release.
    pub fn wait_image(&mut self, timeout: Duration) -> XrResult<u32> {
        self.ensure_live()?;
        if self.waited.is_some() {
            return Err(XrError::CallOrderInvalid(
                "an image is already waited on and not yet released".to_string(),
            ));
        }
        let index = *self.acquired.front().ok_or_else(|| {
            XrError::CallOrderInvalid("no image is acquired".to_string())
        })?;

        match self.adapter.wait_image(index, timeout)? {
            WaitStatus::Ready => {
                self.waited = Some(index);
                self.refresh_state();
                Ok(index)
            }
            WaitStatus::TimedOut => Err(XrError::Timeout(timeout)),
        }
    }

    /// Return the oldest acquired image to the ring
    ///
    /// Releasing an image that was acquired but never waited on is allowed;
    /// it means the image was not used.
    pub fn release_image(&mut self) -> XrResult<u32> {
        self.ensure_live()?;
        let index = *self.acquired.front().ok_or_else(|| {
            XrError::CallOrderInvalid("no image is acquired".to_string())
        })?;

        self.adapter.release_image(index)?;
        self.acquired.pop_front();
        if self.waited.take().is_none() {
            log::debug!("Swapchain {} released image {} without waiting", self.handle, index);
        }
        self.refresh_state();
        Ok(index)
    }

    /// Force the swapchain into `Destroyed` and free its native images
    ///
    /// Valid from any state; repeated calls are no-ops. The caller must have
    /// made the handle unresolvable first.
    pub(crate) fn destroy(&mut self) {
        if self.state == SwapchainState::Destroyed {
            return;
        }
        if !self.acquired.is_empty() {
            log::debug!(
                "Swapchain {} destroyed with {} images still acquired",
                self.handle,
                self.acquired.len()
            );
        }
        self.acquired.clear();
        self.waited = None;
        self.state = SwapchainState::Destroyed;
        self.adapter.release_images();
    }

    fn ensure_live(&self) -> XrResult<()> {
        if self.state.is_live() {
            Ok(())
        } else {
            Err(XrError::InvalidHandle(self.handle))
        }
    }

    fn refresh_state(&mut self) {
        self.state = if self.waited.is_some() {
            SwapchainState::WaitedOn
        } else if self.acquired.is_empty() {
            SwapchainState::Ready
        } else {
            SwapchainState::Acquired
        };
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for Swapchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Swapchain")
            .field("handle", &self.handle)
            .field("api", &self.adapter.api())
            .field("state", &self.state)
            .field("image_count", &self.image_count)
            .field("acquired", &self.acquired)
            .field("waited", &self.waited)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{create_adapter, GraphicsBinding};
    use crate::compositor::headless::{HeadlessCompositor, VK_FORMAT_R8G8B8A8_SRGB};
    use crate::backend::BackendResult;
    use crate::swapchain::SwapchainCreateFlags;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Adapter that allocates one image more than requested
    struct MiscountingAdapter {
        allocated: u32,
        releases: Arc<AtomicUsize>,
    }

    impl BackendAdapter for MiscountingAdapter {
        fn api(&self) -> GraphicsApi {
            GraphicsApi::Vulkan
        }

        fn allocate_images(&mut self, info: &SwapchainCreateInfo) -> BackendResult<u32> {
            self.allocated = info.image_count + 1;
            Ok(self.allocated)
        }

        fn image_count(&self) -> u32 {
            self.allocated
        }

        fn enumerate_images(&self, _out: &mut [SwapchainImage]) -> BackendResult<()> {
            Ok(())
        }

        fn wait_image(&self, _index: u32, _timeout: Duration) -> BackendResult<WaitStatus> {
            Ok(WaitStatus::Ready)
        }

        fn release_image(&self, _index: u32) -> BackendResult<()> {
            Ok(())
        }

        fn release_images(&mut self) {
            self.allocated = 0;
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn build(info: SwapchainCreateInfo) -> (Swapchain, Arc<HeadlessCompositor>) {
        let compositor = Arc::new(HeadlessCompositor::new());
        let binding = GraphicsBinding::new(GraphicsApi::Vulkan, compositor.clone());
        let swapchain = Swapchain::create(Handle::from_raw(1), info, create_adapter(&binding)).unwrap();
        (swapchain, compositor)
    }

    fn color(image_count: u32) -> SwapchainCreateInfo {
        SwapchainCreateInfo::new(VK_FORMAT_R8G8B8A8_SRGB, 64, 64).with_image_count(image_count)
    }

    #[test]
    fn test_created_swapchain_is_ready() {
        let (swapchain, _) = build(color(2));
        assert_eq!(swapchain.state(), SwapchainState::Ready);
        assert_eq!(swapchain.image_count(), 2);
        assert_eq!(swapchain.last_acquired_index(), None);
    }

    #[test]
    fn test_wait_and_release_require_acquisition() {
        let (mut swapchain, _) = build(color(2));
        assert!(matches!(
            swapchain.wait_image(Duration::ZERO),
            Err(XrError::CallOrderInvalid(_))
        ));
        assert!(matches!(swapchain.release_image(), Err(XrError::CallOrderInvalid(_))));
        assert_eq!(swapchain.state(), SwapchainState::Ready);
    }

    #[test]
    fn test_only_one_image_waited_at_a_time() {
        let (mut swapchain, _) = build(color(3));
        swapchain.acquire_image().unwrap();
        swapchain.acquire_image().unwrap();
        assert_eq!(swapchain.wait_image(Duration::ZERO), Ok(0));
        assert!(matches!(
            swapchain.wait_image(Duration::ZERO),
            Err(XrError::CallOrderInvalid(_))
        ));

        assert_eq!(swapchain.release_image(), Ok(0));
        assert_eq!(swapchain.state(), SwapchainState::Acquired);
        assert_eq!(swapchain.wait_image(Duration::ZERO), Ok(1));
        assert_eq!(swapchain.state(), SwapchainState::WaitedOn);
    }

    #[test]
    fn test_release_without_wait_is_accepted() {
        let (mut swapchain, compositor) = build(color(2));
        assert_eq!(swapchain.acquire_image(), Ok(0));
        assert_eq!(swapchain.release_image(), Ok(0));
        assert_eq!(swapchain.state(), SwapchainState::Ready);
        assert_eq!(compositor.images_released(), 1);
    }

    #[test]
    fn test_static_image_acquired_once() {
        let info = color(1).with_create_flags(SwapchainCreateFlags::STATIC_IMAGE);
        let (mut swapchain, _) = build(info);
        assert_eq!(swapchain.acquire_image(), Ok(0));
        swapchain.wait_image(Duration::ZERO).unwrap();
        swapchain.release_image().unwrap();
        assert!(matches!(swapchain.acquire_image(), Err(XrError::CallOrderInvalid(_))));
    }

    #[test]
    fn test_destroy_is_forced_and_idempotent() {
        let (mut swapchain, compositor) = build(color(2));
        swapchain.acquire_image().unwrap();
        swapchain.wait_image(Duration::ZERO).unwrap();

        swapchain.destroy();
        assert_eq!(swapchain.state(), SwapchainState::Destroyed);
        assert_eq!(compositor.live_swapchains(), 0);
        assert_eq!(swapchain.acquire_image(), Err(XrError::InvalidHandle(Handle::from_raw(1))));

        swapchain.destroy();
        drop(swapchain);
        assert_eq!(compositor.live_swapchains(), 0);
    }

    #[test]
    fn test_image_count_mismatch_is_internal_fault() {
        let releases = Arc::new(AtomicUsize::new(0));
        let adapter = MiscountingAdapter {
            allocated: 0,
            releases: Arc::clone(&releases),
        };

        let result = Swapchain::create(Handle::from_raw(1), color(2), Box::new(adapter));
        assert!(matches!(result, Err(XrError::Internal(_))));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_allocation_produces_nothing() {
        let compositor = Arc::new(HeadlessCompositor::new());
        let binding = GraphicsBinding::new(GraphicsApi::OpenGl, compositor.clone());
        // Vulkan format on a GL session
        let result = Swapchain::create(Handle::from_raw(1), color(2), create_adapter(&binding));
        assert!(matches!(result, Err(XrError::BackendFailure(_))));
        assert_eq!(compositor.live_swapchains(), 0);
    }
}
