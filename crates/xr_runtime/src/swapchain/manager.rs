//! Swapchain Lifecycle Controller
//!
//! Owns every swapchain of one session in a slot-map arena and exposes them
//! to the application through handles. The [`HandleRegistry`] maps a handle
//! to its arena key; the arena owns the object.
//!
//! ## Teardown ordering
//!
//! Destruction always removes the handle from the registry first, then takes
//! the object out of the arena, then releases its native images. Bulk
//! teardown goes through [`HandleRegistry::clear_and_call_for_each`] so no
//! handle resolves once destruction has begun. Handles drained by bulk
//! teardown are remembered: using one afterwards is reported as
//! [`XrError::Internal`], while a handle removed by [`SwapchainManager::destroy`]
//! is simply [`XrError::InvalidHandle`].
//!
//! ## Concurrency
//!
//! Different swapchains may be driven from different threads. Each object
//! sits behind its own mutex and the arena lock is never held across a
//! blocking wait. A single swapchain must not be driven by two threads at
//! once; the acquire → wait → release protocol is sequential.

use super::descriptor::SwapchainCreateInfo;
use super::object::Swapchain;
use super::state::SwapchainState;
use crate::backend::{create_adapter, GraphicsBinding, SwapchainImage};
use crate::config::SwapchainLimits;
use crate::error::{XrError, XrResult};
use crate::registry::{Handle, HandleAllocator, HandleRegistry, RegistryError};
use slotmap::{new_key_type, SlotMap};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

new_key_type! {
    /// Arena key of a swapchain object
    pub struct SwapchainKey;
}

type SwapchainCell = Arc<Mutex<Swapchain>>;

/// Creates, drives and destroys the swapchains of one session
pub struct SwapchainManager {
    limits: SwapchainLimits,
    handles: HandleAllocator,
    registry: HandleRegistry<SwapchainKey>,
    arena: RwLock<SlotMap<SwapchainKey, SwapchainCell>>,
    /// Handles drained by `destroy_all`
    torn_down: Mutex<HashSet<Handle>>,
}

impl SwapchainManager {
    /// Create a manager enforcing `limits` on every descriptor
    pub fn new(limits: SwapchainLimits) -> Self {
        Self {
            limits,
            handles: HandleAllocator::new(),
            registry: HandleRegistry::new(),
            arena: RwLock::new(SlotMap::with_key()),
            torn_down: Mutex::new(HashSet::new()),
        }
    }

    /// Limits applied at creation
    pub fn limits(&self) -> &SwapchainLimits {
        &self.limits
    }

    /// Formats the session's compositor accepts, most preferred first
    pub fn supported_formats(&self, binding: &GraphicsBinding) -> Vec<i64> {
        binding.compositor.supported_formats(binding.api)
    }

    /// Validate `info`, allocate its images through the binding's backend
    /// and register the new swapchain
    ///
    /// On any failure no handle is produced and nothing stays allocated.
    pub fn create(&self, info: &SwapchainCreateInfo, binding: &GraphicsBinding) -> XrResult<Handle> {
        if let Err(err) = info.validate(&self.limits) {
            log::debug!("Rejected swapchain descriptor: {}", err);
            return Err(err);
        }

        let handle = self.handles.mint().ok_or_else(|| {
            XrError::ResourceExhausted("swapchain handle space exhausted".to_string())
        })?;
        let swapchain = Swapchain::create(handle, info.clone(), create_adapter(binding))?;

        let key = self
            .arena
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(Arc::new(Mutex::new(swapchain)));

        if let Err(err) = self.registry.insert(handle, key) {
            log::error!("Failed to register swapchain {}: {}", handle, err);
            // Dropping the arena entry releases the native images.
            self.take_from_arena(key);
            return Err(err.into());
        }

        log::info!(
            "Created {} swapchain {} ({}x{}, {} images, format {})",
            binding.api,
            handle,
            info.width,
            info.height,
            info.image_count,
            info.format
        );
        Ok(handle)
    }

    /// Acquire the next ring slot of `handle`
    pub fn acquire(&self, handle: Handle) -> XrResult<u32> {
        let index = self.with_swapchain(handle, Swapchain::acquire_image)?;
        log::debug!("Swapchain {} acquired image {}", handle, index);
        Ok(index)
    }

    /// Block up to `timeout` until the oldest acquired image of `handle` is writable
    ///
    /// # Returns
    /// The slot that became writable
    pub fn wait(&self, handle: Handle, timeout: Duration) -> XrResult<u32> {
        let result = self.with_swapchain(handle, |swapchain| swapchain.wait_image(timeout));
        match &result {
            Ok(index) => log::debug!("Swapchain {} image {} ready", handle, index),
            Err(XrError::Timeout(_)) => {
                log::warn!("Swapchain {} wait timed out after {:?}", handle, timeout);
            }
            Err(_) => {}
        }
        result
    }

    /// Release the oldest acquired image of `handle`
    ///
    /// # Returns
    /// The slot returned to the ring
    pub fn release(&self, handle: Handle) -> XrResult<u32> {
        let index = self.with_swapchain(handle, Swapchain::release_image)?;
        log::debug!("Swapchain {} released image {}", handle, index);
        Ok(index)
    }

    /// Write backend image descriptors for `handle` into `out`
    ///
    /// An empty `out` returns the image count without writing.
    pub fn enumerate_images(&self, handle: Handle, out: &mut [SwapchainImage]) -> XrResult<u32> {
        self.with_swapchain(handle, |swapchain| swapchain.enumerate_images(out))
    }

    /// Images in the ring of `handle`
    pub fn image_count(&self, handle: Handle) -> XrResult<u32> {
        self.with_swapchain(handle, |swapchain| Ok(swapchain.image_count()))
    }

    /// Current lifecycle state of `handle`
    pub fn state(&self, handle: Handle) -> XrResult<SwapchainState> {
        self.with_swapchain(handle, |swapchain| Ok(swapchain.state()))
    }

    /// Creation parameters of `handle`
    pub fn create_info(&self, handle: Handle) -> XrResult<SwapchainCreateInfo> {
        self.with_swapchain(handle, |swapchain| Ok(swapchain.info().clone()))
    }

    /// Slot returned by the most recent acquisition on `handle`
    pub fn last_acquired_index(&self, handle: Handle) -> XrResult<Option<u32>> {
        self.with_swapchain(handle, |swapchain| Ok(swapchain.last_acquired_index()))
    }

    /// Destroy `handle` regardless of its acquire/wait state
    pub fn destroy(&self, handle: Handle) -> XrResult<()> {
        let key = self
            .registry
            .erase(handle)
            .map_err(|err| self.unresolved(handle, err))?;
        let cell = self.take_from_arena(key).ok_or_else(|| {
            log::error!("Swapchain {} was registered without an arena slot", handle);
            XrError::Internal(format!("swapchain {} has no backing object", handle))
        })?;

        lock(&cell).destroy();
        log::info!("Destroyed swapchain {}", handle);
        Ok(())
    }

    /// Destroy every swapchain, e.g. when the owning session ends
    ///
    /// Any later use of a drained handle is an internal-consistency fault.
    ///
    /// # Returns
    /// Number of swapchains destroyed
    pub fn destroy_all(&self) -> usize {
        let mut drained = Vec::new();
        let count = self.registry.clear_and_call_for_each(|handle, key| {
            drained.push(handle);
            match self.take_from_arena(key) {
                Some(cell) => lock(&cell).destroy(),
                None => log::error!("Swapchain {} was registered without an arena slot", handle),
            }
        });
        self.torn_down
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(drained);
        if count > 0 {
            log::warn!("Destroyed {} swapchains still alive at teardown", count);
        }
        count
    }

    /// Whether `handle` currently resolves
    pub fn contains(&self, handle: Handle) -> bool {
        self.registry.find(handle).is_ok()
    }

    /// Number of live swapchains
    pub fn live_count(&self) -> usize {
        self.registry.len()
    }

    fn resolve(&self, handle: Handle) -> XrResult<SwapchainCell> {
        let key = self
            .registry
            .find(handle)
            .map_err(|err| self.unresolved(handle, err))?;
        let arena = self.arena.read().unwrap_or_else(PoisonError::into_inner);
        arena.get(key).cloned().ok_or_else(|| {
            log::error!("Handle {} resolves to a vacated arena slot", handle);
            XrError::Internal(format!("swapchain {} has no backing object", handle))
        })
    }

    fn unresolved(&self, handle: Handle, err: RegistryError) -> XrError {
        let torn_down = self
            .torn_down
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&handle);
        if torn_down {
            log::error!("Swapchain {} used after session teardown", handle);
            XrError::Internal(format!("swapchain {} was used after session teardown", handle))
        } else {
            err.into()
        }
    }

    fn with_swapchain<T, F>(&self, handle: Handle, op: F) -> XrResult<T>
    where
        F: FnOnce(&mut Swapchain) -> XrResult<T>,
    {
        let cell = self.resolve(handle)?;
        let mut swapchain = lock(&cell);
        op(&mut *swapchain)
    }

    fn take_from_arena(&self, key: SwapchainKey) -> Option<SwapchainCell> {
        self.arena
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }
}

impl Default for SwapchainManager {
    fn default() -> Self {
        Self::new(SwapchainLimits::default())
    }
}

impl Drop for SwapchainManager {
    fn drop(&mut self) {
        self.destroy_all();
    }
}

fn lock(cell: &SwapchainCell) -> MutexGuard<'_, Swapchain> {
    cell.lock().unwrap_or_else(PoisonError::into_inner)
}
