//! Opaque object handles and handle minting

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque 64-bit identifier for a runtime object
///
/// A handle is not a pointer and confers no ownership. It only names an
/// object for lookup in a [`HandleRegistry`](super::HandleRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u64);

impl Handle {
    /// The null handle; never minted
    pub const NULL: Handle = Handle(0);

    /// Wrap a raw handle value received from the application
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw value to hand back to the application
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    /// Whether this is [`Handle::NULL`]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Mints unique handles for one object category
///
/// Values start at 1 and only ever increase, so a handle is never reused
/// while the allocator lives.
#[derive(Debug)]
pub struct HandleAllocator {
    next: AtomicU64,
}

impl HandleAllocator {
    /// Create an allocator whose first handle is `0x1`
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Mint a fresh handle, or `None` once the 64-bit space is used up
    pub fn mint(&self) -> Option<Handle> {
        self.next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_add(1))
            .ok()
            .map(Handle)
    }
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_minted_handles_are_never_null() {
        let allocator = HandleAllocator::new();
        let first = allocator.mint().unwrap();
        assert!(!first.is_null());
        assert_eq!(first.as_raw(), 1);
    }

    #[test]
    fn test_minting_is_unique_across_threads() {
        let allocator = Arc::new(HandleAllocator::new());
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let allocator = Arc::clone(&allocator);
                thread::spawn(move || {
                    (0..250).map(|_| allocator.mint().unwrap()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for worker in workers {
            for handle in worker.join().unwrap() {
                assert!(seen.insert(handle), "handle {} minted twice", handle);
            }
        }
        assert_eq!(seen.len(), 1000);
    }

    #[test]
    fn test_display_is_hex() {
        assert_eq!(Handle::from_raw(255).to_string(), "0xff");
    }
}
