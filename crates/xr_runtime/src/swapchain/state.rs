//! Swapchain lifecycle states

use std::fmt;

/// Lifecycle state of a swapchain
///
/// ```text
/// Created -> Ready <-> Acquired <-> WaitedOn -> (release) -> Ready
///              \__________ any state __________/-> Destroyed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapchainState {
    /// Object built, native images not yet bound
    Created,
    /// No image is held by the application
    Ready,
    /// At least one image is acquired and none is waited on
    Acquired,
    /// The oldest acquired image has been waited on and may be written
    WaitedOn,
    /// Torn down; no further operation is valid
    Destroyed,
}

impl SwapchainState {
    /// Whether the swapchain can still be driven
    pub fn is_live(self) -> bool {
        !matches!(self, SwapchainState::Created | SwapchainState::Destroyed)
    }
}

impl fmt::Display for SwapchainState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SwapchainState::Created => "created",
            SwapchainState::Ready => "ready",
            SwapchainState::Acquired => "acquired",
            SwapchainState::WaitedOn => "waited-on",
            SwapchainState::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}
