//! Runtime error taxonomy
//!
//! Every public operation returns an [`XrResult`]. Errors are detected at the
//! lowest layer able to see them (descriptor checks in the swapchain
//! controller, handle checks in the registry) and propagate unchanged.

use crate::backend::BackendError;
use crate::registry::{Handle, RegistryError};
use std::time::Duration;
use thiserror::Error;

/// Result type for runtime operations
pub type XrResult<T> = Result<T, XrError>;

/// Runtime-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XrError {
    /// Malformed descriptor, mutually exclusive usage flags or an out-of-range count
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Unknown or stale handle
    #[error("Invalid handle: {0}")]
    InvalidHandle(Handle),

    /// A freshly minted handle was already registered
    #[error("Duplicate handle: {0}")]
    DuplicateHandle(Handle),

    /// No free ring slot, or allocation failure
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// The image wait expired before the image became ready
    #[error("Timed out after {0:?} waiting for swapchain image")]
    Timeout(Duration),

    /// Native image allocation or enumeration failed
    #[error("Backend failure: {0}")]
    BackendFailure(BackendError),

    /// Operation is not valid in the object's current state
    #[error("Call order invalid: {0}")]
    CallOrderInvalid(String),

    /// Internal-consistency fault
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RegistryError> for XrError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(handle) => XrError::InvalidHandle(handle),
            RegistryError::Duplicate(handle) => XrError::DuplicateHandle(handle),
            RegistryError::AllocationFailed => {
                XrError::ResourceExhausted("handle registry allocation failed".to_string())
            }
        }
    }
}

impl From<BackendError> for XrError {
    fn from(err: BackendError) -> Self {
        match err {
            // Usage flags are validated before any backend work; reaching the
            // adapter with a bad combination means a check was bypassed.
            BackendError::InconsistentUsage(_) => XrError::Internal(err.to_string()),
            other => XrError::BackendFailure(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swapchain::SwapchainUsageFlags;

    #[test]
    fn test_registry_errors_map_to_handle_errors() {
        let handle = Handle::from_raw(7);
        assert_eq!(XrError::from(RegistryError::NotFound(handle)), XrError::InvalidHandle(handle));
        assert_eq!(XrError::from(RegistryError::Duplicate(handle)), XrError::DuplicateHandle(handle));
        assert!(matches!(
            XrError::from(RegistryError::AllocationFailed),
            XrError::ResourceExhausted(_)
        ));
    }

    #[test]
    fn test_inconsistent_usage_is_internal_fault() {
        let usage =
            SwapchainUsageFlags::COLOR_ATTACHMENT | SwapchainUsageFlags::DEPTH_STENCIL_ATTACHMENT;
        assert!(matches!(
            XrError::from(BackendError::InconsistentUsage(usage)),
            XrError::Internal(_)
        ));
    }

    #[test]
    fn test_other_backend_errors_are_backend_failures() {
        assert_eq!(
            XrError::from(BackendError::NotAllocated),
            XrError::BackendFailure(BackendError::NotAllocated)
        );
    }
}
