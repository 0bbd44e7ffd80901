//! Error types for gemmly operations.
//!
//! The kernel programs themselves have no error taxonomy: they are
//! fixed-function numeric pipelines with no branches on data validity.
//! Everything that can go wrong is a host-side precondition violation and is
//! rejected here, before launch.

use std::fmt;

/// Errors reported by the host-side layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GemmlyError {
    /// The device memory window cannot satisfy an allocation request.
    AllocationError {
        /// The number of bytes that was requested.
        requested_bytes: usize,
        /// The number of bytes left in the device memory window.
        available_bytes: usize,
    },
    /// Input validation error (dimension mismatch, illegal inner dimension,
    /// inconsistent strides).
    ValidationError {
        /// Human-readable error message.
        message: String,
    },
}

impl fmt::Display for GemmlyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GemmlyError::AllocationError {
                requested_bytes,
                available_bytes,
            } => write!(
                f,
                "Device memory exhausted: requested {} bytes, {} bytes available",
                requested_bytes, available_bytes
            ),
            GemmlyError::ValidationError { message } => {
                write!(f, "Validation error: {}", message)
            }
        }
    }
}

impl std::error::Error for GemmlyError {}

/// Result type alias for gemmly operations.
pub type Result<T> = std::result::Result<T, GemmlyError>;

/// Creates an allocation error.
pub fn allocation_error(requested_bytes: usize, available_bytes: usize) -> GemmlyError {
    GemmlyError::AllocationError {
        requested_bytes,
        available_bytes,
    }
}

/// Creates a validation error.
pub fn validation_error(message: impl Into<String>) -> GemmlyError {
    GemmlyError::ValidationError {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_error_display() {
        let error = allocation_error(4096, 512);
        let display = format!("{}", error);
        assert!(display.contains("Device memory exhausted"));
        assert!(display.contains("4096 bytes"));
        assert!(display.contains("512 bytes available"));
    }

    #[test]
    fn test_validation_error_display() {
        let error = validation_error("inner dimension must be at least 2");
        let display = format!("{}", error);
        assert!(display.contains("Validation error"));
        assert!(display.contains("inner dimension must be at least 2"));
    }

    #[test]
    fn test_error_equality() {
        let error1 = allocation_error(1024, 32);
        let error2 = allocation_error(1024, 32);
        let error3 = allocation_error(2048, 32);

        assert_eq!(error1, error2);
        assert_ne!(error1, error3);
    }

    #[test]
    fn test_error_trait_implementation() {
        let error = validation_error("test error");

        let _: &dyn std::error::Error = &error;
        assert!(std::error::Error::source(&error).is_none());
    }
}
