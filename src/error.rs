//! Error types for the benchmark-facing surface of the crate.
//!
//! Kernels never return errors: a violated precondition inside a kernel is a
//! programmer error and panics. `MatmulError` is what the buffer allocation,
//! the kernel registry and the driver report, so that a harness can refuse a
//! kernel up front instead of tripping its assertion.

use std::fmt;

/// Errors reported outside the kernels themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatmulError {
    /// An `n × n` matrix has more elements than `usize` can count.
    MatrixTooLarge {
        /// The requested matrix side.
        n: usize,
    },
    /// A buffer of `len` floats cannot be laid out with this alignment.
    LayoutError {
        /// Number of `f32` elements requested.
        len: usize,
        /// Requested alignment in bytes.
        alignment: usize,
        /// Which layout rule was violated.
        reason: &'static str,
    },
    /// The allocator returned null for a matrix buffer.
    AllocationError {
        /// Size of the failed request in bytes.
        bytes: usize,
        /// Alignment of the failed request in bytes.
        alignment: usize,
    },
    /// Bad driver argument, or a kernel precondition that the requested
    /// problem size cannot satisfy.
    ValidationError {
        /// Human-readable error message.
        message: String,
    },
    /// No kernel is registered under the given selection key.
    UnknownKernel {
        /// The key that was looked up.
        key: char,
    },
}

impl fmt::Display for MatmulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatmulError::MatrixTooLarge { n } => {
                write!(f, "a {} x {} matrix does not fit in the address space", n, n)
            }
            MatmulError::LayoutError {
                len,
                alignment,
                reason,
            } => write!(
                f,
                "cannot lay out {} floats with {}-byte alignment: {}",
                len, alignment, reason
            ),
            MatmulError::AllocationError { bytes, alignment } => write!(
                f,
                "out of memory allocating a {}-byte matrix buffer ({}-byte aligned)",
                bytes, alignment
            ),
            MatmulError::ValidationError { message } => f.write_str(message),
            MatmulError::UnknownKernel { key } => {
                write!(f, "Unknown kernel key '{}'", key)
            }
        }
    }
}

impl std::error::Error for MatmulError {}

/// Result type alias for fallible operations of this crate.
pub type Result<T> = std::result::Result<T, MatmulError>;

/// Creates an allocation error.
pub fn allocation_error(bytes: usize, alignment: usize) -> MatmulError {
    MatmulError::AllocationError { bytes, alignment }
}

/// Creates a layout error.
pub fn layout_error(len: usize, alignment: usize, reason: &'static str) -> MatmulError {
    MatmulError::LayoutError {
        len,
        alignment,
        reason,
    }
}

/// Creates a validation error.
pub fn validation_error(message: impl Into<String>) -> MatmulError {
    MatmulError::ValidationError {
        message: message.into(),
    }
}
