//! Dense square single-precision matrix multiplication kernels.
//!
//! Every kernel computes `R = P * Q` for row-major `n x n` matrices stored in
//! flat `f32` slices of length `n * n`, overwriting `R` completely. They
//! differ only in how the work is ordered and executed:
//!
//! - [`linear`]: the six triple-loop orders over the index permutations
//! - [`autovec`]: `i-k-j` with contiguous inner rows left to the compiler
//! - [`simd`]: explicit 8-lane broadcast/FMA, sequential and row-parallel
//! - [`dac`]: parallel divide-and-conquer over quadrants
//! - [`kernels`]: a keyed registry over all of the above
//!
//! # Example
//!
//! ```
//! use matmul_kernels::{linear, utils::AlignedVec};
//!
//! let p = [1.0, 2.0, 3.0, 4.0];
//! let q = [5.0, 6.0, 7.0, 8.0];
//! let mut r = AlignedVec::square(2).unwrap();
//! linear::matmul::<linear::Ijk>(&p, &q, &mut r, 2);
//! assert_eq!(&r[..], &[19.0, 22.0, 43.0, 50.0]);
//! ```

pub mod autovec;
pub mod dac;
pub mod error;
pub mod kernels;
pub mod linear;
pub mod simd;
pub mod utils;

pub use error::{MatmulError, Result};
pub use kernels::Kernel;

/// Number of `f32` lanes processed per vector operation.
pub const VECTOR_WIDTH: usize = 8;

/// Byte alignment of matrix buffers handed to the vector kernels.
pub const ALIGNMENT: usize = 32;

/// Block side at or below which the divide-and-conquer kernel stops recursing.
pub const DAC_THRESHOLD: usize = 64;
