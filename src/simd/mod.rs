//! 8-lane vector types and the kernels built on them.
//!
//! - [`traits`]: the load/store/FMA surface the kernels are generic over
//! - [`avx2`]: AVX2/FMA implementation (x86 only, runtime-detected)
//! - [`portable`]: array-backed fallback with the same contract
//! - [`matmul`]: sequential and row-parallel broadcast/FMA kernels

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub mod avx2;

pub mod matmul;
pub mod portable;
pub mod traits;

pub use traits::{Alignment, SimdFma, SimdLoad, SimdStore, SimdVec};
