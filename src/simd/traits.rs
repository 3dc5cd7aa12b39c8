//! The operations the vector kernels need from an 8-lane `f32` register.
//!
//! [`F32x8`](crate::simd::avx2::f32x8::F32x8) implements them with AVX2/FMA
//! intrinsics, [`F32x8Portable`](crate::simd::portable::F32x8Portable) with a
//! plain array, and the kernels in [`simd::matmul`](crate::simd::matmul) are
//! written once against these traits.

pub trait Alignment<T> {
    /// Whether `ptr` satisfies the alignment of aligned loads and stores.
    fn is_aligned(ptr: *const T) -> bool;
}

pub trait SimdLoad<T> {
    type Output;

    /// All lanes set to zero.
    ///
    /// # Safety
    ///
    /// The CPU must support the instruction set of the implementation.
    unsafe fn zeros() -> Self::Output;

    /// All lanes set to `value`.
    ///
    /// # Safety
    ///
    /// The CPU must support the instruction set of the implementation.
    unsafe fn splat(value: T) -> Self::Output;

    /// Loads a full vector from aligned memory.
    ///
    /// # Safety
    ///
    /// `ptr` must be aligned (see [`Alignment::is_aligned`]) and valid for
    /// reading a full vector.
    unsafe fn load_aligned(ptr: *const T) -> Self::Output;
}

pub trait SimdStore<T> {
    /// # Safety
    ///
    /// `ptr` must be aligned and valid for writing a full vector.
    unsafe fn store_aligned_at(&self, ptr: *mut T);
}

pub trait SimdFma {
    /// Lane-wise `self * a + b`, rounded once.
    ///
    /// # Safety
    ///
    /// The CPU must support the instruction set of the implementation.
    unsafe fn fmadd(self, a: Self, b: Self) -> Self;
}

/// Everything a vector kernel uses, bundled under one bound.
pub trait SimdVec:
    Copy + Alignment<f32> + SimdLoad<f32, Output = Self> + SimdStore<f32> + SimdFma
{
    /// Number of `f32` lanes.
    const LANES: usize;
}
