//! AVX2 8-lane f32 SIMD vector implementation.
//!
//! This module provides `F32x8`, a thin wrapper over Intel's `__m256` register
//! holding 8 single-precision values, with exactly the operations the vector
//! matmul kernels need: zero, broadcast, aligned load and store,
//! and fused multiply-add.
//!
//! # Architecture Requirements
//!
//! - **CPU Support**: AVX2 and FMA (Intel Haswell / AMD Excavator and later)
//! - **Target Architecture**: x86_64 (and x86)
//! - **Runtime**: callers check `is_x86_feature_detected!("avx2")` and
//!   `is_x86_feature_detected!("fma")` and enter through a
//!   `#[target_feature(enable = "avx2,fma")]` function, so the
//!   `#[inline(always)]` methods below are compiled with those features
//!
//! # Performance Characteristics
//!
//! - **Vector Width**: 256 bits (8 × f32)
//! - **Memory Alignment**: `load_aligned`/`store_aligned_at` fault on data
//!   that is not 32-byte aligned
//! - **FMA**: one rounding per multiply-add, so results can differ in the
//!   last bit from a separate multiply and add

#[cfg(target_arch = "x86")]
use std::arch::x86::*;

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

use crate::simd::traits::{Alignment, SimdFma, SimdLoad, SimdStore, SimdVec};

/// AVX2 memory alignment requirement in bytes.
pub(crate) const AVX_ALIGNMENT: usize = 32;

/// Number of f32 elements that fit in an AVX2 256-bit vector.
pub(crate) const LANE_COUNT: usize = 8;

/// AVX2 SIMD vector containing 8 packed f32 values.
///
/// # Usage
///
/// ```rust
/// # #[cfg(target_arch = "x86_64")]
/// # {
/// use matmul_kernels::simd::avx2::f32x8::F32x8;
/// use matmul_kernels::simd::{SimdFma, SimdLoad, SimdStore};
/// use matmul_kernels::utils::AlignedVec;
///
/// if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
///     let q = AlignedVec::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0], 32).unwrap();
///     let mut r = AlignedVec::new_zeroed(8, 32).unwrap();
///     unsafe {
///         let acc = F32x8::splat(2.0).fmadd(F32x8::load_aligned(q.as_ptr()), F32x8::zeros());
///         acc.store_aligned_at(r.as_mut_ptr());
///     }
///     assert_eq!(&r[..], &[2.0, 4.0, 6.0, 8.0, 10.0, 12.0, 14.0, 16.0]);
/// }
/// # }
/// ```
#[derive(Copy, Clone, Debug)]
pub struct F32x8 {
    /// AVX2 256-bit vector register containing 8 packed f32 values
    pub elements: __m256,
}

impl Alignment<f32> for F32x8 {
    /// Checks if a pointer is 32-byte aligned, as `_mm256_load_ps` and
    /// `_mm256_store_ps` require.
    #[inline(always)]
    fn is_aligned(ptr: *const f32) -> bool {
        let ptr = ptr as usize;

        ptr % AVX_ALIGNMENT == 0
    }
}

impl SimdLoad<f32> for F32x8 {
    type Output = Self;

    #[inline(always)]
    unsafe fn zeros() -> Self::Output {
        Self {
            elements: _mm256_setzero_ps(),
        }
    }

    /// Broadcasts `value` into every lane (`vbroadcastss`).
    #[inline(always)]
    unsafe fn splat(value: f32) -> Self::Output {
        Self {
            elements: _mm256_set1_ps(value),
        }
    }

    /// Loads 8 elements from 32-byte aligned memory.
    ///
    /// # Safety
    ///
    /// Pointer must be 32-byte aligned and point to at least 8 valid f32 values.
    #[inline(always)]
    unsafe fn load_aligned(ptr: *const f32) -> Self::Output {
        debug_assert!(Self::is_aligned(ptr), "pointer is not 32-byte aligned");
        Self {
            elements: _mm256_load_ps(ptr),
        }
    }
}

impl SimdStore<f32> for F32x8 {
    /// Stores 8 elements to 32-byte aligned memory.
    ///
    /// # Safety
    ///
    /// Pointer must be 32-byte aligned and point to at least 8 valid f32
    /// memory locations.
    #[inline(always)]
    unsafe fn store_aligned_at(&self, ptr: *mut f32) {
        debug_assert!(Self::is_aligned(ptr), "pointer is not 32-byte aligned");
        _mm256_store_ps(ptr, self.elements)
    }
}

impl SimdFma for F32x8 {
    /// `self * a + b` with a single rounding (`vfmadd231ps`).
    #[inline(always)]
    unsafe fn fmadd(self, a: Self, b: Self) -> Self {
        Self {
            elements: _mm256_fmadd_ps(self.elements, a.elements, b.elements),
        }
    }
}

impl SimdVec for F32x8 {
    const LANES: usize = LANE_COUNT;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::AlignedVec;

    fn has_avx2_fma() -> bool {
        is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma")
    }

    unsafe fn lanes(v: F32x8) -> [f32; LANE_COUNT] {
        let mut out = AlignedVec::new_zeroed(LANE_COUNT, AVX_ALIGNMENT).unwrap();
        v.store_aligned_at(out.as_mut_ptr());
        let mut arr = [0.0f32; LANE_COUNT];
        arr.copy_from_slice(&out);
        arr
    }

    #[test]
    fn test_is_aligned_32_byte_boundary() {
        let buf = AlignedVec::new_zeroed(16, AVX_ALIGNMENT).unwrap();
        assert!(F32x8::is_aligned(buf.as_ptr()));
        assert!(!F32x8::is_aligned(unsafe { buf.as_ptr().add(1) }));
        assert!(F32x8::is_aligned(unsafe { buf.as_ptr().add(LANE_COUNT) }));
    }

    #[test]
    fn test_splat_and_zeros() {
        if !has_avx2_fma() {
            println!("Skipping - AVX2/FMA not available");
            return;
        }
        unsafe {
            assert_eq!(lanes(F32x8::zeros()), [0.0; 8]);
            assert_eq!(lanes(F32x8::splat(-1.5)), [-1.5; 8]);
        }
    }

    #[test]
    fn test_aligned_load_store_roundtrip() {
        if !has_avx2_fma() {
            println!("Skipping - AVX2/FMA not available");
            return;
        }
        let data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let src = AlignedVec::from_slice(&data, AVX_ALIGNMENT).unwrap();
        let mut dst = AlignedVec::new_zeroed(8, AVX_ALIGNMENT).unwrap();

        unsafe {
            let v = F32x8::load_aligned(src.as_ptr());
            v.store_aligned_at(dst.as_mut_ptr());
        }
        assert_eq!(&dst[..], &data);
    }

    #[test]
    fn test_fmadd() {
        if !has_avx2_fma() {
            println!("Skipping - AVX2/FMA not available");
            return;
        }
        let a = AlignedVec::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0], AVX_ALIGNMENT).unwrap();
        let b = AlignedVec::from_slice(&[0.5; 8], AVX_ALIGNMENT).unwrap();
        unsafe {
            let r = F32x8::splat(3.0)
                .fmadd(F32x8::load_aligned(a.as_ptr()), F32x8::load_aligned(b.as_ptr()));
            assert_eq!(
                lanes(r),
                [3.5, 6.5, 9.5, 12.5, 15.5, 18.5, 21.5, 24.5]
            );
        }
    }
}
