//! Architecture-independent 8-lane vector.
//!
//! Used by the vector kernels when AVX2/FMA is unavailable, so they keep the
//! same 8-wide structure, the same alignment contract and the same
//! single-rounding multiply-add on every target.

use crate::simd::traits::{Alignment, SimdFma, SimdLoad, SimdStore, SimdVec};

const LANES: usize = 8;
const ALIGN: usize = 32;

/// Eight `f32` lanes in a 32-byte aligned array.
#[derive(Copy, Clone, Debug, PartialEq)]
#[repr(C, align(32))]
pub struct F32x8Portable(pub [f32; LANES]);

impl Alignment<f32> for F32x8Portable {
    #[inline(always)]
    fn is_aligned(ptr: *const f32) -> bool {
        (ptr as usize) % ALIGN == 0
    }
}

impl SimdLoad<f32> for F32x8Portable {
    type Output = Self;

    #[inline(always)]
    unsafe fn zeros() -> Self {
        Self([0.0; LANES])
    }

    #[inline(always)]
    unsafe fn splat(value: f32) -> Self {
        Self([value; LANES])
    }

    #[inline(always)]
    unsafe fn load_aligned(ptr: *const f32) -> Self {
        debug_assert!(Self::is_aligned(ptr), "pointer is not 32-byte aligned");
        Self(std::ptr::read(ptr as *const [f32; LANES]))
    }
}

impl SimdStore<f32> for F32x8Portable {
    #[inline(always)]
    unsafe fn store_aligned_at(&self, ptr: *mut f32) {
        debug_assert!(Self::is_aligned(ptr), "pointer is not 32-byte aligned");
        std::ptr::write(ptr as *mut [f32; LANES], self.0)
    }
}

impl SimdFma for F32x8Portable {
    #[inline(always)]
    unsafe fn fmadd(self, a: Self, b: Self) -> Self {
        let mut out = b.0;
        for ((o, x), y) in out.iter_mut().zip(self.0).zip(a.0) {
            *o = x.mul_add(y, *o);
        }
        Self(out)
    }
}

impl SimdVec for F32x8Portable {
    const LANES: usize = LANES;
}
