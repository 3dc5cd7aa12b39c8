//! Buffer plumbing shared by the driver, the tests and the benches.
//!
//! None of this sits on a kernel's hot path: it allocates the aligned
//! operands, fills them, and reduces a result to a checksum for display.

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::fmt;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use rand::Rng;

use crate::error::{allocation_error, layout_error, MatmulError, Result};
use crate::ALIGNMENT;

/// An owned, zero-initialized `f32` buffer with a caller-chosen alignment.
///
/// `Vec<f32>` only guarantees 4-byte alignment, which is not enough for
/// `_mm256_load_ps`/`_mm256_store_ps`. `AlignedVec` allocates through
/// `std::alloc` with an explicit [`Layout`] and frees with that same layout,
/// so it can never be handed to a `Vec` with a mismatched allocator.
///
/// It dereferences to `[f32]`, which is all the kernels ever see.
///
/// # Example
///
/// ```rust
/// use matmul_kernels::utils::AlignedVec;
///
/// let buf = AlignedVec::new_zeroed(64, 32).unwrap();
/// assert_eq!(buf.len(), 64);
/// assert_eq!(buf.as_ptr() as usize % 32, 0);
/// assert!(buf.iter().all(|&x| x == 0.0));
/// ```
pub struct AlignedVec {
    ptr: NonNull<f32>,
    len: usize,
    layout: Layout,
}

// SAFETY: `AlignedVec` uniquely owns its allocation, exactly like `Vec<f32>`.
unsafe impl Send for AlignedVec {}
// SAFETY: shared access only hands out `&[f32]`.
unsafe impl Sync for AlignedVec {}

impl AlignedVec {
    /// Allocates `len` zeroed floats aligned to `align` bytes.
    ///
    /// # Errors
    ///
    /// - [`MatmulError::LayoutError`](crate::error::MatmulError::LayoutError)
    ///   if `align` is not a power of two, is smaller than the natural
    ///   alignment of `f32`, or the byte size overflows.
    /// - [`MatmulError::AllocationError`](crate::error::MatmulError::AllocationError)
    ///   if the allocator returns null.
    pub fn new_zeroed(len: usize, align: usize) -> Result<Self> {
        if !align.is_power_of_two() || align < mem::align_of::<f32>() {
            return Err(layout_error(
                len,
                align,
                "alignment must be a power of two and at least 4",
            ));
        }

        let size = len
            .checked_mul(mem::size_of::<f32>())
            .ok_or_else(|| layout_error(len, align, "byte size overflows usize"))?;

        let layout = Layout::from_size_align(size, align)
            .map_err(|_| layout_error(len, align, "byte size exceeds isize::MAX"))?;

        if size == 0 {
            // Zero-sized allocations are not allowed; an address equal to the
            // alignment is non-null and suitably aligned for an empty slice.
            let ptr = NonNull::new(align as *mut f32)
                .ok_or_else(|| layout_error(len, align, "null dangling pointer"))?;
            return Ok(AlignedVec { ptr, len, layout });
        }

        // SAFETY: `layout` has a non-zero size.
        let raw = unsafe { alloc_zeroed(layout) } as *mut f32;

        let ptr = NonNull::new(raw).ok_or_else(|| allocation_error(size, align))?;

        Ok(AlignedVec { ptr, len, layout })
    }

    /// Allocates a zeroed square `n × n` matrix with the crate-wide
    /// [`ALIGNMENT`] (32 bytes), suitable for every kernel.
    ///
    /// # Errors
    ///
    /// [`MatmulError::MatrixTooLarge`] if `n * n` overflows, otherwise as
    /// [`AlignedVec::new_zeroed`].
    pub fn square(n: usize) -> Result<Self> {
        let len = n.checked_mul(n).ok_or(MatmulError::MatrixTooLarge { n })?;
        Self::new_zeroed(len, ALIGNMENT)
    }

    /// Allocates an aligned copy of `data`.
    pub fn from_slice(data: &[f32], align: usize) -> Result<Self> {
        let mut buf = Self::new_zeroed(data.len(), align)?;
        buf.copy_from_slice(data);
        Ok(buf)
    }

    /// The alignment this buffer was allocated with, in bytes.
    pub fn alignment(&self) -> usize {
        self.layout.align()
    }
}

impl Drop for AlignedVec {
    fn drop(&mut self) {
        if self.layout.size() > 0 {
            // SAFETY: allocated in `new_zeroed` with exactly this layout.
            unsafe { dealloc(self.ptr.as_ptr() as *mut u8, self.layout) }
        }
    }
}

impl Deref for AlignedVec {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        // SAFETY: `ptr` is valid for `len` initialized floats (zeroed on allocation).
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl DerefMut for AlignedVec {
    fn deref_mut(&mut self) -> &mut [f32] {
        // SAFETY: as above, and `&mut self` guarantees exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl fmt::Debug for AlignedVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlignedVec")
            .field("len", &self.len)
            .field("align", &self.layout.align())
            .finish()
    }
}

/// Returns `true` when `ptr` sits on an `align`-byte boundary.
#[inline(always)]
pub fn is_aligned_to(ptr: *const f32, align: usize) -> bool {
    (ptr as usize) % align == 0
}

/// Fills `m` with values drawn uniformly from `[0, 1)`.
///
/// Non-negative entries keep every element of the product positive, which
/// makes [`checksum`] a meaningful sanity value.
pub fn fill_random<R: Rng + ?Sized>(m: &mut [f32], rng: &mut R) {
    for x in m.iter_mut() {
        *x = rng.random_range(0.0..1.0);
    }
}

/// Sum of all elements, accumulated in `f64`.
pub fn checksum(m: &[f32]) -> f64 {
    m.iter().map(|&x| x as f64).sum()
}

/// Throughput of one `n × n` multiplication that took `seconds`.
///
/// Counts `2·n³` floating point operations (one multiply and one add per
/// inner step).
pub fn gflops(n: usize, seconds: f64) -> f64 {
    let n = n as f64 / 1000.0;
    2.0 * n * n * n / seconds
}

/// Row-major `n × n` identity matrix.
pub fn identity(n: usize) -> Vec<f32> {
    let mut m = vec![0.0f32; n * n];
    for i in 0..n {
        m[i * n + i] = 1.0;
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_aligned_vec_alignment() {
        for &align in &[4usize, 16, 32, 64, 4096] {
            let buf = AlignedVec::new_zeroed(37, align).unwrap();
            assert!(is_aligned_to(buf.as_ptr(), align), "align {align}");
            assert_eq!(buf.alignment(), align);
            assert_eq!(buf.len(), 37);
        }
    }

    #[test]
    fn test_aligned_vec_is_zeroed_and_writable() {
        let mut buf = AlignedVec::square(16).unwrap();
        assert!(buf.iter().all(|&x| x == 0.0));
        buf[255] = 3.5;
        assert_eq!(buf[255], 3.5);
    }

    #[test]
    fn test_aligned_vec_empty() {
        let buf = AlignedVec::square(0).unwrap();
        assert!(buf.is_empty());
        assert!(is_aligned_to(buf.as_ptr(), ALIGNMENT));
    }

    #[test]
    fn test_aligned_vec_rejects_bad_alignment() {
        let err = AlignedVec::new_zeroed(8, 24).unwrap_err();
        assert!(matches!(err, MatmulError::LayoutError { alignment: 24, .. }));

        let err = AlignedVec::new_zeroed(8, 2).unwrap_err();
        assert!(matches!(err, MatmulError::LayoutError { .. }));
    }

    #[test]
    fn test_aligned_vec_rejects_overflow() {
        let err = AlignedVec::new_zeroed(usize::MAX, 32).unwrap_err();
        assert_eq!(
            err,
            MatmulError::LayoutError {
                len: usize::MAX,
                alignment: 32,
                reason: "byte size overflows usize",
            }
        );

        let err = AlignedVec::new_zeroed(usize::MAX / 4, 32).unwrap_err();
        assert!(matches!(
            err,
            MatmulError::LayoutError {
                reason: "byte size exceeds isize::MAX",
                ..
            }
        ));
    }

    #[test]
    fn test_square_rejects_side_that_overflows() {
        let n = 1usize << (usize::BITS / 2);
        assert_eq!(AlignedVec::square(n).unwrap_err(), MatmulError::MatrixTooLarge { n });
    }

    #[test]
    fn test_from_slice_copies() {
        let data = [1.0f32, 2.0, 3.0];
        let buf = AlignedVec::from_slice(&data, 32).unwrap();
        assert_eq!(&buf[..], &data);
    }

    #[test]
    fn test_fill_random_range() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut m = vec![0.0f32; 1000];
        fill_random(&mut m, &mut rng);
        assert!(m.iter().all(|&x| (0.0..1.0).contains(&x)));
        assert!(m.iter().any(|&x| x != m[0]));
    }

    #[test]
    fn test_checksum_and_identity() {
        let id = identity(5);
        assert_eq!(checksum(&id), 5.0);
        assert_eq!(id[0], 1.0);
        assert_eq!(id[6], 1.0);
        assert_eq!(id[1], 0.0);
    }

    #[test]
    fn test_gflops() {
        // 2 * 1000^3 flops in one second
        assert!((gflops(1000, 1.0) - 2.0).abs() < 1e-12);
        assert!((gflops(2000, 2.0) - 8.0).abs() < 1e-12);
    }
}
