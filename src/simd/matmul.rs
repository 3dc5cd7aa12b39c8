//! # Broadcast/FMA vector kernels (`i-k-j`)
//!
//! For every row `i` of R and every reduction step `k`:
//!
//! 1. broadcast `P[i][k]` into all 8 lanes,
//! 2. load 8 consecutive floats of row `k` of Q,
//! 3. fused-multiply-add them into the same 8 columns of row `i` of R,
//! 4. store back.
//!
//! Eight output columns are updated per instruction while the reduction over
//! `k` stays sequential, so each `R[i][j]` sees its terms in the same order as
//! the scalar `i-k-j` kernel. Only the single rounding of FMA makes the last
//! bits differ.
//!
//! ## Preconditions (checked with `assert!`, once per call)
//!
//! - `n` is a multiple of [`VECTOR_WIDTH`] (8). There is no remainder loop:
//!   a size that does not divide evenly is rejected, never truncated.
//! - `p`, `q`, `r` each hold `n * n` elements.
//! - `q` and `r` start on an [`ALIGNMENT`] (32-byte) boundary. Together with
//!   `n % 8 == 0` this makes every row start aligned, so every load and store
//!   is an aligned one. Allocate with [`AlignedVec`](crate::utils::AlignedVec).
//!
//! No buffer is allocated; R is updated in place.
//!
//! The AVX2/FMA path is taken when the CPU supports it; otherwise the same
//! code runs over [`F32x8Portable`].

use rayon::prelude::*;

use crate::error::{validation_error, Result};
use crate::simd::portable::F32x8Portable;
use crate::simd::traits::SimdVec;
use crate::utils::is_aligned_to;
use crate::{ALIGNMENT, VECTOR_WIDTH};

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
use crate::simd::avx2::{avx2_fma_available, f32x8::F32x8};

/// One row of R: zero it, then accumulate `P[i][..] · Q`.
type RowKernel = unsafe fn(&[f32], &[f32], &mut [f32], usize);

/// Checks the size precondition without running anything.
///
/// Lets a harness refuse the kernel for an `n` it cannot handle.
pub fn check_size(n: usize) -> Result<()> {
    if n % VECTOR_WIDTH != 0 {
        return Err(validation_error(format!(
            "n = {} is not a multiple of the vector width {}",
            n, VECTOR_WIDTH
        )));
    }
    Ok(())
}

/// Name of the instruction set the vector kernels will use on this CPU.
pub fn vector_backend() -> &'static str {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        if avx2_fma_available() {
            return "AVX2+FMA";
        }
    }
    "portable"
}

fn assert_preconditions(p: &[f32], q: &[f32], r: &[f32], n: usize) {
    assert!(
        n % VECTOR_WIDTH == 0,
        "n = {} must be a multiple of the vector width {}",
        n,
        VECTOR_WIDTH
    );
    assert_eq!(p.len(), n * n, "P: expected {}x{} elements", n, n);
    assert_eq!(q.len(), n * n, "Q: expected {}x{} elements", n, n);
    assert_eq!(r.len(), n * n, "R: expected {}x{} elements", n, n);
    if n > 0 {
        assert!(
            is_aligned_to(q.as_ptr(), ALIGNMENT),
            "Q must be {}-byte aligned",
            ALIGNMENT
        );
        assert!(
            is_aligned_to(r.as_ptr(), ALIGNMENT),
            "R must be {}-byte aligned",
            ALIGNMENT
        );
    }
}

#[inline(always)]
unsafe fn zero_row<V: SimdVec>(r_row: &mut [f32]) {
    let zero = V::zeros();
    for chunk in r_row.chunks_exact_mut(V::LANES) {
        zero.store_aligned_at(chunk.as_mut_ptr());
    }
}

/// `R[i][..] += P[i][k] * Q[k][..]` for every `k`, 8 columns at a time.
///
/// # Safety
///
/// `r_row` and every row of `q` are `n` long, aligned, and `n % V::LANES == 0`.
#[inline(always)]
unsafe fn accumulate_row<V: SimdVec>(p_row: &[f32], q: &[f32], r_row: &mut [f32], n: usize) {
    let r_ptr = r_row.as_mut_ptr();
    for (k, &p_ik) in p_row.iter().enumerate() {
        let pv = V::splat(p_ik);
        let q_row = q.as_ptr().add(k * n);
        for j in (0..n).step_by(V::LANES) {
            let rv = V::load_aligned(r_ptr.add(j));
            let qv = V::load_aligned(q_row.add(j));
            pv.fmadd(qv, rv).store_aligned_at(r_ptr.add(j));
        }
    }
}

/// Zeroes all of R with wide stores, then runs the row updates.
///
/// # Safety
///
/// Preconditions of the module hold and `n > 0`.
#[inline(always)]
unsafe fn ikj_simd<V: SimdVec>(p: &[f32], q: &[f32], r: &mut [f32], n: usize) {
    for r_row in r.chunks_exact_mut(n) {
        zero_row::<V>(r_row);
    }
    for (r_row, p_row) in r.chunks_exact_mut(n).zip(p.chunks_exact(n)) {
        accumulate_row::<V>(p_row, q, r_row, n);
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[target_feature(enable = "avx2,fma")]
unsafe fn ikj_simd_avx2(p: &[f32], q: &[f32], r: &mut [f32], n: usize) {
    ikj_simd::<F32x8>(p, q, r, n)
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[target_feature(enable = "avx2,fma")]
unsafe fn row_avx2(p_row: &[f32], q: &[f32], r_row: &mut [f32], n: usize) {
    zero_row::<F32x8>(r_row);
    accumulate_row::<F32x8>(p_row, q, r_row, n);
}

unsafe fn row_portable(p_row: &[f32], q: &[f32], r_row: &mut [f32], n: usize) {
    zero_row::<F32x8Portable>(r_row);
    accumulate_row::<F32x8Portable>(p_row, q, r_row, n);
}

fn select_row_kernel() -> RowKernel {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        if avx2_fma_available() {
            return row_avx2;
        }
    }
    row_portable
}

/// Computes `R = P · Q` with 8-wide broadcast/FMA row updates.
///
/// # Panics
///
/// If `n` is not a multiple of 8, a slice is not `n * n` long, or `q`/`r`
/// are not 32-byte aligned.
///
/// # Example
///
/// ```rust
/// use matmul_kernels::simd::matmul::matmul_ikj_simd;
/// use matmul_kernels::utils::{identity, AlignedVec};
///
/// let n = 8;
/// let p = AlignedVec::from_slice(&identity(n), 32).unwrap();
/// let q = AlignedVec::from_slice(&(0..64).map(|x| x as f32).collect::<Vec<_>>(), 32).unwrap();
/// let mut r = AlignedVec::square(n).unwrap();
///
/// matmul_ikj_simd(&p, &q, &mut r, n);
/// assert_eq!(&r[..], &q[..]);
/// ```
pub fn matmul_ikj_simd(p: &[f32], q: &[f32], r: &mut [f32], n: usize) {
    assert_preconditions(p, q, r, n);
    if n == 0 {
        return;
    }
    log::debug!("ikj simd: n = {}, backend = {}", n, vector_backend());

    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        if avx2_fma_available() {
            // SAFETY: features detected above; preconditions asserted.
            unsafe { ikj_simd_avx2(p, q, r, n) };
            return;
        }
    }

    // SAFETY: preconditions asserted.
    unsafe { ikj_simd::<F32x8Portable>(p, q, r, n) }
}

/// [`matmul_ikj_simd`] with the rows of R distributed over the rayon pool.
///
/// Each task owns one row of R (a disjoint `&mut` chunk), zeroes it and
/// runs the same row update, so the result is bit-identical to the
/// sequential kernel.
///
/// # Panics
///
/// Same preconditions as [`matmul_ikj_simd`].
pub fn par_matmul_ikj_simd(p: &[f32], q: &[f32], r: &mut [f32], n: usize) {
    assert_preconditions(p, q, r, n);
    if n == 0 {
        return;
    }
    log::debug!(
        "parallel ikj simd: n = {}, backend = {}, threads = {}",
        n,
        vector_backend(),
        rayon::current_num_threads()
    );

    let row_kernel = select_row_kernel();

    r.par_chunks_mut(n)
        .zip(p.par_chunks(n))
        .for_each(|(r_row, p_row)| {
            // SAFETY: the kernel matches this CPU; every row is aligned since
            // `r`/`q` are and `n % 8 == 0`.
            unsafe { row_kernel(p_row, q, r_row, n) }
        });
}
