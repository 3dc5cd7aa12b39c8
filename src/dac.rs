//! # Parallel divide-and-conquer multiply
//!
//! `C += A · B` on a `b × b` block is split into quadrants:
//!
//! ```text
//! | C00 C01 |    | A00 A01 |   | B00 B01 |
//! | C10 C11 | += | A10 A11 | · | B10 B11 |
//!
//! phase 1:  C00 += A00·B00   C01 += A00·B01   C10 += A10·B00   C11 += A10·B01
//! ---------------------------- barrier -----------------------------------
//! phase 2:  C00 += A01·B10   C01 += A01·B11   C10 += A11·B10   C11 += A11·B11
//! ```
//!
//! The four calls of a phase write four disjoint quadrants of C and run
//! concurrently through nested [`rayon::join`]. Both phases write every
//! quadrant, so phase 2 must not start before all of phase 1 has returned;
//! the enclosing `join` returning is that barrier. With that ordering no two
//! running tasks ever touch the same element of C, and no locks are needed.
//!
//! Quadrants are strided views into the caller's buffers (same row stride
//! `n` at every depth); nothing is copied. Once a block side is at or below
//! the threshold the recursion stops and a scalar `i-k-j` loop accumulates
//! the block product into C.
//!
//! C is zeroed once, in parallel, before the recursion starts.
//!
//! ## Precondition
//!
//! Every block larger than the threshold must have an even side, i.e. `n`
//! halves exactly until it reaches the threshold. Any power of two works for
//! any threshold. Other sizes are rejected up front with a panic (see
//! [`check_size`]) rather than multiplying partial blocks.

use std::marker::PhantomData;

use rayon::prelude::*;

use crate::error::{validation_error, Result};
use crate::DAC_THRESHOLD;

/// Read-only strided view of a square block inside a row-major buffer.
#[derive(Clone, Copy)]
struct BlockRef<'a> {
    ptr: *const f32,
    stride: usize,
    _marker: PhantomData<&'a [f32]>,
}

/// Writable strided view of a square block inside a row-major buffer.
#[derive(Clone, Copy)]
struct BlockMut<'a> {
    ptr: *mut f32,
    stride: usize,
    _marker: PhantomData<&'a mut [f32]>,
}

// SAFETY: a `BlockRef` only reads memory borrowed immutably for `'a`.
unsafe impl Send for BlockRef<'_> {}
unsafe impl Sync for BlockRef<'_> {}

// SAFETY: tasks holding `BlockMut`s that run at the same time always cover
// disjoint quadrants (see the module docs); a view is never written from two
// threads at once.
unsafe impl Send for BlockMut<'_> {}
unsafe impl Sync for BlockMut<'_> {}

impl<'a> BlockRef<'a> {
    fn whole(m: &'a [f32], n: usize) -> Self {
        debug_assert_eq!(m.len(), n * n);
        BlockRef {
            ptr: m.as_ptr(),
            stride: n,
            _marker: PhantomData,
        }
    }

    /// Quadrant `(row, col)`, each in `{0, 1}`, of a block of side `b`.
    ///
    /// # Safety
    ///
    /// `self` covers a `b × b` block with `b` even.
    #[inline(always)]
    unsafe fn quadrant(self, row: usize, col: usize, b: usize) -> Self {
        let h = b / 2;
        BlockRef {
            ptr: self.ptr.add((row * self.stride + col) * h),
            ..self
        }
    }

    /// Row `i` of the block, `len` elements wide.
    ///
    /// # Safety
    ///
    /// `i < b` and `len <= b` for the block side `b` this view covers.
    #[inline(always)]
    unsafe fn row(&self, i: usize, len: usize) -> &'a [f32] {
        std::slice::from_raw_parts(self.ptr.add(i * self.stride), len)
    }
}

impl<'a> BlockMut<'a> {
    fn whole(m: &'a mut [f32], n: usize) -> Self {
        debug_assert_eq!(m.len(), n * n);
        BlockMut {
            ptr: m.as_mut_ptr(),
            stride: n,
            _marker: PhantomData,
        }
    }

    /// # Safety
    ///
    /// Same as [`BlockRef::quadrant`].
    #[inline(always)]
    unsafe fn quadrant(self, row: usize, col: usize, b: usize) -> Self {
        let h = b / 2;
        BlockMut {
            ptr: self.ptr.add((row * self.stride + col) * h),
            ..self
        }
    }

    /// # Safety
    ///
    /// Same as [`BlockRef::row`], and no other live reference overlaps the
    /// returned row.
    #[inline(always)]
    #[allow(clippy::mut_from_ref)]
    unsafe fn row_mut(&self, i: usize, len: usize) -> &mut [f32] {
        std::slice::from_raw_parts_mut(self.ptr.add(i * self.stride), len)
    }
}

/// Whether `n` halves exactly at every level above `threshold`.
pub fn splits_evenly(n: usize, threshold: usize) -> bool {
    let mut b = n;
    while b > threshold {
        if b % 2 != 0 {
            return false;
        }
        b /= 2;
    }
    true
}

/// Checks the size precondition for a given base-case threshold.
///
/// Lets a harness refuse the kernel for an `n` it cannot handle.
pub fn check_size(n: usize, threshold: usize) -> Result<()> {
    if threshold == 0 {
        return Err(validation_error("base-case threshold must be at least 1"));
    }
    if !splits_evenly(n, threshold) {
        return Err(validation_error(format!(
            "n = {} does not halve evenly down to the base-case threshold {}",
            n, threshold
        )));
    }
    Ok(())
}

/// Number of recursive levels above the base case for `n`.
pub fn depth(n: usize, threshold: usize) -> u32 {
    let mut b = n;
    let mut levels = 0;
    while b > threshold && b % 2 == 0 {
        b /= 2;
        levels += 1;
    }
    levels
}

/// `C += A · B` on one `b × b` block, scalar `i-k-j`.
///
/// # Safety
///
/// The views cover `b × b` blocks and no other task is writing `c`.
#[inline]
unsafe fn base_case(c: BlockMut<'_>, a: BlockRef<'_>, bm: BlockRef<'_>, b: usize) {
    for i in 0..b {
        let c_row = c.row_mut(i, b);
        let a_row = a.row(i, b);
        for (k, &a_ik) in a_row.iter().enumerate() {
            let b_row = bm.row(k, b);
            for (c_ij, &b_kj) in c_row.iter_mut().zip(b_row) {
                *c_ij += a_ik * b_kj;
            }
        }
    }
}

/// `C += A · B` on a `b × b` block, recursing in two fork/join phases.
///
/// # Safety
///
/// The views cover `b × b` blocks of buffers with stride `n`, `b` halves
/// evenly down to `threshold`, and no task outside this call writes `c`.
unsafe fn recurse(c: BlockMut<'_>, a: BlockRef<'_>, bm: BlockRef<'_>, b: usize, threshold: usize) {
    if b <= threshold {
        base_case(c, a, bm, b);
        return;
    }

    let h = b / 2;
    let (c00, c01, c10, c11) = (
        c.quadrant(0, 0, b),
        c.quadrant(0, 1, b),
        c.quadrant(1, 0, b),
        c.quadrant(1, 1, b),
    );
    let (a00, a01, a10, a11) = (
        a.quadrant(0, 0, b),
        a.quadrant(0, 1, b),
        a.quadrant(1, 0, b),
        a.quadrant(1, 1, b),
    );
    let (b00, b01, b10, b11) = (
        bm.quadrant(0, 0, b),
        bm.quadrant(0, 1, b),
        bm.quadrant(1, 0, b),
        bm.quadrant(1, 1, b),
    );

    // Phase 1: C[I][J] += A[I][0] · B[0][J]
    rayon::join(
        || {
            rayon::join(
                || recurse(c00, a00, b00, h, threshold),
                || recurse(c01, a00, b01, h, threshold),
            )
        },
        || {
            rayon::join(
                || recurse(c10, a10, b00, h, threshold),
                || recurse(c11, a10, b01, h, threshold),
            )
        },
    );

    // Phase 2: C[I][J] += A[I][1] · B[1][J]
    rayon::join(
        || {
            rayon::join(
                || recurse(c00, a01, b10, h, threshold),
                || recurse(c01, a01, b11, h, threshold),
            )
        },
        || {
            rayon::join(
                || recurse(c10, a11, b10, h, threshold),
                || recurse(c11, a11, b11, h, threshold),
            )
        },
    );
}

/// Computes `R = P · Q` by parallel divide-and-conquer with the default
/// base-case threshold ([`DAC_THRESHOLD`], 64).
///
/// Runs on the current rayon pool: the global one (sized to the available
/// parallelism, or `RAYON_NUM_THREADS`) unless called from inside
/// [`rayon::ThreadPool::install`].
///
/// # Panics
///
/// If a slice is not `n * n` long or `n` does not halve evenly down to the
/// threshold (see [`check_size`]).
///
/// # Example
///
/// ```rust
/// use matmul_kernels::dac::matmul_dac;
///
/// let p = [1.0f32, 2.0, 3.0, 4.0];
/// let q = [5.0f32, 6.0, 7.0, 8.0];
/// let mut r = [0.0f32; 4];
/// matmul_dac(&p, &q, &mut r, 2);
/// assert_eq!(r, [19.0, 22.0, 43.0, 50.0]);
/// ```
pub fn matmul_dac(p: &[f32], q: &[f32], r: &mut [f32], n: usize) {
    matmul_dac_with_threshold(p, q, r, n, DAC_THRESHOLD);
}

/// [`matmul_dac`] with an explicit base-case threshold.
///
/// Lower thresholds mean deeper recursion and more, smaller tasks; a
/// threshold of 1 recurses all the way down to single elements.
///
/// # Panics
///
/// If `threshold == 0`, a slice is not `n * n` long, or `n` does not halve
/// evenly down to `threshold`.
pub fn matmul_dac_with_threshold(p: &[f32], q: &[f32], r: &mut [f32], n: usize, threshold: usize) {
    assert_eq!(p.len(), n * n, "P: expected {}x{} elements", n, n);
    assert_eq!(q.len(), n * n, "Q: expected {}x{} elements", n, n);
    assert_eq!(r.len(), n * n, "R: expected {}x{} elements", n, n);
    if let Err(e) = check_size(n, threshold) {
        panic!("{}", e);
    }

    if n == 0 {
        return;
    }

    log::debug!(
        "divide-and-conquer: n = {}, threshold = {}, depth = {}, threads = {}",
        n,
        threshold,
        depth(n, threshold),
        rayon::current_num_threads()
    );

    // Disjoint writes, no reads: zero the rows in parallel before any task
    // starts accumulating.
    r.par_chunks_mut(n).for_each(|row| row.fill(0.0));

    let c = BlockMut::whole(r, n);
    let a = BlockRef::whole(p, n);
    let b = BlockRef::whole(q, n);

    // Called from outside the pool, the first `join` hands the root to one
    // worker, which drives the recursion while the others steal its halves.
    // SAFETY: the views cover the whole `n × n` buffers, the size was
    // checked, and `r` is exclusively borrowed for the duration.
    unsafe { recurse(c, a, b, n, threshold) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linear::naive_ijk;
    use crate::utils::identity;

    fn operands(n: usize) -> (Vec<f32>, Vec<f32>) {
        let p: Vec<f32> = (0..n * n).map(|x| ((x * 3) % 11) as f32 / 5.0).collect();
        let q: Vec<f32> = (0..n * n).map(|x| ((x * 7) % 13) as f32 / 6.0).collect();
        (p, q)
    }

    fn assert_close(actual: &[f32], expected: &[f32]) {
        for (idx, (a, e)) in actual.iter().zip(expected).enumerate() {
            assert!(
                (a - e).abs() <= 1e-4 * e.abs().max(1.0),
                "Mismatch at {}: got {}, expected {}",
                idx,
                a,
                e
            );
        }
    }

    #[test]
    fn test_splits_evenly() {
        assert!(splits_evenly(1024, 64));
        assert!(splits_evenly(64, 64));
        assert!(splits_evenly(3, 64));
        assert!(splits_evenly(192, 64)); // 192 -> 96 -> 48
        assert!(!splits_evenly(202, 64)); // 202 -> 101
    }

    #[test]
    fn test_check_size() {
        assert!(check_size(1024, 64).is_ok());
        assert!(check_size(256, 1).is_ok());
        assert!(check_size(0, 64).is_ok());
        assert!(check_size(96, 8).is_ok()); // 96 -> 48 -> 24 -> 12 -> 6
        assert!(check_size(40, 4).is_err()); // 40 -> 20 -> 10 -> 5
        assert!(check_size(100, 1).is_err());
        assert!(check_size(64, 0).is_err());
    }

    #[test]
    fn test_depth() {
        assert_eq!(depth(64, 64), 0);
        assert_eq!(depth(128, 64), 1);
        assert_eq!(depth(1024, 64), 4);
        assert_eq!(depth(256, 1), 8);
    }

    #[test]
    fn test_base_case_only() {
        let n = 4;
        let id = identity(n);
        let mut r = vec![9.0; n * n];
        matmul_dac(&id, &id, &mut r, n);
        assert_eq!(r, id);
    }

    #[test]
    fn test_matches_naive_across_depths() {
        for &(n, threshold) in &[(128usize, 64usize), (256, 64), (128, 16), (96, 8), (64, 2)] {
            let (p, q) = operands(n);
            let mut expected = vec![0.0; n * n];
            naive_ijk(&p, &q, &mut expected, n);

            let mut r = vec![f32::NAN; n * n];
            matmul_dac_with_threshold(&p, &q, &mut r, n, threshold);
            assert_close(&r, &expected);
        }
    }

    #[test]
    fn test_threshold_one_n_256() {
        let n = 256;
        let (p, q) = operands(n);
        let mut expected = vec![0.0; n * n];
        naive_ijk(&p, &q, &mut expected, n);

        let mut r = vec![0.0; n * n];
        matmul_dac_with_threshold(&p, &q, &mut r, n, 1);
        assert_close(&r, &expected);
    }

    #[test]
    fn test_runs_inside_custom_pool() {
        let n = 128;
        let (p, q) = operands(n);
        let mut expected = vec![0.0; n * n];
        naive_ijk(&p, &q, &mut expected, n);

        let pool = rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap();
        let mut r = vec![0.0; n * n];
        pool.install(|| matmul_dac_with_threshold(&p, &q, &mut r, n, 8));
        assert_close(&r, &expected);
    }

    #[test]
    #[should_panic(expected = "does not halve evenly")]
    fn test_rejects_odd_split() {
        let n = 100;
        let (p, q) = operands(n);
        let mut r = vec![0.0; n * n];
        matmul_dac_with_threshold(&p, &q, &mut r, n, 16);
    }

    #[test]
    fn test_empty_matrix() {
        let mut r: Vec<f32> = Vec::new();
        matmul_dac(&[], &[], &mut r, 0);
    }
}
