//! `i-k-j` kernel shaped for the compiler's auto-vectorizer.
//!
//! There are no intrinsics here. The inner loop is a zip over one row of R
//! (`&mut [f32]`) and one row of Q (`&[f32]`): both are contiguous, their
//! lengths are equal by construction so bounds checks disappear, and the
//! borrow checker guarantees they do not overlap. That is everything LLVM
//! needs to emit packed multiply-adds for the loop body. Whether it actually
//! does is what this kernel exists to measure.

use crate::linear::check_dims;

/// Computes `R = P · Q` with `i-k-j` nesting over row slices.
///
/// Numerically identical to [`linear::matmul::<Ikj>`](crate::linear::matmul):
/// each `R[i][j]` receives the same terms in the same order.
///
/// # Example
///
/// ```rust
/// use matmul_kernels::autovec::matmul_ikj_auto;
///
/// let p = [1.0f32, 2.0, 3.0, 4.0];
/// let q = [5.0f32, 6.0, 7.0, 8.0];
/// let mut r = [0.0f32; 4];
/// matmul_ikj_auto(&p, &q, &mut r, 2);
/// assert_eq!(r, [19.0, 22.0, 43.0, 50.0]);
/// ```
pub fn matmul_ikj_auto(p: &[f32], q: &[f32], r: &mut [f32], n: usize) {
    check_dims(p, q, r, n);
    r.fill(0.0);

    if n == 0 {
        return;
    }

    for (r_row, p_row) in r.chunks_exact_mut(n).zip(p.chunks_exact(n)) {
        for (&p_ik, q_row) in p_row.iter().zip(q.chunks_exact(n)) {
            for (r_ij, &q_kj) in r_row.iter_mut().zip(q_row) {
                *r_ij += p_ik * q_kj;
            }
        }
    }
}
