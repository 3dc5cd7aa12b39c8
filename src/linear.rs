//! Sequential triple-loop kernels.
//!
//! All six nestings of `i` (row of P and R), `k` (reduction) and `j` (column
//! of Q and R) share one scalar update; a [`LoopOrder`] only
//! decides which loop variable is outermost, middle and innermost. The order
//! is a type parameter, so each instantiation compiles to its own loop nest
//! with the index mapping folded away.
//!
//! | Order | Inner loop walks | Inner stride on P / Q / R |
//! |-------|------------------|---------------------------|
//! | `ijk` | `k` | 1 / n / 0 |
//! | `ikj` | `j` | 0 / 1 / 1 |
//! | `jik` | `k` | 1 / n / 0 |
//! | `jki` | `i` | n / 0 / n |
//! | `kij` | `j` | 0 / 1 / 1 |
//! | `kji` | `i` | n / 0 / n |
//!
//! Whatever the nesting, each `R[i][j]` receives its terms in increasing `k`,
//! so all six orders produce bit-identical results. Only the memory access
//! pattern, and with it the speed, differs.
//!
//! All matrices are `n × n`, row-major. P, Q and R must not overlap; taking
//! `&[f32]`, `&[f32]` and `&mut [f32]` makes that a compile-time guarantee.

#[inline(always)]
pub(crate) fn check_dims(p: &[f32], q: &[f32], r: &[f32], n: usize) {
    let len = n * n;
    debug_assert_eq!(p.len(), len, "P: expected {n}x{n}={len} elements");
    debug_assert_eq!(q.len(), len, "Q: expected {n}x{n}={len} elements");
    debug_assert_eq!(r.len(), len, "R: expected {n}x{n}={len} elements");
}

/// A nesting order of the three loop variables.
pub trait LoopOrder {
    /// Short name such as `"ikj"`, outermost variable first.
    const NAME: &'static str;

    /// Maps (outer, middle, inner) loop counters to `(i, j, k)`.
    fn ijk(outer: usize, middle: usize, inner: usize) -> (usize, usize, usize);
}

/// `for i { for j { for k } }`
#[derive(Debug, Clone, Copy)]
pub struct Ijk;
/// `for i { for k { for j } }`
#[derive(Debug, Clone, Copy)]
pub struct Ikj;
/// `for j { for i { for k } }`
#[derive(Debug, Clone, Copy)]
pub struct Jik;
/// `for j { for k { for i } }`
#[derive(Debug, Clone, Copy)]
pub struct Jki;
/// `for k { for i { for j } }`
#[derive(Debug, Clone, Copy)]
pub struct Kij;
/// `for k { for j { for i } }`
#[derive(Debug, Clone, Copy)]
pub struct Kji;

impl LoopOrder for Ijk {
    const NAME: &'static str = "ijk";
    #[inline(always)]
    fn ijk(x: usize, y: usize, z: usize) -> (usize, usize, usize) {
        (x, y, z)
    }
}

impl LoopOrder for Ikj {
    const NAME: &'static str = "ikj";
    #[inline(always)]
    fn ijk(x: usize, y: usize, z: usize) -> (usize, usize, usize) {
        (x, z, y)
    }
}

impl LoopOrder for Jik {
    const NAME: &'static str = "jik";
    #[inline(always)]
    fn ijk(x: usize, y: usize, z: usize) -> (usize, usize, usize) {
        (y, x, z)
    }
}

impl LoopOrder for Jki {
    const NAME: &'static str = "jki";
    #[inline(always)]
    fn ijk(x: usize, y: usize, z: usize) -> (usize, usize, usize) {
        (z, x, y)
    }
}

impl LoopOrder for Kij {
    const NAME: &'static str = "kij";
    #[inline(always)]
    fn ijk(x: usize, y: usize, z: usize) -> (usize, usize, usize) {
        (y, z, x)
    }
}

impl LoopOrder for Kji {
    const NAME: &'static str = "kji";
    #[inline(always)]
    fn ijk(x: usize, y: usize, z: usize) -> (usize, usize, usize) {
        (z, y, x)
    }
}

/// `R[i][j] += P[i][k] * Q[k][j]`, the only arithmetic every order performs.
#[inline(always)]
fn update(p: &[f32], q: &[f32], r: &mut [f32], n: usize, i: usize, j: usize, k: usize) {
    r[i * n + j] += p[i * n + k] * q[k * n + j];
}

/// Computes `R = P · Q` with the loop nesting given by `O`.
///
/// R is zeroed first, so its previous contents do not matter.
///
/// # Preconditions
///
/// `p`, `q` and `r` each hold `n * n` elements. Lengths are only checked in
/// debug builds; a short slice panics on an out-of-bounds index.
///
/// # Example
///
/// ```rust
/// use matmul_kernels::linear::{matmul, Kji};
///
/// let p = [1.0f32, 2.0, 3.0, 4.0];
/// let q = [5.0f32, 6.0, 7.0, 8.0];
/// let mut r = [0.0f32; 4];
/// matmul::<Kji>(&p, &q, &mut r, 2);
/// assert_eq!(r, [19.0, 22.0, 43.0, 50.0]);
/// ```
pub fn matmul<O: LoopOrder>(p: &[f32], q: &[f32], r: &mut [f32], n: usize) {
    check_dims(p, q, r, n);
    r.fill(0.0);

    for x in 0..n {
        for y in 0..n {
            for z in 0..n {
                let (i, j, k) = O::ijk(x, y, z);
                update(p, q, r, n, i, j, k);
            }
        }
    }
}

/// Textbook `i-j-k` multiply with a running sum per output cell.
///
/// Every access is bounds-checked and nothing is hoisted out of the loops.
/// This is the reference the other kernels are tested against, not a
/// kernel anyone should benchmark for speed.
pub fn naive_ijk(p: &[f32], q: &[f32], r: &mut [f32], n: usize) {
    assert_eq!(p.len(), n * n, "P: expected {}x{} elements", n, n);
    assert_eq!(q.len(), n * n, "Q: expected {}x{} elements", n, n);
    assert_eq!(r.len(), n * n, "R: expected {}x{} elements", n, n);

    for i in 0..n {
        for j in 0..n {
            let mut sum = 0.0f32;
            for k in 0..n {
                sum += p[i * n + k] * q[k * n + j];
            }
            r[i * n + j] = sum;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_all_orders(p: &[f32], q: &[f32], n: usize) -> Vec<(&'static str, Vec<f32>)> {
        let mut out = Vec::new();
        let mut r = vec![f32::NAN; n * n];
        matmul::<Ijk>(p, q, &mut r, n);
        out.push((Ijk::NAME, r.clone()));
        matmul::<Ikj>(p, q, &mut r, n);
        out.push((Ikj::NAME, r.clone()));
        matmul::<Jik>(p, q, &mut r, n);
        out.push((Jik::NAME, r.clone()));
        matmul::<Jki>(p, q, &mut r, n);
        out.push((Jki::NAME, r.clone()));
        matmul::<Kij>(p, q, &mut r, n);
        out.push((Kij::NAME, r.clone()));
        matmul::<Kji>(p, q, &mut r, n);
        out.push((Kji::NAME, r));
        out
    }

    #[test]
    fn test_two_by_two_all_orders() {
        let p = [1.0, 2.0, 3.0, 4.0];
        let q = [5.0, 6.0, 7.0, 8.0];
        for (name, r) in run_all_orders(&p, &q, 2) {
            assert_eq!(r, vec![19.0, 22.0, 43.0, 50.0], "order {name}");
        }

        let mut r = [0.0; 4];
        naive_ijk(&p, &q, &mut r, 2);
        assert_eq!(r, [19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_orders_bit_identical_to_naive_on_odd_size() {
        let n = 37;
        let p: Vec<f32> = (0..n * n).map(|x| (x % 13) as f32 / 7.0).collect();
        let q: Vec<f32> = (0..n * n).map(|x| ((x + 5) % 11) as f32 / 3.0).collect();
        let mut expected = vec![0.0; n * n];
        naive_ijk(&p, &q, &mut expected, n);

        for (name, r) in run_all_orders(&p, &q, n) {
            assert_eq!(r, expected, "order {name}");
        }
    }

    #[test]
    fn test_output_is_overwritten_not_accumulated() {
        let n = 3;
        let p = vec![1.0; n * n];
        let q = vec![1.0; n * n];
        for (name, r) in run_all_orders(&p, &q, n) {
            assert!(r.iter().all(|&x| x == 3.0), "order {name}: {r:?}");
        }
    }

    #[test]
    fn test_empty_matrix() {
        let mut r: Vec<f32> = Vec::new();
        matmul::<Jki>(&[], &[], &mut r, 0);
        naive_ijk(&[], &[], &mut r, 0);
        assert!(r.is_empty());
    }

    #[test]
    fn test_index_mapping_is_a_permutation() {
        fn check<O: LoopOrder>() {
            let (i, j, k) = O::ijk(10, 20, 30);
            let mut v = [i, j, k];
            v.sort_unstable();
            assert_eq!(v, [10, 20, 30], "order {}", O::NAME);

            let name: Vec<char> = O::NAME.chars().collect();
            let pos = |c: char| [10, 20, 30][name.iter().position(|&x| x == c).unwrap()];
            assert_eq!((i, j, k), (pos('i'), pos('j'), pos('k')), "order {}", O::NAME);
        }
        check::<Ijk>();
        check::<Ikj>();
        check::<Jik>();
        check::<Jki>();
        check::<Kij>();
        check::<Kji>();
    }
}
