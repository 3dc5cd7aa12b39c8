//! Keyed registry of every kernel in the crate.
//!
//! Each entry pairs a single-character key with a human-readable label, the
//! function to run and the size precondition it needs. The benchmark driver
//! and the integration tests both iterate this table, so a kernel added here
//! is picked up by both.

use crate::error::{MatmulError, Result};
use crate::linear::{self, Ijk, Ikj, Jik, Jki, Kij, Kji};
use crate::{autovec, dac, simd, DAC_THRESHOLD};

/// Signature shared by every kernel: `r = p * q`, all `n × n` row-major.
pub type MatmulFn = fn(&[f32], &[f32], &mut [f32], usize);

/// Size requirement a kernel places on `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// Any `n`, including 0.
    None,
    /// `n` must be a multiple of the vector width, and `Q`/`R` must be
    /// 32-byte aligned.
    VectorWidth,
    /// `n` must halve evenly down to the given base-case threshold.
    HalvesTo(usize),
}

/// One registry entry.
#[derive(Debug, Clone, Copy)]
pub struct Kernel {
    /// Single-character selection key, as passed to `matmul-bench -a`.
    pub key: char,
    /// Label printed in the driver's report.
    pub name: &'static str,
    /// The kernel itself.
    pub func: MatmulFn,
    /// What `n` must satisfy before `func` may be called.
    pub precondition: Precondition,
}

impl Kernel {
    /// Whether this kernel accepts size `n`.
    ///
    /// Alignment is not checked here; buffers from
    /// [`AlignedVec`](crate::utils::AlignedVec) always satisfy it.
    pub fn check(&self, n: usize) -> Result<()> {
        match self.precondition {
            Precondition::None => Ok(()),
            Precondition::VectorWidth => simd::matmul::check_size(n),
            Precondition::HalvesTo(threshold) => dac::check_size(n, threshold),
        }
    }

    /// Runs the kernel.
    ///
    /// # Panics
    ///
    /// Whatever the underlying kernel panics on; call [`Kernel::check`]
    /// first to avoid the size-related ones.
    #[inline]
    pub fn run(&self, p: &[f32], q: &[f32], r: &mut [f32], n: usize) {
        (self.func)(p, q, r, n)
    }

    /// Whether this entry is the divide-and-conquer kernel, whose threshold
    /// can be overridden at run time.
    pub fn is_divide_and_conquer(&self) -> bool {
        matches!(self.precondition, Precondition::HalvesTo(_))
    }
}

static KERNELS: [Kernel; 11] = [
    Kernel {
        key: 'a',
        name: "Serial ijk",
        func: linear::naive_ijk,
        precondition: Precondition::None,
    },
    Kernel {
        key: 'b',
        name: "Serial ijk + opt",
        func: linear::matmul::<Ijk>,
        precondition: Precondition::None,
    },
    Kernel {
        key: 'c',
        name: "Serial ikj + opt",
        func: linear::matmul::<Ikj>,
        precondition: Precondition::None,
    },
    Kernel {
        key: 'd',
        name: "Serial jik + opt",
        func: linear::matmul::<Jik>,
        precondition: Precondition::None,
    },
    Kernel {
        key: 'e',
        name: "Serial jki + opt",
        func: linear::matmul::<Jki>,
        precondition: Precondition::None,
    },
    Kernel {
        key: 'f',
        name: "Serial kij + opt",
        func: linear::matmul::<Kij>,
        precondition: Precondition::None,
    },
    Kernel {
        key: 'g',
        name: "Serial kji + opt",
        func: linear::matmul::<Kji>,
        precondition: Precondition::None,
    },
    Kernel {
        key: 'h',
        name: "ikj + opt + auto SIMD",
        func: autovec::matmul_ikj_auto,
        precondition: Precondition::None,
    },
    Kernel {
        key: 'i',
        name: "ikj + opt + manual SIMD",
        func: simd::matmul::matmul_ikj_simd,
        precondition: Precondition::VectorWidth,
    },
    Kernel {
        key: 'j',
        name: "ikj + opt + manual SIMD + rayon",
        func: simd::matmul::par_matmul_ikj_simd,
        precondition: Precondition::VectorWidth,
    },
    Kernel {
        key: 'k',
        name: "Parallel divide-and-conquer",
        func: dac::matmul_dac,
        precondition: Precondition::HalvesTo(DAC_THRESHOLD),
    },
];

/// Every kernel, in key order.
pub fn all() -> &'static [Kernel] {
    &KERNELS
}

/// Looks up one kernel by key.
pub fn find(key: char) -> Option<&'static Kernel> {
    KERNELS.iter().find(|k| k.key == key)
}

/// Resolves a string of keys such as `"bcik"` to kernels, in the order
/// given. Whitespace is ignored; repeated keys are kept.
pub fn select(keys: &str) -> Result<Vec<&'static Kernel>> {
    keys.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| find(c).ok_or(MatmulError::UnknownKernel { key: c }))
        .collect()
}
