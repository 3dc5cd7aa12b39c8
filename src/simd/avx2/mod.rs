//! AVX2 SIMD implementations for 256-bit vector operations.
//!
//! # Architecture Requirements
//!
//! - **CPU Support**: Intel Haswell (2013+) or AMD Excavator (2015+)
//! - **Instruction Sets**: AVX2 and FMA
//! - **Target Architecture**: x86 or x86_64
//! - **Runtime Detection**: [`avx2_fma_available`] is checked before any
//!   code in this module runs
//!
//! # Available Types
//!
//! - [`f32x8::F32x8`]: 256-bit vector containing 8 packed single-precision values

pub mod f32x8;

/// Whether this CPU can run the AVX2 + FMA code paths.
#[inline]
pub fn avx2_fma_available() -> bool {
    is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma")
}
