//! Runtime detection of the 128-bit vector unit used by the `f32` fast path.
//!
//! Detection runs once and is cached. With the `simd` feature disabled the
//! level is always [`SimdLevel::Scalar`].

use std::sync::OnceLock;

/// Vector capability available to the packing kernels.
///
/// All variants exist on every platform; only the ones matching the target
/// architecture are ever returned by [`detect_simd`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[allow(dead_code)]
pub enum SimdLevel {
    /// No vector path; scalar loops only.
    Scalar = 0,
    /// x86-64 SSE2 (4 x f32 per register).
    Sse2 = 1,
    /// AArch64 NEON (4 x f32 per register).
    Neon = 2,
}

impl SimdLevel {
    /// Number of f32 lanes per vector register.
    #[inline]
    pub const fn f32_lanes(self) -> usize {
        match self {
            Self::Sse2 | Self::Neon => 4,
            Self::Scalar => 1,
        }
    }

    #[inline]
    pub const fn is_vector(self) -> bool {
        !matches!(self, Self::Scalar)
    }

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scalar => "Scalar",
            Self::Sse2 => "SSE2",
            Self::Neon => "NEON",
        }
    }
}

impl std::fmt::Display for SimdLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

static SIMD_LEVEL: OnceLock<SimdLevel> = OnceLock::new();

/// Best available vector level for this CPU (cached).
#[inline]
pub fn detect_simd() -> SimdLevel {
    *SIMD_LEVEL.get_or_init(detect_simd_uncached)
}

#[cold]
fn detect_simd_uncached() -> SimdLevel {
    let level = probe();
    log::debug!("lanepack vector level: {level}");
    level
}

#[cfg(all(feature = "simd", target_arch = "x86_64"))]
fn probe() -> SimdLevel {
    if is_x86_feature_detected!("sse2") {
        SimdLevel::Sse2
    } else {
        SimdLevel::Scalar
    }
}

// NEON is mandatory on AArch64.
#[cfg(all(feature = "simd", target_arch = "aarch64"))]
fn probe() -> SimdLevel {
    SimdLevel::Neon
}

#[cfg(not(all(feature = "simd", any(target_arch = "x86_64", target_arch = "aarch64"))))]
fn probe() -> SimdLevel {
    SimdLevel::Scalar
}
