//! CPU capability detection
//!
//! Features are probed once per process. Kernel variants are keyed by the
//! coarser [`CpuType`] level derived from them.

use bitflags::bitflags;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// Instruction-set extensions reported by the running CPU
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CpuFeatures: u32 {
        const SSE2 = 1 << 0;
        const SSSE3 = 1 << 1;
        const SSE41 = 1 << 2;
        const SSE42 = 1 << 3;
        const AVX = 1 << 4;
        const AVX2 = 1 << 5;
        const FMA = 1 << 6;
        const AVX512F = 1 << 7;
    }
}

impl CpuFeatures {
    /// Probe the running CPU
    ///
    /// Non-x86_64 targets report no features.
    pub fn detect() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            let probes = [
                (is_x86_feature_detected!("sse2"), Self::SSE2),
                (is_x86_feature_detected!("ssse3"), Self::SSSE3),
                (is_x86_feature_detected!("sse4.1"), Self::SSE41),
                (is_x86_feature_detected!("sse4.2"), Self::SSE42),
                (is_x86_feature_detected!("avx"), Self::AVX),
                (is_x86_feature_detected!("avx2"), Self::AVX2),
                (is_x86_feature_detected!("fma"), Self::FMA),
                (is_x86_feature_detected!("avx512f"), Self::AVX512F),
            ];
            probes
                .into_iter()
                .filter(|(present, _)| *present)
                .fold(Self::empty(), |acc, (_, flag)| acc | flag)
        }
        #[cfg(not(target_arch = "x86_64"))]
        {
            Self::empty()
        }
    }
}

/// Ordered capability level used to pick kernel variants
///
/// A variant registered for level `L` may run on any CPU whose level is at
/// least `L`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum CpuType {
    /// Portable scalar code
    Baseline,
    Sse42,
    Avx,
    /// AVX2 together with FMA
    Avx2,
    Avx512,
}

lazy_static! {
    static ref DETECTED_FEATURES: CpuFeatures = CpuFeatures::detect();
    static ref DETECTED_CPU: CpuType = CpuType::from_features(*DETECTED_FEATURES);
}

impl CpuType {
    /// Every level, lowest first
    pub const ALL: [CpuType; 5] = [
        Self::Baseline,
        Self::Sse42,
        Self::Avx,
        Self::Avx2,
        Self::Avx512,
    ];

    /// Highest level fully covered by `features`
    pub fn from_features(features: CpuFeatures) -> Self {
        let sse42 = CpuFeatures::SSE2 | CpuFeatures::SSSE3 | CpuFeatures::SSE41 | CpuFeatures::SSE42;
        let avx = sse42 | CpuFeatures::AVX;
        let avx2 = avx | CpuFeatures::AVX2 | CpuFeatures::FMA;
        let avx512 = avx2 | CpuFeatures::AVX512F;

        if features.contains(avx512) {
            Self::Avx512
        } else if features.contains(avx2) {
            Self::Avx2
        } else if features.contains(avx) {
            Self::Avx
        } else if features.contains(sse42) {
            Self::Sse42
        } else {
            Self::Baseline
        }
    }

    /// Level of the running CPU, computed once per process
    pub fn detected() -> Self {
        *DETECTED_CPU
    }

    /// Features of the running CPU, computed once per process
    pub fn detected_features() -> CpuFeatures {
        *DETECTED_FEATURES
    }

    /// Whether code built for this level may run here
    pub fn is_supported(self) -> bool {
        self <= Self::detected()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::Sse42 => "sse4.2",
            Self::Avx => "avx",
            Self::Avx2 => "avx2",
            Self::Avx512 => "avx512",
        }
    }
}

impl fmt::Display for CpuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
