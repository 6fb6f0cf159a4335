use std::fmt;
use std::str::FromStr;

use crate::image_pipeline::acceleration::strategy::AccelerationStrategy;
use crate::image_pipeline::common::{DngError, Result};

/// Demosaicing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InterpolationMethod {
    None,
    NearestNeighbor,
    BilinearMean,
    BilinearMedian,
    BiCubic,
    MalvarHeCutler,
    HamiltonAdams,
    Ppg,
    #[default]
    Rcd,
    /// DLMMSE with the directional mean taken from the filtered centre sample
    DlmmseCodeEstimate,
    /// DLMMSE with the directional mean taken over the whole window
    DlmmsePaperEstimate,
    DlmmseRcdCodeEstimate,
    DlmmseRcdPaperEstimate,
}

impl InterpolationMethod {
    pub const ALL: [InterpolationMethod; 13] = [
        Self::None,
        Self::NearestNeighbor,
        Self::BilinearMean,
        Self::BilinearMedian,
        Self::BiCubic,
        Self::MalvarHeCutler,
        Self::HamiltonAdams,
        Self::Ppg,
        Self::Rcd,
        Self::DlmmseCodeEstimate,
        Self::DlmmsePaperEstimate,
        Self::DlmmseRcdCodeEstimate,
        Self::DlmmseRcdPaperEstimate,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::NearestNeighbor => "Nearest Neighbor",
            Self::BilinearMean => "Bilinear Mean",
            Self::BilinearMedian => "Bilinear Median",
            Self::BiCubic => "Bicubic",
            Self::MalvarHeCutler => "MalvarHeCutler",
            Self::HamiltonAdams => "Hamilton-Adams",
            Self::Ppg => "PPG",
            Self::Rcd => "RCD",
            Self::DlmmseCodeEstimate => "DLMMSE (Code-Est)",
            Self::DlmmsePaperEstimate => "DLMMSE (Paper-Est)",
            Self::DlmmseRcdCodeEstimate => "DLMMSE+RCD (Code-Est)",
            Self::DlmmseRcdPaperEstimate => "DLMMSE+RCD (Paper-Est)",
        }
    }

    /// Short identifier used on the command line.
    pub fn id(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::NearestNeighbor => "nearest-neighbor",
            Self::BilinearMean => "bilinear-mean",
            Self::BilinearMedian => "bilinear-median",
            Self::BiCubic => "bicubic",
            Self::MalvarHeCutler => "mhc",
            Self::HamiltonAdams => "hamilton-adams",
            Self::Ppg => "ppg",
            Self::Rcd => "rcd",
            Self::DlmmseCodeEstimate => "dlmmse-code",
            Self::DlmmsePaperEstimate => "dlmmse-paper",
            Self::DlmmseRcdCodeEstimate => "dlmmse-rcd-code",
            Self::DlmmseRcdPaperEstimate => "dlmmse-rcd-paper",
        }
    }

    /// Support radius of the algorithm: the number of border pixels of a
    /// tile whose output depends on samples outside of it.
    pub fn margin(&self) -> usize {
        match self {
            Self::None => 0,
            Self::NearestNeighbor | Self::BilinearMean | Self::BilinearMedian => 1,
            Self::MalvarHeCutler => 2,
            Self::BiCubic | Self::HamiltonAdams | Self::Ppg => 3,
            Self::Rcd => 10,
            Self::DlmmseCodeEstimate | Self::DlmmsePaperEstimate => 12,
            Self::DlmmseRcdCodeEstimate | Self::DlmmseRcdPaperEstimate => 15,
        }
    }

    /// Full tile edge (interior plus overlap on both sides) used by the
    /// CPU tiling strategies.
    pub fn tile_base(&self, strategy: AccelerationStrategy) -> usize {
        use AccelerationStrategy as S;
        match self {
            Self::None => match strategy {
                S::CpuTiling => 64,
                S::AutoBig | S::CpuTilingMt => 128,
                _ => 2048,
            },
            Self::NearestNeighbor | Self::BilinearMean | Self::HamiltonAdams => match strategy {
                S::CpuTiling | S::AutoBig | S::CpuTilingMt => 128,
                _ => 2048,
            },
            Self::BilinearMedian | Self::MalvarHeCutler => match strategy {
                S::CpuTiling | S::AutoBig | S::CpuTilingMt => 128,
                S::CpuMtTiling => 2048,
                _ => 256,
            },
            Self::BiCubic => match strategy {
                S::CpuTiling => 256,
                S::CpuTilingMt => 128,
                _ => 2048,
            },
            Self::Ppg => match strategy {
                S::CpuTiling => 256,
                S::AutoBig | S::CpuTilingMt => 128,
                _ => 2048,
            },
            Self::Rcd => match strategy {
                S::AutoSmall => 1024,
                S::CpuTiling => 256,
                S::CpuTilingMt => 128,
                _ => 2048,
            },
            Self::DlmmseCodeEstimate | Self::DlmmsePaperEstimate => match strategy {
                S::AutoSmall => 1024,
                S::CpuTiling | S::AutoBig | S::CpuTilingMt => 256,
                _ => 2048,
            },
            Self::DlmmseRcdCodeEstimate | Self::DlmmseRcdPaperEstimate => match strategy {
                S::AutoSmall => 1024,
                S::CpuTiling | S::CpuTilingMt => 256,
                _ => 2048,
            },
        }
    }

    /// Algorithms built from several full-image passes.
    pub fn is_multi_pass(&self) -> bool {
        matches!(
            self,
            Self::Rcd
                | Self::DlmmseCodeEstimate
                | Self::DlmmsePaperEstimate
                | Self::DlmmseRcdCodeEstimate
                | Self::DlmmseRcdPaperEstimate
        )
    }

    /// Algorithms that keep threads busy inside each tile when the image is
    /// large.
    pub fn prefers_inner_threads(&self) -> bool {
        matches!(self, Self::Rcd | Self::DlmmseRcdCodeEstimate | Self::DlmmseRcdPaperEstimate)
    }

    /// Algorithms with a device kernel.
    pub fn supports_gpu(&self) -> bool {
        matches!(self, Self::BilinearMean | Self::Rcd)
    }

    /// Overlap used when tiling on the device.
    pub fn gpu_margin(&self) -> Option<usize> {
        self.supports_gpu().then(|| self.margin())
    }

    /// Intermediate stages that can be inspected on their own.
    pub fn sub_steps(&self) -> &'static [SubStep] {
        match self {
            Self::Rcd => &SubStep::ALL,
            _ => &[],
        }
    }
}

impl fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for InterpolationMethod {
    type Err = DngError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|method| method.id().eq_ignore_ascii_case(s) || method.label() == s)
            .ok_or_else(|| DngError::configuration("demosaicing", format!("unknown interpolation method '{s}'")))
    }
}

/// Stages of the RCD algorithm, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SubStep {
    RawData,
    XyGradient,
    LowPass,
    Greens,
    PqGradient,
    RbAtBr,
    Done,
}

impl SubStep {
    pub const ALL: [SubStep; 7] = [
        Self::RawData,
        Self::XyGradient,
        Self::LowPass,
        Self::Greens,
        Self::PqGradient,
        Self::RbAtBr,
        Self::Done,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::RawData => "0. Raw data (do nothing)",
            Self::XyGradient => "1. XY-Gradient",
            Self::LowPass => "2. Low Pass Filter at Red and Blue (Green=bilinear interp.)",
            Self::Greens => "3. Finished Interpolation of Green Pixels",
            Self::PqGradient => "4. PQ-Gradient at Red and Blue (Green=bilinear interp.)",
            Self::RbAtBr => "5. All done except RB at G",
            Self::Done => "6. Finished (but no post-processing)",
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::RawData => "raw-data",
            Self::XyGradient => "xy-gradient",
            Self::LowPass => "low-pass",
            Self::Greens => "greens",
            Self::PqGradient => "pq-gradient",
            Self::RbAtBr => "rb-at-br",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for SubStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SubStep {
    type Err = DngError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|step| step.id().eq_ignore_ascii_case(s) || step.label() == s)
            .ok_or_else(|| DngError::configuration("demosaicing", format!("unknown sub-step '{s}'")))
    }
}
