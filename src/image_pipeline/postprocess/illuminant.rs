use std::fmt;

use crate::image_pipeline::common::{DngError, Result};

/// EXIF light sources that may be named by CalibrationIlluminant1/2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalibrationIlluminant {
    Unknown,
    Daylight,
    Fluorescent,
    Tungsten,
    Flash,
    FineWeather,
    CloudyWeather,
    Shade,
    DaylightFluorescent,
    DayWhiteFluorescent,
    CoolWhiteFluorescent,
    WhiteFluorescent,
    StandardLightA,
    StandardLightB,
    StandardLightC,
    D55,
    D65,
    D75,
    D50,
    IsoStudioTungsten,
    OtherLightSource,
}

impl CalibrationIlluminant {
    pub const ALL: [CalibrationIlluminant; 21] = [
        Self::Unknown,
        Self::Daylight,
        Self::Fluorescent,
        Self::Tungsten,
        Self::Flash,
        Self::FineWeather,
        Self::CloudyWeather,
        Self::Shade,
        Self::DaylightFluorescent,
        Self::DayWhiteFluorescent,
        Self::CoolWhiteFluorescent,
        Self::WhiteFluorescent,
        Self::StandardLightA,
        Self::StandardLightB,
        Self::StandardLightC,
        Self::D55,
        Self::D65,
        Self::D75,
        Self::D50,
        Self::IsoStudioTungsten,
        Self::OtherLightSource,
    ];

    /// EXIF LightSource value.
    pub fn id(self) -> u16 {
        match self {
            Self::Unknown => 0,
            Self::Daylight => 1,
            Self::Fluorescent => 2,
            Self::Tungsten => 3,
            Self::Flash => 4,
            Self::FineWeather => 9,
            Self::CloudyWeather => 10,
            Self::Shade => 11,
            Self::DaylightFluorescent => 12,
            Self::DayWhiteFluorescent => 13,
            Self::CoolWhiteFluorescent => 14,
            Self::WhiteFluorescent => 15,
            Self::StandardLightA => 17,
            Self::StandardLightB => 18,
            Self::StandardLightC => 19,
            Self::D55 => 20,
            Self::D65 => 21,
            Self::D75 => 22,
            Self::D50 => 23,
            Self::IsoStudioTungsten => 24,
            Self::OtherLightSource => 255,
        }
    }

    /// Correlated colour temperature in kelvin; zero when the source does
    /// not define one.
    pub fn cct(self) -> f64 {
        match self {
            Self::Unknown | Self::OtherLightSource => 0.0,
            Self::Daylight | Self::FineWeather | Self::D55 => 5503.0,
            Self::Fluorescent | Self::CoolWhiteFluorescent => 4230.0,
            Self::Tungsten | Self::StandardLightA => 2856.0,
            Self::Flash => 5500.0,
            Self::CloudyWeather | Self::D65 => 6504.0,
            Self::Shade | Self::D75 => 7504.0,
            Self::DaylightFluorescent => 6430.0,
            Self::DayWhiteFluorescent => 4940.0,
            Self::WhiteFluorescent => 3450.0,
            Self::StandardLightB => 4874.0,
            Self::StandardLightC => 6774.0,
            Self::D50 => 5003.0,
            Self::IsoStudioTungsten => 3200.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Daylight => "Daylight",
            Self::Fluorescent => "Fluorescent",
            Self::Tungsten => "Tungsten (incandescent light)",
            Self::Flash => "Flash",
            Self::FineWeather => "Fine weather",
            Self::CloudyWeather => "Cloudy weather",
            Self::Shade => "Shade",
            Self::DaylightFluorescent => "Daylight fluorescent",
            Self::DayWhiteFluorescent => "Day white fluorescent",
            Self::CoolWhiteFluorescent => "Cool white fluorescent",
            Self::WhiteFluorescent => "White fluorescent",
            Self::StandardLightA => "Standard light A",
            Self::StandardLightB => "Standard light B",
            Self::StandardLightC => "Standard light C",
            Self::D55 => "D55",
            Self::D65 => "D65",
            Self::D75 => "D75",
            Self::D50 => "D50",
            Self::IsoStudioTungsten => "ISO studio tungsten",
            Self::OtherLightSource => "Other light source",
        }
    }

    pub fn from_id(id: u16) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|illuminant| illuminant.id() == id)
            .ok_or_else(|| DngError::UnsupportedFormat(format!("calibration illuminant {id}")))
    }
}

impl fmt::Display for CalibrationIlluminant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-run colour state shared between the colour-space transform and the
/// stages that blend dual-illuminant profile data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorContext {
    /// Correlated colour temperature of the scene white
    pub cct: f64,
    pub illuminant_1: Option<CalibrationIlluminant>,
    pub illuminant_2: Option<CalibrationIlluminant>,
}

impl ColorContext {
    pub fn new(
        cct: f64,
        illuminant_1: Option<CalibrationIlluminant>,
        illuminant_2: Option<CalibrationIlluminant>,
    ) -> Self {
        Self { cct, illuminant_1, illuminant_2 }
    }

    /// Weight of the first calibration in a blend of the two, interpolated
    /// linearly in inverse temperature and clamped to `0..=1`.
    ///
    /// Without two illuminants of known temperature the first calibration
    /// wins outright.
    pub fn weight(&self) -> f64 {
        let (Some(first), Some(second)) = (self.illuminant_1, self.illuminant_2) else {
            return 1.0;
        };
        let (t1, t2) = (first.cct(), second.cct());
        if t1 <= 0.0 || t2 <= 0.0 || t1 == t2 || !(self.cct > 0.0) {
            return 1.0;
        }
        let w = (1.0 / self.cct - 1.0 / t2) / (1.0 / t1 - 1.0 / t2);
        w.clamp(0.0, 1.0)
    }
}
