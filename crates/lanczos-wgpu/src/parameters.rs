//! Typed configuration keys and sizes
//!
//! Effects are configured through small enumerations of recognised fields. The
//! string keys used at the graph boundary (`"width"`, `"input_height"`, ...) are
//! parsed into these with [`FromStr`].

use crate::error::UnknownParameter;
use std::{fmt, str::FromStr};

/// Default width of a freshly constructed resampler
pub const DEFAULT_WIDTH: u32 = 1280;
/// Default height of a freshly constructed resampler
pub const DEFAULT_HEIGHT: u32 = 720;

/// Width and height of an image in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Extent {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Axis a single resampling pass acts along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Resamples along x; the height is left unchanged
    Horizontal,
    /// Resamples along y; the width is left unchanged
    Vertical,
}

impl TryFrom<i32> for Direction {
    type Error = i32;

    /// `0` is horizontal and `1` vertical; other values are returned as the error
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Direction::Horizontal),
            1 => Ok(Direction::Vertical),
            other => Err(other),
        }
    }
}

/// Keys recognised by a single resampling pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassParameter {
    Direction,
    InputWidth,
    InputHeight,
    OutputWidth,
    OutputHeight,
}

impl PassParameter {
    pub fn as_str(self) -> &'static str {
        match self {
            PassParameter::Direction => "direction",
            PassParameter::InputWidth => "input_width",
            PassParameter::InputHeight => "input_height",
            PassParameter::OutputWidth => "output_width",
            PassParameter::OutputHeight => "output_height",
        }
    }
}

impl FromStr for PassParameter {
    type Err = UnknownParameter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direction" => Ok(PassParameter::Direction),
            "input_width" => Ok(PassParameter::InputWidth),
            "input_height" => Ok(PassParameter::InputHeight),
            "output_width" => Ok(PassParameter::OutputWidth),
            "output_height" => Ok(PassParameter::OutputHeight),
            _ => Err(UnknownParameter(s.to_string())),
        }
    }
}

/// Keys recognised by the two-pass resampler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResamplerParameter {
    /// Output width
    Width,
    /// Output height
    Height,
}

impl ResamplerParameter {
    pub fn as_str(self) -> &'static str {
        match self {
            ResamplerParameter::Width => "width",
            ResamplerParameter::Height => "height",
        }
    }
}

impl FromStr for ResamplerParameter {
    type Err = UnknownParameter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "width" => Ok(ResamplerParameter::Width),
            "height" => Ok(ResamplerParameter::Height),
            _ => Err(UnknownParameter(s.to_string())),
        }
    }
}

/// Converts an integer setter value into a pixel count
///
/// Sizes must be at least one pixel.
pub(crate) fn size_from_int(value: i32) -> Option<u32> {
    u32::try_from(value).ok().filter(|&v| v > 0)
}

/// Converts a float setter value into a pixel count, truncating toward zero
pub(crate) fn size_from_float(value: f32) -> Option<u32> {
    if !value.is_finite() || value < 1.0 || value > u32::MAX as f32 {
        return None;
    }
    Some(value as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_parameter_round_trip_names() {
        for parameter in [
            PassParameter::Direction,
            PassParameter::InputWidth,
            PassParameter::InputHeight,
            PassParameter::OutputWidth,
            PassParameter::OutputHeight,
        ] {
            assert_eq!(parameter.as_str().parse::<PassParameter>(), Ok(parameter));
        }
        assert_eq!("width".parse::<PassParameter>(), Err(UnknownParameter("width".to_string())));
    }

    #[test]
    fn test_resampler_parameter_parsing() {
        assert_eq!("width".parse::<ResamplerParameter>(), Ok(ResamplerParameter::Width));
        assert_eq!("height".parse::<ResamplerParameter>(), Ok(ResamplerParameter::Height));
        assert!("output_width".parse::<ResamplerParameter>().is_err());
        assert!("".parse::<ResamplerParameter>().is_err());
    }

    #[test]
    fn test_direction_from_int() {
        assert_eq!(Direction::try_from(0), Ok(Direction::Horizontal));
        assert_eq!(Direction::try_from(1), Ok(Direction::Vertical));
        assert_eq!(Direction::try_from(2), Err(2));
    }

    #[test]
    fn test_size_conversion() {
        assert_eq!(size_from_int(640), Some(640));
        assert_eq!(size_from_int(0), None);
        assert_eq!(size_from_int(-5), None);

        assert_eq!(size_from_float(1279.9), Some(1279));
        assert_eq!(size_from_float(1.0), Some(1));
        assert_eq!(size_from_float(0.5), None);
        assert_eq!(size_from_float(f32::NAN), None);
        assert_eq!(size_from_float(f32::INFINITY), None);
    }

    #[test]
    fn test_extent_display() {
        assert_eq!(Extent::new(1920, 1080).to_string(), "1920x1080");
        assert_eq!(Extent::default(), Extent::new(1280, 720));
    }
}
