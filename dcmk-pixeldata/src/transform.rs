//! Sample value transformation functions: modality rescale and the three
//! VOI LUT function shapes defined by the standard.

use std::convert::TryFrom;

/// A modality rescale function, defined by a slope and an intercept
/// (_Rescale Slope_ / _Rescale Intercept_).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rescale {
    /// the rescale slope
    pub slope: f64,
    /// the rescale intercept
    pub intercept: f64,
}

impl Rescale {
    /// The identity rescale (slope 1, intercept 0).
    pub const IDENTITY: Rescale = Rescale { slope: 1.0, intercept: 0.0 };

    /// Create a new rescale function.
    #[inline]
    pub fn new(slope: f64, intercept: f64) -> Self {
        Rescale { slope, intercept }
    }

    /// Apply the rescale function to a value.
    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        self.slope * value + self.intercept
    }
}

/// A VOI LUT function descriptor, as named by the _VOI LUT Function_ attribute.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq, Default)]
pub enum VoiLutFunction {
    /// LINEAR
    #[default]
    Linear,
    /// LINEAR_EXACT
    LinearExact,
    /// SIGMOID
    Sigmoid,
}

/// Unrecognized VOI LUT function name.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FromVoiLutFunctionError;

impl TryFrom<&str> for VoiLutFunction {
    type Error = FromVoiLutFunctionError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.trim() {
            "LINEAR" => Ok(Self::Linear),
            "LINEAR_EXACT" => Ok(Self::LinearExact),
            "SIGMOID" => Ok(Self::Sigmoid),
            _ => Err(FromVoiLutFunctionError),
        }
    }
}

/// A single window level for a VOI LUT transformation: center and width.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WindowLevel {
    /// the window width, expected to be `>= 1` (or `>= 0` for `LINEAR_EXACT`)
    pub width: f64,
    /// the window center
    pub center: f64,
}

/// A full VOI LUT function transformation: a function shape paired with a window level.
#[derive(Debug, PartialEq)]
pub struct WindowLevelTransform {
    function: VoiLutFunction,
    window: WindowLevel,
}

impl WindowLevelTransform {
    /// Build a window level transform, clamping the width to the minimum
    /// the chosen function tolerates.
    pub fn new(function: VoiLutFunction, window: WindowLevel) -> Self {
        let width = match function {
            VoiLutFunction::LinearExact => window.width.max(0.0),
            VoiLutFunction::Linear | VoiLutFunction::Sigmoid => window.width.max(1.0),
        };
        WindowLevelTransform { function, window: WindowLevel { center: window.center, width } }
    }

    /// Build a `LINEAR` window level transform.
    pub fn linear(window: WindowLevel) -> Self {
        Self::new(VoiLutFunction::Linear, window)
    }

    /// Apply the transform to a rescaled value, producing an output in `[0, y_max]`.
    pub fn apply(&self, value: f64, y_max: f64) -> f64 {
        let WindowLevel { width, center } = self.window;
        match self.function {
            VoiLutFunction::Linear => window_level_linear(value, width, center, y_max),
            VoiLutFunction::LinearExact => window_level_linear_exact(value, width, center, y_max),
            VoiLutFunction::Sigmoid => window_level_sigmoid(value, width, center, y_max),
        }
    }
}

// DICOM PS3.3 C.11.2.1.2.1
fn window_level_linear(value: f64, width: f64, center: f64, y_max: f64) -> f64 {
    debug_assert!(width >= 1.0);
    let min = center - (width - 1.0) / 2.0;
    let max = center - 0.5 + (width - 1.0) / 2.0;
    if value <= min {
        0.0
    } else if value > max {
        y_max
    } else {
        ((value - (center - 0.5)) / (width - 1.0) + 0.5) * y_max
    }
}

// DICOM PS3.3 C.11.2.1.3.2
fn window_level_linear_exact(value: f64, width: f64, center: f64, y_max: f64) -> f64 {
    debug_assert!(width >= 0.0);
    let min = center - width / 2.0;
    let max = center + width / 2.0;
    if value <= min {
        0.0
    } else if value > max {
        y_max
    } else {
        ((value - center) / width + 0.5) * y_max
    }
}

// DICOM PS3.3 C.11.2.1.3.1
fn window_level_sigmoid(value: f64, width: f64, center: f64, y_max: f64) -> f64 {
    debug_assert!(width >= 1.0);
    y_max / (1.0 + f64::exp(-4.0 * (value - center) / width))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn rescale_applies_slope_and_intercept() {
        let rescale = Rescale::new(1.0, -1024.0);
        assert_eq!(rescale.apply(0.0), -1024.0);
        assert_eq!(rescale.apply(1024.0), 0.0);
    }

    #[test]
    fn window_level_linear_matches_standard_example() {
        let transform = WindowLevelTransform::linear(WindowLevel { width: 4096.0, center: 2048.0 });
        let y_max = 255.0;

        let x = 1024.0;
        let expected = ((x - 2047.5) / 4095.0 + 0.5) * 255.0;
        assert!((transform.apply(x, y_max) - expected).abs() < 1e-9);
    }

    // Boundary table for the three VOI LUT function shapes: below the
    // window's floor maps to 0, at/above its ceiling maps to y_max, and the
    // shapes disagree on which side of "at the boundary" falls into which
    // bucket (LINEAR's ceiling is exclusive of the last half-step, Sigmoid
    // has no hard ceiling at all).
    #[rstest]
    // LINEAR, width 4096 / center 2048: min = 0.5, max = 4095.0 (inclusive, via the linear formula).
    #[case(VoiLutFunction::Linear, 4096.0, 2048.0, -2.0, 255.0, 0.0)]
    #[case(VoiLutFunction::Linear, 4096.0, 2048.0, 0.5, 255.0, 0.0)]
    #[case(VoiLutFunction::Linear, 4096.0, 2048.0, 4095.0, 255.0, 255.0)]
    #[case(VoiLutFunction::Linear, 4096.0, 2048.0, 4096.0, 255.0, 255.0)]
    // LINEAR, narrow width 300 / center 50: min = -99.5, max = 199.0.
    #[case(VoiLutFunction::Linear, 300.0, 50.0, -99.5, 255.0, 0.0)]
    #[case(VoiLutFunction::Linear, 300.0, 50.0, -120.0, 255.0, 0.0)]
    #[case(VoiLutFunction::Linear, 300.0, 50.0, 200.0, 255.0, 255.0)]
    // LINEAR_EXACT, width 100 / center 50: min = 0.0, max = 100.0 (inclusive).
    #[case(VoiLutFunction::LinearExact, 100.0, 50.0, 0.0, 255.0, 0.0)]
    #[case(VoiLutFunction::LinearExact, 100.0, 50.0, -1.0, 255.0, 0.0)]
    #[case(VoiLutFunction::LinearExact, 100.0, 50.0, 100.0, 255.0, 255.0)]
    #[case(VoiLutFunction::LinearExact, 100.0, 50.0, 150.0, 255.0, 255.0)]
    // LINEAR_EXACT, zero width: every value other than the center saturates.
    #[case(VoiLutFunction::LinearExact, 0.0, 50.0, 50.0, 255.0, 0.0)]
    #[case(VoiLutFunction::LinearExact, 0.0, 50.0, 51.0, 255.0, 255.0)]
    // SIGMOID has no hard floor/ceiling; at the center it sits at exactly y_max / 2.
    #[case(VoiLutFunction::Sigmoid, 100.0, 50.0, 50.0, 255.0, 127.5)]
    fn window_level_boundary_table(
        #[case] function: VoiLutFunction,
        #[case] width: f64,
        #[case] center: f64,
        #[case] value: f64,
        #[case] y_max: f64,
        #[case] expected: f64,
    ) {
        let transform = WindowLevelTransform::new(function, WindowLevel { width, center });
        assert!((transform.apply(value, y_max) - expected).abs() < 1e-9);
    }

    #[test]
    fn voi_lut_function_parses_standard_names() {
        assert_eq!(VoiLutFunction::try_from("LINEAR").unwrap(), VoiLutFunction::Linear);
        assert_eq!(VoiLutFunction::try_from("SIGMOID").unwrap(), VoiLutFunction::Sigmoid);
        assert!(VoiLutFunction::try_from("BOGUS").is_err());
    }
}
