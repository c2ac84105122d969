//! US EPA Air Quality Index from a PM2.5 concentration.
//!
//! The index is a piecewise-linear mapping over a fixed breakpoint table:
//! inside a band `[c_lo, c_hi] -> [i_lo, i_hi]` the index is
//! `round((i_hi - i_lo) / (c_hi - c_lo) * (c - c_lo) + i_lo)`.

use std::fmt;

/// `(c_lo, c_hi, i_lo, i_hi)` for 24-hour PM2.5 in µg/m³.
const PM25_BREAKPOINTS: [(f64, f64, u32, u32); 7] = [
    (0.0, 12.0, 0, 50),
    (12.1, 35.4, 51, 100),
    (35.5, 55.4, 101, 150),
    (55.5, 150.4, 151, 200),
    (150.5, 250.4, 201, 300),
    (250.5, 350.4, 301, 400),
    (350.5, 500.4, 401, 500),
];

const MAX_AQI: u32 = 500;

/// Converts a PM2.5 concentration (µg/m³) to a US AQI value in `0..=500`.
///
/// The concentration is truncated to one decimal place before the band lookup,
/// so values between two bands (e.g. `12.05`) fall into the lower one.
/// Concentrations above the table cap at 500. Negative and non-finite input
/// yields `None`.
///
/// # Examples
///
/// ```
/// use aircast::us_aqi_from_pm25;
///
/// assert_eq!(us_aqi_from_pm25(0.0), Some(0));
/// assert_eq!(us_aqi_from_pm25(12.0), Some(50));
/// assert_eq!(us_aqi_from_pm25(40.0), Some(112));
/// assert_eq!(us_aqi_from_pm25(-1.0), None);
/// ```
pub fn us_aqi_from_pm25(pm25: f64) -> Option<u32> {
    if !pm25.is_finite() || pm25 < 0.0 {
        return None;
    }
    let concentration = (pm25 * 10.0).floor() / 10.0;

    for (c_lo, c_hi, i_lo, i_hi) in PM25_BREAKPOINTS {
        // Compare with a small tolerance, the truncated value is not exact in binary.
        if concentration <= c_hi + 1e-9 {
            let slope = f64::from(i_hi - i_lo) / (c_hi - c_lo);
            let index = slope * (concentration - c_lo).max(0.0) + f64::from(i_lo);
            return Some(index.round() as u32);
        }
    }
    Some(MAX_AQI)
}

/// Health category for an AQI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AqiCategory {
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiCategory {
    pub fn from_aqi(aqi: u32) -> Self {
        match aqi {
            0..=50 => AqiCategory::Good,
            51..=100 => AqiCategory::Moderate,
            101..=150 => AqiCategory::UnhealthyForSensitiveGroups,
            151..=200 => AqiCategory::Unhealthy,
            201..=300 => AqiCategory::VeryUnhealthy,
            _ => AqiCategory::Hazardous,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AqiCategory::Good => "Good",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            AqiCategory::Unhealthy => "Unhealthy",
            AqiCategory::VeryUnhealthy => "Very Unhealthy",
            AqiCategory::Hazardous => "Hazardous",
        }
    }
}

impl fmt::Display for AqiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
