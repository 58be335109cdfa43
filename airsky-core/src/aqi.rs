//! US EPA Air Quality Index classification.
//!
//! This is a display heuristic, not a regulatory computation: invalid or
//! missing inputs degrade to index 0 ("Good") instead of erroring. Do not
//! base safety-critical decisions on it.

use crate::model::Pollutants;

/// Pollutants with a published EPA breakpoint table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pollutant {
    Pm25,
    Pm10,
}

/// `(concentration_low, concentration_high, index_low, index_high)`
type Breakpoint = (f64, f64, f64, f64);

const PM25_BREAKPOINTS: [Breakpoint; 7] = [
    (0.0, 12.0, 0.0, 50.0),
    (12.1, 35.4, 51.0, 100.0),
    (35.5, 55.4, 101.0, 150.0),
    (55.5, 150.4, 151.0, 200.0),
    (150.5, 250.4, 201.0, 300.0),
    (250.5, 350.4, 301.0, 400.0),
    (350.5, 500.4, 401.0, 500.0),
];

const PM10_BREAKPOINTS: [Breakpoint; 7] = [
    (0.0, 54.0, 0.0, 50.0),
    (55.0, 154.0, 51.0, 100.0),
    (155.0, 254.0, 101.0, 150.0),
    (255.0, 354.0, 151.0, 200.0),
    (355.0, 424.0, 201.0, 300.0),
    (425.0, 504.0, 301.0, 400.0),
    (505.0, 604.0, 401.0, 500.0),
];

pub const MAX_INDEX: u16 = 500;

impl Pollutant {
    fn breakpoints(&self) -> &'static [Breakpoint] {
        match self {
            Pollutant::Pm25 => &PM25_BREAKPOINTS,
            Pollutant::Pm10 => &PM10_BREAKPOINTS,
        }
    }

    /// Truncates to the table's precision; only used for values that fall
    /// between two brackets (e.g. 12.05), which then land in the lower one.
    fn truncate(&self, concentration: f64) -> f64 {
        let scale = match self {
            Pollutant::Pm25 => 10.0,
            Pollutant::Pm10 => 1.0,
        };
        (concentration * scale + 1e-9).floor() / scale
    }
}

/// Maps a concentration (µg/m³) to the 0..=500 index.
///
/// Missing, zero, negative or NaN concentrations yield 0; concentrations
/// above the top bracket saturate at 500.
pub fn compute_index(concentration: Option<f64>, pollutant: Pollutant) -> u16 {
    let Some(concentration) = concentration else {
        return 0;
    };
    if concentration.is_nan() || concentration <= 0.0 {
        return 0;
    }

    interpolate(concentration, pollutant)
        .or_else(|| interpolate(pollutant.truncate(concentration), pollutant))
        .unwrap_or(MAX_INDEX)
}

fn interpolate(concentration: f64, pollutant: Pollutant) -> Option<u16> {
    pollutant
        .breakpoints()
        .iter()
        .find(|&&(c_low, c_high, _, _)| concentration >= c_low && concentration <= c_high)
        .map(|&(c_low, c_high, i_low, i_high)| {
            let index = (i_high - i_low) / (c_high - c_low) * (concentration - c_low) + i_low;
            index.round() as u16
        })
}

/// Most-restrictive-pollutant rule over PM2.5 and PM10; 0 when neither is present.
pub fn combined_index(pollutants: &Pollutants) -> u16 {
    compute_index(pollutants.pm2_5, Pollutant::Pm25)
        .max(compute_index(pollutants.pm10, Pollutant::Pm10))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AqiLevel {
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiLevel {
    pub fn label(&self) -> &'static str {
        match self {
            AqiLevel::Good => "Good",
            AqiLevel::Moderate => "Moderate",
            AqiLevel::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            AqiLevel::Unhealthy => "Unhealthy",
            AqiLevel::VeryUnhealthy => "Very Unhealthy",
            AqiLevel::Hazardous => "Hazardous",
        }
    }
}

impl std::fmt::Display for AqiLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AqiCategory {
    pub level: AqiLevel,
    pub color_token: &'static str,
    pub guidance: &'static str,
}

pub fn classify(index: u16) -> AqiCategory {
    let (level, color_token, guidance) = match index {
        0..=50 => (
            AqiLevel::Good,
            "#00E400",
            "Air quality is satisfactory, and air pollution poses little or no risk.",
        ),
        51..=100 => (
            AqiLevel::Moderate,
            "#FFFF00",
            "Air quality is acceptable. However, there may be a risk for some people, \
             particularly those who are unusually sensitive to air pollution.",
        ),
        101..=150 => (
            AqiLevel::UnhealthyForSensitiveGroups,
            "#FF7E00",
            "Members of sensitive groups may experience health effects. \
             The general public is less likely to be affected.",
        ),
        151..=200 => (
            AqiLevel::Unhealthy,
            "#FF0000",
            "Some members of the general public may experience health effects; \
             members of sensitive groups may experience more serious health effects.",
        ),
        201..=300 => (
            AqiLevel::VeryUnhealthy,
            "#8F3F97",
            "Health alert: The risk of health effects is increased for everyone.",
        ),
        _ => (
            AqiLevel::Hazardous,
            "#7E0023",
            "Health warning of emergency conditions: everyone is more likely to be affected.",
        ),
    };

    AqiCategory { level, color_token, guidance }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UvLevel {
    Low,
    Moderate,
    High,
    VeryHigh,
    Extreme,
}

impl UvLevel {
    pub fn label(&self) -> &'static str {
        match self {
            UvLevel::Low => "Low",
            UvLevel::Moderate => "Moderate",
            UvLevel::High => "High",
            UvLevel::VeryHigh => "Very High",
            UvLevel::Extreme => "Extreme",
        }
    }
}

pub fn uv_level(uv: Option<f64>) -> UvLevel {
    match uv {
        Some(uv) if uv >= 11.0 => UvLevel::Extreme,
        Some(uv) if uv >= 8.0 => UvLevel::VeryHigh,
        Some(uv) if uv >= 6.0 => UvLevel::High,
        Some(uv) if uv >= 3.0 => UvLevel::Moderate,
        _ => UvLevel::Low,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pm25_is_continuous_at_bracket_boundaries() {
        assert_eq!(compute_index(Some(12.0), Pollutant::Pm25), 50);
        assert_eq!(compute_index(Some(12.1), Pollutant::Pm25), 51);
        assert_eq!(compute_index(Some(35.4), Pollutant::Pm25), 100);
        assert_eq!(compute_index(Some(35.5), Pollutant::Pm25), 101);
    }

    #[test]
    fn pm10_is_continuous_at_bracket_boundaries() {
        assert_eq!(compute_index(Some(54.0), Pollutant::Pm10), 50);
        assert_eq!(compute_index(Some(55.0), Pollutant::Pm10), 51);
        assert_eq!(compute_index(Some(604.0), Pollutant::Pm10), 500);
    }

    #[test]
    fn in_bracket_fractions_interpolate_on_raw_value() {
        // 49/99 * (100.9 - 55) + 51 = 73.72
        assert_eq!(compute_index(Some(100.9), Pollutant::Pm10), 74);
        // 49/23.3 * (20.47 - 12.1) + 51 = 68.60
        assert_eq!(compute_index(Some(20.47), Pollutant::Pm25), 69);
    }

    #[test]
    fn values_between_brackets_do_not_jump() {
        assert_eq!(compute_index(Some(12.05), Pollutant::Pm25), 50);
        assert_eq!(compute_index(Some(54.5), Pollutant::Pm10), 50);
    }

    #[test]
    fn index_is_monotonic_over_defined_range() {
        for pollutant in [Pollutant::Pm25, Pollutant::Pm10] {
            let top = match pollutant {
                Pollutant::Pm25 => 500.4,
                Pollutant::Pm10 => 604.0,
            };
            let mut previous = 0;
            let mut concentration = 0.0;
            while concentration <= top {
                let index = compute_index(Some(concentration), pollutant);
                assert!(
                    index >= previous,
                    "{pollutant:?}: index dropped from {previous} to {index} at {concentration}"
                );
                previous = index;
                concentration += 0.05;
            }
        }
    }

    #[test]
    fn missing_or_non_positive_concentration_is_zero() {
        assert_eq!(compute_index(None, Pollutant::Pm25), 0);
        assert_eq!(compute_index(Some(-3.0), Pollutant::Pm10), 0);
        assert_eq!(compute_index(Some(0.0), Pollutant::Pm25), 0);
        assert_eq!(compute_index(Some(f64::NAN), Pollutant::Pm25), 0);
    }

    #[test]
    fn concentration_above_top_bracket_saturates() {
        assert_eq!(compute_index(Some(900.0), Pollutant::Pm25), 500);
        assert_eq!(compute_index(Some(10_000.0), Pollutant::Pm10), 500);
    }

    #[test]
    fn combined_index_takes_most_restrictive_pollutant() {
        let pollutants = Pollutants { pm2_5: Some(40.0), pm10: Some(0.0), ..Default::default() };
        let index = combined_index(&pollutants);

        assert_eq!(index, compute_index(Some(40.0), Pollutant::Pm25));
        assert!((101..=150).contains(&index));
    }

    #[test]
    fn combined_index_without_particulates_is_zero() {
        let pollutants = Pollutants { o3: Some(80.0), ..Default::default() };
        assert_eq!(combined_index(&pollutants), 0);
    }

    #[test]
    fn classify_band_edges() {
        assert_eq!(classify(0).level, AqiLevel::Good);
        assert_eq!(classify(50).level, AqiLevel::Good);
        assert_eq!(classify(51).level, AqiLevel::Moderate);
        assert_eq!(classify(150).level, AqiLevel::UnhealthyForSensitiveGroups);
        assert_eq!(classify(200).level, AqiLevel::Unhealthy);
        assert_eq!(classify(300).level, AqiLevel::VeryUnhealthy);
        assert_eq!(classify(301).level, AqiLevel::Hazardous);
        assert_eq!(classify(500).level, AqiLevel::Hazardous);
        assert_eq!(classify(999).level, AqiLevel::Hazardous);
    }

    #[test]
    fn classify_is_ordered() {
        let levels: Vec<_> = (0..=600).map(|i| classify(i).level).collect();
        assert!(levels.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn uv_bands() {
        assert_eq!(uv_level(None), UvLevel::Low);
        assert_eq!(uv_level(Some(2.9)), UvLevel::Low);
        assert_eq!(uv_level(Some(3.0)), UvLevel::Moderate);
        assert_eq!(uv_level(Some(7.5)), UvLevel::High);
        assert_eq!(uv_level(Some(10.9)), UvLevel::VeryHigh);
        assert_eq!(uv_level(Some(11.0)), UvLevel::Extreme);
    }
}
