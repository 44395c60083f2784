//! Mosquito risk index from a live temperature/humidity reading.

use std::fmt;

use serde::Serialize;

use crate::domain::LiveObservation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
    /// No live reading was available.
    Unknown,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
            RiskLevel::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bands are checked in order; the first match wins.
///
/// Outside 20..=32 °C vector activity is low regardless of humidity.
pub fn risk_from_reading(temperature: f64, humidity: f64) -> RiskLevel {
    if !(temperature.is_finite() && humidity.is_finite()) {
        return RiskLevel::Unknown;
    }
    if temperature > 32.0 || temperature < 20.0 {
        RiskLevel::Low
    } else if (28.0..=32.0).contains(&temperature) && humidity > 80.0 {
        RiskLevel::Critical
    } else if (25.0..=30.0).contains(&temperature) && humidity > 70.0 {
        RiskLevel::High
    } else {
        RiskLevel::Moderate
    }
}

pub fn classify_risk(live: Option<&LiveObservation>) -> RiskLevel {
    live.map_or(RiskLevel::Unknown, |l| risk_from_reading(l.temperature, l.humidity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn bands_follow_temperature_then_humidity() {
        assert_eq!(risk_from_reading(33.0, 95.0), RiskLevel::Low);
        assert_eq!(risk_from_reading(19.9, 95.0), RiskLevel::Low);
        assert_eq!(risk_from_reading(30.0, 85.0), RiskLevel::Critical);
        assert_eq!(risk_from_reading(28.0, 80.0), RiskLevel::High);
        assert_eq!(risk_from_reading(26.0, 75.0), RiskLevel::High);
        assert_eq!(risk_from_reading(31.0, 75.0), RiskLevel::Moderate);
        assert_eq!(risk_from_reading(22.0, 90.0), RiskLevel::Moderate);
    }

    #[test]
    fn missing_reading_is_unknown() {
        assert_eq!(classify_risk(None), RiskLevel::Unknown);
        let live = LiveObservation {
            date: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
            temperature: 29.0,
            humidity: 88.0,
            rainfall: None,
        };
        assert_eq!(classify_risk(Some(&live)), RiskLevel::Critical);
        assert_eq!(RiskLevel::Unknown.to_string(), "Unknown");
    }
}
