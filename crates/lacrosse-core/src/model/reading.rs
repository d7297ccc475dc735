// ── Reading domain types ──

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// The readings a device reports. String forms match the portal's
/// service names (`currentTemp`, `currentRH`, `lowBatt`).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
pub enum ReadingKind {
    #[serde(rename = "currentTemp")]
    #[strum(serialize = "currentTemp")]
    CurrentTemp,
    #[serde(rename = "currentRH")]
    #[strum(serialize = "currentRH")]
    CurrentRh,
    #[serde(rename = "lowBatt")]
    #[strum(serialize = "lowBatt")]
    LowBatt,
}

/// One reading value, tagged with its unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ReadingValue {
    Celsius(f64),
    Percent(f64),
    LowBattery(bool),
}

impl ReadingValue {
    /// Numeric form. The battery flag maps to 0 (normal) / 1 (low).
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Celsius(v) | Self::Percent(v) => v,
            Self::LowBattery(low) => f64::from(u8::from(low)),
        }
    }
}

/// All readings of one device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Readings {
    /// Temperature in Celsius.
    pub current_temp: f64,
    /// Temperature exactly as the portal reported it, in account units.
    pub raw_temp: f64,
    /// Relative humidity, percent.
    pub current_rh: f64,
    pub low_batt: bool,
}

impl Readings {
    pub fn get(&self, kind: ReadingKind) -> ReadingValue {
        match kind {
            ReadingKind::CurrentTemp => ReadingValue::Celsius(self.current_temp),
            ReadingKind::CurrentRh => ReadingValue::Percent(self.current_rh),
            ReadingKind::LowBatt => ReadingValue::LowBattery(self.low_batt),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn kinds_round_trip_through_portal_names() {
        for kind in ReadingKind::iter() {
            assert_eq!(ReadingKind::from_str(kind.as_ref()).unwrap(), kind);
        }
        assert_eq!(ReadingKind::CurrentRh.to_string(), "currentRH");
        assert!(ReadingKind::from_str("pressure").is_err());
    }

    #[test]
    fn readings_map_kinds_to_tagged_values() {
        let readings = Readings {
            current_temp: 21.5,
            raw_temp: 21.5,
            current_rh: 40.0,
            low_batt: true,
        };
        assert_eq!(
            readings.get(ReadingKind::CurrentTemp),
            ReadingValue::Celsius(21.5)
        );
        assert_eq!(readings.get(ReadingKind::CurrentRh), ReadingValue::Percent(40.0));
        assert!((readings.get(ReadingKind::LowBatt).as_f64() - 1.0).abs() < f64::EPSILON);
    }
}
