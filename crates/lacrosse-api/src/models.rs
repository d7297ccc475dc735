// Raw portal data shapes
//
// These mirror the `devicesInitData` object embedded in the status page.
// The portal is loose about types (ids and readings show up as numbers or
// strings), so the numeric fields go through lenient deserializers.

use serde::{Deserialize, Deserializer};

/// Everything the status page tells us in one fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusPage {
    pub provider_id: u64,
    pub gateway_ids: Vec<String>,
    /// Account-level unit flag. `false` means readings are in Fahrenheit.
    pub is_metric: bool,
    /// Devices in the order the portal listed them.
    pub devices: Vec<RawDevice>,
}

/// One device entry from `devicesInitData`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawDevice {
    #[serde(deserialize_with = "string_or_number")]
    pub device_id: String,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub obs: Vec<RawObservation>,
}

impl RawDevice {
    /// The most recent observation. The portal puts it first.
    pub fn latest(&self) -> Option<&RawObservation> {
        self.obs.first()
    }
}

/// A single observation as reported by the portal, in account units.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RawObservation {
    #[serde(deserialize_with = "lenient_f64")]
    pub ambient_temp: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub humidity: f64,
    #[serde(deserialize_with = "lenient_flag")]
    pub lowbattery: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Number(serde_json::Number),
    Text(String),
    Bool(bool),
}

fn string_or_number<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    match Loose::deserialize(de)? {
        Loose::Number(n) => Ok(n.to_string()),
        Loose::Text(s) => Ok(s),
        Loose::Bool(b) => Ok(b.to_string()),
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(de: D) -> Result<f64, D::Error> {
    match Loose::deserialize(de)? {
        Loose::Number(n) => n
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom(format!("number out of range: {n}"))),
        Loose::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("not a number: {s:?}"))),
        Loose::Bool(b) => Err(serde::de::Error::custom(format!(
            "expected a number, got {b}"
        ))),
    }
}

fn lenient_flag<'de, D: Deserializer<'de>>(de: D) -> Result<bool, D::Error> {
    match Loose::deserialize(de)? {
        Loose::Bool(b) => Ok(b),
        Loose::Number(n) => Ok(n.as_f64().is_some_and(|v| v != 0.0)),
        Loose::Text(s) => match s.trim() {
            "" | "0" | "false" => Ok(false),
            _ => Ok(true),
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_device_accepts_numeric_and_string_fields() {
        let device: RawDevice = serde_json::from_value(json!({
            "device_id": 1234,
            "device_name": "Porch",
            "obs": [{ "ambient_temp": "71.6", "humidity": 40, "lowbattery": "1" }]
        }))
        .unwrap();

        assert_eq!(device.device_id, "1234");
        assert_eq!(device.device_name.as_deref(), Some("Porch"));
        let obs = device.latest().unwrap();
        assert!((obs.ambient_temp - 71.6).abs() < f64::EPSILON);
        assert!((obs.humidity - 40.0).abs() < f64::EPSILON);
        assert!(obs.lowbattery);
    }

    #[test]
    fn missing_name_and_obs_default() {
        let device: RawDevice = serde_json::from_value(json!({ "device_id": "abc" })).unwrap();
        assert!(device.device_name.is_none());
        assert!(device.latest().is_none());
    }

    #[test]
    fn garbage_temperature_is_rejected() {
        let result: Result<RawObservation, _> = serde_json::from_value(json!({
            "ambient_temp": "warm", "humidity": 40, "lowbattery": 0
        }));
        assert!(result.is_err());
    }
}
