// ── API-to-domain conversions ──
//
// Bridges raw `lacrosse_api` page data into canonical `lacrosse_core::model`
// types. Temperatures are normalized to Celsius here and nowhere else.

use lacrosse_api::{RawDevice, StatusPage};
use tracing::warn;

use crate::model::{AccountInfo, DeviceRecord, Readings};

/// `(f - 32) * 5/9`.
pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Convert a portal temperature to Celsius unless the account is metric.
pub fn normalize_temperature(value: f64, is_metric: bool) -> f64 {
    if is_metric {
        value
    } else {
        fahrenheit_to_celsius(value)
    }
}

impl From<&StatusPage> for AccountInfo {
    fn from(page: &StatusPage) -> Self {
        Self {
            provider_id: page.provider_id,
            gateway_ids: page.gateway_ids.clone(),
            is_metric: page.is_metric,
        }
    }
}

/// Build a record from a raw device. `None` when the device has no
/// observation to read from.
pub fn device_record(raw: &RawDevice, is_metric: bool) -> Option<DeviceRecord> {
    let obs = raw.latest()?;
    Some(DeviceRecord {
        device_id: raw.device_id.clone(),
        name: raw.device_name.clone().unwrap_or_default(),
        readings: Readings {
            current_temp: normalize_temperature(obs.ambient_temp, is_metric),
            raw_temp: obs.ambient_temp,
            current_rh: obs.humidity,
            low_batt: obs.lowbattery,
        },
    })
}

/// Records for every device on the page, in page order. Devices with no
/// observation are skipped.
pub fn records_from_status(page: &StatusPage) -> Vec<DeviceRecord> {
    page.devices
        .iter()
        .filter_map(|raw| {
            let record = device_record(raw, page.is_metric);
            if record.is_none() {
                warn!(
                    device_id = %raw.device_id,
                    name = raw.device_name.as_deref().unwrap_or_default(),
                    "device has no observations, skipped"
                );
            }
            record
        })
        .collect()
}
