// ── Device domain type ──

use serde::{Deserialize, Serialize};

use super::reading::{ReadingKind, ReadingValue, Readings};

/// Normalized snapshot of one physical sensor device.
///
/// Records are replaced wholesale on every successful refresh; nothing
/// mutates one in place. `name` is the identity key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub device_id: String,
    pub name: String,
    pub readings: Readings,
}

impl DeviceRecord {
    pub fn reading(&self, kind: ReadingKind) -> ReadingValue {
        self.readings.get(kind)
    }
}
