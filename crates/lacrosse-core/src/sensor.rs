// ── Bridge boundary ──
//
// A `Sensor` is a read-only, pull-style handle on one reading of one
// device. Bridge adapters hold these and call `get` whenever the host
// platform asks for a value; every call goes through the coordinator's
// cache window.

use strum::IntoEnumIterator;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::coordinator::Coordinator;
use crate::error::CoreError;
use crate::model::{ReadingKind, ReadingValue};

/// Read-only handle on one reading of one device.
#[derive(Clone)]
pub struct Sensor {
    coordinator: Coordinator,
    device_name: String,
    device_id: String,
    kind: ReadingKind,
}

impl Sensor {
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn kind(&self) -> ReadingKind {
        self.kind
    }

    /// Current value, refreshed first if the cache is stale.
    pub async fn value(&self) -> Result<ReadingValue, CoreError> {
        self.coordinator.query(&self.device_name, self.kind).await
    }

    /// Callback form of [`value`](Self::value). `on_done` runs exactly once.
    pub fn get<F>(&self, on_done: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<ReadingValue, CoreError>) + Send + 'static,
    {
        let sensor = self.clone();
        tokio::spawn(async move { on_done(sensor.value().await) })
    }
}

impl std::fmt::Debug for Sensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sensor")
            .field("device_name", &self.device_name)
            .field("device_id", &self.device_id)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    /// One sensor per device and reading kind, for the devices currently
    /// in the registry.
    pub fn sensors(&self) -> Vec<Sensor> {
        self.store()
            .devices()
            .iter()
            .flat_map(|device| {
                ReadingKind::iter().map(move |kind| Sensor {
                    coordinator: self.clone(),
                    device_name: device.name.clone(),
                    device_id: device.device_id.clone(),
                    kind,
                })
            })
            .collect()
    }

    /// Refresh, then list sensors. Used once at bridge start-up.
    pub async fn discover(&self) -> Result<Vec<Sensor>, CoreError> {
        self.device_list().await.inspect_err(|e| {
            warn!(error = %e, "device discovery failed, no sensors registered");
        })?;
        let sensors = self.sensors();
        if sensors.is_empty() {
            return Err(CoreError::EmptyResult);
        }
        debug!(sensors = sensors.len(), "sensors discovered");
        Ok(sensors)
    }
}
