// ── Device registry ──
//
// In-memory store of the last known device records, written only by the
// refresh coordinator.

mod refresh;
mod registry;

pub use refresh::ReplaceReport;
pub use registry::{DeviceRegistry, RegistrySnapshot};
