//! Session-aware, cache-coherent refresh core for La Crosse Alerts sensors.
//!
//! The portal only exposes readings through a logged-in HTML page, so this
//! crate keeps a long-lived session, caches the scraped readings for a
//! bounded window, and makes sure concurrent cache misses share one fetch:
//!
//! - **[`Coordinator`]**: Central facade. [`device_list()`](Coordinator::device_list)
//!   and [`query()`](Coordinator::query) serve from cache inside the window;
//!   outside it they start (or join) the single in-flight refresh cycle.
//!   A cycle that finds the session stale logs in again and refetches once.
//!
//! - **[`SessionManager`]**: Owns login state. Logs in on demand by
//!   replaying the portal's browser flow; never renews proactively.
//!
//! - **[`DeviceRegistry`]**: Snapshot store of [`DeviceRecord`]s keyed by
//!   device name, replaced wholesale after each successful cycle.
//!
//! - **[`Sensor`]**: Pull-style, read-only handle per device and reading
//!   for bridge adapters.

pub mod config;
pub mod convert;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod sensor;
pub mod session;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::PortalConfig;
pub use coordinator::{Coordinator, DeviceList};
pub use error::CoreError;
pub use sensor::Sensor;
pub use session::{SessionInfo, SessionManager};
pub use store::{DeviceRegistry, RegistrySnapshot, ReplaceReport};

pub use model::{AccountInfo, DeviceRecord, ReadingKind, ReadingValue, Readings};
