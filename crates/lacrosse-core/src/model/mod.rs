// ── Domain model ──
//
// Canonical types handed to consumers. Readings are already normalized
// (temperatures in Celsius) by the time they land here.

pub mod account;
pub mod device;
pub mod reading;

pub use account::AccountInfo;
pub use device::DeviceRecord;
pub use reading::{ReadingKind, ReadingValue, Readings};
