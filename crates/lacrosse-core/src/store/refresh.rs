// ── Refresh application logic ──
//
// Turns one parsed batch of device records into a new registry snapshot.
// Names are the identity key: unnamed devices are dropped, and within a
// batch the first occurrence of a name wins.

use std::collections::HashSet;
use std::sync::PoisonError;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::registry::{DeviceRegistry, RegistrySnapshot};
use crate::error::CoreError;
use crate::model::{AccountInfo, DeviceRecord};

/// What a refresh did to the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaceReport {
    /// Records now in the registry.
    pub kept: usize,
    /// Names registered for the first time in this process.
    pub added: Vec<String>,
    /// Names dropped because an earlier device in the batch had them.
    pub duplicates: Vec<String>,
    /// Devices dropped for having no name.
    pub unnamed: usize,
}

/// Drop unnamed devices and later duplicates, keeping batch order.
fn dedupe_by_name(records: Vec<DeviceRecord>) -> (Vec<DeviceRecord>, ReplaceReport) {
    let mut seen = HashSet::new();
    let mut report = ReplaceReport::default();
    let mut kept = Vec::with_capacity(records.len());

    for record in records {
        if record.name.is_empty() {
            warn!(device_id = %record.device_id, "device had no name, not added");
            report.unnamed += 1;
        } else if seen.insert(record.name.clone()) {
            kept.push(record);
        } else {
            warn!(name = %record.name, device_id = %record.device_id, "duplicate device name, dropped");
            report.duplicates.push(record.name);
        }
    }

    report.kept = kept.len();
    (kept, report)
}

impl DeviceRegistry {
    /// Replace the device set with one parsed batch.
    ///
    /// Fails with `EmptyResult`, leaving the registry untouched, when no
    /// named device survives.
    pub(crate) fn apply_refresh(
        &self,
        account: AccountInfo,
        records: Vec<DeviceRecord>,
    ) -> Result<ReplaceReport, CoreError> {
        let (kept, mut report) = dedupe_by_name(records);
        if kept.is_empty() {
            return Err(CoreError::EmptyResult);
        }

        {
            let mut known = self.known.lock().unwrap_or_else(PoisonError::into_inner);
            for record in &kept {
                if known.insert(record.name.clone()) {
                    info!(name = %record.name, device_id = %record.device_id, "added device");
                    report.added.push(record.name.clone());
                }
            }
        }

        self.install(RegistrySnapshot::new(kept, account, Utc::now()));
        debug!(devices = report.kept, "registry replaced");
        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::Readings;

    fn record(id: &str, name: &str, temp: f64) -> DeviceRecord {
        DeviceRecord {
            device_id: id.into(),
            name: name.into(),
            readings: Readings {
                current_temp: temp,
                raw_temp: temp,
                current_rh: 50.0,
                low_batt: false,
            },
        }
    }

    fn account() -> AccountInfo {
        AccountInfo {
            provider_id: 1,
            gateway_ids: vec!["g1".into()],
            is_metric: true,
        }
    }

    #[test]
    fn replace_holds_exactly_the_batch() {
        let registry = DeviceRegistry::new();
        assert!(registry.last_refreshed_at().is_none());

        let report = registry
            .apply_refresh(account(), vec![record("1", "Porch", 20.0), record("2", "Attic", 30.0)])
            .unwrap();

        assert_eq!(report.kept, 2);
        assert_eq!(report.added, vec!["Porch".to_string(), "Attic".to_string()]);
        assert_eq!(registry.names(), vec!["Porch".to_string(), "Attic".to_string()]);
        assert_eq!(registry.get("Attic").unwrap().device_id, "2");
        assert!(registry.last_refreshed_at().is_some());
        assert_eq!(registry.account().unwrap().provider_id, 1);
    }

    #[test]
    fn first_occurrence_of_a_name_wins() {
        let registry = DeviceRegistry::new();
        let report = registry
            .apply_refresh(
                account(),
                vec![
                    record("1", "Porch", 20.0),
                    record("2", "Porch", 99.0),
                    record("3", "Attic", 30.0),
                ],
            )
            .unwrap();

        assert_eq!(report.kept, 2);
        assert_eq!(report.duplicates, vec!["Porch".to_string()]);
        assert_eq!(registry.get("Porch").unwrap().device_id, "1");
    }

    #[test]
    fn all_unnamed_is_empty_result_and_leaves_registry_alone() {
        let registry = DeviceRegistry::new();
        registry
            .apply_refresh(account(), vec![record("1", "Porch", 20.0)])
            .unwrap();
        let before = registry.snapshot();

        let result = registry.apply_refresh(account(), vec![record("2", "", 10.0)]);

        assert!(matches!(result, Err(CoreError::EmptyResult)));
        assert!(std::sync::Arc::ptr_eq(&before, &registry.snapshot()));
    }

    #[test]
    fn names_are_added_once_per_process() {
        let registry = DeviceRegistry::new();
        registry
            .apply_refresh(account(), vec![record("1", "Porch", 20.0)])
            .unwrap();
        let report = registry
            .apply_refresh(account(), vec![record("1", "Porch", 21.0), record("2", "Attic", 30.0)])
            .unwrap();

        assert_eq!(report.added, vec!["Attic".to_string()]);
        assert!((registry.get("Porch").unwrap().readings.current_temp - 21.0).abs() < f64::EPSILON);
    }

    #[test]
    fn subscribers_see_replacements() {
        let registry = DeviceRegistry::new();
        let mut rx = registry.subscribe();
        assert!(rx.borrow_and_update().is_empty());

        registry
            .apply_refresh(account(), vec![record("1", "Porch", 20.0)])
            .unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);
    }

    #[test]
    fn poisoned_name_set_does_not_block_refresh() {
        let registry = std::sync::Arc::new(DeviceRegistry::new());
        let poisoner = std::sync::Arc::clone(&registry);
        let joined = std::thread::spawn(move || {
            let _held = poisoner.known.lock().unwrap();
            panic!("panic while holding the name set");
        })
        .join();
        assert!(joined.is_err());

        let report = registry
            .apply_refresh(account(), vec![record("1", "Porch", 20.0)])
            .unwrap();

        assert_eq!(report.kept, 1);
        assert_eq!(registry.names(), vec!["Porch".to_string()]);
    }
}
