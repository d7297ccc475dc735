// ── Account domain type ──

use serde::{Deserialize, Serialize};

/// Account-level facts from the last parsed status page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub provider_id: u64,
    pub gateway_ids: Vec<String>,
    /// `false` when the portal reports in Fahrenheit.
    pub is_metric: bool,
}
