use serde::{Deserialize, Serialize};

/// Ledger tuning knobs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Authority name written into every block's `signer` field.
    pub signer: String,
    /// Extra attempts after a lost index race before `append` gives up.
    pub max_append_retries: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            signer: "PoA".to_string(),
            max_append_retries: 5,
        }
    }
}

impl LedgerConfig {
    /// Total insert attempts one `append` may make.
    pub fn max_attempts(&self) -> u32 {
        self.max_append_retries.saturating_add(1)
    }
}
