use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use liftoff_ledger::{DEFAULT_PROOF_INTERVAL, DEFAULT_REDUNDANCY, DEFAULT_TERM_YEARS};

/// Settings for the publish pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Maximum file (and manifest) publishes in progress across the whole walk.
    pub max_in_flight: usize,
    pub heartbeat_secs: u64,
    /// Where `{dirname}.json` audit copies are written.
    pub audit_dir: PathBuf,
    pub write_audit: bool,
    pub proof_interval: i64,
    pub redundancy: i64,
    pub term_years: i64,
    pub memo: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 20,
            heartbeat_secs: 10,
            audit_dir: PathBuf::from("."),
            write_audit: true,
            proof_interval: DEFAULT_PROOF_INTERVAL,
            redundancy: DEFAULT_REDUNDANCY,
            term_years: DEFAULT_TERM_YEARS,
            memo: "Uploaded with liftoff".into(),
        }
    }
}

impl PublishConfig {
    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PublishConfig::default();
        assert_eq!(config.max_in_flight, 20);
        assert_eq!(config.redundancy, 3);
        assert_eq!(config.proof_interval, 40);
        assert!(config.write_audit);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config: PublishConfig = serde_json::from_str(r#"{"max_in_flight": 4}"#).unwrap();
        assert_eq!(config.max_in_flight, 4);
        assert_eq!(config.memo, "Uploaded with liftoff");
    }
}
