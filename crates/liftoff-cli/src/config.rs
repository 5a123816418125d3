use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use liftoff_ledger::{GatewayConfig, QueueConfig};
use liftoff_provider::UploadConfig;
use liftoff_publish::PublishConfig;

use crate::cli::LaunchArgs;

/// Contents of `liftoff.toml`. Every section is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ledger: GatewayConfig,
    pub queue: QueueConfig,
    pub upload: UploadConfig,
    pub publish: PublishConfig,
}

impl Settings {
    /// Read `path` if it exists, otherwise start from defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Apply command-line (and environment) overrides.
    pub fn apply(&mut self, args: &LaunchArgs) {
        if let Some(url) = &args.ledger_url {
            self.ledger.url = url.clone();
        }
        if let Some(max) = args.max_in_flight {
            self.publish.max_in_flight = max;
        }
        if let Some(quorum) = args.quorum {
            self.upload.quorum = quorum;
        }
        if let Some(dir) = &args.audit_dir {
            self.publish.audit_dir = dir.clone();
        }
        if args.no_audit {
            self.publish.write_audit = false;
        }
        if args.seed.is_some() {
            self.upload.seed = args.seed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("liftoff.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.queue.batch_size, 10);
        assert_eq!(settings.upload.quorum, 3);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("liftoff.toml");
        std::fs::write(
            &path,
            "[ledger]\nurl = \"http://gw:8090\"\n\n[queue]\ninterval_ms = 2000\n\n[publish]\nmax_in_flight = 5\n",
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.ledger.url, "http://gw:8090");
        assert_eq!(settings.queue.interval_ms, 2000);
        assert_eq!(settings.queue.batch_size, 10);
        assert_eq!(settings.publish.max_in_flight, 5);
        assert_eq!(settings.upload.max_passes, 5);
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("liftoff.toml");
        std::fs::write(&path, "[queue]\nbatch_size = \"ten\"\n").unwrap();
        assert!(Settings::load(&path).is_err());
    }

    #[test]
    fn flags_override_file() {
        let mut settings = Settings::default();
        settings.apply(&LaunchArgs {
            dir: PathBuf::from("site"),
            ledger_url: Some("http://other:1".into()),
            max_in_flight: Some(3),
            quorum: Some(1),
            audit_dir: Some(PathBuf::from("audits")),
            no_audit: true,
            seed: Some(5),
        });
        assert_eq!(settings.ledger.url, "http://other:1");
        assert_eq!(settings.publish.max_in_flight, 3);
        assert_eq!(settings.upload.quorum, 1);
        assert_eq!(settings.publish.audit_dir, PathBuf::from("audits"));
        assert!(!settings.publish.write_audit);
        assert_eq!(settings.upload.seed, Some(5));
    }
}
