//! Vault configuration: where the collaborator lives and where its data sits on disk.
//!
//! Precedence: built-in defaults < TOML file (`HELEN_CONFIG` or `config/helen.toml`)
//! < environment (`HELEN__SERVICE_URL`, `HELEN__DATA_DIR`, ...) < explicit overrides
//! applied by the caller (CLI flags).

use crate::error::VaultResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config/helen.toml";
const STORAGE_DIR_NAME: &str = "chroma_db";
const LEDGER_FILE_NAME: &str = "seeded_content.json";

fn default_service_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./retriever/data")
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("./backups")
}

fn default_guide_path() -> PathBuf {
    PathBuf::from("./conversation_management_guide.json")
}

fn default_probe_timeout_secs() -> u64 {
    2
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Vault configuration.
///
/// | Key | Default | Description |
/// |-----|---------|-------------|
/// | service_url | `http://localhost:8000` | Collaborator (vector service) base URL. |
/// | data_dir | `./retriever/data` | Parent of the persistent store and the seed ledger. |
/// | storage_dir | `<data_dir>/chroma_db` | Persistent storage tree captured by backups. |
/// | ledger_path | `<data_dir>/seeded_content.json` | Seed ledger file. |
/// | backup_dir | `./backups` | Where `.zip` archives are written and listed. |
/// | guide_path | `./conversation_management_guide.json` | Conversation guide used by `seed`/`init`. |
/// | probe_timeout_secs | 2 | Upper bound for a `/health` probe. |
/// | request_timeout_secs | 30 | Upper bound for any other collaborator request. |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    #[serde(default = "default_service_url")]
    pub service_url: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
    #[serde(default)]
    pub ledger_path: Option<PathBuf>,
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,
    #[serde(default = "default_guide_path")]
    pub guide_path: PathBuf,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            service_url: default_service_url(),
            data_dir: default_data_dir(),
            storage_dir: None,
            ledger_path: None,
            backup_dir: default_backup_dir(),
            guide_path: default_guide_path(),
            probe_timeout_secs: default_probe_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl VaultConfig {
    /// Load config from file and environment. Precedence: env `HELEN_CONFIG` path > `config/helen.toml` > defaults.
    pub fn load() -> VaultResult<Self> {
        let config_path =
            std::env::var("HELEN_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&config_path))
    }

    /// Load from an explicit file (skipped when it does not exist) layered under `HELEN__*` env vars.
    pub fn load_from(path: &Path) -> VaultResult<Self> {
        let builder = config::Config::builder()
            .set_default("service_url", default_service_url())?
            .set_default("data_dir", default_data_dir().to_string_lossy().to_string())?
            .set_default("backup_dir", default_backup_dir().to_string_lossy().to_string())?
            .set_default("guide_path", default_guide_path().to_string_lossy().to_string())?
            .set_default("probe_timeout_secs", default_probe_timeout_secs())?
            .set_default("request_timeout_secs", default_request_timeout_secs())?;

        let builder = if path.exists() {
            tracing::debug!(target: "helen::config", path = %path.display(), "Loading config file");
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(
                config::Environment::with_prefix("HELEN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: VaultConfig = built.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> VaultResult<()> {
        let url = self.service_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(crate::VaultError::Config(format!(
                "service_url must be an http(s) URL, got {:?}",
                self.service_url
            )));
        }
        if self.probe_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err(crate::VaultError::Config(
                "timeouts must be at least one second".to_string(),
            ));
        }
        Ok(())
    }

    /// Persistent storage tree owned by the collaborator.
    pub fn storage_dir(&self) -> PathBuf {
        self.storage_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join(STORAGE_DIR_NAME))
    }

    /// Seed ledger file.
    pub fn ledger_path(&self) -> PathBuf {
        self.ledger_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(LEDGER_FILE_NAME))
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.service_url.trim().trim_end_matches('/')
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_paths_follow_data_dir() {
        let config = VaultConfig {
            data_dir: PathBuf::from("/srv/helen"),
            ..Default::default()
        };
        assert_eq!(config.storage_dir(), PathBuf::from("/srv/helen/chroma_db"));
        assert_eq!(config.ledger_path(), PathBuf::from("/srv/helen/seeded_content.json"));
    }

    #[test]
    fn explicit_paths_win() {
        let config = VaultConfig {
            storage_dir: Some(PathBuf::from("/mnt/store")),
            ledger_path: Some(PathBuf::from("/mnt/ledger.json")),
            ..Default::default()
        };
        assert_eq!(config.storage_dir(), PathBuf::from("/mnt/store"));
        assert_eq!(config.ledger_path(), PathBuf::from("/mnt/ledger.json"));
    }

    #[test]
    fn base_url_strips_trailing_slash() {
        let config = VaultConfig {
            service_url: "http://127.0.0.1:8000/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.base_url(), "http://127.0.0.1:8000");
    }

    #[test]
    fn load_from_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("helen.toml");
        std::fs::write(
            &path,
            "service_url = \"http://vectors.internal:9000\"\nbackup_dir = \"/var/backups/helen\"\nprobe_timeout_secs = 5\n",
        )
        .unwrap();

        let config = VaultConfig::load_from(&path).unwrap();
        assert_eq!(config.service_url, "http://vectors.internal:9000");
        assert_eq!(config.backup_dir, PathBuf::from("/var/backups/helen"));
        assert_eq!(config.probe_timeout_secs, 5);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn load_rejects_non_http_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("helen.toml");
        std::fs::write(&path, "service_url = \"localhost:8000\"\n").unwrap();
        assert!(VaultConfig::load_from(&path).is_err());
    }
}
