use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { worker_threads: Some(4) }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_name")]
    pub default_name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Snapshot used by `load_on_start` / `save_on_shutdown`; relative paths live under `data_dir`.
    #[serde(default)]
    pub snapshot_file: Option<String>,
    #[serde(default)]
    pub load_on_start: bool,
    #[serde(default)]
    pub save_on_shutdown: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_name: default_store_name(),
            data_dir: default_data_dir(),
            snapshot_file: None,
            load_on_start: false,
            save_on_shutdown: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_admin_addr")]
    pub addr: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self { enabled: false, addr: default_admin_addr() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `compact` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { format: default_log_format() }
    }
}

fn default_store_name() -> String { "default".into() }
fn default_data_dir() -> String { "data".into() }
fn default_admin_addr() -> String { "127.0.0.1:9188".into() }
fn default_log_format() -> String { "compact".into() }

fn config_path() -> String {
    std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string())
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    load_from_str(&content).with_context(|| format!("parsing {path}"))
}

pub fn load_from_str(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load and validate the file at `CONFIG_PATH` (default `config.toml`).
    /// A missing file yields defaults; the flag reports whether it was found.
    pub fn load_or_default() -> Result<(Self, bool)> {
        let path = config_path();
        if !Path::new(&path).exists() {
            let mut cfg = AppConfig::default();
            cfg.normalize_and_validate()?;
            return Ok((cfg, false));
        }
        let mut cfg = load_from_file(&path)?;
        cfg.normalize_and_validate()?;
        Ok((cfg, true))
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.runtime.normalize();
        self.store.validate()?;
        self.admin.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

impl RuntimeConfig {
    fn normalize(&mut self) {
        match self.worker_threads {
            Some(0) | None => {
                self.worker_threads = std::env::var("TOKIO_WORKER_THREADS")
                    .ok()
                    .and_then(|v| v.parse::<usize>().ok())
                    .filter(|w| *w > 0)
                    .or(Some(4));
            }
            Some(_) => {}
        }
    }
}

impl StoreConfig {
    fn validate(&self) -> Result<()> {
        if self.default_name.trim().is_empty() {
            return Err(anyhow!("store.default_name must not be empty"));
        }
        if self.data_dir.trim().is_empty() {
            return Err(anyhow!("store.data_dir must not be empty"));
        }
        if (self.load_on_start || self.save_on_shutdown) && self.snapshot_file.is_none() {
            return Err(anyhow!("store.snapshot_file is required when load_on_start or save_on_shutdown is set"));
        }
        Ok(())
    }

    /// Resolved snapshot location, if one is configured.
    pub fn snapshot_path(&self) -> Option<PathBuf> {
        self.snapshot_file.as_ref().map(|file| {
            let file = Path::new(file);
            if file.is_absolute() {
                file.to_path_buf()
            } else {
                Path::new(&self.data_dir).join(file)
            }
        })
    }
}

impl AdminConfig {
    fn validate(&self) -> Result<()> {
        if self.enabled && self.addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(anyhow!("admin.addr must be a socket address, got `{}`", self.addr));
        }
        Ok(())
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<()> {
        match self.format.to_ascii_lowercase().as_str() {
            "compact" | "json" => Ok(()),
            other => Err(anyhow!("logging.format must be `compact` or `json`, got `{other}`")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() -> Result<()> {
        let mut cfg = load_from_str("")?;
        cfg.normalize_and_validate()?;
        assert_eq!(cfg.store.default_name, "default");
        assert_eq!(cfg.store.data_dir, "data");
        assert!(cfg.store.snapshot_path().is_none());
        assert!(!cfg.admin.enabled);
        assert!(cfg.runtime.worker_threads.is_some_and(|w| w > 0));
        Ok(())
    }

    #[test]
    fn full_file_parses() -> Result<()> {
        let mut cfg = load_from_str(
            r#"
            [runtime]
            worker_threads = 2

            [store]
            default_name = "main"
            data_dir = "/var/lib/kv"
            snapshot_file = "main.json"
            load_on_start = true
            save_on_shutdown = true

            [admin]
            enabled = true
            addr = "0.0.0.0:9100"

            [logging]
            format = "json"
            "#,
        )?;
        cfg.normalize_and_validate()?;
        assert_eq!(cfg.runtime.worker_threads, Some(2));
        assert_eq!(cfg.store.default_name, "main");
        assert_eq!(cfg.store.snapshot_path(), Some(PathBuf::from("/var/lib/kv/main.json")));
        assert!(cfg.admin.enabled);
        Ok(())
    }

    #[test]
    fn absolute_snapshot_path_is_kept() -> Result<()> {
        let cfg = load_from_str("[store]\nsnapshot_file = \"/tmp/snap.json\"\n")?;
        assert_eq!(cfg.store.snapshot_path(), Some(PathBuf::from("/tmp/snap.json")));
        Ok(())
    }

    #[test]
    fn snapshot_flags_need_a_file() -> Result<()> {
        let mut cfg = load_from_str("[store]\nload_on_start = true\n")?;
        assert!(cfg.normalize_and_validate().is_err());
        Ok(())
    }

    #[test]
    fn missing_or_present_file_via_config_path() -> Result<()> {
        let dir = std::env::temp_dir().join(format!("kvstore_configs_{}", std::process::id()));
        std::fs::create_dir_all(&dir)?;
        let missing = dir.join("absent.toml");
        let present = dir.join("present.toml");
        std::fs::write(&present, "[runtime]\nworker_threads = 3\n[store]\ndefault_name = \"main\"\n")?;

        std::env::set_var("CONFIG_PATH", &missing);
        let (cfg, found) = AppConfig::load_or_default()?;
        assert!(!found);
        assert_eq!(cfg.store.default_name, "default");

        std::env::set_var("CONFIG_PATH", &present);
        let (cfg, found) = AppConfig::load_or_default()?;
        std::env::remove_var("CONFIG_PATH");
        assert!(found);
        assert_eq!(cfg.runtime.worker_threads, Some(3));
        assert_eq!(cfg.store.default_name, "main");

        let _ = std::fs::remove_dir_all(&dir);
        Ok(())
    }

    #[test]
    fn bad_admin_addr_and_log_format_rejected() -> Result<()> {
        let mut cfg = load_from_str("[admin]\nenabled = true\naddr = \"nowhere\"\n")?;
        assert!(cfg.normalize_and_validate().is_err());

        let mut cfg = load_from_str("[logging]\nformat = \"xml\"\n")?;
        assert!(cfg.normalize_and_validate().is_err());

        let mut cfg = load_from_str("[store]\ndefault_name = \" \"\n")?;
        assert!(cfg.normalize_and_validate().is_err());
        Ok(())
    }
}
