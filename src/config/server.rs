use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const CONFIG_FILE_NAME: &str = "lyceum.toml";
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub access_ttl_seconds: i64,
    pub refresh_ttl_seconds: i64,
    pub metrics_interval_seconds: u64,
    /// Disk whose usage is sampled. Defaults to the media directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_disk_path: Option<PathBuf>,
    pub metrics_history_limit: i64,
}

impl ServerConfig {
    /// Reads a TOML config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Loads `<data_dir>/lyceum.toml` when present, defaults otherwise.
    pub fn load_from_data_dir(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE_NAME);
        let mut config = if path.exists() {
            Self::load(&path)?
        } else {
            Self::default()
        };
        config.data_dir = data_dir.to_path_buf();
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.jwt_secret.len() < MIN_SECRET_LEN {
            return Err(Error::Config(format!(
                "jwt_secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        if self.jwt_issuer.trim().is_empty() {
            return Err(Error::Config("jwt_issuer must not be empty".to_string()));
        }
        if self.access_ttl_seconds <= 0 || self.refresh_ttl_seconds <= 0 {
            return Err(Error::Config("token lifetimes must be positive".to_string()));
        }
        if self.metrics_interval_seconds == 0 {
            return Err(Error::Config(
                "metrics_interval_seconds must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("lyceum.db")
    }

    #[must_use]
    pub fn media_dir(&self) -> PathBuf {
        self.data_dir.join("media")
    }

    #[must_use]
    pub fn metrics_disk_path(&self) -> PathBuf {
        self.metrics_disk_path
            .clone()
            .unwrap_or_else(|| self.media_dir())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            jwt_secret: String::new(),
            jwt_issuer: "lyceum".to_string(),
            access_ttl_seconds: 4 * 60 * 60,
            refresh_ttl_seconds: 14 * 24 * 60 * 60,
            metrics_interval_seconds: 5,
            metrics_disk_path: None,
            metrics_history_limit: 120,
        }
    }
}
