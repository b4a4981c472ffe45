use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Collection and ownership settings for subscription reconciliation
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    /// Remote platform session settings
    #[serde(default)]
    pub remote: RemoteConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Server validations
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        let scheme = self.server.scheme.to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err("server.scheme must be http or https".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        // Reconcile validations
        if self.reconcile.collection_title.trim().is_empty() {
            return Err("reconcile.collection_title must not be empty".into());
        }
        if self.reconcile.owner_prefix.is_empty() {
            return Err("reconcile.owner_prefix must not be empty".into());
        }
        if self.reconcile.owner_prefix.chars().any(char::is_whitespace) {
            return Err("reconcile.owner_prefix must not contain whitespace".into());
        }
        if self.reconcile.extended_description_field.is_empty() {
            return Err("reconcile.extended_description_field must not be empty".into());
        }
        // Remote validations
        if self.remote.timeout_ms == 0 {
            return Err("remote.timeout_ms must be > 0".into());
        }
        if !self.remote.batch_path.starts_with('/') {
            return Err("remote.batch_path must start with '/'".into());
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Scheme assumed for inbound requests that carry no `X-Forwarded-Proto`.
    #[serde(default = "default_scheme")]
    pub scheme: String,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_scheme() -> String {
    "http".into()
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            scheme: default_scheme(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Settings that identify the watched collection and this handler's subscriptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Title of the canonical collection, matched exactly.
    #[serde(default = "default_collection_title")]
    pub collection_title: String,
    /// Name prefix that marks a subscription as owned by this handler.
    #[serde(default = "default_owner_prefix")]
    pub owner_prefix: String,
    /// Item field set on item-adding/item-updating events.
    #[serde(default = "default_extended_description_field")]
    pub extended_description_field: String,
}

pub const DEFAULT_OWNER_PREFIX: &str = "Eventhook.Receivers.AppEventReceiver";

fn default_collection_title() -> String {
    "MyList".into()
}
fn default_owner_prefix() -> String {
    DEFAULT_OWNER_PREFIX.into()
}
fn default_extended_description_field() -> String {
    "_ExtendedDescription".into()
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            collection_title: default_collection_title(),
            owner_prefix: default_owner_prefix(),
            extended_description_field: default_extended_description_field(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteBackend {
    /// Batches are POSTed to the site named by the event context.
    Http,
    /// Process-local object graph; state is lost on restart.
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_remote_backend")]
    pub backend: RemoteBackend,
    #[serde(default = "default_remote_timeout_ms")]
    pub timeout_ms: u64,
    /// Batch endpoint path beneath the site URL.
    #[serde(default = "default_batch_path")]
    pub batch_path: String,
}

fn default_remote_backend() -> RemoteBackend {
    RemoteBackend::Http
}
fn default_remote_timeout_ms() -> u64 {
    30_000
}
fn default_batch_path() -> String {
    eventhook_remote::http::DEFAULT_BATCH_PATH.into()
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            backend: default_remote_backend(),
            timeout_ms: default_remote_timeout_ms(),
            batch_path: default_batch_path(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if pathbuf.exists() {
                    builder = builder.add_source(File::from(pathbuf));
                }
            }
            None => {
                // Try default root-level file
                let default_path = PathBuf::from("eventhook.toml");
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., EVENTHOOK__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("EVENTHOOK")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.reconcile.collection_title, "MyList");
        assert_eq!(cfg.reconcile.owner_prefix, DEFAULT_OWNER_PREFIX);
        assert_eq!(cfg.remote.backend, RemoteBackend::Http);
        assert_eq!(cfg.addr().port(), 8080);
    }

    #[test]
    fn prefix_with_whitespace_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.reconcile.owner_prefix = "My Handler".into();
        let err = cfg.validate().unwrap_err();
        assert!(err.contains("owner_prefix"));
    }

    #[test]
    fn empty_collection_title_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.reconcile.collection_title = "  ".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn relative_batch_path_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.remote.batch_path = "_api/batch".into();
        assert!(cfg.validate().is_err());
    }
}
