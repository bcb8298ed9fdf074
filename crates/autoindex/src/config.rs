//! Server configuration file
//!
//! TOML, every section optional:
//!
//! ```toml
//! [log]
//! level = "info"
//!
//! [filesystem]
//! root = "/srv/files"
//!
//! [http]
//! addr = "::"
//! port = 80
//!
//! [cache]
//! ttl_secs = 60
//! max_size_bytes = 10485760
//! max_entry_size_bytes = 10240
//! ```

use anyhow::{Context, Result};
use autoindex_index::IndexConfig;
use autoindex_logging::LogLevel;
use autoindex_protocol::defaults;
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Where the config file is looked up when none is given explicitly.
pub fn search_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from(format!("/etc/{}/config.toml", defaults::APP_NAME)),
        PathBuf::from("config.toml"),
    ]
}

#[derive(Debug, Error)]
#[error("Invalid configuration: {}", .problems.join("; "))]
pub struct ConfigError {
    pub problems: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub log: LogSection,
    pub filesystem: FilesystemSection,
    pub http: HttpSection,
    pub cache: CacheSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSection {
    /// debug | info | warn | error | none
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: LogLevel::default().as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilesystemSection {
    pub root: PathBuf,
}

impl Default for FilesystemSection {
    fn default() -> Self {
        Self {
            root: PathBuf::from(defaults::DEFAULT_ROOT),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpSection {
    pub addr: String,
    /// 0 selects the default port
    pub port: u16,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            addr: defaults::DEFAULT_HTTP_ADDR.to_string(),
            port: defaults::DEFAULT_HTTP_PORT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSection {
    pub ttl_secs: u64,
    pub max_size_bytes: u64,
    pub max_entry_size_bytes: usize,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttl_secs: defaults::DEFAULT_TTL_SECS,
            max_size_bytes: defaults::DEFAULT_MAX_SIZE_BYTES,
            max_entry_size_bytes: defaults::DEFAULT_MAX_ENTRY_SIZE_BYTES,
        }
    }
}

fn parse_ip(addr: &str) -> Option<IpAddr> {
    let addr = addr.trim();
    let addr = addr
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(addr);
    addr.parse().ok()
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse config TOML")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("Failed to load config file: {}", path.display()))
    }

    /// Load `explicit` if given, else the first existing search path, else
    /// defaults. Also returns the file that was used.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::from_path(path)?, Some(path.to_path_buf())));
        }
        for path in search_paths() {
            if path.is_file() {
                let config = Self::from_path(&path)?;
                return Ok((config, Some(path)));
            }
        }
        Ok((Self::default(), None))
    }

    /// Check every field; reports all problems at once.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let mut problems = Vec::new();

        if let Err(e) = self.log.level.parse::<LogLevel>() {
            problems.push(e);
        }
        if parse_ip(&self.http.addr).is_none() {
            problems.push(format!("http.addr is not an IP address: '{}'", self.http.addr));
        }
        if !self.filesystem.root.is_dir() {
            problems.push(format!(
                "filesystem.root is not a directory: {}",
                self.filesystem.root.display()
            ));
        }
        if self.cache.ttl_secs == 0 {
            problems.push("cache.ttl_secs must be greater than 0".to_string());
        }
        if self.cache.max_size_bytes < defaults::MIN_MAX_SIZE_BYTES {
            problems.push(format!(
                "cache.max_size_bytes must be at least {}, got {}",
                defaults::MIN_MAX_SIZE_BYTES,
                self.cache.max_size_bytes
            ));
        }
        if self.cache.max_entry_size_bytes == 0 {
            problems.push("cache.max_entry_size_bytes must be greater than 0".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError { problems })
        }
    }

    pub fn log_level(&self) -> LogLevel {
        self.log.level.parse().unwrap_or_default()
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip = parse_ip(&self.http.addr)
            .with_context(|| format!("Invalid http.addr: '{}'", self.http.addr))?;
        let port = match self.http.port {
            0 => defaults::DEFAULT_HTTP_PORT,
            port => port,
        };
        Ok(SocketAddr::new(ip, port))
    }

    pub fn index_config(&self) -> IndexConfig {
        IndexConfig {
            root: self.filesystem.root.clone(),
            ttl: Duration::from_secs(self.cache.ttl_secs),
            max_size: self.cache.max_size_bytes,
            max_entry_size: self.cache.max_entry_size_bytes,
            ..IndexConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_file_is_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.log_level(), LogLevel::Info);
        assert_eq!(config.socket_addr().unwrap().port(), 80);
    }

    #[test]
    fn test_full_file() {
        let dir = TempDir::new().unwrap();
        let text = format!(
            r#"
            [log]
            level = "debug"

            [filesystem]
            root = "{}"

            [http]
            addr = "127.0.0.1"
            port = 8080

            [cache]
            ttl_secs = 5
            max_size_bytes = 2097152
            max_entry_size_bytes = 4096
            "#,
            dir.path().display()
        );
        let config = Config::from_toml_str(&text).unwrap();
        config.validate().unwrap();

        assert_eq!(config.log_level(), LogLevel::Debug);
        assert_eq!(
            config.socket_addr().unwrap(),
            "127.0.0.1:8080".parse::<SocketAddr>().unwrap()
        );

        let index = config.index_config();
        assert_eq!(index.root, dir.path());
        assert_eq!(index.ttl, Duration::from_secs(5));
        assert_eq!(index.max_size, 2_097_152);
        assert_eq!(index.max_entry_size, 4096);
    }

    #[test]
    fn test_bracketed_ipv6_and_zero_port() {
        let mut config = Config::default();
        config.http.addr = "[::1]".to_string();
        config.http.port = 0;
        assert_eq!(
            config.socket_addr().unwrap(),
            "[::1]:80".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(Config::from_toml_str("[cache]\nttl = \"1m\"\n").is_err());
    }

    #[test]
    fn test_validate_collects_all_problems() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.log.level = "loud".to_string();
        config.http.addr = "localhost".to_string();
        config.filesystem.root = dir.path().join("missing");
        config.cache.ttl_secs = 0;
        config.cache.max_size_bytes = 1024;
        config.cache.max_entry_size_bytes = 0;

        let err = config.validate().unwrap_err();
        assert_eq!(err.problems.len(), 6);
        assert!(err.to_string().contains("http.addr"));
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("autoindex.toml");
        std::fs::write(&path, "[http]\nport = 9000\n").unwrap();

        let (config, source) = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.http.port, 9000);
        assert_eq!(source.as_deref(), Some(path.as_path()));

        assert!(Config::load(Some(dir.path().join("absent.toml").as_path())).is_err());
    }
}
