//! Autoindex server library
//!
//! Exposes configuration and the HTTP transport for testing and library usage.

pub mod config;
pub mod server;

pub use config::{Config, ConfigError};

#[derive(clap::Parser, Debug, Default)]
#[command(
    name = "autoindex",
    version,
    about = "Serve cached file and directory metadata over HTTP"
)]
pub struct Args {
    /// Config file (default: /etc/autoindex/config.toml, then ./config.toml)
    #[arg(short, long)]
    pub config: Option<std::path::PathBuf>,

    /// Directory to serve
    #[arg(long)]
    pub root: Option<std::path::PathBuf>,

    /// Listen address (IP)
    #[arg(long)]
    pub addr: Option<String>,

    /// Listen port
    #[arg(long)]
    pub port: Option<u16>,

    /// Seconds a cached answer stays fresh
    #[arg(long)]
    pub ttl_secs: Option<u64>,

    /// Total cache budget in bytes
    #[arg(long)]
    pub max_size_bytes: Option<u64>,

    /// debug | info | warn | error | none
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Args {
    /// Command-line values win over the config file.
    pub fn apply(&self, config: &mut Config) {
        if let Some(root) = &self.root {
            config.filesystem.root = root.clone();
        }
        if let Some(addr) = &self.addr {
            config.http.addr = addr.clone();
        }
        if let Some(port) = self.port {
            config.http.port = port;
        }
        if let Some(ttl_secs) = self.ttl_secs {
            config.cache.ttl_secs = ttl_secs;
        }
        if let Some(max_size_bytes) = self.max_size_bytes {
            config.cache.max_size_bytes = max_size_bytes;
        }
        if let Some(level) = &self.log_level {
            config.log.level = level.clone();
        }
    }
}
