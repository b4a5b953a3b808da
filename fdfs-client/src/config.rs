//! Client configuration.
//!
//! Settings come from a `client.conf` file in the usual FastDFS
//! `key = value` format, then from `FDFS_*` environment variables, then
//! from defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};

use crate::error::ClientError;

/// Tracker used when nothing else is configured.
pub const DEFAULT_TRACKER_SERVER: &str = "127.0.0.1:22122";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_IO_BUFFER_SIZE: usize = 64 * 1024;

/// Settings shared by tracker and storage connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Tracker addresses as `host:port`. Only the first is dialed.
    pub tracker_servers: Vec<String>,
    /// Limit on establishing a TCP connection. Exchanges have no timeout.
    pub connect_timeout: Duration,
    /// Capacity of the read and write buffers of each connection.
    pub io_buffer_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            tracker_servers: vec![DEFAULT_TRACKER_SERVER.to_string()],
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            io_buffer_size: DEFAULT_IO_BUFFER_SIZE,
        }
    }
}

impl ClientConfig {
    /// Load configuration.
    ///
    /// Searches in the following order:
    /// 1. The file named by `FDFS_CLIENT_CONF`, or `./client.conf`
    /// 2. Environment variables (`FDFS_TRACKER_SERVER`, `FDFS_CONNECT_TIMEOUT`)
    /// 3. Default values
    pub fn load() -> Result<Self, ClientError> {
        let mut config = match find_conf_file() {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env_with(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read a `client.conf` file.
    pub fn from_file(path: &Path) -> Result<Self, ClientError> {
        info!("Loading configuration from {:?}", path);
        let content = fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    /// Parse `client.conf` text.
    ///
    /// Unknown keys and `[section]` lines are ignored. `tracker_server`
    /// may appear more than once.
    pub fn parse(content: &str) -> Result<Self, ClientError> {
        let mut config = Self::default();
        let mut trackers = Vec::new();

        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                continue;
            }

            let Some(eq_pos) = line.find('=') else {
                warn!("client.conf line {}: expected key = value", lineno + 1);
                continue;
            };
            let key = line[..eq_pos].trim();
            let value = line[eq_pos + 1..].trim();

            match key {
                "tracker_server" => trackers.push(value.to_string()),
                "connect_timeout" => {
                    let secs: u64 = value.parse().map_err(|_| {
                        ClientError::Config(format!("invalid connect_timeout: {}", value))
                    })?;
                    config.connect_timeout = Duration::from_secs(secs);
                }
                "buffer_size" => {
                    config.io_buffer_size = parse_size(value).ok_or_else(|| {
                        ClientError::Config(format!("invalid buffer_size: {}", value))
                    })?;
                }
                _ => debug!("client.conf: ignoring {}", key),
            }
        }

        if !trackers.is_empty() {
            config.tracker_servers = trackers;
        }
        Ok(config)
    }

    /// Override settings from environment variables read through `lookup`.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(servers) = lookup("FDFS_TRACKER_SERVER") {
            let servers: Vec<String> = servers
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            if !servers.is_empty() {
                self.tracker_servers = servers;
            }
        }

        if let Some(timeout) = lookup("FDFS_CONNECT_TIMEOUT") {
            match timeout.trim().parse() {
                Ok(secs) => self.connect_timeout = Duration::from_secs(secs),
                Err(_) => warn!("Ignoring invalid FDFS_CONNECT_TIMEOUT: {}", timeout),
            }
        }

        debug!(
            "Using config: trackers={:?}, connect_timeout={:?}",
            self.tracker_servers, self.connect_timeout
        );
    }

    /// The tracker to dial.
    pub fn tracker_server(&self) -> Result<&str, ClientError> {
        self.tracker_servers
            .first()
            .map(String::as_str)
            .ok_or_else(|| ClientError::Config("no tracker_server configured".to_string()))
    }
}

fn find_conf_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("FDFS_CLIENT_CONF") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
        warn!("FDFS_CLIENT_CONF points to missing file {:?}", path);
    }

    let path = std::env::current_dir().ok()?.join("client.conf");
    if path.exists() {
        return Some(path);
    }
    None
}

/// Parse a byte size such as `256KB` or `1MB`.
fn parse_size(value: &str) -> Option<usize> {
    let upper = value.trim().to_ascii_uppercase();
    let (digits, unit) = if let Some(n) = upper.strip_suffix("KB").or_else(|| upper.strip_suffix('K')) {
        (n, 1024)
    } else if let Some(n) = upper.strip_suffix("MB").or_else(|| upper.strip_suffix('M')) {
        (n, 1024 * 1024)
    } else {
        (upper.as_str(), 1)
    };
    let n: usize = digits.trim().parse().ok()?;
    n.checked_mul(unit).filter(|&size| size > 0)
}
