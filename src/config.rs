//! Centralized configuration and builder for remotelist.
//!
//! Goals:
//! - Single place to collect tunables instead of scattering env lookups.
//! - ListConfig::from_env() reads RL_* env vars; CLI flags override on top.
//! - ListConfigBuilder returns a ListConfig, which RemoteList::open consumes.
//!
//! Env:
//! - RL_BASE_PATH               - base path for `<base>.log` / `<base>.snapshot`
//! - RL_LISTEN_ADDR             - RPC listen address (default 127.0.0.1:5000)
//! - RL_SNAPSHOT_INTERVAL_SECS  - period of background snapshots (0 disables)
//! - RL_WAL_FSYNC               - fsync each WAL record ("1|true|on|yes")
//! - RL_METRICS_ADDR            - optional Prometheus exporter address

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::consts::{
    DEFAULT_BASE_PATH, DEFAULT_LISTEN_ADDR, DEFAULT_SNAPSHOT_INTERVAL_SECS, LOCK_EXT, LOG_EXT,
    SNAPSHOT_EXT, SNAPSHOT_TMP_SUFFIX,
};
use crate::util::sibling_path;

#[derive(Clone, Debug)]
pub struct ListConfig {
    /// Base path; files are `<base>.log`, `<base>.snapshot`, `<base>.lock`.
    /// Env: RL_BASE_PATH (default "lista_dados")
    pub base_path: PathBuf,

    /// Env: RL_LISTEN_ADDR (default 127.0.0.1:5000)
    pub listen_addr: String,

    /// Period of the background snapshot task, seconds. 0 - only on shutdown.
    /// Env: RL_SNAPSHOT_INTERVAL_SECS (default 30)
    pub snapshot_interval_secs: u64,

    /// fsync WAL after each record (default false: open/append/close only).
    /// Env: RL_WAL_FSYNC
    pub wal_fsync: bool,

    /// Optional address for the /metrics exporter (tiny_http).
    /// Env: RL_METRICS_ADDR
    pub metrics_addr: Option<String>,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from(DEFAULT_BASE_PATH),
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            snapshot_interval_secs: DEFAULT_SNAPSHOT_INTERVAL_SECS,
            wal_fsync: false,
            metrics_addr: None,
        }
    }
}

fn env_flag(s: &str) -> bool {
    let s = s.trim().to_ascii_lowercase();
    s == "1" || s == "true" || s == "on" || s == "yes"
}

impl ListConfig {
    /// Load configuration from environment variables on top of defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("RL_BASE_PATH") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.base_path = PathBuf::from(s);
            }
        }

        if let Ok(v) = std::env::var("RL_LISTEN_ADDR") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.listen_addr = s.to_string();
            }
        }

        if let Ok(v) = std::env::var("RL_SNAPSHOT_INTERVAL_SECS") {
            if let Ok(n) = v.trim().parse::<u64>() {
                cfg.snapshot_interval_secs = n;
            }
        }

        if let Ok(v) = std::env::var("RL_WAL_FSYNC") {
            cfg.wal_fsync = env_flag(&v);
        }

        if let Ok(v) = std::env::var("RL_METRICS_ADDR") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.metrics_addr = Some(s.to_string());
            }
        }

        cfg
    }

    /// Config with defaults and an explicit base path (tests, embedding).
    pub fn for_base<P: AsRef<Path>>(base: P) -> Self {
        Self::default().with_base_path(base)
    }

    pub fn with_base_path<P: AsRef<Path>>(mut self, base: P) -> Self {
        self.base_path = base.as_ref().to_path_buf();
        self
    }

    pub fn with_listen_addr<S: Into<String>>(mut self, addr: S) -> Self {
        self.listen_addr = addr.into();
        self
    }

    pub fn with_snapshot_interval_secs(mut self, secs: u64) -> Self {
        self.snapshot_interval_secs = secs;
        self
    }

    pub fn with_wal_fsync(mut self, on: bool) -> Self {
        self.wal_fsync = on;
        self
    }

    pub fn with_metrics_addr<S: Into<String>>(mut self, addr: Option<S>) -> Self {
        self.metrics_addr = addr.map(Into::into);
        self
    }

    // ----- derived paths -----

    pub fn log_path(&self) -> PathBuf {
        sibling_path(&self.base_path, LOG_EXT)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        sibling_path(&self.base_path, SNAPSHOT_EXT)
    }

    pub fn lock_path(&self) -> PathBuf {
        sibling_path(&self.base_path, LOCK_EXT)
    }

    /// `.<name>.snapshot.tmp` рядом с каноническим файлом (тот же каталог => rename атомарен).
    pub fn snapshot_tmp_path(&self) -> PathBuf {
        snapshot_tmp_for(&self.snapshot_path())
    }

    /// None - периодические снапшоты выключены.
    pub fn snapshot_interval(&self) -> Option<Duration> {
        if self.snapshot_interval_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.snapshot_interval_secs))
        }
    }
}

/// Temp path for a given snapshot file: same directory, hidden name.
pub fn snapshot_tmp_for(snapshot: &Path) -> PathBuf {
    let name = snapshot
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_name = format!(".{}.{}", name, SNAPSHOT_TMP_SUFFIX);
    match snapshot.parent() {
        Some(dir) => dir.join(tmp_name),
        None => PathBuf::from(tmp_name),
    }
}

impl fmt::Display for ListConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ListConfig {{ \
             base_path: {}, \
             listen_addr: {}, \
             snapshot_interval_secs: {}, \
             wal_fsync: {}, \
             metrics_addr: {} \
             }}",
            self.base_path.display(),
            self.listen_addr,
            self.snapshot_interval_secs,
            self.wal_fsync,
            self.metrics_addr.as_deref().unwrap_or("disabled"),
        )
    }
}

/// Lightweight builder that produces a ListConfig.
#[derive(Clone, Debug)]
pub struct ListConfigBuilder {
    cfg: ListConfig,
}

impl Default for ListConfigBuilder {
    fn default() -> Self {
        // Start from env, then allow overrides.
        Self {
            cfg: ListConfig::from_env(),
        }
    }
}

impl ListConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a clean default (without reading env).
    pub fn from_default() -> Self {
        Self {
            cfg: ListConfig::default(),
        }
    }

    pub fn base_path<P: AsRef<Path>>(mut self, base: P) -> Self {
        self.cfg.base_path = base.as_ref().to_path_buf();
        self
    }

    pub fn listen_addr<S: Into<String>>(mut self, addr: S) -> Self {
        self.cfg.listen_addr = addr.into();
        self
    }

    pub fn snapshot_interval_secs(mut self, secs: u64) -> Self {
        self.cfg.snapshot_interval_secs = secs;
        self
    }

    pub fn wal_fsync(mut self, on: bool) -> Self {
        self.cfg.wal_fsync = on;
        self
    }

    pub fn metrics_addr<S: Into<String>>(mut self, addr: Option<S>) -> Self {
        self.cfg.metrics_addr = addr.map(Into::into);
        self
    }

    pub fn build(self) -> ListConfig {
        self.cfg
    }
}
