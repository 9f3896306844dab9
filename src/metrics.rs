//! Lightweight global metrics for remotelist.
//!
//! Потокобезопасные атомарные счётчики для подсистем:
//! - WAL (записи, байты, ошибки записи)
//! - Replay (проиграно / пропущено битых записей)
//! - Snapshots (успешные / неудачные, байты последнего)
//! - RPC (вызовы по глаголам, ошибки)

use std::sync::atomic::{AtomicU64, Ordering};

// ----- WAL -----
static WAL_APPENDS_TOTAL: AtomicU64 = AtomicU64::new(0);
static WAL_BYTES_WRITTEN: AtomicU64 = AtomicU64::new(0);
static WAL_WRITE_ERRORS: AtomicU64 = AtomicU64::new(0);

// ----- Replay -----
static REPLAY_APPLIED: AtomicU64 = AtomicU64::new(0);
static REPLAY_SKIPPED_CORRUPT: AtomicU64 = AtomicU64::new(0);

// ----- Snapshots -----
static SNAPSHOTS_CREATED: AtomicU64 = AtomicU64::new(0);
static SNAPSHOTS_FAILED: AtomicU64 = AtomicU64::new(0);
static SNAPSHOT_LAST_BYTES: AtomicU64 = AtomicU64::new(0);

// ----- RPC -----
static RPC_APPEND: AtomicU64 = AtomicU64::new(0);
static RPC_GET: AtomicU64 = AtomicU64::new(0);
static RPC_REMOVE: AtomicU64 = AtomicU64::new(0);
static RPC_SIZE: AtomicU64 = AtomicU64::new(0);
static RPC_GET_ALL: AtomicU64 = AtomicU64::new(0);
static RPC_ERRORS: AtomicU64 = AtomicU64::new(0);
static RPC_CONNECTIONS: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    // WAL
    pub wal_appends_total: u64,
    pub wal_bytes_written: u64,
    pub wal_write_errors: u64,

    // Replay
    pub replay_applied: u64,
    pub replay_skipped_corrupt: u64,

    // Snapshots
    pub snapshots_created: u64,
    pub snapshots_failed: u64,
    pub snapshot_last_bytes: u64,

    // RPC
    pub rpc_append: u64,
    pub rpc_get: u64,
    pub rpc_remove: u64,
    pub rpc_size: u64,
    pub rpc_get_all: u64,
    pub rpc_errors: u64,
    pub rpc_connections: u64,
}

impl MetricsSnapshot {
    pub fn rpc_calls_total(&self) -> u64 {
        self.rpc_append + self.rpc_get + self.rpc_remove + self.rpc_size + self.rpc_get_all
    }

    pub fn avg_wal_record_bytes(&self) -> f64 {
        if self.wal_appends_total == 0 {
            0.0
        } else {
            self.wal_bytes_written as f64 / self.wal_appends_total as f64
        }
    }
}

// ----- Recorders (WAL) -----
pub fn record_wal_append(bytes: usize) {
    WAL_APPENDS_TOTAL.fetch_add(1, Ordering::Relaxed);
    WAL_BYTES_WRITTEN.fetch_add(bytes as u64, Ordering::Relaxed);
}

pub fn record_wal_write_error() {
    WAL_WRITE_ERRORS.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (Replay) -----
pub fn record_replay(applied: usize, skipped_corrupt: usize) {
    REPLAY_APPLIED.fetch_add(applied as u64, Ordering::Relaxed);
    REPLAY_SKIPPED_CORRUPT.fetch_add(skipped_corrupt as u64, Ordering::Relaxed);
}

// ----- Recorders (Snapshots) -----
pub fn record_snapshot_created(bytes: u64) {
    SNAPSHOTS_CREATED.fetch_add(1, Ordering::Relaxed);
    SNAPSHOT_LAST_BYTES.store(bytes, Ordering::Relaxed);
}

pub fn record_snapshot_failed() {
    SNAPSHOTS_FAILED.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (RPC) -----
#[derive(Debug, Clone, Copy)]
pub enum RpcVerb {
    Append,
    Get,
    Remove,
    Size,
    GetAll,
}

pub fn record_rpc_call(verb: RpcVerb) {
    let c = match verb {
        RpcVerb::Append => &RPC_APPEND,
        RpcVerb::Get => &RPC_GET,
        RpcVerb::Remove => &RPC_REMOVE,
        RpcVerb::Size => &RPC_SIZE,
        RpcVerb::GetAll => &RPC_GET_ALL,
    };
    c.fetch_add(1, Ordering::Relaxed);
}

pub fn record_rpc_error() {
    RPC_ERRORS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_rpc_connection() {
    RPC_CONNECTIONS.fetch_add(1, Ordering::Relaxed);
}

// ----- Snapshot / Reset -----
pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        wal_appends_total: WAL_APPENDS_TOTAL.load(Ordering::Relaxed),
        wal_bytes_written: WAL_BYTES_WRITTEN.load(Ordering::Relaxed),
        wal_write_errors: WAL_WRITE_ERRORS.load(Ordering::Relaxed),

        replay_applied: REPLAY_APPLIED.load(Ordering::Relaxed),
        replay_skipped_corrupt: REPLAY_SKIPPED_CORRUPT.load(Ordering::Relaxed),

        snapshots_created: SNAPSHOTS_CREATED.load(Ordering::Relaxed),
        snapshots_failed: SNAPSHOTS_FAILED.load(Ordering::Relaxed),
        snapshot_last_bytes: SNAPSHOT_LAST_BYTES.load(Ordering::Relaxed),

        rpc_append: RPC_APPEND.load(Ordering::Relaxed),
        rpc_get: RPC_GET.load(Ordering::Relaxed),
        rpc_remove: RPC_REMOVE.load(Ordering::Relaxed),
        rpc_size: RPC_SIZE.load(Ordering::Relaxed),
        rpc_get_all: RPC_GET_ALL.load(Ordering::Relaxed),
        rpc_errors: RPC_ERRORS.load(Ordering::Relaxed),
        rpc_connections: RPC_CONNECTIONS.load(Ordering::Relaxed),
    }
}

pub fn reset() {
    for c in [
        &WAL_APPENDS_TOTAL,
        &WAL_BYTES_WRITTEN,
        &WAL_WRITE_ERRORS,
        &REPLAY_APPLIED,
        &REPLAY_SKIPPED_CORRUPT,
        &SNAPSHOTS_CREATED,
        &SNAPSHOTS_FAILED,
        &SNAPSHOT_LAST_BYTES,
        &RPC_APPEND,
        &RPC_GET,
        &RPC_REMOVE,
        &RPC_SIZE,
        &RPC_GET_ALL,
        &RPC_ERRORS,
        &RPC_CONNECTIONS,
    ] {
        c.store(0, Ordering::Relaxed);
    }
}

/// Prometheus text exposition (version 0.0.4).
pub fn render_prometheus() -> String {
    let m = snapshot();
    let mut out = String::new();

    let ver = env!("CARGO_PKG_VERSION");
    out.push_str("# HELP remotelist_build_info Build info.\n");
    out.push_str("# TYPE remotelist_build_info gauge\n");
    out.push_str(&format!("remotelist_build_info{{version=\"{}\"}} 1\n", ver));

    let counters: [(&str, &str, u64); 10] = [
        ("remotelist_wal_appends_total", "Total WAL records written.", m.wal_appends_total),
        ("remotelist_wal_bytes_written", "Total WAL bytes written.", m.wal_bytes_written),
        ("remotelist_wal_write_errors", "Failed WAL writes.", m.wal_write_errors),
        ("remotelist_replay_applied", "WAL records applied at startup.", m.replay_applied),
        (
            "remotelist_replay_skipped_corrupt",
            "Unparseable WAL records skipped at startup.",
            m.replay_skipped_corrupt,
        ),
        ("remotelist_snapshots_created", "Snapshots written.", m.snapshots_created),
        ("remotelist_snapshots_failed", "Snapshot attempts that failed.", m.snapshots_failed),
        ("remotelist_rpc_calls_total", "RPC calls handled.", m.rpc_calls_total()),
        ("remotelist_rpc_errors", "RPC calls that returned an error.", m.rpc_errors),
        ("remotelist_rpc_connections", "Accepted RPC connections.", m.rpc_connections),
    ];
    for (name, help, v) in counters {
        out.push_str(&format!("# HELP {} {}\n", name, help));
        out.push_str(&format!("# TYPE {} counter\n", name));
        out.push_str(&format!("{} {}\n", name, v));
    }

    out.push_str("# HELP remotelist_snapshot_last_bytes Size of the last snapshot file.\n");
    out.push_str("# TYPE remotelist_snapshot_last_bytes gauge\n");
    out.push_str(&format!("remotelist_snapshot_last_bytes {}\n", m.snapshot_last_bytes));

    out
}
