// Базовые модули
pub mod config;
pub mod consts;
pub mod error;
pub mod metrics;
pub mod util;

// Ядро: локи, store, WAL, снапшоты, фасад
pub mod lock;
pub mod snapshots; // src/snapshots/{mod,io,manager}.rs
pub mod store;
pub mod wal; // src/wal/{mod,record,writer,reader}.rs
pub mod service;

// Сеть и внешние поверхности
pub mod exporter;
pub mod rpc; // src/rpc/{mod,server,client}.rs

pub mod cli;

// Удобные реэкспорты
pub use config::{ListConfig, ListConfigBuilder};
pub use error::{ErrorKind, ListError, ListResult};
pub use lock::{acquire_exclusive_lock, try_acquire_exclusive_lock, KeyLocks};
pub use service::RemoteList;
pub use snapshots::{LoadReport, Snapshot, SnapshotInfo, SnapshotManager};
pub use store::{ListStore, ListsMap};
pub use wal::{LogEntry, Op, Wal, WalReader};
