//! Snapshots module split into submodules:
//! - io.rs: формат файла снапшота, двухфазная атомарная запись (tmp + rename), чтение.
//! - manager.rs: SnapshotManager (create_snapshot под барьером, load_from_snapshot + replay WAL).

pub mod io;
mod manager;

pub use io::{commit_snapshot, read_snapshot, write_snapshot_atomic, write_snapshot_tmp, Snapshot};
pub use manager::{LoadReport, SnapshotInfo, SnapshotManager};
