use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};

use super::io::{read_snapshot, write_snapshot_atomic, Snapshot};
use crate::error::{ListError, ListResult};
use crate::metrics::{record_replay, record_snapshot_created, record_snapshot_failed};
use crate::store::{ListStore, ListsMap};
use crate::util::{next_stamp, observe_stamp};
use crate::wal::{repair_tail, TailRepair, WalReader};

/// Итог create_snapshot().
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotInfo {
    pub timestamp: i64,
    pub lists: usize,
    pub bytes: u64,
}

/// Итог load_from_snapshot(): что взято из снапшота и что проиграно из WAL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Метка загруженного снапшота; 0 - снапшота нет (или он битый).
    pub snapshot_ts: i64,
    pub snapshot_lists: usize,
    /// Снапшот был, но не разобрался (fallback на пустую базу).
    pub snapshot_corrupt: bool,
    pub replayed: usize,
    /// Записи с timestamp <= snapshot_ts (уже в снапшоте).
    pub skipped_stale: usize,
    /// Неразборные записи WAL (включая оборванный хвост).
    pub skipped_corrupt: usize,
    /// Хвост WAL был обрезан или дописан терминатором.
    pub tail_repaired: bool,
}

/// Snapshot manager: атомарные снимки ListStore и восстановление на старте.
///
/// Барьер (`barrier`) общий с фасадом: обработчики берут его shared, снапшот -
/// exclusive, поэтому копия никогда не видит полуприменённую мутацию.
pub struct SnapshotManager {
    store: Arc<ListStore>,
    barrier: Arc<RwLock<()>>,
    // не даёт двум снапшотам (таймер + сигнал) пересечься
    create_mu: Mutex<()>,
    snapshot_path: PathBuf,
    log_path: PathBuf,
}

impl SnapshotManager {
    pub fn new(
        store: Arc<ListStore>,
        barrier: Arc<RwLock<()>>,
        snapshot_path: PathBuf,
        log_path: PathBuf,
    ) -> Self {
        Self {
            store,
            barrier,
            create_mu: Mutex::new(()),
            snapshot_path,
            log_path,
        }
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Снять снапшот: barrier(exclusive) -> create_mu -> короткое чтение store ->
    /// tmp + rename.
    pub fn create_snapshot(&self) -> ListResult<SnapshotInfo> {
        let _barrier = self.barrier.write();
        let _create = self.create_mu.lock();

        let started = Instant::now();
        let lists: ListsMap = self.store.get_all();
        let snap = Snapshot {
            timestamp: next_stamp(),
            lists,
        };

        match write_snapshot_atomic(&self.snapshot_path, &snap) {
            Ok(bytes) => {
                record_snapshot_created(bytes);
                debug!(
                    "snapshot: {} lists, {} B -> {} in {:?}",
                    snap.lists.len(),
                    bytes,
                    self.snapshot_path.display(),
                    started.elapsed()
                );
                Ok(SnapshotInfo {
                    timestamp: snap.timestamp,
                    lists: snap.lists.len(),
                    bytes,
                })
            }
            Err(e) => {
                record_snapshot_failed();
                Err(e)
            }
        }
    }

    /// Восстановление на старте: снапшот (если есть) + replay WAL с
    /// timestamp > snapshot_ts. Битые записи WAL и битый снапшот не прерывают
    /// загрузку; ошибка чтения файлов (кроме отсутствия) - прерывает.
    ///
    /// После replay конец WAL приводится в порядок (repair_tail), иначе
    /// следующая дозапись склеится с оборванной строкой и пропадёт.
    pub fn load_from_snapshot(&self) -> ListResult<LoadReport> {
        self.load(true)
    }

    /// То же восстановление в память, но файлы не трогаются (offline inspect).
    pub fn reconstruct(&self) -> ListResult<LoadReport> {
        self.load(false)
    }

    fn load(&self, repair: bool) -> ListResult<LoadReport> {
        let _barrier = self.barrier.write();
        let _create = self.create_mu.lock();

        let mut report = LoadReport::default();

        match read_snapshot(&self.snapshot_path) {
            Ok(Some(snap)) => {
                report.snapshot_ts = snap.timestamp;
                report.snapshot_lists = snap.lists.len();
                observe_stamp(snap.timestamp);
                self.store.replace_all(snap.lists);
                info!(
                    "load: snapshot ts={} with {} list(s) from {}",
                    report.snapshot_ts,
                    report.snapshot_lists,
                    self.snapshot_path.display()
                );
            }
            Ok(None) => {
                self.store.replace_all(ListsMap::new());
                info!(
                    "load: no snapshot at {}, starting from empty map",
                    self.snapshot_path.display()
                );
            }
            Err(ListError::Decode(msg)) => {
                self.store.replace_all(ListsMap::new());
                report.snapshot_corrupt = true;
                warn!("load: {} (falling back to empty baseline)", msg);
            }
            Err(e) => return Err(e),
        }

        let mut reader = WalReader::open(&self.log_path)?;
        for entry in reader.by_ref() {
            observe_stamp(entry.timestamp);
            if entry.timestamp <= report.snapshot_ts {
                report.skipped_stale += 1;
                continue;
            }
            self.store.apply(&entry);
            report.replayed += 1;
        }
        report.skipped_corrupt = reader.skipped();
        let tail = reader.tail_repair();
        drop(reader);
        if repair && tail != TailRepair::None {
            report.tail_repaired = repair_tail(&self.log_path, tail)?;
        }

        if report.skipped_corrupt > 0 {
            warn!(
                "load: skipped {} unparseable WAL record(s) in {}{}",
                report.skipped_corrupt,
                self.log_path.display(),
                if matches!(tail, TailRepair::Truncate(_)) {
                    " (partial tail at EOF)"
                } else {
                    ""
                }
            );
        }
        record_replay(report.replayed, report.skipped_corrupt);
        info!(
            "load: replayed {} WAL record(s), {} already in snapshot",
            report.replayed, report.skipped_stale
        );
        Ok(report)
    }
}
