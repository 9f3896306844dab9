//! RemoteList - фасад над store / WAL / snapshots.
//!
//! Порядок локов на всех путях обработчиков фиксирован:
//!   barrier (shared) -> key lock -> [WAL mutex] -> store lock (коротко).
//! Снапшот берёт barrier exclusive и поэтому никогда не видит полуприменённую мутацию.
//!
//! Дисциплина WAL одна для обеих мутаций - log-before-apply:
//! - append: запись в WAL, затем push;
//! - remove: peek хвоста, запись в WAL удаляемого значения, затем pop.
//! Ошибка записи WAL возвращается вызывающему, память не тронута.

use std::sync::Arc;

use log::info;
use parking_lot::RwLock;

use crate::config::ListConfig;
use crate::error::ListResult;
use crate::lock::{KeyGuard, KeyLocks};
use crate::snapshots::{LoadReport, SnapshotInfo, SnapshotManager};
use crate::store::{ListStore, ListsMap};
use crate::wal::{Op, Wal};

pub struct RemoteList {
    cfg: ListConfig,
    store: Arc<ListStore>,
    barrier: Arc<RwLock<()>>,
    locks: KeyLocks,
    wal: Wal,
    snapshots: SnapshotManager,
}

impl RemoteList {
    /// Собрать компоненты без загрузки состояния (пустой store).
    pub fn new(cfg: ListConfig) -> Self {
        let store = Arc::new(ListStore::new());
        let barrier = Arc::new(RwLock::new(()));
        let wal = Wal::new(cfg.log_path(), cfg.wal_fsync);
        let snapshots = SnapshotManager::new(
            Arc::clone(&store),
            Arc::clone(&barrier),
            cfg.snapshot_path(),
            cfg.log_path(),
        );
        Self {
            cfg,
            store,
            barrier,
            locks: KeyLocks::new(),
            wal,
            snapshots,
        }
    }

    /// new() + load_from_snapshot(): то, что делает сервер при старте.
    pub fn open(cfg: ListConfig) -> ListResult<Self> {
        let rl = Self::new(cfg);
        let report = rl.load_from_snapshot()?;
        info!(
            "opened {}: {} list(s) in memory (snapshot ts={}, replayed={})",
            rl.cfg.base_path.display(),
            rl.store.key_count(),
            report.snapshot_ts,
            report.replayed
        );
        Ok(rl)
    }

    pub fn config(&self) -> &ListConfig {
        &self.cfg
    }

    /// Дописать value в хвост списка key.
    pub fn append(&self, key: i64, value: i64) -> ListResult<()> {
        let _barrier = self.barrier.read();
        let _key = self.locks.acquire(key);

        self.wal.append(Op::Append, key, value)?;
        self.store.append(key, value);
        Ok(())
    }

    /// Элемент по индексу. NotFound - ключ не встречался; IndexOutOfRange - индекс вне [0, len).
    pub fn get(&self, key: i64, index: i64) -> ListResult<i64> {
        let _barrier = self.barrier.read();
        let _key = self.locks.acquire(key);

        self.store.get(key, index)
    }

    /// Снять и вернуть хвост. EmptyOrMissing - ключа нет или список пуст.
    pub fn remove(&self, key: i64) -> ListResult<i64> {
        let _barrier = self.barrier.read();
        let _key = self.locks.acquire(key);

        // Под key lock хвост не может измениться между peek и pop.
        let tail = self.store.peek_tail(key)?;
        self.wal.append(Op::Remove, key, tail)?;
        let popped = self.store.remove(key)?;
        debug_assert_eq!(popped, tail);
        Ok(popped)
    }

    /// Размер списка; 0 для отсутствующего ключа.
    pub fn size(&self, key: i64) -> ListResult<usize> {
        let _barrier = self.barrier.read();
        let _key = self.locks.acquire(key);

        Ok(self.store.size(key))
    }

    /// Копия всех списков (debug).
    pub fn get_all(&self) -> ListsMap {
        let _barrier = self.barrier.read();
        self.store.get_all()
    }

    pub fn create_snapshot(&self) -> ListResult<SnapshotInfo> {
        self.snapshots.create_snapshot()
    }

    pub fn load_from_snapshot(&self) -> ListResult<LoadReport> {
        self.snapshots.load_from_snapshot()
    }

    /// Восстановить состояние в память, не изменяя файлы (inspect).
    pub fn reconstruct(&self) -> ListResult<LoadReport> {
        self.snapshots.reconstruct()
    }

    /// Удержать лок ключа снаружи: операции над этим ключом ждут, пока guard жив.
    /// Остальные ключи работают как обычно.
    pub fn key_guard(&self, key: i64) -> KeyGuard {
        self.locks.acquire(key)
    }

    /// Число ключей с зарегистрированным локом (диагностика роста реестра).
    pub fn key_lock_count(&self) -> usize {
        self.locks.len()
    }
}
