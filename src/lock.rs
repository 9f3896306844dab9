//! Locking: per-key mutex registry + file lock for single-server safety.
//!
//! KeyLocks:
//! - лениво создаёт Mutex на ключ под коротким локом реестра;
//! - acquire(key) сериализует все операции над одним ключом, разные ключи не
//!   блокируют друг друга;
//! - записи реестра не удаляются (ограниченное пространство ключей).
//!
//! File lock (fs2, advisory):
//! - `<base>.lock`; сервер держит Exclusive всё время жизни;
//! - Lock is released on Drop.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use fs2::FileExt;
use parking_lot::{ArcMutexGuard, Mutex, RawMutex};

use crate::consts::LOCK_EXT;
use crate::util::sibling_path;

/// Guard of a single key; the key stays locked while it lives.
pub type KeyGuard = ArcMutexGuard<RawMutex, ()>;

#[derive(Default)]
pub struct KeyLocks {
    registry: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Взять (создав при первом обращении) лок ключа. Блокирует до захвата.
    pub fn acquire(&self, key: i64) -> KeyGuard {
        let lock = {
            let mut reg = self.registry.lock();
            Arc::clone(reg.entry(key).or_default())
        };
        // Реестр уже отпущен: ожидание ключа не держит других.
        lock.lock_arc()
    }

    /// Неблокирующая попытка (диагностика/тесты).
    pub fn try_acquire(&self, key: i64) -> Option<KeyGuard> {
        let lock = {
            let mut reg = self.registry.lock();
            Arc::clone(reg.entry(key).or_default())
        };
        lock.try_lock_arc()
    }

    /// Число ключей, для которых когда-либо создавался лок.
    pub fn len(&self) -> usize {
        self.registry.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// -------------------- file lock --------------------

/// Эксклюзивный advisory lock на `<base>.lock`; снимается в Drop.
pub struct LockGuard {
    file: std::fs::File,
    path: PathBuf,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn open_lock_file(base: &Path) -> Result<(std::fs::File, PathBuf)> {
    let path = sibling_path(base, LOCK_EXT);
    let f = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(&path)
        .with_context(|| format!("open lock file {}", path.display()))?;
    Ok((f, path))
}

/// Ждать эксклюзивный lock (сервер держит его всё время жизни).
pub fn acquire_exclusive_lock(base: &Path) -> Result<LockGuard> {
    let (file, path) = open_lock_file(base)?;
    file.lock_exclusive()
        .with_context(|| format!("lock_exclusive {}", path.display()))?;
    Ok(LockGuard { file, path })
}

/// Не ждать: Err, если base уже занят другим владельцем.
pub fn try_acquire_exclusive_lock(base: &Path) -> Result<LockGuard> {
    let (file, path) = open_lock_file(base)?;
    file.try_lock_exclusive()
        .with_context(|| format!("{} is locked by another server", path.display()))?;
    Ok(LockGuard { file, path })
}
