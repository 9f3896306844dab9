//! snapshots/io - файл снапшота `<base>.snapshot` (pretty JSON).
//!
//! `{"timestamp": i64, "lists": {"<key>": [i64, ...], ...}}`
//!
//! Запись в две фазы: write_snapshot_tmp() (tmp + fsync) и commit_snapshot()
//! (rename поверх канонического файла + fsync каталога). Обрыв между фазами
//! оставляет прежний снапшот нетронутым.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::snapshot_tmp_for;
use crate::error::{ListError, ListResult};
use crate::store::ListsMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: i64,
    pub lists: ListsMap,
}

#[cfg(unix)]
fn fsync_parent_dir(path: &Path) -> std::io::Result<()> {
    use std::fs::File;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            let dir = File::open(parent)?;
            dir.sync_all()?;
        }
    }
    Ok(())
}
#[cfg(not(unix))]
fn fsync_parent_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Прочитать снапшот. Ok(None) - файла нет; Decode - файл есть, но битый.
pub fn read_snapshot(path: &Path) -> ListResult<Option<Snapshot>> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ListError::io(path, e)),
    };
    let snap: Snapshot = serde_json::from_slice(&bytes)
        .map_err(|e| ListError::Decode(format!("snapshot {}: {}", path.display(), e)))?;
    Ok(Some(snap))
}

/// Фаза 1: сериализовать в `.<name>.tmp` рядом с `path`. Возвращает путь tmp.
pub fn write_snapshot_tmp(path: &Path, snap: &Snapshot) -> ListResult<PathBuf> {
    let tmp = snapshot_tmp_for(path);
    let data = serde_json::to_vec_pretty(snap)?;

    let mut f = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&tmp)
        .map_err(|e| ListError::io(&tmp, e))?;
    f.write_all(&data).map_err(|e| ListError::io(&tmp, e))?;
    f.sync_all().map_err(|e| ListError::io(&tmp, e))?;
    Ok(tmp)
}

/// Фаза 2: атомарная замена канонического файла.
pub fn commit_snapshot(tmp: &Path, path: &Path) -> ListResult<()> {
    std::fs::rename(tmp, path).map_err(|e| ListError::io(path, e))?;
    let _ = fsync_parent_dir(path);
    Ok(())
}

/// write_snapshot_tmp + commit_snapshot. Возвращает размер записанного файла.
pub fn write_snapshot_atomic(path: &Path, snap: &Snapshot) -> ListResult<u64> {
    let tmp = write_snapshot_tmp(path, snap)?;
    let bytes = std::fs::metadata(&tmp).map(|m| m.len()).unwrap_or(0);
    if let Err(e) = commit_snapshot(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(bytes)
}
