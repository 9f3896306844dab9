use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use parking_lot::Mutex;

use super::record::{LogEntry, Op};
use crate::error::{ListError, ListResult};
use crate::metrics::{record_wal_append, record_wal_write_error};
use crate::util::next_stamp;

/// Писатель WAL. Один на процесс/base path.
///
/// Все записи (по всем ключам) идут под одним мьютексом: это задаёт единый
/// глобальный порядок записей в файле. Метка времени выдаётся под тем же
/// мьютексом, поэтому порядок строк в файле совпадает с порядком меток.
pub struct Wal {
    path: PathBuf,
    fsync: bool,
    mu: Mutex<()>,
}

impl Wal {
    pub fn new<P: AsRef<Path>>(path: P, fsync: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            fsync,
            mu: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Записать одну мутацию. Файл открывается, дописывается и закрывается
    /// внутри вызова: дескриптор между вызовами не держим.
    pub fn append(&self, op: Op, list_id: i64, value: i64) -> ListResult<LogEntry> {
        let _g = self.mu.lock();

        let entry = LogEntry::new(next_stamp(), op, list_id, value);
        let line = entry.encode_line()?;

        if let Err(e) = self.write_line(&line) {
            record_wal_write_error();
            warn!(
                "wal: write {} list={} failed at {}: {}",
                op.as_str(),
                list_id,
                self.path.display(),
                e
            );
            return Err(e);
        }

        record_wal_append(line.len());
        debug!(
            "wal: {} list={} value={} ts={}",
            op.as_str(),
            list_id,
            value,
            entry.timestamp
        );
        Ok(entry)
    }

    fn write_line(&self, line: &[u8]) -> ListResult<()> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ListError::io(&self.path, e))?;
        f.write_all(line).map_err(|e| ListError::io(&self.path, e))?;
        if self.fsync {
            f.sync_data().map_err(|e| ListError::io(&self.path, e))?;
        }
        Ok(())
    }
}
