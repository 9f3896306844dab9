//! wal/reader - последовательное чтение записей WAL (best-effort).
//!
//! Правила:
//! - пустые строки пропускаются;
//! - строка, которая не разбирается, пропускается и учитывается в skipped();
//! - хвост без терминатора на EOF (обрыв записи) допустим: если он разбирается,
//!   это полноценная запись, иначе он считается partial tail и пропускается;
//! - отсутствие файла == пустой поток.
//!
//! После полного прохода `tail_repair()` говорит, что сделать с концом файла,
//! чтобы следующая дозапись не склеилась с оборванной строкой (см. repair_tail).

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use log::{debug, warn};

use super::record::LogEntry;
use crate::consts::WAL_RECORD_TERMINATOR;
use crate::error::{ListError, ListResult};

/// Что нужно сделать с хвостом WAL перед новыми записями.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailRepair {
    /// Файл пуст или заканчивается терминатором.
    None,
    /// Последняя запись целая, но без '\n': дописать терминатор.
    Terminate,
    /// Оборванный неразборный хвост: обрезать файл до этой длины.
    Truncate(u64),
}

pub struct WalReader {
    data: Vec<u8>,
    pos: usize,
    skipped: usize,
    // начало неразборного хвоста без терминатора
    partial_tail_at: Option<usize>,
}

impl WalReader {
    /// Прочитать файл целиком. NotFound -> пустой reader.
    pub fn open(path: &Path) -> ListResult<Self> {
        match std::fs::read(path) {
            Ok(data) => Ok(Self::from_bytes(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("wal reader: {} not found, empty stream", path.display());
                Ok(Self::from_bytes(Vec::new()))
            }
            Err(e) => Err(ListError::io(path, e)),
        }
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            data,
            pos: 0,
            skipped: 0,
            partial_tail_at: None,
        }
    }

    /// Сколько записей было пропущено как неразборные (включая partial tail).
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Был ли на EOF неразборный хвост без терминатора.
    pub fn had_partial_tail(&self) -> bool {
        self.partial_tail_at.is_some()
    }

    /// Ремонт хвоста; осмысленно только после того, как итератор исчерпан.
    pub fn tail_repair(&self) -> TailRepair {
        if let Some(at) = self.partial_tail_at {
            return TailRepair::Truncate(at as u64);
        }
        match self.data.last() {
            Some(&b) if b != WAL_RECORD_TERMINATOR => TailRepair::Terminate,
            _ => TailRepair::None,
        }
    }

    /// (start, end, terminated) следующей непустой строки.
    fn next_line(&mut self) -> Option<(usize, usize, bool)> {
        while self.pos < self.data.len() && self.data[self.pos] == WAL_RECORD_TERMINATOR {
            self.pos += 1;
        }
        if self.pos >= self.data.len() {
            return None;
        }
        let start = self.pos;
        let (end, terminated) = match self.data[start..]
            .iter()
            .position(|&b| b == WAL_RECORD_TERMINATOR)
        {
            Some(off) => (start + off, true),
            None => (self.data.len(), false),
        };
        self.pos = if terminated { end + 1 } else { end };
        Some((start, end, terminated))
    }
}

impl Iterator for WalReader {
    type Item = LogEntry;

    fn next(&mut self) -> Option<LogEntry> {
        loop {
            let (start, end, terminated) = self.next_line()?;
            match LogEntry::decode_line(&self.data[start..end]) {
                Ok(entry) => return Some(entry),
                Err(e) => {
                    self.skipped += 1;
                    if terminated {
                        debug!("wal reader: skip corrupt record ({} B): {}", end - start, e);
                    } else {
                        self.partial_tail_at = Some(start);
                        debug!("wal reader: partial tail at EOF ({} B), stop", end - start);
                    }
                }
            }
        }
    }
}

/// Привести конец WAL в порядок перед дозаписью: обрезать оборванный хвост или
/// дописать недостающий терминатор. Вызывается только владельцем файла
/// (сервер под эксклюзивным file lock). Возвращает true, если файл изменён.
pub fn repair_tail(path: &Path, repair: TailRepair) -> ListResult<bool> {
    match repair {
        TailRepair::None => Ok(false),
        TailRepair::Truncate(len) => {
            let f = OpenOptions::new()
                .write(true)
                .open(path)
                .map_err(|e| ListError::io(path, e))?;
            f.set_len(len).map_err(|e| ListError::io(path, e))?;
            f.sync_data().map_err(|e| ListError::io(path, e))?;
            warn!("wal: truncated partial tail of {} to {} B", path.display(), len);
            Ok(true)
        }
        TailRepair::Terminate => {
            let mut f = OpenOptions::new()
                .append(true)
                .open(path)
                .map_err(|e| ListError::io(path, e))?;
            f.write_all(&[WAL_RECORD_TERMINATOR])
                .map_err(|e| ListError::io(path, e))?;
            f.sync_data().map_err(|e| ListError::io(path, e))?;
            debug!("wal: terminated last record of {}", path.display());
            Ok(true)
        }
    }
}
