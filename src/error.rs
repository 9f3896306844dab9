//! Типизированные ошибки ядра (store / WAL / snapshots / façade).
//!
//! Бинарник и CLI работают через anyhow; ядро возвращает ListError, чтобы
//! RPC-слой мог передать клиенту вид ошибки (kind), а не только текст.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub type ListResult<T> = std::result::Result<T, ListError>;

#[derive(Debug, thiserror::Error)]
pub enum ListError {
    /// Get по ключу, который ни разу не встречался.
    #[error("list {0} does not exist")]
    NotFound(i64),

    #[error("index {index} out of range for list {key} (len {len})")]
    IndexOutOfRange { key: i64, index: i64, len: usize },

    /// Remove по отсутствующему или пустому списку.
    #[error("list {0} is empty or does not exist")]
    EmptyOrMissing(i64),

    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("decode error: {0}")]
    Decode(String),
}

impl ListError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        ListError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ListError::NotFound(_) => ErrorKind::NotFound,
            ListError::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            ListError::EmptyOrMissing(_) => ErrorKind::EmptyOrMissing,
            ListError::Io { .. } => ErrorKind::Io,
            ListError::Decode(_) => ErrorKind::Decode,
        }
    }
}

impl From<serde_json::Error> for ListError {
    fn from(e: serde_json::Error) -> Self {
        ListError::Decode(e.to_string())
    }
}

/// Вид ошибки, как он передаётся по проводу (RPC `error.kind`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    IndexOutOfRange,
    EmptyOrMissing,
    Io,
    Decode,
    /// Только RPC: запрос не разобран / неизвестный метод.
    BadRequest,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::IndexOutOfRange => "IndexOutOfRange",
            ErrorKind::EmptyOrMissing => "EmptyOrMissing",
            ErrorKind::Io => "Io",
            ErrorKind::Decode => "Decode",
            ErrorKind::BadRequest => "BadRequest",
        };
        f.write_str(s)
    }
}
