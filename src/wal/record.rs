//! wal/record - формат одной записи WAL (JSON, одна строка).
//!
//! `{"timestamp":i64,"operation":"append"|"remove","list_id":i64,"value":i64}`
//!
//! Для remove `value` - удалённый элемент (не операнд).

use serde::{Deserialize, Serialize};

use crate::consts::WAL_RECORD_TERMINATOR;
use crate::error::ListResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    Append,
    Remove,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Append => crate::consts::OP_APPEND,
            Op::Remove => crate::consts::OP_REMOVE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: i64,
    pub operation: Op,
    pub list_id: i64,
    pub value: i64,
}

impl LogEntry {
    pub fn new(timestamp: i64, operation: Op, list_id: i64, value: i64) -> Self {
        Self {
            timestamp,
            operation,
            list_id,
            value,
        }
    }

    /// Запись + терминатор, готовые к одному write_all.
    pub fn encode_line(&self) -> ListResult<Vec<u8>> {
        let mut buf = serde_json::to_vec(self)?;
        buf.push(WAL_RECORD_TERMINATOR);
        Ok(buf)
    }

    /// Разобрать одну строку (без терминатора).
    pub fn decode_line(line: &[u8]) -> ListResult<Self> {
        Ok(serde_json::from_slice(line)?)
    }
}
