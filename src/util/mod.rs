//! util - общие утилиты.
//!
//! Содержит:
//! - now_nanos(): текущее Unix-время в наносекундах (i64, saturating).
//! - next_stamp()/observe_stamp(): монотонный источник меток для WAL и снапшотов.
//! - sibling_path(): построение `<base>.<ext>` без замены существующего расширения.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

static LAST_STAMP: AtomicI64 = AtomicI64::new(0);

/// Текущее Unix-время в наносекундах, обрезанное к i64 (saturating).
#[inline]
pub fn now_nanos() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    now.as_nanos().min(i64::MAX as u128) as i64
}

/// Выдать следующую метку времени.
///
/// Метка = max(now_nanos(), последняя выданная + 1), поэтому строго растёт в
/// пределах процесса даже при переводе системных часов назад.
pub fn next_stamp() -> i64 {
    let now = now_nanos();
    let mut cur = LAST_STAMP.load(Ordering::Relaxed);
    loop {
        let next = if now > cur { now } else { cur.saturating_add(1) };
        match LAST_STAMP.compare_exchange_weak(cur, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => cur = actual,
        }
    }
}

/// Сообщить источнику меток о метке, уже лежащей на диске (снапшот/WAL).
/// Последующие next_stamp() будут строго больше.
pub fn observe_stamp(ts: i64) {
    LAST_STAMP.fetch_max(ts, Ordering::AcqRel);
}

/// `<base>.<ext>`: суффикс дописывается к имени целиком
/// (`data.v1` -> `data.v1.log`, а не `data.log`).
pub fn sibling_path(base: &Path, ext: &str) -> PathBuf {
    let mut s = base.as_os_str().to_os_string();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}
