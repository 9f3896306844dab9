//! Общие константы форматов (WAL, snapshot, lock) и дефолты сервера.

// -------- Файлы (суффиксы к base path) --------
pub const LOG_EXT: &str = "log";
pub const SNAPSHOT_EXT: &str = "snapshot";
pub const LOCK_EXT: &str = "lock";
// Временный файл снапшота: .<basename>.snapshot.tmp в том же каталоге.
pub const SNAPSHOT_TMP_SUFFIX: &str = "tmp";

// -------- WAL --------
pub const OP_APPEND: &str = "append";
pub const OP_REMOVE: &str = "remove";
pub const WAL_RECORD_TERMINATOR: u8 = b'\n';

// -------- Server defaults --------
pub const DEFAULT_BASE_PATH: &str = "lista_dados";
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_SNAPSHOT_INTERVAL_SECS: u64 = 30;

// Верхняя граница длины строки запроса RPC (защита от мусора в сокете).
pub const RPC_MAX_LINE: usize = 1024 * 1024;
