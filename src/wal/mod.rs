//! WAL - append-only журнал мутаций (`<base>.log`, JSON Lines).
//!
//! Разделение:
//! - record.rs - формат записи (LogEntry, Op), кодирование строки.
//! - writer.rs - запись (Wal): глобальный мьютекс, open/append/close на каждую запись.
//! - reader.rs - чтение (WalReader): пропуск битых строк, допускается обрыв хвоста;
//!   repair_tail() чинит конец файла перед новыми записями.

pub mod reader;
pub mod record;
pub mod writer;

pub use reader::{repair_tail, TailRepair, WalReader};
pub use record::{LogEntry, Op};
pub use writer::Wal;
