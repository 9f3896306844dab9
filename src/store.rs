//! In-memory list store: key -> Vec<i64> behind one RwLock.
//!
//! Shared access - get/size/get_all/peek_tail; exclusive - append/remove и
//! только на время изменения в памяти (журналирование снаружи).
//! Сериализацию операций над одним ключом обеспечивает KeyLocks, не этот лок:
//! store lock защищает форму отображения (какие ключи есть).

use std::collections::{BTreeMap, HashMap};

use log::debug;
use parking_lot::RwLock;

use crate::error::{ListError, ListResult};
use crate::wal::{LogEntry, Op};

/// Полная копия содержимого (упорядочена по ключу для стабильного вывода).
pub type ListsMap = BTreeMap<i64, Vec<i64>>;

#[derive(Default)]
pub struct ListStore {
    lists: RwLock<HashMap<i64, Vec<i64>>>,
}

impl ListStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, key: i64, value: i64) {
        self.lists.write().entry(key).or_default().push(value);
    }

    pub fn get(&self, key: i64, index: i64) -> ListResult<i64> {
        let lists = self.lists.read();
        let ls = lists.get(&key).ok_or(ListError::NotFound(key))?;
        if index < 0 || index as u64 >= ls.len() as u64 {
            return Err(ListError::IndexOutOfRange {
                key,
                index,
                len: ls.len(),
            });
        }
        Ok(ls[index as usize])
    }

    /// Снять хвост. Отсутствующий ключ не создаётся.
    pub fn remove(&self, key: i64) -> ListResult<i64> {
        let mut lists = self.lists.write();
        lists
            .get_mut(&key)
            .and_then(|ls| ls.pop())
            .ok_or(ListError::EmptyOrMissing(key))
    }

    /// Хвост без удаления (remove журналируется до применения).
    pub fn peek_tail(&self, key: i64) -> ListResult<i64> {
        self.lists
            .read()
            .get(&key)
            .and_then(|ls| ls.last().copied())
            .ok_or(ListError::EmptyOrMissing(key))
    }

    /// 0 для отсутствующего ключа.
    pub fn size(&self, key: i64) -> usize {
        self.lists.read().get(&key).map_or(0, Vec::len)
    }

    pub fn get_all(&self) -> ListsMap {
        self.lists
            .read()
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect()
    }

    pub fn key_count(&self) -> usize {
        self.lists.read().len()
    }

    /// Загрузка из снапшота: заменить содержимое целиком.
    pub fn replace_all(&self, lists: ListsMap) {
        let mut cur = self.lists.write();
        *cur = lists.into_iter().collect();
    }

    /// Replay одной записи WAL.
    ///
    /// append - push; remove - pop хвоста, если он есть (значение из записи
    /// только сверяется: расхождение пишем в debug и продолжаем).
    pub fn apply(&self, entry: &LogEntry) {
        let mut lists = self.lists.write();
        match entry.operation {
            Op::Append => lists.entry(entry.list_id).or_default().push(entry.value),
            Op::Remove => match lists.get_mut(&entry.list_id).and_then(|ls| ls.pop()) {
                Some(v) if v != entry.value => debug!(
                    "replay: remove list={} popped {} but log says {}",
                    entry.list_id, v, entry.value
                ),
                Some(_) => {}
                None => debug!(
                    "replay: remove on empty/missing list={} ignored (ts={})",
                    entry.list_id, entry.timestamp
                ),
            },
        }
    }
}
