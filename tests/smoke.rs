use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use remotelist::{ListConfig, ListError, RemoteList};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

#[test]
fn smoke_append_get_remove_size() -> Result<()> {
    let root = unique_root("smoke");
    fs::create_dir_all(&root)?;
    let rl = RemoteList::open(ListConfig::for_base(root.join("lists")))?;

    // empty store -> Append(1,10)
    rl.append(1, 10)?;
    assert_eq!(rl.size(1)?, 1);
    assert_eq!(rl.get(1, 0)?, 10);

    rl.append(1, 20)?;
    assert_eq!(rl.size(1)?, 2);

    assert_eq!(rl.remove(1)?, 20);
    assert_eq!(rl.size(1)?, 1);

    assert_eq!(rl.remove(1)?, 10);
    assert_eq!(rl.size(1)?, 0);

    // третий remove - список пуст
    match rl.remove(1) {
        Err(ListError::EmptyOrMissing(1)) => {}
        other => panic!("expected EmptyOrMissing, got {:?}", other),
    }
    Ok(())
}

#[test]
fn get_index_bounds_and_missing_key() -> Result<()> {
    let root = unique_root("bounds");
    fs::create_dir_all(&root)?;
    let rl = RemoteList::open(ListConfig::for_base(root.join("lists")))?;

    // ключ не встречался -> NotFound
    assert!(matches!(rl.get(5, 0), Err(ListError::NotFound(5))));

    rl.append(5, 1)?;
    rl.append(5, 2)?;
    rl.append(5, 3)?;

    assert!(matches!(
        rl.get(5, -1),
        Err(ListError::IndexOutOfRange { key: 5, index: -1, len: 3 })
    ));
    assert!(matches!(
        rl.get(5, 3),
        Err(ListError::IndexOutOfRange { key: 5, index: 3, len: 3 })
    ));
    assert_eq!(rl.get(5, 2)?, 3);

    // список опустошён, но ключ уже известен: индекс вне диапазона, а не NotFound
    for _ in 0..3 {
        rl.remove(5)?;
    }
    assert!(matches!(rl.get(5, 0), Err(ListError::IndexOutOfRange { .. })));
    Ok(())
}

#[test]
fn remove_on_unseen_key_creates_nothing() -> Result<()> {
    let root = unique_root("unseen");
    fs::create_dir_all(&root)?;
    let rl = RemoteList::open(ListConfig::for_base(root.join("lists")))?;

    assert!(matches!(rl.remove(42), Err(ListError::EmptyOrMissing(42))));
    assert_eq!(rl.size(42)?, 0);
    assert!(rl.get_all().is_empty(), "remove must not create an entry");
    assert!(matches!(rl.get(42, 0), Err(ListError::NotFound(42))));

    // и в WAL ничего не попало
    let log = fs::read_to_string(rl.config().log_path()).unwrap_or_default();
    assert!(log.is_empty(), "failed remove must not be logged: {log:?}");
    Ok(())
}

#[test]
fn get_all_is_a_copy() -> Result<()> {
    let root = unique_root("getall");
    fs::create_dir_all(&root)?;
    let rl = RemoteList::open(ListConfig::for_base(root.join("lists")))?;

    rl.append(2, 7)?;
    rl.append(3, 8)?;
    let mut all = rl.get_all();
    all.get_mut(&2).expect("list 2").push(99);

    assert_eq!(rl.size(2)?, 1);
    assert_eq!(rl.get_all().get(&3), Some(&vec![8]));
    Ok(())
}

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("rltest-smoke-{prefix}-{pid}-{t}-{id}"))
}
