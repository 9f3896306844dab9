// tests/snapshot_roundtrip.rs
//
// Снапшоты:
// - create + load воспроизводят состояние, replay берёт только хвост WAL;
// - crash между записью tmp и rename: прежний снапшот цел, состояние полное;
// - битый снапшот -> пустая база + полный replay WAL.

use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use remotelist::snapshots::{read_snapshot, write_snapshot_tmp};
use remotelist::{ListConfig, ListsMap, RemoteList, Snapshot, WalReader};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("rltest-snap-{prefix}-{pid}-{t}-{id}"))
}

#[test]
fn create_then_load_replays_only_tail() -> Result<()> {
    let root = unique_root("tail");
    fs::create_dir_all(&root)?;
    let cfg = ListConfig::for_base(root.join("lists"));

    let info = {
        let rl = RemoteList::open(cfg.clone())?;
        for v in 0..10 {
            rl.append(1, v)?;
        }
        rl.append(2, 100)?;
        let info = rl.create_snapshot()?;
        assert_eq!(info.lists, 2);
        assert!(info.bytes > 0);

        // после снапшота
        rl.append(1, 10)?;
        assert_eq!(rl.remove(2)?, 100);
        info
    };

    // Файл снапшота: JSON с той же меткой и содержимым на момент снимка.
    let snap = read_snapshot(&cfg.snapshot_path())?.expect("snapshot file");
    assert_eq!(snap.timestamp, info.timestamp);
    assert_eq!(snap.lists.get(&1), Some(&(0..10).collect::<Vec<i64>>()));
    assert_eq!(snap.lists.get(&2), Some(&vec![100]));
    assert!(!cfg.snapshot_tmp_path().exists(), "tmp must be renamed away");

    let rl = RemoteList::new(cfg.clone());
    let report = rl.load_from_snapshot()?;
    assert_eq!(report.snapshot_ts, info.timestamp);
    assert_eq!(report.skipped_stale, 11);
    assert_eq!(report.replayed, 2);

    let all = rl.get_all();
    assert_eq!(all.get(&1), Some(&(0..=10).collect::<Vec<i64>>()));
    // пустой список остаётся известным ключом
    assert_eq!(all.get(&2), Some(&Vec::new()));

    // Все записи после снапшота строго новее его метки.
    for e in WalReader::open(&cfg.log_path())?.skip(11) {
        assert!(e.timestamp > info.timestamp);
    }
    Ok(())
}

#[test]
fn snapshot_file_keys_are_strings() -> Result<()> {
    let root = unique_root("format");
    fs::create_dir_all(&root)?;
    let cfg = ListConfig::for_base(root.join("lists"));

    let rl = RemoteList::open(cfg.clone())?;
    rl.append(-3, 1)?;
    rl.append(12, 2)?;
    rl.create_snapshot()?;

    let raw = fs::read_to_string(cfg.snapshot_path())?;
    let v: serde_json::Value = serde_json::from_str(&raw)?;
    assert!(v["timestamp"].is_i64());
    assert_eq!(v["lists"]["-3"], serde_json::json!([1]));
    assert_eq!(v["lists"]["12"], serde_json::json!([2]));
    Ok(())
}

#[test]
fn crash_between_tmp_write_and_rename() -> Result<()> {
    let root = unique_root("crash");
    fs::create_dir_all(&root)?;
    let cfg = ListConfig::for_base(root.join("lists"));

    let first_ts = {
        let rl = RemoteList::open(cfg.clone())?;
        rl.append(1, 1)?;
        rl.append(1, 2)?;
        let info = rl.create_snapshot()?;
        rl.append(1, 3)?;
        info.timestamp
    };

    // Имитация: новый снапшот записан в tmp, но rename не случился.
    let mut lists = ListsMap::new();
    lists.insert(1, vec![999]);
    let tmp = write_snapshot_tmp(
        &cfg.snapshot_path(),
        &Snapshot {
            timestamp: i64::MAX - 1,
            lists,
        },
    )?;
    assert!(tmp.exists());
    assert_eq!(tmp, cfg.snapshot_tmp_path());

    // Канонический файл - прежний.
    let snap = read_snapshot(&cfg.snapshot_path())?.expect("old snapshot");
    assert_eq!(snap.timestamp, first_ts);

    // Старт игнорирует tmp: прежний снапшот + хвост WAL.
    let rl = RemoteList::open(cfg.clone())?;
    assert_eq!(rl.get_all().get(&1), Some(&vec![1, 2, 3]));

    // Следующий снапшот перезаписывает висящий tmp и коммитит его.
    let info = rl.create_snapshot()?;
    assert!(info.timestamp > first_ts);
    let snap = read_snapshot(&cfg.snapshot_path())?.expect("new snapshot");
    assert_eq!(snap.lists.get(&1), Some(&vec![1, 2, 3]));
    assert!(!cfg.snapshot_tmp_path().exists());
    Ok(())
}

#[test]
fn corrupt_snapshot_falls_back_to_full_replay() -> Result<()> {
    let root = unique_root("corrupt");
    fs::create_dir_all(&root)?;
    let cfg = ListConfig::for_base(root.join("lists"));

    {
        let rl = RemoteList::open(cfg.clone())?;
        rl.append(8, 1)?;
        rl.append(8, 2)?;
        rl.append(9, 3)?;
    }
    fs::write(cfg.snapshot_path(), b"{\"timestamp\": 5, \"lists\": {")?;

    let rl = RemoteList::new(cfg);
    let report = rl.load_from_snapshot()?;
    assert!(report.snapshot_corrupt);
    assert_eq!(report.snapshot_ts, 0);
    assert_eq!(report.replayed, 3);

    let all = rl.get_all();
    assert_eq!(all.get(&8), Some(&vec![1, 2]));
    assert_eq!(all.get(&9), Some(&vec![3]));
    Ok(())
}

#[test]
fn empty_store_snapshot_and_missing_files() -> Result<()> {
    let root = unique_root("empty");
    fs::create_dir_all(&root)?;
    let cfg = ListConfig::for_base(root.join("lists"));

    // Ни снапшота, ни WAL: пустое состояние без ошибок.
    let rl = RemoteList::open(cfg.clone())?;
    assert!(rl.get_all().is_empty());

    let info = rl.create_snapshot()?;
    assert_eq!(info.lists, 0);
    let snap = read_snapshot(&cfg.snapshot_path())?.expect("snapshot");
    assert!(snap.lists.is_empty());

    let rl = RemoteList::open(cfg)?;
    assert!(rl.get_all().is_empty());
    Ok(())
}
