use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use remotelist::{acquire_exclusive_lock, try_acquire_exclusive_lock, ListConfig, ListConfigBuilder, RemoteList};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let base = std::env::temp_dir();
    base.join(format!("rltest-builder-{prefix}-{pid}-{t}-{id}"))
}

const ENV_KEYS: [&str; 5] = [
    "RL_BASE_PATH",
    "RL_LISTEN_ADDR",
    "RL_SNAPSHOT_INTERVAL_SECS",
    "RL_WAL_FSYNC",
    "RL_METRICS_ADDR",
];

// Все проверки env в одном тесте: переменные окружения общие для процесса.
#[test]
fn env_overrides_defaults() {
    for k in ENV_KEYS {
        std::env::remove_var(k);
    }

    let d = ListConfig::from_env();
    assert_eq!(d.base_path, PathBuf::from("lista_dados"));
    assert_eq!(d.listen_addr, "127.0.0.1:5000");
    assert_eq!(d.snapshot_interval_secs, 30);
    assert!(!d.wal_fsync);
    assert!(d.metrics_addr.is_none());

    std::env::set_var("RL_BASE_PATH", "/tmp/rl-env-base");
    std::env::set_var("RL_LISTEN_ADDR", "0.0.0.0:6001");
    std::env::set_var("RL_SNAPSHOT_INTERVAL_SECS", "5");
    std::env::set_var("RL_WAL_FSYNC", "yes");
    std::env::set_var("RL_METRICS_ADDR", "127.0.0.1:9898");

    let c = ListConfig::from_env();
    assert_eq!(c.base_path, PathBuf::from("/tmp/rl-env-base"));
    assert_eq!(c.listen_addr, "0.0.0.0:6001");
    assert_eq!(c.snapshot_interval(), Some(Duration::from_secs(5)));
    assert!(c.wal_fsync);
    assert_eq!(c.metrics_addr.as_deref(), Some("127.0.0.1:9898"));

    // builder::new() стартует с env, явные значения - поверх
    let b = ListConfigBuilder::new().listen_addr("127.0.0.1:7000").build();
    assert_eq!(b.base_path, PathBuf::from("/tmp/rl-env-base"));
    assert_eq!(b.listen_addr, "127.0.0.1:7000");

    // мусор в числовой переменной игнорируется, пустые строки - тоже
    std::env::set_var("RL_SNAPSHOT_INTERVAL_SECS", "often");
    std::env::set_var("RL_BASE_PATH", "  ");
    std::env::set_var("RL_WAL_FSYNC", "0");
    let c = ListConfig::from_env();
    assert_eq!(c.snapshot_interval_secs, 30);
    assert_eq!(c.base_path, PathBuf::from("lista_dados"));
    assert!(!c.wal_fsync);

    for k in ENV_KEYS {
        std::env::remove_var(k);
    }
}

#[test]
fn builder_from_default_ignores_env() {
    let cfg = ListConfigBuilder::from_default()
        .base_path("/data/lists")
        .snapshot_interval_secs(0)
        .wal_fsync(true)
        .metrics_addr(Some("127.0.0.1:9100"))
        .build();

    assert_eq!(cfg.base_path, PathBuf::from("/data/lists"));
    assert_eq!(cfg.listen_addr, "127.0.0.1:5000");
    assert_eq!(cfg.snapshot_interval(), None, "0 disables periodic snapshots");
    assert!(cfg.wal_fsync);
    assert_eq!(cfg.metrics_addr.as_deref(), Some("127.0.0.1:9100"));

    let shown = cfg.to_string();
    assert!(shown.contains("/data/lists"));
    assert!(shown.contains("127.0.0.1:9100"));

    let cfg = cfg.with_metrics_addr(None::<String>);
    assert!(cfg.to_string().contains("disabled"));
}

#[test]
fn derived_paths_append_extension() {
    let cfg = ListConfig::for_base("/var/lib/rl/data.v1");
    assert_eq!(cfg.log_path(), Path::new("/var/lib/rl/data.v1.log"));
    assert_eq!(cfg.snapshot_path(), Path::new("/var/lib/rl/data.v1.snapshot"));
    assert_eq!(cfg.lock_path(), Path::new("/var/lib/rl/data.v1.lock"));
    // tmp - в том же каталоге, что и снапшот
    assert_eq!(
        cfg.snapshot_tmp_path(),
        Path::new("/var/lib/rl/.data.v1.snapshot.tmp")
    );

    let rel = ListConfig::for_base("lista_dados");
    assert_eq!(rel.log_path(), Path::new("lista_dados.log"));
    assert_eq!(rel.snapshot_tmp_path(), Path::new(".lista_dados.snapshot.tmp"));
}

#[test]
fn exclusive_file_lock_is_single_owner() -> Result<()> {
    let root = unique_root("lock");
    fs::create_dir_all(&root)?;
    let base = root.join("lists");

    let g = try_acquire_exclusive_lock(&base)?;
    assert!(g.path().ends_with("lists.lock"));
    assert!(
        try_acquire_exclusive_lock(&base).is_err(),
        "second exclusive lock must fail"
    );
    drop(g);

    // после освобождения - снова можно
    let g = try_acquire_exclusive_lock(&base)?;

    // блокирующий вариант ждёт, пока первый владелец не отпустит
    let b2 = base.clone();
    let waiter = std::thread::spawn(move || acquire_exclusive_lock(&b2).map(|_| ()));
    std::thread::sleep(Duration::from_millis(50));
    assert!(!waiter.is_finished(), "acquire must wait for the holder");
    drop(g);
    waiter.join().expect("waiter panicked")?;
    let _g = try_acquire_exclusive_lock(&base)?;

    // файл лока не мешает работе хранилища
    let rl = RemoteList::open(ListConfig::for_base(&base))?;
    rl.append(1, 1)?;
    assert_eq!(rl.size(1)?, 1);
    Ok(())
}
