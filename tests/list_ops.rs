// tests/list_ops.rs
//
// Модельный тест: случайная последовательность append/remove/get/size по
// нескольким ключам сверяется с Vec-стеком в памяти. Затем reopen
// (снапшот + WAL) обязан восстановить то же состояние.

use anyhow::Result;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use oorandom::Rand64;

use remotelist::{ListConfig, ListError, RemoteList};

#[inline]
fn nanos() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos()
}

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = nanos();
    std::env::temp_dir().join(format!("rltest-ops-{prefix}-{pid}-{t}"))
}

#[test]
fn random_ops_match_stack_model() -> Result<()> {
    let root = unique_root("model");
    fs::create_dir_all(&root)?;
    let cfg = ListConfig::for_base(root.join("lists"));

    let mut model: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
    let mut rng = Rand64::new(0xC0FFEE);

    {
        let rl = RemoteList::open(cfg.clone())?;
        for step in 0..2000u32 {
            let key = rng.rand_range(0..6) as i64 - 2; // и отрицательные ключи
            match rng.rand_range(0..10) {
                0..=4 => {
                    let v = rng.rand_i64() % 1_000_000;
                    rl.append(key, v)?;
                    model.entry(key).or_default().push(v);
                }
                5..=6 => {
                    let want = model.get_mut(&key).and_then(|ls| ls.pop());
                    match (rl.remove(key), want) {
                        (Ok(got), Some(v)) => assert_eq!(got, v, "step {step}: remove key={key}"),
                        (Err(ListError::EmptyOrMissing(k)), None) => assert_eq!(k, key),
                        (got, want) => panic!("step {step}: remove key={key}: {got:?} vs {want:?}"),
                    }
                }
                7..=8 => {
                    let len = model.get(&key).map(|ls| ls.len()).unwrap_or(0) as u64;
                    let idx = rng.rand_range(0..len + 2) as i64 - 1;
                    let got = rl.get(key, idx);
                    match model.get(&key) {
                        None => assert!(matches!(got, Err(ListError::NotFound(k)) if k == key)),
                        Some(ls) if idx >= 0 && (idx as usize) < ls.len() => {
                            assert_eq!(got?, ls[idx as usize], "step {step}: get({key},{idx})");
                        }
                        Some(_) => assert!(
                            matches!(got, Err(ListError::IndexOutOfRange { .. })),
                            "step {step}: get({key},{idx}) = {got:?}"
                        ),
                    }
                }
                _ => {
                    let want = model.get(&key).map(|ls| ls.len()).unwrap_or(0);
                    assert_eq!(rl.size(key)?, want, "step {step}: size({key})");
                }
            }

            // иногда - снапшот посреди нагрузки
            if step % 500 == 499 {
                rl.create_snapshot()?;
            }
        }
        assert_eq!(rl.get_all(), model);
    }

    // Reopen: снапшот + хвост WAL дают то же состояние.
    let rl = RemoteList::open(cfg)?;
    assert_eq!(rl.get_all(), model);
    Ok(())
}

#[test]
fn concrete_sequence_from_empty() -> Result<()> {
    let root = unique_root("seq");
    fs::create_dir_all(&root)?;
    let rl = RemoteList::open(ListConfig::for_base(root.join("lists")))?;

    rl.append(1, 10)?;
    rl.append(1, 20)?;
    rl.append(2, 30)?;
    assert_eq!(rl.get(1, 1)?, 20);
    assert_eq!(rl.size(2)?, 1);
    assert_eq!(rl.remove(1)?, 20);

    let all = rl.get_all();
    assert_eq!(all.get(&1), Some(&vec![10]));
    assert_eq!(all.get(&2), Some(&vec![30]));
    assert_eq!(all.len(), 2);

    // Ключи независимы.
    assert!(matches!(rl.remove(3), Err(ListError::EmptyOrMissing(3))));
    assert_eq!(rl.size(1)?, 1);
    Ok(())
}

#[test]
fn extreme_values_survive_reopen() -> Result<()> {
    let root = unique_root("extreme");
    fs::create_dir_all(&root)?;
    let cfg = ListConfig::for_base(root.join("lists"));

    {
        let rl = RemoteList::open(cfg.clone())?;
        rl.append(i64::MIN, i64::MAX)?;
        rl.append(i64::MIN, i64::MIN)?;
        rl.append(0, -1)?;
    }

    let rl = RemoteList::open(cfg)?;
    assert_eq!(rl.get(i64::MIN, 0)?, i64::MAX);
    assert_eq!(rl.get(i64::MIN, 1)?, i64::MIN);
    assert_eq!(rl.get(0, 0)?, -1);
    Ok(())
}
