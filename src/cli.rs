use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use crate::config::ListConfig;
use crate::rpc::{run_server, RpcClient};
use crate::service::RemoteList;
use crate::snapshots::read_snapshot;
use crate::store::ListsMap;
use crate::wal::{Op, WalReader};

#[derive(Parser, Debug)]
#[command(
    name = "remotelist",
    version,
    about = "Remote integer lists over TCP with WAL and atomic snapshots",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Run the server (loads snapshot + WAL, serves RPC, snapshots periodically and on SIGINT/SIGTERM).
    Serve {
        /// Base path for <base>.log / <base>.snapshot (env RL_BASE_PATH)
        #[arg(long)]
        base: Option<PathBuf>,
        /// Listen address (env RL_LISTEN_ADDR)
        #[arg(long)]
        listen: Option<String>,
        /// Snapshot period in seconds, 0 = only on shutdown (env RL_SNAPSHOT_INTERVAL_SECS)
        #[arg(long)]
        snapshot_interval_secs: Option<u64>,
        /// fsync every WAL record (env RL_WAL_FSYNC)
        #[arg(long)]
        wal_fsync: bool,
        /// Prometheus exporter address, e.g. 127.0.0.1:9898 (env RL_METRICS_ADDR)
        #[arg(long)]
        metrics_addr: Option<String>,
    },

    // ------- one-shot client calls -------
    Append {
        #[arg(long, default_value = crate::consts::DEFAULT_LISTEN_ADDR)]
        addr: String,
        #[arg(long)]
        list: i64,
        #[arg(long, allow_hyphen_values = true)]
        value: i64,
    },
    Get {
        #[arg(long, default_value = crate::consts::DEFAULT_LISTEN_ADDR)]
        addr: String,
        #[arg(long)]
        list: i64,
        #[arg(long, allow_hyphen_values = true)]
        index: i64,
    },
    Remove {
        #[arg(long, default_value = crate::consts::DEFAULT_LISTEN_ADDR)]
        addr: String,
        #[arg(long)]
        list: i64,
    },
    Size {
        #[arg(long, default_value = crate::consts::DEFAULT_LISTEN_ADDR)]
        addr: String,
        #[arg(long)]
        list: i64,
    },
    /// Dump all lists (debug).
    Dump {
        #[arg(long, default_value = crate::consts::DEFAULT_LISTEN_ADDR)]
        addr: String,
        #[arg(long)]
        json: bool,
    },

    /// Offline: describe snapshot and WAL files and the state they reconstruct.
    Inspect {
        #[arg(long)]
        base: PathBuf,
        /// Print reconstructed lists
        #[arg(long)]
        lists: bool,
        #[arg(long)]
        json: bool,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Serve {
            base,
            listen,
            snapshot_interval_secs,
            wal_fsync,
            metrics_addr,
        } => {
            let mut cfg = ListConfig::from_env();
            if let Some(b) = base {
                cfg = cfg.with_base_path(b);
            }
            if let Some(l) = listen {
                cfg = cfg.with_listen_addr(l);
            }
            if let Some(s) = snapshot_interval_secs {
                cfg = cfg.with_snapshot_interval_secs(s);
            }
            if wal_fsync {
                cfg = cfg.with_wal_fsync(true);
            }
            if metrics_addr.is_some() {
                cfg = cfg.with_metrics_addr(metrics_addr);
            }

            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("build tokio runtime")?;
            rt.block_on(run_server(cfg))?;
        }
        Cmd::Append { addr, list, value } => {
            let mut c = connect(&addr)?;
            c.append(list, value)?;
            println!("Appended {} to list {}", value, list);
        }
        Cmd::Get { addr, list, index } => {
            let mut c = connect(&addr)?;
            let v = c.get(list, index)?;
            println!("list {} [{}] = {}", list, index, v);
        }
        Cmd::Remove { addr, list } => {
            let mut c = connect(&addr)?;
            let v = c.remove(list)?;
            println!("Removed {} from list {}", v, list);
        }
        Cmd::Size { addr, list } => {
            let mut c = connect(&addr)?;
            let n = c.size(list)?;
            println!("list {} size = {}", list, n);
        }
        Cmd::Dump { addr, json } => {
            let mut c = connect(&addr)?;
            let all = c.get_all()?;
            print_lists(&all, json)?;
        }
        Cmd::Inspect { base, lists, json } => inspect(base, lists, json)?,
    }
    Ok(())
}

fn connect(addr: &str) -> Result<RpcClient> {
    RpcClient::connect(addr).with_context(|| format!("connect to {}", addr))
}

fn print_lists(all: &ListsMap, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(all)?);
        return Ok(());
    }
    if all.is_empty() {
        println!("(no lists)");
    }
    for (k, v) in all {
        println!("list_id={} -> {:?}", k, v);
    }
    Ok(())
}

fn inspect(base: PathBuf, show_lists: bool, json: bool) -> Result<()> {
    let cfg = ListConfig::for_base(&base);
    let snap_path = cfg.snapshot_path();
    let log_path = cfg.log_path();

    let (snap_ts, snap_lists, snap_state) = match read_snapshot(&snap_path) {
        Ok(Some(s)) => (s.timestamp, s.lists.len(), "ok"),
        Ok(None) => (0, 0, "absent"),
        Err(e) => {
            log::warn!("{}", e);
            (0, 0, "corrupt")
        }
    };

    let mut reader = WalReader::open(&log_path)
        .with_context(|| format!("read {}", log_path.display()))?;
    let (mut appends, mut removes, mut pending) = (0usize, 0usize, 0usize);
    for e in reader.by_ref() {
        match e.operation {
            Op::Append => appends += 1,
            Op::Remove => removes += 1,
        }
        if e.timestamp > snap_ts {
            pending += 1;
        }
    }

    // Та же процедура, что на старте сервера, но без ремонта хвоста WAL.
    let rl = RemoteList::new(cfg);
    rl.reconstruct()
        .map_err(|e| anyhow!("reconstruct state: {}", e))?;
    let state = rl.get_all();

    if json {
        let lists_v = if show_lists {
            serde_json::to_value(&state)?
        } else {
            serde_json::Value::Null
        };
        let v = serde_json::json!({
            "base": base.display().to_string(),
            "snapshot": { "state": snap_state, "timestamp": snap_ts, "lists": snap_lists },
            "wal": {
                "appends": appends,
                "removes": removes,
                "pending_after_snapshot": pending,
                "corrupt": reader.skipped(),
                "partial_tail": reader.had_partial_tail(),
            },
            "lists": lists_v,
        });
        println!("{}", serde_json::to_string_pretty(&v)?);
        return Ok(());
    }

    println!("remotelist at {}", base.display());
    println!("  snapshot        = {} ({})", snap_path.display(), snap_state);
    println!("    timestamp     = {}", snap_ts);
    println!("    lists         = {}", snap_lists);
    println!("  wal             = {}", log_path.display());
    println!("    appends       = {}", appends);
    println!("    removes       = {}", removes);
    println!("    after snapshot= {}", pending);
    println!("    corrupt       = {}", reader.skipped());
    println!("    partial tail  = {}", reader.had_partial_tail());
    println!("  reconstructed   = {} list(s)", state.len());
    if show_lists {
        print_lists(&state, false)?;
    }
    Ok(())
}
