//! rpc/server - tokio-сервер RemoteList.
//!
//! Задачи, работающие параллельно:
//! - accept loop: одна задача на соединение; каждый вызов ядра уходит в
//!   spawn_blocking (локи и файловый I/O не блокируют reactor);
//! - periodic snapshot: create_snapshot каждые snapshot_interval;
//! - shutdown: по SIGINT/SIGTERM (или внешнему future) - ровно один финальный
//!   create_snapshot, затем выход.
//! Ошибки снапшота (периодического и финального) только логируются.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use super::{dispatch, Request, Response};
use crate::config::ListConfig;
use crate::consts::RPC_MAX_LINE;
use crate::exporter::spawn_metrics_exporter;
use crate::lock::acquire_exclusive_lock;
use crate::metrics::record_rpc_connection;
use crate::service::RemoteList;

/// Полный цикл демона: lock -> load -> listen -> serve до сигнала -> финальный снапшот.
pub async fn run_server(cfg: ListConfig) -> Result<()> {
    info!("{}", cfg);

    // Один сервер на base path.
    let _lock = acquire_exclusive_lock(&cfg.base_path)
        .with_context(|| format!("acquire exclusive lock for {}", cfg.base_path.display()))?;

    let open_cfg = cfg.clone();
    let rl = tokio::task::spawn_blocking(move || RemoteList::open(open_cfg))
        .await
        .context("join load task")?
        .context("load snapshot/log")?;
    let rl = Arc::new(rl);

    if let Some(addr) = cfg.metrics_addr.as_deref() {
        spawn_metrics_exporter(addr)?;
    }

    let listener = TcpListener::bind(&cfg.listen_addr)
        .await
        .with_context(|| format!("bind listener at {}", cfg.listen_addr))?;
    info!("listening on {}", listener.local_addr()?);

    serve_with_shutdown(rl, listener, cfg.snapshot_interval(), shutdown_signal()).await
}

/// Обслуживать listener до завершения `shutdown`, затем снять финальный снапшот.
pub async fn serve_with_shutdown<F>(
    rl: Arc<RemoteList>,
    listener: TcpListener,
    snapshot_interval: Option<Duration>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    let ticker = snapshot_interval.map(|period| tokio::spawn(periodic_snapshots(Arc::clone(&rl), period)));

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown requested: creating final snapshot");
                break;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        record_rpc_connection();
                        debug!("accepted from {}", peer);
                        let rl = Arc::clone(&rl);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(rl, stream, peer).await {
                                warn!("session {} error: {:#}", peer, e);
                            }
                            debug!("disconnected {}", peer);
                        });
                    }
                    Err(e) => warn!("accept failed: {}", e),
                }
            }
        }
    }

    if let Some(t) = ticker {
        t.abort();
    }
    run_snapshot(Arc::clone(&rl), "final").await;
    Ok(())
}

async fn periodic_snapshots(rl: Arc<RemoteList>, period: Duration) {
    let start = tokio::time::Instant::now() + period;
    let mut interval = tokio::time::interval_at(start, period);
    loop {
        interval.tick().await;
        run_snapshot(Arc::clone(&rl), "periodic").await;
    }
}

async fn run_snapshot(rl: Arc<RemoteList>, what: &'static str) {
    match tokio::task::spawn_blocking(move || rl.create_snapshot()).await {
        Ok(Ok(info)) => info!(
            "[snapshot] {} snapshot ts={} ({} lists, {} B)",
            what, info.timestamp, info.lists, info.bytes
        ),
        Ok(Err(e)) => warn!("[snapshot] {} snapshot failed: {}", what, e),
        Err(e) => error!("[snapshot] {} snapshot task panicked: {}", what, e),
    }
}

/// Результат чтения одной строки запроса.
enum Line {
    Eof,
    /// Строка без терминатора (может быть пустой).
    Request,
    /// Строка длиннее RPC_MAX_LINE; остаток до '\n' уже вычитан и отброшен.
    TooLarge(usize),
}

/// Прочитать строку в `buf`, не держа в памяти больше RPC_MAX_LINE + 1 байт.
async fn read_request_line<R>(rd: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Line>
where
    R: AsyncBufRead + Unpin,
{
    let limit = RPC_MAX_LINE as u64 + 1;
    buf.clear();
    let n = (&mut *rd).take(limit).read_until(b'\n', buf).await?;
    if n == 0 {
        return Ok(Line::Eof);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        return Ok(Line::Request);
    }
    if buf.len() <= RPC_MAX_LINE {
        // EOF без терминатора: последняя строка целиком
        return Ok(Line::Request);
    }

    // Слишком длинная строка: дочитать до '\n' порциями и выбросить.
    let mut total = buf.len();
    loop {
        buf.clear();
        let n = (&mut *rd).take(limit).read_until(b'\n', buf).await?;
        total += n;
        if n == 0 || buf.last() == Some(&b'\n') {
            break;
        }
    }
    buf.clear();
    Ok(Line::TooLarge(total))
}

async fn handle_connection(rl: Arc<RemoteList>, stream: TcpStream, peer: SocketAddr) -> Result<()> {
    stream.set_nodelay(true).ok();
    let (rd, mut wr) = stream.into_split();
    let mut rd = BufReader::new(rd);
    let mut buf = Vec::with_capacity(256);

    loop {
        let resp = match read_request_line(&mut rd, &mut buf).await? {
            Line::Eof => break,
            Line::TooLarge(n) => {
                debug!("oversized request from {}: {} B", peer, n);
                Response::bad_request(format!("request too large: {} B (max {})", n, RPC_MAX_LINE))
            }
            Line::Request => {
                if buf.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                // не-UTF-8 и прочий мусор тоже сюда: ответ BadRequest, сессия живёт
                match serde_json::from_slice::<Request>(&buf) {
                    Ok(req) => {
                        let rl = Arc::clone(&rl);
                        tokio::task::spawn_blocking(move || dispatch(&rl, req))
                            .await
                            .context("join rpc call")?
                    }
                    Err(e) => {
                        debug!("bad request from {}: {}", peer, e);
                        Response::bad_request(format!("parse request: {}", e))
                    }
                }
            }
        };

        let mut out = serde_json::to_vec(&resp)?;
        out.push(b'\n');
        wr.write_all(&out).await?;
    }
    Ok(())
}

/// SIGINT (Ctrl+C) или SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("ctrl_c handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                warn!("SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("signal: SIGINT"),
        _ = terminate => info!("signal: SIGTERM"),
    }
}

// -------------------- embedding / tests --------------------

/// Сервер в фоне: собственный runtime в отдельном потоке.
pub struct BackgroundServer {
    addr: SocketAddr,
    stop: Option<oneshot::Sender<()>>,
    thread: Option<std::thread::JoinHandle<Result<()>>>,
}

impl BackgroundServer {
    /// Поднять сервер над уже открытым RemoteList на `bind` (например "127.0.0.1:0").
    pub fn start(rl: Arc<RemoteList>, bind: &str, snapshot_interval: Option<Duration>) -> Result<Self> {
        let std_listener = std::net::TcpListener::bind(bind)
            .with_context(|| format!("bind listener at {}", bind))?;
        std_listener.set_nonblocking(true)?;
        let addr = std_listener.local_addr()?;
        let (tx, rx) = oneshot::channel::<()>();

        let thread = std::thread::Builder::new()
            .name("remotelist-server".into())
            .spawn(move || -> Result<()> {
                let rt = tokio::runtime::Builder::new_multi_thread()
                    .enable_all()
                    .build()
                    .context("build tokio runtime")?;
                rt.block_on(async move {
                    let listener = TcpListener::from_std(std_listener)?;
                    serve_with_shutdown(rl, listener, snapshot_interval, async {
                        let _ = rx.await;
                    })
                    .await?;
                    Ok::<(), anyhow::Error>(())
                })
            })
            .context("spawn server thread")?;

        Ok(Self {
            addr,
            stop: Some(tx),
            thread: Some(thread),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Остановить (финальный снапшот выполняется до возврата).
    pub fn shutdown(mut self) -> Result<()> {
        self.stop_and_join()
    }

    fn stop_and_join(&mut self) -> Result<()> {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
        match self.thread.take() {
            Some(h) => h.join().map_err(|_| anyhow!("server thread panicked"))?,
            None => Ok(()),
        }
    }
}

impl Drop for BackgroundServer {
    fn drop(&mut self) {
        let _ = self.stop_and_join();
    }
}
