//! Prometheus exporter (tiny_http) для счётчиков из metrics.rs.
//!
//! Маршруты: GET / | /health | /ready -> "OK"; GET /metrics -> text 0.0.4; иначе 404.

use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use tiny_http::{Header, Response, Server};

use crate::metrics::render_prometheus;

/// Запустить exporter в отдельном потоке. Поток живёт до конца процесса.
pub fn spawn_metrics_exporter(addr: &str) -> Result<std::thread::JoinHandle<()>> {
    let server = Server::http(addr).map_err(|e| anyhow!("bind http at {}: {}", addr, e))?;
    info!("metrics exporter listening on {}", addr);

    std::thread::Builder::new()
        .name("remotelist-metrics".into())
        .spawn(move || serve(server))
        .context("spawn metrics exporter thread")
}

fn serve(server: Server) {
    loop {
        let rq = match server.recv() {
            Ok(rq) => rq,
            Err(e) => {
                warn!("http recv error: {}", e);
                continue;
            }
        };

        let url = rq.url().to_string();
        let is_get = rq.method().as_str() == "GET";

        if is_get && (url == "/" || url == "/health" || url == "/ready") {
            let _ = rq.respond(Response::from_string("OK\n").with_status_code(200));
            continue;
        }

        if is_get && url == "/metrics" {
            let mut resp = Response::from_string(render_prometheus());
            if let Ok(ct) = Header::from_bytes(b"Content-Type", b"text/plain; version=0.0.4") {
                resp.add_header(ct);
            }
            let _ = rq.respond(resp);
            continue;
        }

        let _ = rq.respond(Response::from_string("not found\n").with_status_code(404));
    }
}
