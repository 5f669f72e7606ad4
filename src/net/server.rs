//! TCP listener for the PostgreSQL front-end.
//!
//! Accepts connections and dispatches each one to its own session loop task.

use std::io;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use log::*;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::engine::SqlEngine;
use crate::metrics::METRICS;

use super::conn::handle_client;

/// Bind the configured address and serve connections.
///
/// Only listener-level failures return; per-connection errors are logged and
/// absorbed by their tasks.
pub async fn serve<E>(cfg: Arc<Config>, engine: Arc<E>) -> io::Result<()>
where
    E: SqlEngine + 'static,
{
    let listener = TcpListener::bind(&cfg.server.bind_addr).await?;
    info!("postgres front-end listening on {}", listener.local_addr()?);
    accept_loop(listener, cfg, engine).await
}

/// Accept connections on an already-bound listener.
pub async fn accept_loop<E>(
    listener: TcpListener,
    cfg: Arc<Config>,
    engine: Arc<E>,
) -> io::Result<()>
where
    E: SqlEngine + 'static,
{
    loop {
        let (socket, addr) = match listener.accept().await {
            Ok(v) => v,
            Err(e) => {
                error!("accept: {}", e);
                continue;
            }
        };

        if METRICS.active_connections.load(Ordering::Relaxed) as usize
            >= cfg.limits.max_active_conns
        {
            debug!("refusing connection {}; too many", addr);
            drop(socket);
            continue;
        }

        METRICS.active_connections.fetch_add(1, Ordering::Relaxed);
        METRICS.connections_total.fetch_add(1, Ordering::Relaxed);

        let cfg = cfg.clone();
        let engine = engine.clone();

        tokio::spawn(async move {
            debug!("new connection from {}", addr);

            match handle_client(socket, cfg, engine).await {
                Ok(()) => debug!("connection {} closed cleanly", addr),
                Err(e) => debug!("connection {} ended: {}", addr, e),
            }

            METRICS.active_connections.fetch_sub(1, Ordering::Relaxed);
        });
    }
}
