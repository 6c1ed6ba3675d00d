//! ProxyServer: bind (with retry), accept loop, pre-binding.

use super::context::ProxyState;
use super::handler::handle_request;
use super::lifecycle::ServerState;
use super::network::create_reusable_listener;
use anyhow::Context;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// Bind-retry budget for a port still held by a terminating instance.
pub const BIND_RETRIES: u32 = 10;
pub const BIND_RETRY_PAUSE: Duration = Duration::from_millis(500);

pub struct ProxyServer {
    state: Arc<ProxyState>,
}

impl ProxyServer {
    pub fn new(state: Arc<ProxyState>) -> Self {
        Self { state }
    }

    /// Bind the listening socket, retrying while the port is still being
    /// released by another instance.
    pub async fn bind(&self, addr: SocketAddr) -> anyhow::Result<TcpListener> {
        self.state.lifecycle.advance(ServerState::Starting);
        bind_with_retry(addr).await
    }

    /// Take over a listener bound in the background by [`prebind`].
    pub async fn adopt_prebound(
        &self,
        pending: oneshot::Receiver<anyhow::Result<TcpListener>>,
    ) -> anyhow::Result<TcpListener> {
        self.state.lifecycle.advance(ServerState::Starting);
        pending
            .await
            .context("pre-bind task ended without delivering a listener")?
    }

    /// Accept connections until the lifecycle signals shutdown. Accepted
    /// connections finish serving; only the listener goes down.
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        let lifecycle = self.state.lifecycle.clone();
        lifecycle.advance(ServerState::Running);
        info!("listening on http://{}", listener.local_addr()?);

        // signal-based termination drains the same one-shot usage flush as
        // the explicit stop path
        {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("interrupt received, stopping");
                    if let Err(e) = lifecycle.stop() {
                        warn!("shutdown signal not delivered: {e}");
                    }
                }
            });
        }

        let mut shutdown_rx = lifecycle.subscribe();
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, remote_addr)) => {
                            let state = Arc::clone(&self.state);
                            tokio::spawn(async move {
                                let io = TokioIo::new(stream);
                                let service = service_fn(move |req| {
                                    let state = Arc::clone(&state);
                                    async move {
                                        Ok::<_, Infallible>(handle_request(&state, req).await)
                                    }
                                });
                                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                                    debug!("connection error from {remote_addr}: {e}");
                                }
                            });
                        }
                        Err(e) => error!("accept error: {e}"),
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("shutdown signal received, closing listener");
                    break;
                }
            }
        }

        lifecycle.advance(ServerState::Stopped);
        Ok(())
    }
}

/// Bind with the retry budget, pausing between attempts.
pub async fn bind_with_retry(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    let mut attempt = 1;
    loop {
        match create_reusable_listener(addr) {
            Ok(listener) => {
                if attempt > 1 {
                    info!("bound {addr} on attempt {attempt}");
                }
                return Ok(listener);
            }
            Err(e) if attempt < BIND_RETRIES => {
                warn!("bind attempt {attempt}/{BIND_RETRIES} on {addr} failed: {e}, retrying");
                tokio::time::sleep(BIND_RETRY_PAUSE).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to bind {addr} after {BIND_RETRIES} attempts"))
            }
        }
    }
}

/// Begin binding on a background task before the rest of configuration
/// (specification fetch, validation) completes. The caller awaits the
/// receiver once startup is otherwise done, shortening observed
/// time-to-ready when specification loading is slow.
pub fn prebind(addr: SocketAddr) -> oneshot::Receiver<anyhow::Result<TcpListener>> {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let result = bind_with_retry(addr).await;
        if tx.send(result).is_err() {
            warn!("pre-bound listener dropped before the server started");
        }
    });
    rx
}
