// Copyright 2024 RustFS Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use crate::server::{ProbeHandler, ReadinessGateLayer, ServiceState, ServiceStateManager};
use erasurefs_config::DEFAULT_SHUTDOWN_TIMEOUT_SECS;
use erasurefs_ecstore::{BindAddress, ObjectLayerCell};
use http::Request;
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

const LISTEN_BACKLOG: i32 = 1024;

/// A running listener. Dropping it leaves the listener running;
/// call [`ServerHandle::shutdown`] to drain and stop it.
pub(crate) struct ServerHandle {
    local_addr: SocketAddr,
    tls: bool,
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_tls(&self) -> bool {
        self.tls
    }

    /// Stops accepting, then waits for open connections to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            error!("http server task failed: {}", e);
        }
    }
}

fn listen_on(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    if addr.is_ipv6()
        && let Err(e) = socket.set_only_v6(false)
    {
        debug!("failed to accept IPv4 on the IPv6 socket: {}", e);
    }
    socket.set_reuse_address(true)?;
    socket.set_tcp_nodelay(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;
    TcpListener::from_std(socket.into())
}

/// Binds the address from `--address`. Without a host the listener takes
/// every interface, dual-stack when the platform allows it.
fn bind_listener(bind: &BindAddress) -> io::Result<TcpListener> {
    let addrs: Vec<SocketAddr> = if bind.has_host() {
        (bind.host.as_str(), bind.port).to_socket_addrs()?.collect()
    } else {
        vec![
            SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), bind.port),
            SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), bind.port),
        ]
    };

    let mut last_err = None;
    for addr in addrs {
        match listen_on(addr) {
            Ok(listener) => return Ok(listener),
            Err(e) => {
                debug!("unable to listen on {}: {}", addr, e);
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, format!("no address to listen on for {bind}"))))
}

/// Binds the listener and serves `handler` on a spawned task.
///
/// Requests other than probes get 503 until `cell` holds the object layer.
pub(crate) async fn start_http_server(
    bind: &BindAddress,
    handler: ProbeHandler,
    cell: Arc<ObjectLayerCell>,
    tls_acceptor: Option<TlsAcceptor>,
    state: ServiceStateManager,
) -> io::Result<ServerHandle> {
    let listener = bind_listener(bind)?;
    let local_addr = listener.local_addr()?;
    let tls = tls_acceptor.is_some();
    info!(
        target: "erasurefs::http",
        "listening on {}://{}",
        if tls { "https" } else { "http" },
        local_addr
    );

    let service = ServiceBuilder::new()
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Incoming>| {
            tracing::info_span!(
                "http-request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        }))
        .layer(ReadinessGateLayer::new(cell))
        .service(handler);
    let service = TowerToHyperService::new(service);

    let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);

    let task = tokio::spawn(async move {
        let mut conn_builder = ConnBuilder::new(TokioExecutor::new());
        conn_builder
            .http1()
            .timer(TokioTimer::new())
            .keep_alive(true)
            .header_read_timeout(Duration::from_secs(5));
        conn_builder
            .http2()
            .timer(TokioTimer::new())
            .keep_alive_interval(Some(Duration::from_secs(20)))
            .keep_alive_timeout(Duration::from_secs(10));

        let http_server = Arc::new(conn_builder);
        let graceful = GracefulShutdown::new();
        let tls_acceptor = tls_acceptor.map(Arc::new);

        loop {
            let (socket, peer) = tokio::select! {
                res = listener.accept() => match res {
                    Ok(conn) => conn,
                    Err(err) => {
                        error!("error accepting connection: {err}");
                        continue;
                    }
                },
                _ = shutdown_rx.recv() => {
                    info!(target: "erasurefs::http", "shutdown signal received, closing listener");
                    break;
                }
            };

            if let Err(err) = socket.set_nodelay(true) {
                warn!(?err, "failed to set TCP_NODELAY");
            }

            let http_server = http_server.clone();
            let service = service.clone();
            let watcher = graceful.watcher();
            match tls_acceptor.clone() {
                Some(acceptor) => {
                    tokio::spawn(async move {
                        let stream = match acceptor.accept(socket).await {
                            Ok(stream) => stream,
                            Err(err) => {
                                warn!("TLS handshake with {} failed: {}", peer, err);
                                return;
                            }
                        };
                        let conn = http_server.serve_connection(TokioIo::new(stream), service).into_owned();
                        if let Err(err) = watcher.watch(conn).await {
                            debug!("connection from {} closed: {}", peer, err);
                        }
                    });
                }
                None => {
                    tokio::spawn(async move {
                        let conn = http_server.serve_connection(TokioIo::new(socket), service).into_owned();
                        if let Err(err) = watcher.watch(conn).await {
                            debug!("connection from {} closed: {}", peer, err);
                        }
                    });
                }
            }
        }

        state.update(ServiceState::Stopping);
        tokio::select! {
            () = graceful.shutdown() => {
                debug!("gracefully shutdown");
            },
            () = tokio::time::sleep(Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS)) => {
                warn!("waited {DEFAULT_SHUTDOWN_TIMEOUT_SECS} seconds for graceful shutdown, aborting");
            }
        }
        state.update(ServiceState::Stopped);
    });

    Ok(ServerHandle {
        local_addr,
        tls,
        shutdown_tx,
        task,
    })
}
