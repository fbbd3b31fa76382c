//! TCP server hosting the broker.
//!
//! Accepts peer connections and dispatches framed JSON-RPC calls to a
//! [`BrokerDispatch`]. Each connection is handled in its own spawned task
//! and owns a [`PeerConn`]; when the task exits (EOF, error, or server
//! shutdown) the connection's death notices fire, which is what makes
//! registrations and leases reclaimable.
//!
//! # Thread safety
//!
//! The dispatch target is shared via `Arc`; the registry behind it uses its
//! own internal lock. Nothing here holds that lock across I/O.

use crate::peer::PeerConn;
use crate::protocol::{read_frame, write_frame, RpcRequest, RpcResponse};
use crate::service::BrokerDispatch;
use pipebroker_core::RpcConfig;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, warn};

/// Handle to a running broker server. Dropping shuts down the server.
pub struct BrokerServerHandle {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    conn_shutdown_tx: watch::Sender<bool>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl BrokerServerHandle {
    /// Get the address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Shut down the server gracefully.
    ///
    /// Stops accepting new connections and signals all active connection
    /// handlers to close.
    pub fn shutdown(&mut self) {
        // Signal accept loop to stop
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        // Signal all connection handlers to close
        let _ = self.conn_shutdown_tx.send(true);
    }
}

impl Drop for BrokerServerHandle {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}

/// TCP server front for the broker registry.
pub struct BrokerServer;

impl BrokerServer {
    /// Bind and start serving. Pass port 0 for an OS-assigned port.
    ///
    /// Returns a handle carrying the bound address; the server runs in
    /// background tokio tasks until the handle shuts it down.
    pub async fn start<D: BrokerDispatch>(
        dispatch: Arc<D>,
        host: &str,
        port: u16,
    ) -> std::io::Result<BrokerServerHandle> {
        let listener = TcpListener::bind((host, port)).await?;
        let addr = listener.local_addr()?;

        info!("Broker server listening on {}", addr);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (conn_shutdown_tx, conn_shutdown_rx) = watch::channel(false);
        let active_connections = Arc::new(AtomicUsize::new(0));

        let task_handle = tokio::spawn(Self::accept_loop(
            listener,
            dispatch,
            shutdown_rx,
            conn_shutdown_rx,
            active_connections,
        ));

        Ok(BrokerServerHandle {
            addr,
            shutdown_tx: Some(shutdown_tx),
            conn_shutdown_tx,
            task_handle: Some(task_handle),
        })
    }

    async fn accept_loop<D: BrokerDispatch>(
        listener: TcpListener,
        dispatch: Arc<D>,
        mut shutdown_rx: oneshot::Receiver<()>,
        conn_shutdown_rx: watch::Receiver<bool>,
        active_connections: Arc<AtomicUsize>,
    ) {
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("Broker server shutting down");
                    break;
                }
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            let current = active_connections.load(Ordering::Relaxed);
                            if current >= RpcConfig::MAX_CONNECTIONS {
                                warn!(
                                    "Rejecting connection from {}: at max capacity ({})",
                                    peer_addr,
                                    RpcConfig::MAX_CONNECTIONS
                                );
                                continue;
                            }

                            active_connections.fetch_add(1, Ordering::Relaxed);
                            let dispatch = dispatch.clone();
                            let conns = active_connections.clone();
                            let mut conn_shutdown = conn_shutdown_rx.clone();

                            tokio::spawn(async move {
                                debug!("Peer connected from {}", peer_addr);
                                let peer = PeerConn::new(peer_addr);
                                if let Err(e) = Self::handle_connection(
                                    stream,
                                    &*dispatch,
                                    &peer,
                                    &mut conn_shutdown,
                                )
                                .await
                                {
                                    debug!("Connection {} ended: {}", peer_addr, e);
                                }
                                // The connection is the liveness edge: its end is
                                // the peer's death.
                                peer.disconnected();
                                conns.fetch_sub(1, Ordering::Relaxed);
                            });
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
            }
        }
    }

    async fn handle_connection<D: BrokerDispatch>(
        mut stream: TcpStream,
        dispatch: &D,
        peer: &PeerConn,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> std::io::Result<()> {
        let (mut reader, mut writer) = stream.split();

        loop {
            // Wait for either a frame or a shutdown signal
            let frame = tokio::select! {
                result = read_frame(&mut reader) => {
                    match result? {
                        Some(f) => f,
                        None => return Ok(()), // Clean disconnect
                    }
                }
                _ = shutdown_rx.changed() => {
                    return Ok(()); // Server shutting down
                }
            };

            let response = Self::process_request(&frame, dispatch, peer).await;

            let response_bytes = serde_json::to_vec(&response).map_err(std::io::Error::other)?;
            write_frame(&mut writer, &response_bytes).await?;
        }
    }

    async fn process_request<D: BrokerDispatch>(
        frame: &[u8],
        dispatch: &D,
        peer: &PeerConn,
    ) -> RpcResponse {
        let request: RpcRequest = match serde_json::from_slice(frame) {
            Ok(req) => req,
            Err(e) => {
                return RpcResponse::error(None, -32700, format!("Parse error: {}", e));
            }
        };

        // Validate JSON-RPC version
        if request.jsonrpc != "2.0" {
            return RpcResponse::error(
                request.id,
                -32600,
                "Invalid Request: expected jsonrpc 2.0".to_string(),
            );
        }

        let params = request
            .params
            .unwrap_or(serde_json::Value::Object(Default::default()));

        match dispatch.dispatch(peer, &request.method, params).await {
            Ok(result) => RpcResponse::success(request.id, result),
            Err(e) => {
                let code = e.to_rpc_error_code();
                RpcResponse::error(request.id, code, e.to_string())
            }
        }
    }
}
