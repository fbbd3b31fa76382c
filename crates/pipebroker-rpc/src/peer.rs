//! Connection-backed peer capabilities.
//!
//! In this host the TCP connection is the liveness edge: a peer is alive for
//! exactly as long as its connection's read task is running. Every runner or
//! client capability handed to the registry is backed by the [`PeerConn`] of
//! the connection that presented it; when that connection ends, the server
//! fires all death notices linked through it, exactly once.

use pipebroker_core::{ClientRef, DeathNotice, RemoteRef, RunnerRef};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

struct ConnState {
    closed: bool,
    notices: Vec<DeathNotice>,
}

/// Shared per-connection state for death-notice fan-out.
///
/// Clones share the same connection identity (reference-counted), so a
/// capability duplicated out of the registry still observes the original
/// connection's disconnect.
#[derive(Clone)]
pub struct PeerConn {
    addr: SocketAddr,
    state: Arc<Mutex<ConnState>>,
}

impl PeerConn {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            state: Arc::new(Mutex::new(ConnState {
                closed: false,
                notices: Vec::new(),
            })),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The guarded section only pushes, prunes, and drains the list, so a
    /// poisoned lock still guards a consistent state; recover instead of
    /// panicking.
    fn lock_state(&self) -> MutexGuard<'_, ConnState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Link a death notice to this connection.
    ///
    /// Returns `false` if the connection has already closed. The check and
    /// the push share one lock, so a notice is either rejected here or is
    /// guaranteed to be fired by `disconnected`.
    ///
    /// Notices whose handles have all been dropped (failed acquires,
    /// superseded leases) are unlinked here, keeping the list bounded by
    /// the connection's live handles rather than its request count.
    fn link(&self, notice: DeathNotice) -> bool {
        let mut state = self.lock_state();
        if state.closed {
            return false;
        }
        state.notices.retain(|n| n.has_observers());
        state.notices.push(notice);
        true
    }

    /// Mark the connection closed and fire every linked notice.
    ///
    /// Called once by the server when the connection's read task exits.
    /// Notices are idempotent, so a duplicate call is harmless.
    pub fn disconnected(&self) {
        let notices = {
            let mut state = self.lock_state();
            state.closed = true;
            std::mem::take(&mut state.notices)
        };
        if !notices.is_empty() {
            debug!(peer = %self.addr, count = notices.len(), "firing death notices");
        }
        for notice in notices {
            notice.notify();
        }
    }

    #[cfg(test)]
    pub(crate) fn linked_notice_count(&self) -> usize {
        self.lock_state().notices.len()
    }
}

/// A runner capability registered over a connection.
///
/// Carries the processing endpoint the runner advertised at registration
/// time; the broker itself never interprets it beyond handing it back to an
/// acquiring client.
#[derive(Clone)]
pub struct RunnerPeer {
    conn: PeerConn,
    endpoint: String,
}

impl RunnerPeer {
    pub fn new(conn: PeerConn, endpoint: impl Into<String>) -> Self {
        Self {
            conn,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl RemoteRef for RunnerPeer {
    fn link_death_notice(&self, notice: DeathNotice) -> bool {
        self.conn.link(notice)
    }
}

impl RunnerRef for RunnerPeer {}

/// A client-info capability presented over a connection.
#[derive(Clone)]
pub struct ClientPeer {
    conn: PeerConn,
    name: String,
}

impl ClientPeer {
    pub fn new(conn: PeerConn, name: impl Into<String>) -> Self {
        Self {
            conn,
            name: name.into(),
        }
    }
}

impl RemoteRef for ClientPeer {
    fn link_death_notice(&self, notice: DeathNotice) -> bool {
        self.conn.link(notice)
    }
}

impl ClientRef for ClientPeer {
    fn client_name(&self) -> String {
        self.name.clone()
    }
}
