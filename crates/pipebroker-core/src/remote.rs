//! Capability traits and monitored handles for remote peers.
//!
//! The registry never sees a peer's full remote API. It reaches runners and
//! clients exclusively through the narrow traits here: the ability to link a
//! death notice, the ability to duplicate a runner reference, and a
//! diagnostic name for clients. Concrete implementations live with whatever
//! transport the hosting process uses.

use crate::liveness::{DeathNotice, LivenessCell};

/// A referenceable remote peer that can be monitored for disconnection.
pub trait RemoteRef: Send + Sync + 'static {
    /// Register a death notice fired once when the peer disconnects.
    ///
    /// Returns `false` if the underlying reference is already invalid. That
    /// is a precondition failure at registration time, not a liveness
    /// observation.
    fn link_death_notice(&self, notice: DeathNotice) -> bool;
}

/// A runner capability: monitorable, and duplicable without losing
/// connection identity.
///
/// `Clone` must produce an independently-reference-counted copy of the same
/// remote reference; a disconnect of the underlying connection is observed
/// through every copy.
pub trait RunnerRef: RemoteRef + Clone {}

/// A client-info capability: monitorable, with a human-readable name used
/// only for diagnostics, never as a key.
pub trait ClientRef: RemoteRef {
    fn client_name(&self) -> String;
}

/// A runner reference paired with its liveness cell.
///
/// The registry starts monitoring immediately after construction and only
/// duplicates handles that are already monitored, so every published handle
/// reflects its peer's true connectivity (subject to notification latency).
#[derive(Debug)]
pub struct RunnerHandle<R: RunnerRef> {
    remote: R,
    alive: LivenessCell,
    monitored: bool,
}

impl<R: RunnerRef> RunnerHandle<R> {
    /// Wrap a runner reference. Monitoring is not yet armed.
    pub fn new(remote: R) -> Self {
        Self {
            remote,
            alive: LivenessCell::new(),
            monitored: false,
        }
    }

    /// Link this handle's death notice to the remote connection.
    ///
    /// Call once per handle, before publishing it anywhere. Returns `false`
    /// if the peer reference is already invalid.
    pub fn start_monitoring(&mut self) -> bool {
        debug_assert!(!self.monitored, "monitoring armed twice on one handle");
        self.monitored = self.remote.link_death_notice(self.alive.death_notice());
        self.monitored
    }

    /// Whether the peer is still considered connected.
    pub fn is_alive(&self) -> bool {
        self.alive.is_alive()
    }

    /// Duplicate the remote reference, sharing the same liveness cell.
    ///
    /// Never re-arms monitoring; a death observed through either handle is
    /// visible through both.
    pub fn duplicate(&self) -> RunnerHandle<R> {
        debug_assert!(self.monitored, "duplicating an unmonitored handle");
        RunnerHandle {
            remote: self.remote.clone(),
            alive: self.alive.clone(),
            monitored: self.monitored,
        }
    }

    /// Access the underlying remote reference.
    pub fn remote(&self) -> &R {
        &self.remote
    }
}

/// A client-info reference paired with its liveness cell.
#[derive(Debug)]
pub struct ClientHandle<C: ClientRef> {
    remote: C,
    alive: LivenessCell,
    monitored: bool,
}

impl<C: ClientRef> ClientHandle<C> {
    /// Wrap a client-info reference. Monitoring is not yet armed.
    pub fn new(remote: C) -> Self {
        Self {
            remote,
            alive: LivenessCell::new(),
            monitored: false,
        }
    }

    /// Link this handle's death notice to the remote connection.
    ///
    /// Call once per handle, before publishing it anywhere. Returns `false`
    /// if the peer reference is already invalid.
    pub fn start_monitoring(&mut self) -> bool {
        debug_assert!(!self.monitored, "monitoring armed twice on one handle");
        self.monitored = self.remote.link_death_notice(self.alive.death_notice());
        self.monitored
    }

    /// Whether the peer is still considered connected.
    pub fn is_alive(&self) -> bool {
        self.alive.is_alive()
    }

    /// Diagnostic name of the client process.
    pub fn client_name(&self) -> String {
        self.remote.client_name()
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    //! In-process peer fakes with manually fired death notices.

    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug)]
    struct FakeInner {
        valid: bool,
        notices: Mutex<Vec<DeathNotice>>,
    }

    /// A fake runner peer. `kill()` simulates the transport observing a
    /// disconnect.
    #[derive(Debug, Clone)]
    pub struct FakeRunner {
        inner: Arc<FakeInner>,
    }

    impl FakeRunner {
        pub fn new() -> Self {
            Self {
                inner: Arc::new(FakeInner {
                    valid: true,
                    notices: Mutex::new(Vec::new()),
                }),
            }
        }

        /// A reference that is already invalid: linking a notice fails.
        pub fn invalid() -> Self {
            Self {
                inner: Arc::new(FakeInner {
                    valid: false,
                    notices: Mutex::new(Vec::new()),
                }),
            }
        }

        pub fn kill(&self) {
            for notice in self.inner.notices.lock().unwrap().drain(..) {
                notice.notify();
            }
        }
    }

    impl RemoteRef for FakeRunner {
        fn link_death_notice(&self, notice: DeathNotice) -> bool {
            if !self.inner.valid {
                return false;
            }
            self.inner.notices.lock().unwrap().push(notice);
            true
        }
    }

    impl RunnerRef for FakeRunner {}

    /// A fake client-info peer.
    #[derive(Debug, Clone)]
    pub struct FakeClient {
        peer: FakeRunner,
        name: String,
    }

    impl FakeClient {
        pub fn new(name: &str) -> Self {
            Self {
                peer: FakeRunner::new(),
                name: name.to_string(),
            }
        }

        pub fn invalid(name: &str) -> Self {
            Self {
                peer: FakeRunner::invalid(),
                name: name.to_string(),
            }
        }

        pub fn kill(&self) {
            self.peer.kill();
        }
    }

    impl RemoteRef for FakeClient {
        fn link_death_notice(&self, notice: DeathNotice) -> bool {
            self.peer.link_death_notice(notice)
        }
    }

    impl ClientRef for FakeClient {
        fn client_name(&self) -> String {
            self.name.clone()
        }
    }
}
