//! Per-pipe registry state.

use crate::remote::{ClientHandle, ClientRef, RunnerHandle, RunnerRef};
use tracing::debug;

/// State for one registered pipe: the runner's handle plus at most one
/// assigned client.
///
/// An entry is only ever reachable through the registry map and is mutated
/// only under the registry lock, so the availability check and the
/// assignment that follows it form one atomic unit.
#[derive(Debug)]
pub struct PipeEntry<R: RunnerRef, C: ClientRef> {
    name: String,
    runner: RunnerHandle<R>,
    client: Option<ClientHandle<C>>,
}

impl<R: RunnerRef, C: ClientRef> PipeEntry<R, C> {
    /// Create an unassigned entry. The runner handle must already be
    /// monitored.
    pub fn new(name: impl Into<String>, runner: RunnerHandle<R>) -> Self {
        Self {
            name: name.into(),
            runner,
            client: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the runner behind this entry is still connected.
    pub fn is_alive(&self) -> bool {
        self.runner.is_alive()
    }

    /// Whether the pipe can be assigned to a new client.
    ///
    /// Reclamation is lazy and observer-driven: a dead client's lease is
    /// dropped here, at the moment availability is inspected, not when the
    /// death notification fires.
    pub fn is_available(&mut self) -> bool {
        match &self.client {
            None => true,
            Some(client) if client.is_alive() => false,
            Some(client) => {
                debug!(
                    pipe = %self.name,
                    client = %client.client_name(),
                    "reclaiming lease from dead client"
                );
                self.client = None;
                true
            }
        }
    }

    /// Assign the lease unconditionally.
    ///
    /// Callers must have confirmed `is_available()` under the registry lock;
    /// no re-check happens here.
    pub fn set_client(&mut self, client: ClientHandle<C>) {
        self.client = Some(client);
    }

    /// Duplicate the runner handle for a caller.
    pub fn dup_runner_handle(&self) -> RunnerHandle<R> {
        self.runner.duplicate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::fakes::{FakeClient, FakeRunner};

    fn monitored_runner(peer: &FakeRunner) -> RunnerHandle<FakeRunner> {
        let mut handle = RunnerHandle::new(peer.clone());
        assert!(handle.start_monitoring());
        handle
    }

    fn monitored_client(peer: &FakeClient) -> ClientHandle<FakeClient> {
        let mut handle = ClientHandle::new(peer.clone());
        assert!(handle.start_monitoring());
        handle
    }

    #[test]
    fn test_unassigned_entry_available() {
        let runner = FakeRunner::new();
        let mut entry: PipeEntry<FakeRunner, FakeClient> =
            PipeEntry::new("alpha", monitored_runner(&runner));

        assert!(entry.is_alive());
        assert!(entry.is_available());
    }

    #[test]
    fn test_assigned_entry_not_available() {
        let runner = FakeRunner::new();
        let client = FakeClient::new("c1");
        let mut entry = PipeEntry::new("alpha", monitored_runner(&runner));

        entry.set_client(monitored_client(&client));
        assert!(!entry.is_available());
    }

    #[test]
    fn test_dead_client_lease_reclaimed_on_check() {
        let runner = FakeRunner::new();
        let client = FakeClient::new("c1");
        let mut entry = PipeEntry::new("alpha", monitored_runner(&runner));

        entry.set_client(monitored_client(&client));
        client.kill();

        // The first check after the death both reports availability and
        // clears the stale assignment.
        assert!(entry.is_available());
        assert!(entry.is_available());
    }

    #[test]
    fn test_runner_death_does_not_touch_lease() {
        let runner = FakeRunner::new();
        let client = FakeClient::new("c1");
        let mut entry = PipeEntry::new("alpha", monitored_runner(&runner));

        entry.set_client(monitored_client(&client));
        runner.kill();

        assert!(!entry.is_alive());
        assert!(!entry.is_available());
    }

    #[test]
    fn test_dup_runner_handle_shares_liveness() {
        let runner = FakeRunner::new();
        let entry: PipeEntry<FakeRunner, FakeClient> =
            PipeEntry::new("alpha", monitored_runner(&runner));

        let dup = entry.dup_runner_handle();
        assert!(dup.is_alive());

        runner.kill();
        assert!(!dup.is_alive());
        assert!(!entry.is_alive());
    }
}
