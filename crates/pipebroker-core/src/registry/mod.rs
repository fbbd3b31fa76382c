//! In-memory pipe registry with liveness-driven lease reclamation.
//!
//! The registry maps human-readable pipe names to [`PipeEntry`] state. One
//! coarse mutex guards the map for every operation in its entirety, which
//! turns the check-then-act sequence inside acquire (`is_available` then
//! `set_client`) into an atomic unit. Death notices fire on transport tasks
//! and only touch their own liveness cell, never this lock.
//!
//! Registries are explicitly constructed and explicitly owned; a hosting
//! process creates one instance and hands it to the registration and query
//! facades. Multiple independent instances are valid and fully isolated.

mod entry;

pub use entry::PipeEntry;

use crate::error::{BrokerError, Result};
use crate::remote::{ClientHandle, ClientRef, RunnerHandle, RunnerRef};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// The name → entry map behind the registration and query entry points.
pub struct Registry<R: RunnerRef, C: ClientRef> {
    entries: Mutex<HashMap<String, PipeEntry<R, C>>>,
}

impl<R: RunnerRef, C: ClientRef> Registry<R, C> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock_entries(&self) -> Result<MutexGuard<'_, HashMap<String, PipeEntry<R, C>>>> {
        self.entries.lock().map_err(|_| BrokerError::Internal {
            message: "Failed to acquire registry lock".to_string(),
        })
    }

    /// Register a runner under `name`.
    ///
    /// A dead runner's registration is replaced in place, which is how a
    /// restarted runner re-registers under its old name after a crash. A
    /// live registration is never overwritten; that collision is
    /// `DuplicatePipe` even if the caller is the same logical runner on a
    /// new connection.
    pub fn register_pipe(&self, name: &str, mut handle: RunnerHandle<R>) -> Result<()> {
        let mut entries = self.lock_entries()?;

        if let Some(entry) = entries.get(name) {
            if entry.is_alive() {
                return Err(BrokerError::DuplicatePipe {
                    name: name.to_string(),
                });
            }
            debug!(pipe = %name, "replacing registration left by a dead runner");
        }

        if !handle.start_monitoring() {
            return Err(BrokerError::RunnerDead {
                message: format!("runner reference for '{}' is already invalid", name),
            });
        }

        entries.insert(name.to_string(), PipeEntry::new(name, handle));
        info!(pipe = %name, "registered pipe");
        Ok(())
    }

    /// Snapshot of all currently known pipe names, live or dead.
    ///
    /// Staleness of individual entries is resolved on acquire, never here.
    pub fn list_pipes(&self) -> Result<Vec<String>> {
        let entries = self.lock_entries()?;
        Ok(entries.keys().cloned().collect())
    }

    /// Assign the lease for `name` to `client` and return a duplicated
    /// runner handle.
    ///
    /// The caller must already have started monitoring on `client`. A stale
    /// entry (dead runner) discovered here is erased as a side effect of the
    /// failed lookup, so a subsequent `register_pipe` for the same name
    /// succeeds without administrative intervention.
    pub fn acquire_pipe(&self, name: &str, client: ClientHandle<C>) -> Result<RunnerHandle<R>> {
        let mut entries = self.lock_entries()?;

        let Some(entry) = entries.get_mut(name) else {
            return Err(BrokerError::PipeNotFound {
                name: name.to_string(),
            });
        };

        if !entry.is_alive() {
            warn!(pipe = %name, "dropping stale registration for dead runner");
            entries.remove(name);
            return Err(BrokerError::PipeNotFound {
                name: name.to_string(),
            });
        }

        if !entry.is_available() {
            return Err(BrokerError::RunnerBusy {
                name: name.to_string(),
            });
        }

        let runner = entry.dup_runner_handle();
        debug!(pipe = %name, client = %client.client_name(), "assigned pipe lease");
        entry.set_client(client);
        Ok(runner)
    }

    /// Administrative removal. Not reachable over the remote boundary.
    pub fn delete_pipe(&self, name: &str) -> Result<()> {
        let mut entries = self.lock_entries()?;
        if entries.remove(name).is_none() {
            return Err(BrokerError::PipeNotFound {
                name: name.to_string(),
            });
        }
        info!(pipe = %name, "deleted pipe");
        Ok(())
    }
}

impl<R: RunnerRef, C: ClientRef> Default for Registry<R, C> {
    fn default() -> Self {
        Self::new()
    }
}
