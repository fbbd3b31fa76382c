//! Registration and query entry points.
//!
//! Two thin facades over one shared [`Registry`], matching the trust split
//! between runner processes (who may register) and client processes (who may
//! discover and acquire). A hosting process builds one registry, wraps it in
//! both facades, and wires them to its transport.

use crate::error::{BrokerError, Result};
use crate::registry::Registry;
use crate::remote::{ClientHandle, ClientRef, RunnerHandle, RunnerRef};
use std::sync::Arc;

/// Write-side entry point, exposed to runner processes.
pub struct PipeRegistration<R: RunnerRef, C: ClientRef> {
    registry: Arc<Registry<R, C>>,
}

impl<R: RunnerRef, C: ClientRef> PipeRegistration<R, C> {
    pub fn new(registry: Arc<Registry<R, C>>) -> Self {
        Self { registry }
    }

    /// Register a runner capability under `name`.
    pub fn register_pipe(&self, name: &str, runner: R) -> Result<()> {
        if name.is_empty() {
            return Err(BrokerError::InvalidParams {
                message: "pipe name must not be empty".to_string(),
            });
        }
        self.registry.register_pipe(name, RunnerHandle::new(runner))
    }
}

/// Read/acquire-side entry point, exposed to client processes.
pub struct PipeQuery<R: RunnerRef, C: ClientRef> {
    registry: Arc<Registry<R, C>>,
}

impl<R: RunnerRef, C: ClientRef> PipeQuery<R, C> {
    pub fn new(registry: Arc<Registry<R, C>>) -> Self {
        Self { registry }
    }

    /// All currently known pipe names, live or dead.
    pub fn list_pipes(&self) -> Result<Vec<String>> {
        self.registry.list_pipes()
    }

    /// Acquire the exclusive lease on `name` for `client`.
    ///
    /// Monitoring on the client reference is armed here, before the registry
    /// is touched; an already-invalid reference fails without a lookup.
    pub fn acquire_pipe(&self, name: &str, client: C) -> Result<RunnerHandle<R>> {
        if name.is_empty() {
            return Err(BrokerError::InvalidParams {
                message: "pipe name must not be empty".to_string(),
            });
        }

        let mut handle = ClientHandle::new(client);
        if !handle.start_monitoring() {
            return Err(BrokerError::RunnerDead {
                message: "client reference is already invalid".to_string(),
            });
        }
        self.registry.acquire_pipe(name, handle)
    }
}
