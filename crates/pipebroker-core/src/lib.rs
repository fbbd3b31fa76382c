//! pipebroker-core - Registry and lease-reclamation engine.
//!
//! This crate is the control-plane core for a processing pipeline platform:
//! runner processes register a named capability, client processes discover
//! and acquire exclusive, liveness-checked access to it, and the registry
//! reclaims a binding automatically when either side disappears. There are
//! no explicit release calls and no timeouts; "release" is inferred purely
//! from liveness, and reclamation is lazy (a dead client's lease is dropped
//! when the next acquisition inspects the entry, not when the disconnect
//! notification fires).
//!
//! The crate performs no I/O. Remote peers are reached only through the
//! narrow capability traits in [`remote`]; a hosting process supplies the
//! transport, creates one [`Registry`], and wires the [`PipeRegistration`]
//! and [`PipeQuery`] facades to it. See the `pipebroker-rpc` crate for the
//! bundled TCP host.
//!
//! # Example
//!
//! ```rust,ignore
//! use pipebroker_core::{PipeQuery, PipeRegistration, Registry};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(Registry::new());
//! let registration = PipeRegistration::new(registry.clone());
//! let query = PipeQuery::new(registry);
//!
//! registration.register_pipe("alpha", runner_ref)?;
//! let runner = query.acquire_pipe("alpha", client_ref)?;
//! ```

pub mod config;
pub mod error;
pub mod facade;
pub mod liveness;
pub mod registry;
pub mod remote;

// Re-export commonly used types
pub use config::RpcConfig;
pub use error::{BrokerError, Result};
pub use facade::{PipeQuery, PipeRegistration};
pub use liveness::{DeathNotice, LivenessCell};
pub use registry::{PipeEntry, Registry};
pub use remote::{ClientHandle, ClientRef, RemoteRef, RunnerHandle, RunnerRef};
