//! pipebroker-rpc - TCP JSON-RPC host for the pipebroker registry.
//!
//! Owns one [`Registry`](pipebroker_core::Registry) and exposes the
//! registration and query entry points over length-prefixed JSON-RPC 2.0 on
//! localhost TCP. The connection is the liveness edge: a runner's
//! registration and a client's lease live exactly as long as the TCP
//! connection that created them.
//!
//! Wire methods: `register_pipe {name, endpoint}`, `list_pipes`,
//! `acquire_pipe {name, client_name}`. Administrative removal is not
//! routable from the wire.

pub mod peer;
pub mod protocol;
pub mod server;
pub mod service;

pub use peer::{ClientPeer, PeerConn, RunnerPeer};
pub use protocol::{read_frame, write_frame, RpcRequest, RpcResponse};
pub use server::{BrokerServer, BrokerServerHandle};
pub use service::{BrokerDispatch, BrokerService};
