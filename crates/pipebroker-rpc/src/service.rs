//! Method routing from the wire onto the broker facades.

use crate::peer::{ClientPeer, PeerConn, RunnerPeer};
use async_trait::async_trait;
use pipebroker_core::{BrokerError, PipeQuery, PipeRegistration, Registry};
use serde::Deserialize;
use std::sync::Arc;

/// Trait for dispatching RPC method calls against the broker.
///
/// One call per inbound request; `conn` identifies the connection the
/// request arrived on, which is also the liveness edge for any capability
/// the request introduces.
#[async_trait]
pub trait BrokerDispatch: Send + Sync + 'static {
    async fn dispatch(
        &self,
        conn: &PeerConn,
        method: &str,
        params: serde_json::Value,
    ) -> std::result::Result<serde_json::Value, BrokerError>;
}

#[derive(Debug, Deserialize)]
struct RegisterPipeParams {
    name: String,
    /// Processing endpoint the runner advertises to acquiring clients.
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct AcquirePipeParams {
    name: String,
    client_name: String,
}

fn parse_params<T: serde::de::DeserializeOwned>(
    params: serde_json::Value,
) -> std::result::Result<T, BrokerError> {
    serde_json::from_value(params).map_err(|e| BrokerError::InvalidParams {
        message: e.to_string(),
    })
}

/// The broker's RPC surface: one registry behind the registration and query
/// entry points.
///
/// `delete_pipe` is deliberately absent from the routable methods; the
/// administrative removal path exists only on [`Registry`] for the hosting
/// process itself.
pub struct BrokerService {
    registration: PipeRegistration<RunnerPeer, ClientPeer>,
    query: PipeQuery<RunnerPeer, ClientPeer>,
}

impl BrokerService {
    pub fn new(registry: Arc<Registry<RunnerPeer, ClientPeer>>) -> Self {
        Self {
            registration: PipeRegistration::new(registry.clone()),
            query: PipeQuery::new(registry),
        }
    }
}

#[async_trait]
impl BrokerDispatch for BrokerService {
    async fn dispatch(
        &self,
        conn: &PeerConn,
        method: &str,
        params: serde_json::Value,
    ) -> std::result::Result<serde_json::Value, BrokerError> {
        match method {
            "register_pipe" => {
                let p: RegisterPipeParams = parse_params(params)?;
                let runner = RunnerPeer::new(conn.clone(), p.endpoint);
                self.registration.register_pipe(&p.name, runner)?;
                Ok(serde_json::json!({ "registered": true }))
            }
            "list_pipes" => {
                let pipes = self.query.list_pipes()?;
                Ok(serde_json::json!({ "pipes": pipes }))
            }
            "acquire_pipe" => {
                let p: AcquirePipeParams = parse_params(params)?;
                let client = ClientPeer::new(conn.clone(), p.client_name);
                let runner = self.query.acquire_pipe(&p.name, client)?;
                Ok(serde_json::json!({
                    "name": p.name,
                    "endpoint": runner.remote().endpoint(),
                }))
            }
            _ => Err(BrokerError::InvalidParams {
                message: format!("Unknown method: {}", method),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> (BrokerService, Arc<Registry<RunnerPeer, ClientPeer>>) {
        let registry = Arc::new(Registry::new());
        (BrokerService::new(registry.clone()), registry)
    }

    fn conn() -> PeerConn {
        PeerConn::new("127.0.0.1:9999".parse().unwrap())
    }

    #[tokio::test]
    async fn test_register_list_acquire() {
        let (service, _registry) = service();
        let runner_conn = conn();
        let client_conn = conn();

        service
            .dispatch(
                &runner_conn,
                "register_pipe",
                serde_json::json!({"name": "alpha", "endpoint": "tcp://127.0.0.1:7000"}),
            )
            .await
            .unwrap();

        let listed = service
            .dispatch(&client_conn, "list_pipes", serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(listed["pipes"], serde_json::json!(["alpha"]));

        let acquired = service
            .dispatch(
                &client_conn,
                "acquire_pipe",
                serde_json::json!({"name": "alpha", "client_name": "viewer-1"}),
            )
            .await
            .unwrap();
        assert_eq!(acquired["endpoint"], "tcp://127.0.0.1:7000");
    }

    #[tokio::test]
    async fn test_disconnect_reclaims_registration() {
        let (service, _registry) = service();
        let runner_conn = conn();

        service
            .dispatch(
                &runner_conn,
                "register_pipe",
                serde_json::json!({"name": "alpha", "endpoint": "tcp://127.0.0.1:7000"}),
            )
            .await
            .unwrap();

        runner_conn.disconnected();

        let client_conn = conn();
        let err = service
            .dispatch(
                &client_conn,
                "acquire_pipe",
                serde_json::json!({"name": "alpha", "client_name": "viewer-1"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::PipeNotFound { .. }));

        // The name is free again for a restarted runner.
        let new_runner_conn = conn();
        service
            .dispatch(
                &new_runner_conn,
                "register_pipe",
                serde_json::json!({"name": "alpha", "endpoint": "tcp://127.0.0.1:7001"}),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_busy_polling_does_not_accumulate_notices() {
        let (service, _registry) = service();
        let runner_conn = conn();
        service
            .dispatch(
                &runner_conn,
                "register_pipe",
                serde_json::json!({"name": "alpha", "endpoint": "tcp://127.0.0.1:7000"}),
            )
            .await
            .unwrap();

        let holder_conn = conn();
        service
            .dispatch(
                &holder_conn,
                "acquire_pipe",
                serde_json::json!({"name": "alpha", "client_name": "holder"}),
            )
            .await
            .unwrap();

        // A client retrying a busy pipe over one persistent connection
        // links and discards a fresh handle per attempt; the connection
        // must not retain a notice for each of them.
        let poller_conn = conn();
        for _ in 0..64 {
            let err = service
                .dispatch(
                    &poller_conn,
                    "acquire_pipe",
                    serde_json::json!({"name": "alpha", "client_name": "poller"}),
                )
                .await
                .unwrap_err();
            assert!(matches!(err, BrokerError::RunnerBusy { .. }));
        }
        assert!(poller_conn.linked_notice_count() <= 1);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let (service, _registry) = service();
        let err = service
            .dispatch(&conn(), "delete_pipe", serde_json::json!({"name": "alpha"}))
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::InvalidParams { .. }));
    }

    #[tokio::test]
    async fn test_malformed_params() {
        let (service, _registry) = service();
        let err = service
            .dispatch(&conn(), "register_pipe", serde_json::json!({"name": "alpha"}))
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::InvalidParams { .. }));
    }
}
