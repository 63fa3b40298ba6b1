//! Main client interface for the ACX SDK

use crate::{
    auth::Credentials,
    connection::ConnectionManager,
    data::{BookView, ClientConfig, ConnectionState, ReconnectConfig},
    error::SdkError,
    replication::ReplicationCoordinator,
    rest_client::AcxRestClient,
    snapshot::SnapshotSource,
};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Main client for the ACX exchange.
///
/// Wraps the signed REST surface and hands out replication handles for live
/// order-book tracking.
pub struct AcxClient {
    config: ClientConfig,
    credentials: Credentials,
    rest: Arc<AcxRestClient>,
}

impl AcxClient {
    /// Create a client from credentials and configuration
    pub fn new(credentials: Credentials, config: ClientConfig) -> Result<Self, SdkError> {
        config.validate().map_err(SdkError::Configuration)?;

        let rest = Arc::new(AcxRestClient::new(
            credentials.clone(),
            &config.rest_endpoint,
        ));

        Ok(Self {
            config,
            credentials,
            rest,
        })
    }

    pub fn builder() -> AcxClientBuilder {
        AcxClientBuilder::new()
    }

    /// The REST client, for request/response calls outside the replication
    /// core
    pub fn rest(&self) -> &AcxRestClient {
        &self.rest
    }

    /// Start replicating the order books of a fixed set of markets.
    ///
    /// Performs the initial snapshot load for every market (failures fail
    /// this call), then connects to the stream and keeps the replicas
    /// current until the returned handle is shut down. `on_books_changed`
    /// fires once per frame batch with the aggregated views of every changed
    /// market; `on_trade` receives trade payloads untouched.
    pub async fn track<B, T>(
        &self,
        markets: &[&str],
        depth_limit: usize,
        on_books_changed: B,
        on_trade: T,
    ) -> Result<ReplicationHandle, SdkError>
    where
        B: Fn(Vec<BookView>) + Send + Sync + 'static,
        T: Fn(serde_json::Value) + Send + Sync + 'static,
    {
        let markets: Vec<String> = markets.iter().map(|m| m.to_string()).collect();

        let coordinator = ReplicationCoordinator::track(
            &markets,
            depth_limit,
            Arc::clone(&self.rest) as Arc<dyn SnapshotSource>,
            Arc::new(on_books_changed),
            Arc::new(on_trade),
        )
        .await?;

        let connection = ConnectionManager::new(
            self.config.ws_endpoint.clone(),
            self.config.timeout,
            self.config.reconnect_config.clone(),
            self.credentials.clone(),
        );
        let state = connection.state_handle();

        let (frame_tx, frame_rx) = mpsc::channel(1024);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let connection_task = tokio::spawn(connection.run(frame_tx, shutdown_rx));
        let coordinator_task = tokio::spawn(coordinator.run(frame_rx));

        Ok(ReplicationHandle {
            shutdown: shutdown_tx,
            connection_task,
            coordinator_task,
            state,
        })
    }
}

impl std::fmt::Debug for AcxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcxClient")
            .field("config", &self.config)
            .field("credentials", &self.credentials)
            .finish()
    }
}

/// Handle to one running replication engine.
///
/// Dropping the handle signals both tasks to stop without waiting for them;
/// call [`shutdown`] to stop the reconnect loop and wait until the transport
/// is released.
///
/// [`shutdown`]: ReplicationHandle::shutdown
pub struct ReplicationHandle {
    shutdown: watch::Sender<bool>,
    connection_task: JoinHandle<()>,
    coordinator_task: JoinHandle<()>,
    state: Arc<Mutex<ConnectionState>>,
}

impl ReplicationHandle {
    /// Current state of the streaming connection
    pub fn connection_state(&self) -> ConnectionState {
        *self.state.lock().unwrap()
    }

    /// Stop reconnect attempts, close the transport, and wait for both the
    /// connection and coordinator tasks to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.connection_task.await;
        // The connection task owned the frame sender; its exit closes the
        // coordinator's channel
        let _ = self.coordinator_task.await;
        tracing::info!("Replication engine shut down");
    }
}

/// Builder for [`AcxClient`]
pub struct AcxClientBuilder {
    credentials: Option<Credentials>,
    config: ClientConfig,
}

impl AcxClientBuilder {
    pub fn new() -> Self {
        Self {
            credentials: None,
            config: ClientConfig::default(),
        }
    }

    pub fn credentials(mut self, access_key: &str, secret_key: &str) -> Result<Self, SdkError> {
        self.credentials = Some(Credentials::new(access_key, secret_key)?);
        Ok(self)
    }

    pub fn rest_endpoint(mut self, endpoint: &str) -> Self {
        self.config.rest_endpoint = endpoint.to_string();
        self
    }

    pub fn ws_endpoint(mut self, endpoint: &str) -> Self {
        self.config.ws_endpoint = endpoint.to_string();
        self
    }

    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn reconnect_config(mut self, reconnect_config: ReconnectConfig) -> Self {
        self.config.reconnect_config = reconnect_config;
        self
    }

    pub fn build(self) -> Result<AcxClient, SdkError> {
        let credentials = match self.credentials {
            Some(credentials) => credentials,
            None => Credentials::from_env()?,
        };
        AcxClient::new(credentials, self.config)
    }
}

impl Default for AcxClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
