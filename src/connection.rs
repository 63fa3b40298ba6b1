//! WebSocket connection management
//!
//! Owns the streaming connection lifecycle: connect, answer the server's
//! authentication challenge, pump whole frames to the coordinator, and
//! reconnect with capped exponential backoff until shut down.

use crate::{
    auth::Credentials,
    data::{ConnectionState, ReconnectConfig},
    error::ConnectionError,
    parser::{FrameParser, StreamFrame},
};
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Event delivered from the connection to the coordinator
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// One decoded data frame, in arrival order
    Frame(StreamFrame),
    /// The connection was re-established after a drop. Incremental state is
    /// no longer authoritative until every tracked market is resynced.
    Reconnected,
}

/// Connection manager for the ACX streaming endpoint
pub struct ConnectionManager {
    endpoint: String,
    timeout: Duration,
    credentials: Credentials,
    parser: FrameParser,
    reconnect_strategy: ReconnectStrategy,
    state: Arc<Mutex<ConnectionState>>,
}

impl ConnectionManager {
    pub fn new(
        endpoint: String,
        timeout: Duration,
        reconnect_config: ReconnectConfig,
        credentials: Credentials,
    ) -> Self {
        Self {
            endpoint,
            timeout,
            credentials,
            parser: FrameParser::new(),
            reconnect_strategy: ReconnectStrategy::new(reconnect_config),
            state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
        }
    }

    /// Shared handle to the connection state, for observers
    pub fn state_handle(&self) -> Arc<Mutex<ConnectionState>> {
        Arc::clone(&self.state)
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.lock().unwrap()
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap() = state;
    }

    /// Establish the WebSocket connection
    async fn connect(&self) -> Result<WsStream, ConnectionError> {
        self.set_state(ConnectionState::Connecting);

        let url = Url::parse(&self.endpoint)
            .map_err(|e| ConnectionError::EstablishmentFailed(format!("Invalid URL: {}", e)))?;

        tokio::select! {
            result = connect_async(url) => {
                match result {
                    Ok((ws_stream, _)) => {
                        tracing::info!("ACX stream connected: {}", self.endpoint);
                        Ok(ws_stream)
                    }
                    Err(e) => {
                        Err(ConnectionError::EstablishmentFailed(format!("Connection failed: {}", e)))
                    }
                }
            }
            _ = sleep(self.timeout) => {
                Err(ConnectionError::Timeout("Connection timeout".to_string()))
            }
        }
    }

    /// Drive the connection until shutdown is requested.
    ///
    /// Reconnects forever on transport faults; each successful reopen after
    /// the first connect emits [`ConnectionEvent::Reconnected`] before any
    /// further frames.
    pub async fn run(
        mut self,
        frame_tx: mpsc::Sender<ConnectionEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut first_connect = true;

        loop {
            let ws_stream = tokio::select! {
                result = self.connect() => match result {
                    Ok(stream) => stream,
                    Err(e) => {
                        let delay = self.reconnect_strategy.next_delay();
                        tracing::warn!("Connect failed: {}; retrying in {:?}", e, delay);
                        self.set_state(ConnectionState::Disconnected);
                        tokio::select! {
                            _ = sleep(delay) => continue,
                            _ = shutdown.changed() => break,
                        }
                    }
                },
                _ = shutdown.changed() => break,
            };

            self.reconnect_strategy.reset();

            if !first_connect {
                tracing::info!("ACX stream reconnected, requesting full resync");
                if frame_tx.send(ConnectionEvent::Reconnected).await.is_err() {
                    break;
                }
            }
            first_connect = false;

            self.stream_frames(ws_stream, &frame_tx, &mut shutdown).await;

            if *shutdown.borrow() {
                break;
            }

            tracing::info!("ACX stream disconnected, reconnecting");
            self.set_state(ConnectionState::Disconnected);
        }

        self.set_state(ConnectionState::Disconnected);
        tracing::info!("Connection manager stopped");
    }

    /// Pump one established connection: answer the challenge, then forward
    /// data frames until the transport closes or errors
    async fn stream_frames(
        &self,
        ws_stream: WsStream,
        frame_tx: &mpsc::Sender<ConnectionEvent>,
        shutdown: &mut watch::Receiver<bool>,
    ) {
        let (mut sink, mut stream) = ws_stream.split();
        self.set_state(ConnectionState::Authenticating);

        loop {
            let message = tokio::select! {
                msg = stream.next() => msg,
                _ = shutdown.changed() => {
                    let _ = sink.send(Message::Close(None)).await;
                    return;
                }
            };

            match message {
                Some(Ok(Message::Text(text))) => {
                    match self.parser.parse_frame(&text) {
                        Ok(StreamFrame::Challenge(challenge)) => {
                            // The exchange does not ack the handshake; frames
                            // are data from the moment the answer is sent
                            let answer = self.credentials.challenge_answer(&challenge);
                            let auth = serde_json::json!({
                                "auth": {
                                    "access_key": self.credentials.access_key(),
                                    "answer": answer,
                                }
                            });
                            if let Err(e) = sink.send(Message::Text(auth.to_string())).await {
                                tracing::warn!("Failed to send auth answer: {}", e);
                                return;
                            }
                            tracing::info!("Answered authentication challenge");
                            self.set_state(ConnectionState::Streaming);
                        }
                        Ok(frame) => {
                            if frame_tx.send(ConnectionEvent::Frame(frame)).await.is_err() {
                                return;
                            }
                        }
                        Err(e) => {
                            tracing::warn!("Dropping undecodable frame: {}", e);
                        }
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    if sink.send(Message::Pong(payload)).await.is_err() {
                        return;
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!("ACX stream closed by server");
                    return;
                }
                Some(Err(e)) => {
                    tracing::warn!("WebSocket error: {}", e);
                    return;
                }
                Some(Ok(_)) => {}
            }
        }
    }
}

/// Reconnection strategy with capped exponential backoff and jitter
pub struct ReconnectStrategy {
    config: ReconnectConfig,
    current_delay: Duration,
}

impl ReconnectStrategy {
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            current_delay: config.initial_delay,
            config,
        }
    }

    /// Get the next delay and advance the backoff
    pub fn next_delay(&mut self) -> Duration {
        let base = self.current_delay;

        let next_delay_ms =
            (self.current_delay.as_millis() as f64 * self.config.backoff_multiplier) as u64;
        self.current_delay = std::cmp::min(Duration::from_millis(next_delay_ms), self.config.max_delay);

        if self.config.jitter_factor > 0.0 {
            let jitter_range = base.as_millis() as f64 * self.config.jitter_factor;
            let jitter = rand::thread_rng().gen_range(0.0..=jitter_range) as u64;
            base.saturating_sub(Duration::from_millis(jitter))
        } else {
            base
        }
    }

    /// Reset after a successful connection
    pub fn reset(&mut self) {
        self.current_delay = self.config.initial_delay;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_caps() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(400),
            backoff_multiplier: 2.0,
            jitter_factor: 0.0,
        };
        let mut strategy = ReconnectStrategy::new(config);

        assert_eq!(strategy.next_delay(), Duration::from_millis(100));
        assert_eq!(strategy.next_delay(), Duration::from_millis(200));
        assert_eq!(strategy.next_delay(), Duration::from_millis(400));
        assert_eq!(strategy.next_delay(), Duration::from_millis(400));
    }

    #[test]
    fn test_reset_returns_to_initial_delay() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 3.0,
            jitter_factor: 0.0,
        };
        let mut strategy = ReconnectStrategy::new(config);

        strategy.next_delay();
        strategy.next_delay();
        strategy.reset();

        assert_eq!(strategy.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_jitter_never_exceeds_base_delay() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter_factor: 0.5,
        };
        let mut strategy = ReconnectStrategy::new(config);

        for _ in 0..20 {
            let delay = strategy.next_delay();
            assert!(delay <= Duration::from_secs(10));
        }
    }
}
