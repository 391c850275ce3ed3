//! State channel client: one long-lived websocket to the telemetry source.
//!
//! The connection loop runs as a spawned task and owns the socket. Everything
//! observers need (connection state, latest snapshot, snapshot stream, action
//! error slot) lives in [`Shared`] so it stays readable while the loop
//! reconnects.

use std::sync::{Arc, Mutex, PoisonError};

use futures_util::{SinkExt, Stream, StreamExt};
use rescue_core::{BackoffPolicy, ConnectionState, Environment, StatusSnapshot};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

use crate::actions::{validate_place_item, ErrorSlot, PendingAction, PendingActions};
use crate::codec::{decode_message, encode_place_item, ActionAck, InboundFrame};
use crate::{ActionError, ConnectionError};

pub const DEFAULT_SNAPSHOT_BUFFER: usize = 256;

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub backoff: BackoffPolicy,
    pub snapshot_buffer: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffPolicy::default(),
            snapshot_buffer: DEFAULT_SNAPSHOT_BUFFER,
        }
    }
}

struct Shared {
    connection_tx: watch::Sender<ConnectionState>,
    snapshot_tx: broadcast::Sender<StatusSnapshot>,
    latest: Mutex<Option<StatusSnapshot>>,
    errors: ErrorSlot,
    pending: PendingActions,
}

impl Shared {
    fn set_connection(&self, state: ConnectionState) {
        self.connection_tx.send_replace(state);
    }

    /// Computes and publishes the next snapshot under one lock so the stream
    /// order always matches the order of `latest` replacements.
    fn update_snapshot<F>(&self, next: F)
    where
        F: FnOnce(&StatusSnapshot) -> StatusSnapshot,
    {
        let Ok(mut latest) = self.latest.lock() else {
            return;
        };
        let base = latest.clone().unwrap_or_default();
        let snapshot = next(&base);
        *latest = Some(snapshot.clone());
        let _ = self.snapshot_tx.send(snapshot);
    }

    fn handle_frame(&self, frame: InboundFrame) {
        match frame {
            InboundFrame::PlayerStatus(status) => {
                self.update_snapshot(|previous| status.apply_to(previous));
            }
            InboundFrame::ActionResult(ack) => self.handle_ack(ack),
            InboundFrame::Ping => {}
        }
    }

    fn handle_ack(&self, ack: ActionAck) {
        let resolved = self.pending.resolve(&ack.request_id);
        if resolved.is_none() {
            tracing::debug!(
                request_id = ack.request_id.as_str(),
                "acknowledgement for unknown place-item request"
            );
        }
        match ack.outcome {
            Ok(()) => {
                tracing::debug!(request_id = ack.request_id.as_str(), "place-item acknowledged");
            }
            Err(rejection) => self.errors.report(ActionError::Rejected {
                request_id: ack.request_id,
                code: rejection.code,
                message: rejection.message,
                details: rejection.details,
            }),
        }
    }

    fn fail_pending(&self, outbound_rx: &mut mpsc::UnboundedReceiver<PendingAction>) {
        while let Ok(action) = outbound_rx.try_recv() {
            self.pending.resolve(&action.request_id);
            self.errors.report(ActionError::ConnectionLost {
                request_id: action.request_id,
            });
        }
        self.fail_outstanding();
    }

    /// Resolves every unacknowledged action as lost.
    fn fail_outstanding(&self) {
        for action in self.pending.drain() {
            self.errors.report(ActionError::ConnectionLost {
                request_id: action.request_id,
            });
        }
    }
}

struct Worker {
    endpoint: String,
    outbound_tx: mpsc::UnboundedSender<PendingAction>,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Worker {
    fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        self.handle.abort();
    }
}

/// Client handle for the telemetry channel.
pub struct TelemetryClient {
    shared: Arc<Shared>,
    config: TelemetryConfig,
    worker: Mutex<Option<Worker>>,
}

impl TelemetryClient {
    pub fn new(config: TelemetryConfig) -> Self {
        let (snapshot_tx, _) = broadcast::channel(config.snapshot_buffer.max(1));
        Self {
            shared: Arc::new(Shared {
                connection_tx: watch::Sender::new(ConnectionState::Disconnected),
                snapshot_tx,
                latest: Mutex::new(None),
                errors: ErrorSlot::default(),
                pending: PendingActions::default(),
            }),
            config,
            worker: Mutex::new(None),
        }
    }

    /// Starts (or keeps) the connection loop for `endpoint`.
    ///
    /// Calling again with the same endpoint while the loop is alive is a
    /// no-op; a different endpoint replaces the running loop. Must be called
    /// from within a tokio runtime.
    pub fn connect(&self, endpoint: &str) -> Result<(), ConnectionError> {
        let endpoint = endpoint.trim();
        if !(endpoint.starts_with("ws://") || endpoint.starts_with("wss://")) {
            return Err(ConnectionError::InvalidEndpoint(endpoint.to_string()));
        }

        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = worker.as_ref() {
            if existing.endpoint == endpoint && !existing.handle.is_finished() {
                return Ok(());
            }
        }
        if let Some(existing) = worker.take() {
            existing.stop();
            self.shared.fail_outstanding();
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_connection_loop(
            Arc::clone(&self.shared),
            endpoint.to_string(),
            self.config.backoff,
            outbound_rx,
            shutdown_rx,
        ));
        *worker = Some(Worker {
            endpoint: endpoint.to_string(),
            outbound_tx,
            shutdown_tx,
            handle,
        });
        Ok(())
    }

    /// Stops the connection loop and reports `Disconnected`.
    pub fn disconnect(&self) {
        let existing = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(existing) = existing {
            existing.stop();
        }
        self.shared.fail_outstanding();
        self.shared.set_connection(ConnectionState::Disconnected);
    }

    pub fn status(&self) -> ConnectionState {
        *self.shared.connection_tx.borrow()
    }

    pub fn subscribe_connection(&self) -> watch::Receiver<ConnectionState> {
        self.shared.connection_tx.subscribe()
    }

    pub fn latest_snapshot(&self) -> Option<StatusSnapshot> {
        self.shared.latest.lock().ok().and_then(|latest| latest.clone())
    }

    /// Fresh subscription to every snapshot published from now on.
    ///
    /// The stream only ends when the client is dropped. A consumer that falls
    /// more than the buffer size behind skips the missed snapshots.
    pub fn on_status(&self) -> impl Stream<Item = StatusSnapshot> + Send + 'static {
        let receiver = self.shared.snapshot_tx.subscribe();
        futures_util::stream::unfold(receiver, |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(snapshot) => return Some((snapshot, receiver)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "snapshot subscriber lagged; skipping");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
    }

    /// Replaces the environment block of the current snapshot.
    pub fn publish_environment(&self, environment: Environment) {
        self.shared
            .update_snapshot(|previous| previous.with_environment(environment));
    }

    /// Applies `step` to the current environment and publishes the result.
    pub fn update_environment<F>(&self, step: F)
    where
        F: FnOnce(Environment) -> Environment,
    {
        self.shared
            .update_snapshot(|previous| previous.with_environment(step(previous.environment)));
    }

    /// Sends a place-item command and returns its correlation id.
    ///
    /// Local validation failures never reach the peer. Every failure, local
    /// or reported later by the peer, lands in the last-error slot.
    pub fn place_item(&self, kind: &str, quantity: u32) -> Result<String, ActionError> {
        let result = self.send_place_item(kind, quantity);
        if let Err(error) = &result {
            self.shared.errors.report(error.clone());
        }
        result
    }

    fn send_place_item(&self, kind: &str, quantity: u32) -> Result<String, ActionError> {
        let kind = validate_place_item(kind, quantity)?;
        if !self.status().is_connected() {
            return Err(ActionError::NotConnected);
        }
        let worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        let worker = worker.as_ref().ok_or(ActionError::NotConnected)?;

        let action = PendingAction::new(kind, quantity);
        let request_id = action.request_id.clone();
        self.shared.pending.insert(action.clone());
        if worker.outbound_tx.send(action).is_err() {
            self.shared.pending.resolve(&request_id);
            return Err(ActionError::NotConnected);
        }
        tracing::debug!(
            request_id = request_id.as_str(),
            kind = kind.as_str(),
            quantity,
            "place-item sent"
        );
        Ok(request_id)
    }

    pub fn last_error(&self) -> Option<ActionError> {
        self.shared.errors.current()
    }

    pub fn subscribe_errors(&self) -> watch::Receiver<Option<ActionError>> {
        self.shared.errors.subscribe()
    }

    pub fn clear_error(&self) {
        self.shared.errors.clear();
    }

    pub fn pending_actions(&self) -> usize {
        self.shared.pending.len()
    }
}

impl Drop for TelemetryClient {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.get_mut().ok().and_then(Option::take) {
            worker.stop();
        }
    }
}

enum SessionEnd {
    Shutdown,
    PeerClosed,
}

async fn run_connection_loop(
    shared: Arc<Shared>,
    endpoint: String,
    backoff: BackoffPolicy,
    mut outbound_rx: mpsc::UnboundedReceiver<PendingAction>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut attempt = 0_usize;
    loop {
        shared.set_connection(if attempt == 0 {
            ConnectionState::Connecting
        } else {
            ConnectionState::Reconnecting
        });

        let connected = tokio::select! {
            _ = shutdown_rx.changed() => break,
            result = connect_async(endpoint.as_str()) => result,
        };

        match connected {
            Ok((stream, _response)) => {
                attempt = 0;
                shared.set_connection(ConnectionState::Connected);
                tracing::info!(endpoint = endpoint.as_str(), "telemetry channel connected");

                let session =
                    run_session(&shared, stream, &mut outbound_rx, &mut shutdown_rx).await;
                shared.fail_pending(&mut outbound_rx);
                match session {
                    Ok(SessionEnd::Shutdown) => break,
                    Ok(SessionEnd::PeerClosed) => {
                        tracing::info!(endpoint = endpoint.as_str(), "telemetry peer closed");
                    }
                    Err(error) => {
                        tracing::warn!(error = %error, "telemetry session failed");
                    }
                }
            }
            Err(source) => {
                let error = ConnectionError::Handshake {
                    endpoint: endpoint.clone(),
                    source,
                };
                tracing::warn!(attempt, error = %error, "telemetry connect failed");
            }
        }

        shared.set_connection(ConnectionState::Reconnecting);
        let delay = backoff.delay(attempt);
        attempt = attempt.saturating_add(1);
        tracing::info!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            "telemetry reconnect scheduled"
        );
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    shared.fail_pending(&mut outbound_rx);
    shared.set_connection(ConnectionState::Disconnected);
}

async fn run_session<S>(
    shared: &Shared,
    stream: S,
    outbound_rx: &mut mpsc::UnboundedReceiver<PendingAction>,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<SessionEnd, ConnectionError>
where
    S: Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>>
        + futures_util::Sink<WsMessage, Error = tokio_tungstenite::tungstenite::Error>
        + Unpin,
{
    let (mut sink, mut source) = stream.split();
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                let _ = sink.send(WsMessage::Close(None)).await;
                return Ok(SessionEnd::Shutdown);
            }
            outbound = outbound_rx.recv() => {
                let Some(action) = outbound else {
                    return Ok(SessionEnd::Shutdown);
                };
                let frame = encode_place_item(&action);
                sink.send(WsMessage::Text(frame.into())).await?;
            }
            inbound = source.next() => {
                let Some(message) = inbound else {
                    return Ok(SessionEnd::PeerClosed);
                };
                let message = message?;
                if message.is_close() {
                    return Ok(SessionEnd::PeerClosed);
                }
                match decode_message(&message) {
                    Ok(Some(frame)) => shared.handle_frame(frame),
                    Ok(None) => {}
                    Err(error) => {
                        tracing::warn!(error = %error, "dropping malformed telemetry frame");
                    }
                }
            }
        }
    }
}
