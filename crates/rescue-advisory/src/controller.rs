use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::{Stream, StreamExt};
use rescue_ai::{AdvisoryClient, AdvisoryError, AdvisoryReply, AdvisoryRequest};
use rescue_core::StatusSnapshot;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};

use crate::{
    build_advisory_request, resolve_advice, AdvisorySession, AdvisoryStatus, ChangeScope,
    TriggerDecision, TriggerPolicy, TriggerReason, DEFAULT_RESEND_INTERVAL_MS,
};

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_REVEAL_TICK_MS: u64 = 50;

type InFlight = BoxFuture<'static, Result<AdvisoryReply, AdvisoryError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvisoryConfig {
    pub resend_interval_ms: u64,
    pub scope: ChangeScope,
    /// Upper bound for one advisory call, retries included.
    pub request_timeout: Duration,
    pub reveal_tick: Duration,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            resend_interval_ms: DEFAULT_RESEND_INTERVAL_MS,
            scope: ChangeScope::default(),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            reveal_tick: Duration::from_millis(DEFAULT_REVEAL_TICK_MS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// What the presentation layer renders for the advisory panel.
pub struct AdvisoryView {
    pub status: AdvisoryStatus,
    pub advice: String,
    pub revealed: String,
    pub indicator: &'static str,
    pub last_reason: Option<TriggerReason>,
}

impl Default for AdvisoryView {
    fn default() -> Self {
        Self {
            status: AdvisoryStatus::Idle,
            advice: String::new(),
            revealed: String::new(),
            indicator: AdvisoryStatus::Idle.indicator(),
            last_reason: None,
        }
    }
}

/// Drives [`TriggerPolicy`] over a snapshot stream with a single request slot.
pub struct AdvisoryController {
    client: Arc<dyn AdvisoryClient>,
    policy: TriggerPolicy,
    config: AdvisoryConfig,
    session: AdvisorySession,
    view_tx: watch::Sender<AdvisoryView>,
    started: Instant,
    last_reason: Option<TriggerReason>,
    configuration_reported: bool,
    requests_issued: u64,
}

impl AdvisoryController {
    pub fn new(client: Arc<dyn AdvisoryClient>, config: AdvisoryConfig) -> Self {
        let (view_tx, _) = watch::channel(AdvisoryView::default());
        Self {
            client,
            policy: TriggerPolicy {
                resend_interval_ms: config.resend_interval_ms,
                scope: config.scope,
            },
            config,
            session: AdvisorySession::default(),
            view_tx,
            started: Instant::now(),
            last_reason: None,
            configuration_reported: false,
            requests_issued: 0,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AdvisoryView> {
        self.view_tx.subscribe()
    }

    pub fn session(&self) -> &AdvisorySession {
        &self.session
    }

    pub fn requests_issued(&self) -> u64 {
        self.requests_issued
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Runs the policy for one snapshot. Returns the request to send when the
    /// snapshot triggers and the request slot was free.
    pub fn observe(&mut self, snapshot: &StatusSnapshot, now_ms: u64) -> Option<AdvisoryRequest> {
        let session = std::mem::take(&mut self.session);
        let (decision, session) = self.policy.evaluate(session, snapshot, now_ms);
        self.session = session;

        match decision {
            TriggerDecision::Hold => None,
            TriggerDecision::Suppressed(reason) => {
                tracing::debug!(
                    reason = reason.as_str(),
                    "advisory trigger suppressed while a request is pending"
                );
                None
            }
            TriggerDecision::Trigger(reason) => {
                tracing::debug!(reason = reason.as_str(), now_ms, "advisory request triggered");
                self.last_reason = Some(reason);
                match build_advisory_request(snapshot) {
                    Ok(request) => {
                        self.publish();
                        Some(request)
                    }
                    Err(error) => {
                        self.complete(Err(error));
                        None
                    }
                }
            }
        }
    }

    /// Applies the outcome of the in-flight request.
    pub fn complete(&mut self, result: Result<AdvisoryReply, AdvisoryError>) {
        let session = std::mem::take(&mut self.session);
        self.session = match result {
            Ok(reply) => session.complete_success(resolve_advice(&reply)),
            Err(error) => {
                self.report_failure(&error);
                session.complete_failure()
            }
        };
        self.publish();
    }

    fn report_failure(&mut self, error: &AdvisoryError) {
        if error.is_configuration() {
            if !self.configuration_reported {
                self.configuration_reported = true;
                tracing::warn!(error = %error, "advisory service unavailable");
            } else {
                tracing::debug!(error = %error, "advisory service still unavailable");
            }
            return;
        }
        tracing::warn!(error = %error, "advisory request failed");
    }

    /// Advances the reveal by one character. Returns false once fully shown.
    pub fn tick_reveal(&mut self) -> bool {
        let advanced = self.session.reveal.tick();
        if advanced {
            self.publish();
        }
        advanced
    }

    pub fn view(&self) -> AdvisoryView {
        AdvisoryView {
            status: self.session.status,
            advice: self.session.advice.clone(),
            revealed: self.session.reveal.visible().to_string(),
            indicator: self.session.status.indicator(),
            last_reason: self.last_reason,
        }
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.view());
    }

    fn dispatch(&mut self, request: AdvisoryRequest) -> InFlight {
        self.requests_issued += 1;
        let client = Arc::clone(&self.client);
        let timeout = self.config.request_timeout;
        Box::pin(async move {
            match tokio::time::timeout(timeout, client.request_advice(request)).await {
                Ok(result) => result,
                Err(_) => Err(AdvisoryError::Timeout {
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                }),
            }
        })
    }

    /// Consumes snapshots until the stream ends, then settles any in-flight
    /// request and returns the final session.
    pub async fn run<S>(mut self, snapshots: S) -> AdvisorySession
    where
        S: Stream<Item = StatusSnapshot>,
    {
        let mut snapshots = std::pin::pin!(snapshots);
        let mut in_flight: Option<InFlight> = None;
        let mut stream_open = true;
        let mut reveal = tokio::time::interval(self.config.reveal_tick);
        reveal.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while stream_open || in_flight.is_some() {
            let revealing = !self.session.reveal.is_complete();
            tokio::select! {
                next = snapshots.next(), if stream_open => match next {
                    Some(snapshot) => {
                        let now_ms = self.now_ms();
                        if let Some(request) = self.observe(&snapshot, now_ms) {
                            in_flight = Some(self.dispatch(request));
                        }
                    }
                    None => {
                        tracing::debug!("snapshot stream closed");
                        stream_open = false;
                    }
                },
                Some(result) = async {
                    match in_flight.as_mut() {
                        Some(request) => Some(request.await),
                        None => None,
                    }
                }, if in_flight.is_some() => {
                    in_flight = None;
                    self.complete(result);
                    reveal.reset();
                },
                _ = reveal.tick(), if revealing => {
                    self.tick_reveal();
                }
            }
        }

        self.session
    }
}
