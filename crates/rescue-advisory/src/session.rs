use rescue_core::StatusSnapshot;
use serde::Serialize;

use crate::{RevealCursor, LINK_DEGRADED_ADVICE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryStatus {
    #[default]
    Idle,
    Pending,
    Error,
}

impl AdvisoryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Pending => "pending",
            Self::Error => "error",
        }
    }

    /// Advisory link indicator shown next to the advice text.
    pub fn indicator(self) -> &'static str {
        match self {
            Self::Idle => "ONLINE",
            Self::Pending => "PROCESSING",
            Self::Error => "OFFLINE",
        }
    }
}

/// Working state of the trigger controller, passed by value through the
/// policy so every transition is an explicit `(session, input) -> session`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdvisorySession {
    pub last_sent_at_ms: Option<u64>,
    pub last_sent_snapshot: Option<StatusSnapshot>,
    pub status: AdvisoryStatus,
    pub advice: String,
    pub reveal: RevealCursor,
}

impl AdvisorySession {
    pub fn is_pending(&self) -> bool {
        self.status == AdvisoryStatus::Pending
    }

    /// Records the snapshot being sent and marks the request in flight.
    pub fn begin_request(self, snapshot: StatusSnapshot, now_ms: u64) -> Self {
        Self {
            last_sent_at_ms: Some(now_ms),
            last_sent_snapshot: Some(snapshot),
            status: AdvisoryStatus::Pending,
            ..self
        }
    }

    pub fn complete_success(self, advice: String) -> Self {
        self.with_advice(AdvisoryStatus::Idle, advice)
    }

    /// Terminal failure for the in-flight request; the fallback text is shown
    /// until the next successful request.
    pub fn complete_failure(self) -> Self {
        self.with_advice(AdvisoryStatus::Error, LINK_DEGRADED_ADVICE.to_string())
    }

    fn with_advice(mut self, status: AdvisoryStatus, advice: String) -> Self {
        self.reveal.restart(advice.clone());
        Self {
            status,
            advice,
            ..self
        }
    }
}
