//! Trigger policy for advisory requests.
//!
//! Evaluated on every new snapshot against the last *sent* snapshot:
//!
//! 1. no snapshot sent yet: trigger;
//! 2. critical transition (detection flipped, gas crossed up through
//!    [`GAS_DANGER_LEVEL`], battery crossed down through
//!    [`BATTERY_LOW_PERCENT`]): trigger;
//! 3. resend interval elapsed and the snapshot changed: trigger;
//! 4. otherwise hold.
//!
//! A trigger while a request is pending is suppressed, not queued.

use rescue_core::{Inventory, StatusSnapshot};

pub const GAS_DANGER_LEVEL: f64 = 0.8;
pub const BATTERY_LOW_PERCENT: f64 = 20.0;
pub const DEFAULT_RESEND_INTERVAL_MS: u64 = 15_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Which fields count as a change for the periodic resend rule.
pub enum ChangeScope {
    /// Any structural difference, including position jitter.
    Full,
    /// Ignores position and contact distance; environment values are compared
    /// at display precision.
    #[default]
    Operational,
}

impl ChangeScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Operational => "operational",
        }
    }

    pub fn differs(self, previous: &StatusSnapshot, current: &StatusSnapshot) -> bool {
        match self {
            Self::Full => previous != current,
            Self::Operational => OperationalView::of(previous) != OperationalView::of(current),
        }
    }
}

#[derive(Debug, PartialEq)]
struct OperationalView<'a> {
    inventory: &'a Inventory,
    contact_id: Option<&'a str>,
    player_id: Option<&'a str>,
    person_detected: bool,
    battery_percent: f64,
    temperature_decicelsius: f64,
    gas_percent: f64,
    visibility_percent: f64,
}

impl<'a> OperationalView<'a> {
    fn of(snapshot: &'a StatusSnapshot) -> Self {
        let environment = &snapshot.environment;
        Self {
            inventory: &snapshot.inventory,
            contact_id: snapshot.contact_id.as_deref(),
            player_id: snapshot.player_id.as_deref(),
            person_detected: environment.person_detected,
            battery_percent: environment.battery_percent.round(),
            temperature_decicelsius: (environment.temperature_c * 10.0).round(),
            gas_percent: (environment.gas_level * 100.0).round(),
            visibility_percent: (environment.visibility * 100.0).round(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    FirstObservation,
    DetectionChanged,
    GasCritical,
    BatteryLow,
    PeriodicResend,
}

impl TriggerReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FirstObservation => "first_observation",
            Self::DetectionChanged => "detection_changed",
            Self::GasCritical => "gas_critical",
            Self::BatteryLow => "battery_low",
            Self::PeriodicResend => "periodic_resend",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDecision {
    Trigger(TriggerReason),
    /// A trigger condition held but a request is already in flight.
    Suppressed(TriggerReason),
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerPolicy {
    pub resend_interval_ms: u64,
    pub scope: ChangeScope,
}

impl Default for TriggerPolicy {
    fn default() -> Self {
        Self {
            resend_interval_ms: DEFAULT_RESEND_INTERVAL_MS,
            scope: ChangeScope::default(),
        }
    }
}

impl TriggerPolicy {
    /// Returns the first matching trigger condition, ignoring pending state.
    pub fn reason(
        &self,
        last_sent: Option<&StatusSnapshot>,
        last_sent_at_ms: Option<u64>,
        current: &StatusSnapshot,
        now_ms: u64,
    ) -> Option<TriggerReason> {
        let Some(previous) = last_sent else {
            return Some(TriggerReason::FirstObservation);
        };
        let before = &previous.environment;
        let after = &current.environment;

        if before.person_detected != after.person_detected {
            return Some(TriggerReason::DetectionChanged);
        }
        if before.gas_level < GAS_DANGER_LEVEL && after.gas_level >= GAS_DANGER_LEVEL {
            return Some(TriggerReason::GasCritical);
        }
        if before.battery_percent > BATTERY_LOW_PERCENT
            && after.battery_percent <= BATTERY_LOW_PERCENT
        {
            return Some(TriggerReason::BatteryLow);
        }

        let elapsed_ms = now_ms.saturating_sub(last_sent_at_ms.unwrap_or(0));
        if elapsed_ms >= self.resend_interval_ms && self.scope.differs(previous, current) {
            return Some(TriggerReason::PeriodicResend);
        }
        None
    }

    /// `(session, snapshot) -> (decision, session)`. On `Trigger` the returned
    /// session is already marked pending with `current` recorded as sent.
    pub fn evaluate(
        &self,
        session: crate::AdvisorySession,
        current: &StatusSnapshot,
        now_ms: u64,
    ) -> (TriggerDecision, crate::AdvisorySession) {
        let reason = self.reason(
            session.last_sent_snapshot.as_ref(),
            session.last_sent_at_ms,
            current,
            now_ms,
        );
        match reason {
            None => (TriggerDecision::Hold, session),
            Some(reason) if session.is_pending() => (TriggerDecision::Suppressed(reason), session),
            Some(reason) => (
                TriggerDecision::Trigger(reason),
                session.begin_request(current.clone(), now_ms),
            ),
        }
    }
}
