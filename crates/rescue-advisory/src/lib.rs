//! Advisory trigger controller.
//!
//! Decides when the evolving robot snapshot warrants fresh tactical advice,
//! issues at most one advisory request at a time, and reveals the returned
//! text incrementally.

mod controller;
mod policy;
mod prompt;
mod reveal;
mod session;

pub use controller::{AdvisoryConfig, AdvisoryController, AdvisoryView};
pub use policy::{
    ChangeScope, TriggerDecision, TriggerPolicy, TriggerReason, BATTERY_LOW_PERCENT,
    DEFAULT_RESEND_INTERVAL_MS, GAS_DANGER_LEVEL,
};
pub use prompt::{
    build_advisory_request, resolve_advice, LINK_DEGRADED_ADVICE, NOMINAL_ADVICE,
    SYSTEM_INSTRUCTION,
};
pub use reveal::RevealCursor;
pub use session::{AdvisorySession, AdvisoryStatus};
