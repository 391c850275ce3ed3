use rescue_ai::{AdvisoryError, AdvisoryReply, AdvisoryRequest, Message};
use rescue_core::StatusSnapshot;

pub const SYSTEM_INSTRUCTION: &str = concat!(
    "You are the tactical dispatcher for a search-and-rescue robot. ",
    "Read the telemetry JSON and reply with exactly one calm, actionable directive ",
    "under 20 words. ",
    "Prioritise survivor contact, then hazardous gas, then low battery. ",
    "If nothing needs attention, reply exactly: System status nominal."
);

pub const NOMINAL_ADVICE: &str = "System status nominal.";

/// Shown when an advisory request terminally fails.
pub const LINK_DEGRADED_ADVICE: &str = "Link degraded. Comms interference. Hold position.";

/// System instruction followed by the snapshot serialized as JSON.
pub fn build_advisory_request(snapshot: &StatusSnapshot) -> Result<AdvisoryRequest, AdvisoryError> {
    let telemetry = serde_json::to_string(snapshot)?;
    Ok(AdvisoryRequest {
        messages: vec![Message::system(SYSTEM_INSTRUCTION), Message::user(telemetry)],
    })
}

/// Advice text for a successful reply. A body with no usable text reads as
/// nominal.
pub fn resolve_advice(reply: &AdvisoryReply) -> String {
    reply
        .advice_text()
        .unwrap_or_else(|| NOMINAL_ADVICE.to_string())
}
