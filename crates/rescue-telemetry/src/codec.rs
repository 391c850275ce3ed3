//! JSON frame codec for the telemetry channel.
//!
//! Frames use the envelope `{"type": <kind>, "data": {...}}` with camelCase
//! payload fields. Decoding never panics; anything unexpected becomes a
//! [`DecodeError`] that the connection loop logs and drops.

use std::collections::BTreeMap;

use rescue_core::{Environment, Inventory, ItemKind, Position, StatusSnapshot};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::PendingAction;

pub const FRAME_KIND_PLAYER_STATUS: &str = "player_status";
pub const FRAME_KIND_ACTION_RESULT: &str = "action_result";
pub const FRAME_KIND_PING: &str = "ping";
pub const FRAME_KIND_PLACE_ITEM: &str = "place_item";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("telemetry frame is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("telemetry frame is not valid UTF-8")]
    InvalidUtf8,
    #[error("unsupported telemetry frame type '{0}'")]
    UnsupportedKind(String),
    #[error("invalid '{kind}' payload: {source}")]
    InvalidPayload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("action_result frame is missing a requestId")]
    MissingRequestId,
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPlayerStatus {
    #[serde(default)]
    player_id: Option<Value>,
    #[serde(default)]
    inventory: RawInventory,
    position: Position,
    #[serde(default)]
    distance_to_npc: Option<f64>,
    #[serde(default)]
    npc_id: Option<Value>,
    #[serde(default)]
    environment: Option<EnvironmentReading>,
}

#[derive(Debug, Default, Deserialize)]
struct RawInventory {
    #[serde(default)]
    items: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Environment block optionally carried by a status frame.
pub struct EnvironmentReading {
    pub battery: f64,
    pub temperature: f64,
    pub gas_level: f64,
    pub visibility: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawActionResult {
    #[serde(default)]
    request_id: String,
    success: bool,
    #[serde(default)]
    error: Option<RawActionFailure>,
}

#[derive(Debug, Default, Deserialize)]
struct RawActionFailure {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
/// Decoded `player_status` payload.
pub struct PlayerStatus {
    pub player_id: Option<String>,
    pub inventory: Inventory,
    pub position: Position,
    pub distance_to_contact: Option<f64>,
    pub contact_id: Option<String>,
    pub environment: Option<EnvironmentReading>,
}

impl PlayerStatus {
    /// Produces the next snapshot from `previous`. Detection follows the
    /// contact distance; environment values are only replaced when the frame
    /// carries them.
    pub fn apply_to(&self, previous: &StatusSnapshot) -> StatusSnapshot {
        let environment = match self.environment {
            Some(reading) => Environment {
                battery_percent: reading.battery,
                temperature_c: reading.temperature,
                gas_level: reading.gas_level,
                visibility: reading.visibility,
                person_detected: previous.environment.person_detected,
            },
            None => previous.environment,
        };

        let mut next = StatusSnapshot {
            inventory: self.inventory.clone(),
            position: self.position,
            distance_to_contact: self.distance_to_contact,
            contact_id: self.contact_id.clone(),
            player_id: self.player_id.clone(),
            environment,
        }
        .sanitized();
        next.environment.person_detected = next.contact_in_range();
        next
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerRejection {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Acknowledgement for a previously sent action.
pub struct ActionAck {
    pub request_id: String,
    pub outcome: Result<(), PeerRejection>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    PlayerStatus(PlayerStatus),
    ActionResult(ActionAck),
    Ping,
}

fn opaque_id(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn decode_inventory(raw: RawInventory) -> Inventory {
    let counts = raw
        .items
        .into_iter()
        .filter_map(|(name, count)| match name.parse::<ItemKind>() {
            Ok(kind) => Some((kind, count)),
            Err(_) => {
                tracing::debug!(item = name.as_str(), "ignoring unknown inventory item");
                None
            }
        });
    Inventory::from_signed(counts)
}

/// Decodes one text frame.
pub fn decode_frame(raw: &str) -> Result<InboundFrame, DecodeError> {
    let envelope = serde_json::from_str::<RawEnvelope>(raw).map_err(DecodeError::InvalidJson)?;
    match envelope.kind.trim() {
        FRAME_KIND_PLAYER_STATUS => {
            let status = serde_json::from_value::<RawPlayerStatus>(envelope.data).map_err(
                |source| DecodeError::InvalidPayload {
                    kind: FRAME_KIND_PLAYER_STATUS,
                    source,
                },
            )?;
            Ok(InboundFrame::PlayerStatus(PlayerStatus {
                player_id: opaque_id(status.player_id),
                inventory: decode_inventory(status.inventory),
                position: status.position,
                distance_to_contact: status.distance_to_npc,
                contact_id: opaque_id(status.npc_id),
                environment: status.environment,
            }))
        }
        FRAME_KIND_ACTION_RESULT => {
            let result = serde_json::from_value::<RawActionResult>(envelope.data).map_err(
                |source| DecodeError::InvalidPayload {
                    kind: FRAME_KIND_ACTION_RESULT,
                    source,
                },
            )?;
            let request_id = result.request_id.trim();
            if request_id.is_empty() {
                return Err(DecodeError::MissingRequestId);
            }
            let outcome = if result.success {
                Ok(())
            } else {
                let failure = result.error.unwrap_or_default();
                Err(PeerRejection {
                    code: failure
                        .code
                        .filter(|code| !code.trim().is_empty())
                        .unwrap_or_else(|| "rejected".to_string()),
                    message: failure
                        .message
                        .filter(|message| !message.trim().is_empty())
                        .unwrap_or_else(|| "action rejected by peer".to_string()),
                    details: failure.details.and_then(|details| match details {
                        Value::Null => None,
                        Value::String(text) => Some(text),
                        other => Some(other.to_string()),
                    }),
                })
            };
            Ok(InboundFrame::ActionResult(ActionAck {
                request_id: request_id.to_string(),
                outcome,
            }))
        }
        FRAME_KIND_PING => Ok(InboundFrame::Ping),
        other => Err(DecodeError::UnsupportedKind(other.to_string())),
    }
}

/// Decodes a websocket message; control frames yield `Ok(None)`.
pub fn decode_message(message: &WsMessage) -> Result<Option<InboundFrame>, DecodeError> {
    match message {
        WsMessage::Text(text) => decode_frame(text.as_str()).map(Some),
        WsMessage::Binary(bytes) => {
            let text = std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)?;
            decode_frame(text).map(Some)
        }
        _ => Ok(None),
    }
}

pub fn encode_place_item(action: &PendingAction) -> String {
    json!({
        "type": FRAME_KIND_PLACE_ITEM,
        "data": {
            "requestId": action.request_id,
            "itemType": action.kind.as_str(),
            "quantity": action.quantity,
        }
    })
    .to_string()
}
