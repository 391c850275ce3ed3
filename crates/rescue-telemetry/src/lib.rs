//! Telemetry channel client for the rescue robot.
//!
//! Maintains the websocket to the telemetry source, decodes status frames into
//! [`rescue_core::StatusSnapshot`] values, and carries outbound place-item
//! commands with their acknowledgement errors.

mod actions;
mod client;
pub mod codec;
mod error;
mod simulator;

pub use actions::{validate_place_item, ErrorSlot, PendingAction};
pub use client::{TelemetryClient, TelemetryConfig, DEFAULT_SNAPSHOT_BUFFER};
pub use codec::{decode_frame, DecodeError, InboundFrame, PlayerStatus};
pub use error::{ActionError, ConnectionError};
pub use simulator::{spawn_drift, EnvironmentDrift};
