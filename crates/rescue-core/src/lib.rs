//! Foundational types shared across the rescue console crates.
//!
//! Holds the robot status model and its clamping invariants, the connection
//! state machine labels, and the backoff and correlation-id helpers used by
//! the telemetry and advisory layers.

pub mod backoff;
pub mod connection;
pub mod ids;
pub mod snapshot;

pub use backoff::{next_backoff_ms, next_backoff_ms_with_jitter, BackoffPolicy};
pub use connection::ConnectionState;
pub use ids::{current_unix_timestamp_ms, new_correlation_id};
pub use snapshot::{
    Environment, Inventory, ItemKind, ItemKindParseError, Position, StatusSnapshot,
    DETECTION_RANGE_M,
};
