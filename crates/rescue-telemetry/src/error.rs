use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
/// Transport-level failures; the connection loop recovers from all of them.
pub enum ConnectionError {
    #[error("invalid telemetry endpoint '{0}': expected a ws:// or wss:// URL")]
    InvalidEndpoint(String),
    #[error("telemetry handshake with {endpoint} failed: {source}")]
    Handshake {
        endpoint: String,
        #[source]
        source: tungstenite::Error,
    },
    #[error("telemetry stream error: {0}")]
    Stream(#[from] tungstenite::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Outbound command failure surfaced through the last-error slot.
pub enum ActionError {
    #[error("quantity must be greater than zero")]
    InvalidQuantity,
    #[error("unknown item kind '{0}'")]
    UnknownItem(String),
    #[error("telemetry channel is not connected")]
    NotConnected,
    #[error("{message}")]
    Rejected {
        request_id: String,
        code: String,
        message: String,
        details: Option<String>,
    },
    #[error("connection lost before request {request_id} was acknowledged")]
    ConnectionLost { request_id: String },
}

impl ActionError {
    /// Stable kind label; peer rejections use the peer's error code.
    pub fn kind(&self) -> &str {
        match self {
            Self::InvalidQuantity => "invalid_quantity",
            Self::UnknownItem(_) => "unknown_item",
            Self::NotConnected => "not_connected",
            Self::Rejected { code, .. } => code.as_str(),
            Self::ConnectionLost { .. } => "connection_lost",
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Rejected { details, .. } => details.as_deref(),
            _ => None,
        }
    }
}
