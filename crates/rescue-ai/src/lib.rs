//! Advisory service client for the rescue console.
//!
//! Models the chat-style advisory endpoint as a request/response contract:
//! callers build an [`AdvisoryRequest`], an [`AdvisoryClient`] posts it, and
//! [`extract_advice`] pulls the advice text out of whichever accepted response
//! shape came back.
mod extract;
mod http;
mod retry;
mod types;

pub use extract::{extract_advice, AdviceExtractor, ADVICE_EXTRACTORS};
pub use http::{AdvisoryRoute, HttpAdvisoryClient, HttpAdvisoryConfig};
pub use retry::{parse_retry_after_ms, should_retry_status, RetrySchedule, BASE_BACKOFF_MS};
pub use types::{
    AdvisoryClient, AdvisoryError, AdvisoryReply, AdvisoryRequest, Message, MessageRole,
    UnconfiguredAdvisoryClient,
};
