use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Wall-clock milliseconds since the Unix epoch; 0 if the clock is before it.
pub fn current_unix_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}

/// Builds a process-unique id of the form `<prefix>-<unix_ms>-<counter>`.
pub fn new_correlation_id(prefix: &str) -> String {
    let millis = current_unix_timestamp_ms();
    let count = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{millis}-{count}")
}
