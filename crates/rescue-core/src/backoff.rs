use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub const DEFAULT_BASE_BACKOFF_MS: u64 = 500;
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 10_000;
const MAX_BACKOFF_SHIFT: usize = 16;

static JITTER_STATE: AtomicU64 = AtomicU64::new(0x2545_F491_4F6C_DD1D);

/// Deterministic exponential backoff: `base * 2^attempt`, saturating.
pub fn next_backoff_ms(base_ms: u64, attempt: usize) -> u64 {
    let shift = attempt.min(MAX_BACKOFF_SHIFT);
    base_ms.saturating_mul(1_u64 << shift)
}

/// Same as [`next_backoff_ms`] with bounded jitter in [50%, 100%] of the delay.
///
/// Draws come from one process-wide SplitMix64 stream.
pub fn next_backoff_ms_with_jitter(base_ms: u64, attempt: usize, jitter_enabled: bool) -> u64 {
    let ceiling = next_backoff_ms(base_ms, attempt);
    if !jitter_enabled || ceiling < 2 {
        return ceiling;
    }
    let floor = ceiling / 2;
    let spread = ceiling - floor + 1;
    floor + splitmix_draw() % spread
}

fn splitmix_draw() -> u64 {
    let mut z = JITTER_STATE
        .fetch_add(0x9E37_79B9_7F4A_7C15, Ordering::Relaxed)
        .wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Reconnect/retry delay schedule with a hard ceiling.
pub struct BackoffPolicy {
    pub base_ms: u64,
    pub max_ms: u64,
    pub jitter: bool,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_ms: DEFAULT_BASE_BACKOFF_MS,
            max_ms: DEFAULT_MAX_BACKOFF_MS,
            jitter: true,
        }
    }
}

impl BackoffPolicy {
    pub fn delay_ms(&self, attempt: usize) -> u64 {
        let ceiling = self.max_ms.max(1);
        next_backoff_ms_with_jitter(self.base_ms.max(1), attempt, self.jitter).min(ceiling)
    }

    pub fn delay(&self, attempt: usize) -> Duration {
        Duration::from_millis(self.delay_ms(attempt))
    }
}
