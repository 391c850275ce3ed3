use std::time::Duration;

use clap::{ArgAction, Parser};
use rescue_advisory::AdvisoryConfig;
use rescue_ai::HttpAdvisoryConfig;
use rescue_core::BackoffPolicy;
use rescue_telemetry::TelemetryConfig;

use crate::cli_types::{CliAdvisoryRoute, CliChangeScope};

/// Slack on top of per-attempt timeouts for retry backoff between attempts.
const ADVISORY_RETRY_ALLOWANCE_MS: u64 = 2_000;

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u32(value: &str) -> Result<u32, String> {
    let parsed = value
        .parse::<u32>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_temperature(value: &str) -> Result<f32, String> {
    let parsed = value
        .parse::<f32>()
        .map_err(|error| format!("failed to parse float: {error}"))?;
    if !parsed.is_finite() || !(0.0..=2.0).contains(&parsed) {
        return Err("value must be a finite number in range 0.0..=2.0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "rescue-console",
    about = "Operator console for a teleoperated search-and-rescue robot",
    version
)]
pub(crate) struct Cli {
    #[arg(
        long = "telemetry-url",
        env = "RESCUE_TELEMETRY_URL",
        default_value = "ws://localhost:50001",
        help = "WebSocket endpoint of the robot telemetry channel"
    )]
    pub(crate) telemetry_url: String,

    #[arg(
        long = "advisory-url",
        env = "RESCUE_ADVISORY_URL",
        default_value = "http://localhost:3001/api/chat",
        help = "HTTP endpoint that answers advisory chat requests"
    )]
    pub(crate) advisory_url: String,

    #[arg(
        long = "advisory-route",
        env = "RESCUE_ADVISORY_ROUTE",
        value_enum,
        default_value = "proxy",
        help = "Send bare messages to a proxy, or call a chat-completions provider directly"
    )]
    pub(crate) advisory_route: CliAdvisoryRoute,

    #[arg(
        long = "advisory-api-key",
        env = "RESCUE_ADVISORY_API_KEY",
        hide_env_values = true,
        help = "Bearer key for the advisory endpoint (required for the provider route)"
    )]
    pub(crate) advisory_api_key: Option<String>,

    #[arg(
        long = "advisory-model",
        env = "RESCUE_ADVISORY_MODEL",
        default_value = "deepseek-chat"
    )]
    pub(crate) advisory_model: String,

    #[arg(
        long = "advisory-temperature",
        env = "RESCUE_ADVISORY_TEMPERATURE",
        default_value_t = 0.7,
        value_parser = parse_temperature
    )]
    pub(crate) advisory_temperature: f32,

    #[arg(
        long = "advisory-max-tokens",
        env = "RESCUE_ADVISORY_MAX_TOKENS",
        default_value_t = 100,
        value_parser = parse_positive_u32
    )]
    pub(crate) advisory_max_tokens: u32,

    #[arg(
        long = "advisory-timeout-ms",
        env = "RESCUE_ADVISORY_TIMEOUT_MS",
        default_value_t = 15_000,
        value_parser = parse_positive_u64,
        help = "Per-attempt HTTP timeout for advisory requests"
    )]
    pub(crate) advisory_timeout_ms: u64,

    #[arg(
        long = "advisory-max-retries",
        env = "RESCUE_ADVISORY_MAX_RETRIES",
        default_value_t = 1,
        help = "Retries for retryable advisory failures (429, 5xx, transient transport errors)"
    )]
    pub(crate) advisory_max_retries: usize,

    #[arg(
        long = "advisory-resend-interval-ms",
        env = "RESCUE_ADVISORY_RESEND_INTERVAL_MS",
        default_value_t = 15_000,
        value_parser = parse_positive_u64,
        help = "Minimum spacing of non-critical advisory resends"
    )]
    pub(crate) advisory_resend_interval_ms: u64,

    #[arg(
        long = "advisory-change-scope",
        env = "RESCUE_ADVISORY_CHANGE_SCOPE",
        value_enum,
        default_value = "operational",
        help = "Fields compared when deciding whether a snapshot changed"
    )]
    pub(crate) advisory_change_scope: CliChangeScope,

    #[arg(
        long = "reveal-tick-ms",
        env = "RESCUE_REVEAL_TICK_MS",
        default_value_t = 50,
        value_parser = parse_positive_u64
    )]
    pub(crate) reveal_tick_ms: u64,

    #[arg(
        long = "reconnect-base-ms",
        env = "RESCUE_RECONNECT_BASE_MS",
        default_value_t = 500,
        value_parser = parse_positive_u64
    )]
    pub(crate) reconnect_base_ms: u64,

    #[arg(
        long = "reconnect-max-ms",
        env = "RESCUE_RECONNECT_MAX_MS",
        default_value_t = 10_000,
        value_parser = parse_positive_u64
    )]
    pub(crate) reconnect_max_ms: u64,

    #[arg(
        long = "simulate-drift",
        env = "RESCUE_SIMULATE_DRIFT",
        default_value_t = true,
        action = ArgAction::Set,
        help = "Drift environment readings locally between telemetry frames"
    )]
    pub(crate) simulate_drift: bool,

    #[arg(
        long = "drift-interval-ms",
        env = "RESCUE_DRIFT_INTERVAL_MS",
        default_value_t = 1_000,
        value_parser = parse_positive_u64
    )]
    pub(crate) drift_interval_ms: u64,

    #[arg(
        long = "log-level",
        env = "RUST_LOG",
        help = "tracing filter directives, e.g. `info` or `rescue_telemetry=debug`"
    )]
    pub(crate) log_level: Option<String>,
}

impl Cli {
    pub(crate) fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            backoff: BackoffPolicy {
                base_ms: self.reconnect_base_ms,
                max_ms: self.reconnect_max_ms.max(self.reconnect_base_ms),
                jitter: true,
            },
            ..TelemetryConfig::default()
        }
    }

    pub(crate) fn http_advisory_config(&self) -> HttpAdvisoryConfig {
        let retry_budget_ms = u64::try_from(self.advisory_call_budget().as_millis())
            .unwrap_or(u64::MAX);
        HttpAdvisoryConfig {
            endpoint: self.advisory_url.clone(),
            route: self.advisory_route.into(),
            api_key: self.advisory_api_key.clone(),
            model: self.advisory_model.clone(),
            temperature: Some(self.advisory_temperature),
            max_tokens: Some(self.advisory_max_tokens),
            request_timeout_ms: self.advisory_timeout_ms,
            max_retries: self.advisory_max_retries,
            retry_jitter: true,
            retry_budget_ms,
        }
    }

    /// Wall time one advisory call may take across all attempts. The HTTP
    /// client stops retrying inside it and the controller times out at it.
    fn advisory_call_budget(&self) -> Duration {
        let attempts = u64::try_from(self.advisory_max_retries)
            .unwrap_or(u64::MAX)
            .saturating_add(1);
        let budget_ms = self
            .advisory_timeout_ms
            .saturating_mul(attempts)
            .saturating_add(ADVISORY_RETRY_ALLOWANCE_MS);
        Duration::from_millis(budget_ms)
    }

    pub(crate) fn advisory_config(&self) -> AdvisoryConfig {
        AdvisoryConfig {
            resend_interval_ms: self.advisory_resend_interval_ms,
            scope: self.advisory_change_scope.into(),
            request_timeout: self.advisory_call_budget(),
            reveal_tick: Duration::from_millis(self.reveal_tick_ms),
        }
    }

    pub(crate) fn drift_interval(&self) -> Duration {
        Duration::from_millis(self.drift_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use clap::Parser;
    use rescue_advisory::ChangeScope;
    use rescue_ai::AdvisoryRoute;

    use super::Cli;

    #[test]
    fn defaults_match_documented_values() {
        let cli = Cli::try_parse_from(["rescue-console"]).expect("parse");
        assert_eq!(cli.telemetry_url, "ws://localhost:50001");
        assert_eq!(cli.advisory_url, "http://localhost:3001/api/chat");
        assert!(cli.simulate_drift);

        let http = cli.http_advisory_config();
        assert_eq!(http.route, AdvisoryRoute::Proxy);
        assert_eq!(http.model, "deepseek-chat");
        assert_eq!(http.max_tokens, Some(100));
        assert_eq!(http.max_retries, 1);
        assert_eq!(http.retry_budget_ms, 32_000);

        let advisory = cli.advisory_config();
        assert_eq!(advisory.resend_interval_ms, 15_000);
        assert_eq!(advisory.scope, ChangeScope::Operational);
        assert_eq!(advisory.reveal_tick, Duration::from_millis(50));
        assert_eq!(advisory.request_timeout, Duration::from_millis(32_000));

        let telemetry = cli.telemetry_config();
        assert_eq!(telemetry.backoff.base_ms, 500);
        assert_eq!(telemetry.backoff.max_ms, 10_000);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "rescue-console",
            "--advisory-route",
            "provider",
            "--advisory-api-key",
            "sk-test",
            "--advisory-change-scope",
            "full",
            "--simulate-drift",
            "false",
            "--reconnect-base-ms",
            "250",
        ])
        .expect("parse");
        assert_eq!(cli.http_advisory_config().route, AdvisoryRoute::Provider);
        assert_eq!(cli.advisory_api_key.as_deref(), Some("sk-test"));
        assert_eq!(cli.advisory_config().scope, ChangeScope::Full);
        assert!(!cli.simulate_drift);
        assert_eq!(cli.telemetry_config().backoff.base_ms, 250);
    }

    #[test]
    fn zero_intervals_are_rejected() {
        for flag in ["--reveal-tick-ms", "--advisory-timeout-ms", "--drift-interval-ms"] {
            let error = Cli::try_parse_from(["rescue-console", flag, "0"]).expect_err(flag);
            assert!(error.to_string().contains("greater than 0"), "{flag}");
        }
    }
}
