mod bootstrap;
mod cli_args;
mod cli_types;
mod console;
mod hud;
mod operator_input;
mod render_peer;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rescue_advisory::AdvisoryController;
use rescue_ai::{AdvisoryClient, HttpAdvisoryClient, UnconfiguredAdvisoryClient};
use rescue_telemetry::{spawn_drift, EnvironmentDrift, TelemetryClient};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::bootstrap::init_tracing;
use crate::cli_args::Cli;
use crate::console::{Console, ConsoleOutcome};
use crate::hud::alert_line;
use crate::operator_input::{parse_operator_command, OPERATOR_USAGE};
use crate::render_peer::{RenderPeer, TracingRenderPeer};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let advisory_client = build_advisory_client(&cli);
    let telemetry = Arc::new(TelemetryClient::new(cli.telemetry_config()));
    telemetry
        .connect(&cli.telemetry_url)
        .with_context(|| format!("failed to start telemetry channel for {}", cli.telemetry_url))?;

    let drift = cli.simulate_drift.then(|| {
        spawn_drift(
            Arc::clone(&telemetry),
            EnvironmentDrift::from_clock(),
            cli.drift_interval(),
        )
    });

    let controller = AdvisoryController::new(advisory_client, cli.advisory_config());
    let advisory_view = controller.subscribe();
    let advisory = tokio::spawn(controller.run(telemetry.on_status()));

    let peer: Arc<dyn RenderPeer> = Arc::new(TracingRenderPeer);
    let mut console = Console::new(Arc::clone(&telemetry), peer, advisory_view);
    let result = run_operator_loop(&mut console, &telemetry).await;

    if let Some(drift) = drift {
        drift.abort();
    }
    advisory.abort();
    telemetry.disconnect();
    result
}

/// Missing or invalid advisory settings degrade the advisory panel instead of
/// aborting startup.
fn build_advisory_client(cli: &Cli) -> Arc<dyn AdvisoryClient> {
    match HttpAdvisoryClient::new(cli.http_advisory_config()) {
        Ok(client) => Arc::new(client),
        Err(error) => {
            tracing::debug!(error = %error, "advisory client unavailable");
            Arc::new(UnconfiguredAdvisoryClient::new(error.to_string()))
        }
    }
}

async fn run_operator_loop(console: &mut Console, telemetry: &TelemetryClient) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut errors = telemetry.subscribe_errors();
    println!("{OPERATOR_USAGE}");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read operator input")? else {
                    return Ok(());
                };
                let Some(command) = parse_operator_command(&line) else {
                    if !line.trim().is_empty() {
                        println!("{OPERATOR_USAGE}");
                    }
                    continue;
                };
                match console.handle(command) {
                    ConsoleOutcome::Continue(output) => {
                        for line in output {
                            println!("{line}");
                        }
                    }
                    ConsoleOutcome::Quit => return Ok(()),
                }
            }
            Ok(()) = errors.changed() => {
                let error = errors.borrow_and_update().clone();
                if let Some(error) = error {
                    println!("{}", alert_line(&error));
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for ctrl-c")?;
                return Ok(());
            }
        }
    }
}
