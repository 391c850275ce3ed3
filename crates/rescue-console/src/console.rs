use std::sync::Arc;

use rescue_advisory::AdvisoryView;
use rescue_core::ItemKind;
use rescue_telemetry::TelemetryClient;
use serde_json::json;
use tokio::sync::watch;

use crate::hud::hud_lines;
use crate::operator_input::{OperatorCommand, Tool};
use crate::render_peer::{RenderPeer, RenderTarget, RenderVerb};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConsoleOutcome {
    Continue(Vec<String>),
    Quit,
}

/// Applies operator commands to the telemetry channel and the render peer.
pub(crate) struct Console {
    telemetry: Arc<TelemetryClient>,
    peer: Arc<dyn RenderPeer>,
    advisory: watch::Receiver<AdvisoryView>,
    flashlight: bool,
    night_vision: bool,
}

impl Console {
    pub(crate) fn new(
        telemetry: Arc<TelemetryClient>,
        peer: Arc<dyn RenderPeer>,
        advisory: watch::Receiver<AdvisoryView>,
    ) -> Self {
        Self {
            telemetry,
            peer,
            advisory,
            flashlight: false,
            night_vision: false,
        }
    }

    pub(crate) fn handle(&mut self, command: OperatorCommand) -> ConsoleOutcome {
        let lines = match command {
            OperatorCommand::Move(direction) => {
                self.peer.send_command(
                    RenderTarget::Robot,
                    RenderVerb::Move,
                    json!({ "direction": direction.as_str() }),
                );
                Vec::new()
            }
            OperatorCommand::Toggle(tool) => {
                let enabled = self.toggle(tool);
                self.peer.send_command(
                    RenderTarget::Robot,
                    RenderVerb::ToggleTool,
                    json!({ "tool": tool.as_str(), "enabled": enabled }),
                );
                let state = if enabled { "ON" } else { "OFF" };
                vec![format!("{} {state}", tool.as_str().to_ascii_uppercase())]
            }
            OperatorCommand::Drop(kind) => self.drop_item(kind),
            OperatorCommand::AcknowledgeError => {
                self.telemetry.clear_error();
                Vec::new()
            }
            OperatorCommand::Status => self.status_lines(),
            OperatorCommand::Quit => return ConsoleOutcome::Quit,
        };
        ConsoleOutcome::Continue(lines)
    }

    fn toggle(&mut self, tool: Tool) -> bool {
        let state = match tool {
            Tool::Flashlight => &mut self.flashlight,
            Tool::NightVision => &mut self.night_vision,
        };
        *state = !*state;
        *state
    }

    /// The render peer always animates the drop; the telemetry peer is only
    /// asked when the link is up and the robot carries the item.
    fn drop_item(&self, kind: ItemKind) -> Vec<String> {
        self.peer.send_command(
            RenderTarget::Robot,
            RenderVerb::DropItem,
            json!({ "itemType": kind.as_str() }),
        );

        if !self.telemetry.status().is_connected() {
            tracing::debug!(kind = kind.as_str(), "drop not forwarded: link offline");
            return Vec::new();
        }
        let in_stock = self
            .telemetry
            .latest_snapshot()
            .is_some_and(|snapshot| snapshot.inventory.has_stock(kind));
        if !in_stock {
            tracing::debug!(kind = kind.as_str(), "drop not forwarded: out of stock");
            return Vec::new();
        }

        match self.telemetry.place_item(kind.as_str(), 1) {
            Ok(request_id) => {
                tracing::info!(request_id = request_id.as_str(), kind = kind.as_str(), "drop sent");
            }
            Err(error) => {
                tracing::warn!(error = %error, kind = kind.as_str(), "drop rejected");
            }
        }
        Vec::new()
    }

    pub(crate) fn status_lines(&self) -> Vec<String> {
        let snapshot = self.telemetry.latest_snapshot();
        let error = self.telemetry.last_error();
        hud_lines(
            self.telemetry.status(),
            &self.advisory.borrow(),
            snapshot.as_ref(),
            error.as_ref(),
        )
    }
}
