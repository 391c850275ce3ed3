use rescue_advisory::AdvisoryView;
use rescue_core::{ConnectionState, ItemKind, StatusSnapshot};
use rescue_telemetry::ActionError;

pub(crate) fn alert_line(error: &ActionError) -> String {
    match error.details() {
        Some(details) => format!("ALERT [{}] {} ({details})", error.kind(), error.message()),
        None => format!("ALERT [{}] {}", error.kind(), error.message()),
    }
}

/// Instrument panel rendered as plain text lines.
pub(crate) fn hud_lines(
    connection: ConnectionState,
    advisory: &AdvisoryView,
    snapshot: Option<&StatusSnapshot>,
    error: Option<&ActionError>,
) -> Vec<String> {
    let mut lines = vec![
        format!("LINK {} ({connection})", connection.indicator()),
        format!("AI [{}] {}", advisory.indicator, advisory.revealed),
    ];

    match snapshot {
        Some(snapshot) => {
            let environment = &snapshot.environment;
            lines.push(format!(
                "BATTERY {:.0}% | TEMP {:.1}C | GAS {:.0}% | VIS {:.0}%",
                environment.battery_percent,
                environment.temperature_c,
                environment.gas_level * 100.0,
                environment.visibility * 100.0,
            ));
            let stock = ItemKind::ALL
                .iter()
                .map(|kind| {
                    format!(
                        "{} {}",
                        kind.as_str().to_ascii_uppercase(),
                        snapshot.inventory.quantity(*kind)
                    )
                })
                .collect::<Vec<_>>()
                .join(" | ");
            lines.push(stock);
            lines.push(contact_line(snapshot));
        }
        None => lines.push("NO TELEMETRY".to_string()),
    }

    if let Some(error) = error {
        lines.push(alert_line(error));
    }
    lines
}

fn contact_line(snapshot: &StatusSnapshot) -> String {
    let state = if snapshot.environment.person_detected {
        "DETECTED"
    } else {
        "NONE"
    };
    match snapshot.distance_to_contact {
        Some(distance) => format!("CONTACT {state} {distance:.1}m"),
        None => format!("CONTACT {state}"),
    }
}
