#![no_main]

use libfuzzer_sys::fuzz_target;
use rescue_core::StatusSnapshot;
use rescue_telemetry::{decode_frame, InboundFrame};

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);

    match decode_frame(&raw) {
        Ok(InboundFrame::PlayerStatus(status)) => {
            let snapshot = status.apply_to(&StatusSnapshot::default());
            let environment = snapshot.environment;
            assert!((0.0..=100.0).contains(&environment.battery_percent));
            assert!((0.0..=1.0).contains(&environment.gas_level));
            assert!((0.0..=1.0).contains(&environment.visibility));
            assert!(environment.temperature_c.is_finite());
            assert_eq!(environment.person_detected, snapshot.contact_in_range());
            if let Some(distance) = snapshot.distance_to_contact {
                assert!(distance.is_finite() && distance >= 0.0);
            }
        }
        Ok(InboundFrame::ActionResult(ack)) => {
            assert!(!ack.request_id.trim().is_empty());
        }
        Ok(InboundFrame::Ping) => {}
        Err(error) => {
            assert!(!error.to_string().trim().is_empty());
        }
    }
});
