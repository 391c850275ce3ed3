use std::sync::Arc;
use std::time::Duration;

use futures_util::SinkExt;
use httpmock::prelude::*;
use rescue_advisory::{
    AdvisoryConfig, AdvisoryController, AdvisoryStatus, AdvisoryView, TriggerReason,
};
use rescue_ai::{AdvisoryRoute, HttpAdvisoryClient, HttpAdvisoryConfig};
use rescue_core::{BackoffPolicy, ConnectionState, Environment};
use rescue_telemetry::{TelemetryClient, TelemetryConfig};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message as WsMessage, WebSocketStream};

const WAIT: Duration = Duration::from_secs(5);

async fn start_telemetry_peer() -> (String, mpsc::UnboundedReceiver<WebSocketStream<TcpStream>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let address = listener.local_addr().expect("local addr");
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            if let Ok(socket) = accept_async(tcp).await {
                if tx.send(socket).is_err() {
                    return;
                }
            }
        }
    });
    (format!("ws://{address}"), rx)
}

fn status_frame(distance: f64, battery: f64) -> WsMessage {
    WsMessage::Text(
        json!({
            "type": "player_status",
            "data": {
                "playerId": "robot-1",
                "inventory": {"items": {"water": 5, "food": 2}},
                "position": {"x": 0.0, "y": 0.0, "z": 0.0},
                "distanceToNpc": distance,
                "npcId": "npc-1",
                "environment": {
                    "battery": battery,
                    "temperature": 24.0,
                    "gasLevel": 0.3,
                    "visibility": 0.9
                }
            }
        })
        .to_string()
        .into(),
    )
}

async fn wait_for_view<F>(views: &mut watch::Receiver<AdvisoryView>, predicate: F) -> AdvisoryView
where
    F: Fn(&AdvisoryView) -> bool,
{
    timeout(WAIT, async {
        loop {
            {
                let view = views.borrow_and_update();
                if predicate(&view) {
                    return view.clone();
                }
            }
            views.changed().await.expect("controller alive");
        }
    })
    .await
    .expect("advisory view should reach the expected state")
}

async fn wait_for_connected(client: &TelemetryClient) {
    let mut states = client.subscribe_connection();
    timeout(WAIT, async {
        while *states.borrow_and_update() != ConnectionState::Connected {
            states.changed().await.expect("connection sender alive");
        }
    })
    .await
    .expect("telemetry should connect");
}

#[tokio::test]
async fn integration_telemetry_snapshots_drive_rate_limited_advisory_requests() {
    let advisory_server = MockServer::start();
    let advisory_mock = advisory_server.mock(|when, then| {
        when.method(POST)
            .path("/api/chat")
            .header_exists("x-rescue-request-id");
        then.status(200).json_body(json!({
            "choices": [{"message": {"content": "Approach the survivor slowly."}}]
        }));
    });

    let (url, mut sockets) = start_telemetry_peer().await;
    let telemetry = Arc::new(TelemetryClient::new(TelemetryConfig {
        backoff: BackoffPolicy {
            base_ms: 20,
            max_ms: 100,
            jitter: false,
        },
        ..TelemetryConfig::default()
    }));
    let snapshots = telemetry.on_status();
    telemetry.connect(&url).expect("connect");
    let mut peer = timeout(WAIT, sockets.recv()).await.expect("accept").expect("socket");
    wait_for_connected(&telemetry).await;

    let advisory_client = HttpAdvisoryClient::new(HttpAdvisoryConfig {
        endpoint: advisory_server.url("/api/chat"),
        route: AdvisoryRoute::Proxy,
        api_key: None,
        model: "deepseek-chat".to_string(),
        temperature: None,
        max_tokens: None,
        request_timeout_ms: 2_000,
        max_retries: 0,
        retry_jitter: false,
        retry_budget_ms: 0,
    })
    .expect("advisory client");
    let controller = AdvisoryController::new(
        Arc::new(advisory_client),
        AdvisoryConfig {
            request_timeout: Duration::from_secs(3),
            reveal_tick: Duration::from_millis(2),
            ..AdvisoryConfig::default()
        },
    );
    let mut views = controller.subscribe();
    let advisory_task = tokio::spawn(controller.run(snapshots));

    peer.send(status_frame(40.0, 80.0)).await.expect("send status");
    let view = wait_for_view(&mut views, |view| {
        view.revealed == "Approach the survivor slowly."
    })
    .await;
    assert_eq!(view.status, AdvisoryStatus::Idle);
    assert_eq!(view.indicator, "ONLINE");
    assert_eq!(view.last_reason, Some(TriggerReason::FirstObservation));
    advisory_mock.assert_calls(1);

    peer.send(status_frame(40.0, 79.9)).await.expect("send status");
    peer.send(status_frame(8.0, 79.9)).await.expect("send status");
    wait_for_view(&mut views, |view| {
        view.last_reason == Some(TriggerReason::DetectionChanged)
            && view.status == AdvisoryStatus::Idle
    })
    .await;
    advisory_mock.assert_calls(2);

    let latest = telemetry.latest_snapshot().expect("latest snapshot");
    assert!(latest.environment.person_detected);
    telemetry.publish_environment(Environment {
        gas_level: 0.85,
        ..latest.environment
    });
    wait_for_view(&mut views, |view| {
        view.last_reason == Some(TriggerReason::GasCritical) && view.status == AdvisoryStatus::Idle
    })
    .await;
    advisory_mock.assert_calls(3);

    advisory_task.abort();
    telemetry.disconnect();
    assert_eq!(telemetry.status(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn integration_unreachable_advisory_degrades_but_telemetry_keeps_flowing() {
    let (url, mut sockets) = start_telemetry_peer().await;
    let telemetry = Arc::new(TelemetryClient::new(TelemetryConfig::default()));
    let snapshots = telemetry.on_status();
    telemetry.connect(&url).expect("connect");
    let mut peer = timeout(WAIT, sockets.recv()).await.expect("accept").expect("socket");
    wait_for_connected(&telemetry).await;

    let advisory_server = MockServer::start();
    let advisory_mock = advisory_server.mock(|when, then| {
        when.method(POST).path("/api/chat");
        then.status(503).body("upstream unavailable");
    });
    let advisory_client = HttpAdvisoryClient::new(HttpAdvisoryConfig {
        endpoint: advisory_server.url("/api/chat"),
        route: AdvisoryRoute::Proxy,
        api_key: None,
        model: "deepseek-chat".to_string(),
        temperature: None,
        max_tokens: None,
        request_timeout_ms: 2_000,
        max_retries: 0,
        retry_jitter: false,
        retry_budget_ms: 0,
    })
    .expect("advisory client");
    let controller = AdvisoryController::new(Arc::new(advisory_client), AdvisoryConfig::default());
    let mut views = controller.subscribe();
    let advisory_task = tokio::spawn(controller.run(snapshots));

    peer.send(status_frame(40.0, 80.0)).await.expect("send status");
    let view = wait_for_view(&mut views, |view| view.status == AdvisoryStatus::Error).await;
    assert_eq!(view.indicator, "OFFLINE");
    assert_eq!(view.advice, rescue_advisory::LINK_DEGRADED_ADVICE);
    advisory_mock.assert_calls(1);

    peer.send(status_frame(40.0, 50.0)).await.expect("send status");
    timeout(WAIT, async {
        loop {
            if telemetry
                .latest_snapshot()
                .is_some_and(|snapshot| snapshot.environment.battery_percent == 50.0)
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("telemetry keeps flowing while advisory is degraded");
    assert_eq!(telemetry.status(), ConnectionState::Connected);

    advisory_task.abort();
}
