//! End-to-end tests for the wired runtime
//!
//! Real HTTP dispatcher against a wiremock server, real file-backed queue in
//! a temp directory, replayed positions.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tempfile::tempdir;
use waypoint_domain::TrackingState;
use waypoint_infra::{Connectivity, InfraError, ReplayPositionSource, WaypointRuntime};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;

use support::{
    accept_location_updates, app_config, eventually, northbound_track, received,
    wait_for_requests,
};

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn tracking_delivers_replayed_track() {
    let server = MockServer::start().await;
    accept_location_updates(&server).await;
    let dir = tempdir().unwrap();
    let config = app_config(&server, dir.path());

    let source = ReplayPositionSource::new(northbound_track(3), Duration::from_millis(20))
        .looping(true);
    let runtime = WaypointRuntime::build(&config, Arc::new(source)).await.unwrap();
    let handle = runtime.handle();

    assert!(handle.start().await);
    assert_eq!(handle.state(), TrackingState::Active);
    assert!(wait_for_requests(&server, 3, WAIT).await);

    // Dispatches run concurrently, so arrival order is not asserted here
    let requests = server.received_requests().await.unwrap();
    let bodies: Vec<Value> = requests.iter().map(|r| r.body_json().unwrap()).collect();
    assert!(bodies.contains(&json!({ "lat": 40.0, "lng": -73.5 })));
    assert!(bodies.iter().all(|body| body["lng"] == json!(-73.5)));
    assert!(handle.current_location().is_some());

    runtime.shutdown().await;
    assert!(!handle.is_tracking());
}

#[tokio::test]
async fn offline_update_survives_restart_and_drains() {
    let server = MockServer::start().await;
    accept_location_updates(&server).await;
    let dir = tempdir().unwrap();
    let config = app_config(&server, dir.path());
    let queue_file = dir.path().join("waypoint.offline_queue.json");

    let source = ReplayPositionSource::new(northbound_track(2), Duration::from_millis(20));
    let runtime = WaypointRuntime::build(&config, Arc::new(source)).await.unwrap();
    let Connectivity::Signal(signal) = runtime.connectivity().clone() else {
        panic!("expected a signal monitor without a probe url");
    };

    assert!(signal.set_connected(false));
    let queue = Arc::clone(runtime.queue());
    assert!(eventually(WAIT, || !queue.is_online()).await);

    assert!(!runtime.handle().force_update().await);
    assert_eq!(runtime.queue().len(), 1);
    assert!(queue_file.exists());
    assert_eq!(received(&server).await, 0);
    runtime.shutdown().await;

    let source = ReplayPositionSource::new(northbound_track(2), Duration::from_millis(20));
    let restarted = WaypointRuntime::build(&config, Arc::new(source)).await.unwrap();

    assert!(wait_for_requests(&server, 1, WAIT).await);
    let queue = Arc::clone(restarted.queue());
    assert!(eventually(WAIT, || queue.is_empty()).await);
    assert!(eventually(WAIT, || !queue_file.exists()).await);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: Value = requests[0].body_json().unwrap();
    assert_eq!(body, json!({ "lat": 40.0, "lng": -73.5 }));

    restarted.shutdown().await;
}

#[tokio::test]
async fn reconnect_drains_updates_queued_while_offline() {
    let server = MockServer::start().await;
    accept_location_updates(&server).await;
    let dir = tempdir().unwrap();
    let config = app_config(&server, dir.path());

    let source = ReplayPositionSource::new(northbound_track(3), Duration::from_millis(20));
    let runtime = WaypointRuntime::build(&config, Arc::new(source)).await.unwrap();
    let Connectivity::Signal(signal) = runtime.connectivity().clone() else {
        panic!("expected a signal monitor without a probe url");
    };
    let queue = Arc::clone(runtime.queue());
    let handle = runtime.handle();

    signal.set_connected(false);
    assert!(eventually(WAIT, || !queue.is_online()).await);
    assert!(!handle.force_update().await);
    assert!(!handle.force_update().await);
    assert_eq!(queue.len(), 2);

    signal.set_connected(true);
    assert!(wait_for_requests(&server, 2, WAIT).await);
    assert!(eventually(WAIT, || queue.is_empty()).await);

    let requests = server.received_requests().await.unwrap();
    let latitudes: Vec<f64> = requests
        .iter()
        .map(|request| request.body_json::<Value>().unwrap()["lat"].as_f64().unwrap())
        .collect();
    assert_eq!(latitudes, vec![40.0, 40.001]);

    runtime.shutdown().await;
}

#[tokio::test]
async fn probe_monitor_reports_reachable_backend() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let dir = tempdir().unwrap();
    let mut config = app_config(&server, dir.path());
    config.connectivity.probe_url = Some(format!("{}/health", server.uri()));
    config.connectivity.probe_interval_secs = 1;

    let source = ReplayPositionSource::new(northbound_track(1), Duration::from_millis(20));
    let runtime = WaypointRuntime::build(&config, Arc::new(source)).await.unwrap();

    let Connectivity::Probe(probe) = runtime.connectivity().clone() else {
        panic!("expected a probe monitor");
    };
    assert!(probe.is_running());
    assert!(runtime.queue().is_online());

    runtime.shutdown().await;
    assert!(!probe.is_running());
}

#[tokio::test]
async fn unreachable_probe_starts_offline() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let mut config = app_config(&server, dir.path());
    config.connectivity.probe_url = Some("http://127.0.0.1:9/health".into());
    config.connectivity.probe_interval_secs = 1;

    let source = ReplayPositionSource::new(northbound_track(1), Duration::from_millis(20));
    let runtime = WaypointRuntime::build(&config, Arc::new(source)).await.unwrap();

    assert!(!runtime.queue().is_online());
    assert!(!runtime.handle().force_update().await);
    assert_eq!(runtime.queue().len(), 1);
    assert_eq!(received(&server).await, 0);

    runtime.shutdown().await;
}

#[tokio::test]
async fn empty_storage_dir_keeps_queue_in_memory() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let mut config = app_config(&server, dir.path());
    config.queue.storage_dir = String::new();

    let source = ReplayPositionSource::new(northbound_track(1), Duration::from_millis(20));
    let runtime = WaypointRuntime::build(&config, Arc::new(source)).await.unwrap();
    let Connectivity::Signal(signal) = runtime.connectivity().clone() else {
        panic!("expected a signal monitor without a probe url");
    };
    let queue = Arc::clone(runtime.queue());

    signal.set_connected(false);
    assert!(eventually(WAIT, || !queue.is_online()).await);
    assert!(!runtime.handle().force_update().await);
    assert_eq!(queue.len(), 1);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

    runtime.shutdown().await;
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let server = MockServer::start().await;
    let dir = tempdir().unwrap();
    let mut config = app_config(&server, dir.path());
    config.queue.max_retries = 0;

    let source = ReplayPositionSource::new(northbound_track(1), Duration::from_millis(20));
    let result = WaypointRuntime::build(&config, Arc::new(source)).await;

    assert!(matches!(result, Err(InfraError::Config(_))));
}
