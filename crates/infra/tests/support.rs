#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use waypoint_domain::{AppConfig, Coordinate};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Config pointing at `server` with the queue persisted under `storage_dir`.
pub fn app_config(server: &MockServer, storage_dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.api.base_url = server.uri();
    config.api.timeout_secs = 2;
    config.queue.storage_dir = storage_dir.display().to_string();
    config.tracking.min_interval_ms = 0;
    config.tracking.min_distance_meters = 10.0;
    config
}

/// Accept every location update with `204 No Content`.
pub async fn accept_location_updates(server: &MockServer) {
    Mock::given(method("PATCH"))
        .and(path("/riders/my/location"))
        .respond_with(ResponseTemplate::new(204))
        .mount(server)
        .await;
}

/// Fixes heading north, roughly 110 m apart.
pub fn northbound_track(count: usize) -> Vec<Coordinate> {
    (0..count).map(|i| Coordinate::new(40.0 + i as f64 * 0.001, -73.5)).collect()
}

pub async fn received(server: &MockServer) -> usize {
    server.received_requests().await.map_or(0, |requests| requests.len())
}

/// Poll `condition` every 10 ms until it holds or `timeout` expires.
pub async fn eventually<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Async variant of [`eventually`] for waiting on the mock server.
pub async fn wait_for_requests(server: &MockServer, expected: usize, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if received(server).await >= expected {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    received(server).await >= expected
}
