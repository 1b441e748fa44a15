use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;
use waypoint_core::{PositionSource, SampleStream};
use waypoint_domain::constants::EARTH_RADIUS_METERS;
use waypoint_domain::{Accuracy, Coordinate, LocationError, PermissionStatus, WatchOptions};

/// Scriptable position source.
///
/// Permissions default to granted, one-shot reads return `fallback` unless a
/// scripted result is queued, and every watch subscription is kept so that
/// tests can push samples through it.
pub struct MockPositionSource {
    foreground: Mutex<Result<PermissionStatus, LocationError>>,
    background: Mutex<Result<PermissionStatus, LocationError>>,
    positions: Mutex<VecDeque<Result<Coordinate, LocationError>>>,
    fallback: Mutex<Coordinate>,
    watch_error: Mutex<Option<LocationError>>,
    subscriptions: Mutex<Vec<mpsc::Sender<Coordinate>>>,
    watch_requests: Mutex<Vec<WatchOptions>>,
    background_requests: Mutex<usize>,
}

impl Default for MockPositionSource {
    fn default() -> Self {
        Self {
            foreground: Mutex::new(Ok(PermissionStatus::Granted)),
            background: Mutex::new(Ok(PermissionStatus::Granted)),
            positions: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Coordinate::new(52.52, 13.405)),
            watch_error: Mutex::new(None),
            subscriptions: Mutex::new(Vec::new()),
            watch_requests: Mutex::new(Vec::new()),
            background_requests: Mutex::new(0),
        }
    }
}

impl MockPositionSource {
    pub fn set_foreground(&self, result: Result<PermissionStatus, LocationError>) {
        *self.foreground.lock().unwrap() = result;
    }

    pub fn set_background(&self, result: Result<PermissionStatus, LocationError>) {
        *self.background.lock().unwrap() = result;
    }

    pub fn push_position(&self, result: Result<Coordinate, LocationError>) {
        self.positions.lock().unwrap().push_back(result);
    }

    pub fn set_fallback(&self, coordinate: Coordinate) {
        *self.fallback.lock().unwrap() = coordinate;
    }

    pub fn fail_watch(&self, err: LocationError) {
        *self.watch_error.lock().unwrap() = Some(err);
    }

    pub fn background_requests(&self) -> usize {
        *self.background_requests.lock().unwrap()
    }

    pub fn watch_requests(&self) -> Vec<WatchOptions> {
        self.watch_requests.lock().unwrap().clone()
    }

    /// Push a sample through the most recent subscription.
    pub async fn emit(&self, coordinate: Coordinate) -> bool {
        let sender = self.subscriptions.lock().unwrap().last().cloned();
        match sender {
            Some(sender) => sender.send(coordinate).await.is_ok(),
            None => false,
        }
    }

    /// Whether the most recent subscription's receiver has been dropped.
    pub fn latest_closed(&self) -> bool {
        self.subscriptions.lock().unwrap().last().map_or(true, |sender| sender.is_closed())
    }

    /// End every subscription from the source side.
    pub fn close_all(&self) {
        self.subscriptions.lock().unwrap().clear();
    }
}

#[async_trait]
impl PositionSource for MockPositionSource {
    async fn request_foreground_permission(&self) -> Result<PermissionStatus, LocationError> {
        self.foreground.lock().unwrap().clone()
    }

    async fn request_background_permission(&self) -> Result<PermissionStatus, LocationError> {
        *self.background_requests.lock().unwrap() += 1;
        self.background.lock().unwrap().clone()
    }

    async fn current_position(&self, _accuracy: Accuracy) -> Result<Coordinate, LocationError> {
        if let Some(result) = self.positions.lock().unwrap().pop_front() {
            return result;
        }
        Ok(self.fallback.lock().unwrap().clone())
    }

    async fn watch_position(&self, options: WatchOptions) -> Result<SampleStream, LocationError> {
        if let Some(err) = self.watch_error.lock().unwrap().take() {
            return Err(err);
        }

        self.watch_requests.lock().unwrap().push(options);
        let (tx, rx) = mpsc::channel(16);
        self.subscriptions.lock().unwrap().push(tx);
        Ok(rx)
    }
}

/// A coordinate `meters` due north of `origin`.
pub fn north_of(origin: &Coordinate, meters: f64) -> Coordinate {
    Coordinate::new(origin.latitude + (meters / EARTH_RADIUS_METERS).to_degrees(), origin.longitude)
}
