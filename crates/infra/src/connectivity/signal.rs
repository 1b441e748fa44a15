use tokio::sync::watch;
use tracing::debug;
use waypoint_core::ConnectivityMonitor;

/// Connectivity monitor fed by the host platform.
///
/// The embedding application calls [`SignalConnectivityMonitor::set_connected`]
/// from its own network-change callback.
#[derive(Debug)]
pub struct SignalConnectivityMonitor {
    tx: watch::Sender<bool>,
}

impl SignalConnectivityMonitor {
    pub fn new(initially_connected: bool) -> Self {
        let (tx, _) = watch::channel(initially_connected);
        Self { tx }
    }

    /// Publish the current connectivity. Repeating the current value is a no-op.
    pub fn set_connected(&self, connected: bool) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == connected {
                return false;
            }
            *current = connected;
            true
        });
        if changed {
            debug!(connected, "Connectivity signal changed");
        }
        changed
    }
}

impl Default for SignalConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ConnectivityMonitor for SignalConnectivityMonitor {
    fn is_connected(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_only_see_real_changes() {
        let monitor = SignalConnectivityMonitor::new(true);
        let mut changes = monitor.subscribe();

        assert!(!monitor.set_connected(true));
        assert!(!changes.has_changed().unwrap());

        assert!(monitor.set_connected(false));
        changes.changed().await.unwrap();
        assert!(!*changes.borrow_and_update());
        assert!(!monitor.is_connected());
    }
}
