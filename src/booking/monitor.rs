use std::collections::HashMap;

use tokio::sync::{mpsc, Mutex};

/// Monitor fans facility updates out to registered watchers.
///
/// A watcher is just the sending half of a channel; the consumer holds the
/// receiver and enforces its own wall-clock TTL. Watchers whose receiver is
/// gone are pruned on the next update to their facility.
#[derive(Debug, Default)]
pub struct Monitor {
    watchers: Mutex<HashMap<String, Vec<mpsc::UnboundedSender<String>>>>,
}

impl Monitor {
    pub fn new() -> Self {
        Monitor::default()
    }

    /// Registers a watcher on a facility name. Watching a facility that
    /// does not exist (yet) is allowed; updates only flow once something
    /// happens under that name.
    pub async fn watch(&self, facility: &str) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watchers = self.watchers.lock().await;
        watchers.entry(facility.to_string()).or_default().push(tx);
        log::info!("created watcher on facility {facility}");

        rx
    }

    /// Broadcasts an update to every watcher of the facility; silently a
    /// no-op when nobody watches it.
    pub async fn update(&self, facility: &str, message: &str) {
        let mut watchers = self.watchers.lock().await;
        if let Some(list) = watchers.get_mut(facility) {
            list.retain(|tx| tx.send(message.to_string()).is_ok());
            if list.is_empty() {
                watchers.remove(facility);
            }
        }
    }

    /// Drops every watcher of a facility, closing their channels.
    pub async fn clear(&self, facility: &str) {
        let mut watchers = self.watchers.lock().await;
        watchers.remove(facility);
    }

    pub async fn watcher_count(&self, facility: &str) -> usize {
        let watchers = self.watchers.lock().await;
        watchers.get(facility).map_or(0, |list| list.len())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_update_reaches_every_watcher() {
        let monitor = Monitor::new();
        let mut first = monitor.watch("Gym").await;
        let mut second = monitor.watch("Gym").await;
        let mut other = monitor.watch("Pool").await;

        monitor.update("Gym", "booked").await;

        assert_eq!(first.recv().await.as_deref(), Some("booked"));
        assert_eq!(second.recv().await.as_deref(), Some("booked"));
        assert!(other.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_update_without_watchers_is_silent() {
        let monitor = Monitor::new();
        monitor.update("Nowhere", "nothing").await;
        assert_eq!(monitor.watcher_count("Nowhere").await, 0);
    }

    #[tokio::test]
    async fn test_clear_closes_channels() {
        let monitor = Monitor::new();
        let mut rx = monitor.watch("Gym").await;

        monitor.clear("Gym").await;

        assert_eq!(rx.recv().await, None);
        assert_eq!(monitor.watcher_count("Gym").await, 0);
    }

    #[tokio::test]
    async fn test_dropped_receivers_are_pruned_on_update() {
        let monitor = Monitor::new();
        let rx = monitor.watch("Gym").await;
        drop(rx);

        assert_eq!(monitor.watcher_count("Gym").await, 1);
        monitor.update("Gym", "tick").await;
        assert_eq!(monitor.watcher_count("Gym").await, 0);
    }
}
