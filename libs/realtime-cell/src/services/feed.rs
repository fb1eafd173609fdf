use tokio::sync::broadcast;
use tracing::debug;

use crate::models::{ChangeEvent, ChangeKind};

pub type ChangeReceiver = broadcast::Receiver<ChangeEvent>;

/// Fan-out point for table change notifications. Mutation paths publish
/// after a successful write; viewers subscribe and re-derive their views
/// wholesale on each event. Delivery is best-effort: a slow subscriber
/// lags and re-syncs on its next fetch, it never blocks a publisher.
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1024);
        Self { sender }
    }

    pub fn subscribe(&self) -> ChangeReceiver {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: ChangeEvent) {
        match self.sender.send(event.clone()) {
            Ok(receivers) => {
                debug!(
                    "Published {:?} on {} to {} subscriber(s)",
                    event.kind, event.table, receivers
                );
            }
            Err(_) => {
                // No live subscribers; nothing to notify
                debug!("No subscribers for {:?} on {}", event.kind, event.table);
            }
        }
    }

    pub fn publish_insert(&self, table: &str, record_id: &str, date: chrono::NaiveDate) {
        self.publish(
            ChangeEvent::new(table, ChangeKind::Insert)
                .with_record_id(record_id)
                .with_date(date),
        );
    }

    pub fn publish_update(&self, table: &str, record_id: &str, date: chrono::NaiveDate) {
        self.publish(
            ChangeEvent::new(table, ChangeKind::Update)
                .with_record_id(record_id)
                .with_date(date),
        );
    }

    pub fn publish_delete(&self, table: &str, record_id: &str, date: chrono::NaiveDate) {
        self.publish(
            ChangeEvent::new(table, ChangeKind::Delete)
                .with_record_id(record_id)
                .with_date(date),
        );
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}
