use tokio::sync::broadcast;

use crate::model::StatusEvent;

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub for submission status changes.
pub struct NotifyHub {
    sender: broadcast::Sender<StatusEvent>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            sender: broadcast::channel(CHANNEL_CAPACITY).0,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.sender.subscribe()
    }

    /// Send a notification. No-op if nobody is listening.
    pub fn send(&self, event: StatusEvent) {
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use ulid::Ulid;

    fn event(status: SubmissionStatus) -> StatusEvent {
        StatusEvent {
            id: Ulid::new(),
            day: DayKey::from_ymd_opt(2024, 1, 16).unwrap(),
            range: HourRange::new(19, 20).unwrap(),
            status,
        }
    }

    #[tokio::test]
    async fn subscribe_and_receive() {
        let hub = NotifyHub::new();
        let mut rx = hub.subscribe();

        let sent = event(SubmissionStatus::Pending);
        hub.send(sent.clone());

        let received = rx.recv().await.unwrap();
        assert_eq!(received, sent);
    }

    #[tokio::test]
    async fn send_without_subscribers_is_noop() {
        let hub = NotifyHub::new();
        // No subscriber, should not panic
        hub.send(event(SubmissionStatus::Failed { reason: "x".into() }));
    }
}
