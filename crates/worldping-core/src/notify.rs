//! Notification sinks for core events.
//!
//! Dispatch is fire-and-forget: a sink must return promptly and may drop
//! events, but it must never fail the operation that produced them.

use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::events::Event;

/// Receives events from the streak engine and the device context.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: Event);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&self, _event: Event) {}
}

/// Logs events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, event: Event) {
        match &event {
            Event::AchievementEarned { achievement, .. } => {
                tracing::info!(device = %event.device(), achievement = achievement.key(), "achievement earned");
            }
            Event::StreakUpdated { change, current_streak, .. } => {
                tracing::info!(device = %event.device(), ?change, current_streak, "streak updated");
            }
            Event::StreakExpired { lost_streak, .. } => {
                tracing::info!(device = %event.device(), lost_streak, "streak expired");
            }
            Event::MessagesUnlocked { ids, .. } => {
                tracing::info!(device = %event.device(), count = ids.len(), "messages unlocked");
            }
        }
    }
}

/// Forwards events into an unbounded tokio channel.
///
/// Sending never blocks, so a slow consumer cannot stall the engine.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, event: Event) {
        if self.tx.send(event).is_err() {
            tracing::warn!("notification receiver dropped, event discarded");
        }
    }
}

/// Collects events in memory, in dispatch order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceId;
    use chrono::Utc;

    fn expired(n: u32) -> Event {
        Event::StreakExpired {
            device: DeviceId::new("wp-a"),
            lost_streak: n,
            at: Utc::now(),
        }
    }

    #[test]
    fn recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        sink.notify(expired(1));
        sink.notify(expired(2));

        let events = sink.take();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], Event::StreakExpired { lost_streak: 2, .. }));
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn channel_sink_delivers_without_blocking() {
        let (sink, mut rx) = ChannelSink::new();
        sink.notify(expired(3));
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, Event::StreakExpired { lost_streak: 3, .. }));
    }

    #[test]
    fn channel_sink_tolerates_dropped_receiver() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.notify(expired(1));
    }
}
