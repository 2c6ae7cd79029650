use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::device::DeviceId;
use crate::streak::{Achievement, StreakChange};

/// Every user-visible state change in the core produces an Event.
/// The presentation layer subscribes through a
/// [`NotificationSink`](crate::notify::NotificationSink).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A threshold was crossed for the first time on this device.
    AchievementEarned {
        device: DeviceId,
        achievement: Achievement,
        at: DateTime<Utc>,
    },
    /// A post was recorded.
    StreakUpdated {
        device: DeviceId,
        change: StreakChange,
        current_streak: u32,
        longest_streak: u32,
        at: DateTime<Utc>,
    },
    /// The streak lapsed; carries the length that was lost.
    StreakExpired {
        device: DeviceId,
        lost_streak: u32,
        at: DateTime<Utc>,
    },
    /// Random unlock granted new message ids.
    MessagesUnlocked {
        device: DeviceId,
        ids: Vec<String>,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn device(&self) -> &DeviceId {
        match self {
            Event::AchievementEarned { device, .. }
            | Event::StreakUpdated { device, .. }
            | Event::StreakExpired { device, .. }
            | Event::MessagesUnlocked { device, .. } => device,
        }
    }

    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::AchievementEarned { at, .. }
            | Event::StreakUpdated { at, .. }
            | Event::StreakExpired { at, .. }
            | Event::MessagesUnlocked { at, .. } => *at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_type() {
        let event = Event::StreakExpired {
            device: DeviceId::new("wp-a"),
            lost_streak: 5,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "StreakExpired");
        assert_eq!(json["lost_streak"], 5);
        assert_eq!(json["device"], "wp-a");

        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn achievement_event_uses_stable_key() {
        let event = Event::AchievementEarned {
            device: DeviceId::new("wp-a"),
            achievement: Achievement::Streak3,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["achievement"], "STREAK_3");
    }
}
