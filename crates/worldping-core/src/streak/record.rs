use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Per-device streak state derived from post history.
///
/// Invariant: `longest_streak >= current_streak`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreakRecord {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub visited_locations: BTreeSet<String>,
    pub last_post_at: Option<DateTime<Utc>>,
    pub total_message_count: u64,
    pub total_upvotes_received: u64,
}

impl StreakRecord {
    /// True once the device has recorded any post at all.
    pub fn has_posted(&self) -> bool {
        self.total_message_count > 0
    }

    /// Whether the streak has lapsed at `now` under `window`.
    pub fn is_expired(&self, now: DateTime<Utc>, window: Duration) -> bool {
        match self.last_post_at {
            Some(last) => self.current_streak > 0 && now - last > window,
            None => false,
        }
    }

    /// Whether the last post fell on the same device-local calendar day.
    pub fn posted_same_day(&self, now: DateTime<Utc>) -> bool {
        self.posted_same_day_in(now, &Local)
    }

    pub fn posted_same_day_in<Tz: TimeZone>(&self, now: DateTime<Utc>, tz: &Tz) -> bool {
        self.last_post_at.map_or(false, |last| {
            last.with_timezone(tz).date_naive() == now.with_timezone(tz).date_naive()
        })
    }

    /// Apply one post. Calendar days are compared in `tz`.
    ///
    /// Same day with a live streak: only the location and count change.
    /// Otherwise the streak advances by one (from zero, to one).
    pub(crate) fn apply_post<Tz: TimeZone>(&mut self, location: &str, now: DateTime<Utc>, tz: &Tz) {
        let same_day = self.posted_same_day_in(now, tz);
        if !same_day || self.current_streak == 0 {
            self.current_streak += 1;
            self.longest_streak = self.longest_streak.max(self.current_streak);
            self.last_post_at = Some(now);
        }

        let location = location.trim();
        if !location.is_empty() {
            self.visited_locations.insert(location.to_string());
        }
        self.total_message_count += 1;
    }

    /// Reset a lapsed streak, returning the length that was lost.
    pub(crate) fn apply_expiry(&mut self, now: DateTime<Utc>, window: Duration) -> Option<u32> {
        if !self.is_expired(now, window) {
            return None;
        }
        let lost = self.current_streak;
        self.current_streak = 0;
        Some(lost)
    }
}

/// How a recorded post moved the streak, for celebratory UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreakChange {
    /// The device's first post ever.
    FirstPost,
    /// Another post on a day that already counted.
    SameDay { day: u32 },
    /// The streak advanced to `day`.
    Continued { day: u32 },
    /// The streak advanced to a multiple of the milestone cadence.
    Milestone { day: u32 },
}

impl StreakChange {
    /// Classify the delta between two records around one post.
    pub fn classify(before: &StreakRecord, after: &StreakRecord, milestone_every: u32) -> Self {
        let day = after.current_streak;
        if !before.has_posted() {
            StreakChange::FirstPost
        } else if day == before.current_streak {
            StreakChange::SameDay { day }
        } else if milestone_every > 0 && day % milestone_every == 0 {
            StreakChange::Milestone { day }
        } else {
            StreakChange::Continued { day }
        }
    }

    pub fn is_milestone(&self) -> bool {
        matches!(self, StreakChange::Milestone { .. })
    }
}
