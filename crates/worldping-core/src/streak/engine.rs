use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use super::achievements::{Achievement, AchievementSet};
use super::record::{StreakChange, StreakRecord};
use crate::device::DeviceId;
use crate::error::Result;
use crate::events::Event;
use crate::notify::NotificationSink;
use crate::storage::{keys, load_json_or_default, KvStore, StreakConfig};

/// Result of recording one post.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostOutcome {
    pub record: StreakRecord,
    pub change: StreakChange,
    pub earned: Vec<Achievement>,
    /// Streak length lost to the expiry check run before the post.
    pub expired: Option<u32>,
}

/// Maintains one device's streak record and achievements.
///
/// Every mutation is computed on a copy, written to storage in one batch,
/// and only then committed in memory and announced to the sink. A failed
/// write changes nothing and fires nothing.
pub struct StreakEngine<S: KvStore> {
    store: S,
    device: DeviceId,
    config: StreakConfig,
    sink: Arc<dyn NotificationSink>,
    record: StreakRecord,
    achievements: AchievementSet,
}

impl<S: KvStore> StreakEngine<S> {
    /// Load persisted state; missing or corrupt state starts at zero.
    pub fn load(
        store: S,
        device: DeviceId,
        config: StreakConfig,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let mut record: StreakRecord = load_json_or_default(&store, &keys::streak(&device));
        record.longest_streak = record.longest_streak.max(record.current_streak);
        let achievements = load_json_or_default(&store, &keys::achievements(&device));
        Self {
            store,
            device,
            config,
            sink,
            record,
            achievements,
        }
    }

    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    pub fn record(&self) -> &StreakRecord {
        &self.record
    }

    pub fn achievements(&self) -> &AchievementSet {
        &self.achievements
    }

    pub fn has_posted(&self) -> bool {
        self.record.has_posted()
    }

    /// Reset the streak if it has lapsed. Safe to call on every panel open:
    /// a reset happens, and is announced, at most once per lapse.
    ///
    /// # Errors
    /// Returns a storage error if the reset could not be saved; the record
    /// is then unchanged.
    pub fn check_expiry(&mut self, now: DateTime<Utc>) -> Result<StreakRecord> {
        let mut next = self.record.clone();
        let Some(lost) = next.apply_expiry(now, self.config.expiry_window()) else {
            return Ok(self.record.clone());
        };

        self.store
            .set(&keys::streak(&self.device), &serde_json::to_vec(&next)?)?;
        self.record = next;

        tracing::info!(device = %self.device, lost, "streak expired");
        self.sink.notify(Event::StreakExpired {
            device: self.device.clone(),
            lost_streak: lost,
            at: now,
        });
        Ok(self.record.clone())
    }

    /// Record a post tagged with `location`, using the device-local
    /// calendar to decide whether it starts a new streak day.
    pub fn record_post(&mut self, location: &str, now: DateTime<Utc>) -> Result<PostOutcome> {
        self.record_post_in(location, now, &Local)
    }

    /// [`record_post`](Self::record_post) with an explicit time zone.
    pub fn record_post_in<Tz: chrono::TimeZone>(
        &mut self,
        location: &str,
        now: DateTime<Utc>,
        tz: &Tz,
    ) -> Result<PostOutcome> {
        let mut before = self.record.clone();
        let expired = before.apply_expiry(now, self.config.expiry_window());

        let mut after = before.clone();
        after.apply_post(location, now, tz);

        let earned = Achievement::newly_earned(&before, &after, &self.achievements);
        let mut achievements = self.achievements.clone();
        for a in &earned {
            achievements.insert(*a);
        }

        let mut batch = vec![(keys::streak(&self.device), serde_json::to_vec(&after)?)];
        if !earned.is_empty() {
            batch.push((
                keys::achievements(&self.device),
                serde_json::to_vec(&achievements)?,
            ));
        }
        self.store.set_many(&batch)?;

        let change = StreakChange::classify(&before, &after, self.config.milestone_every_days);
        self.record = after;
        self.achievements = achievements;

        tracing::debug!(
            device = %self.device,
            location,
            ?change,
            current = self.record.current_streak,
            "recorded post"
        );

        if let Some(lost) = expired {
            self.sink.notify(Event::StreakExpired {
                device: self.device.clone(),
                lost_streak: lost,
                at: now,
            });
        }
        for a in &earned {
            tracing::info!(device = %self.device, achievement = a.key(), "achievement earned");
            self.sink.notify(Event::AchievementEarned {
                device: self.device.clone(),
                achievement: *a,
                at: now,
            });
        }
        self.sink.notify(Event::StreakUpdated {
            device: self.device.clone(),
            change,
            current_streak: self.record.current_streak,
            longest_streak: self.record.longest_streak,
            at: now,
        });

        Ok(PostOutcome {
            record: self.record.clone(),
            change,
            earned,
            expired,
        })
    }

    /// Mirror the server-side upvote tally for this device's posts.
    ///
    /// The stored total never decreases. Returns newly earned achievements.
    pub fn record_upvotes_received(
        &mut self,
        total: u64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Achievement>> {
        if total <= self.record.total_upvotes_received {
            return Ok(Vec::new());
        }

        let before = self.record.clone();
        let mut after = before.clone();
        after.total_upvotes_received = total;

        let earned = Achievement::newly_earned(&before, &after, &self.achievements);
        let mut achievements = self.achievements.clone();
        for a in &earned {
            achievements.insert(*a);
        }

        self.store.set_many(&[
            (keys::streak(&self.device), serde_json::to_vec(&after)?),
            (
                keys::achievements(&self.device),
                serde_json::to_vec(&achievements)?,
            ),
        ])?;
        self.record = after;
        self.achievements = achievements;

        for a in &earned {
            self.sink.notify(Event::AchievementEarned {
                device: self.device.clone(),
                achievement: *a,
                at: now,
            });
        }
        Ok(earned)
    }
}
