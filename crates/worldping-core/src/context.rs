//! Per-device facade over the gate and the streak engine.
//!
//! One `DeviceContext` exists per device identity. It owns that device's
//! state explicitly instead of reaching for process-wide globals, so two
//! contexts over one store never see each other's data.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand_pcg::Mcg128Xsl64;
use serde::Serialize;

use crate::device::DeviceId;
use crate::error::Result;
use crate::events::Event;
use crate::gate::{UnlockReason, UnlockSet, VisibilityGate};
use crate::message::{nearby, Coordinate, Message, MessageView};
use crate::notify::NotificationSink;
use crate::storage::{Config, KvStore};
use crate::streak::{AchievementSet, PostOutcome, StreakEngine, StreakRecord};

/// A gate-applied message with its deciding rule.
#[derive(Debug, Clone, Serialize)]
pub struct FeedItem<'a> {
    pub reason: UnlockReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    pub view: MessageView<'a>,
}

pub struct DeviceContext<S: KvStore + Clone> {
    device: DeviceId,
    config: Config,
    gate: VisibilityGate<S>,
    streak: StreakEngine<S>,
    sink: Arc<dyn NotificationSink>,
    rng: Mcg128Xsl64,
}

impl<S: KvStore + Clone> DeviceContext<S> {
    pub fn new(
        store: S,
        device: DeviceId,
        config: Config,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let gate = VisibilityGate::load(store.clone(), device.clone());
        let streak = StreakEngine::load(store, device.clone(), config.streak.clone(), sink.clone());
        let rng = match config.gate.rng_seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
            None => Mcg128Xsl64::from_entropy(),
        };
        Self {
            device,
            config,
            gate,
            streak,
            sink,
            rng,
        }
    }

    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn streak_record(&self) -> &StreakRecord {
        self.streak.record()
    }

    pub fn achievements(&self) -> &AchievementSet {
        self.streak.achievements()
    }

    pub fn unlock_set(&self) -> &UnlockSet {
        self.gate.unlock_set()
    }

    pub fn has_device_ever_posted(&self) -> bool {
        self.streak.has_posted()
    }

    pub fn is_unlocked(&self, message: &Message) -> bool {
        self.gate.is_unlocked(message, self.has_device_ever_posted())
    }

    /// Render every active message through the gate; expired ones are
    /// dropped before the gate sees them.
    pub fn view_messages<'a>(&self, messages: &'a [Message], now: DateTime<Utc>) -> Vec<FeedItem<'a>> {
        let posted = self.has_device_ever_posted();
        messages
            .iter()
            .filter(|m| m.is_active(now))
            .map(|m| FeedItem {
                reason: self.gate.reason(m, posted),
                distance_km: None,
                view: self.gate.view(m, posted),
            })
            .collect()
    }

    /// Like [`view_messages`](Self::view_messages), limited to the
    /// configured radius around `center`, nearest first.
    pub fn view_nearby<'a>(
        &self,
        messages: &'a [Message],
        center: &Coordinate,
        now: DateTime<Utc>,
    ) -> Vec<FeedItem<'a>> {
        self.view_within(messages, center, self.config.geo.nearby_radius_km, now)
    }

    pub fn view_within<'a>(
        &self,
        messages: &'a [Message],
        center: &Coordinate,
        radius_km: f64,
        now: DateTime<Utc>,
    ) -> Vec<FeedItem<'a>> {
        let posted = self.has_device_ever_posted();
        let active = messages.iter().filter(|m| m.is_active(now));
        nearby(active, center, radius_km)
            .into_iter()
            .map(|(d, m)| FeedItem {
                reason: self.gate.reason(m, posted),
                distance_km: Some(d),
                view: self.gate.view(m, posted),
            })
            .collect()
    }

    /// Grant up to `count` random messages from the snapshot.
    ///
    /// Returns how many were unlocked.
    pub fn unlock_random(&mut self, candidates: &[Message], count: i64) -> Result<usize> {
        let ids = self.gate.unlock_random(candidates, count, &mut self.rng)?;
        let added = ids.len();
        if added > 0 {
            self.sink.notify(Event::MessagesUnlocked {
                device: self.device.clone(),
                ids,
                at: Utc::now(),
            });
        }
        Ok(added)
    }

    pub fn record_post(&mut self, location: &str, now: DateTime<Utc>) -> Result<PostOutcome> {
        self.streak.record_post(location, now)
    }

    pub fn check_expiry(&mut self, now: DateTime<Utc>) -> Result<StreakRecord> {
        self.streak.check_expiry(now)
    }

    pub fn record_upvotes_received(&mut self, total: u64, now: DateTime<Utc>) -> Result<usize> {
        Ok(self.streak.record_upvotes_received(total, now)?.len())
    }
}
