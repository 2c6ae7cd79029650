use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::device::DeviceId;
use crate::message::Message;

/// Message ids a device has been granted beyond the default rules.
///
/// Append-only: there is no way to remove an id once granted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnlockSet(BTreeSet<String>);

impl UnlockSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    /// Returns true if the id was not already present.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.0.insert(id.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn union(&self, other: &UnlockSet) -> UnlockSet {
        UnlockSet(self.0.union(&other.0).cloned().collect())
    }
}

impl<S: Into<String>> FromIterator<S> for UnlockSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        UnlockSet(iter.into_iter().map(Into::into).collect())
    }
}

/// Which rule decided a gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockReason {
    OwnPost,
    HasPosted,
    Granted,
    Locked,
}

impl UnlockReason {
    pub fn is_unlocked(self) -> bool {
        self != UnlockReason::Locked
    }
}

/// Evaluate the gate rules and report which one matched.
///
/// Total and pure. Expired messages are the caller's responsibility.
pub fn is_unlocked_reason(
    message: &Message,
    device: &DeviceId,
    unlock_set: &UnlockSet,
    has_device_ever_posted: bool,
) -> UnlockReason {
    if message.is_authored_by(device) {
        UnlockReason::OwnPost
    } else if has_device_ever_posted {
        UnlockReason::HasPosted
    } else if unlock_set.contains(&message.id) {
        UnlockReason::Granted
    } else {
        UnlockReason::Locked
    }
}

pub fn is_unlocked(
    message: &Message,
    device: &DeviceId,
    unlock_set: &UnlockSet,
    has_device_ever_posted: bool,
) -> bool {
    is_unlocked_reason(message, device, unlock_set, has_device_ever_posted).is_unlocked()
}

/// Grant up to `count` random messages from `candidates`.
///
/// Only ids that are neither already granted nor authored by `device` are
/// eligible; duplicates in `candidates` count once. The draw is uniform
/// without replacement. Returns the grown set and how many ids were added.
/// A non-positive `count` is a no-op.
pub fn unlock_random<R: Rng + ?Sized>(
    candidates: &[Message],
    unlock_set: &UnlockSet,
    device: &DeviceId,
    count: i64,
    rng: &mut R,
) -> (UnlockSet, usize) {
    if count <= 0 {
        return (unlock_set.clone(), 0);
    }

    let pool: Vec<&str> = candidates
        .iter()
        .filter(|m| !m.is_authored_by(device) && !unlock_set.contains(&m.id))
        .map(|m| m.id.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let take = usize::try_from(count).unwrap_or(usize::MAX).min(pool.len());
    let drawn: UnlockSet = pool.choose_multiple(rng, take).copied().collect();

    let added = drawn.len();
    (unlock_set.union(&drawn), added)
}
