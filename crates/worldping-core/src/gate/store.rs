use rand::Rng;

use super::policy::{is_unlocked_reason, unlock_random, UnlockReason, UnlockSet};
use crate::device::DeviceId;
use crate::error::Result;
use crate::message::{Message, MessageView};
use crate::storage::{keys, load_json_or_default, KvStore};

/// A device's unlock set, backed by local storage.
///
/// The in-memory set only changes after the grown set has been written,
/// so a failed write leaves both copies as they were.
pub struct VisibilityGate<S: KvStore> {
    store: S,
    device: DeviceId,
    unlocks: UnlockSet,
}

impl<S: KvStore> VisibilityGate<S> {
    /// Load the device's unlock set; corrupt or missing state reads as empty.
    pub fn load(store: S, device: DeviceId) -> Self {
        let unlocks = load_json_or_default(&store, &keys::unlocks(&device));
        Self {
            store,
            device,
            unlocks,
        }
    }

    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    pub fn unlock_set(&self) -> &UnlockSet {
        &self.unlocks
    }

    pub fn reason(&self, message: &Message, has_device_ever_posted: bool) -> UnlockReason {
        is_unlocked_reason(message, &self.device, &self.unlocks, has_device_ever_posted)
    }

    pub fn is_unlocked(&self, message: &Message, has_device_ever_posted: bool) -> bool {
        self.reason(message, has_device_ever_posted).is_unlocked()
    }

    /// Render a message as content or as a locked placeholder.
    pub fn view<'a>(&self, message: &'a Message, has_device_ever_posted: bool) -> MessageView<'a> {
        if self.is_unlocked(message, has_device_ever_posted) {
            MessageView::Unlocked { message }
        } else {
            MessageView::locked(message)
        }
    }

    /// Draw up to `count` random eligible messages and persist the grant.
    ///
    /// Returns the ids actually added, in set order.
    ///
    /// # Errors
    /// Returns a storage error if the grown set could not be written; the
    /// unlock set is then unchanged.
    pub fn unlock_random<R: Rng + ?Sized>(
        &mut self,
        candidates: &[Message],
        count: i64,
        rng: &mut R,
    ) -> Result<Vec<String>> {
        let (next, added) = unlock_random(candidates, &self.unlocks, &self.device, count, rng);
        if added == 0 {
            tracing::debug!(device = %self.device, count, "no eligible messages to unlock");
            return Ok(Vec::new());
        }

        let bytes = serde_json::to_vec(&next)?;
        self.store.set(&keys::unlocks(&self.device), &bytes)?;

        let new_ids: Vec<String> = next
            .iter()
            .filter(|id| !self.unlocks.contains(id))
            .map(str::to_string)
            .collect();
        tracing::info!(device = %self.device, added, total = next.len(), "unlocked messages");
        self.unlocks = next;
        Ok(new_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::fixtures::message;
    use crate::storage::{MemoryKv, SqliteKv};
    use chrono::Utc;
    use rand::SeedableRng;
    use rand_pcg::Mcg128Xsl64;

    fn pool() -> Vec<Message> {
        let now = Utc::now();
        vec![
            message("a", "wp-x", now),
            message("b", "wp-y", now),
            message("c", "wp-z", now),
            message("mine", "wp-me", now),
        ]
    }

    #[test]
    fn unlock_persists_and_reloads() {
        let kv = MemoryKv::new();
        let device = DeviceId::new("wp-me");
        let mut rng = Mcg128Xsl64::seed_from_u64(5);

        let mut gate = VisibilityGate::load(&kv, device.clone());
        let ids = gate.unlock_random(&pool(), 10, &mut rng).unwrap();
        assert_eq!(ids.len(), 3);
        assert!(!ids.contains(&"mine".to_string()));

        let reloaded = VisibilityGate::load(&kv, device);
        assert_eq!(reloaded.unlock_set(), gate.unlock_set());
        assert_eq!(reloaded.unlock_set().len(), 3);
    }

    #[test]
    fn failed_persist_leaves_set_unchanged() {
        let kv = MemoryKv::new();
        let mut rng = Mcg128Xsl64::seed_from_u64(5);
        let mut gate = VisibilityGate::load(&kv, DeviceId::new("wp-me"));
        gate.unlock_random(&pool()[..1], 1, &mut rng).unwrap();

        kv.fail_writes(true);
        let err = gate.unlock_random(&pool(), 10, &mut rng).unwrap_err();
        assert!(err.is_persistence_failure());
        assert_eq!(gate.unlock_set().iter().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn corrupt_state_reads_as_empty() {
        let kv = MemoryKv::new();
        let device = DeviceId::new("wp-me");
        kv.set(&keys::unlocks(&device), b"\x00garbage").unwrap();

        let gate = VisibilityGate::load(&kv, device);
        assert!(gate.unlock_set().is_empty());
    }

    #[test]
    fn view_locks_until_granted() {
        let db = SqliteKv::open_memory().unwrap();
        let mut rng = Mcg128Xsl64::seed_from_u64(5);
        let mut gate = VisibilityGate::load(&db, DeviceId::new("wp-me"));
        let msgs = pool();

        assert!(!gate.view(&msgs[0], false).is_unlocked());
        assert!(gate.view(&msgs[3], false).is_unlocked());
        assert!(gate.view(&msgs[0], true).is_unlocked());

        gate.unlock_random(&msgs[..1], 1, &mut rng).unwrap();
        assert_eq!(gate.reason(&msgs[0], false), UnlockReason::Granted);
    }
}
