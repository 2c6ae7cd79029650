use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::record::StreakRecord;

/// One-way badges earned from streak state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Achievement {
    #[serde(rename = "STREAK_3")]
    Streak3,
    #[serde(rename = "STREAK_7")]
    Streak7,
    #[serde(rename = "STREAK_30")]
    Streak30,
    #[serde(rename = "COUNTRIES_5")]
    Countries5,
    #[serde(rename = "COUNTRIES_10")]
    Countries10,
    #[serde(rename = "UPVOTES_100")]
    Upvotes100,
}

/// What a threshold is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Threshold {
    Streak(u32),
    Locations(usize),
    Upvotes(u64),
}

impl Achievement {
    pub const ALL: [Achievement; 6] = [
        Achievement::Streak3,
        Achievement::Streak7,
        Achievement::Streak30,
        Achievement::Countries5,
        Achievement::Countries10,
        Achievement::Upvotes100,
    ];

    /// Stable storage key.
    pub fn key(&self) -> &'static str {
        match self {
            Achievement::Streak3 => "STREAK_3",
            Achievement::Streak7 => "STREAK_7",
            Achievement::Streak30 => "STREAK_30",
            Achievement::Countries5 => "COUNTRIES_5",
            Achievement::Countries10 => "COUNTRIES_10",
            Achievement::Upvotes100 => "UPVOTES_100",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Achievement::Streak3 => "3-day streak",
            Achievement::Streak7 => "Week-long streak",
            Achievement::Streak30 => "30-day streak",
            Achievement::Countries5 => "Visited 5 places",
            Achievement::Countries10 => "Visited 10 places",
            Achievement::Upvotes100 => "100 upvotes received",
        }
    }

    fn threshold(&self) -> Threshold {
        match self {
            Achievement::Streak3 => Threshold::Streak(3),
            Achievement::Streak7 => Threshold::Streak(7),
            Achievement::Streak30 => Threshold::Streak(30),
            Achievement::Countries5 => Threshold::Locations(5),
            Achievement::Countries10 => Threshold::Locations(10),
            Achievement::Upvotes100 => Threshold::Upvotes(100),
        }
    }

    /// Whether the update from `before` to `after` earns this badge.
    ///
    /// Streak and location counts must cross the boundary in this update
    /// (`before < t <= after`), so a bulk jump past it still fires once.
    /// Upvotes only need to have reached the threshold.
    pub fn crossed(&self, before: &StreakRecord, after: &StreakRecord) -> bool {
        match self.threshold() {
            Threshold::Streak(t) => before.current_streak < t && t <= after.current_streak,
            Threshold::Locations(t) => {
                before.visited_locations.len() < t && t <= after.visited_locations.len()
            }
            Threshold::Upvotes(t) => after.total_upvotes_received >= t,
        }
    }

    /// Badges crossed by this update that the device does not hold yet.
    pub fn newly_earned(
        before: &StreakRecord,
        after: &StreakRecord,
        held: &AchievementSet,
    ) -> Vec<Achievement> {
        Self::ALL
            .into_iter()
            .filter(|a| !held.contains(*a) && a.crossed(before, after))
            .collect()
    }
}

/// Achievements a device has earned. Grows only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AchievementSet(BTreeSet<Achievement>);

impl AchievementSet {
    pub fn contains(&self, achievement: Achievement) -> bool {
        self.0.contains(&achievement)
    }

    pub fn insert(&mut self, achievement: Achievement) -> bool {
        self.0.insert(achievement)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Achievement> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Achievement> for AchievementSet {
    fn from_iter<I: IntoIterator<Item = Achievement>>(iter: I) -> Self {
        AchievementSet(iter.into_iter().collect())
    }
}
