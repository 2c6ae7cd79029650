//! Daily posting streaks and achievement badges.
//!
//! State per device:
//! - a [`StreakRecord`] (`Zero` or `Active(n)` current streak, longest
//!   streak, visited location tags, counters)
//! - an [`AchievementSet`] that only ever grows
//!
//! Both live in local storage and are only changed by recording a post,
//! mirroring upvotes, or the opportunistic expiry check. Streak days are
//! device-local calendar dates, not rolling 24h windows: posts at 23:59
//! and 00:01 count as two days.

mod achievements;
mod engine;
mod record;

pub use achievements::{Achievement, AchievementSet};
pub use engine::{PostOutcome, StreakEngine};
pub use record::{StreakChange, StreakRecord};
