//! # WorldPing Core Library
//!
//! Device-local domain logic for WorldPing, a location-based app where
//! users drop short-lived geotagged messages on a map. Storage, realtime
//! fan-out and auth belong to a hosted backend; this crate keeps the
//! pieces that run on the device itself.
//!
//! ## Architecture
//!
//! - **Visibility Gate**: decides whether a message's content may be shown
//!   to an anonymous device, and grants random unlocks
//! - **Streak & Achievement Engine**: derives a daily posting streak,
//!   visited-location tags and one-way badges from local state
//! - **Storage**: a byte key-value trait with SQLite and in-memory stores,
//!   plus TOML configuration
//! - **Content store**: read-only snapshot of active messages
//!
//! ## Key Components
//!
//! - [`DeviceContext`]: per-device facade over gate and engine
//! - [`VisibilityGate`]: persisted unlock set and gate rules
//! - [`StreakEngine`]: streak record, expiry and achievements
//! - [`KvStore`]: local persistence seam
//! - [`NotificationSink`]: fire-and-forget event delivery

pub mod content_store;
pub mod context;
pub mod device;
pub mod error;
pub mod events;
pub mod gate;
pub mod message;
pub mod notify;
pub mod storage;
pub mod streak;

pub use content_store::{MessageSource, RestContentStore, StaticMessages};
pub use context::{DeviceContext, FeedItem};
pub use device::{get_or_create_device_id, get_or_create_device_id_at, DeviceId, DeviceIdError};
pub use error::{ConfigError, CoreError, StorageError, ValidationError};
pub use events::Event;
pub use gate::{is_unlocked, unlock_random, UnlockReason, UnlockSet, VisibilityGate};
pub use message::{Coordinate, Message, MessageView, NewMessage};
pub use notify::{ChannelSink, NotificationSink, NullSink, RecordingSink, TracingSink};
pub use storage::{Config, KvStore, MemoryKv, SqliteKv};
pub use streak::{Achievement, AchievementSet, PostOutcome, StreakChange, StreakEngine, StreakRecord};
