//! Visibility gate: which geotagged messages a device may read.
//!
//! Rules are evaluated in order, first match wins:
//! 1. the device wrote the message
//! 2. the device has posted at least once, anywhere, ever
//! 3. the message id was granted to the device's unlock set
//! 4. otherwise the message renders as a locked placeholder
//!
//! Rule 2 is a deliberate product policy: posting anything pays for
//! visibility of all active content.

mod policy;
mod store;

pub use policy::{is_unlocked, is_unlocked_reason, unlock_random, UnlockReason, UnlockSet};
pub use store::VisibilityGate;
