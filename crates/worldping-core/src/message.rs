//! Geotagged messages and client-side geofencing.
//!
//! A [`Message`] is active until its expiry timestamp. Only active messages
//! are shown or interacted with; filtering them out happens here, before
//! the visibility gate is consulted.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::device::DeviceId;
use crate::error::ValidationError;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let ok = self.lat.is_finite()
            && self.lon.is_finite()
            && self.lat.abs() <= 90.0
            && self.lon.abs() <= 180.0;
        if ok {
            Ok(())
        } else {
            Err(ValidationError::InvalidCoordinate {
                lat: self.lat,
                lon: self.lon,
            })
        }
    }

    /// Great-circle distance in kilometres (haversine).
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_KM * c
    }
}

/// One geotagged post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub author: DeviceId,
    pub content: String,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub mood: Option<String>,
    pub location: Coordinate,
    #[serde(default)]
    pub upvotes: u32,
    #[serde(default)]
    pub downvotes: u32,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Message {
    /// A message is active iff `now < expires_at`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn is_authored_by(&self, device: &DeviceId) -> bool {
        &self.author == device
    }

    pub fn score(&self) -> i64 {
        i64::from(self.upvotes) - i64::from(self.downvotes)
    }

    pub fn validate(&self, max_content_len: usize) -> Result<(), ValidationError> {
        let len = self.content.trim().chars().count();
        if len == 0 {
            return Err(ValidationError::EmptyContent);
        }
        if len > max_content_len {
            return Err(ValidationError::ContentTooLong {
                len,
                max: max_content_len,
            });
        }
        if self.expires_at <= self.created_at {
            return Err(ValidationError::InvalidValue {
                field: "expires_at".to_string(),
                message: "must be after created_at".to_string(),
            });
        }
        self.location.validate()
    }
}

/// Draft of a post before it is written to the content store.
#[derive(Debug, Clone)]
pub struct NewMessage {
    content: String,
    location: Coordinate,
    emoji: Option<String>,
    mood: Option<String>,
    lifetime: Duration,
}

impl NewMessage {
    pub fn new(content: impl Into<String>, location: Coordinate) -> Self {
        Self {
            content: content.into(),
            location,
            emoji: None,
            mood: None,
            lifetime: Duration::hours(24),
        }
    }

    pub fn emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = Some(emoji.into());
        self
    }

    pub fn mood(mut self, mood: impl Into<String>) -> Self {
        self.mood = Some(mood.into());
        self
    }

    pub fn lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Stamp the draft with an id, author and timestamps, then validate it.
    pub fn build(
        self,
        author: &DeviceId,
        now: DateTime<Utc>,
        max_content_len: usize,
    ) -> Result<Message, ValidationError> {
        let message = Message {
            id: Uuid::new_v4().to_string(),
            author: author.clone(),
            content: self.content.trim().to_string(),
            emoji: self.emoji,
            mood: self.mood,
            location: self.location,
            upvotes: 0,
            downvotes: 0,
            created_at: now,
            expires_at: now + self.lifetime,
        };
        message.validate(max_content_len)?;
        Ok(message)
    }
}

/// Keep only messages that have not expired at `now`.
pub fn active_messages(messages: Vec<Message>, now: DateTime<Utc>) -> Vec<Message> {
    messages.into_iter().filter(|m| m.is_active(now)).collect()
}

/// Messages within `radius_km` of `center`, nearest first.
pub fn nearby<'a, I>(messages: I, center: &Coordinate, radius_km: f64) -> Vec<(f64, &'a Message)>
where
    I: IntoIterator<Item = &'a Message>,
{
    let mut hits: Vec<(f64, &Message)> = messages
        .into_iter()
        .map(|m| (center.distance_km(&m.location), m))
        .filter(|(d, _)| *d <= radius_km)
        .collect();
    hits.sort_by(|a, b| a.0.total_cmp(&b.0));
    hits
}

/// What the presentation layer may render for one message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MessageView<'a> {
    Unlocked {
        #[serde(flatten)]
        message: &'a Message,
    },
    /// Placeholder: position and emoji only, never the content.
    Locked {
        id: &'a str,
        location: Coordinate,
        emoji: Option<&'a str>,
        expires_at: DateTime<Utc>,
    },
}

impl<'a> MessageView<'a> {
    pub fn locked(message: &'a Message) -> Self {
        MessageView::Locked {
            id: &message.id,
            location: message.location,
            emoji: message.emoji.as_deref(),
            expires_at: message.expires_at,
        }
    }

    pub fn is_unlocked(&self) -> bool {
        matches!(self, MessageView::Unlocked { .. })
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::message;
    use super::*;

    #[test]
    fn haversine_known_distance() {
        let tokyo = Coordinate::new(35.6762, 139.6503);
        let osaka = Coordinate::new(34.6937, 135.5023);
        let d = tokyo.distance_km(&osaka);
        assert!((d - 397.0).abs() < 10.0, "got {d}");
        assert_eq!(tokyo.distance_km(&tokyo), 0.0);
    }

    #[test]
    fn coordinate_validation() {
        assert!(Coordinate::new(45.0, 120.0).validate().is_ok());
        assert!(Coordinate::new(91.0, 0.0).validate().is_err());
        assert!(Coordinate::new(0.0, -180.5).validate().is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).validate().is_err());
    }

    #[test]
    fn activity_is_strictly_before_expiry() {
        let now = Utc::now();
        let m = message("m1", "wp-a", now);
        assert!(m.is_active(now));
        assert!(!m.is_active(m.expires_at));
        assert!(!m.is_active(m.expires_at + Duration::seconds(1)));
    }

    #[test]
    fn active_messages_drops_expired() {
        let now = Utc::now();
        let mut expired = message("old", "wp-a", now);
        expired.expires_at = now - Duration::minutes(1);
        let fresh = message("new", "wp-b", now);

        let active = active_messages(vec![expired, fresh], now);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "new");
    }

    #[test]
    fn nearby_filters_and_sorts() {
        let now = Utc::now();
        let mut near = message("near", "wp-a", now);
        near.location = Coordinate::new(35.6812, 139.7671); // Tokyo station
        let mut nearer = message("nearer", "wp-a", now);
        nearer.location = Coordinate::new(35.6770, 139.6510);
        let mut far = message("far", "wp-a", now);
        far.location = Coordinate::new(48.8566, 2.3522);

        let msgs = vec![near, far, nearer];
        let center = Coordinate::new(35.6762, 139.6503);
        let hits = nearby(&msgs, &center, 15.0);

        let ids: Vec<&str> = hits.iter().map(|(_, m)| m.id.as_str()).collect();
        assert_eq!(ids, vec!["nearer", "near"]);
    }

    #[test]
    fn new_message_builds_and_validates() {
        let now = Utc::now();
        let author = DeviceId::new("wp-me");
        let m = NewMessage::new("  ramen here  ", Coordinate::new(35.0, 139.0))
            .emoji("🍜")
            .lifetime(Duration::hours(6))
            .build(&author, now, 280)
            .unwrap();
        assert_eq!(m.content, "ramen here");
        assert_eq!(m.expires_at - m.created_at, Duration::hours(6));
        assert!(m.is_authored_by(&author));

        let err = NewMessage::new("x".repeat(10), Coordinate::new(0.0, 0.0))
            .build(&author, now, 5)
            .unwrap_err();
        assert_eq!(err, ValidationError::ContentTooLong { len: 10, max: 5 });

        let err = NewMessage::new("   ", Coordinate::new(0.0, 0.0))
            .build(&author, now, 5)
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptyContent);
    }

    #[test]
    fn locked_view_hides_content() {
        let now = Utc::now();
        let m = message("m1", "wp-a", now);
        let view = MessageView::locked(&m);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["state"], "locked");
        assert_eq!(json["id"], "m1");
        assert!(json.get("content").is_none());

        let json = serde_json::to_value(MessageView::Unlocked { message: &m }).unwrap();
        assert_eq!(json["state"], "unlocked");
        assert_eq!(json["content"], "hello from m1");
    }
}
