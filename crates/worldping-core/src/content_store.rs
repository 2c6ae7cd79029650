//! Boundary to the remote content store.
//!
//! The core only needs a snapshot of active messages: the candidate pool
//! for random unlocks and the input to gate evaluation. Writes, votes and
//! realtime feeds stay with the presentation layer.

use std::future::Future;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::device::DeviceId;
use crate::error::{ConfigError, CoreError, Result};
use crate::message::{active_messages, Coordinate, Message};
use crate::storage::ContentStoreConfig;

/// Source of the active-message snapshot.
///
/// Implementations must exclude messages expired at `now`.
pub trait MessageSource {
    fn list_active_messages(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Message>>> + Send;
}

/// A fixed, in-memory snapshot.
#[derive(Debug, Clone, Default)]
pub struct StaticMessages {
    messages: Vec<Message>,
}

impl StaticMessages {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Parse a JSON array of messages.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Synchronous access for callers without a runtime.
    pub fn active(&self, now: DateTime<Utc>) -> Vec<Message> {
        active_messages(self.messages.clone(), now)
    }
}

impl MessageSource for StaticMessages {
    fn list_active_messages(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Message>>> + Send {
        let active = self.active(now);
        async move { Ok(active) }
    }
}

/// Row shape of the hosted `messages` table.
#[derive(Debug, Deserialize)]
struct MessageRow {
    id: String,
    device_id: String,
    content: String,
    #[serde(default)]
    emoji: Option<String>,
    #[serde(default)]
    mood: Option<String>,
    lat: f64,
    lng: f64,
    #[serde(default)]
    upvotes: u32,
    #[serde(default)]
    downvotes: u32,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            author: DeviceId::new(row.device_id),
            content: row.content,
            emoji: row.emoji,
            mood: row.mood,
            location: Coordinate::new(row.lat, row.lng),
            upvotes: row.upvotes,
            downvotes: row.downvotes,
            created_at: row.created_at,
            expires_at: row.expires_at,
        }
    }
}

/// Client for a PostgREST-style hosted table.
pub struct RestContentStore {
    base_url: Url,
    api_key: Option<String>,
    table: String,
    http_client: Client,
}

impl RestContentStore {
    /// Build a client from configuration.
    ///
    /// # Errors
    /// Fails when no base URL is configured or it does not parse.
    pub fn from_config(config: &ContentStoreConfig) -> Result<Self> {
        let raw = config
            .base_url
            .as_deref()
            .ok_or_else(|| ConfigError::InvalidValue {
                key: "content_store.base_url".to_string(),
                message: "not configured".to_string(),
            })?;
        let mut base_url = Url::parse(raw).map_err(|e| ConfigError::InvalidValue {
            key: "content_store.base_url".to_string(),
            message: e.to_string(),
        })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            base_url,
            api_key: config.api_key.clone(),
            table: config.table.clone(),
            http_client: Client::new(),
        })
    }

    fn messages_url(&self, now: DateTime<Utc>) -> Result<Url> {
        let mut url = self
            .base_url
            .join(&format!("rest/v1/{}", self.table))
            .map_err(|e| CoreError::content_store("invalid table url", e))?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair(
                "expires_at",
                &format!("gt.{}", now.to_rfc3339_opts(SecondsFormat::Millis, true)),
            )
            .append_pair("order", "created_at.desc");
        Ok(url)
    }
}

impl MessageSource for RestContentStore {
    fn list_active_messages(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Message>>> + Send {
        let url = self.messages_url(now);
        let client = self.http_client.clone();
        let api_key = self.api_key.clone();

        async move {
            let mut request = client.get(url?);
            if let Some(key) = &api_key {
                request = request.header("apikey", key).bearer_auth(key);
            }

            let resp = request.send().await?;
            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(CoreError::ContentStore {
                    message: format!("HTTP {status}: {body}"),
                    source: None,
                });
            }

            let rows: Vec<MessageRow> = resp.json().await?;
            let messages: Vec<Message> = rows.into_iter().map(Message::from).collect();
            let fetched = messages.len();
            let active = active_messages(messages, now);
            tracing::debug!(fetched, active = active.len(), "fetched message snapshot");
            Ok(active)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::fixtures::message;
    use chrono::Duration;
    use mockito::Matcher;

    fn config(base_url: String) -> ContentStoreConfig {
        ContentStoreConfig {
            base_url: Some(base_url),
            api_key: Some("anon-key".to_string()),
            table: "messages".to_string(),
        }
    }

    #[tokio::test]
    async fn static_snapshot_excludes_expired() {
        let now = Utc::now();
        let mut old = message("old", "wp-a", now);
        old.expires_at = now - Duration::seconds(1);
        let source = StaticMessages::new(vec![old, message("new", "wp-b", now)]);

        let active = source.list_active_messages(now).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "new");
    }

    #[test]
    fn static_snapshot_from_json() {
        let now = Utc::now();
        let json = serde_json::to_string(&vec![message("m1", "wp-a", now)]).unwrap();
        let source = StaticMessages::from_json(&json).unwrap();
        assert_eq!(source.active(now).len(), 1);
        assert!(StaticMessages::from_json("{").is_err());
    }

    #[test]
    fn missing_base_url_is_config_error() {
        let err = RestContentStore::from_config(&ContentStoreConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, CoreError::Config(ConfigError::InvalidValue { .. })));
    }

    #[tokio::test]
    async fn rest_store_fetches_and_filters() {
        let now = Utc::now();
        let body = serde_json::json!([
            {
                "id": "m1",
                "device_id": "wp-a",
                "content": "sunset here",
                "emoji": "🌅",
                "lat": 35.0,
                "lng": 139.0,
                "upvotes": 4,
                "downvotes": 1,
                "created_at": (now - Duration::hours(1)).to_rfc3339(),
                "expires_at": (now + Duration::hours(5)).to_rfc3339()
            },
            {
                "id": "m2",
                "device_id": "wp-b",
                "content": "stale row",
                "lat": 0.0,
                "lng": 0.0,
                "created_at": (now - Duration::hours(30)).to_rfc3339(),
                "expires_at": (now - Duration::hours(6)).to_rfc3339()
            }
        ]);

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/v1/messages")
            .match_query(Matcher::UrlEncoded("select".into(), "*".into()))
            .match_header("apikey", "anon-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let store = RestContentStore::from_config(&config(server.url())).unwrap();
        let messages = store.list_active_messages(now).await.unwrap();

        mock.assert_async().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "m1");
        assert_eq!(messages[0].author, DeviceId::new("wp-a"));
        assert_eq!(messages[0].location, Coordinate::new(35.0, 139.0));
        assert_eq!(messages[0].score(), 3);
    }

    #[tokio::test]
    async fn rest_store_reports_http_errors() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rest/v1/messages")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("unavailable")
            .create_async()
            .await;

        let store = RestContentStore::from_config(&config(server.url())).unwrap();
        let err = store.list_active_messages(Utc::now()).await.unwrap_err();
        assert!(matches!(err, CoreError::ContentStore { .. }));
        assert!(err.to_string().contains("503"));
    }
}
