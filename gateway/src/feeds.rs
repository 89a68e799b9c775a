//! Upstream Producer Client
//!
//! HTTP implementation of [`TrackingFeeds`]. Every request carries the
//! bearer token from a [`CredentialSource`]; without a token no request is
//! made at all.
//!
//! | Feed | Endpoint |
//! |------|----------|
//! | Objects | `GET /api/satellites` |
//! | Warnings | `GET /api/conjunctions` |
//! | Path | `GET /api/satellites/{id}/path?hours=N` |
//! | Sync | `GET /api/sync` |

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use tracking_core::selection::RawPathPoint;
use tracking_core::warnings::WarningFeed;
use tracking_core::{FeedKind, Result, TrackingError, TrackingFeeds};

/// Supplies the bearer token, read fresh for every request
pub trait CredentialSource: Send + Sync + 'static {
    fn token(&self) -> Option<String>;
}

/// Token taken from an environment variable
pub struct EnvCredential {
    var: String,
}

impl EnvCredential {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialSource for EnvCredential {
    fn token(&self) -> Option<String> {
        std::env::var(&self.var)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

pub struct HttpFeeds {
    client: reqwest::Client,
    base: Url,
    credential: Arc<dyn CredentialSource>,
}

impl HttpFeeds {
    pub fn new(
        base: impl Into<String>,
        timeout: Duration,
        credential: Arc<dyn CredentialSource>,
    ) -> anyhow::Result<Self> {
        let base = base.into();
        let base = Url::parse(&base).with_context(|| format!("Invalid upstream URL: {}", base))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("Upstream URL cannot carry a path: {}", base);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base,
            credential,
        })
    }

    /// Base URL extended by `segments`, each percent-encoded as one path segment
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // checked in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get(&self, feed: FeedKind, url: Url) -> Result<reqwest::Response> {
        let token = self
            .credential
            .token()
            .ok_or(TrackingError::MissingCredential)?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| TrackingError::transport(feed, e.to_string()))?;

        if !response.status().is_success() {
            return Err(TrackingError::Status {
                feed,
                status: response.status().as_u16(),
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, feed: FeedKind, url: Url) -> Result<T> {
        self.get(feed, url)
            .await?
            .json::<T>()
            .await
            .map_err(|e| TrackingError::decode(feed, e.to_string()))
    }
}

#[async_trait]
impl TrackingFeeds for HttpFeeds {
    fn authorized(&self) -> bool {
        self.credential.token().is_some()
    }

    async fn fetch_objects(&self) -> Result<Vec<serde_json::Value>> {
        let url = self.endpoint(&["api", "satellites"]);
        self.get_json(FeedKind::Objects, url).await
    }

    async fn fetch_warnings(&self) -> Result<WarningFeed> {
        let url = self.endpoint(&["api", "conjunctions"]);
        self.get_json(FeedKind::Warnings, url).await
    }

    async fn fetch_path(&self, object_id: &str, hours: u32) -> Result<Vec<RawPathPoint>> {
        let mut url = self.endpoint(&["api", "satellites", object_id, "path"]);
        url.query_pairs_mut().append_pair("hours", &hours.to_string());
        self.get_json(FeedKind::Path, url).await
    }

    async fn trigger_sync(&self) -> Result<()> {
        let url = self.endpoint(&["api", "sync"]);
        let response = self.get(FeedKind::Sync, url).await?;
        // body is a human-readable acknowledgement
        let message = response.text().await.unwrap_or_default();
        debug!("Sync acknowledged: {}", message.trim());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, Query},
        http::{header::AUTHORIZATION, HeaderMap, StatusCode},
        response::IntoResponse,
        routing::get,
        Json, Router,
    };
    use serde_json::json;
    use std::collections::HashMap;

    struct StaticToken(Option<&'static str>);

    impl CredentialSource for StaticToken {
        fn token(&self) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) == Some("Bearer s3cret")
    }

    /// Local stand-in for the upstream producer
    async fn upstream() -> String {
        let app = Router::new()
            .route(
                "/api/satellites",
                get(|headers: HeaderMap| async move {
                    if !authorized(&headers) {
                        return StatusCode::UNAUTHORIZED.into_response();
                    }
                    Json(json!([
                        {"id": 25544, "name": "ISS (ZARYA)", "latitude": 51.6, "longitude": -0.1, "altitude": 420.0},
                        {"name": "BROKEN"}
                    ]))
                    .into_response()
                }),
            )
            .route(
                "/api/satellites/:id/path",
                get(
                    |Path(id): Path<String>, Query(query): Query<HashMap<String, String>>| async move {
                        let hours: f64 = query.get("hours").and_then(|h| h.parse().ok()).unwrap_or(0.0);
                        // numeric ids echo back as latitude, others as their length
                        let lat: f64 = id.parse().unwrap_or(id.len() as f64);
                        Json(json!([{"latitude": lat, "longitude": hours, "altitude": 420000.0}]))
                    },
                ),
            )
            .route(
                "/api/conjunctions",
                get(|| async {
                    Json(json!({
                        "warningCount": 1,
                        "conjunctions": [{
                            "object": "COSMOS 2251 DEB", "type": "DEBRIS", "distance": 7.5,
                            "timeOfApproach": "2026-03-01T12:00:00", "hoursFromNow": 4.0
                        }]
                    }))
                }),
            )
            .route("/api/sync", get(|| async { "Sync has been initiated." }))
            .route("/broken", get(|| async { "not json" }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    fn feeds(base: &str, token: Option<&'static str>) -> HttpFeeds {
        HttpFeeds::new(base, Duration::from_secs(5), Arc::new(StaticToken(token))).unwrap()
    }

    #[tokio::test]
    async fn test_objects_with_bearer() {
        let base = upstream().await;
        let records = feeds(&base, Some("s3cret")).fetch_objects().await.unwrap();
        // validation happens in the catalog, not the client
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["name"], "ISS (ZARYA)");
    }

    #[tokio::test]
    async fn test_rejected_token_is_status_error() {
        let base = upstream().await;
        let err = feeds(&base, Some("wrong")).fetch_objects().await.unwrap_err();
        assert_eq!(
            err,
            TrackingError::Status {
                feed: FeedKind::Objects,
                status: 401
            }
        );
    }

    #[tokio::test]
    async fn test_no_token_no_request() {
        let feeds = feeds("http://127.0.0.1:1", None);
        assert!(!feeds.authorized());
        assert_eq!(
            feeds.fetch_objects().await.unwrap_err(),
            TrackingError::MissingCredential
        );
    }

    #[tokio::test]
    async fn test_warnings_and_path() {
        let base = upstream().await;
        let feeds = feeds(&base, Some("s3cret"));

        let warnings = feeds.fetch_warnings().await.unwrap().into_warnings().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].is_critical());

        let path = feeds.fetch_path("42", 24).await.unwrap();
        assert_eq!(path.len(), 1);
        assert_eq!(path[0].latitude, 42.0);
        assert_eq!(path[0].longitude, 24.0);
    }

    #[tokio::test]
    async fn test_path_id_is_one_segment() {
        let base = upstream().await;
        let feeds = feeds(&base, Some("s3cret"));

        let path = feeds.fetch_path("2020-001/A", 24).await.unwrap();
        assert_eq!(path[0].latitude, 10.0);
        let path = feeds.fetch_path("OBJ#1", 24).await.unwrap();
        assert_eq!(path[0].latitude, 5.0);
        let path = feeds.fetch_path("a?b", 12).await.unwrap();
        assert_eq!(path[0].latitude, 3.0);
        assert_eq!(path[0].longitude, 12.0);
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let feeds = feeds("http://tracker.example/v2/", Some("s3cret"));
        assert_eq!(
            feeds.endpoint(&["api", "satellites", "x/y", "path"]).as_str(),
            "http://tracker.example/v2/api/satellites/x%2Fy/path"
        );
    }

    #[test]
    fn test_invalid_base_rejected() {
        let result = HttpFeeds::new("not a url", Duration::from_secs(1), Arc::new(StaticToken(None)));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_sync_and_decode_error() {
        let base = upstream().await;
        let feeds = feeds(&base, Some("s3cret"));
        feeds.trigger_sync().await.unwrap();

        let err = feeds
            .get_json::<Vec<serde_json::Value>>(FeedKind::Objects, feeds.endpoint(&["broken"]))
            .await
            .unwrap_err();
        assert!(matches!(err, TrackingError::Decode { feed: FeedKind::Objects, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_is_transport_error() {
        let err = feeds("http://127.0.0.1:1", Some("s3cret"))
            .fetch_warnings()
            .await
            .unwrap_err();
        assert!(matches!(err, TrackingError::Transport { feed: FeedKind::Warnings, .. }));
    }
}
