//! Short-lived cache of successful JSON responses.
//!
//! Keys carry the caller's `Origin` next to the full request URI, so a
//! response rendered for one origin is never replayed to another.

use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, HeaderValue, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use moka::{Expiry, future::Cache};

pub const X_CACHE: &str = "x-cache";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    fn as_header(&self) -> HeaderValue {
        match self {
            Self::Hit => HeaderValue::from_static("HIT"),
            Self::Miss => HeaderValue::from_static("MISS"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn from_request(headers: &HeaderMap, uri: &Uri) -> Self {
        let header_str = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
        };
        let origin = header_str(header::ORIGIN);
        let host = header_str(header::HOST);
        Self(format!("{origin}|{host}{uri}"))
    }
}

/// A rendered 200 response body and how long it may be replayed.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    body: Bytes,
    ttl: Duration,
}

impl CachedResponse {
    pub fn json<T: serde::Serialize>(value: &T, ttl: Duration) -> serde_json::Result<Self> {
        Ok(Self {
            body: Bytes::from(serde_json::to_vec(value)?),
            ttl,
        })
    }

    pub fn into_response(self, status: CacheStatus) -> Response {
        let cache_control = format!("public, max-age={}", self.ttl.as_secs());
        let mut response = (StatusCode::OK, Body::from(self.body)).into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        if let Ok(value) = HeaderValue::from_str(&cache_control) {
            headers.insert(header::CACHE_CONTROL, value);
        }
        headers.insert(X_CACHE, status.as_header());
        response
    }
}

/// Each entry lives for the TTL it was rendered with.
struct PerResponseTtl;

impl Expiry<CacheKey, CachedResponse> for PerResponseTtl {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &CachedResponse,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Bounded response cache. Once `max_entries` is reached moka evicts the
/// least valuable entries, so inserting never fails.
#[derive(Clone)]
pub struct ResponseCache {
    entries: Cache<CacheKey, CachedResponse>,
}

impl ResponseCache {
    pub fn new(max_entries: u64) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(max_entries)
                .expire_after(PerResponseTtl)
                .build(),
        }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<CachedResponse> {
        self.entries.get(key).await
    }

    pub async fn insert(&self, key: CacheKey, response: CachedResponse) {
        self.entries.insert(key, response).await;
    }

    /// Entry count after pending evictions have been applied.
    pub async fn len(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }
}
