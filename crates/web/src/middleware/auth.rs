use std::collections::{HashMap, HashSet};

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};

use crate::error::WebError;

/// Identity of the streamer whose key authenticated the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedStreamer {
    pub streamer_id: String,
}

/// Per-streamer API keys, configured as `streamer_id:api_key` pairs.
#[derive(Debug, Clone, Default)]
pub struct StreamerKeys {
    by_key: HashMap<String, String>,
}

impl StreamerKeys {
    pub fn from_comma_separated(pairs: &str) -> Self {
        let by_key = pairs
            .split(',')
            .map(str::trim)
            .filter_map(|pair| pair.split_once(':'))
            .map(|(streamer, key)| (streamer.trim(), key.trim()))
            .filter(|(streamer, key)| !streamer.is_empty() && !key.is_empty())
            .map(|(streamer, key)| (key.to_string(), streamer.to_string()))
            .collect();

        Self { by_key }
    }

    pub fn streamer_for(&self, key: &str) -> Option<&str> {
        self.by_key.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    keys: HashSet<String>,
}

impl ApiKeys {
    pub fn from_comma_separated(keys_str: &str) -> Self {
        let keys = keys_str
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        Self { keys }
    }

    pub fn is_valid(&self, key: &str) -> bool {
        self.keys.contains(key)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

pub async fn require_streamer(
    State(keys): State<StreamerKeys>,
    mut request: Request,
    next: Next,
) -> Result<Response, WebError> {
    let token = bearer_token(request.headers()).ok_or(WebError::Unauthorized)?;
    let streamer_id = keys
        .streamer_for(token)
        .ok_or_else(|| {
            tracing::warn!("Invalid streamer API key attempt");
            WebError::Unauthorized
        })?
        .to_string();

    request
        .extensions_mut()
        .insert(AuthenticatedStreamer { streamer_id });
    Ok(next.run(request).await)
}

pub async fn require_admin(
    State(keys): State<ApiKeys>,
    request: Request,
    next: Next,
) -> Result<Response, WebError> {
    let token = bearer_token(request.headers()).ok_or(WebError::Unauthorized)?;
    if !keys.is_valid(token) {
        tracing::warn!("Invalid admin API key attempt");
        return Err(WebError::Unauthorized);
    }
    Ok(next.run(request).await)
}
