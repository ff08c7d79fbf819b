use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::ResponseCache;
use crate::http::{HttpError, RetryPolicy, get_text};
use crate::player::Episode;
use crate::player::episode::parse_published_at;

const LISTING_REVALIDATE_HOURS: i64 = 8;
const DETAIL_REVALIDATE_HOURS: i64 = 24;

/// Episode as served by the content API.
#[derive(Debug, Clone, Deserialize)]
pub struct EpisodeRecord {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub members: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub published_at: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub duration: Value,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("content API request failed: {0}")]
    Request(#[from] HttpError),
    #[error("content API returned an unexpected payload: {0}")]
    Decode(String),
    #[error("episode not found: {0}")]
    NotFound(String),
}

pub struct ContentApi {
    base_url: String,
    policy: RetryPolicy,
    cache: Option<ResponseCache>,
    refresh: bool,
}

impl ContentApi {
    pub fn new(base_url: impl Into<String>, cache: Option<ResponseCache>, refresh: bool) -> Self {
        Self {
            base_url: base_url.into(),
            policy: RetryPolicy::default(),
            cache,
            refresh,
        }
    }

    /// Newest first, at most `limit` episodes. `refresh` skips a fresh
    /// cache entry for this call only.
    pub fn fetch_latest(&self, limit: usize, refresh: bool) -> Result<Vec<Episode>, ApiError> {
        let query = [
            ("limit", limit.to_string()),
            ("order", "-published_at".to_string()),
        ];
        let body = self.cached_get(
            &format!("latest:{limit}"),
            LISTING_REVALIDATE_HOURS,
            refresh,
            &query,
        )?;
        let mut records = parse_records(&body)?;
        sort_newest_first(&mut records);
        records.truncate(limit);
        Ok(records.into_iter().map(Episode::from_record).collect())
    }

    pub fn fetch_episode(&self, slug: &str) -> Result<Episode, ApiError> {
        let query = [("name", slug.to_string())];
        let body = self
            .cached_get(&format!("episode:{slug}"), DETAIL_REVALIDATE_HOURS, false, &query)
            .map_err(|err| match err {
                ApiError::Request(http) if http.status() == Some(404) => {
                    ApiError::NotFound(slug.to_string())
                }
                other => other,
            })?;
        parse_records(&body)?
            .into_iter()
            .find(|record| record.name == slug)
            .map(Episode::from_record)
            .ok_or_else(|| ApiError::NotFound(slug.to_string()))
    }

    fn cached_get(
        &self,
        key: &str,
        revalidate_hours: i64,
        refresh: bool,
        query: &[(&str, String)],
    ) -> Result<String, ApiError> {
        resolve_cached(
            self.cache.as_ref(),
            key,
            chrono::Duration::hours(revalidate_hours),
            self.refresh || refresh,
            || get_text(&self.base_url, query, &self.policy),
        )
    }
}

/// Fresh cache hits skip the network; stale entries are the fallback when
/// the fetch fails.
pub(crate) fn resolve_cached<F>(
    cache: Option<&ResponseCache>,
    key: &str,
    window: chrono::Duration,
    refresh: bool,
    fetch: F,
) -> Result<String, ApiError>
where
    F: FnOnce() -> Result<String, HttpError>,
{
    let now = Utc::now();
    let cached = cache.and_then(|cache| match cache.get(key) {
        Ok(entry) => entry,
        Err(err) => {
            warn!(key, error = %err, "cache read failed");
            None
        }
    });

    if !refresh
        && let Some(entry) = cached.as_ref()
        && entry.is_fresh(window, now)
    {
        debug!(key, "serving fresh cache entry");
        return Ok(entry.body.clone());
    }

    match fetch() {
        Ok(body) => {
            if let Some(cache) = cache
                && let Err(err) = cache.put(key, &body, now)
            {
                warn!(key, error = %err, "cache write failed");
            }
            Ok(body)
        }
        Err(err) => match cached {
            Some(entry) => {
                warn!(key, error = %err, "fetch failed, serving stale cache entry");
                Ok(entry.body)
            }
            None => Err(ApiError::Request(err)),
        },
    }
}

/// Accepts a bare array or a `{ "results": [...] }` page.
pub(crate) fn parse_records(body: &str) -> Result<Vec<EpisodeRecord>, ApiError> {
    let value: Value =
        serde_json::from_str(body).map_err(|err| ApiError::Decode(err.to_string()))?;
    let list = match value {
        Value::Array(items) => Value::Array(items),
        Value::Object(mut object) => object
            .remove("results")
            .filter(Value::is_array)
            .ok_or_else(|| ApiError::Decode("missing `results` array".to_string()))?,
        other => {
            return Err(ApiError::Decode(format!(
                "expected array or object, got {other}"
            )));
        }
    };
    serde_json::from_value(list).map_err(|err| ApiError::Decode(err.to_string()))
}

fn sort_newest_first(records: &mut [EpisodeRecord]) {
    records.sort_by(|left, right| {
        parse_published_at(&right.published_at).cmp(&parse_published_at(&left.published_at))
    });
}
