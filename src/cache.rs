use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

#[derive(Debug, Clone)]
pub struct CachedBody {
    pub body: String,
    pub fetched_at: DateTime<Utc>,
}

impl CachedBody {
    pub fn is_fresh(&self, window: chrono::Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.fetched_at) < window
    }
}

/// Raw API responses keyed by request, revalidated by age.
pub struct ResponseCache {
    conn: Connection,
}

impl ResponseCache {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create cache directory {}", parent.display())
            })?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open cache at {}", path.display()))?;
        let cache = Self { conn };
        cache.migrate()?;
        Ok(cache)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let cache = Self {
            conn: Connection::open_in_memory()?,
        };
        cache.migrate()?;
        Ok(cache)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS api_cache (
                key TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                fetched_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<CachedBody>> {
        let row = self
            .conn
            .query_row(
                "SELECT body, fetched_at FROM api_cache WHERE key = ?1",
                params![key],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        let Some((body, fetched_at)) = row else {
            return Ok(None);
        };
        let fetched_at = DateTime::parse_from_rfc3339(&fetched_at)
            .with_context(|| format!("corrupt cache timestamp for {key}: {fetched_at}"))?
            .with_timezone(&Utc);
        Ok(Some(CachedBody { body, fetched_at }))
    }

    pub fn put(&self, key: &str, body: &str, fetched_at: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO api_cache (key, body, fetched_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                body = excluded.body,
                fetched_at = excluded.fetched_at
            "#,
            params![key, body, fetched_at.to_rfc3339()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn put_then_get_overwrites_previous_body() {
        let cache = ResponseCache::open_in_memory().expect("cache opens");
        let first = Utc::now() - Duration::hours(3);
        cache.put("latest:12", "[1]", first).expect("first put");
        cache.put("latest:12", "[2]", Utc::now()).expect("second put");

        let cached = cache.get("latest:12").expect("query").expect("row exists");
        assert_eq!(cached.body, "[2]");
        assert!(cached.fetched_at > first);
        assert!(cache.get("episode:nope").expect("query").is_none());
    }

    #[test]
    fn freshness_respects_window() {
        let now = Utc::now();
        let cached = CachedBody {
            body: String::new(),
            fetched_at: now - Duration::hours(9),
        };
        assert!(!cached.is_fresh(Duration::hours(8), now));
        assert!(cached.is_fresh(Duration::hours(24), now));
    }
}
