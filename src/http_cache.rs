use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use serde::{Deserialize, Serialize};
use tracing::debug;

const CACHE_VERSION: u32 = 1;
const CACHE_DIR: &str = "matchday_features";
const CACHE_FILE: &str = "http_cache.json";

static CACHE: Mutex<Option<HttpCacheFile>> = Mutex::new(None);

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct HttpCacheFile {
    version: u32,
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    body: String,
    etag: Option<String>,
    last_modified: Option<String>,
    fetched_at: u64,
}

impl CacheEntry {
    fn is_fresh(&self, max_age: Duration) -> bool {
        let now = system_time_to_secs(SystemTime::now()).unwrap_or_default();
        now.saturating_sub(self.fetched_at) <= max_age.as_secs()
    }
}

/// GET with an on-disk body cache. Entries younger than `max_age` are served
/// without a request; older ones are revalidated with ETag / Last-Modified.
pub fn fetch_text_cached(client: &Client, url: &str, max_age: Option<Duration>) -> Result<String> {
    let cached_entry = {
        let mut guard = lock_cache();
        let cache = guard.get_or_insert_with(load_cache_file);
        cache.entries.get(url).cloned()
    };

    if let (Some(entry), Some(max_age)) = (cached_entry.as_ref(), max_age)
        && entry.is_fresh(max_age)
    {
        debug!(url, "serving cached body");
        return Ok(entry.body.clone());
    }

    let mut req = client.get(url);
    if let Some(entry) = cached_entry.as_ref() {
        if let Some(etag) = entry.etag.as_ref() {
            req = req.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = entry.last_modified.as_ref() {
            req = req.header(IF_MODIFIED_SINCE, last_modified);
        }
    }

    let resp = req.send().with_context(|| format!("request failed: {url}"))?;
    let status = resp.status();
    let headers = resp.headers().clone();
    if status == StatusCode::NOT_MODIFIED {
        if let Some(mut entry) = cached_entry {
            debug!(url, "not modified");
            entry.fetched_at = system_time_to_secs(SystemTime::now()).unwrap_or_default();
            refresh_cache_entry(url, entry.clone());
            return Ok(entry.body);
        }
        return Err(anyhow!("received 304 without cache body"));
    }

    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(anyhow!("http {status} for {url}"));
    }

    let etag = headers
        .get(ETAG)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let last_modified = headers
        .get(LAST_MODIFIED)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    let entry = CacheEntry {
        body: body.clone(),
        etag,
        last_modified,
        fetched_at: system_time_to_secs(SystemTime::now()).unwrap_or_default(),
    };
    refresh_cache_entry(url, entry);
    Ok(body)
}

fn lock_cache() -> MutexGuard<'static, Option<HttpCacheFile>> {
    CACHE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn refresh_cache_entry(key: &str, entry: CacheEntry) {
    let mut guard = lock_cache();
    let cache = guard.get_or_insert_with(load_cache_file);
    cache.version = CACHE_VERSION;
    cache.entries.insert(key.to_string(), entry);
    if let Err(err) = save_cache_file(cache) {
        debug!(error = %err, "http cache not saved");
    }
}

fn load_cache_file() -> HttpCacheFile {
    let Some(path) = cache_path() else {
        return HttpCacheFile::default();
    };
    let Ok(raw) = fs::read_to_string(path) else {
        return HttpCacheFile::default();
    };
    let cache = serde_json::from_str::<HttpCacheFile>(&raw).unwrap_or_default();
    if cache.version != CACHE_VERSION {
        return HttpCacheFile::default();
    }
    cache
}

fn save_cache_file(cache: &HttpCacheFile) -> Result<()> {
    let Some(path) = cache_path() else {
        return Ok(());
    };
    let Some(dir) = path.parent() else {
        return Ok(());
    };
    fs::create_dir_all(dir).ok();
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(cache).context("serialize http cache")?;
    fs::write(&tmp, json).context("write http cache")?;
    fs::rename(&tmp, &path).context("swap http cache")?;
    Ok(())
}

pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

fn cache_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(CACHE_FILE))
}

fn system_time_to_secs(time: SystemTime) -> Option<u64> {
    time.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(fetched_at: u64) -> CacheEntry {
        CacheEntry {
            body: "{}".to_string(),
            etag: Some("\"abc\"".to_string()),
            last_modified: None,
            fetched_at,
        }
    }

    #[test]
    fn freshness_follows_max_age() {
        let now = system_time_to_secs(SystemTime::now()).unwrap();
        assert!(entry(now).is_fresh(Duration::from_secs(60)));
        assert!(entry(now - 30).is_fresh(Duration::from_secs(60)));
        assert!(!entry(now - 3600).is_fresh(Duration::from_secs(60)));
        assert!(!entry(0).is_fresh(Duration::from_secs(24 * 60 * 60)));
    }

    #[test]
    fn cache_file_round_trips_entries() {
        let mut cache = HttpCacheFile {
            version: CACHE_VERSION,
            ..HttpCacheFile::default()
        };
        cache
            .entries
            .insert("https://example.org/de.1.json".to_string(), entry(42));
        let json = serde_json::to_string(&cache).unwrap();
        let back: HttpCacheFile = serde_json::from_str(&json).unwrap();
        let stored = &back.entries["https://example.org/de.1.json"];
        assert_eq!(stored.fetched_at, 42);
        assert_eq!(stored.etag.as_deref(), Some("\"abc\""));
    }
}
