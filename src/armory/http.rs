use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::armory::{ArmoryApi, CollectionDetails};
use crate::cache::{Cache, MemoryCache};
use crate::collection::coerce_string;
use crate::config::Config;
use crate::error::INVALID_JSON_PREFIX;
use crate::logging::{log_cache_hit, log_fetch};

/// reqwest-backed armory client. Each of the two endpoints gets its own
/// response cache so a compare of two characters costs at most four requests
/// and repeats within the TTL cost none.
pub struct HttpArmoryClient {
    client: Client,
    base_url: String,
    idx_cache: Option<Arc<dyn Cache<Option<i64>>>>,
    details_cache: Option<Arc<dyn Cache<CollectionDetails>>>,
}

impl HttpArmoryClient {
    pub fn new(cfg: &Config) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(cfg.request_timeout_secs))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: cfg.base_url.clone(),
            idx_cache: Some(Arc::new(MemoryCache::with_ttl_secs(cfg.cache_ttl_secs))),
            details_cache: Some(Arc::new(MemoryCache::with_ttl_secs(cfg.cache_ttl_secs))),
        }
    }

    /// Client with response caching disabled; every call hits the network.
    pub fn without_cache(cfg: &Config) -> Self {
        let mut client = Self::new(cfg);
        client.idx_cache = None;
        client.details_cache = None;
        client
    }

    pub fn with_idx_cache(mut self, cache: Arc<dyn Cache<Option<i64>>>) -> Self {
        self.idx_cache = Some(cache);
        self
    }

    pub fn with_details_cache(mut self, cache: Arc<dyn Cache<CollectionDetails>>) -> Self {
        self.details_cache = Some(cache);
        self
    }

    /// GET a URL and parse the body as JSON. The status code is not checked:
    /// an upstream error page that is not JSON surfaces as the invalid-JSON
    /// error, and a JSON error body flows through the lenient decoders.
    async fn get_json(&self, url: &str, query: Option<(&str, &str)>) -> Result<Value> {
        let started = Instant::now();
        let mut request = self.client.get(url).header("Accept", "application/json");
        if let Some((key, value)) = query {
            request = request.query(&[(key, value)]);
        }
        let resp = request.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        log_fetch(url, status, started.elapsed().as_secs_f64() * 1000.0);
        serde_json::from_str(&body).map_err(|e| anyhow!("{} {}", INVALID_JSON_PREFIX, e))
    }
}

fn cache_key(operation: &str, argument: &str) -> String {
    format!("armory_client:{}:{}", operation, argument)
}

#[async_trait::async_trait]
impl ArmoryApi for HttpArmoryClient {
    async fn fetch_character_idx(&self, name: &str) -> Result<Option<i64>> {
        let key = cache_key("character_idx", &name.to_lowercase());
        if let Some(cache) = &self.idx_cache {
            if let Some(hit) = cache.get(&key) {
                log_cache_hit(&key);
                return Ok(hit);
            }
        }

        let url = format!("{}/api/website/armory", self.base_url);
        let parsed = self.get_json(&url, Some(("name", name))).await?;
        let idx = parsed
            .pointer("/character/characterIdx")
            .and_then(Value::as_i64);

        if let Some(cache) = &self.idx_cache {
            // Negative lookups are cached too, so unknown names do not hammer
            // the API on every page refresh.
            cache.put(&key, idx);
        }
        Ok(idx)
    }

    async fn fetch_collection_details(&self, character_idx: i64) -> Result<CollectionDetails> {
        let key = cache_key("collection_details", &character_idx.to_string());
        if let Some(cache) = &self.details_cache {
            if let Some(hit) = cache.get(&key) {
                log_cache_hit(&key);
                return Ok(hit);
            }
        }

        let url = format!(
            "{}/api/website/armory/collection/{}",
            self.base_url, character_idx
        );
        let parsed = self.get_json(&url, None).await?;
        let details = decode_details(&parsed);

        if let Some(cache) = &self.details_cache {
            cache.put(&key, details.clone());
        }
        Ok(details)
    }
}

/// Missing keys default to empty. `values` entries are coerced to trimmed
/// strings here, so the parser only ever sees `Vec<String>`; null entries
/// are dropped.
fn decode_details(parsed: &Value) -> CollectionDetails {
    let values = parsed
        .get("values")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter(|v| !v.is_null())
                .map(|v| coerce_string(Some(v)).trim().to_string())
                .collect()
        })
        .unwrap_or_default();
    let data = parsed
        .get("data")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    CollectionDetails { values, data }
}

// =============================================================================
// Tests
// =============================================================================
