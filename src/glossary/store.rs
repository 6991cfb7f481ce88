//! DictionaryStore: paged persistence of the glossary snapshot
//!
//! Browser extension storage caps the size of a single value, so the content
//! list is split into fixed-size pages. A separate index key lists page keys
//! in order, and a timestamp key drives the refresh schedule.
//!
//! Layout:
//! ```text
//! glossary_meta_keys     -> ["glossary_chunk_0", "glossary_chunk_50", ...]
//! glossary_chunk_0       -> [item, item, ...]   (<= page size items)
//! glossary_last_updated  -> 1760000000000       (ms since epoch)
//! ```
//!
//! Matching code only ever sees `load_all()`; page layout stays private here.

use serde_json::Value;
use std::collections::HashMap;

use crate::config::{LAST_UPDATED_KEY, PAGE_INDEX_KEY, PAGE_KEY_PREFIX, REFRESH_INTERVAL_MS, STORAGE_PAGE_SIZE};
use crate::error::GlossError;
use crate::glossary::entry::{decode_entries, GlossaryEntry};

// =============================================================================
// Blob store interface
// =============================================================================

/// Key-value blob storage with a per-value size cap (extension local storage)
pub trait PagedStore {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value);
    fn remove(&mut self, key: &str);
}

/// In-memory store, used natively and as the wasm-side cache the content
/// script fills from extension storage
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    items: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Fill from a storage dump (`chrome.storage.local.get(null)`).
    /// Non-object snapshots give an empty store.
    pub fn from_snapshot(snapshot: Value) -> Self {
        let items = match snapshot {
            Value::Object(map) => map.into_iter().collect(),
            _ => HashMap::new(),
        };
        Self { items }
    }

    pub fn to_snapshot(&self) -> Value {
        Value::Object(self.items.clone().into_iter().collect())
    }
}

impl PagedStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.items.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        self.items.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.items.remove(key);
    }
}

// =============================================================================
// DictionaryStore
// =============================================================================

pub struct DictionaryStore<S: PagedStore> {
    store: S,
    page_size: usize,
}

impl<S: PagedStore> DictionaryStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            page_size: STORAGE_PAGE_SIZE,
        }
    }

    pub fn with_page_size(store: S, page_size: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
        }
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Validate a fetched response and replace the snapshot.
    ///
    /// Fails closed: on a non-2xx status or a payload that is not a JSON array
    /// the previous snapshot is left untouched and `false` is returned.
    pub fn ingest_response(&mut self, status: u16, body: &str, now_ms: i64) -> bool {
        match Self::parse_payload(status, body) {
            Ok(items) => {
                let pages = self.store_items(&items, now_ms);
                log_info!(
                    "[DictionaryStore] Stored {} items in {} pages",
                    items.len(),
                    pages.len()
                );
                true
            }
            Err(e) => {
                log_error!("[DictionaryStore] Glossary update failed: {}", e);
                false
            }
        }
    }

    fn parse_payload(status: u16, body: &str) -> Result<Vec<Value>, GlossError> {
        if !(200..300).contains(&status) {
            return Err(GlossError::Retrieval(format!("HTTP {}", status)));
        }
        match serde_json::from_str::<Value>(body)? {
            Value::Array(items) => Ok(items),
            _ => Err(GlossError::Retrieval("Invalid data format".to_string())),
        }
    }

    /// Split items into pages and persist them. The index is written before
    /// the pages so a torn write leaves missing pages, which `load_all` skips.
    pub fn store_items(&mut self, items: &[Value], now_ms: i64) -> Vec<String> {
        let previous = self.page_keys().unwrap_or_default();

        let mut keys = Vec::new();
        let mut pages = Vec::new();
        for (page_idx, page) in items.chunks(self.page_size).enumerate() {
            keys.push(format!("{}{}", PAGE_KEY_PREFIX, page_idx * self.page_size));
            pages.push(Value::Array(page.to_vec()));
        }

        self.store.set(
            PAGE_INDEX_KEY,
            Value::Array(keys.iter().cloned().map(Value::String).collect()),
        );
        self.store.set(LAST_UPDATED_KEY, Value::from(now_ms));

        for (key, page) in keys.iter().zip(pages) {
            self.store.set(key, page);
        }

        for stale in previous.iter().filter(|k| !keys.contains(k)) {
            self.store.remove(stale);
        }

        keys
    }

    fn page_keys(&self) -> Result<Vec<String>, GlossError> {
        let index = self.store.get(PAGE_INDEX_KEY).ok_or_else(|| GlossError::StorageRead {
            key: PAGE_INDEX_KEY.to_string(),
            reason: "no glossary data found".to_string(),
        })?;

        match index {
            Value::Array(keys) => Ok(keys
                .into_iter()
                .filter_map(|k| k.as_str().map(str::to_string))
                .collect()),
            _ => Err(GlossError::StorageRead {
                key: PAGE_INDEX_KEY.to_string(),
                reason: "index is not an array".to_string(),
            }),
        }
    }

    fn read_page(&self, key: &str) -> Result<Vec<Value>, GlossError> {
        match self.store.get(key) {
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(GlossError::StorageRead {
                key: key.to_string(),
                reason: "page is not an array".to_string(),
            }),
            None => Err(GlossError::StorageRead {
                key: key.to_string(),
                reason: "page missing".to_string(),
            }),
        }
    }

    /// Reassemble the full entry list in page order.
    ///
    /// Never fails: a missing index yields an empty list, a missing or corrupt
    /// page drops that page only, a malformed item drops that item only.
    pub fn load_all(&self) -> Vec<GlossaryEntry> {
        let keys = match self.page_keys() {
            Ok(keys) => keys,
            Err(e) => {
                log_warn!("[DictionaryStore] {}", e);
                return Vec::new();
            }
        };

        let mut items = Vec::new();
        for key in &keys {
            match self.read_page(key) {
                Ok(page) => items.extend(page),
                Err(e) => log_warn!("[DictionaryStore] {}", e),
            }
        }

        decode_entries(&items)
    }

    pub fn last_updated(&self) -> Option<i64> {
        self.store.get(LAST_UPDATED_KEY).and_then(|v| v.as_i64())
    }

    /// True when no refresh has ever succeeded or the last one is older
    /// than the refresh interval
    pub fn is_stale(&self, now_ms: i64) -> bool {
        match self.last_updated() {
            None => true,
            Some(ts) => now_ms - ts > REFRESH_INTERVAL_MS,
        }
    }

    /// Drop every stored page, the index and the timestamp
    pub fn clear(&mut self) {
        for key in self.page_keys().unwrap_or_default() {
            self.store.remove(&key);
        }
        self.store.remove(PAGE_INDEX_KEY);
        self.store.remove(LAST_UPDATED_KEY);
    }
}

/// Current wall-clock time in ms, as used for the refresh timestamp
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(i: usize) -> Value {
        json!({
            "name": format!("Term {}", i),
            "content_type": "glossary",
            "overview": "",
            "url": format!("/glossary/term-{}", i)
        })
    }

    fn body(n: usize) -> String {
        serde_json::to_string(&(0..n).map(item).collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn test_ingest_pages_and_load_all() {
        let mut dict = DictionaryStore::new(MemoryStore::new());
        assert!(dict.ingest_response(200, &body(120), 1_000));

        let index = dict.inner().get(PAGE_INDEX_KEY).unwrap();
        assert_eq!(
            index,
            json!(["glossary_chunk_0", "glossary_chunk_50", "glossary_chunk_100"])
        );
        assert_eq!(
            dict.inner().get("glossary_chunk_100").unwrap().as_array().unwrap().len(),
            20
        );

        let entries = dict.load_all();
        assert_eq!(entries.len(), 120);
        assert_eq!(entries[0].name, "Term 0");
        assert_eq!(entries[119].name, "Term 119");
        assert_eq!(dict.last_updated(), Some(1_000));
    }

    #[test]
    fn test_non_2xx_keeps_previous_snapshot() {
        let mut dict = DictionaryStore::new(MemoryStore::new());
        assert!(dict.ingest_response(200, &body(3), 1_000));

        assert!(!dict.ingest_response(503, &body(10), 2_000));
        assert_eq!(dict.load_all().len(), 3);
        assert_eq!(dict.last_updated(), Some(1_000));
    }

    #[test]
    fn test_non_array_payload_fails_closed() {
        let mut dict = DictionaryStore::new(MemoryStore::new());
        assert!(dict.ingest_response(200, &body(2), 1_000));

        assert!(!dict.ingest_response(200, r#"{"items": []}"#, 2_000));
        assert!(!dict.ingest_response(200, "not json", 2_000));
        assert_eq!(dict.load_all().len(), 2);
    }

    #[test]
    fn test_corrupt_page_is_skipped() {
        let mut dict = DictionaryStore::new(MemoryStore::new());
        dict.ingest_response(200, &body(120), 1_000);

        dict.inner_mut().set("glossary_chunk_50", json!({"oops": true}));

        let entries = dict.load_all();
        assert_eq!(entries.len(), 70);
        assert_eq!(entries[49].name, "Term 49");
        assert_eq!(entries[50].name, "Term 100");
    }

    #[test]
    fn test_missing_page_and_missing_index() {
        let mut dict = DictionaryStore::new(MemoryStore::new());
        assert!(dict.load_all().is_empty());

        dict.ingest_response(200, &body(60), 1_000);
        dict.inner_mut().remove("glossary_chunk_0");
        assert_eq!(dict.load_all().len(), 10);
    }

    #[test]
    fn test_shrinking_refresh_removes_old_pages() {
        let mut dict = DictionaryStore::new(MemoryStore::new());
        dict.ingest_response(200, &body(120), 1_000);
        dict.ingest_response(200, &body(10), 2_000);

        assert!(dict.inner().get("glossary_chunk_50").is_none());
        assert!(dict.inner().get("glossary_chunk_100").is_none());
        assert_eq!(dict.load_all().len(), 10);
    }

    #[test]
    fn test_is_stale() {
        let mut dict = DictionaryStore::new(MemoryStore::new());
        assert!(dict.is_stale(0));

        dict.ingest_response(200, &body(1), 1_000);
        assert!(!dict.is_stale(1_000 + REFRESH_INTERVAL_MS));
        assert!(dict.is_stale(1_001 + REFRESH_INTERVAL_MS));
    }

    #[test]
    fn test_snapshot_round_trip_through_extension_storage() {
        let mut dict = DictionaryStore::new(MemoryStore::new());
        dict.ingest_response(200, &body(60), 1_000);

        let snapshot = dict.inner().to_snapshot();
        assert_eq!(snapshot["glossary_last_updated"], json!(1_000));

        let reloaded = DictionaryStore::new(MemoryStore::from_snapshot(snapshot));
        assert_eq!(reloaded.load_all().len(), 60);
        assert!(MemoryStore::from_snapshot(json!(null)).is_empty());
    }

    #[test]
    fn test_clear() {
        let mut dict = DictionaryStore::with_page_size(MemoryStore::new(), 2);
        dict.ingest_response(200, &body(5), 1_000);
        assert_eq!(dict.inner().len(), 5); // index + timestamp + 3 pages

        dict.clear();
        assert!(dict.inner().is_empty());
    }
}
