//! Cache Storage
//!
//! Named, versioned cache generations holding request/response snapshots.
//! Entries are immutable: a put replaces the whole entry under the storage
//! write lock, so concurrent readers only ever see complete entries.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use spin::RwLock;

use crate::error::CacheError;
use crate::http::{Request, RequestMethod, Response};

/// Storage shared between every worker version of one origin.
pub type SharedCacheStorage = Arc<RwLock<CacheStorage>>;

/// A cached request-response pair
#[derive(Debug, Clone)]
struct CacheEntry {
    /// The request URL
    url: String,
    /// The response
    response: Response,
    /// Size in bytes
    size: usize,
}

/// One cache generation
#[derive(Debug)]
pub struct Cache {
    /// Cache name
    name: String,
    /// Cached entries (key -> entry)
    entries: BTreeMap<String, CacheEntry>,
    /// Keys in insertion order, oldest first
    order: VecDeque<String>,
    /// Entry bound; oldest entries are evicted past it
    max_entries: Option<usize>,
    /// Total size in bytes
    total_size: usize,
}

impl Cache {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: BTreeMap::new(),
            order: VecDeque::new(),
            max_entries: None,
            total_size: 0,
        }
    }

    /// Get cache name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bound the number of entries
    pub fn set_max_entries(&mut self, max_entries: Option<usize>) {
        self.max_entries = max_entries;
        self.evict_overflow();
    }

    /// Look up a request
    pub fn match_request(&self, request: &Request) -> Option<Response> {
        if request.method != RequestMethod::Get {
            return None;
        }
        self.entries
            .get(&request.cache_key())
            .map(|e| e.response.clone())
    }

    pub fn contains(&self, request: &Request) -> bool {
        self.entries.contains_key(&request.cache_key())
    }

    /// Store a response, replacing any previous entry for the request.
    fn put(&mut self, request: &Request, response: Response) -> Result<(), CacheError> {
        if request.method != RequestMethod::Get {
            return Err(CacheError::UnsupportedMethod {
                method: request.method.as_str(),
            });
        }

        let key = request.cache_key();
        let size = response.size();

        if let Some(old) = self.entries.remove(&key) {
            self.total_size -= old.size;
            self.order.retain(|k| k != &key);
        }

        self.entries.insert(
            key.clone(),
            CacheEntry {
                url: request.url.clone(),
                response,
                size,
            },
        );
        self.order.push_back(key);
        self.total_size += size;
        self.evict_overflow();

        Ok(())
    }

    /// Delete a cached request
    pub fn delete(&mut self, request: &Request) -> bool {
        let key = request.cache_key();
        match self.entries.remove(&key) {
            Some(entry) => {
                self.total_size -= entry.size;
                self.order.retain(|k| k != &key);
                true
            }
            None => false,
        }
    }

    /// URLs of every cached request, oldest first
    pub fn keys(&self) -> Vec<String> {
        self.order
            .iter()
            .filter_map(|k| self.entries.get(k))
            .map(|e| e.url.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get total size
    pub fn size(&self) -> usize {
        self.total_size
    }

    /// Bytes released by storing `key` under `max_entries`: the entry it
    /// replaces plus the oldest entries the bound would evict.
    fn freed_by_put(&self, key: &str, max_entries: Option<usize>) -> usize {
        let replaced = self.entries.get(key).map_or(0, |e| e.size);
        let Some(max) = max_entries else {
            return replaced;
        };
        let others = self.entries.len() - usize::from(self.entries.contains_key(key));
        let overflow = (others + 1).saturating_sub(max);
        let evicted: usize = self
            .order
            .iter()
            .filter(|k| k.as_str() != key)
            .take(overflow)
            .filter_map(|k| self.entries.get(k))
            .map(|e| e.size)
            .sum();
        replaced + evicted
    }

    fn evict_overflow(&mut self) {
        let Some(max) = self.max_entries else {
            return;
        };
        while self.entries.len() > max {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if let Some(entry) = self.entries.remove(&oldest) {
                self.total_size -= entry.size;
                log::debug!("[SW Cache] {}: evicted {}", self.name, entry.url);
            }
        }
    }
}

/// Cache storage (manages every generation of one origin)
#[derive(Debug)]
pub struct CacheStorage {
    /// Caches by name
    caches: BTreeMap<String, Cache>,
    /// Quota (bytes)
    quota: usize,
    /// Bumped whenever a whole generation is deleted
    epoch: u64,
}

impl CacheStorage {
    /// Create new cache storage with the given quota
    pub fn new(quota: usize) -> Self {
        Self {
            caches: BTreeMap::new(),
            quota,
            epoch: 0,
        }
    }

    /// Wrap in the shared handle workers use
    pub fn shared(quota: usize) -> SharedCacheStorage {
        Arc::new(RwLock::new(Self::new(quota)))
    }

    /// Open or create a cache
    pub fn open(&mut self, name: &str) -> &mut Cache {
        self.caches
            .entry(name.to_string())
            .or_insert_with(|| Cache::new(name))
    }

    /// Get a cache without creating it
    pub fn get(&self, name: &str) -> Option<&Cache> {
        self.caches.get(name)
    }

    /// Check if a cache exists
    pub fn has(&self, name: &str) -> bool {
        self.caches.contains_key(name)
    }

    /// Delete a cache
    pub fn delete(&mut self, name: &str) -> bool {
        let removed = self.caches.remove(name).is_some();
        if removed {
            self.epoch += 1;
        }
        removed
    }

    /// Delete every cache, returning the names removed
    pub fn clear(&mut self) -> Vec<String> {
        let names = self.keys();
        self.caches.clear();
        self.epoch += 1;
        names
    }

    /// Get all cache names
    pub fn keys(&self) -> Vec<String> {
        self.caches.keys().cloned().collect()
    }

    /// Deletion counter. A writer that sampled an older value is writing
    /// into a generation that has since been deleted.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Store into the named cache, creating it if needed. Fails without
    /// touching the cache if the write would exceed the quota.
    pub fn put(
        &mut self,
        name: &str,
        request: &Request,
        response: Response,
    ) -> Result<(), CacheError> {
        let max_entries = self.caches.get(name).and_then(|c| c.max_entries);
        self.put_bounded(name, request, response, max_entries)
    }

    /// Store into the named cache under an entry bound. Entries the bound
    /// is about to evict count as free space for the quota check.
    pub fn put_bounded(
        &mut self,
        name: &str,
        request: &Request,
        response: Response,
        max_entries: Option<usize>,
    ) -> Result<(), CacheError> {
        if request.method != RequestMethod::Get {
            return Err(CacheError::UnsupportedMethod {
                method: request.method.as_str(),
            });
        }
        let freed = self
            .caches
            .get(name)
            .map(|c| c.freed_by_put(&request.cache_key(), max_entries))
            .unwrap_or(0);
        let needed = response.size();
        let available = self.quota.saturating_sub(self.usage().saturating_sub(freed));
        if needed > available {
            return Err(CacheError::QuotaExceeded { needed, available });
        }

        let cache = self.open(name);
        cache.max_entries = max_entries;
        cache.put(request, response)
    }

    /// Store a batch into the named cache. Either every pair is written or,
    /// on error, none is.
    pub fn put_all(
        &mut self,
        name: &str,
        pairs: Vec<(Request, Response)>,
    ) -> Result<(), CacheError> {
        if let Some((request, _)) = pairs.iter().find(|(r, _)| r.method != RequestMethod::Get) {
            return Err(CacheError::UnsupportedMethod {
                method: request.method.as_str(),
            });
        }
        let needed: usize = pairs.iter().map(|(_, r)| r.size()).sum();
        let replaced: usize = self
            .caches
            .get(name)
            .map(|c| {
                pairs
                    .iter()
                    .filter_map(|(req, _)| c.entries.get(&req.cache_key()))
                    .map(|e| e.size)
                    .sum()
            })
            .unwrap_or(0);
        let available = self.quota.saturating_sub(self.usage().saturating_sub(replaced));
        if needed > available {
            return Err(CacheError::QuotaExceeded { needed, available });
        }

        let cache = self.open(name);
        for (request, response) in pairs {
            cache.put(&request, response)?;
        }
        Ok(())
    }

    /// Look up a request in the named caches, in order
    pub fn match_in(&self, names: &[&str], request: &Request) -> Option<Response> {
        names
            .iter()
            .filter_map(|name| self.caches.get(*name))
            .find_map(|cache| cache.match_request(request))
    }

    /// Look up a request across every cache
    pub fn match_any(&self, request: &Request) -> Option<Response> {
        self.caches
            .values()
            .find_map(|cache| cache.match_request(request))
    }

    /// Get quota
    pub fn quota(&self) -> usize {
        self.quota
    }

    /// Get usage
    pub fn usage(&self) -> usize {
        self.caches.values().map(|c| c.size()).sum()
    }
}
