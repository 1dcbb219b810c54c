use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("cache serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// Key-value store with per-entry TTL, the engine's only durable-ish state.
/// A TTL of zero means "no expiry". Single-key operations are atomic; there
/// are no cross-key transactions, and last write wins.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
    /// Removes a plain entry or a whole hash. Absent keys are a no-op.
    fn delete(&self, key: &str) -> Result<()>;
    fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>>;
    fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<()>;
}

enum Slot {
    Plain(String),
    Hash(HashMap<String, String>),
}

struct Entry {
    slot: Slot,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// In-memory backend with lazy expiry: entries are dropped when a read finds
/// them past their deadline, not by a background sweeper.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Entry>>> {
        self.entries
            .lock()
            .map_err(|_| CacheError::Backend("cache mutex poisoned".to_string()))
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => match &entry.slot {
                Slot::Plain(value) => Ok(Some(value.clone())),
                Slot::Hash(_) => Ok(None),
            },
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let expires_at = if ttl.is_zero() {
            None
        } else {
            Some(Instant::now() + ttl)
        };
        self.lock()?.insert(
            key.to_string(),
            Entry {
                slot: Slot::Plain(value.to_string()),
                expires_at,
            },
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>> {
        let mut entries = self.lock()?;
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => match &entry.slot {
                Slot::Hash(fields) => Ok(fields.get(field).cloned()),
                Slot::Plain(_) => Ok(None),
            },
            None => Ok(None),
        }
    }

    fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<()> {
        let mut entries = self.lock()?;
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            slot: Slot::Hash(HashMap::new()),
            expires_at: None,
        });
        if !matches!(entry.slot, Slot::Hash(_)) {
            entry.slot = Slot::Hash(HashMap::new());
            entry.expires_at = None;
        }
        if let Slot::Hash(fields) = &mut entry.slot {
            fields.insert(field.to_string(), value.to_string());
        }
        Ok(())
    }
}
