//! Persistent cache of remote subject listings using redb
//!
//! Listing a release bucket is slow, and the set of released subjects
//! practically never changes, so the enumerated ids are stored per
//! `database/release` with a TTL.

use hcpdata_core::{Error, Result, SubjectId};
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// TTL for cached listings (30 days)
const LISTING_TTL_SECS: u64 = 30 * 24 * 60 * 60;

const SUBJECT_LISTINGS: TableDefinition<&str, &[u8]> = TableDefinition::new("subject_listings");

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

fn cache_err(e: impl std::fmt::Display) -> Error {
    Error::cache(e.to_string())
}

/// Cached entry with timestamp; bincode puts the timestamp in the first 8 bytes
#[derive(Serialize, Deserialize, Debug, Clone)]
struct CacheEntry<T> {
    timestamp: u64,
    data: T,
}

impl<T> CacheEntry<T> {
    fn new(data: T) -> Self {
        Self {
            timestamp: now_secs(),
            data,
        }
    }

    fn is_expired(&self, ttl_secs: u64) -> bool {
        now_secs().saturating_sub(self.timestamp) > ttl_secs
    }
}

/// Thread-safe listing cache
pub struct ListingCache {
    db: Mutex<Database>,
    ttl_secs: u64,
}

impl ListingCache {
    /// Open (or create) the cache at `path` with the default 30 day TTL
    pub fn open(path: &Path) -> Result<Self> {
        Self::with_ttl(path, Duration::from_secs(LISTING_TTL_SECS))
    }

    pub fn with_ttl(path: &Path, ttl: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(path).map_err(cache_err)?;
        {
            let write_txn = db.begin_write().map_err(cache_err)?;
            {
                let _ = write_txn.open_table(SUBJECT_LISTINGS).map_err(cache_err)?;
            }
            write_txn.commit().map_err(cache_err)?;
        }

        Ok(Self {
            db: Mutex::new(db),
            ttl_secs: ttl.as_secs(),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|_| Error::cache("listing cache lock poisoned"))
    }

    /// Cached subject ids for a `database/release` key, if fresh
    pub fn get_subjects(&self, release_key: &str) -> Result<Option<BTreeSet<SubjectId>>> {
        let db = self.lock()?;
        let read_txn = db.begin_read().map_err(cache_err)?;
        let table = read_txn.open_table(SUBJECT_LISTINGS).map_err(cache_err)?;

        let Some(value) = table.get(release_key).map_err(cache_err)? else {
            tracing::debug!("Listing cache MISS: {}", release_key);
            return Ok(None);
        };

        let entry: CacheEntry<Vec<u32>> = bincode::deserialize(value.value()).map_err(cache_err)?;
        if entry.is_expired(self.ttl_secs) {
            tracing::debug!("Listing cache EXPIRED: {}", release_key);
            return Ok(None);
        }

        tracing::debug!("Listing cache HIT: {}", release_key);
        // ids were validated before being stored; anything else is skipped
        let ids = entry
            .data
            .into_iter()
            .filter_map(|id| SubjectId::new(id).ok())
            .collect();
        Ok(Some(ids))
    }

    /// Store the subject ids enumerated for a `database/release` key
    pub fn set_subjects(&self, release_key: &str, ids: &BTreeSet<SubjectId>) -> Result<()> {
        let raw: Vec<u32> = ids.iter().map(|id| id.get()).collect();
        let encoded = bincode::serialize(&CacheEntry::new(raw)).map_err(cache_err)?;

        let db = self.lock()?;
        let write_txn = db.begin_write().map_err(cache_err)?;
        {
            let mut table = write_txn.open_table(SUBJECT_LISTINGS).map_err(cache_err)?;
            table
                .insert(release_key, encoded.as_slice())
                .map_err(cache_err)?;
        }
        write_txn.commit().map_err(cache_err)?;

        tracing::debug!("Cached {} subject ids for {}", ids.len(), release_key);
        Ok(())
    }

    /// Remove expired listings
    pub fn cleanup_expired(&self) -> Result<usize> {
        let db = self.lock()?;
        let mut keys_to_remove = Vec::new();

        {
            let read_txn = db.begin_read().map_err(cache_err)?;
            let table = read_txn.open_table(SUBJECT_LISTINGS).map_err(cache_err)?;
            for entry in table.iter().map_err(cache_err)? {
                let (key, value) = entry.map_err(cache_err)?;
                let bytes = value.value();
                if bytes.len() < 8 {
                    continue;
                }
                let mut stamp = [0u8; 8];
                stamp.copy_from_slice(&bytes[..8]);
                let timestamp = u64::from_le_bytes(stamp);
                if now_secs().saturating_sub(timestamp) > self.ttl_secs {
                    keys_to_remove.push(key.value().to_string());
                }
            }
        }

        if !keys_to_remove.is_empty() {
            let write_txn = db.begin_write().map_err(cache_err)?;
            {
                let mut table = write_txn.open_table(SUBJECT_LISTINGS).map_err(cache_err)?;
                for key in &keys_to_remove {
                    table.remove(key.as_str()).map_err(cache_err)?;
                }
            }
            write_txn.commit().map_err(cache_err)?;
            tracing::info!("Removed {} expired subject listings", keys_to_remove.len());
        }

        Ok(keys_to_remove.len())
    }

    /// Number of cached listings
    pub fn len(&self) -> Result<u64> {
        let db = self.lock()?;
        let read_txn = db.begin_read().map_err(cache_err)?;
        let table = read_txn.open_table(SUBJECT_LISTINGS).map_err(cache_err)?;
        table.len().map_err(cache_err)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
