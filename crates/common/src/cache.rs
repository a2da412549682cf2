// Copyright (C) 2026 EVM Debug Service Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! On-disk JSON cache used for fetched source code and compiled
//! contract records (spec §3 "Compiled contract record" / "Source
//! bundle" lifecycles: written once per address, cached indefinitely).

use std::{fs, marker::PhantomData, path::PathBuf, time::Duration};

use serde::{de::DeserializeOwned, Serialize};

/// Trait for a label-keyed on-disk cache.
pub trait Cache {
    /// The type of the data to be cached.
    type Data: Serialize + DeserializeOwned;

    /// Loads the cache entry for `label`, if present and unexpired.
    fn load_cache(&self, label: impl Into<String>) -> Option<Self::Data>;

    /// Saves `data` under `label`, overwriting any prior entry.
    fn save_cache(&self, label: impl Into<String>, data: &Self::Data) -> std::io::Result<()>;
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct CacheWrapper<T> {
    data: T,
    expires_at: u64,
}

impl<T> CacheWrapper<T> {
    fn new(data: T, ttl: Option<Duration>) -> Self {
        let now = chrono::Utc::now().timestamp() as u64;
        Self { data, expires_at: ttl.map(|ttl| now.saturating_add(ttl.as_secs())).unwrap_or(u64::MAX) }
    }

    fn is_expired(&self) -> bool {
        self.expires_at < chrono::Utc::now().timestamp() as u64
    }
}

/// A cache that stores one JSON file per label under `cache_dir`.
///
/// `T` is the cached payload type; `cache_ttl` of `None` means entries
/// never expire (used for compiled-contract and source-bundle records,
/// which are immutable once a contract's source is verified).
#[derive(Debug, Clone)]
pub struct DebugCache<T> {
    cache_dir: PathBuf,
    cache_ttl: Option<Duration>,
    phantom: PhantomData<T>,
}

impl<T> DebugCache<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Creates the cache directory (if needed) and returns a handle to it.
    pub fn new(cache_dir: impl Into<PathBuf>, cache_ttl: Option<Duration>) -> std::io::Result<Self> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir, cache_ttl, phantom: PhantomData })
    }

    /// Directory backing this cache.
    pub fn cache_dir(&self) -> &PathBuf {
        &self.cache_dir
    }

    fn path_for(&self, label: &str) -> PathBuf {
        self.cache_dir.join(format!("{label}.json"))
    }
}

impl<T> Cache for DebugCache<T>
where
    T: Serialize + DeserializeOwned,
{
    type Data = T;

    fn load_cache(&self, label: impl Into<String>) -> Option<T> {
        let label = label.into();
        let path = self.path_for(&label);
        if !path.exists() {
            return None;
        }

        let content = fs::read_to_string(&path).ok()?;
        let wrapper: CacheWrapper<T> = match serde_json::from_str(&content) {
            Ok(wrapper) => wrapper,
            Err(_) => {
                tracing::warn!(path = %path.display(), "cache file corrupted, removing");
                let _ = fs::remove_file(&path);
                return None;
            }
        };

        if wrapper.is_expired() {
            let _ = fs::remove_file(&path);
            None
        } else {
            Some(wrapper.data)
        }
    }

    fn save_cache(&self, label: impl Into<String>, data: &T) -> std::io::Result<()> {
        let path = self.path_for(&label.into());
        let wrapper = CacheWrapper::new(data, self.cache_ttl);
        let content = serde_json::to_string(&wrapper)?;
        fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Dummy {
        value: u32,
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let cache: DebugCache<Dummy> = DebugCache::new(dir.path(), None).unwrap();

        assert!(cache.load_cache("missing").is_none());

        cache.save_cache("addr", &Dummy { value: 42 }).unwrap();
        assert_eq!(cache.load_cache("addr"), Some(Dummy { value: 42 }));
    }

    #[test]
    fn expires_entries_past_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let cache: DebugCache<Dummy> =
            DebugCache::new(dir.path(), Some(Duration::from_secs(0))).unwrap();

        cache.save_cache("addr", &Dummy { value: 7 }).unwrap();
        // TTL of zero seconds means the entry is already expired on load.
        std::thread::sleep(Duration::from_millis(1100));
        assert!(cache.load_cache("addr").is_none());
    }

    #[test]
    fn corrupted_entry_is_treated_as_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache: DebugCache<Dummy> = DebugCache::new(dir.path(), None).unwrap();
        fs::write(dir.path().join("addr.json"), b"not json").unwrap();
        assert!(cache.load_cache("addr").is_none());
    }
}
