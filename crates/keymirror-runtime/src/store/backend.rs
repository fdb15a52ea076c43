#![forbid(unsafe_code)]

//! Backend contract and the in-memory backend.

use ahash::AHashMap;

/// Synchronous key-value storage.
///
/// Mutating operations return the previous value so the realm can build
/// complete change notifications without an extra read.
pub trait StoreBackend {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`; returns the replaced value, if any.
    fn set(&mut self, key: &str, value: &str) -> Result<Option<String>, StoreError>;

    /// Remove `key`; returns the removed value, if any.
    fn remove(&mut self, key: &str) -> Result<Option<String>, StoreError>;

    /// Number of stored keys.
    fn len(&self) -> usize;

    /// Whether the backend holds no keys.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All stored keys, in backend order.
    fn keys(&self) -> Vec<String>;
}

// ─── MemoryBackend ───────────────────────────────────────────────────────

/// In-memory backend with an optional byte quota.
///
/// Usage is accounted as the sum of key and value lengths, and a write that
/// would push usage past the quota fails with
/// [`StoreError::QuotaExceeded`] leaving the stored value unchanged.
#[derive(Default)]
pub struct MemoryBackend {
    entries: AHashMap<String, String>,
    quota: Option<usize>,
    used: usize,
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("keys", &self.entries.len())
            .field("used", &self.used)
            .field("quota", &self.quota)
            .finish()
    }
}

impl MemoryBackend {
    /// An unbounded backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that rejects writes once `quota` bytes are in use.
    #[must_use]
    pub fn with_quota(quota: usize) -> Self {
        Self {
            quota: Some(quota),
            ..Self::default()
        }
    }

    /// Bytes currently accounted against the quota.
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.used
    }
}

impl StoreBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<Option<String>, StoreError> {
        let replaced_bytes = self
            .entries
            .get(key)
            .map_or(0, |old| key.len() + old.len());
        let needed = self.used - replaced_bytes + key.len() + value.len();
        if let Some(quota) = self.quota
            && needed > quota
        {
            return Err(StoreError::QuotaExceeded {
                key: key.to_string(),
                needed,
                quota,
            });
        }
        self.used = needed;
        Ok(self.entries.insert(key.to_string(), value.to_string()))
    }

    fn remove(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        let removed = self.entries.remove(key);
        if let Some(value) = &removed {
            self.used -= key.len() + value.len();
        }
        Ok(removed)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

// ─── StoreError ──────────────────────────────────────────────────────────

/// Errors surfaced by store operations.
///
/// Nothing here is retried or masked by the library; callers own the retry
/// policy.
#[derive(Debug)]
pub enum StoreError {
    /// A write would exceed the backend's byte quota.
    QuotaExceeded {
        /// Key the rejected write targeted.
        key: String,
        /// Bytes the write would have brought usage to.
        needed: usize,
        /// Configured quota in bytes.
        quota: usize,
    },
    /// The backing storage cannot be used at all.
    Unavailable(String),
    /// Underlying file I/O failed.
    #[cfg(feature = "persist")]
    Io(std::io::Error),
    /// Persisted data could not be encoded or decoded.
    #[cfg(feature = "persist")]
    Codec(serde_json::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuotaExceeded { key, needed, quota } => {
                write!(
                    f,
                    "writing '{key}' would use {needed} bytes (quota {quota})"
                )
            }
            Self::Unavailable(reason) => write!(f, "storage unavailable: {reason}"),
            #[cfg(feature = "persist")]
            Self::Io(err) => write!(f, "i/o error: {err}"),
            #[cfg(feature = "persist")]
            Self::Codec(err) => write!(f, "codec error: {err}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            #[cfg(feature = "persist")]
            Self::Io(err) => Some(err),
            #[cfg(feature = "persist")]
            Self::Codec(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(feature = "persist")]
impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

#[cfg(feature = "persist")]
impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Codec(err)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove_roundtrip() {
        let mut backend = MemoryBackend::new();
        assert_eq!(backend.get("foo").unwrap(), None);

        assert_eq!(backend.set("foo", "1").unwrap(), None);
        assert_eq!(backend.get("foo").unwrap(), Some("1".to_string()));

        assert_eq!(backend.set("foo", "2").unwrap(), Some("1".to_string()));
        assert_eq!(backend.remove("foo").unwrap(), Some("2".to_string()));
        assert_eq!(backend.get("foo").unwrap(), None);
        assert!(backend.is_empty());
    }

    #[test]
    fn remove_missing_key_is_a_noop() {
        let mut backend = MemoryBackend::new();
        assert_eq!(backend.remove("ghost").unwrap(), None);
    }

    #[test]
    fn usage_tracks_replacements_and_removals() {
        let mut backend = MemoryBackend::new();
        backend.set("ab", "cd").unwrap();
        assert_eq!(backend.used_bytes(), 4);

        backend.set("ab", "cdef").unwrap();
        assert_eq!(backend.used_bytes(), 6);

        backend.remove("ab").unwrap();
        assert_eq!(backend.used_bytes(), 0);
    }

    #[test]
    fn quota_rejects_and_leaves_state_unchanged() {
        let mut backend = MemoryBackend::with_quota(8);
        backend.set("k", "12345").unwrap(); // 6 bytes

        let err = backend.set("k2", "123").unwrap_err(); // would be 11
        match err {
            StoreError::QuotaExceeded { key, needed, quota } => {
                assert_eq!(key, "k2");
                assert_eq!(needed, 11);
                assert_eq!(quota, 8);
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(backend.get("k2").unwrap(), None);
        assert_eq!(backend.used_bytes(), 6);
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn replacement_within_quota_is_allowed() {
        let mut backend = MemoryBackend::with_quota(6);
        backend.set("key", "abc").unwrap(); // exactly 6
        backend.set("key", "xyz").unwrap(); // still 6
        assert_eq!(backend.get("key").unwrap(), Some("xyz".to_string()));
    }

    #[test]
    fn keys_lists_every_entry() {
        let mut backend = MemoryBackend::new();
        backend.set("a", "1").unwrap();
        backend.set("b", "2").unwrap();
        let mut keys = backend.keys();
        keys.sort();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = StoreError::QuotaExceeded {
            key: "foo".into(),
            needed: 10,
            quota: 5,
        };
        assert_eq!(err.to_string(), "writing 'foo' would use 10 bytes (quota 5)");
        assert_eq!(
            StoreError::Unavailable("disabled by policy".into()).to_string(),
            "storage unavailable: disabled by policy"
        );
    }
}
