//! Mutex-guarded bidirectional dictionary for attribute keys.
//!
//! [`KeyDict`] stores forward mappings in a `Vec<Arc<str>>` (O(1) index
//! lookup, zero hashing) and reverse mappings in a
//! `HashMap<Arc<str>, KeyId>` (single hash lookup). The `Arc<str>` is shared
//! between both structures — each key string is allocated once.
//!
//! Index 0 is a sentinel: the forward vector is seeded with an empty entry so
//! the first real assignment is 1, and slot references of 0 can mean "unset"
//! everywhere downstream.
//!
//! A single mutex guards both directions, on reads as well as writes.
//! Real-world OSM runs see ~50–100 distinct keys, so the lock is not a
//! contention point; a 16-bit index keeps pair records small.

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::ids::KeyId;

/// Highest assignable key index. `u16::MAX` stays unassigned.
const MAX_KEY_INDEX: usize = 65_534;

struct KeyDictInner {
    /// Forward: index → key. Entry 0 is the sentinel.
    keys: Vec<Arc<str>>,
    /// Reverse: key → index, sharing the Arc with `keys`.
    index: HashMap<Arc<str>, KeyId>,
}

/// Insert-only dictionary from attribute key strings to 16-bit indices.
pub struct KeyDict {
    inner: Mutex<KeyDictInner>,
}

impl KeyDict {
    /// Create an empty dictionary (sentinel pre-seeded at index 0).
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(KeyDictInner {
                keys: vec![Arc::from("")],
                index: HashMap::new(),
            }),
        }
    }

    /// Look up or assign the index for `key`.
    ///
    /// Keys are case- and byte-exact; no normalisation. Returns
    /// [`Error::TooManyKeys`] when the next index would exceed 65,534.
    pub fn key_to_id(&self, key: &str) -> Result<KeyId> {
        let mut inner = self.inner.lock();

        if let Some(&id) = inner.index.get(key) {
            return Ok(id);
        }

        // This is very unlikely. We expect more like 50-100 keys.
        let next = inner.keys.len();
        if next > MAX_KEY_INDEX {
            return Err(Error::too_many_keys(key));
        }

        let id = KeyId(next as u16);
        let interned: Arc<str> = Arc::from(key);
        inner.keys.push(Arc::clone(&interned));
        inner.index.insert(interned, id);
        Ok(id)
    }

    /// Forward lookup: resolve an index to its key.
    ///
    /// Total for every index previously returned by [`key_to_id`]; `None`
    /// otherwise (including the sentinel).
    ///
    /// [`key_to_id`]: KeyDict::key_to_id
    pub fn resolve(&self, id: KeyId) -> Option<Arc<str>> {
        if id.is_sentinel() {
            return None;
        }
        self.inner.lock().keys.get(id.as_u16() as usize).cloned()
    }

    /// Number of interned keys (sentinel excluded).
    pub fn len(&self) -> usize {
        self.inner.lock().keys.len() - 1
    }

    /// True if no keys have been interned.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for KeyDict {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_sequential_from_one() {
        let d = KeyDict::new();
        assert_eq!(d.key_to_id("highway").unwrap(), KeyId(1));
        assert_eq!(d.key_to_id("oneway").unwrap(), KeyId(2));
        assert_eq!(d.key_to_id("bridge").unwrap(), KeyId(3));
        assert_eq!(d.len(), 3);
    }

    #[test]
    fn test_idempotent() {
        let d = KeyDict::new();
        let id1 = d.key_to_id("highway").unwrap();
        let id2 = d.key_to_id("highway").unwrap();
        assert_eq!(id1, id2);
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn test_byte_exact_no_normalisation() {
        let d = KeyDict::new();
        let lower = d.key_to_id("name").unwrap();
        let upper = d.key_to_id("Name").unwrap();
        assert_ne!(lower, upper);
        assert_eq!(d.len(), 2);
    }

    #[test]
    fn test_resolve() {
        let d = KeyDict::new();
        let id = d.key_to_id("surface").unwrap();
        assert_eq!(d.resolve(id).as_deref(), Some("surface"));
        assert_eq!(d.resolve(KeyId::SENTINEL), None);
        assert_eq!(d.resolve(KeyId(999)), None);
    }

    #[test]
    fn test_empty() {
        let d = KeyDict::new();
        assert!(d.is_empty());
        assert_eq!(d.len(), 0);
    }

    #[test]
    fn test_key_space_exhaustion_boundary() {
        let d = KeyDict::new();
        for i in 1..=MAX_KEY_INDEX {
            let id = d.key_to_id(&format!("k{}", i)).unwrap();
            assert_eq!(id.as_u16() as usize, i);
        }
        assert_eq!(d.len(), 65_534);

        // The 65,535th distinct key is refused...
        let err = d.key_to_id("one-too-many").unwrap_err();
        assert!(matches!(err, Error::TooManyKeys(_)));

        // ...but existing keys still resolve.
        assert_eq!(d.key_to_id("k1").unwrap(), KeyId(1));
        assert_eq!(d.resolve(KeyId(65_534)).as_deref(), Some("k65534"));
    }
}
