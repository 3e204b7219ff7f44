//! AttrStore - the facade over all three interning tiers
//!
//! [`AttrStore`] owns the key dictionary, the pair pool, and the
//! deduplicated set collection as explicit fields. There is no global
//! mutable state: the pipeline constructs one store before spawning worker
//! threads and shares it behind `Arc`.
//!
//! ## Lifecycle
//!
//! 1. **Construction** → the set collection is seeded with the empty set at
//!    index 0, so unattributed features use [`SetId::EMPTY`] with no special
//!    code path.
//! 2. **Ingest** → workers build one [`AttrSet`] per feature through
//!    `add_string` / `add_float` / `add_bool`, then [`intern`](AttrStore::intern)
//!    it and attach the returned [`SetId`] to the output object.
//! 3. **`done_reading`** → flips the store read-only; interning afterwards is
//!    a programming error.
//! 4. **Tile emit** → [`get`](AttrStore::get) materialises pairs in canonical
//!    order, [`key_of`](AttrStore::key_of) resolves key spellings.
//!
//! ## Concurrency
//!
//! One mutex guards the set collection; the dictionary and each pool shard
//! carry their own. Most per-feature work happens in the pool shards before
//! the set mutex is ever touched, and the common case under that mutex is a
//! single hash lookup (the set already exists).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::attr_set::AttrSet;
use crate::error::Result;
use crate::ids::{KeyId, SetId};
use crate::key_dict::KeyDict;
use crate::pair::AttrPair;
use crate::pair_pool::{PairPool, PoolConfig};
use crate::value::AttrValue;

struct SetStoreInner {
    /// Forward: SetId → set, in insertion order.
    sets: Vec<Arc<AttrSet>>,
    /// Reverse: set → SetId, sharing the Arc with `sets`.
    index: HashMap<Arc<AttrSet>, SetId>,
}

/// Process-lifetime store for attribute keys, pairs, and sets.
pub struct AttrStore {
    keys: KeyDict,
    pairs: PairPool,
    sets: Mutex<SetStoreInner>,
    /// Total intern calls, including duplicate hits.
    lookups: AtomicU64,
    read_only: AtomicBool,
}

impl AttrStore {
    /// Create a store with the default pool configuration.
    pub fn new() -> Self {
        Self::with_config(&PoolConfig::default())
    }

    /// Create a store with an explicit pool configuration.
    pub fn with_config(config: &PoolConfig) -> Self {
        let empty = Arc::new(AttrSet::new());
        let mut index = HashMap::new();
        index.insert(Arc::clone(&empty), SetId::EMPTY);
        Self {
            keys: KeyDict::new(),
            pairs: PairPool::new(config),
            sets: Mutex::new(SetStoreInner {
                sets: vec![empty],
                index,
            }),
            lookups: AtomicU64::new(0),
            read_only: AtomicBool::new(false),
        }
    }

    // -----------------------------------------------------------------------
    // Attribute-building surface (called per feature)
    // -----------------------------------------------------------------------

    /// Add a string attribute to `set`.
    pub fn add_string(
        &self,
        set: &mut AttrSet,
        key: &str,
        value: &str,
        minzoom: u8,
    ) -> Result<()> {
        self.add_value(set, key, AttrValue::string(value), minzoom)
    }

    /// Add a float attribute to `set`.
    pub fn add_float(&self, set: &mut AttrSet, key: &str, value: f32, minzoom: u8) -> Result<()> {
        self.add_value(set, key, AttrValue::Float(value), minzoom)
    }

    /// Add a boolean attribute to `set`.
    pub fn add_bool(&self, set: &mut AttrSet, key: &str, value: bool, minzoom: u8) -> Result<()> {
        self.add_value(set, key, AttrValue::bool(value), minzoom)
    }

    /// Intern `(key, value, minzoom)` and insert the resulting index.
    pub fn add_value(
        &self,
        set: &mut AttrSet,
        key: &str,
        value: AttrValue,
        minzoom: u8,
    ) -> Result<()> {
        let key_id = self.keys.key_to_id(key)?;
        let pair_id = self
            .pairs
            .add_pair(AttrPair::new(key_id, value, minzoom), &self.keys)?;
        set.insert(pair_id);
        Ok(())
    }

    /// Finalise `set` and deduplicate it, returning its stable index.
    ///
    /// Equal finalised sets always receive the same index; the empty set is
    /// always [`SetId::EMPTY`].
    pub fn intern(&self, mut set: AttrSet) -> SetId {
        assert!(
            !self.read_only.load(Ordering::Relaxed),
            "intern called after done_reading"
        );
        set.finalize(&self.pairs);
        self.lookups.fetch_add(1, Ordering::Relaxed);

        let mut inner = self.sets.lock();
        if let Some(&id) = inner.index.get(&set) {
            return id;
        }
        let id = SetId(inner.sets.len() as u32);
        let shared = Arc::new(set);
        inner.sets.push(Arc::clone(&shared));
        inner.index.insert(shared, id);
        id
    }

    // -----------------------------------------------------------------------
    // Tile-emit surface
    // -----------------------------------------------------------------------

    /// Materialise the pairs of a stored set in canonical
    /// `(minzoom, key, type-tag, value)` order.
    ///
    /// Panics for an index never returned by [`intern`](AttrStore::intern).
    pub fn get(&self, id: SetId) -> Vec<AttrPair> {
        let set = {
            let inner = self.sets.lock();
            Arc::clone(&inner.sets[id.as_u32() as usize])
        };
        let mut pairs: Vec<AttrPair> = set.iter().map(|pid| self.pairs.get_pair(pid)).collect();
        // Inline sets keep hot and cold references in separate slot runs, so
        // a final sort restores the global canonical order.
        pairs.sort();
        pairs
    }

    /// Resolve a key index to its spelling.
    pub fn key_of(&self, id: KeyId) -> Option<Arc<str>> {
        self.keys.resolve(id)
    }

    /// The key dictionary.
    pub fn keys(&self) -> &KeyDict {
        &self.keys
    }

    /// The pair pool.
    pub fn pairs(&self) -> &PairPool {
        &self.pairs
    }

    // -----------------------------------------------------------------------
    // Diagnostics and lifecycle
    // -----------------------------------------------------------------------

    /// Number of distinct sets (the empty set included).
    pub fn set_count(&self) -> usize {
        self.sets.lock().sets.len()
    }

    /// Total intern calls so far, duplicate hits included.
    pub fn lookups(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }

    /// Log occupancy of all three tiers.
    pub fn report_size(&self) {
        let sets = self.set_count();
        info!(
            sets,
            lookups = self.lookups(),
            keys = self.keys.len(),
            hot_pairs = self.pairs.hot_len(),
            cold_pairs = self.pairs.cold_len(),
            max_cold_shard = self.pairs.max_cold_shard_len(),
            "attribute store size"
        );
    }

    /// Signal the end of the insert phase. After this, only reads are
    /// permitted; the tables stay immutable until process end.
    pub fn done_reading(&self) {
        self.read_only.store(true, Ordering::Relaxed);
        debug!(
            sets = self.set_count(),
            lookups = self.lookups(),
            "attribute store frozen"
        );
    }
}

impl Default for AttrStore {
    fn default() -> Self {
        Self::new()
    }
}
