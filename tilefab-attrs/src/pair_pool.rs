//! Sharded interning pool for attribute pairs.
//!
//! All pairs are referred to by a 32-bit [`PairId`]: the top `shard_bits`
//! bits select a shard, the remaining bits are the offset into that shard's
//! pair vector.
//!
//! Shard 0 is special: it is the **hot shard**, for pairs the hotness
//! predicate expects to be popular. It holds at most 64K entries so that a
//! hot reference always fits a 16-bit inline slot. Offset 0 of the hot shard
//! is a sentinel placeholder, keeping `PairId` 0 free to mean "unset".
//!
//! The cold shards exist to reduce the odds of lock contention when
//! inserting or retrieving everything else; a pair's structural hash picks
//! its cold shard, so equal pairs always meet in the same shard and dedup
//! stays exact. At least 2× the worker-thread count is a reasonable shard
//! count — the default of 256 is plenty for most machines.
//!
//! Each shard guards an append-only pair vector plus an offset map with its
//! own mutex; insertion and lookup lock exactly one shard. Pairs are only
//! ever accessed by offset under that lock, which keeps references stable as
//! the vectors grow.

use std::sync::atomic::{AtomicBool, Ordering};

use hashbrown::HashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::ids::{KeyId, PairId};
use crate::key_dict::KeyDict;
use crate::pair::AttrPair;
use crate::value::AttrValue;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

fn default_shard_bits() -> u32 {
    8
}

fn default_hot_cap() -> u32 {
    1 << 16
}

/// Pool sizing knobs, embeddable in the pipeline's config file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of pool shards = `2^shard_bits`. Must be in `1..=16`.
    #[serde(default = "default_shard_bits")]
    pub shard_bits: u32,
    /// Upper bound on entries in the hot shard (sentinel included).
    /// Must fit 16 bits and the per-shard capacity.
    #[serde(default = "default_hot_cap")]
    pub hot_cap: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            shard_bits: default_shard_bits(),
            hot_cap: default_hot_cap(),
        }
    }
}

// ---------------------------------------------------------------------------
// PairPool
// ---------------------------------------------------------------------------

struct PairShard {
    /// Append-only; offsets are stable for the life of the pool.
    pairs: Vec<AttrPair>,
    /// Reverse: pair → offset within this shard.
    index: HashMap<AttrPair, u32>,
}

impl PairShard {
    fn new() -> Self {
        Self {
            pairs: Vec::new(),
            index: HashMap::new(),
        }
    }
}

/// Sharded, process-lifetime interning pool for [`AttrPair`] values.
pub struct PairPool {
    shards: Box<[Mutex<PairShard>]>,
    offset_bits: u32,
    offset_mask: u32,
    /// Per-shard entry capacity, `2^offset_bits`.
    shard_cap: u32,
    hot_cap: u32,
    hot_full_warned: AtomicBool,
}

impl PairPool {
    /// Create a pool from `config`.
    ///
    /// Panics if the configuration is out of range; sizing is fixed at
    /// startup, before worker threads exist.
    pub fn new(config: &PoolConfig) -> Self {
        assert!(
            (1..=16).contains(&config.shard_bits),
            "shard_bits must be in 1..=16, got {}",
            config.shard_bits
        );
        // shard_bits in 1..=16 leaves offset_bits in 16..=31, so the
        // per-shard capacity always fits a u32.
        let offset_bits = 32 - config.shard_bits;
        let shard_cap = 1u32 << offset_bits;
        assert!(config.hot_cap >= 1, "hot_cap must be at least 1");
        assert!(
            config.hot_cap <= 1 << 16,
            "hot_cap must fit 16-bit addressing, got {}",
            config.hot_cap
        );
        assert!(
            config.hot_cap <= shard_cap,
            "hot_cap {} exceeds per-shard capacity {}",
            config.hot_cap,
            shard_cap
        );

        let shard_count = 1usize << config.shard_bits;
        let mut shards = Vec::with_capacity(shard_count);
        for _ in 0..shard_count {
            shards.push(Mutex::new(PairShard::new()));
        }

        // Offset 0 of the hot shard is the "unset" placeholder. It lives in
        // the pair vector but never in the offset map, so no real pair can
        // dedup against it.
        shards[0]
            .get_mut()
            .pairs
            .push(AttrPair::new(KeyId::SENTINEL, AttrValue::False, 0));

        Self {
            shards: shards.into_boxed_slice(),
            offset_bits,
            offset_mask: shard_cap - 1,
            shard_cap,
            hot_cap: config.hot_cap,
            hot_full_warned: AtomicBool::new(false),
        }
    }

    /// Create a pool with the default configuration.
    pub fn with_defaults() -> Self {
        Self::new(&PoolConfig::default())
    }

    #[inline]
    fn make_id(&self, shard: u32, offset: u32) -> PairId {
        PairId((shard << self.offset_bits) | offset)
    }

    /// Intern `pair`, returning its stable index.
    ///
    /// Idempotent: an equal pair already present in the target shard returns
    /// its existing index. Hot-eligible pairs go to shard 0 until it is full,
    /// then fall back to a cold shard — that is not an error. `keys` is the
    /// dictionary that assigned `pair.key` (the hotness predicate needs the
    /// key's spelling).
    pub fn add_pair(&self, pair: AttrPair, keys: &KeyDict) -> Result<PairId> {
        if pair.hot(keys) {
            let mut shard = self.shards[0].lock();
            if let Some(&offset) = shard.index.get(&pair) {
                return Ok(self.make_id(0, offset));
            }
            let offset = shard.pairs.len() as u32;
            if offset < self.hot_cap {
                shard.index.insert(pair.clone(), offset);
                shard.pairs.push(pair);
                return Ok(self.make_id(0, offset));
            }
            drop(shard);
            if !self.hot_full_warned.swap(true, Ordering::Relaxed) {
                warn!(
                    hot_cap = self.hot_cap,
                    "hot pair shard is full; hot-eligible pairs now intern cold"
                );
            }
        }

        let cold_shards = (self.shards.len() - 1) as u64;
        let shard_no = 1 + (pair.canonical_hash() % cold_shards) as u32;

        let mut shard = self.shards[shard_no as usize].lock();
        if let Some(&offset) = shard.index.get(&pair) {
            return Ok(self.make_id(shard_no, offset));
        }
        let offset = shard.pairs.len() as u32;
        if offset >= self.shard_cap {
            return Err(Error::shard_overflow(shard_no, self.shard_cap));
        }
        shard.index.insert(pair.clone(), offset);
        shard.pairs.push(pair);
        Ok(self.make_id(shard_no, offset))
    }

    /// Fetch the pair stored at `id`. O(1) under the addressed shard's lock.
    ///
    /// The clone is cheap: string payloads are `Arc<str>`. Unspecified for
    /// `PairId::UNSET` (yields the sentinel placeholder); panics for an
    /// offset never returned by [`add_pair`](PairPool::add_pair).
    pub fn get_pair(&self, id: PairId) -> AttrPair {
        let shard_no = (id.as_u32() >> self.offset_bits) as usize;
        let offset = (id.as_u32() & self.offset_mask) as usize;
        let shard = self.shards[shard_no].lock();
        shard.pairs[offset].clone()
    }

    /// Number of hot-shard entries (sentinel excluded).
    pub fn hot_len(&self) -> usize {
        self.shards[0].lock().pairs.len() - 1
    }

    /// Total entries across the cold shards.
    pub fn cold_len(&self) -> usize {
        self.shards[1..].iter().map(|s| s.lock().pairs.len()).sum()
    }

    /// Number of shards (hot shard included).
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Size of the largest cold shard, for skew diagnostics.
    pub fn max_cold_shard_len(&self) -> usize {
        self.shards[1..]
            .iter()
            .map(|s| s.lock().pairs.len())
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_and_dict() -> (PairPool, KeyDict) {
        (PairPool::with_defaults(), KeyDict::new())
    }

    fn mk(keys: &KeyDict, key: &str, value: AttrValue, minzoom: u8) -> AttrPair {
        AttrPair::new(keys.key_to_id(key).unwrap(), value, minzoom)
    }

    #[test]
    fn test_hot_pair_dedup_short_index() {
        let (pool, keys) = pool_and_dict();
        let p = mk(&keys, "highway", AttrValue::string("residential"), 10);
        let id1 = pool.add_pair(p.clone(), &keys).unwrap();
        let id2 = pool.add_pair(p, &keys).unwrap();
        assert_eq!(id1, id2);
        assert!(id1.fits_short(), "hot pair must be 16-bit addressable");
        assert!(!id1.is_unset(), "offset 0 is reserved");
    }

    #[test]
    fn test_name_key_goes_cold() {
        let (pool, keys) = pool_and_dict();
        let p = mk(&keys, "name", AttrValue::string("main"), 10);
        let id = pool.add_pair(p, &keys).unwrap();
        assert!(!id.fits_short(), "name-keyed strings are not hot");
    }

    #[test]
    fn test_float_hotness_routing() {
        let (pool, keys) = pool_and_dict();
        let hot = mk(&keys, "lanes", AttrValue::Float(2.0), 10);
        let cold = mk(&keys, "ele", AttrValue::Float(-3.0), 10);
        assert!(pool.add_pair(hot, &keys).unwrap().fits_short());
        assert!(!pool.add_pair(cold, &keys).unwrap().fits_short());
    }

    #[test]
    fn test_cold_pair_dedup_across_calls() {
        let (pool, keys) = pool_and_dict();
        let p = mk(&keys, "name", AttrValue::string("Hauptstra\u{df}e"), 10);
        let id1 = pool.add_pair(p.clone(), &keys).unwrap();
        let id2 = pool.add_pair(p, &keys).unwrap();
        assert_eq!(id1, id2);
        assert_eq!(pool.cold_len(), 1);
    }

    #[test]
    fn test_get_pair_round_trip() {
        let (pool, keys) = pool_and_dict();
        let p = mk(&keys, "surface", AttrValue::string("asphalt"), 12);
        let id = pool.add_pair(p.clone(), &keys).unwrap();
        assert_eq!(pool.get_pair(id), p);
    }

    #[test]
    fn test_distinct_pairs_distinct_ids() {
        let (pool, keys) = pool_and_dict();
        let a = mk(&keys, "oneway", AttrValue::True, 10);
        let b = mk(&keys, "oneway", AttrValue::False, 10);
        let c = mk(&keys, "oneway", AttrValue::True, 11);
        let ia = pool.add_pair(a, &keys).unwrap();
        let ib = pool.add_pair(b, &keys).unwrap();
        let ic = pool.add_pair(c, &keys).unwrap();
        assert_ne!(ia, ib);
        assert_ne!(ia, ic);
        assert_ne!(ib, ic);
    }

    #[test]
    fn test_hot_shard_full_falls_back_cold() {
        // Tiny hot cap: sentinel + three real entries.
        let pool = PairPool::new(&PoolConfig {
            shard_bits: 4,
            hot_cap: 4,
        });
        let keys = KeyDict::new();

        let mut ids = Vec::new();
        for z in 0..6u8 {
            let p = mk(&keys, "oneway", AttrValue::True, z);
            ids.push(pool.add_pair(p, &keys).unwrap());
        }

        assert!(ids[0].fits_short() && ids[1].fits_short() && ids[2].fits_short());
        assert!(!ids[3].fits_short(), "entry past the cap interns cold");
        assert!(!ids[4].fits_short());
        assert_eq!(pool.hot_len(), 3);
        assert_eq!(pool.cold_len(), 3);

        // Fallback entries still dedup to their cold home.
        let again = pool
            .add_pair(mk(&keys, "oneway", AttrValue::True, 3), &keys)
            .unwrap();
        assert_eq!(again, ids[3]);
    }

    #[test]
    fn test_min_shard_bits_single_cold_shard() {
        let pool = PairPool::new(&PoolConfig {
            shard_bits: 1,
            hot_cap: 16,
        });
        let keys = KeyDict::new();
        assert_eq!(pool.shard_count(), 2);

        let cold = mk(&keys, "name", AttrValue::string("x"), 10);
        let id = pool.add_pair(cold, &keys).unwrap();
        assert!(!id.fits_short());
        assert_eq!(pool.cold_len(), 1);
    }

    #[test]
    #[should_panic(expected = "shard_bits")]
    fn test_zero_shard_bits_rejected() {
        PairPool::new(&PoolConfig {
            shard_bits: 0,
            hot_cap: 16,
        });
    }

    #[test]
    fn test_pool_config_serde_defaults() {
        let config: PoolConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PoolConfig::default());

        let config: PoolConfig = serde_json::from_str(r#"{"shard_bits": 4}"#).unwrap();
        assert_eq!(config.shard_bits, 4);
        assert_eq!(config.hot_cap, 1 << 16);
    }
}
