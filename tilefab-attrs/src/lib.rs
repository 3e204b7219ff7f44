//! # Tilefab Attribute Core
//!
//! Interning and set-encoding core for the tilefab vector-tile generator.
//!
//! Most OSM features share identical attribute bundles (thousands of
//! `highway=residential, oneway=yes` ways), so ingest throughput hinges on
//! creating, deduplicating, and referencing those bundles cheaply. This
//! crate provides the three tiers that make that fast:
//!
//! - [`KeyDict`]: attribute key strings → 16-bit indices
//! - [`PairPool`]: `(key, value, minzoom)` triples → 32-bit indices, split
//!   into a bounded hot shard (16-bit addressable) plus hashed cold shards
//! - [`AttrStore`]: deduplicated [`AttrSet`] bundles → 32-bit set indices,
//!   with a 24-byte inline encoding for the common ≤ 8-attribute case
//!
//! ## Design Principles
//!
//! 1. **No global state**: one [`AttrStore`] owns all three tiers and is
//!    threaded into workers explicitly (share behind `Arc`)
//! 2. **Lock small**: one mutex per pool shard, one for the key dictionary,
//!    one for the set collection; every call locks at most one of them
//! 3. **Append-only**: indices handed out are stable for the process's
//!    lifetime; there is no eviction and no persistence across runs
//!
//! ## Example
//!
//! ```
//! use tilefab_attrs::{AttrSet, AttrStore};
//!
//! let store = AttrStore::new();
//!
//! let mut attrs = AttrSet::new();
//! store.add_string(&mut attrs, "highway", "residential", 10)?;
//! store.add_bool(&mut attrs, "oneway", true, 12)?;
//! let id = store.intern(attrs);
//!
//! for pair in store.get(id) {
//!     let key = store.key_of(pair.key).unwrap();
//!     println!("{}={} from z{}", key, pair.value, pair.minzoom);
//! }
//! # Ok::<(), tilefab_attrs::Error>(())
//! ```

pub mod attr_set;
pub mod error;
pub mod ids;
pub mod key_dict;
pub mod pair;
pub mod pair_pool;
pub mod store;
pub mod value;

// Re-export main types
pub use attr_set::{AttrSet, INLINE_SLOTS};
pub use error::{Error, Result};
pub use ids::{KeyId, PairId, SetId};
pub use key_dict::KeyDict;
pub use pair::{key_is_name_like, AttrPair};
pub use pair_pool::{PairPool, PoolConfig};
pub use store::AttrStore;
pub use value::AttrValue;
