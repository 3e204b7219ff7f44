//! AttrPair - one `(key, value, minzoom)` attribute entry
//!
//! Pairs are the unit of interning in the pool. Equality and hashing are
//! structural; ordering is the canonical `(minzoom, key, type-tag, value)`
//! lexicographic order that set finalisation and tile emission both rely on.
//!
//! ## Hotness
//!
//! [`AttrPair::hot`] predicts, at first sight, whether a pair will recur
//! often enough to deserve one of the 64K hot-shard slots. The trick is that
//! the pool commits to the placement before knowing if the prediction was
//! right. The predicate:
//!
//! - every boolean pair is hot;
//! - integer-valued floats in `[0, 25]` are hot (lanes, layers, ...);
//! - strings of `a-z`, `-`, `_` are hot unless the key is name-like.
//!
//! A key is *name-like* when its bytes start `n`, `a`, `m` and a fourth byte
//! exists. The fourth byte is NOT required to be `e` — see
//! [`key_is_name_like`] before changing this.

use std::cmp::Ordering;
use std::fmt;
use xxhash_rust::xxh64::Xxh64;

use crate::ids::KeyId;
use crate::key_dict::KeyDict;
use crate::value::AttrValue;

/// One key/value pair (with minzoom) for a feature.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AttrPair {
    /// Dictionary index of the attribute key.
    pub key: KeyId,
    /// Lowest zoom level at which the attribute is emitted.
    pub minzoom: u8,
    /// The attribute value.
    pub value: AttrValue,
}

impl AttrPair {
    /// Create a new pair.
    pub fn new(key: KeyId, value: AttrValue, minzoom: u8) -> Self {
        Self {
            key,
            minzoom,
            value,
        }
    }

    /// Is this pair a candidate for the hot pool?
    ///
    /// Hot pairs are pairs we think are likely to be re-used, like
    /// `tunnel=0`, `highway=yes`, and so on. The placement decision is made
    /// before any usage is observed.
    pub fn hot(&self, keys: &KeyDict) -> bool {
        // All boolean pairs are eligible.
        if self.value.is_bool() {
            return true;
        }

        // Small non-negative integers are eligible.
        if let Some(v) = self.value.as_float() {
            return v.ceil() == v && v >= 0.0 && v <= 25.0;
        }

        let Some(s) = self.value.as_str() else {
            return false;
        };

        // Only IDish strings are eligible: lowercase letters, '-', '_'.
        for &c in s.as_bytes() {
            if c != b'-' && c != b'_' && !c.is_ascii_lowercase() {
                return false;
            }
        }

        // Keys that sound like name, name:en, etc, aren't eligible.
        let key_name = keys
            .resolve(self.key)
            .expect("AttrPair::hot called with a KeyId not assigned by this dictionary");
        !key_is_name_like(&key_name)
    }

    /// Structural hash of the pair, used to route cold pairs to a shard.
    ///
    /// Stable across processes (fixed seed), unlike the map hasher.
    pub fn canonical_hash(&self) -> u64 {
        let mut hasher = Xxh64::new(0);
        hasher.update(&[self.minzoom, self.value.type_tag()]);
        hasher.update(&self.key.as_u16().to_le_bytes());
        match &self.value {
            AttrValue::False | AttrValue::True => {}
            AttrValue::Float(v) => hasher.update(&v.to_bits().to_le_bytes()),
            AttrValue::String(s) => hasher.update(s.as_bytes()),
        }
        hasher.digest()
    }
}

impl Ord for AttrPair {
    fn cmp(&self, other: &Self) -> Ordering {
        self.minzoom
            .cmp(&other.minzoom)
            .then_with(|| self.key.cmp(&other.key))
            .then_with(|| self.value.cmp(&other.value))
    }
}

impl PartialOrd for AttrPair {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for AttrPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}={} z{}]", self.key, self.value, self.minzoom)
    }
}

/// Does this key sound like a name key (`name`, `name:en`, ...)?
///
/// Literal byte test: the first three bytes are `n`, `a`, `m` and a fourth
/// byte exists. The fourth byte is deliberately NOT compared against `e`,
/// matching long-standing behaviour: `namX` counts as name-like even though
/// only `name*` keys were presumably meant. Covered by
/// `test_name_like_fourth_byte_not_required`.
pub fn key_is_name_like(name: &str) -> bool {
    let b = name.as_bytes();
    b.len() >= 4 && b[0] == b'n' && b[1] == b'a' && b[2] == b'm' && b[3] != 0
}
