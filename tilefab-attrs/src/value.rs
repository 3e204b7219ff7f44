//! AttrValue - polymorphic attribute value type
//!
//! The value of an attribute pair is one of four variants: the two boolean
//! states, a 32-bit float, or a string. False and true are distinct variants
//! so the type tag alone discriminates them — the tag is what gets compared
//! and hashed for boolean pairs.
//!
//! ## Ordering
//!
//! Strict total ordering by type tag first (False < True < Float < String),
//! then by payload within the variant: floats by `f32::total_cmp`, strings by
//! byte order. Booleans carry no payload, so false < true falls out of the
//! tag comparison.
//!
//! ## Equality
//!
//! Structural. Float equality is **bit-exact** over the `f32` representation
//! (consistent with the hash); NaN is not expected in attribute data and is
//! not special-cased beyond what `to_bits`/`total_cmp` already give us.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Polymorphic value for one attribute pair.
///
/// Strings are `Arc<str>` so pool entries, map keys, and materialised copies
/// all share one allocation.
#[derive(Clone, Debug)]
pub enum AttrValue {
    /// Boolean false
    False,
    /// Boolean true
    True,
    /// 32-bit float (numeric OSM tags: lanes, ele, population, ...)
    Float(f32),
    /// String value
    String(Arc<str>),
}

impl AttrValue {
    /// Build the boolean variant for `v`.
    #[inline]
    pub fn bool(v: bool) -> Self {
        if v {
            AttrValue::True
        } else {
            AttrValue::False
        }
    }

    /// Build a string variant from any string-ish input.
    #[inline]
    pub fn string(v: impl AsRef<str>) -> Self {
        AttrValue::String(Arc::from(v.as_ref()))
    }

    /// Get the type tag for ordering and hashing.
    ///
    /// Lower tag = sorts earlier. The numbering is part of the canonical pair
    /// order, so it is load-bearing: False=0, True=1, Float=2, String=3.
    #[inline]
    pub fn type_tag(&self) -> u8 {
        match self {
            AttrValue::False => 0,
            AttrValue::True => 1,
            AttrValue::Float(_) => 2,
            AttrValue::String(_) => 3,
        }
    }

    /// Check if this is either boolean variant
    #[inline]
    pub fn is_bool(&self) -> bool {
        matches!(self, AttrValue::False | AttrValue::True)
    }

    /// Check if this is a float
    #[inline]
    pub fn is_float(&self) -> bool {
        matches!(self, AttrValue::Float(_))
    }

    /// Check if this is a string
    #[inline]
    pub fn is_string(&self) -> bool {
        matches!(self, AttrValue::String(_))
    }

    /// Try to get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::False => Some(false),
            AttrValue::True => Some(true),
            _ => None,
        }
    }

    /// Try to get as f32
    pub fn as_float(&self) -> Option<f32> {
        match self {
            AttrValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as string reference
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for AttrValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AttrValue::False, AttrValue::False) => true,
            (AttrValue::True, AttrValue::True) => true,
            (AttrValue::Float(a), AttrValue::Float(b)) => a.to_bits() == b.to_bits(),
            (AttrValue::String(a), AttrValue::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for AttrValue {}

impl Hash for AttrValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_tag().hash(state);
        match self {
            AttrValue::False | AttrValue::True => {}
            AttrValue::Float(v) => v.to_bits().hash(state),
            AttrValue::String(s) => s.hash(state),
        }
    }
}

impl Ord for AttrValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.type_tag()
            .cmp(&other.type_tag())
            .then_with(|| match (self, other) {
                (AttrValue::Float(a), AttrValue::Float(b)) => a.total_cmp(b),
                (AttrValue::String(a), AttrValue::String(b)) => a.as_bytes().cmp(b.as_bytes()),
                // Booleans carry no payload; tags already distinguished them.
                _ => Ordering::Equal,
            })
    }
}

impl PartialOrd for AttrValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::False => write!(f, "false"),
            AttrValue::True => write!(f, "true"),
            AttrValue::Float(v) => write!(f, "{}", v),
            AttrValue::String(s) => write!(f, "{:?}", s),
        }
    }
}
