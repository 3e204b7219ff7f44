//! AttrSet - compact container of pair indices for one feature
//!
//! Most OSM features carry eight or fewer attributes, and the common ones
//! are hot-shard references that fit 16 bits. [`AttrSet`] therefore has two
//! encodings:
//!
//! - **Inline**: a 24-byte region of twelve 16-bit lanes, read as four
//!   16-bit slots (lanes 0–3) followed by four 32-bit slots (lane pairs
//!   4/5 … 10/11, low half first). A slot holding 0 means "empty"; a 16-bit
//!   slot can only hold a [`PairId`] below 2^16.
//! - **Spilled**: a plain `Vec<PairId>` for sets that are too large or too
//!   cold-heavy for the inline region.
//!
//! Exactly one encoding is active per instance — the enum discriminant is
//! the discriminator. Hashing and equality are derived per variant over the
//! raw encoding: an inline set never equals a spilled set even when their
//! logical contents coincide. [`finalize`](AttrSet::finalize) chooses slot
//! placement deterministically, so equal constructions yield bit-identical
//! encodings; mutation after finalise is not part of the supported surface.
//!
//! ## Canonical form
//!
//! `finalize` sorts the held ids by their referenced pairs under the
//! `(minzoom, key, type-tag, value)` order, then re-packs the inline region
//! greedily — 16-bit slots first for hot ids, 32-bit slots for the rest —
//! so the zero padding pattern is fixed and lane-wise equality is sound.

use crate::ids::PairId;
use crate::pair::AttrPair;
use crate::pair_pool::PairPool;

/// Logical slot count of the inline region: four short + four word slots.
pub const INLINE_SLOTS: usize = 8;

const SHORT_SLOTS: usize = 4;
const LANES: usize = 12;

// ---------------------------------------------------------------------------
// InlineSet
// ---------------------------------------------------------------------------

/// The 24-byte inline region.
///
/// Slots 0–3 are the lanes themselves; slots 4–7 straddle two lanes each,
/// low half first.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct InlineSet {
    lanes: [u16; LANES],
}

impl InlineSet {
    /// Read slot `i` (0..8) as a 32-bit pair index.
    fn slot(&self, i: usize) -> u32 {
        if i < SHORT_SLOTS {
            self.lanes[i] as u32
        } else {
            let j = SHORT_SLOTS + 2 * (i - SHORT_SLOTS);
            (self.lanes[j] as u32) | ((self.lanes[j + 1] as u32) << 16)
        }
    }

    /// Write slot `i`.
    ///
    /// Asserts the width rule: a 16-bit slot cannot hold a value of 2^16 or
    /// above. Violations indicate a bug in slot selection, not bad input.
    fn set_slot(&mut self, i: usize, value: u32) {
        assert!(i < INLINE_SLOTS, "inline slot {} out of bounds", i);
        if i < SHORT_SLOTS {
            assert!(
                value <= u16::MAX as u32,
                "16-bit inline slot cannot hold pair index {}",
                value
            );
            self.lanes[i] = value as u16;
        } else {
            let j = SHORT_SLOTS + 2 * (i - SHORT_SLOTS);
            self.lanes[j] = (value & 0xFFFF) as u16;
            self.lanes[j + 1] = (value >> 16) as u16;
        }
    }

    fn is_set(&self, i: usize) -> bool {
        self.slot(i) != 0
    }

    /// Iterate the occupied slots in slot order.
    fn ids(&self) -> impl Iterator<Item = PairId> + '_ {
        (0..INLINE_SLOTS)
            .filter(|&i| self.is_set(i))
            .map(|i| PairId(self.slot(i)))
    }
}

// ---------------------------------------------------------------------------
// AttrSet
// ---------------------------------------------------------------------------

/// The complete attribute references for one feature.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum AttrSet {
    /// Up to eight pair indices packed into the 24-byte inline region.
    Inline(InlineSet),
    /// Variable-length list of 32-bit pair indices.
    Spilled(Vec<PairId>),
}

impl AttrSet {
    /// Create an empty set (inline encoding).
    pub fn new() -> Self {
        AttrSet::Inline(InlineSet::default())
    }

    /// True if no pair indices are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of pair indices held.
    pub fn len(&self) -> usize {
        match self {
            AttrSet::Inline(inline) => (0..INLINE_SLOTS).filter(|&i| inline.is_set(i)).count(),
            AttrSet::Spilled(ids) => ids.len(),
        }
    }

    /// True if `id` is already held.
    pub fn contains(&self, id: PairId) -> bool {
        match self {
            AttrSet::Inline(inline) => inline.ids().any(|held| held == id),
            AttrSet::Spilled(ids) => ids.contains(&id),
        }
    }

    /// Iterate the held pair indices.
    ///
    /// Before [`finalize`](AttrSet::finalize) the order is unspecified.
    /// Afterwards, a spilled set iterates in canonical pair order; an inline
    /// set iterates its 16-bit slots before its 32-bit slots (each run
    /// canonically ordered) — materialisation re-sorts, the lanes exist for
    /// equality and hashing.
    pub fn iter(&self) -> impl Iterator<Item = PairId> + '_ {
        let (inline, spilled) = match self {
            AttrSet::Inline(s) => (Some(s), None),
            AttrSet::Spilled(ids) => (None, Some(ids)),
        };
        inline
            .into_iter()
            .flat_map(|s| s.ids())
            .chain(spilled.into_iter().flatten().copied())
    }

    /// Insert a pair index. Re-inserting a held id is a no-op.
    ///
    /// Inline placement takes the first empty slot that can hold the id —
    /// any slot for a 16-bit id, a 32-bit slot otherwise. When no legal slot
    /// is free (or a ninth distinct id arrives) every held id moves to the
    /// spilled encoding.
    pub fn insert(&mut self, id: PairId) {
        debug_assert!(!id.is_unset(), "PairId 0 is the unset sentinel");
        if self.contains(id) {
            return;
        }

        let spill = match self {
            AttrSet::Spilled(ids) => {
                ids.push(id);
                None
            }
            AttrSet::Inline(inline) => {
                let start = if id.fits_short() { 0 } else { SHORT_SLOTS };
                let free = (start..INLINE_SLOTS).find(|&i| !inline.is_set(i));
                match free {
                    Some(slot) => {
                        inline.set_slot(slot, id.as_u32());
                        None
                    }
                    None => {
                        let mut ids: Vec<PairId> = inline.ids().collect();
                        ids.push(id);
                        Some(ids)
                    }
                }
            }
        };

        if let Some(ids) = spill {
            *self = AttrSet::Spilled(ids);
        }
    }

    /// Canonicalise the set. Idempotent.
    ///
    /// Sorts the held ids by their referenced pairs (ties broken by raw id
    /// so the result is deterministic), then re-packs the inline region into
    /// the smallest legal slots. After this, two sets built from the same
    /// pairs hash and compare identically.
    pub fn finalize(&mut self, pool: &PairPool) {
        match self {
            AttrSet::Inline(inline) => {
                let mut entries: Vec<(AttrPair, PairId)> =
                    inline.ids().map(|id| (pool.get_pair(id), id)).collect();
                entries.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

                let mut packed = InlineSet::default();
                for (_, id) in &entries {
                    let start = if id.fits_short() { 0 } else { SHORT_SLOTS };
                    let slot = (start..INLINE_SLOTS)
                        .find(|&i| !packed.is_set(i))
                        .expect("inline set holds at most eight entries");
                    packed.set_slot(slot, id.as_u32());
                }
                *inline = packed;
            }
            AttrSet::Spilled(ids) => {
                let mut entries: Vec<(AttrPair, PairId)> =
                    ids.iter().map(|&id| (pool.get_pair(id), id)).collect();
                entries.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
                *ids = entries.into_iter().map(|(_, id)| id).collect();
            }
        }
    }
}

impl Default for AttrSet {
    fn default() -> Self {
        Self::new()
    }
}
