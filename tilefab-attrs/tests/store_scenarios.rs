//! End-to-end scenarios for the attribute store.
//!
//! Exercises the full path the ingest pipeline takes per feature: key
//! interning → pair interning (hot/cold routing) → set building →
//! finalise + dedup → materialisation at tile-emit time.

use tilefab_attrs::{AttrPair, AttrSet, AttrStore, AttrValue, Error, PoolConfig, SetId};

fn intern_pair(store: &AttrStore, key: &str, value: AttrValue, minzoom: u8) -> tilefab_attrs::PairId {
    let key_id = store.keys().key_to_id(key).unwrap();
    store
        .pairs()
        .add_pair(AttrPair::new(key_id, value, minzoom), store.keys())
        .unwrap()
}

// ---------------------------------------------------------------------------
// Pair placement
// ---------------------------------------------------------------------------

#[test]
fn hot_pair_dedups_to_short_index() {
    let store = AttrStore::new();
    let first = intern_pair(&store, "highway", AttrValue::string("residential"), 10);
    let second = intern_pair(&store, "highway", AttrValue::string("residential"), 10);
    assert_eq!(first, second);
    assert!(first.fits_short(), "hot pair must fit 16 bits, got {}", first);
}

#[test]
fn name_key_interns_cold() {
    let store = AttrStore::new();
    let id = intern_pair(&store, "name", AttrValue::string("main"), 10);
    assert!(!id.fits_short(), "name-keyed pair must be cold, got {}", id);
}

#[test]
fn small_integer_float_interns_hot() {
    let store = AttrStore::new();
    let id = intern_pair(&store, "lanes", AttrValue::Float(2.0), 10);
    assert!(id.fits_short());
}

#[test]
fn negative_float_interns_cold() {
    let store = AttrStore::new();
    let id = intern_pair(&store, "ele", AttrValue::Float(-3.0), 10);
    assert!(!id.fits_short());
}

#[test]
fn hot_shard_overflow_falls_back_without_error() {
    // Shrink the hot shard so the fallback is cheap to reach: one sentinel
    // plus two real entries.
    let store = AttrStore::with_config(&PoolConfig {
        shard_bits: 8,
        hot_cap: 3,
    });

    let a = intern_pair(&store, "oneway", AttrValue::True, 10);
    let b = intern_pair(&store, "bridge", AttrValue::True, 10);
    let c = intern_pair(&store, "tunnel", AttrValue::True, 10);

    assert!(a.fits_short());
    assert!(b.fits_short());
    assert!(!c.fits_short(), "past the cap, hot-eligible pairs intern cold");

    // All three remain addressable and idempotent.
    assert_eq!(intern_pair(&store, "tunnel", AttrValue::True, 10), c);
    assert_eq!(store.pairs().get_pair(c).value, AttrValue::True);
}

// ---------------------------------------------------------------------------
// Set canonicalisation and dedup
// ---------------------------------------------------------------------------

#[test]
fn set_canonicalisation_is_order_independent() {
    let store = AttrStore::new();

    // Key "a" is seen first, so it takes the lower dictionary index and
    // sorts first in the canonical (minzoom, key, ...) order.
    let mut forward = AttrSet::new();
    store.add_bool(&mut forward, "a", true, 10).unwrap();
    store.add_bool(&mut forward, "b", true, 10).unwrap();

    let mut reverse = AttrSet::new();
    store.add_bool(&mut reverse, "b", true, 10).unwrap();
    store.add_bool(&mut reverse, "a", true, 10).unwrap();

    let forward_id = store.intern(forward);
    let reverse_id = store.intern(reverse);
    assert_eq!(forward_id, reverse_id);

    let pairs = store.get(forward_id);
    let spellings: Vec<_> = pairs
        .iter()
        .map(|p| store.key_of(p.key).unwrap().to_string())
        .collect();
    assert_eq!(spellings, ["a", "b"]);
}

#[test]
fn nine_pair_sets_spill_and_still_dedup() {
    let store = AttrStore::new();
    let keys: Vec<String> = (0..9).map(|i| format!("tag{}", i)).collect();

    let mut forward = AttrSet::new();
    for key in &keys {
        store.add_bool(&mut forward, key, true, 10).unwrap();
    }
    let mut reverse = AttrSet::new();
    for key in keys.iter().rev() {
        store.add_bool(&mut reverse, key, true, 10).unwrap();
    }

    let forward_id = store.intern(forward);
    let reverse_id = store.intern(reverse);
    assert_eq!(forward_id, reverse_id);
    assert_eq!(store.get(forward_id).len(), 9);
}

#[test]
fn eight_and_nine_pair_sets_are_distinct() {
    let store = AttrStore::new();

    let mut eight = AttrSet::new();
    for i in 0..8 {
        store.add_bool(&mut eight, &format!("tag{}", i), true, 10).unwrap();
    }
    let mut nine = AttrSet::new();
    for i in 0..9 {
        store.add_bool(&mut nine, &format!("tag{}", i), true, 10).unwrap();
    }

    assert_ne!(store.intern(eight), store.intern(nine));
}

#[test]
fn empty_set_identity() {
    let store = AttrStore::new();
    assert_eq!(store.intern(AttrSet::new()), SetId::EMPTY);
    assert_eq!(store.get(SetId::EMPTY), vec![]);

    // A set that never received an attribute still resolves to index 0.
    let built_but_empty = AttrSet::new();
    assert_eq!(store.intern(built_but_empty), SetId::EMPTY);
}

#[test]
fn round_trip_preserves_triples() {
    let store = AttrStore::new();

    let mut set = AttrSet::new();
    store.add_string(&mut set, "highway", "residential", 10).unwrap();
    store.add_string(&mut set, "name", "Acacia Avenue", 14).unwrap();
    store.add_bool(&mut set, "oneway", true, 12).unwrap();
    store.add_float(&mut set, "lanes", 2.0, 12).unwrap();
    store.add_float(&mut set, "ele", -3.5, 12).unwrap();
    // Exact repeat collapses
    store.add_string(&mut set, "highway", "residential", 10).unwrap();

    let id = store.intern(set);
    let pairs = store.get(id);
    assert_eq!(pairs.len(), 5);

    let mut triples: Vec<(String, String, u8)> = pairs
        .iter()
        .map(|p| {
            (
                store.key_of(p.key).unwrap().to_string(),
                p.value.to_string(),
                p.minzoom,
            )
        })
        .collect();
    triples.sort();
    assert_eq!(
        triples,
        vec![
            ("ele".into(), "-3.5".into(), 12),
            ("highway".into(), "\"residential\"".into(), 10),
            ("lanes".into(), "2".into(), 12),
            ("name".into(), "\"Acacia Avenue\"".into(), 14),
            ("oneway".into(), "true".into(), 12),
        ]
    );

    // And the enumeration itself is canonically ordered.
    for w in pairs.windows(2) {
        assert!(w[0] <= w[1], "{} should not precede {}", w[1], w[0]);
    }
}

#[test]
fn interned_ids_are_dense_and_stable() {
    let store = AttrStore::new();
    let mut ids = Vec::new();
    for i in 0..10 {
        let mut set = AttrSet::new();
        store.add_float(&mut set, "ref_number", i as f32, 10).unwrap();
        ids.push(store.intern(set));
    }
    let raw: Vec<u32> = ids.iter().map(|id| id.as_u32()).collect();
    assert_eq!(raw, (1..=10).collect::<Vec<_>>(), "insertion order is identity");
}

// ---------------------------------------------------------------------------
// Error propagation
// ---------------------------------------------------------------------------

#[test]
fn key_space_exhaustion_surfaces_through_the_store() {
    let store = AttrStore::new();
    let mut set = AttrSet::new();
    for i in 1..=65_534u32 {
        store
            .add_bool(&mut set, &format!("k{}", i), true, 10)
            .unwrap();
    }
    let err = store
        .add_bool(&mut set, "one-too-many", true, 10)
        .unwrap_err();
    assert!(matches!(err, Error::TooManyKeys(_)));
}
