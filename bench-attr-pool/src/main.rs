//! Attribute interning benchmark with embedded memory tracking.
//!
//! Measures insert throughput, duplicate-hit throughput, materialisation
//! throughput, and memory footprint for the three interning tiers at
//! realistic low and high scales. Tag shapes follow real OSM extracts: a
//! few dozen keys, heavy reuse of idish values, a long tail of unique
//! names.
//!
//! Run with `cargo run --release -p bench-attr-pool`.

use std::alloc::{GlobalAlloc, Layout, System};
use std::hint::black_box;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use tilefab_attrs::{AttrSet, AttrStore, AttrValue, SetId};

// ============================================================================
// Tracking allocator
// ============================================================================

struct TrackingAllocator;

static ALLOCATED: AtomicUsize = AtomicUsize::new(0);

#[global_allocator]
static ALLOC: TrackingAllocator = TrackingAllocator;

unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            ALLOCATED.fetch_add(layout.size(), Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        ALLOCATED.fetch_sub(layout.size(), Ordering::Relaxed);
        unsafe { System.dealloc(ptr, layout) };
    }
}

fn current_allocated() -> usize {
    ALLOCATED.load(Ordering::Relaxed)
}

// ============================================================================
// Data generation
// ============================================================================

/// One feature's worth of tags.
type Feature = Vec<(&'static str, AttrValue, u8)>;

const HIGHWAY_VALUES: &[&str] = &[
    "residential",
    "service",
    "unclassified",
    "tertiary",
    "secondary",
    "primary",
    "trunk",
    "motorway",
    "footway",
    "path",
    "track",
    "cycleway",
];

const SURFACE_VALUES: &[&str] = &[
    "asphalt", "unpaved", "paved", "gravel", "ground", "dirt", "grass", "concrete",
];

const STREET_STEMS: &[&str] = &[
    "Acacia", "Birch", "Cedar", "Drury", "Elm", "Foundry", "Granite", "Harbour", "Iron", "Juniper",
];

/// Generate features with a realistic hot/cold split: most tags come from a
/// small reusable universe, names form a long unique tail.
fn generate_features(count: usize, seed: u64) -> Vec<Feature> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let mut tags: Feature = Vec::new();
            tags.push((
                "highway",
                AttrValue::string(HIGHWAY_VALUES[rng.gen_range(0..HIGHWAY_VALUES.len())]),
                8,
            ));
            if rng.gen_bool(0.6) {
                tags.push((
                    "surface",
                    AttrValue::string(SURFACE_VALUES[rng.gen_range(0..SURFACE_VALUES.len())]),
                    13,
                ));
            }
            if rng.gen_bool(0.3) {
                tags.push(("oneway", AttrValue::bool(rng.gen_bool(0.8)), 12));
            }
            if rng.gen_bool(0.4) {
                tags.push((
                    "lanes",
                    AttrValue::Float(rng.gen_range(1..=6) as f32),
                    12,
                ));
            }
            if rng.gen_bool(0.2) {
                // Unique-ish names: the cold tail.
                let stem = STREET_STEMS[rng.gen_range(0..STREET_STEMS.len())];
                tags.push((
                    "name",
                    AttrValue::String(format!("{} Street {}", stem, i % 5000).into()),
                    14,
                ));
            }
            if rng.gen_bool(0.05) {
                tags.push(("bridge", AttrValue::True, 10));
            }
            tags
        })
        .collect()
}

// ============================================================================
// Benchmark runner
// ============================================================================

struct Report {
    scale: usize,
    insert_ns_per_feature: f64,
    dup_ns_per_feature: f64,
    get_ns_per_set: f64,
    distinct_sets: usize,
    hot_pairs: usize,
    cold_pairs: usize,
    bytes_after_insert: usize,
}

fn run_scale(scale: usize, seed: u64) -> Report {
    let features = generate_features(scale, seed);
    let bytes_before = current_allocated();
    let store = AttrStore::new();

    // Insert pass: fresh sets, mostly-new pairs at the start, mostly-dup later.
    let start = Instant::now();
    let mut set_ids: Vec<SetId> = Vec::with_capacity(features.len());
    for feature in &features {
        let mut set = AttrSet::new();
        for (key, value, minzoom) in feature {
            store
                .add_value(&mut set, key, value.clone(), *minzoom)
                .expect("interning failed");
        }
        set_ids.push(store.intern(set));
    }
    let insert_elapsed = start.elapsed();
    let bytes_after_insert = current_allocated().saturating_sub(bytes_before);

    // Duplicate pass: every feature is already interned.
    let start = Instant::now();
    for feature in &features {
        let mut set = AttrSet::new();
        for (key, value, minzoom) in feature {
            store
                .add_value(&mut set, key, value.clone(), *minzoom)
                .expect("interning failed");
        }
        black_box(store.intern(set));
    }
    let dup_elapsed = start.elapsed();

    store.done_reading();

    // Materialisation pass, as tile emit would do it.
    let start = Instant::now();
    for id in &set_ids {
        black_box(store.get(*id));
    }
    let get_elapsed = start.elapsed();

    Report {
        scale,
        insert_ns_per_feature: insert_elapsed.as_nanos() as f64 / scale as f64,
        dup_ns_per_feature: dup_elapsed.as_nanos() as f64 / scale as f64,
        get_ns_per_set: get_elapsed.as_nanos() as f64 / set_ids.len() as f64,
        distinct_sets: store.set_count(),
        hot_pairs: store.pairs().hot_len(),
        cold_pairs: store.pairs().cold_len(),
        bytes_after_insert,
    }
}

fn print_report(r: &Report) {
    println!("scale {:>9}:", r.scale);
    println!("  insert        {:>10.0} ns/feature", r.insert_ns_per_feature);
    println!("  dup insert    {:>10.0} ns/feature", r.dup_ns_per_feature);
    println!("  materialise   {:>10.0} ns/set", r.get_ns_per_set);
    println!(
        "  distinct sets {:>10}  ({:.1}% of features)",
        r.distinct_sets,
        100.0 * r.distinct_sets as f64 / r.scale as f64
    );
    println!(
        "  pairs         {:>10} hot / {} cold",
        r.hot_pairs, r.cold_pairs
    );
    println!(
        "  memory        {:>10.1} KiB retained after insert",
        r.bytes_after_insert as f64 / 1024.0
    );
    println!();
}

fn main() {
    println!("attribute interning benchmark");
    println!("=============================\n");

    for &(scale, seed) in &[(100_000usize, 42u64), (2_000_000, 43)] {
        let report = run_scale(scale, seed);
        print_report(&report);
    }
}
