use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use embers::{Cache, EvolvingSketch, Segment, SketchBuilder, WTinyLfuPolicy};

// ---------------------------------------------------------------------------
// A minimal host cache for the policy to drive
// ---------------------------------------------------------------------------

struct MapCache {
    entries: HashMap<u64, u64>,
    max: usize,
}

impl MapCache {
    fn new(max: usize) -> Self {
        MapCache {
            entries: HashMap::new(),
            max,
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Cache<u64, u64> for MapCache {
    fn contains(&self, key: &u64) -> bool {
        self.entries.contains_key(key)
    }

    fn get(&self, key: &u64) -> Option<&u64> {
        self.entries.get(key)
    }

    fn put(&mut self, key: u64, value: u64) {
        self.entries.insert(key, value);
    }

    fn remove(&mut self, key: &u64) {
        self.entries.remove(key);
    }

    fn is_full(&self) -> bool {
        self.entries.len() >= self.max
    }
}

fn setup(capacity: usize) -> (WTinyLfuPolicy<u64>, MapCache) {
    let sketch: Rc<RefCell<EvolvingSketch<u64>>> =
        Rc::new(RefCell::new(SketchBuilder::new(1 << 16).seed(42).build()));
    (WTinyLfuPolicy::new(capacity, sketch), MapCache::new(capacity))
}

/// Replays one access: hit if resident, miss otherwise.  Returns whether
/// it was a hit.
fn access(policy: &mut WTinyLfuPolicy<u64>, cache: &mut MapCache, key: u64) -> bool {
    if cache.contains(&key) {
        policy.handle_cache_hit(&key);
        true
    } else {
        policy.handle_cache_miss(cache, key, key);
        false
    }
}

// ---------------------------------------------------------------------------
// Re-accessed keys climb into Protected
// ---------------------------------------------------------------------------

#[test]
fn reaccessed_keys_end_up_protected_and_resident() {
    let (mut policy, mut cache) = setup(100);

    // 1000 distinct keys once each — far more than capacity.
    for i in 0..1_000u64 {
        access(&mut policy, &mut cache, i);
    }

    // Re-access the first 10 keys, 50 rounds, round-robin: the first
    // round re-admits them, later rounds hit them in probation and
    // promote them.
    for _ in 0..50 {
        for i in 0..10u64 {
            access(&mut policy, &mut cache, i);
        }
    }

    for i in 0..10u64 {
        assert!(cache.contains(&i), "key {i} not resident");
    }
    let protected = (0..10u64)
        .filter(|k| policy.segment_of(k) == Some(Segment::Protected))
        .count();
    assert!(protected >= 9, "only {protected}/10 reached Protected");
    assert!(cache.len() <= 100);
}

// ---------------------------------------------------------------------------
// Capacity invariants under sustained load
// ---------------------------------------------------------------------------

#[test]
fn residency_never_exceeds_capacity() {
    let (mut policy, mut cache) = setup(50);

    // A skewed workload: keys 0..9 hot, a long cold tail.
    for i in 0..20_000u64 {
        let key = if i % 3 == 0 { i % 10 } else { 10 + i };
        access(&mut policy, &mut cache, key);
        assert!(cache.len() <= 50, "cache grew to {} at step {i}", cache.len());
        assert_eq!(policy.len(), cache.len(), "policy and cache disagree");
    }
}

#[test]
fn hot_set_dominates_hit_rate_against_a_cold_scan() {
    let (mut policy, mut cache) = setup(100);

    // Warm a hot set small enough to fit through the Window+Probation
    // front door (20 slots at this capacity), so the second round's hits
    // promote it into Protected.
    for _ in 0..20 {
        for i in 0..15u64 {
            access(&mut policy, &mut cache, i);
        }
    }

    // Mixed phase: hot keys interleaved with a cold scan.
    let mut hot_hits = 0u32;
    let mut hot_accesses = 0u32;
    for i in 0..10_000u64 {
        if i % 2 == 0 {
            hot_accesses += 1;
            if access(&mut policy, &mut cache, i % 15) {
                hot_hits += 1;
            }
        } else {
            access(&mut policy, &mut cache, 1_000_000 + i);
        }
    }

    let hit_rate = hot_hits as f64 / hot_accesses as f64;
    assert!(
        hit_rate > 0.8,
        "hot-set hit rate {hit_rate:.3} — admission failed to shield the hot set"
    );
}

// ---------------------------------------------------------------------------
// Policy/sketch interplay
// ---------------------------------------------------------------------------

#[test]
fn policy_updates_flow_into_the_shared_sketch() {
    let (mut policy, mut cache) = setup(100);

    for _ in 0..5 {
        access(&mut policy, &mut cache, 7);
    }

    let sketch = policy.sketch().borrow();
    assert_eq!(sketch.telemetry().update_count, 5);
    assert!(sketch.estimate(&7) > sketch.estimate(&8));
}
