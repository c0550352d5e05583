use embers::{EvolvingSketch, SketchBuilder};

// ---------------------------------------------------------------------------
// Long-stream behavior: overflow pruning
// ---------------------------------------------------------------------------

#[test]
fn long_distinct_stream_prunes_and_keeps_singleton_estimates_honest() {
    // 20 million distinct keys force the counters through the overflow
    // threshold repeatedly; a fresh key updated once afterwards must still
    // estimate ≈ 1.  The width is large enough that the decayed collision
    // mass per counter stays below 1.
    let mut sketch: EvolvingSketch<u64> = SketchBuilder::new(1 << 20).seed(20).build();

    for i in 0..20_000_000u64 {
        sketch.update(&(1_000_000_000 + i));
    }

    let telemetry = sketch.telemetry();
    assert!(telemetry.prunes >= 1, "no prune over 20M updates");
    // `t` was re-anchored at least once.
    assert!(sketch.ticks() < 20_000_000);

    sketch.update(&42);
    let estimate = sketch.estimate(&42);
    assert!(
        (estimate - 1.0).abs() <= 1.0,
        "estimate for a once-seen key drifted to {estimate}"
    );
}

#[test]
fn counters_stay_bounded_across_prune_cycles() {
    // A hot α cycles the sketch through many prunes; estimates of a
    // steady key must stay finite and positive throughout.
    let mut sketch: EvolvingSketch<u64> = SketchBuilder::new(64)
        .initial_alpha(500.0)
        .seed(6)
        .build();

    for i in 0..50_000u64 {
        sketch.update(&(i % 100));
        if i % 1_000 == 0 {
            let est = sketch.estimate(&(i % 100));
            assert!(est.is_finite() && est >= 0.0, "estimate {est} at step {i}");
        }
    }
    assert!(sketch.telemetry().prunes > 1);
}

#[test]
fn natural_prune_preserves_relative_order() {
    // Key 1 is ten times hotter than key 2.  Their order must hold at
    // every point of a stream long enough to include overflow prunes.
    let mut sketch: EvolvingSketch<u64> = SketchBuilder::new(256)
        .initial_alpha(200.0)
        .seed(12)
        .build();

    for _ in 0..20_000 {
        for _ in 0..10 {
            sketch.update(&1);
        }
        sketch.update(&2);
        assert!(
            sketch.estimate(&1) > sketch.estimate(&2),
            "hot key fell below cold key after {} prunes",
            sketch.telemetry().prunes
        );
    }
    assert!(sketch.telemetry().prunes > 0, "stream never pruned");
}

// ---------------------------------------------------------------------------
// Decayed-count semantics
// ---------------------------------------------------------------------------

#[test]
fn recency_outweighs_stale_volume() {
    // Key 1 gets 50 early updates, key 2 gets 10 late ones.  With a decay
    // aggressive enough, the recent key must overtake the stale one.
    let mut sketch: EvolvingSketch<u64> = SketchBuilder::new(1 << 12)
        .initial_alpha(100.0)
        .seed(17)
        .build();

    for _ in 0..50 {
        sketch.update(&1);
    }
    // A quiet stretch lets key 1's weight decay.
    for i in 0..5_000u64 {
        sketch.update(&(1_000 + i));
    }
    for _ in 0..10 {
        sketch.update(&2);
    }

    assert!(
        sketch.estimate(&2) > sketch.estimate(&1),
        "stale volume outweighed fresh activity: {} vs {}",
        sketch.estimate(&1),
        sketch.estimate(&2)
    );
}

#[test]
fn pruning_only_sketch_is_a_decayed_count_min() {
    // No adapter: α never moves, estimates never underestimate.
    let mut sketch: EvolvingSketch<u64> = SketchBuilder::new(1 << 10).seed(3).build();

    for i in 0..10_000u64 {
        sketch.update(&(i % 50));
    }
    assert_eq!(sketch.alpha(), 1.0);

    // Every key saw 200 updates; the decayed exact count is
    // Σ exp((t_i − t)/10⁴) over its own hits, which Count-Min can only
    // overestimate.
    for key in 0..50u64 {
        let est = sketch.estimate(&key) as f64;
        let mut exact = 0.0f64;
        let t_now = 10_000f64;
        let mut t = key + 1; // key k is hit at ticks k+1, k+51, ...
        while t <= 10_000 {
            exact += ((t as f64 - t_now) / 10_000.0).exp();
            t += 50;
        }
        assert!(
            est >= exact - 1e-3,
            "key {key}: estimate {est} under exact {exact}"
        );
    }
}
