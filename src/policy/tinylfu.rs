use std::cell::RefCell;
use std::hash::Hash;
use std::rc::Rc;

use ahash::AHashMap;
use tracing::warn;

use crate::decay::{DecayFn, ExpDecay};
use crate::hash::SketchKey;
use crate::sketch::EvolvingSketch;

use super::{Cache, Segment};

/// Window share of total capacity.
const WINDOW_RATIO: f64 = 0.01;
/// Probation share of the main area (capacity minus window).
const PROBATION_RATIO: f64 = 0.2;

// ---------------------------------------------------------------------------
// Sentinel layout
//
// The first six slots of `nodes` are permanent HEAD/TAIL sentinels — one
// pair per segment.  Real entries start at index 6.  Sentinels always have
// `key = None` and are never looked up through the index.
// ---------------------------------------------------------------------------
const WINDOW_HEAD: usize = 0;
const WINDOW_TAIL: usize = 1;
const PROBATION_HEAD: usize = 2;
const PROBATION_TAIL: usize = 3;
const PROTECTED_HEAD: usize = 4;
const PROTECTED_TAIL: usize = 5;
const NULL: usize = usize::MAX;
const SENTINEL_COUNT: usize = 6;

/// A single node in the entry arena.
struct PolicyNode<K> {
    /// `None` only for sentinel slots.
    key: Option<K>,
    prev: usize,
    next: usize,
    segment: Segment,
}

/// W-TinyLFU admission policy driven by an [`EvolvingSketch`].
///
/// Capacity `C` is partitioned into three recency lists (head = most
/// recently used):
///
/// | Segment       | Size                  | Role |
/// |---------------|-----------------------|------|
/// | **Window**    | `⌈C · 0.01⌉`          | admits every new key |
/// | **Probation** | `⌊(C − window) · 0.2⌋`| frequency proving ground, victim pool |
/// | **Protected** | the rest              | keys that earned both recency and frequency |
///
/// A hit in Probation promotes to Protected (demoting Protected's LRU
/// entry back if it overflows).  A miss admits at the Window head; when
/// Window and Probation are both full, the sketch arbitrates between the
/// Window victim and the Probation victim, and the loser leaves the cache.
///
/// The sketch is shared (`Rc<RefCell<…>>`) so the surrounding workload
/// can keep feeding its reward accumulator; everything is
/// single-threaded.
pub struct WTinyLfuPolicy<K, F = ExpDecay> {
    sketch: Rc<RefCell<EvolvingSketch<K, F>>>,

    /// Central node arena — sentinels and real entries alike.
    nodes: Vec<PolicyNode<K>>,
    /// Maps `K → arena index` for O(1) relocation.
    index: AHashMap<K, usize>,
    /// Recycled arena slots.
    free_list: Vec<usize>,

    window_len: usize,
    probation_len: usize,
    protected_len: usize,

    max_window: usize,
    max_probation: usize,
    max_protected: usize,
}

impl<K, F> WTinyLfuPolicy<K, F>
where
    K: SketchKey + Hash + Eq + Clone,
    F: DecayFn,
{
    /// Creates a policy for a host cache of `capacity` entries, sharing
    /// `sketch` for frequency bookkeeping.
    pub fn new(capacity: usize, sketch: Rc<RefCell<EvolvingSketch<K, F>>>) -> Self {
        assert!(capacity > 0, "capacity must be greater than 0");

        let max_window = (capacity as f64 * WINDOW_RATIO).ceil() as usize;
        let max_probation = ((capacity - max_window) as f64 * PROBATION_RATIO) as usize;
        let max_protected = capacity - max_window - max_probation;

        let mut nodes: Vec<PolicyNode<K>> = Vec::with_capacity(SENTINEL_COUNT + capacity);
        let sentinel_segments = [
            Segment::Window,    // 0 = WINDOW_HEAD
            Segment::Window,    // 1 = WINDOW_TAIL
            Segment::Probation, // 2 = PROBATION_HEAD
            Segment::Probation, // 3 = PROBATION_TAIL
            Segment::Protected, // 4 = PROTECTED_HEAD
            Segment::Protected, // 5 = PROTECTED_TAIL
        ];
        for segment in sentinel_segments {
            nodes.push(PolicyNode {
                key: None,
                prev: NULL,
                next: NULL,
                segment,
            });
        }
        // Wire sentinel pairs: HEAD.next = TAIL, TAIL.prev = HEAD.
        nodes[WINDOW_HEAD].next = WINDOW_TAIL;
        nodes[WINDOW_TAIL].prev = WINDOW_HEAD;
        nodes[PROBATION_HEAD].next = PROBATION_TAIL;
        nodes[PROBATION_TAIL].prev = PROBATION_HEAD;
        nodes[PROTECTED_HEAD].next = PROTECTED_TAIL;
        nodes[PROTECTED_TAIL].prev = PROTECTED_HEAD;

        WTinyLfuPolicy {
            sketch,
            nodes,
            index: AHashMap::with_capacity(capacity),
            free_list: Vec::new(),
            window_len: 0,
            probation_len: 0,
            protected_len: 0,
            max_window,
            max_probation,
            max_protected,
        }
    }

    // -----------------------------------------------------------------------
    // Policy entry points
    // -----------------------------------------------------------------------

    /// Records a hit on a resident key.
    ///
    /// Window and Protected hits refresh recency; a Probation hit earns a
    /// promotion to Protected, pushing Protected's LRU entry back to
    /// Probation if the segment overflows.
    ///
    /// Calling this for a key the policy does not track is a programmer
    /// error: fatal in debug builds, a no-op (with a warning) in release.
    pub fn handle_cache_hit(&mut self, key: &K) {
        self.sketch.borrow_mut().update(key);

        let Some(&idx) = self.index.get(key) else {
            warn!("cache hit reported for a key the policy does not track");
            debug_assert!(false, "hit for untracked key");
            return;
        };

        match self.nodes[idx].segment {
            Segment::Window => {
                self.unlink(idx);
                self.link_after(WINDOW_HEAD, idx);
            }
            Segment::Probation => {
                self.unlink(idx);
                self.probation_len -= 1;
                self.link_after(PROTECTED_HEAD, idx);
                self.nodes[idx].segment = Segment::Protected;
                self.protected_len += 1;

                if self.protected_len > self.max_protected {
                    let demoted = self.nodes[PROTECTED_TAIL].prev;
                    debug_assert_ne!(demoted, PROTECTED_HEAD);
                    self.unlink(demoted);
                    self.protected_len -= 1;
                    self.link_after(PROBATION_HEAD, demoted);
                    self.nodes[demoted].segment = Segment::Probation;
                    self.probation_len += 1;
                }
            }
            Segment::Protected => {
                self.unlink(idx);
                self.link_after(PROTECTED_HEAD, idx);
            }
        }
    }

    /// Admits a missed key, evicting through the TinyLFU filter if the
    /// segments are full.
    ///
    /// The new key always enters at the Window head.  A full Window pushes
    /// its LRU entry toward Probation; if Probation is full too, the
    /// sketch compares the two victims' decayed frequencies and the loser
    /// is removed from both the policy and the host cache.
    pub fn handle_cache_miss<V, C: Cache<K, V>>(&mut self, cache: &mut C, key: K, value: V) {
        self.sketch.borrow_mut().update(&key);
        debug_assert!(
            !self.index.contains_key(&key),
            "miss reported for a tracked key"
        );

        if self.window_len == self.max_window {
            let candidate = self.nodes[WINDOW_TAIL].prev;
            debug_assert_ne!(candidate, WINDOW_HEAD);

            if self.probation_len == self.max_probation {
                let victim = self.nodes[PROBATION_TAIL].prev;
                if victim == PROBATION_HEAD {
                    // Degenerate partition (probation capacity 0): there is
                    // no victim to arbitrate against, so the window victim
                    // leaves outright.
                    self.evict(cache, candidate);
                } else if self.wins_admission(candidate, victim) {
                    self.move_to_probation_head(candidate);
                    self.evict(cache, victim);
                } else {
                    self.evict(cache, candidate);
                }
            } else {
                self.move_to_probation_head(candidate);
            }
        }

        let idx = self.alloc_node(key.clone(), Segment::Window);
        self.index.insert(key.clone(), idx);
        self.link_after(WINDOW_HEAD, idx);
        self.window_len += 1;
        cache.put(key, value);
    }

    // -----------------------------------------------------------------------
    // Admission arbitration
    // -----------------------------------------------------------------------

    /// True if the window candidate's estimated frequency beats the
    /// probation victim's.  Ties keep the incumbent.
    fn wins_admission(&self, candidate: usize, victim: usize) -> bool {
        let candidate_key = self.nodes[candidate]
            .key
            .as_ref()
            .expect("linked node has a key");
        let victim_key = self.nodes[victim]
            .key
            .as_ref()
            .expect("linked node has a key");
        let sketch = self.sketch.borrow();
        sketch.estimate(candidate_key) > sketch.estimate(victim_key)
    }

    /// Retags the window LRU entry and moves it to the Probation head.
    fn move_to_probation_head(&mut self, idx: usize) {
        debug_assert_eq!(self.nodes[idx].segment, Segment::Window);
        self.unlink(idx);
        self.window_len -= 1;
        self.link_after(PROBATION_HEAD, idx);
        self.nodes[idx].segment = Segment::Probation;
        self.probation_len += 1;
    }

    /// Removes a linked node from its segment, the key index, and the
    /// host cache, recycling the arena slot.
    fn evict<V, C: Cache<K, V>>(&mut self, cache: &mut C, idx: usize) {
        match self.nodes[idx].segment {
            Segment::Window => self.window_len -= 1,
            Segment::Probation => self.probation_len -= 1,
            Segment::Protected => self.protected_len -= 1,
        }
        self.unlink(idx);

        let Some(key) = self.nodes[idx].key.take() else {
            warn!("attempted to evict a sentinel slot");
            debug_assert!(false, "evicting a sentinel");
            return;
        };
        self.index.remove(&key);
        cache.remove(&key);
        self.free_list.push(idx);
    }

    // -----------------------------------------------------------------------
    // Linked-list helpers (operate on the arena by index)
    // -----------------------------------------------------------------------

    /// Inserts node `idx` immediately after sentinel `head` (MRU position).
    #[inline]
    fn link_after(&mut self, head: usize, idx: usize) {
        let old_first = self.nodes[head].next;
        self.nodes[idx].prev = head;
        self.nodes[idx].next = old_first;
        self.nodes[head].next = idx;
        self.nodes[old_first].prev = idx;
    }

    /// Removes node `idx` from its current position.
    #[inline]
    fn unlink(&mut self, idx: usize) {
        let prev = self.nodes[idx].prev;
        let next = self.nodes[idx].next;
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;
        self.nodes[idx].prev = NULL;
        self.nodes[idx].next = NULL;
    }

    fn alloc_node(&mut self, key: K, segment: Segment) -> usize {
        if let Some(idx) = self.free_list.pop() {
            let node = &mut self.nodes[idx];
            node.key = Some(key);
            node.prev = NULL;
            node.next = NULL;
            node.segment = segment;
            idx
        } else {
            let idx = self.nodes.len();
            self.nodes.push(PolicyNode {
                key: Some(key),
                prev: NULL,
                next: NULL,
                segment,
            });
            idx
        }
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    /// Segment a key currently occupies, or `None` if untracked.
    pub fn segment_of(&self, key: &K) -> Option<Segment> {
        self.index.get(key).map(|&idx| self.nodes[idx].segment)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Total tracked keys across all three segments.
    pub fn len(&self) -> usize {
        self.window_len + self.probation_len + self.protected_len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    pub fn probation_len(&self) -> usize {
        self.probation_len
    }

    pub fn protected_len(&self) -> usize {
        self.protected_len
    }

    /// The shared sketch handle.
    pub fn sketch(&self) -> &Rc<RefCell<EvolvingSketch<K, F>>> {
        &self.sketch
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
