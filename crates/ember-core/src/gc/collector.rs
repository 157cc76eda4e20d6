//! Mark-sweep garbage collector
//!
//! Marks from the transient root set plus the roots the VM hands in (operand
//! stack, globals, pending exception), then sweeps every unmarked cell.

use super::heap::Heap;
use super::roots::RootSet;
use super::{GcRef, HeapObject};
use crate::value::Value;
use std::time::{Duration, Instant};

/// Garbage collector statistics
#[derive(Debug, Clone, Default)]
pub struct GcStats {
    /// Total number of collections
    pub collections: usize,

    /// Total objects freed
    pub objects_freed: usize,

    /// Objects freed by the last collection
    pub last_freed: usize,

    /// Total pause time
    pub total_pause_time: Duration,

    /// Last collection duration
    pub last_pause_time: Duration,
}

/// Heap statistics
#[derive(Debug, Clone)]
pub struct HeapStats {
    /// Number of live objects
    pub live_objects: usize,

    /// Number of cells (live and free)
    pub capacity: usize,

    /// Live object count that triggers the next collection
    pub threshold: usize,

    /// Number of transient roots
    pub root_depth: usize,
}

/// Mark-sweep garbage collector
#[derive(Debug)]
pub struct GarbageCollector {
    /// Heap allocator
    heap: Heap,

    /// Transient roots
    roots: RootSet,

    /// Live object count that triggers a collection
    threshold: usize,

    /// Threshold floor after a collection
    initial_threshold: usize,

    /// Collect before every allocation
    stress: bool,

    /// Statistics
    stats: GcStats,
}

impl GarbageCollector {
    /// Create a new collector
    pub fn new(threshold: usize, max_objects: Option<usize>, stress: bool) -> Self {
        let threshold = threshold.max(1);
        Self {
            heap: Heap::with_limit(max_objects),
            roots: RootSet::new(),
            threshold,
            initial_threshold: threshold,
            stress,
            stats: GcStats::default(),
        }
    }

    /// Heap
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Heap, mutably
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// Transient roots
    pub fn roots(&self) -> &RootSet {
        &self.roots
    }

    /// Transient roots, mutably
    pub fn roots_mut(&mut self) -> &mut RootSet {
        &mut self.roots
    }

    /// Set GC threshold
    pub fn set_threshold(&mut self, objects: usize) {
        self.threshold = objects.max(1);
        self.initial_threshold = self.threshold;
    }

    /// Enable or disable collection before every allocation
    pub fn set_stress(&mut self, stress: bool) {
        self.stress = stress;
    }

    /// Check if the next allocation should collect first
    pub fn should_collect(&self) -> bool {
        self.stress || self.heap.live_count() >= self.threshold
    }

    /// Allocate without collecting
    ///
    /// Hands the object back when the heap limit is reached.
    pub fn allocate(&mut self, object: HeapObject) -> Result<GcRef, HeapObject> {
        self.heap.allocate(object)
    }

    /// Run garbage collection
    ///
    /// `external` holds every root the collector does not own. Returns the
    /// number of objects freed.
    pub fn collect<I>(&mut self, external: I) -> usize
    where
        I: IntoIterator<Item = Value>,
    {
        let start = Instant::now();

        // Mark phase
        let mut gray: Vec<GcRef> = self
            .roots
            .iter()
            .chain(external)
            .filter_map(|value| value.heap_ref())
            .collect();
        while let Some(r) = gray.pop() {
            if self.heap.mark(r) {
                if let Some(object) = self.heap.get(r) {
                    object.trace(&mut gray);
                }
            }
        }

        // Sweep phase
        let freed = self.heap.sweep();

        // Update stats
        let duration = start.elapsed();
        self.stats.collections += 1;
        self.stats.objects_freed += freed;
        self.stats.last_freed = freed;
        self.stats.last_pause_time = duration;
        self.stats.total_pause_time += duration;

        // Adjust threshold (grow by 2x current usage)
        let live = self.heap.live_count();
        self.threshold = (live * 2).max(self.initial_threshold);

        tracing::debug!(
            freed,
            live,
            threshold = self.threshold,
            pause_us = duration.as_micros() as u64,
            "gc cycle finished"
        );

        freed
    }

    /// Get GC statistics
    pub fn stats(&self) -> &GcStats {
        &self.stats
    }

    /// Get heap statistics
    pub fn heap_stats(&self) -> HeapStats {
        HeapStats {
            live_objects: self.heap.live_count(),
            capacity: self.heap.capacity(),
            threshold: self.threshold,
            root_depth: self.roots.depth(),
        }
    }
}

impl Default for GarbageCollector {
    fn default() -> Self {
        Self::new(1024, None, false)
    }
}
