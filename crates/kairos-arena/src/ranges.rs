//! Tracking of rows touched since the last commit.

use std::ops::Range;

use smallvec::SmallVec;

/// Sorted, disjoint, non-adjacent list of row ranges with pending deltas.
///
/// `adjust()` walks only these ranges, so an entity whose state did not
/// change in a tick costs nothing to commit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangedRanges {
    ranges: SmallVec<[Range<usize>; 4]>,
}

impl ChangedRanges {
    /// An empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no row is marked.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// The marked ranges in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        self.ranges.iter().cloned()
    }

    /// Whether `row` falls inside a marked range.
    pub fn contains(&self, row: usize) -> bool {
        self.ranges.iter().any(|r| r.contains(&row))
    }

    /// Mark `[start, start + count)`, merging with overlapping or
    /// adjacent ranges.
    pub fn mark(&mut self, start: usize, count: usize) {
        if count == 0 {
            return;
        }
        let mut lo = start;
        let mut hi = start + count;

        // First range that ends at or after `lo` may touch the new one.
        let first = self.ranges.partition_point(|r| r.end < lo);
        let mut last = first;
        while last < self.ranges.len() && self.ranges[last].start <= hi {
            lo = lo.min(self.ranges[last].start);
            hi = hi.max(self.ranges[last].end);
            last += 1;
        }
        self.ranges.drain(first..last);
        self.ranges.insert(first, lo..hi);
    }

    /// Mark every row of a buffer of length `len`.
    pub fn mark_all(&mut self, len: usize) {
        self.ranges.clear();
        if len > 0 {
            self.ranges.push(0..len);
        }
    }

    /// Drop the parts of every range at or beyond `len`.
    pub fn truncate(&mut self, len: usize) {
        self.ranges.retain(|r| r.start < len);
        if let Some(last) = self.ranges.last_mut() {
            last.end = last.end.min(len);
        }
    }

    /// Forget every mark.
    pub fn clear(&mut self) {
        self.ranges.clear();
    }
}
