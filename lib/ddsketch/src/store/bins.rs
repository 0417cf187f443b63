//! Growable array of bin counters shared by the dense stores.

use ddsketch_protos::sketches::Store as ProtoStore;
use tracing::{debug, trace};

use super::validate_count;
use crate::error::{MalformedMessageSnafu, SketchError};

/// How a bin array behaves once its key range outgrows its capacity.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) enum Growth {
    /// Grow without bound.
    Unbounded,

    /// Never grow past `bin_limit` bins, folding the lowest keys into the lowest bin.
    CollapseLowest { bin_limit: usize },

    /// Never grow past `bin_limit` bins, folding the highest keys into the highest bin.
    CollapseHighest { bin_limit: usize },
}

impl Growth {
    pub(super) fn bin_limit(self) -> Option<usize> {
        match self {
            Self::Unbounded => None,
            Self::CollapseLowest { bin_limit } | Self::CollapseHighest { bin_limit } => Some(bin_limit),
        }
    }
}

/// Contiguous bin counters over a window of keys.
///
/// `bins[i]` holds the count for key `i + offset`. Every non-zero counter lies within `[min_key, max_key]`, which is
/// itself contained in the window. An empty array uses `i32::MAX` and `i32::MIN` as its minimum and maximum keys so
/// that any key extends the range.
#[derive(Clone, Debug)]
pub(super) struct BinArray {
    bins: Vec<f64>,
    count: f64,
    min_key: i32,
    max_key: i32,
    offset: i64,
    chunk_size: usize,
    growth: Growth,
    is_collapsed: bool,
}

impl BinArray {
    pub(super) fn new(growth: Growth, chunk_size: usize) -> Self {
        Self {
            bins: Vec::new(),
            count: 0.0,
            min_key: i32::MAX,
            max_key: i32::MIN,
            offset: 0,
            chunk_size,
            growth,
            is_collapsed: false,
        }
    }

    pub(super) fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub(super) fn growth(&self) -> Growth {
        self.growth
    }

    pub(super) fn is_collapsed(&self) -> bool {
        self.is_collapsed
    }

    pub(super) fn len(&self) -> usize {
        self.bins.len()
    }

    pub(super) fn count(&self) -> f64 {
        self.count
    }

    pub(super) fn is_empty(&self) -> bool {
        self.count == 0.0
    }

    pub(super) fn min_key(&self) -> Option<i32> {
        (!self.is_empty()).then_some(self.min_key)
    }

    pub(super) fn max_key(&self) -> Option<i32> {
        (!self.is_empty()).then_some(self.max_key)
    }

    pub(super) fn add(&mut self, key: i32, weight: f64) {
        if !(weight > 0.0) {
            return;
        }

        let index = self.index_of(key);
        self.bins[index] += weight;
        self.count += weight;
    }

    pub(super) fn clear(&mut self) {
        self.bins = Vec::new();
        self.count = 0.0;
        self.min_key = i32::MAX;
        self.max_key = i32::MIN;
        self.offset = 0;
        self.is_collapsed = false;
    }

    pub(super) fn copy_from(&mut self, other: &Self) {
        self.bins.clone_from(&other.bins);
        self.count = other.count;
        self.min_key = other.min_key;
        self.max_key = other.max_key;
        self.offset = other.offset;
        self.chunk_size = other.chunk_size;
        self.growth = other.growth;
        self.is_collapsed = other.is_collapsed;
    }

    /// Iterates over the occupied keys, including the ones with a zero count.
    fn occupied(&self) -> impl Iterator<Item = (i32, f64)> + '_ {
        let window = if self.is_empty() {
            &[][..]
        } else {
            &self.bins[self.slot(self.min_key)..=self.slot(self.max_key)]
        };

        let min_key = self.min_key;
        window
            .iter()
            .enumerate()
            .map(move |(i, &count)| (min_key + i as i32, count))
    }

    pub(super) fn bins(&self) -> impl Iterator<Item = (i32, f64)> + '_ {
        self.occupied().filter(|&(_, count)| count > 0.0)
    }

    pub(super) fn key_at_rank(&self, rank: f64, lower: bool) -> Option<i32> {
        if self.is_empty() {
            return None;
        }

        let mut running = 0.0;
        for (key, count) in self.occupied() {
            running += count;
            if (lower && running > rank) || (!lower && running >= rank + 1.0) {
                return Some(key);
            }
        }

        Some(self.max_key)
    }

    pub(super) fn merge(&mut self, other: &Self) {
        if other.is_empty() {
            return;
        }

        if self.is_empty() && self.growth == other.growth && self.chunk_size == other.chunk_size {
            self.copy_from(other);
            return;
        }

        if other.min_key < self.min_key || other.max_key > self.max_key {
            self.extend_range(other.min_key, other.max_key);
        }

        // Keys of `other` that fall outside of our (possibly collapsed) range are folded into the boundary bin.
        let mut keys = other.min_key..=other.max_key;
        match self.growth {
            Growth::Unbounded => {}
            Growth::CollapseLowest { .. } => {
                let end = self.min_key.min(other.max_key.saturating_add(1));
                if end > other.min_key {
                    let folded: f64 = other.bins[other.slot(other.min_key)..other.slot(end)].iter().sum();
                    self.bins[0] += folded;
                    keys = end..=other.max_key;
                }
            }
            Growth::CollapseHighest { .. } => {
                let start = (i64::from(self.max_key) + 1).max(i64::from(other.min_key));
                if i64::from(other.max_key) >= start {
                    let start = start as i32;
                    let folded: f64 = other.bins[other.slot(start)..=other.slot(other.max_key)].iter().sum();
                    let last = self.bins.len() - 1;
                    self.bins[last] += folded;
                    keys = other.min_key..=start - 1;
                }
            }
        }

        for key in keys {
            let slot = self.slot(key);
            self.bins[slot] += other.bins[other.slot(key)];
        }
        self.count += other.count;
    }

    pub(super) fn to_proto(&self) -> ProtoStore {
        if self.is_empty() {
            return ProtoStore {
                contiguous_bin_index_offset: Some(0),
                ..Default::default()
            };
        }

        ProtoStore {
            bin_counts: Default::default(),
            contiguous_bin_counts: self.occupied().map(|(_, count)| count).collect(),
            contiguous_bin_index_offset: Some(self.min_key),
        }
    }

    pub(super) fn merge_from_proto(&mut self, proto: &ProtoStore) -> Result<(), SketchError> {
        let contiguous_offset = match proto.contiguous_bin_index_offset {
            Some(offset) => i64::from(offset),
            None if proto.contiguous_bin_counts.is_empty() => 0,
            None => {
                return MalformedMessageSnafu {
                    reason: "store has contiguous bin counts but no contiguous bin index offset",
                }
                .fail()
            }
        };

        // Validate everything up front so that a malformed message leaves the store untouched.
        let mut contiguous = Vec::with_capacity(proto.contiguous_bin_counts.len());
        for (i, &count) in proto.contiguous_bin_counts.iter().enumerate() {
            let key = contiguous_offset + i as i64;
            let Ok(key) = i32::try_from(key) else {
                return MalformedMessageSnafu {
                    reason: format!("contiguous bin key {} is out of range", key),
                }
                .fail();
            };
            validate_count(key, count)?;
            contiguous.push((key, count));
        }
        for (&key, &count) in &proto.bin_counts {
            validate_count(key, count)?;
        }

        for (key, count) in contiguous {
            self.add(key, count);
        }
        for (&key, &count) in &proto.bin_counts {
            self.add(key, count);
        }

        Ok(())
    }

    /// Returns the position of the given key in the array, which must cover it.
    fn slot(&self, key: i32) -> usize {
        (i64::from(key) - self.offset) as usize
    }

    /// Returns the position of the counter that the given key is added to, growing, shifting, or collapsing the array
    /// as needed.
    fn index_of(&mut self, key: i32) -> usize {
        if key < self.min_key {
            if self.is_collapsed && matches!(self.growth, Growth::CollapseLowest { .. }) {
                return 0;
            }
            self.extend_range(key, key);
            if self.is_collapsed && matches!(self.growth, Growth::CollapseLowest { .. }) && key < self.min_key {
                return 0;
            }
        } else if key > self.max_key {
            if self.is_collapsed && matches!(self.growth, Growth::CollapseHighest { .. }) {
                return self.bins.len() - 1;
            }
            self.extend_range(key, key);
            if self.is_collapsed && matches!(self.growth, Growth::CollapseHighest { .. }) && key > self.max_key {
                return self.bins.len() - 1;
            }
        }

        self.slot(key)
    }

    fn new_len(&self, new_min_key: i32, new_max_key: i32) -> usize {
        let desired = (i64::from(new_max_key) - i64::from(new_min_key) + 1) as usize;
        let len = desired.div_ceil(self.chunk_size).saturating_mul(self.chunk_size);
        match self.growth.bin_limit() {
            Some(bin_limit) => len.min(bin_limit),
            None => len,
        }
    }

    fn extend_range(&mut self, key: i32, second_key: i32) {
        let new_min_key = key.min(second_key).min(self.min_key);
        let new_max_key = key.max(second_key).max(self.max_key);

        if self.bins.is_empty() {
            self.bins = vec![0.0; self.new_len(new_min_key, new_max_key)];
            self.offset = i64::from(new_min_key);
            self.adjust(new_min_key, new_max_key);
        } else if i64::from(new_min_key) >= self.offset
            && i64::from(new_max_key) < self.offset + self.bins.len() as i64
        {
            self.min_key = new_min_key;
            self.max_key = new_max_key;
        } else {
            let new_len = self.new_len(new_min_key, new_max_key);
            if new_len > self.bins.len() {
                trace!(
                    from = self.bins.len(),
                    to = new_len,
                    new_min_key,
                    new_max_key,
                    "Growing bin array."
                );
                self.bins.resize(new_len, 0.0);
            }
            self.adjust(new_min_key, new_max_key);
        }
    }

    /// Places the range `[new_min_key, new_max_key]` in the array, collapsing it first if it does not fit.
    fn adjust(&mut self, new_min_key: i32, new_max_key: i32) {
        let len = self.bins.len() as i64;
        let range = i64::from(new_max_key) - i64::from(new_min_key) + 1;
        if range <= len {
            self.center(new_min_key, new_max_key);
            self.min_key = new_min_key;
            self.max_key = new_max_key;
            return;
        }

        match self.growth {
            // Unbounded arrays are always sized to fit the range.
            Growth::Unbounded => {
                self.center(new_min_key, new_max_key);
                self.min_key = new_min_key;
                self.max_key = new_max_key;
            }
            Growth::CollapseLowest { bin_limit } => {
                self.collapse_lowest(new_max_key, len);
                self.max_key = new_max_key;
                self.mark_collapsed(bin_limit);
            }
            Growth::CollapseHighest { bin_limit } => {
                self.collapse_highest(new_min_key, len);
                self.min_key = new_min_key;
                self.mark_collapsed(bin_limit);
            }
        }
    }

    fn collapse_lowest(&mut self, new_max_key: i32, len: i64) {
        let new_min = i64::from(new_max_key) - len + 1;
        // Only keys within `i32` can be collapsed into, and `new_min_key` is at most `new_max_key`.
        let new_min_key = new_min as i32;

        if new_min_key >= self.max_key {
            // Everything currently tracked falls below the new window.
            self.offset = new_min;
            self.min_key = new_min_key;
            self.bins.fill(0.0);
            self.bins[0] = self.count;
            return;
        }

        let shift = self.offset - new_min;
        if shift < 0 && self.min_key < new_min_key {
            let start = self.slot(self.min_key);
            let end = self.slot(new_min_key);
            let folded: f64 = self.bins[start..end].iter().sum();
            self.bins[start..end].fill(0.0);
            self.bins[end] += folded;
        }
        self.min_key = new_min_key;
        self.shift(shift);
    }

    fn collapse_highest(&mut self, new_min_key: i32, len: i64) {
        let new_min = i64::from(new_min_key);
        let new_max_key = (new_min + len - 1) as i32;

        if new_max_key <= self.min_key {
            // Everything currently tracked falls above the new window.
            self.offset = new_min;
            self.max_key = new_max_key;
            self.bins.fill(0.0);
            let last = self.bins.len() - 1;
            self.bins[last] = self.count;
            return;
        }

        let shift = self.offset - new_min;
        if shift > 0 && self.max_key > new_max_key {
            let start = self.slot(new_max_key) + 1;
            let end = self.slot(self.max_key) + 1;
            let folded: f64 = self.bins[start..end].iter().sum();
            self.bins[start..end].fill(0.0);
            self.bins[start - 1] += folded;
        }
        self.max_key = new_max_key;
        self.shift(shift);
    }

    fn mark_collapsed(&mut self, bin_limit: usize) {
        if !self.is_collapsed {
            debug!(
                bin_limit,
                min_key = self.min_key,
                max_key = self.max_key,
                "Store reached its bin limit and started collapsing."
            );
            self.is_collapsed = true;
        }
    }

    fn center(&mut self, new_min_key: i32, new_max_key: i32) {
        let middle_key = i64::from(new_min_key) + (i64::from(new_max_key) - i64::from(new_min_key) + 1) / 2;
        self.shift(self.offset + self.bins.len() as i64 / 2 - middle_key);
    }

    /// Moves every counter `shift` positions towards the end of the array, and the window by `shift` keys towards
    /// lower keys.
    fn shift(&mut self, shift: i64) {
        let len = self.bins.len();
        let magnitude = usize::try_from(shift.unsigned_abs()).unwrap_or(usize::MAX).min(len);
        if shift > 0 {
            self.bins.rotate_right(magnitude);
            self.bins[..magnitude].fill(0.0);
        } else if shift < 0 {
            self.bins.rotate_left(magnitude);
            self.bins[len - magnitude..].fill(0.0);
        }
        self.offset -= shift;
    }
}
