//! File-wide color palette with approximate nearest-color aliasing.
//!
//! Colors are counted while the mips are split into runs. At every mip boundary the counted colors
//! are accepted into the palette by descending frequency. Once the palette is full, further colors
//! are aliased to the closest accepted color instead.
//!
//! Closest-color lookups go through a coarse spatial index: accepted colors are bucketed by their
//! alpha, red and green channels divided by a fixed interval. The search widens one bucket at a
//! time, one channel after another, and then compares all four channels of the colors in the
//! bucket it settled on.

use crate::{
    consts::MAX_PALETTE_LEN,
    utils::{channel_distance, split_argb},
};
use itertools::Itertools;
use std::collections::{BTreeMap, HashMap};

pub const DEFAULT_BUCKET_INTERVAL: u8 = 20;

/// Bucket coordinates of a color: `(alpha, red, green)`, each divided by the bucket interval.
///
/// Blue is not part of the key, only of the final distance comparison.
pub type BucketKey = (u8, u8, u8);

#[derive(Debug, Clone)]
pub struct PaletteBuilder {
    occurrences: HashMap<u32, u32>,
    colors: Vec<u32>,
    /// Palette index of every accepted or aliased color.
    indices: HashMap<u32, u16>,
    buckets: BTreeMap<BucketKey, Vec<u16>>,
    capacity: usize,
    interval: u8,
}

impl Default for PaletteBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PaletteBuilder {
    pub fn new() -> Self {
        Self::with_limits(MAX_PALETTE_LEN, DEFAULT_BUCKET_INTERVAL)
    }

    /// Creates a builder accepting at most `capacity` colors (clamped to 65535) and bucketing
    /// channels by `interval` (at least 1).
    pub fn with_limits(capacity: usize, interval: u8) -> Self {
        Self {
            occurrences: HashMap::with_capacity(MAX_PALETTE_LEN),
            colors: Vec::new(),
            indices: HashMap::new(),
            buckets: BTreeMap::new(),
            capacity: capacity.min(MAX_PALETTE_LEN),
            interval: interval.max(1),
        }
    }

    /// Counts one occurrence of `color`.
    #[inline]
    pub fn register(&mut self, color: u32) {
        *self.occurrences.entry(color).or_insert(0) += 1;
    }

    /// Number of distinct colors registered since the last [`build`](Self::build).
    pub fn pending(&self) -> usize {
        self.occurrences.len()
    }

    /// Consumes the registered frequencies and maps every new color to a palette index.
    ///
    /// Colors are visited from most to least frequent (ties by ascending color value). They are
    /// appended while there is room and aliased to their nearest palette entry afterwards.
    pub fn build(&mut self) {
        let occurrences = core::mem::take(&mut self.occurrences);
        let mut aliased = 0usize;

        for (color, _) in occurrences
            .into_iter()
            .sorted_by(|(color_a, count_a), (color_b, count_b)| {
                count_b.cmp(count_a).then(color_a.cmp(color_b))
            })
        {
            if self.indices.contains_key(&color) {
                continue;
            }

            if !self.is_full() {
                let index = self.colors.len() as u16;
                let key = self.bucket_key(color);
                self.colors.push(color);
                self.indices.insert(color, index);
                self.buckets.entry(key).or_default().push(index);
            } else if let Some(index) = self.nearest(color) {
                self.indices.insert(color, index);
                aliased += 1;
            }
        }

        log::debug!(
            "palette rebuilt: {} of {} entries used, {aliased} colors aliased",
            self.colors.len(),
            self.capacity
        );
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.colors.len() >= self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Accepted colors in palette order.
    #[inline]
    pub fn colors(&self) -> &[u32] {
        &self.colors
    }

    /// Index of the palette entry that is exactly `color`.
    #[inline]
    pub fn index_of(&self, color: u32) -> Option<u16> {
        self.lookup(color)
            .filter(|&index| self.colors[usize::from(index)] == color)
    }

    /// Index `color` maps to, which may be an alias.
    #[inline]
    pub fn lookup(&self, color: u32) -> Option<u16> {
        self.indices.get(&color).copied()
    }

    pub fn bucket_key(&self, color: u32) -> BucketKey {
        let [a, r, g, _] = split_argb(color);
        (a / self.interval, r / self.interval, g / self.interval)
    }

    /// Approximate nearest accepted color, `None` if the palette is empty.
    pub fn nearest(&self, color: u32) -> Option<u16> {
        let max = u8::MAX / self.interval;
        let (a, r, g) = self.bucket_key(color);

        let a = nearest_coordinate(a, max, |a| {
            self.buckets.range((a, 0, 0)..=(a, max, max)).next().is_some()
        })?;
        let r = nearest_coordinate(r, max, |r| {
            self.buckets.range((a, r, 0)..=(a, r, max)).next().is_some()
        })?;
        let g = nearest_coordinate(g, max, |g| self.buckets.contains_key(&(a, r, g)))?;

        self.buckets[&(a, r, g)]
            .iter()
            .copied()
            .min_by_key(|&index| channel_distance(self.colors[usize::from(index)], color))
    }
}

/// Walks `target, target + 1, target - 1, target + 2, ...` within `0..=max` and returns the first
/// occupied coordinate.
fn nearest_coordinate(target: u8, max: u8, mut occupied: impl FnMut(u8) -> bool) -> Option<u8> {
    if occupied(target) {
        return Some(target);
    }

    for step in 1..=max {
        let above = target.checked_add(step).filter(|&c| c <= max);
        let below = target.checked_sub(step);
        if above.is_none() && below.is_none() {
            break;
        }

        if let Some(c) = above.filter(|&c| occupied(c)) {
            return Some(c);
        }
        if let Some(c) = below.filter(|&c| occupied(c)) {
            return Some(c);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_search_prefers_above_on_ties() {
        assert_eq!(nearest_coordinate(5, 12, |c| c == 4 || c == 6), Some(6));
        assert_eq!(nearest_coordinate(5, 12, |c| c == 3 || c == 8), Some(3));
        assert_eq!(nearest_coordinate(0, 12, |c| c == 12), Some(12));
        assert_eq!(nearest_coordinate(12, 12, |c| c == 0), Some(0));
        assert_eq!(nearest_coordinate(7, 12, |_| false), None);
    }

    #[test]
    fn bucket_key_ignores_blue() {
        let builder = PaletteBuilder::new();
        assert_eq!(builder.bucket_key(0xFF28_3C00), (12, 2, 3));
        assert_eq!(
            builder.bucket_key(0xFF28_3C00),
            builder.bucket_key(0xFF28_3CFF)
        );
    }
}
