//! Range planner — splits a block interval into `getLogs`-sized chunks.
//!
//! Chunk `i` starts at `from + i * size` and ends at `from + (i + 1) * size`,
//! so neighbouring chunks share their boundary block. The last chunk always
//! ends at `to` and absorbs the remainder, giving it a width in
//! `[size, 2 * size - 1]`.

use serde::{Deserialize, Serialize};

/// An inclusive block interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRange {
    pub from: u64,
    pub to: u64,
}

impl BlockRange {
    pub fn new(from: u64, to: u64) -> Self {
        Self { from, to }
    }

    /// `to - from`, the width the planner compares against the chunk size.
    pub fn width(&self) -> u64 {
        self.to - self.from
    }
}

impl std::fmt::Display for BlockRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.from, self.to)
    }
}

/// Plan the chunks covering `[from, to]`. A `chunk_size` of 0 disables chunking.
///
/// Returns an empty plan when `to < from`.
pub fn plan(from: u64, to: u64, chunk_size: u64) -> Vec<BlockRange> {
    if to < from {
        return vec![];
    }

    let total = to - from;
    if chunk_size == 0 || total <= chunk_size {
        return vec![BlockRange::new(from, to)];
    }

    let count = total / chunk_size;
    (0..count)
        .map(|i| {
            let start = from + i * chunk_size;
            let end = if i == count - 1 { to } else { start + chunk_size };
            BlockRange::new(start, end)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(ranges: Vec<BlockRange>) -> Vec<(u64, u64)> {
        ranges.into_iter().map(|r| (r.from, r.to)).collect()
    }

    #[test]
    fn last_chunk_absorbs_remainder() {
        assert_eq!(pairs(plan(0, 250, 100)), vec![(0, 100), (100, 250)]);
    }

    #[test]
    fn narrow_range_is_single_chunk() {
        assert_eq!(pairs(plan(0, 99, 100)), vec![(0, 99)]);
        assert_eq!(pairs(plan(0, 100, 100)), vec![(0, 100)]);
    }

    #[test]
    fn zero_chunk_size_disables_chunking() {
        assert_eq!(pairs(plan(0, 50, 0)), vec![(0, 50)]);
    }

    #[test]
    fn single_block() {
        assert_eq!(pairs(plan(7, 7, 10)), vec![(7, 7)]);
    }

    #[test]
    fn inverted_range_is_empty() {
        assert!(plan(10, 9, 5).is_empty());
    }

    #[test]
    fn chunks_are_contiguous_and_bounded() {
        for (from, to, size) in [(0u64, 999u64, 100u64), (5, 1234, 37), (1000, 1301, 100)] {
            let chunks = plan(from, to, size);
            assert_eq!(chunks.first().unwrap().from, from);
            assert_eq!(chunks.last().unwrap().to, to);
            for pair in chunks.windows(2) {
                assert_eq!(pair[0].to, pair[1].from);
                assert_eq!(pair[0].width(), size);
            }
            let last = chunks.last().unwrap().width();
            assert!(last >= size && last < 2 * size, "last width {last} for size {size}");
        }
    }
}
