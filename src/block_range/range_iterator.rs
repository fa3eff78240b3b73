use std::{fmt, marker::PhantomData, ops::RangeInclusive};

use alloy::primitives::BlockNumber;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub struct Forward;
pub struct Reverse;

/// An inclusive block interval queried as one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub struct ChunkDescriptor {
    pub from_block: BlockNumber,
    pub to_block: BlockNumber,
}

impl ChunkDescriptor {
    /// # Panics
    ///
    /// Panics if `from_block > to_block`.
    #[must_use]
    pub const fn new(from_block: BlockNumber, to_block: BlockNumber) -> Self {
        assert!(from_block <= to_block, "chunk must not be inverted");
        Self { from_block, to_block }
    }

    /// Number of blocks covered.
    #[must_use]
    pub const fn width(&self) -> u64 {
        self.to_block - self.from_block + 1
    }

    #[must_use]
    pub const fn contains(&self, block: BlockNumber) -> bool {
        self.from_block <= block && block <= self.to_block
    }

    /// Splits into two contiguous halves, or `None` for a single block.
    #[must_use]
    pub const fn split(&self) -> Option<(ChunkDescriptor, ChunkDescriptor)> {
        if self.from_block == self.to_block {
            return None;
        }
        let mid = self.from_block + (self.to_block - self.from_block) / 2;
        Some((
            ChunkDescriptor { from_block: self.from_block, to_block: mid },
            ChunkDescriptor { from_block: mid + 1, to_block: self.to_block },
        ))
    }

    #[must_use]
    pub const fn range(&self) -> RangeInclusive<BlockNumber> {
        self.from_block..=self.to_block
    }
}

impl From<RangeInclusive<BlockNumber>> for ChunkDescriptor {
    fn from(range: RangeInclusive<BlockNumber>) -> Self {
        ChunkDescriptor::new(*range.start(), *range.end())
    }
}

impl fmt::Display for ChunkDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.from_block, self.to_block)
    }
}

/// Lower bound of a scan: the requested start, but never before the contract existed.
#[must_use]
pub fn effective_floor(requested: BlockNumber, first_existence_block: BlockNumber) -> BlockNumber {
    requested.max(first_existence_block)
}

/// Emits contiguous chunks of at most `chunk_size` blocks covering `[floor, tip]`.
///
/// The floor handed to [`ChunkPlanner::forward`] / [`ChunkPlanner::backward`] is clamped to the
/// first-existence block first, so ranges known to be empty are never queried.
#[derive(Debug, Clone, Copy)]
pub struct ChunkPlanner {
    first_existence_block: BlockNumber,
}

impl ChunkPlanner {
    #[must_use]
    pub const fn new(first_existence_block: BlockNumber) -> Self {
        Self { first_existence_block }
    }

    #[must_use]
    pub fn effective_floor(&self, requested: BlockNumber) -> BlockNumber {
        effective_floor(requested, self.first_existence_block)
    }

    /// Ascending chunks from the effective floor up to `tip`.
    #[must_use]
    pub fn forward(
        &self,
        floor: BlockNumber,
        tip: BlockNumber,
        chunk_size: u64,
    ) -> RangeIterator<Forward> {
        RangeIterator::forward(self.effective_floor(floor), tip, chunk_size)
    }

    /// Descending chunks from `tip` down to the effective floor, produced lazily.
    #[must_use]
    pub fn backward(
        &self,
        floor: BlockNumber,
        tip: BlockNumber,
        chunk_size: u64,
    ) -> RangeIterator<Reverse> {
        RangeIterator::reverse(tip, self.effective_floor(floor), chunk_size)
    }
}

/// An iterator that yields chunks of a configurable size.
#[derive(Debug, Clone)]
pub struct RangeIterator<D> {
    current: BlockNumber,
    end: BlockNumber,
    chunk_size: u64,
    batch_count: u64,
    total_batches: u64,
    _direction: PhantomData<D>,
}

impl RangeIterator<Forward> {
    /// Yields chunks from `start` toward `end`, inclusive.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is 0.
    #[must_use]
    pub const fn forward(start: BlockNumber, end: BlockNumber, chunk_size: u64) -> Self {
        assert!(chunk_size >= 1, "chunk_size must be at least 1");
        let total_batches = if start > end { 0 } else { (end - start) / chunk_size + 1 };
        Self {
            current: start,
            end,
            chunk_size,
            batch_count: 0,
            total_batches,
            _direction: PhantomData,
        }
    }
}

impl RangeIterator<Reverse> {
    /// Yields chunks from `start` (higher) toward `end` (lower), inclusive.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is 0.
    #[must_use]
    pub const fn reverse(start: BlockNumber, end: BlockNumber, chunk_size: u64) -> Self {
        assert!(chunk_size >= 1, "chunk_size must be at least 1");
        let total_batches = if start < end { 0 } else { (start - end) / chunk_size + 1 };
        Self {
            current: start,
            end,
            chunk_size,
            batch_count: 0,
            total_batches,
            _direction: PhantomData,
        }
    }
}

impl<D> RangeIterator<D>
where
    RangeIterator<D>: Iterator<Item = ChunkDescriptor>,
{
    /// Pulls up to `k` further chunks.
    pub fn next_batch(&mut self, k: usize) -> Vec<ChunkDescriptor> {
        self.by_ref().take(k).collect()
    }
}

impl<D> RangeIterator<D> {
    /// Returns the number of chunks yielded so far.
    #[must_use]
    pub fn batch_count(&self) -> u64 {
        self.batch_count
    }

    /// Returns `true` once every chunk has been yielded.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.batch_count >= self.total_batches
    }
}

impl Iterator for RangeIterator<Forward> {
    type Item = ChunkDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_exhausted() {
            return None;
        }

        self.batch_count += 1;
        if self.batch_count % 10 == 0 {
            trace!(batch_count = self.batch_count, "Planned forward chunks");
        }

        let from_block = self.current;
        let to_block = from_block.saturating_add(self.chunk_size - 1).min(self.end);
        self.current = to_block + 1;

        Some(ChunkDescriptor { from_block, to_block })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.total_batches - self.batch_count) {
            Ok(remaining) => (remaining, Some(remaining)),
            Err(_) => (usize::MAX, None),
        }
    }
}

impl Iterator for RangeIterator<Reverse> {
    type Item = ChunkDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_exhausted() {
            return None;
        }

        self.batch_count += 1;
        if self.batch_count % 10 == 0 {
            trace!(batch_count = self.batch_count, "Planned reverse chunks");
        }

        let to_block = self.current;
        let from_block = to_block.saturating_sub(self.chunk_size - 1).max(self.end);
        self.current = from_block.saturating_sub(1);

        Some(ChunkDescriptor { from_block, to_block })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.total_batches - self.batch_count) {
            Ok(remaining) => (remaining, Some(remaining)),
            Err(_) => (usize::MAX, None),
        }
    }
}
