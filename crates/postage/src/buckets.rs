//! Collision bucket accounting.
//!
//! A postage batch of depth `d` can stamp at most `2^(d - BUCKET_DEPTH)`
//! chunks in each of the [`BUCKET_COUNT`] buckets. [`PostageBuckets`] counts
//! how many chunks fall into every bucket and derives the smallest depth
//! that accommodates the fullest one.

use bzzup_primitives::{BUCKET_COUNT, BUCKET_DEPTH, BucketId, ChunkAddress, MIN_BATCH_DEPTH, bucket_of};

/// Number of chunks a batch of `depth` can stamp in one bucket.
///
/// Depths at or below [`BUCKET_DEPTH`] hold a single chunk per bucket.
pub fn bucket_capacity(depth: u8) -> u64 {
    let shift = depth.saturating_sub(BUCKET_DEPTH);
    1u64.checked_shl(shift as u32).unwrap_or(u64::MAX)
}

/// Per-bucket collision counters for one evaluation session.
#[derive(Debug, Clone)]
pub struct PostageBuckets {
    counters: Box<[u32]>,
    max_collisions: u32,
    total_chunks: u64,
    min_depth: u8,
}

impl PostageBuckets {
    /// Creates empty counters. Depths below `min_depth` are never reported,
    /// and `min_depth` itself is raised to the network minimum.
    pub fn new(min_depth: u8) -> Self {
        Self {
            counters: vec![0u32; BUCKET_COUNT].into_boxed_slice(),
            max_collisions: 0,
            total_chunks: 0,
            min_depth: min_depth.max(MIN_BATCH_DEPTH),
        }
    }

    /// Records one chunk in `bucket`.
    pub fn increment_collision(&mut self, bucket: BucketId) {
        if let Some(counter) = self.counters.get_mut(bucket.index()) {
            *counter = counter.saturating_add(1);
            self.max_collisions = self.max_collisions.max(*counter);
        }
        self.total_chunks += 1;
    }

    /// Records one chunk by its address.
    pub fn add_address(&mut self, address: &ChunkAddress) {
        self.increment_collision(bucket_of(address));
    }

    /// Smallest depth, not below the minimum, whose per-bucket capacity
    /// fits the fullest bucket.
    pub fn required_depth(&self) -> u8 {
        let needed = if self.max_collisions <= 1 {
            BUCKET_DEPTH
        } else {
            // ceil(log2(max_collisions))
            let bits = 32 - (self.max_collisions - 1).leading_zeros();
            BUCKET_DEPTH + bits as u8
        };
        needed.max(self.min_depth)
    }

    /// Collisions recorded in `bucket`.
    pub fn collisions(&self, bucket: BucketId) -> u32 {
        self.counters.get(bucket.index()).copied().unwrap_or_default()
    }

    /// Highest collision count over all buckets.
    pub fn max_collisions(&self) -> u32 {
        self.max_collisions
    }

    /// Number of chunks recorded so far.
    pub fn total_chunks(&self) -> u64 {
        self.total_chunks
    }

    pub fn min_depth(&self) -> u8 {
        self.min_depth
    }
}

impl Default for PostageBuckets {
    fn default() -> Self {
        Self::new(MIN_BATCH_DEPTH)
    }
}

impl<'a> Extend<&'a ChunkAddress> for PostageBuckets {
    fn extend<I: IntoIterator<Item = &'a ChunkAddress>>(&mut self, iter: I) {
        for address in iter {
            self.add_address(address);
        }
    }
}
