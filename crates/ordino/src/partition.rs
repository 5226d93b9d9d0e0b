use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Default number of partitions for the sequence keyspace. A prime count
/// keeps keys spread evenly across any number of owners.
pub const DEFAULT_PARTITIONS: u32 = 113;

/// Maps sequence names onto the partitions that own them.
///
/// The sequence name is the sole routing key: a request for a sequence
/// lands on exactly the partition owning that key, never the whole
/// cluster. Routing only has to be stable within the allocator node, so a
/// process-seeded hasher is sufficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionMap {
    partitions: u32,
}

impl Default for PartitionMap {
    fn default() -> Self {
        Self::new(DEFAULT_PARTITIONS)
    }
}

impl PartitionMap {
    /// `partitions` must be non-zero.
    pub fn new(partitions: u32) -> Self {
        debug_assert!(partitions > 0, "partition count must be non-zero");
        Self { partitions }
    }

    pub fn partitions(&self) -> u32 {
        self.partitions
    }

    /// Partition owning `key`.
    pub fn partition_for(&self, key: &str) -> u32 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % u64::from(self.partitions)) as u32
    }

    /// Index of the member owning `key` among `owners` cooperating
    /// partition owners. `owners` must be non-zero.
    pub fn owner_of(&self, key: &str, owners: usize) -> usize {
        debug_assert!(owners > 0, "owner count must be non-zero");
        self.partition_for(key) as usize % owners
    }
}
