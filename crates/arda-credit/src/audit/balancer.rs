use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// Routes each message to the partition that has received the fewest bytes
/// from this process so far. Ties go to the lowest partition id.
#[derive(Debug, Default)]
pub struct LeastBytesBalancer {
    written: Mutex<BTreeMap<i32, u64>>,
}

impl LeastBytesBalancer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks a partition for a message of `bytes` and charges it immediately.
    pub fn pick(&self, partitions: &[i32], bytes: u64) -> Option<i32> {
        let mut written = self.written.lock().unwrap_or_else(PoisonError::into_inner);
        let chosen = partitions
            .iter()
            .copied()
            .min_by_key(|partition| (written.get(partition).copied().unwrap_or(0), *partition))?;
        *written.entry(chosen).or_insert(0) += bytes;
        Some(chosen)
    }

    pub fn written(&self, partition: i32) -> u64 {
        self.written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&partition)
            .copied()
            .unwrap_or(0)
    }
}
