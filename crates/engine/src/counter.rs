//! Shared byte counter incremented from many concurrent workers

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Process-wide monotonically increasing count of bytes transferred.
///
/// Cheap to clone; all clones share the same underlying counter. Add-only
/// for the lifetime of one engine invocation, so relaxed ordering is
/// sufficient: the only cross-worker coordination is the sum itself.
#[derive(Debug, Clone, Default)]
pub struct ByteCounter {
    total: Arc<AtomicU64>,
}

impl ByteCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Account `n` transferred bytes.
    pub fn add(&self, n: u64) {
        self.total.fetch_add(n, Ordering::Relaxed);
    }

    /// Current total.
    #[must_use]
    pub fn load(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_total() {
        let counter = ByteCounter::new();
        let other = counter.clone();
        counter.add(10);
        other.add(32);
        assert_eq!(counter.load(), 42);
        assert_eq!(other.load(), 42);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adds_are_not_lost() {
        const WORKERS: u64 = 16;
        const ADDS: u64 = 1000;
        const AMOUNT: u64 = 7;

        let counter = ByteCounter::new();
        let mut handles = Vec::new();
        for _ in 0..WORKERS {
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..ADDS {
                    counter.add(AMOUNT);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(counter.load(), WORKERS * ADDS * AMOUNT);
    }
}
