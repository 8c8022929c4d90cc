//! Per-order-reference serialization of callback processing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Keyed async locks. Two callbacks for the same reference never run their
/// read-then-write section concurrently.
#[derive(Default)]
pub struct OrderLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl OrderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, reference: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // Drop entries nobody holds or waits on.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(reference.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_reference_is_serialized() {
        let locks = Arc::new(OrderLocks::new());
        let guard = locks.acquire("SO001").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("SO001").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("second callback should proceed once the first finished")
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_references_do_not_block() {
        let locks = OrderLocks::new();
        let _first = locks.acquire("SO001").await;
        let second = tokio::time::timeout(Duration::from_millis(100), locks.acquire("SO002")).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_released_locks_are_pruned() {
        let locks = OrderLocks::new();
        drop(locks.acquire("SO001").await);
        drop(locks.acquire("SO002").await);
        // Acquiring prunes the idle SO001 entry before inserting SO003.
        let _guard = locks.acquire("SO003").await;
        assert_eq!(locks.len(), 1);
    }
}
