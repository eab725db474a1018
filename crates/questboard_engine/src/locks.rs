//! Per-user update serialization.
//!
//! The read-stats, compute, apply-rewards, write-stats cycle for one user runs
//! while holding that user's lock, so two task completions for the same user
//! cannot both observe the same pre-update statistics. An entry lives only
//! while some caller holds or waits for it, so the table stays as small as
//! the set of users with an update in flight.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Lock table keyed by user id
#[derive(Debug, Default)]
pub struct UserLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for `user_id`, created on first use
    fn handle(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run `f` while holding the lock for `user_id`, then drop the table
    /// entry if no other caller is using it
    pub fn with_user<T>(&self, user_id: &str, f: impl FnOnce() -> T) -> T {
        let handle = self.handle(user_id);
        let out = {
            let _guard = acquire(&handle);
            f()
        };
        drop(handle);
        self.release(user_id);
        out
    }

    /// Remove the entry for `user_id` when the table holds the only handle
    fn release(&self, user_id: &str) {
        let mut locks = match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if locks
            .get(user_id)
            .is_some_and(|handle| Arc::strong_count(handle) == 1)
        {
            locks.remove(user_id);
        }
    }

    /// Number of users that have a lock
    pub fn len(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Acquire a user lock. The guarded data is `()`, so a poisoned lock is
/// still safe to take.
fn acquire(handle: &Mutex<()>) -> MutexGuard<'_, ()> {
    match handle.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::thread;

    #[test]
    fn test_same_user_same_lock() {
        let locks = UserLocks::new();
        let a = locks.handle("u1");
        let b = locks.handle("u1");
        let c = locks.handle("u2");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(locks.len(), 2);
    }

    #[test]
    fn test_lock_serializes_updates() {
        let locks = Arc::new(UserLocks::new());
        let counter = Arc::new(AtomicU32::new(0));
        let mut handles = Vec::new();

        for _ in 0..8 {
            let locks = Arc::clone(&locks);
            let counter = Arc::clone(&counter);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    locks.with_user("u1", || {
                        // Non-atomic read-modify-write under the lock
                        let v = counter.load(Ordering::Relaxed);
                        counter.store(v + 1, Ordering::Relaxed);
                    });
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(counter.load(Ordering::Relaxed), 800);
        assert!(locks.is_empty());
    }

    #[test]
    fn test_entries_pruned_after_use() {
        let locks = UserLocks::new();
        for i in 0..1_000 {
            let user = format!("user-{}", i);
            assert_eq!(locks.with_user(&user, || i * 2), i * 2);
        }
        assert!(locks.is_empty());

        // An outstanding handle keeps its entry
        let held = locks.handle("u1");
        locks.with_user("u1", || ());
        assert_eq!(locks.len(), 1);
        drop(held);
        locks.with_user("u1", || ());
        assert!(locks.is_empty());
    }
}
