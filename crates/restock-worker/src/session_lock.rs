// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session mutual exclusion.
//!
//! One external session must never be driven by two automation calls at
//! once. Workers take the session's lock for the duration of the call.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Keyed map of async mutexes, one per session handle.
#[derive(Debug, Default)]
pub struct SessionLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `session_id`.
    pub async fn lock(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }

    /// Forget the lock of `session_id` if nobody holds or waits for it.
    pub fn release_idle(&self, session_id: &str) {
        self.locks
            .remove_if(session_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }

    /// Number of sessions with a live lock entry.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_session_is_serialized() {
        let locks = Arc::new(SessionLocks::new());
        let guard = locks.lock("s1").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock("s1").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn different_sessions_do_not_block() {
        let locks = SessionLocks::new();
        let _a = locks.lock("a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock("b")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn idle_entries_are_released() {
        let locks = SessionLocks::new();
        let guard = locks.lock("s1").await;
        locks.release_idle("s1");
        assert_eq!(locks.len(), 1, "held lock must stay");

        drop(guard);
        locks.release_idle("s1");
        assert!(locks.is_empty());
    }
}
