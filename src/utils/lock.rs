// src/utils/lock.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type ShiftKey = (String, String);

/// Hands out one exclusive lock per `(exam, shift)`.
///
/// Writers to the same shift queue behind each other; different shifts and
/// different exams never contend.
#[derive(Default)]
pub struct ShiftLocks {
    locks: Mutex<HashMap<ShiftKey, Arc<AsyncMutex<()>>>>,
}

impl ShiftLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, exam_key: &str, shift_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // Forget locks nobody is holding or waiting on.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry((exam_key.to_string(), shift_id.to_string()))
                .or_default()
                .clone()
        };
        lock.lock_owned().await
    }

    pub fn tracked(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}
