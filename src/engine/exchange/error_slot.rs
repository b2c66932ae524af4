use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::engine::errors::ExchangeError;

/// Holds the first terminal error of a session until the reader raises it.
#[derive(Debug, Default)]
pub struct ErrorSlot {
    error: Mutex<Option<ExchangeError>>,
    set: AtomicBool,
}

impl ErrorSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `err` unless an error was already recorded. Returns whether it was stored.
    pub fn set(&self, err: ExchangeError) -> bool {
        let mut slot = self.error.lock();
        if self.set.load(Ordering::Acquire) {
            return false;
        }
        *slot = Some(err);
        self.set.store(true, Ordering::Release);
        true
    }

    pub fn is_set(&self) -> bool {
        self.set.load(Ordering::Acquire)
    }

    /// Takes the stored error. Each error is handed out once.
    pub fn take(&self) -> Option<ExchangeError> {
        self.error.lock().take()
    }
}
