use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::engine::codec::TimingData;

#[derive(Debug, Default)]
pub struct SessionMetrics {
    batches_sent: AtomicU64,
    rows_sent: AtomicU64,
    bytes_sent: AtomicU64,
    batches_received: AtomicU64,
    rows_received: AtomicU64,
    bytes_received: AtomicU64,
    timing_reports: AtomicU64,
    last_timing: Mutex<Option<TimingData>>,
}

impl SessionMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on_batch_sent(&self, rows: u64, bytes: u64) {
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
        self.rows_sent.fetch_add(rows, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn on_batch_received(&self, rows: u64, bytes: u64) {
        self.batches_received.fetch_add(1, Ordering::Relaxed);
        self.rows_received.fetch_add(rows, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_timing(&self, timing: TimingData) {
        self.timing_reports.fetch_add(1, Ordering::Relaxed);
        *self.last_timing.lock() = Some(timing);
    }

    pub fn batches_sent(&self) -> u64 {
        self.batches_sent.load(Ordering::Relaxed)
    }

    pub fn rows_sent(&self) -> u64 {
        self.rows_sent.load(Ordering::Relaxed)
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    pub fn batches_received(&self) -> u64 {
        self.batches_received.load(Ordering::Relaxed)
    }

    pub fn rows_received(&self) -> u64 {
        self.rows_received.load(Ordering::Relaxed)
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received.load(Ordering::Relaxed)
    }

    pub fn timing_reports(&self) -> u64 {
        self.timing_reports.load(Ordering::Relaxed)
    }

    pub fn last_timing(&self) -> Option<TimingData> {
        *self.last_timing.lock()
    }
}
