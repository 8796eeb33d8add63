use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use crate::domain::LiveResult;

/// Frame counter and latest result of the live camera stream.
///
/// Frame analysis writes through [`LiveCapture::publish`] and the page reads through
/// [`LiveCapture::try_read`]; the slot lock keeps them from seeing a half written result.
pub struct LiveCapture {
    sample_rate: u64,
    frames: AtomicU64,
    latest: RwLock<Option<LiveResult>>,
}

impl LiveCapture {
    pub fn new(sample_rate: u64) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            frames: AtomicU64::new(0),
            latest: RwLock::new(None),
        }
    }

    pub fn sample_rate(&self) -> u64 {
        self.sample_rate
    }

    /// Counts a received frame. Returns its index and whether it must be analysed.
    pub fn next_frame(&self) -> (u64, bool) {
        let index = self.frames.fetch_add(1, Ordering::SeqCst);
        (index, index % self.sample_rate == 0)
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::SeqCst)
    }

    /// Stores `result` unless a newer frame was already published. Returns whether it was stored.
    pub async fn publish(&self, result: LiveResult) -> bool {
        let mut latest = self.latest.write().await;
        if latest.as_ref().is_some_and(|current| current.frame > result.frame) {
            return false;
        }
        *latest = Some(result);
        true
    }

    pub async fn try_read(&self) -> Option<LiveResult> {
        self.latest.read().await.clone()
    }

    pub async fn reset(&self) {
        let mut latest = self.latest.write().await;
        *latest = None;
        self.frames.store(0, Ordering::SeqCst);
    }
}
