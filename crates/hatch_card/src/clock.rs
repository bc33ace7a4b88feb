//! Time sources.
//!
//! Everything in the card is expressed in milliseconds since the Unix epoch,
//! because the persisted timer payloads and the host's timer attributes are
//! wall-clock based.

use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;

use tokio::time::Instant;

/// Milliseconds since the Unix epoch.
pub type Millis = i64;

pub trait Clock: Send + Sync {
    fn now_ms(&self) -> Millis;
}

/// Wall clock anchored once at construction and advanced by the tokio clock.
///
/// Under `tokio::time::pause()` this clock stands still and moves only with
/// `tokio::time::advance`, which keeps paused-time tests deterministic.
#[derive(Debug, Clone)]
pub struct AnchoredClock {
    anchor_ms: Millis,
    anchor: Instant,
}

impl AnchoredClock {
    pub fn new() -> Self {
        Self::starting_at(chrono::Utc::now().timestamp_millis())
    }

    pub fn starting_at(anchor_ms: Millis) -> Self {
        Self {
            anchor_ms,
            anchor: Instant::now(),
        }
    }
}

impl Default for AnchoredClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for AnchoredClock {
    fn now_ms(&self) -> Millis {
        let elapsed = self.anchor.elapsed().as_millis();
        self.anchor_ms + i64::try_from(elapsed).unwrap_or(i64::MAX - self.anchor_ms)
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now_ms: Millis) -> Self {
        Self {
            now: AtomicI64::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: Millis) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, by_ms: Millis) {
        self.now.fetch_add(by_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.now.load(Ordering::SeqCst)
    }
}

impl<T: Clock + ?Sized> Clock for std::sync::Arc<T> {
    fn now_ms(&self) -> Millis {
        (**self).now_ms()
    }
}
