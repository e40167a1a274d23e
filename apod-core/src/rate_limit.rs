//! Client-side sliding window rate limiter.
//!
//! The window is split into equal segments. Permits handed out during a
//! segment are counted against the window until the same segment slot comes
//! round again, one full window later, so expiry happens gradually instead of
//! all at once on a window boundary.
//!
//! Admission is lock-free: each slot is a single atomic word holding the
//! segment number it belongs to and the permits granted in it, and a separate
//! atomic counter tracks the permits outstanding across the whole window.

use std::{
    fmt::Debug,
    sync::{
        Arc,
        atomic::{AtomicU32, AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use tokio::sync::Semaphore;
use tracing::debug;

/// Source of elapsed time for the limiter.
pub trait Clock: Send + Sync + Debug {
    /// Time elapsed since the clock's origin. Must never go backwards.
    fn elapsed(&self) -> Duration;
}

/// Monotonic wall clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to. Useful for tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_add(nanos, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

/// Limiter settings.
///
/// `segments_per_window` is treated as at least 1, and segments are never
/// shorter than one millisecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitOptions {
    pub window: Duration,
    pub segments_per_window: u32,
    pub permit_limit: u32,
    pub queue_limit: usize,
}

impl Default for RateLimitOptions {
    /// 2000 requests per rolling hour, 3 minute segments, one queued waiter.
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60 * 60),
            segments_per_window: 20,
            permit_limit: 2000,
            queue_limit: 1,
        }
    }
}

#[derive(Debug)]
pub struct SlidingWindowLimiter {
    permit_limit: u32,
    segments: u32,
    segment_len: Duration,
    /// Per segment slot: segment number in the high half, permits in the low half.
    slots: Vec<AtomicU64>,
    outstanding: AtomicU32,
    queue: Semaphore,
    queue_limit: usize,
    clock: Arc<dyn Clock>,
}

fn pack(segment: u32, count: u32) -> u64 {
    (u64::from(segment) << 32) | u64::from(count)
}

fn unpack(word: u64) -> (u32, u32) {
    ((word >> 32) as u32, word as u32)
}

/// Slot tags keep the low 32 bits of the segment number and are compared by
/// wrapping age, see `SlidingWindowLimiter::is_live`.
fn tag(segment: u64) -> u32 {
    segment as u32
}

impl SlidingWindowLimiter {
    pub fn new(options: RateLimitOptions) -> Self {
        Self::with_clock(options, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(options: RateLimitOptions, clock: Arc<dyn Clock>) -> Self {
        let segments = options.segments_per_window.max(1);
        let segment_len = (options.window / segments).max(Duration::from_millis(1));

        Self {
            permit_limit: options.permit_limit,
            segments,
            segment_len,
            slots: (0..segments).map(|_| AtomicU64::new(pack(0, 0))).collect(),
            outstanding: AtomicU32::new(0),
            queue: Semaphore::new(options.queue_limit),
            queue_limit: options.queue_limit,
            clock,
        }
    }

    /// Take one permit if one is free right now. Never waits.
    ///
    /// Fails while another caller is queued in [`acquire`](Self::acquire),
    /// so queued callers are served first.
    pub fn try_acquire(&self) -> bool {
        if self.queue.available_permits() < self.queue_limit {
            debug!("permit denied: a queued request is waiting");
            return false;
        }
        self.admit()
    }

    /// Take one permit, waiting for replenishment if needed.
    ///
    /// Returns `false` straight away when the wait queue is already full.
    pub async fn acquire(&self) -> bool {
        if self.try_acquire() {
            return true;
        }

        let Ok(_slot) = self.queue.try_acquire() else {
            debug!("permit denied: wait queue is full");
            return false;
        };

        loop {
            if self.admit() {
                return true;
            }
            tokio::time::sleep(self.until_next_segment()).await;
        }
    }

    /// Permits that could be granted right now.
    pub fn available_permits(&self) -> u32 {
        self.expire(tag(self.current_segment()));
        self.permit_limit.saturating_sub(self.outstanding.load(Ordering::Acquire))
    }

    fn admit(&self) -> bool {
        let now = self.current_segment();
        self.expire(tag(now));

        let limit = self.permit_limit;
        let reserved = self
            .outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < limit).then_some(n + 1))
            .is_ok();

        if !reserved {
            debug!(limit, "permit denied: window is exhausted");
            return false;
        }

        self.record(now);
        true
    }

    fn current_segment(&self) -> u64 {
        let segment = self.clock.elapsed().as_nanos() / self.segment_len.as_nanos();
        u64::try_from(segment).unwrap_or(u64::MAX)
    }

    /// Whether a slot tagged `segment` still counts against the window at `now`.
    /// Tags slightly ahead of `now` come from callers that read the clock later.
    fn is_live(&self, segment: u32, now: u32) -> bool {
        let age = now.wrapping_sub(segment);
        age < self.segments || age > u32::MAX - self.segments
    }

    fn until_next_segment(&self) -> Duration {
        let len = self.segment_len.as_nanos();
        let into = self.clock.elapsed().as_nanos() % len;
        Duration::from_nanos(u64::try_from(len - into).unwrap_or(u64::MAX))
    }

    /// Return permits from every slot that has fallen out of the window.
    fn expire(&self, now: u32) {
        for slot in &self.slots {
            let word = slot.load(Ordering::Acquire);
            let (segment, count) = unpack(word);
            if count == 0 || self.is_live(segment, now) {
                continue;
            }
            if slot
                .compare_exchange(word, pack(segment, 0), Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                self.outstanding.fetch_sub(count, Ordering::AcqRel);
            }
        }
    }

    /// Count a permit already reserved in `outstanding` against segment `now`.
    fn record(&self, now: u64) {
        let slot = &self.slots[(now % u64::from(self.segments)) as usize];
        let now = tag(now);
        let mut word = slot.load(Ordering::Acquire);

        loop {
            let (segment, count) = unpack(word);
            // A slot still tagged with an older segment holds permits from a
            // full window ago; they expire as the slot is reused.
            let (next, expired) =
                if segment == now { (pack(now, count + 1), 0) } else { (pack(now, 1), count) };

            match slot.compare_exchange_weak(word, next, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => {
                    if expired > 0 {
                        self.outstanding.fetch_sub(expired, Ordering::AcqRel);
                    }
                    return;
                }
                Err(actual) => word = actual,
            }
        }
    }
}

impl Default for SlidingWindowLimiter {
    fn default() -> Self {
        Self::new(RateLimitOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEGMENT: Duration = Duration::from_secs(3 * 60);
    const HOUR: Duration = Duration::from_secs(60 * 60);

    fn limiter(options: RateLimitOptions) -> (Arc<ManualClock>, SlidingWindowLimiter) {
        let clock = Arc::new(ManualClock::new());
        let limiter = SlidingWindowLimiter::with_clock(options, clock.clone());
        (clock, limiter)
    }

    #[test]
    fn default_options_match_hourly_quota() {
        let opts = RateLimitOptions::default();
        assert_eq!(opts.window, HOUR);
        assert_eq!(opts.segments_per_window, 20);
        assert_eq!(opts.permit_limit, 2000);
        assert_eq!(opts.queue_limit, 1);
    }

    #[test]
    fn denies_the_permit_after_the_limit() {
        let (_clock, limiter) = limiter(RateLimitOptions::default());

        for i in 0..2000 {
            assert!(limiter.try_acquire(), "permit {i} should be granted");
        }
        assert!(!limiter.try_acquire());
        assert_eq!(limiter.available_permits(), 0);
    }

    #[test]
    fn permits_expire_one_window_after_their_segment() {
        let (clock, limiter) = limiter(RateLimitOptions { permit_limit: 3, ..Default::default() });

        assert!(limiter.try_acquire());
        clock.advance(SEGMENT);
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());

        // The first segment slides out; the later two permits are still held.
        clock.advance(HOUR - SEGMENT);
        assert_eq!(limiter.available_permits(), 1);
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());

        clock.advance(SEGMENT);
        assert_eq!(limiter.available_permits(), 2);
    }

    #[test]
    fn nothing_expires_within_the_window() {
        let (clock, limiter) = limiter(RateLimitOptions { permit_limit: 1, ..Default::default() });

        assert!(limiter.try_acquire());
        clock.advance(HOUR - Duration::from_secs(1));
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn reused_slot_releases_stale_permits() {
        let (clock, limiter) = limiter(RateLimitOptions { permit_limit: 2, ..Default::default() });

        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        clock.advance(HOUR * 3);
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn independent_limiters_do_not_share_state() {
        let (_c1, first) = limiter(RateLimitOptions { permit_limit: 1, ..Default::default() });
        let (_c2, second) = limiter(RateLimitOptions { permit_limit: 1, ..Default::default() });

        assert!(first.try_acquire());
        assert!(!first.try_acquire());
        assert!(second.try_acquire());
    }

    #[test]
    fn concurrent_admission_never_overshoots() {
        let options = RateLimitOptions { permit_limit: 500, ..Default::default() };
        let (_clock, limiter) = limiter(options);
        let limiter = Arc::new(limiter);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || (0..200).filter(|_| limiter.try_acquire()).count())
            })
            .collect();

        let granted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(granted, 500);
    }

    #[test]
    fn permits_keep_expiring_after_segment_numbers_wrap() {
        let (clock, limiter) = limiter(RateLimitOptions {
            window: Duration::from_millis(20),
            segments_per_window: 20,
            permit_limit: 1,
            queue_limit: 1,
        });

        clock.advance(Duration::from_millis(u64::from(u32::MAX)));
        assert!(limiter.try_acquire());

        // Ten segments later the counter has wrapped but the permit is still held.
        clock.advance(Duration::from_millis(10));
        assert!(!limiter.try_acquire());

        clock.advance(Duration::from_millis(10));
        assert_eq!(limiter.available_permits(), 1);

        assert!(limiter.try_acquire());
        clock.advance(HOUR);
        assert_eq!(limiter.available_permits(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn queue_holds_one_waiter_and_rejects_the_rest() {
        let (clock, limiter) = limiter(RateLimitOptions { permit_limit: 1, ..Default::default() });
        let limiter = Arc::new(limiter);
        assert!(limiter.try_acquire());

        let waiter = tokio::spawn({
            let limiter = limiter.clone();
            async move { limiter.acquire().await }
        });
        tokio::task::yield_now().await;

        // The single queue slot is taken, so further callers are turned away.
        assert!(!limiter.acquire().await);
        assert!(!limiter.try_acquire());

        clock.advance(HOUR);
        assert!(waiter.await.unwrap());
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn acquire_without_queue_fails_fast() {
        let (_clock, limiter) = limiter(RateLimitOptions {
            permit_limit: 1,
            queue_limit: 0,
            ..Default::default()
        });

        assert!(limiter.acquire().await);
        assert!(!limiter.acquire().await);
    }
}
