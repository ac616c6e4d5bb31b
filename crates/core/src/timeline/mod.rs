//! Lyric scheduling against the playback position.
//!
//! [`LyricScheduler`] is a lazy iterator: each call to `next` sleeps in small
//! increments until the following line is due, polling a [`Control`] gate on
//! every increment so that a pause freezes the song position and a stop ends
//! the iteration within one poll interval.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::LyricLine;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Monotonic time source with the ability to block.
pub trait Clock {
    /// Time elapsed since an arbitrary, fixed origin.
    fn now(&self) -> Duration;
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by [`Instant`] and [`std::thread::sleep`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Virtual clock whose `sleep` advances time instantly. Clones share the
/// same time, so a test can keep a handle and observe what the scheduler did.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: Duration) {
        self.nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

/// Song position derived from a [`Clock`], excluding time spent on hold.
#[derive(Debug, Clone)]
pub struct PlaybackClock<C> {
    clock: C,
    start_at: f64,
    origin: Duration,
    held_since: Option<Duration>,
    held_total: Duration,
}

impl<C: Clock> PlaybackClock<C> {
    /// Starts counting from `start_at` seconds into the song, now.
    pub fn start(clock: C, start_at: f64) -> Self {
        let origin = clock.now();
        Self {
            clock,
            start_at,
            origin,
            held_since: None,
            held_total: Duration::ZERO,
        }
    }

    pub fn start_at(&self) -> f64 {
        self.start_at
    }

    /// Running time since start, not counting holds.
    pub fn elapsed(&self) -> Duration {
        let now = self.clock.now();
        let held = match self.held_since {
            Some(since) => self.held_total + now.saturating_sub(since),
            None => self.held_total,
        };
        now.saturating_sub(self.origin).saturating_sub(held)
    }

    /// Current song position in seconds.
    pub fn position(&self) -> f64 {
        self.start_at + self.elapsed().as_secs_f64()
    }

    pub fn hold(&mut self) {
        if self.held_since.is_none() {
            self.held_since = Some(self.clock.now());
        }
    }

    pub fn release(&mut self) {
        if let Some(since) = self.held_since.take() {
            self.held_total += self.clock.now().saturating_sub(since);
        }
    }

    pub fn sleep(&self, duration: Duration) {
        self.clock.sleep(duration);
    }
}

/// What a polled gate wants the playback loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Run,
    /// Paused: keep waiting without advancing the song position.
    Hold,
    Stop,
}

/// Cooperative cancellation and pause source, polled on every tick.
pub trait Control {
    fn poll(&mut self) -> Flow;
}

/// A gate that never pauses and never stops.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unstoppable;

impl Control for Unstoppable {
    fn poll(&mut self) -> Flow {
        Flow::Run
    }
}

/// Adapts a stop predicate into a [`Control`] gate without pause support.
#[derive(Debug, Clone, Copy)]
pub struct StopWhen<F>(pub F);

impl<F: FnMut() -> bool> Control for StopWhen<F> {
    fn poll(&mut self) -> Flow {
        if (self.0)() {
            Flow::Stop
        } else {
            Flow::Run
        }
    }
}

/// Something that can wait cooperatively. Both methods return `false` once a
/// stop has been requested.
pub trait Pacer {
    /// Blocks for as long as playback is held.
    fn checkpoint(&mut self) -> bool;
    /// Waits `seconds` of running (not held) time.
    fn pause_for(&mut self, seconds: f64) -> bool;
}

/// Converts seconds from catalog data, clamping negatives to zero and values
/// past what a [`Duration`] holds to [`Duration::MAX`].
pub fn saturating_secs(seconds: f64) -> Duration {
    if seconds.is_nan() || seconds <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
}

/// Lazily yields lyric lines as their timestamps come due.
pub struct LyricScheduler<'a, C, G> {
    lines: Vec<&'a LyricLine>,
    next: usize,
    clock: PlaybackClock<C>,
    gate: G,
    poll_interval: Duration,
    stopped: bool,
}

impl<'a, C: Clock, G: Control> LyricScheduler<'a, C, G> {
    /// Builds a scheduler starting `start_at` seconds into the song. Lines are
    /// stably sorted by timestamp so they always come out in order.
    pub fn new(lines: &'a [LyricLine], start_at: f64, clock: C, gate: G) -> Self {
        let mut lines: Vec<&LyricLine> = lines.iter().collect();
        lines.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Self {
            lines,
            next: 0,
            clock: PlaybackClock::start(clock, start_at.max(0.0)),
            gate,
            poll_interval: DEFAULT_POLL_INTERVAL,
            stopped: false,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        if !interval.is_zero() {
            self.poll_interval = interval;
        }
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn position(&self) -> f64 {
        self.clock.position()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn gate(&self) -> &G {
        &self.gate
    }

    /// Polls the gate once and updates the hold state of the clock.
    fn flow(&mut self) -> Flow {
        if self.stopped {
            return Flow::Stop;
        }
        let flow = self.gate.poll();
        match flow {
            Flow::Run => self.clock.release(),
            Flow::Hold => self.clock.hold(),
            Flow::Stop => self.stopped = true,
        }
        flow
    }

    fn wait_until(&mut self, timestamp: f64) -> bool {
        loop {
            match self.flow() {
                Flow::Stop => return false,
                Flow::Hold => {
                    self.clock.sleep(self.poll_interval);
                    continue;
                }
                Flow::Run => {}
            }
            let wait = timestamp - self.clock.position();
            if wait <= 0.0 {
                return true;
            }
            let step = saturating_secs(wait).min(self.poll_interval);
            if step.is_zero() {
                return true;
            }
            self.clock.sleep(step);
        }
    }
}

impl<C: Clock, G: Control> Pacer for LyricScheduler<'_, C, G> {
    fn checkpoint(&mut self) -> bool {
        loop {
            match self.flow() {
                Flow::Run => return true,
                Flow::Stop => return false,
                Flow::Hold => self.clock.sleep(self.poll_interval),
            }
        }
    }

    fn pause_for(&mut self, seconds: f64) -> bool {
        let mut remaining = saturating_secs(seconds);
        while !remaining.is_zero() {
            if !self.checkpoint() {
                return false;
            }
            let step = self.poll_interval.min(remaining);
            self.clock.sleep(step);
            remaining -= step;
        }
        self.checkpoint()
    }
}

impl<'a, C: Clock, G: Control> Iterator for LyricScheduler<'a, C, G> {
    type Item = &'a LyricLine;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(&line) = self.lines.get(self.next) {
            if self.flow() == Flow::Stop {
                return None;
            }
            self.next += 1;

            if line.timestamp < self.clock.start_at() {
                continue;
            }

            if !self.wait_until(line.timestamp) {
                tracing::debug!(timestamp = line.timestamp, "scheduler stopped while waiting");
                return None;
            }
            return Some(line);
        }
        None
    }
}
