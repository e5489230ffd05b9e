use std::sync::OnceLock;
use std::time::{Duration, Instant};

static START: OnceLock<Instant> = OnceLock::new();

/// Milliseconds since process start: the client-local clock carried in wire
/// timestamps and sample buffers.
///
/// The anchor is process-relative rather than the UNIX epoch so the values
/// stay small enough to survive the frame codec's float32 narrowing; the
/// pong exchange reconciles the two clock domains via `stdiff`.
pub fn now_ms() -> f64 {
    START.get_or_init(Instant::now).elapsed().as_secs_f64() * 1000.0
}

/// A resettable interval timer.
pub struct Timer {
    duration: Duration,
    last: Instant,
}

impl Timer {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            last: Instant::now(),
        }
    }

    /// Whether the interval has elapsed since the last reset.
    pub fn ringing(&self) -> bool {
        self.last.elapsed() >= self.duration
    }

    pub fn reset(&mut self) {
        self.last = Instant::now();
    }
}
