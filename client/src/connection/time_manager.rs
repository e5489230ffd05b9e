//! Round-trip measurement and server clock-offset estimation.

use scenesync_shared::{PengMessage, PongMessage};

pub struct TimeManager {
    /// Last measured round trip, in milliseconds.
    pub ping: f64,
    /// Estimated server-minus-client clock offset, in milliseconds.
    pub stdiff: f64,
}

impl TimeManager {
    pub fn new() -> Self {
        Self {
            ping: 0.0,
            stdiff: 0.0,
        }
    }

    /// Fold a pong into the estimates and build the immediate confirmation.
    pub fn handle_pong(&mut self, pong: &PongMessage, now: f64) -> PengMessage {
        self.ping = now - pong.ct;
        self.stdiff = pong.st + self.ping / 2.0 - now;
        PengMessage::new(now, pong.st)
    }

    pub fn clear(&mut self) {
        self.ping = 0.0;
        self.stdiff = 0.0;
    }
}

impl Default for TimeManager {
    fn default() -> Self {
        Self::new()
    }
}
