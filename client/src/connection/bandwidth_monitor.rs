//! Byte accounting for both channels, rolled into per-second rates.

/// A point-in-time view of the connection counters.
///
/// `send`/`rec` (and their `_rtc` twins) count bytes in the current
/// interval; the `_bps` fields hold the totals of the previous interval.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stats {
    pub send: u64,
    pub rec: u64,
    pub send_rtc: u64,
    pub rec_rtc: u64,
    pub send_bps: u64,
    pub rec_bps: u64,
    pub send_rtc_bps: u64,
    pub rec_rtc_bps: u64,
    /// Last measured round trip, in milliseconds.
    pub ping: f64,
    /// Estimated server-minus-client clock offset, in milliseconds.
    pub stdiff: f64,
}

pub struct BandwidthMonitor {
    stats: Stats,
}

impl BandwidthMonitor {
    pub fn new() -> Self {
        Self {
            stats: Stats::default(),
        }
    }

    pub fn record_send(&mut self, bytes: usize) {
        self.stats.send += bytes as u64;
    }

    pub fn record_rec(&mut self, bytes: usize) {
        self.stats.rec += bytes as u64;
    }

    pub fn record_send_rtc(&mut self, bytes: usize) {
        self.stats.send_rtc += bytes as u64;
    }

    pub fn record_rec_rtc(&mut self, bytes: usize) {
        self.stats.rec_rtc += bytes as u64;
    }

    pub fn set_ping(&mut self, ping: f64, stdiff: f64) {
        self.stats.ping = ping;
        self.stats.stdiff = stdiff;
    }

    /// Snapshot the interval counters into rates and zero them.
    pub fn rollover(&mut self) {
        self.stats.send_bps = self.stats.send;
        self.stats.rec_bps = self.stats.rec;
        self.stats.send_rtc_bps = self.stats.send_rtc;
        self.stats.rec_rtc_bps = self.stats.rec_rtc;
        self.stats.send = 0;
        self.stats.rec = 0;
        self.stats.send_rtc = 0;
        self.stats.rec_rtc = 0;
    }

    pub fn snapshot(&self) -> Stats {
        self.stats
    }

    pub fn clear(&mut self) {
        self.stats = Stats::default();
    }
}

impl Default for BandwidthMonitor {
    fn default() -> Self {
        Self::new()
    }
}
