use std::collections::HashSet;
use std::time::Duration;

use crate::rtc::RtcConfig;

/// Construction options for a [`crate::Client`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Server endpoint handed to the reliable transport.
    pub url: String,
    /// Reconnect with jitter after an unexpected close.
    pub auto_reconnect: bool,
    /// Mirror local mutations back to the server.
    pub allow_sync: bool,
    /// Negotiate the unreliable channel after connecting.
    pub allow_rtc: bool,
    /// Per-frame tracing.
    pub debug: bool,
    /// Field names never mirrored outbound, in addition to the built-in
    /// `_`-prefix and `/entities` rules.
    pub excluded_fields: HashSet<String>,
    /// Outbound change-log drain interval.
    pub tick_interval: Duration,
    /// Bandwidth-counter rollover interval.
    pub stats_interval: Duration,
    /// Ping cadence while connected.
    pub ping_interval: Duration,
    /// Drop the connection after this much inbound silence. Zero disables.
    pub timeout: Duration,
    /// Evict partial chunk sets idle longer than this.
    pub chunk_timeout: Duration,
    pub rtc: RtcConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            auto_reconnect: true,
            allow_sync: true,
            allow_rtc: false,
            debug: false,
            excluded_fields: HashSet::new(),
            tick_interval: Duration::from_millis(200),
            stats_interval: Duration::from_secs(1),
            ping_interval: Duration::from_secs(10),
            timeout: Duration::from_secs(60),
            chunk_timeout: Duration::from_secs(30),
            rtc: RtcConfig::default(),
        }
    }
}
