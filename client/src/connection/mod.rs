pub mod bandwidth_monitor;
pub mod chunk_receiver;
pub mod time_manager;

pub use bandwidth_monitor::{BandwidthMonitor, Stats};
pub use chunk_receiver::ChunkReceiver;
pub use time_manager::TimeManager;
