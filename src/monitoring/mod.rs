pub mod stats_collector;

pub use stats_collector::{Cpu, Memory, Stats, StatsCollector, process_memory_bytes};
