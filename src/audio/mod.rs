pub mod constants;
pub mod demux;
pub mod processor;
pub mod resample;

pub use demux::{Demuxed, open_format};
pub use processor::{AudioProcessor, PcmFrame};
