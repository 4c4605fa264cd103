//! Central constants for the audio pipeline.

/// Output sample rate delivered to the voice bridge (Hz).
pub const TARGET_SAMPLE_RATE: u32 = 48_000;

/// Output channel count. Mono sources are duplicated, extra channels dropped.
pub const TARGET_CHANNELS: usize = 2;

/// Bytes per interleaved s16le sample.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Decoded frames buffered between the decode thread and the paced writer.
/// 50 × 20 ms = one second of audio.
pub const FRAME_CHANNEL_CAPACITY: usize = 50;

/// Interleaved samples in one frame of `frame_ms` at the target format.
pub const fn frame_samples(frame_ms: u64) -> usize {
    (TARGET_SAMPLE_RATE as u64 * frame_ms / 1000) as usize * TARGET_CHANNELS
}
