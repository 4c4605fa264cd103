//! Linear-interpolation resampling and channel layout conversion.

use super::constants::TARGET_CHANNELS;

pub struct LinearResampler {
    /// Source / target ratio (< 1.0 upsamples, > 1.0 downsamples).
    ratio: f32,
    /// Fractional read head within the current input block.
    index: f32,
    /// Last frame of the previous block, for cross-block interpolation.
    last_samples: Vec<i16>,
    channels: usize,
}

impl LinearResampler {
    /// A zero rate on either side falls back to passthrough.
    pub fn new(source_rate: u32, target_rate: u32, channels: usize) -> Self {
        let ratio = if source_rate == 0 || target_rate == 0 {
            1.0
        } else {
            source_rate as f32 / target_rate as f32
        };
        Self {
            ratio,
            index: 0.0,
            last_samples: vec![0; channels],
            channels,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        (self.ratio - 1.0).abs() < f32::EPSILON
    }

    /// Resamples interleaved `input` and appends to `output`.
    pub fn process(&mut self, input: &[i16], output: &mut Vec<i16>) {
        if self.is_passthrough() {
            output.extend_from_slice(input);
            return;
        }

        let num_frames = input.len() / self.channels;
        if num_frames == 0 {
            return;
        }

        while self.index < num_frames as f32 {
            let idx = self.index as usize;
            let fract = self.index.fract();

            for c in 0..self.channels {
                let s1 = if idx == 0 {
                    self.last_samples[c] as f32
                } else {
                    input[(idx - 1) * self.channels + c] as f32
                };
                let s2 = input[idx.min(num_frames - 1) * self.channels + c] as f32;
                output.push((s1 * (1.0 - fract) + s2 * fract) as i16);
            }

            self.index += self.ratio;
        }

        self.index -= num_frames as f32;
        let last = (num_frames - 1) * self.channels;
        self.last_samples
            .copy_from_slice(&input[last..last + self.channels]);
    }
}

/// Converts interleaved samples with `channels` channels to stereo.
pub fn to_stereo(input: &[i16], channels: usize, output: &mut Vec<i16>) {
    match channels {
        TARGET_CHANNELS => output.extend_from_slice(input),
        1 => {
            for &s in input {
                output.push(s);
                output.push(s);
            }
        }
        0 => {}
        n => {
            for frame in input.chunks_exact(n) {
                output.push(frame[0]);
                output.push(frame[1]);
            }
        }
    }
}
