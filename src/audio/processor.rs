//! `AudioProcessor` decodes a downloaded track into fixed-size PCM frames.
//!
//! Runs on a blocking thread. Frames are 48 kHz stereo interleaved `i16` and
//! leave through a bounded channel, so a slow consumer throttles decoding.

use symphonia::core::{audio::SampleBuffer, codecs::Decoder, errors::Error, formats::FormatReader};
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, span, warn};

use super::{
    constants::{TARGET_SAMPLE_RATE, frame_samples},
    demux::Demuxed,
    resample::{LinearResampler, to_stereo},
};

pub type PcmFrame = Vec<i16>;

pub struct AudioProcessor {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    resampler: LinearResampler,
    channels: usize,
    frame_samples: usize,
    sample_buf: Option<SampleBuffer<i16>>,
    pending: Vec<i16>,
}

impl AudioProcessor {
    pub fn new(demuxed: Demuxed, frame_ms: u64) -> Result<Self, Error> {
        let decoder = demuxed.make_decoder()?;
        let channels = demuxed.channels;

        debug!(
            "AudioProcessor: {}Hz {}ch -> {}Hz stereo",
            demuxed.sample_rate, channels, TARGET_SAMPLE_RATE
        );

        Ok(Self {
            resampler: LinearResampler::new(demuxed.sample_rate, TARGET_SAMPLE_RATE, 2),
            format: demuxed.format,
            decoder,
            track_id: demuxed.track_id,
            channels,
            frame_samples: frame_samples(frame_ms),
            sample_buf: None,
            pending: Vec::new(),
        })
    }

    /// Runs the decode loop until the stream ends, `cancel` fires, or the
    /// receiving side of `frame_tx` is dropped.
    ///
    /// A trailing partial frame is padded with silence.
    pub fn run(
        &mut self,
        frame_tx: &flume::Sender<PcmFrame>,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        let _span = span!(Level::DEBUG, "audio_processor").entered();
        let mut stereo = Vec::new();

        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }

            let packet = match self.format.next_packet() {
                Ok(p) => p,
                Err(Error::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(Error::ResetRequired) => break,
                Err(e) => return Err(e),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let channels = spec.channels.count().max(1);
                    let needed = decoded.capacity() * channels;
                    let mut buf = match self.sample_buf.take() {
                        Some(buf) if buf.capacity() >= needed => buf,
                        _ => SampleBuffer::<i16>::new(decoded.capacity() as u64, spec),
                    };
                    buf.copy_interleaved_ref(decoded);

                    if channels != self.channels {
                        debug!("Channel layout changed: {} -> {}", self.channels, channels);
                        self.channels = channels;
                    }
                    stereo.clear();
                    to_stereo(buf.samples(), self.channels, &mut stereo);
                    self.resampler.process(&stereo, &mut self.pending);
                    self.sample_buf = Some(buf);

                    if !self.drain_frames(frame_tx) {
                        return Ok(());
                    }
                }
                Err(Error::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(Error::DecodeError(e)) => {
                    warn!("Decode error (recoverable): {e}");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        if !self.pending.is_empty() {
            self.pending.resize(self.frame_samples, 0);
            let frame = std::mem::take(&mut self.pending);
            let _ = frame_tx.send(frame);
        }

        debug!("Decode loop finished");
        Ok(())
    }

    /// Sends every complete frame. Returns false once the consumer is gone.
    fn drain_frames(&mut self, frame_tx: &flume::Sender<PcmFrame>) -> bool {
        while self.pending.len() >= self.frame_samples {
            let rest = self.pending.split_off(self.frame_samples);
            let frame = std::mem::replace(&mut self.pending, rest);
            if frame_tx.send(frame).is_err() {
                return false;
            }
        }
        true
    }
}
