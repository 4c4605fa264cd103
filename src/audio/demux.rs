//! Format detection and container parsing over an in-memory download.

use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;
use symphonia::core::{
    codecs::{CODEC_TYPE_NULL, Decoder, DecoderOptions},
    errors::Error,
    formats::{FormatOptions, FormatReader},
    io::MediaSourceStream,
    meta::{MetadataOptions, MetadataRevision, StandardTagKey},
    probe::Hint,
};

use crate::{audio::constants::TARGET_SAMPLE_RATE, common::types::AudioFormat};

/// A probed container with its first audio track selected.
pub struct Demuxed {
    pub format: Box<dyn FormatReader>,
    pub track_id: u32,
    pub sample_rate: u32,
    pub channels: usize,
    pub codec: Option<&'static str>,
    pub duration_ms: Option<u64>,
    pub title: Option<String>,
}

/// Probes `bytes`, using `kind` as a hint when known.
pub fn open_format(bytes: Bytes, kind: AudioFormat) -> Result<Demuxed, Error> {
    // symphonia's WAV reader panics on a zero rate before we can inspect it.
    if wav_sample_rate(&bytes) == Some(0) {
        return Err(Error::Unsupported("wav: sample rate is 0"));
    }

    let mss = MediaSourceStream::new(Box::new(std::io::Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    let ext = kind.as_ext();
    if !ext.is_empty() {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions {
            enable_gapless: true,
            ..Default::default()
        },
        &MetadataOptions::default(),
    )?;

    let mut format = probed.format;
    let mut probed_metadata = probed.metadata;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| {
            Error::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no audio track found",
            ))
        })?;

    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.unwrap_or(TARGET_SAMPLE_RATE);
    if sample_rate == 0 {
        return Err(Error::Unsupported("sample rate is 0"));
    }
    let channels = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(crate::audio::constants::TARGET_CHANNELS);
    let codec = symphonia::default::get_codecs()
        .get_codec(track.codec_params.codec)
        .map(|d| d.short_name);
    let duration_ms = match (track.codec_params.n_frames, track.codec_params.sample_rate) {
        (Some(frames), Some(rate)) if rate > 0 => Some(frames * 1000 / rate as u64),
        _ => None,
    };

    // Containers carry tags themselves; ID3 and friends are found by the probe.
    let title = format.metadata().current().and_then(track_title).or_else(|| {
        probed_metadata
            .get()
            .as_ref()
            .and_then(|m| m.current())
            .and_then(track_title)
    });

    Ok(Demuxed {
        format,
        track_id,
        sample_rate,
        channels,
        codec,
        duration_ms,
        title,
    })
}

/// Sample rate from the `fmt ` chunk of a RIFF/WAVE file, if `bytes` is one.
fn wav_sample_rate(bytes: &[u8]) -> Option<u32> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return None;
    }

    let mut pos = 12;
    while pos + 8 <= bytes.len() {
        let id = &bytes[pos..pos + 4];
        let len = LittleEndian::read_u32(&bytes[pos + 4..pos + 8]) as usize;
        let body = pos + 8;
        if id == b"fmt " {
            return bytes
                .get(body + 4..body + 8)
                .map(LittleEndian::read_u32);
        }
        // Chunks are padded to an even length.
        pos = body.checked_add(len)?.checked_add(len & 1)?;
    }
    None
}

fn track_title(revision: &MetadataRevision) -> Option<String> {
    revision
        .tags()
        .iter()
        .find(|t| t.std_key == Some(StandardTagKey::TrackTitle))
        .map(|t| t.value.to_string())
        .filter(|t| !t.trim().is_empty())
}

impl Demuxed {
    pub fn make_decoder(&self) -> Result<Box<dyn Decoder>, Error> {
        let track = self
            .format
            .tracks()
            .iter()
            .find(|t| t.id == self.track_id)
            .ok_or(Error::Unsupported("selected track disappeared"))?;
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_header(sample_rate: u32) -> Vec<u8> {
        let mut buf = Vec::with_capacity(44);
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&36u32.to_le_bytes());
        buf.extend_from_slice(b"WAVE");
        buf.extend_from_slice(b"LIST");
        buf.extend_from_slice(&3u32.to_le_bytes());
        buf.extend_from_slice(b"abc\0");
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.extend_from_slice(&2u16.to_le_bytes());
        buf.extend_from_slice(&sample_rate.to_le_bytes());
        buf.extend_from_slice(&(sample_rate * 4).to_le_bytes());
        buf.extend_from_slice(&4u16.to_le_bytes());
        buf.extend_from_slice(&16u16.to_le_bytes());
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf
    }

    #[test]
    fn test_wav_sample_rate_skips_other_chunks() {
        assert_eq!(wav_sample_rate(&wav_header(44_100)), Some(44_100));
        assert_eq!(wav_sample_rate(b"ID3\x04 not a wav file"), None);
        assert_eq!(wav_sample_rate(b"RIFF\0\0\0\0WAVE"), None);
    }

    #[test]
    fn test_zero_sample_rate_wav_is_rejected() {
        let err = open_format(Bytes::from(wav_header(0)), AudioFormat::Wav)
            .err()
            .expect("zero rate rejected");
        assert!(matches!(err, Error::Unsupported(_)));
    }
}
