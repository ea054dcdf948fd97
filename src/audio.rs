//! # Audio
//! Decoder for the raw PCM payload returned by the speech endpoint, plus the
//! single playback slot.
//!
//! The speech model answers with base64 of headerless little-endian 16-bit
//! signed PCM. Decoding de-interleaves by channel and normalizes every
//! sample to `[-1.0, 1.0)`. Byte boundaries are not validated: a trailing odd
//! byte or partial frame is ignored.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

/// Sample rate of the speech model's output.
pub const SPEECH_SAMPLE_RATE: u32 = 24_000;
pub const SPEECH_CHANNELS: u16 = 1;

const BYTES_PER_SAMPLE: usize = 2;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("invalid base64 audio payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("channel count must be at least 1")]
    NoChannels,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self {
            sample_rate: SPEECH_SAMPLE_RATE,
            channels: SPEECH_CHANNELS,
        }
    }
}

/// Planar float audio: one `Vec<f32>` per channel, all the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frame_count(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.sample_rate as f64
    }

    /// Interleave back to 16-bit PCM inside a RIFF/WAVE container.
    pub fn to_wav(&self) -> Vec<u8> {
        let channels = self.channel_count() as u16;
        let frames = self.frame_count();
        let data_len = (frames * self.channel_count() * BYTES_PER_SAMPLE) as u32;
        let block_align = channels * BYTES_PER_SAMPLE as u16;
        let byte_rate = self.sample_rate * block_align as u32;

        let mut out = Vec::with_capacity(44 + data_len as usize);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&self.sample_rate.to_le_bytes());
        out.extend_from_slice(&byte_rate.to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());

        for i in 0..frames {
            for ch in &self.channels {
                let s = (ch[i] * 32768.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16;
                out.extend_from_slice(&s.to_le_bytes());
            }
        }
        out
    }
}

pub fn decode_base64(payload: &str) -> Result<Vec<u8>, AudioError> {
    Ok(STANDARD.decode(payload.trim())?)
}

/// Reinterpret `bytes` as interleaved LE i16 samples and split per channel.
pub fn decode_pcm16(bytes: &[u8], format: PcmFormat) -> Result<AudioBuffer, AudioError> {
    let n_ch = format.channels as usize;
    if n_ch == 0 {
        return Err(AudioError::NoChannels);
    }

    let samples = bytes.len() / BYTES_PER_SAMPLE;
    let frames = samples / n_ch;
    let mut channels = vec![Vec::with_capacity(frames); n_ch];

    for (i, pair) in bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .take(frames * n_ch)
        .enumerate()
    {
        let s = i16::from_le_bytes([pair[0], pair[1]]);
        channels[i % n_ch].push(s as f32 / 32768.0);
    }

    Ok(AudioBuffer {
        sample_rate: format.sample_rate,
        channels,
    })
}

pub fn decode_speech(payload: &str, format: PcmFormat) -> Result<AudioBuffer, AudioError> {
    let bytes = decode_base64(payload)?;
    debug!(bytes = bytes.len(), "decoding speech payload");
    decode_pcm16(&bytes, format)
}

// ------------------------------------------------------------
// Playback slot
// ------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ClipInfo {
    pub id: u64,
    pub started_at: DateTime<Utc>,
    pub sample_rate: u32,
    pub channels: usize,
    pub frames: usize,
    pub duration_secs: f64,
}

#[derive(Debug)]
struct ActiveClip {
    info: ClipInfo,
    buffer: Arc<AudioBuffer>,
}

/// Holds at most one active clip. Starting a new one stops the previous.
#[derive(Debug, Default)]
pub struct AudioDeck {
    active: Mutex<Option<ActiveClip>>,
    next_id: AtomicU64,
}

impl AudioDeck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn play(&self, buffer: AudioBuffer) -> ClipInfo {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let info = ClipInfo {
            id,
            started_at: Utc::now(),
            sample_rate: buffer.sample_rate,
            channels: buffer.channel_count(),
            frames: buffer.frame_count(),
            duration_secs: buffer.duration_secs(),
        };

        let mut slot = self.active.lock().expect("audio deck mutex poisoned");
        if let Some(prev) = slot.take() {
            info!(stopped = prev.info.id, started = id, "replacing active clip");
        }
        *slot = Some(ActiveClip {
            info: info.clone(),
            buffer: Arc::new(buffer),
        });
        info
    }

    /// Stop the active clip, returning its id.
    pub fn stop(&self) -> Option<u64> {
        let mut slot = self.active.lock().expect("audio deck mutex poisoned");
        let prev = slot.take().map(|c| c.info.id);
        if let Some(id) = prev {
            debug!(clip = id, "stopped clip");
        }
        prev
    }

    pub fn current(&self) -> Option<ClipInfo> {
        let slot = self.active.lock().expect("audio deck mutex poisoned");
        slot.as_ref().map(|c| c.info.clone())
    }

    pub fn current_buffer(&self) -> Option<(ClipInfo, Arc<AudioBuffer>)> {
        let slot = self.active.lock().expect("audio deck mutex poisoned");
        slot.as_ref().map(|c| (c.info.clone(), Arc::clone(&c.buffer)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn le(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn mono_counts_and_normalization() {
        let bytes = le(&[0, 16384, -32768, 32767]);
        let buf = decode_pcm16(&bytes, PcmFormat::default()).unwrap();
        assert_eq!(buf.channel_count(), 1);
        assert_eq!(buf.frame_count(), 4);
        assert_eq!(buf.channels[0][0], 0.0);
        assert_eq!(buf.channels[0][1], 0.5);
        assert_eq!(buf.channels[0][2], -1.0);
        assert!(buf.channels[0][3] < 1.0);
    }

    #[test]
    fn stereo_deinterleaves() {
        let bytes = le(&[100, -100, 200, -200, 300, -300]);
        let fmt = PcmFormat {
            sample_rate: 48_000,
            channels: 2,
        };
        let buf = decode_pcm16(&bytes, fmt).unwrap();
        assert_eq!(buf.frame_count(), 3);
        assert!(buf.channels[0].iter().all(|s| *s > 0.0));
        assert!(buf.channels[1].iter().all(|s| *s < 0.0));
        assert_eq!(buf.sample_rate, 48_000);
    }

    #[test]
    fn sample_counts_follow_byte_length() {
        for (len, channels) in [(0usize, 1u16), (1, 1), (7, 1), (10, 2), (11, 2), (12, 3), (13, 4)] {
            let bytes = vec![0u8; len];
            let fmt = PcmFormat {
                sample_rate: SPEECH_SAMPLE_RATE,
                channels,
            };
            let buf = decode_pcm16(&bytes, fmt).unwrap();
            let expected = (len / 2) / channels as usize;
            assert_eq!(buf.channel_count(), channels as usize);
            for ch in &buf.channels {
                assert_eq!(ch.len(), expected, "len={len} channels={channels}");
            }
        }
    }

    #[test]
    fn zero_channels_rejected() {
        let fmt = PcmFormat {
            sample_rate: 8_000,
            channels: 0,
        };
        assert!(matches!(decode_pcm16(&[0, 0], fmt), Err(AudioError::NoChannels)));
    }

    #[test]
    fn bad_base64_is_an_error() {
        assert!(matches!(
            decode_speech("not base64!!", PcmFormat::default()),
            Err(AudioError::Base64(_))
        ));
    }

    #[test]
    fn base64_payload_decodes() {
        let payload = STANDARD.encode(le(&[1, 2, 3]));
        let buf = decode_speech(&payload, PcmFormat::default()).unwrap();
        assert_eq!(buf.frame_count(), 3);
        assert!((buf.duration_secs() - 3.0 / 24_000.0).abs() < 1e-12);
    }

    #[test]
    fn wav_header_and_samples() {
        let samples = [0i16, 1000, -1000, 32767];
        let buf = decode_pcm16(&le(&samples), PcmFormat::default()).unwrap();
        let wav = buf.to_wav();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(wav.len(), 44 + samples.len() * 2);
        assert_eq!(u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]), 24_000);
        assert_eq!(&wav[44..], le(&samples).as_slice());
    }

    #[test]
    fn deck_keeps_one_clip() {
        let deck = AudioDeck::new();
        assert!(deck.current().is_none());

        let a = deck.play(decode_pcm16(&le(&[1, 2]), PcmFormat::default()).unwrap());
        let b = deck.play(decode_pcm16(&le(&[3]), PcmFormat::default()).unwrap());
        assert_ne!(a.id, b.id);
        assert_eq!(deck.current().unwrap().id, b.id);
        assert_eq!(deck.current_buffer().unwrap().1.frame_count(), 1);

        assert_eq!(deck.stop(), Some(b.id));
        assert_eq!(deck.stop(), None);
    }
}
