//! Decoded audio clips and WAV export.
//!
//! The synthesis service returns little-endian 16-bit PCM.  Clips are kept as
//! interleaved `f32` samples in `[-1.0, 1.0]` so they can be handed straight to
//! an output device; export converts back to 16-bit PCM.

use std::io::Cursor;
use std::path::Path;

use anyhow::{bail, Context, Result};

/// One decoded clip (interleaved when `channels > 1`).
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioClip {
    /// Decode raw little-endian PCM16 bytes.
    pub fn from_pcm16_le(bytes: &[u8], sample_rate: u32, channels: u16) -> Result<Self> {
        if channels == 0 || sample_rate == 0 {
            bail!("Invalid PCM layout: {} channel(s) at {} Hz", channels, sample_rate);
        }
        let frame_bytes = 2 * channels as usize;
        if bytes.len() % frame_bytes != 0 {
            bail!(
                "PCM payload of {} bytes is not a whole number of {}-byte frames",
                bytes.len(),
                frame_bytes
            );
        }
        let samples = bytes
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
            .collect();
        Ok(Self { samples, sample_rate, channels })
    }

    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    /// Clip length in seconds.
    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Join clips end to end.  Layout (rate, channels) comes from the first
    /// clip; clips with a different layout are skipped.  `None` if there are
    /// no clips.
    pub fn concat<'a, I>(clips: I) -> Option<AudioClip>
    where
        I: IntoIterator<Item = &'a AudioClip>,
    {
        let mut clips = clips.into_iter();
        let first = clips.next()?;
        let mut joined = first.clone();
        for clip in clips {
            if clip.sample_rate != joined.sample_rate || clip.channels != joined.channels {
                tracing::warn!(
                    expected_rate = joined.sample_rate,
                    rate = clip.sample_rate,
                    "skipping clip with mismatched layout"
                );
                continue;
            }
            joined.samples.extend_from_slice(&clip.samples);
        }
        Some(joined)
    }

    fn wav_spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    fn write_samples<W>(&self, writer: &mut hound::WavWriter<W>) -> Result<()>
    where
        W: std::io::Write + std::io::Seek,
    {
        for &s in &self.samples {
            writer.write_sample(to_pcm16(s)).context("WAV write error")?;
        }
        Ok(())
    }

    /// Encode as a RIFF/WAVE file in memory.
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        {
            let mut writer = hound::WavWriter::new(Cursor::new(&mut buf), self.wav_spec())
                .context("Cannot start WAV stream")?;
            self.write_samples(&mut writer)?;
            writer.finalize().context("WAV finalise error")?;
        }
        Ok(buf)
    }

    /// Write a 16-bit PCM WAV file.
    pub fn write_wav(&self, output_path: &Path) -> Result<()> {
        let mut writer = hound::WavWriter::create(output_path, self.wav_spec())
            .with_context(|| format!("Cannot create WAV: {}", output_path.display()))?;
        self.write_samples(&mut writer)?;
        writer.finalize().context("WAV finalise error")?;
        tracing::info!(
            frames = self.frames(),
            seconds = self.duration(),
            path = %output_path.display(),
            "wrote WAV export"
        );
        Ok(())
    }
}

/// `f32` in `[-1.0, 1.0]` → `i16`, asymmetric so that both ends are reachable.
fn to_pcm16(s: f32) -> i16 {
    let s = s.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn test_decode_pcm16() {
        let clip = AudioClip::from_pcm16_le(&pcm(&[0, 16384, -32768]), 24_000, 1).unwrap();
        assert_eq!(clip.samples, vec![0.0, 0.5, -1.0]);
        assert_eq!(clip.frames(), 3);
    }

    #[test]
    fn test_duration() {
        let clip = AudioClip::from_pcm16_le(&vec![0u8; 48_000], 24_000, 1).unwrap();
        assert_eq!(clip.duration(), 1.0);
        let stereo = AudioClip::from_pcm16_le(&vec![0u8; 48_000], 24_000, 2).unwrap();
        assert_eq!(stereo.duration(), 0.5);
    }

    #[test]
    fn test_decode_rejects_partial_frame() {
        assert!(AudioClip::from_pcm16_le(&[1, 2, 3], 24_000, 1).is_err());
        assert!(AudioClip::from_pcm16_le(&[0; 6], 24_000, 2).is_err());
        assert!(AudioClip::from_pcm16_le(&[0; 4], 24_000, 0).is_err());
    }

    #[test]
    fn test_concat_in_order() {
        let a = AudioClip { samples: vec![0.1, 0.2], sample_rate: 24_000, channels: 1 };
        let b = AudioClip { samples: vec![0.3], sample_rate: 24_000, channels: 1 };
        let odd = AudioClip { samples: vec![0.9], sample_rate: 16_000, channels: 1 };
        let joined = AudioClip::concat([&a, &odd, &b]).unwrap();
        assert_eq!(joined.samples, vec![0.1, 0.2, 0.3]);
        assert!(AudioClip::concat(std::iter::empty()).is_none());
    }

    #[test]
    fn test_pcm16_extremes() {
        assert_eq!(to_pcm16(1.0), i16::MAX);
        assert_eq!(to_pcm16(-1.0), i16::MIN);
        assert_eq!(to_pcm16(4.0), i16::MAX);
        assert_eq!(to_pcm16(0.0), 0);
    }

    #[test]
    fn test_wav_header() {
        let clip = AudioClip { samples: vec![0.0; 10], sample_rate: 24_000, channels: 1 };
        let bytes = clip.to_wav_bytes().unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().sample_rate, 24_000);
        assert_eq!(reader.spec().bits_per_sample, 16);
        assert_eq!(reader.len(), 10);
    }
}
