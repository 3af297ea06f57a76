//! Playback stage (CPAL output stream).
//!
//! Builds one long-lived CPAL output stream and provides the real-time audio
//! callback. The callback:
//! - plays the currently loaded cue from an in-memory buffer
//! - applies basic channel mapping (mono↔stereo, best-effort otherwise)
//! - converts `f32` samples to the device sample format
//! - reports the end of the cue exactly once per start

use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use chant_types::CueKind;
use cpal::traits::DeviceTrait;
use crossbeam_channel::Sender;

use crate::player::CueEvent;

/// Cue currently loaded into the output stream.
pub(crate) struct LoadedCue {
    pub(crate) kind: CueKind,
    pub(crate) channels: usize,
    pub(crate) samples: Arc<Vec<f32>>,
}

/// State shared between the UI thread and the output callback.
#[derive(Default)]
pub(crate) struct CueCursor {
    cue: Option<LoadedCue>,
    pos: usize,
}

impl CueCursor {
    /// Load `cue` and rewind to its first frame.
    pub(crate) fn load(&mut self, cue: LoadedCue) {
        self.cue = Some(cue);
        self.pos = 0;
    }

    pub(crate) fn clear(&mut self) {
        self.cue = None;
        self.pos = 0;
    }

    /// Fill `out` (interleaved, `dst_channels` wide) with mapped samples.
    ///
    /// Returns the kind of the cue that ran out during this call, if any.
    /// Frames past the end of the cue are silence.
    pub(crate) fn fill(&mut self, out: &mut [f32], dst_channels: usize) -> Option<CueKind> {
        let Some(cue) = self.cue.as_ref() else {
            out.fill(0.0);
            return None;
        };
        let src_channels = cue.channels.max(1);
        let frames = out.len() / dst_channels.max(1);
        let mut ended = None;

        for frame in 0..frames {
            let start = self.pos;
            if start + src_channels > cue.samples.len() {
                out[frame * dst_channels..].fill(0.0);
                ended = Some(cue.kind);
                break;
            }
            for ch in 0..dst_channels {
                out[frame * dst_channels + ch] =
                    mapped_sample(&cue.samples[start..start + src_channels], dst_channels, ch);
            }
            self.pos += src_channels;
        }
        if ended.is_none() && self.pos + src_channels > cue.samples.len() {
            ended = Some(cue.kind);
        }
        if ended.is_some() {
            self.clear();
        }
        ended
    }
}

/// Map one source frame to destination channel `dst_ch`.
///
/// Mapping rules:
/// - mono → stereo: duplicate channel 0
/// - stereo → mono: average L/R
/// - stereo → stereo: pass-through
/// - other layouts: best-effort “clamp to available channels”
fn mapped_sample(src: &[f32], dst_channels: usize, dst_ch: usize) -> f32 {
    match (src.len(), dst_channels) {
        (2, 1) => 0.5 * (src[0] + src[1]),
        (1, _) => src[0],
        (n, _) => src[dst_ch.min(n.saturating_sub(1))],
    }
}

/// Build a CPAL output stream that plays whatever cue `cursor` holds.
pub(crate) fn build_output_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    cursor: &Arc<Mutex<CueCursor>>,
    events: Sender<CueEvent>,
) -> Result<cpal::Stream> {
    match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(device, config, cursor, events),
        cpal::SampleFormat::I16 => build_stream::<i16>(device, config, cursor, events),
        cpal::SampleFormat::I32 => build_stream::<i32>(device, config, cursor, events),
        cpal::SampleFormat::U16 => build_stream::<u16>(device, config, cursor, events),
        other => Err(anyhow!("Unsupported sample format: {other:?}")),
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    cursor: &Arc<Mutex<CueCursor>>,
    events: Sender<CueEvent>,
) -> Result<cpal::Stream>
where
    T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels_out = config.channels as usize;
    let cursor_cb = cursor.clone();
    let mut scratch: Vec<f32> = Vec::new();

    let err_fn = |err| tracing::warn!("stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _| {
            scratch.resize(data.len(), 0.0);
            let ended = match cursor_cb.lock() {
                Ok(mut cursor) => cursor.fill(&mut scratch, channels_out),
                Err(_) => {
                    scratch.fill(0.0);
                    None
                }
            };
            for (dst, src) in data.iter_mut().zip(scratch.iter()) {
                *dst = <T as cpal::Sample>::from_sample::<f32>(*src);
            }
            if let Some(kind) = ended {
                let _ = events.send(CueEvent::Ended(kind));
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor_with(kind: CueKind, channels: usize, samples: Vec<f32>) -> CueCursor {
        let mut cursor = CueCursor::default();
        cursor.load(LoadedCue {
            kind,
            channels,
            samples: Arc::new(samples),
        });
        cursor
    }

    #[test]
    fn empty_cursor_outputs_silence() {
        let mut cursor = CueCursor::default();
        let mut out = vec![1.0; 8];
        assert_eq!(cursor.fill(&mut out, 2), None);
        assert!(out.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn mono_cue_is_duplicated_to_stereo() {
        let mut cursor = cursor_with(CueKind::Normal, 1, vec![0.1, 0.2, 0.3, 0.4]);
        let mut out = vec![0.0; 4];
        assert_eq!(cursor.fill(&mut out, 2), None);
        assert_eq!(out, vec![0.1, 0.1, 0.2, 0.2]);
    }

    #[test]
    fn stereo_cue_is_averaged_to_mono() {
        let mut cursor = cursor_with(CueKind::Normal, 2, vec![0.2, 0.4, 0.6, 0.8, 0.0, 0.0]);
        let mut out = vec![0.0; 2];
        cursor.fill(&mut out, 1);
        assert!((out[0] - 0.3).abs() < 1e-6);
        assert!((out[1] - 0.7).abs() < 1e-6);
    }

    #[test]
    fn end_of_cue_is_reported_once_and_padded_with_silence() {
        let mut cursor = cursor_with(CueKind::Fallback, 1, vec![0.5, 0.5, 0.5]);
        let mut out = vec![1.0; 8];
        assert_eq!(cursor.fill(&mut out, 2), Some(CueKind::Fallback));
        assert_eq!(&out[..6], &[0.5; 6]);
        assert_eq!(&out[6..], &[0.0, 0.0]);

        let mut out = vec![1.0; 4];
        assert_eq!(cursor.fill(&mut out, 2), None);
        assert!(out.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn end_is_reported_when_buffer_exactly_drains_cue() {
        let mut cursor = cursor_with(CueKind::Normal, 1, vec![0.5, 0.5]);
        let mut out = vec![0.0; 2];
        assert_eq!(cursor.fill(&mut out, 1), Some(CueKind::Normal));
    }

    #[test]
    fn reload_rewinds_to_start() {
        let mut cursor = cursor_with(CueKind::Normal, 1, vec![0.1, 0.2, 0.3, 0.4]);
        let mut out = vec![0.0; 2];
        cursor.fill(&mut out, 1);
        cursor.load(LoadedCue {
            kind: CueKind::Normal,
            channels: 1,
            samples: Arc::new(vec![0.1, 0.2, 0.3, 0.4]),
        });
        cursor.fill(&mut out, 1);
        assert_eq!(out, vec![0.1, 0.2]);
    }
}
