//! Cue player: decoded cues plus one output stream.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow};
use chant_types::CueKind;
use cpal::traits::{DeviceTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::config::CueConfig;
use crate::decode::decode_cue;
use crate::playback::{CueCursor, LoadedCue, build_output_stream};
use crate::{device, resample};

/// Notifications from the output callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CueEvent {
    /// The cue of this kind played to its last frame.
    Ended(CueKind),
}

struct PreparedCue {
    channels: usize,
    samples: Arc<Vec<f32>>,
}

/// Plays the normal and fallback cues on one output device.
///
/// Must stay on the thread that created it: the CPAL stream handle is not
/// `Send` on every platform.
pub struct CuePlayer {
    _stream: cpal::Stream,
    cursor: Arc<Mutex<CueCursor>>,
    cues: HashMap<CueKind, PreparedCue>,
    events: Receiver<CueEvent>,
}

impl CuePlayer {
    /// Open the output device and decode the configured cue files.
    ///
    /// A cue whose file is unset is silently unavailable; a cue that fails to
    /// decode is an error.
    pub fn open(cfg: &CueConfig) -> Result<Self> {
        let host = cpal::default_host();
        let device = device::pick_device(&host, cfg.device.as_deref())?;

        let mut decoded = Vec::new();
        for (kind, path) in [(CueKind::Normal, &cfg.normal), (CueKind::Fallback, &cfg.fallback)] {
            if let Some(path) = path {
                decoded.push((kind, load(path)?));
            }
        }
        let first_cue = decoded.first().map(|(_, cue)| device::CueFormat {
            rate: cue.rate,
            channels: cue.channels,
        });

        let supported = device::pick_output_config(&device, first_cue)?;
        let sample_format = supported.sample_format();
        let stream_config: cpal::StreamConfig = supported.config();
        let dst_rate = stream_config.sample_rate;

        let mut cues = HashMap::new();
        for (kind, cue) in decoded {
            let cue = resample::resample_cue(cue, dst_rate, cfg.chunk_frames)
                .with_context(|| format!("resample {} cue", kind.label()))?;
            cues.insert(
                kind,
                PreparedCue {
                    channels: cue.channels,
                    samples: Arc::new(cue.samples),
                },
            );
        }

        let cursor = Arc::new(Mutex::new(CueCursor::default()));
        let (events_tx, events_rx): (Sender<CueEvent>, Receiver<CueEvent>) = unbounded();
        let stream = build_output_stream(&device, &stream_config, sample_format, &cursor, events_tx)?;
        stream.play().context("start output stream")?;

        tracing::info!(
            device = %device.description().map(|d| d.to_string()).unwrap_or_else(|_| "unknown".into()),
            rate_hz = dst_rate,
            channels = stream_config.channels,
            cues = cues.len(),
            "cue output ready"
        );

        Ok(Self {
            _stream: stream,
            cursor,
            cues,
            events: events_rx,
        })
    }

    /// Start `kind` from its first frame, replacing whatever was playing.
    pub fn play(&self, kind: CueKind) -> Result<()> {
        let cue = self
            .cues
            .get(&kind)
            .ok_or_else(|| anyhow!("no {} cue configured", kind.label()))?;
        let mut cursor = self
            .cursor
            .lock()
            .map_err(|_| anyhow!("cue cursor poisoned"))?;
        cursor.load(LoadedCue {
            kind,
            channels: cue.channels,
            samples: cue.samples.clone(),
        });
        Ok(())
    }

    /// Silence the output without reporting an end.
    pub fn stop(&self) {
        if let Ok(mut cursor) = self.cursor.lock() {
            cursor.clear();
        }
    }

    /// Next pending callback notification, if any.
    pub fn try_event(&self) -> Option<CueEvent> {
        self.events.try_recv().ok()
    }
}

fn load(path: &Path) -> Result<crate::decode::DecodedCue> {
    let cue = decode_cue(path)?;
    tracing::info!(
        path = %path.display(),
        duration_ms = cue.duration_ms(),
        "loaded cue"
    );
    Ok(cue)
}
