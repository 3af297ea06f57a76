//! Cue output used by the chant player.

use chant_audio::config::CueConfig;
use chant_audio::{CueEvent, CuePlayer};
use chant_types::CueKind;

use crate::chant::player::CueOutput;

/// Real device output, or silence when audio is disabled or unavailable.
pub(crate) enum CueBackend {
    Device(CuePlayer),
    Silent,
}

impl CueBackend {
    /// Open the configured device. Any failure degrades to silent playback.
    pub(crate) fn open(cfg: &CueConfig, enabled: bool) -> Self {
        if !enabled {
            tracing::info!("audio disabled; cues are silent");
            return CueBackend::Silent;
        }
        if cfg.normal.is_none() && cfg.fallback.is_none() {
            tracing::info!("no cue files configured; cues are silent");
            return CueBackend::Silent;
        }
        match CuePlayer::open(cfg) {
            Ok(player) => CueBackend::Device(player),
            Err(e) => {
                tracing::warn!("audio unavailable, continuing silently: {e:#}");
                CueBackend::Silent
            }
        }
    }

    /// Cue kinds whose playback ended since the last call.
    pub(crate) fn drain_ended(&self) -> Vec<CueKind> {
        let CueBackend::Device(player) = self else {
            return Vec::new();
        };
        std::iter::from_fn(|| player.try_event())
            .map(|CueEvent::Ended(kind)| kind)
            .collect()
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            CueBackend::Device(_) => "audio on",
            CueBackend::Silent => "silent",
        }
    }

    fn play(&self, kind: CueKind) {
        if let CueBackend::Device(player) = self {
            if let Err(e) = player.play(kind) {
                tracing::warn!(cue = kind.label(), "cue playback failed: {e:#}");
            }
        }
    }
}

impl CueOutput for CueBackend {
    fn start(&mut self, kind: CueKind) {
        self.play(kind);
    }

    fn restart(&mut self, kind: CueKind) {
        self.play(kind);
    }
}

impl Drop for CueBackend {
    fn drop(&mut self) {
        if let CueBackend::Device(player) = self {
            player.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_audio_is_silent_and_never_ends() {
        let mut backend = CueBackend::open(&CueConfig::default(), false);
        assert!(matches!(backend, CueBackend::Silent));
        backend.start(CueKind::Normal);
        backend.restart(CueKind::Fallback);
        assert!(backend.drain_ended().is_empty());
        assert_eq!(backend.label(), "silent");
    }

    #[test]
    fn missing_cue_files_skip_device_setup() {
        let backend = CueBackend::open(&CueConfig::default(), true);
        assert!(matches!(backend, CueBackend::Silent));
    }
}
