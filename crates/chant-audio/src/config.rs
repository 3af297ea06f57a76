use std::path::PathBuf;

/// Cue playback settings.
#[derive(Clone, Debug)]
pub struct CueConfig {
    /// Cue played alongside real data.
    pub normal: Option<PathBuf>,
    /// Cue played alongside the quote-of-the-day fallback.
    pub fallback: Option<PathBuf>,
    /// Output device name filter (case-insensitive substring).
    pub device: Option<String>,
    /// Resampler chunk size in frames.
    pub chunk_frames: usize,
}

impl Default for CueConfig {
    fn default() -> Self {
        Self {
            normal: None,
            fallback: None,
            device: None,
            chunk_frames: 1024,
        }
    }
}
