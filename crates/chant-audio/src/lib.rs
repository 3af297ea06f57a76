//! Audio cue engine for the chant player.
//!
//! Cues are short files decoded fully into memory, converted to the output
//! device rate once, and played from a CPAL output stream. The stream reports
//! the end of each cue over a channel so the UI thread can restart it or end
//! the session.

pub mod config;
pub mod decode;
pub mod device;
pub mod playback;
pub mod player;
pub mod resample;

pub use player::{CueEvent, CuePlayer};
