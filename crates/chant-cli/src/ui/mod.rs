//! Ratatui UI loop.
//!
//! Keys:
//! - Enter/s: start the chant for the selected tab
//! - ←/→, Tab/Shift+Tab, 1-4: switch tab
//! - PgUp/PgDn or [/]: previous/next table page
//! - r: reload table page
//! - l: logs
//! - h or ?: help
//! - q: quit

mod app;
mod panel;
mod render;
mod widgets;

pub(crate) use app::run_tui;
