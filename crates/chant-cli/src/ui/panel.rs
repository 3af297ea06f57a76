use crate::chant::player::{DisplaySurface, TriggerControl};

/// Terminal chant surface: the current line, its opacity and whether the
/// start control is shown.
#[derive(Debug)]
pub(crate) struct ChantPanel {
    pub(crate) text: String,
    pub(crate) opacity: f32,
    pub(crate) trigger_visible: bool,
}

impl Default for ChantPanel {
    fn default() -> Self {
        Self {
            text: String::new(),
            opacity: 0.0,
            trigger_visible: true,
        }
    }
}

impl ChantPanel {
    /// Grey level (0..=255) standing in for opacity on a dark terminal.
    pub(crate) fn grey_level(&self) -> u8 {
        (self.opacity.clamp(0.0, 1.0) * 255.0).round() as u8
    }
}

impl DisplaySurface for ChantPanel {
    fn show_text(&mut self, text: &str) {
        self.text = text.to_string();
    }

    fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }
}

impl TriggerControl for ChantPanel {
    fn set_trigger_visible(&mut self, visible: bool) {
        self.trigger_visible = visible;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grey_level_tracks_opacity() {
        let mut panel = ChantPanel::default();
        assert_eq!(panel.grey_level(), 0);
        panel.set_opacity(0.5);
        assert_eq!(panel.grey_level(), 128);
        panel.set_opacity(3.0);
        assert_eq!(panel.grey_level(), 255);
    }

    #[test]
    fn trigger_starts_visible() {
        assert!(ChantPanel::default().trigger_visible);
    }
}
