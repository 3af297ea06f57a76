//! Chant player: cycles a line sequence through fade-in/hold/fade-out while an
//! audio cue plays.
//!
//! The player owns at most one session. A session ends through a single
//! teardown path that both completion producers (line exhaustion, cue end)
//! feed; whichever arrives second only re-shows the trigger, which is
//! idempotent.

use std::time::Instant;

use chant_types::CueKind;

use super::fade::{FadeConfig, FadeState, FadeStep, Phase, TickTimer};
use super::lines::{LineSequence, QuotePool};

/// Surface the current line is drawn on.
pub(crate) trait DisplaySurface {
    fn show_text(&mut self, text: &str);
    fn set_opacity(&mut self, opacity: f32);
}

/// Control that starts a session. Hidden while a session runs.
pub(crate) trait TriggerControl {
    fn set_trigger_visible(&mut self, visible: bool);
}

/// Audio cue output.
pub(crate) trait CueOutput {
    /// Start `kind` from the beginning, replacing any other cue.
    fn start(&mut self, kind: CueKind);
    /// Rewind `kind` to the beginning after it ended.
    fn restart(&mut self, kind: CueKind);
}

/// Observable player state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PlayerState {
    Idle,
    Playing { index: usize, phase: Phase },
}

/// Result of polling the player's tick timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    /// No session.
    Idle,
    /// The timer was not due yet.
    Waiting,
    Ticked,
    /// The next line is now displayed.
    Advanced { index: usize },
    /// The last line faded out; the session is over.
    Finished,
}

struct Session {
    lines: LineSequence,
    cue: CueKind,
    fade: FadeState,
    timer: TickTimer,
    index: usize,
}

pub(crate) struct ChantPlayer<V, C> {
    view: V,
    cues: C,
    fade: FadeConfig,
    quotes: QuotePool,
    today: fn() -> u32,
    session: Option<Session>,
}

impl<V, C> ChantPlayer<V, C>
where
    V: DisplaySurface + TriggerControl,
    C: CueOutput,
{
    pub(crate) fn new(
        mut view: V,
        cues: C,
        fade: FadeConfig,
        quotes: QuotePool,
        today: fn() -> u32,
    ) -> Self {
        view.set_trigger_visible(true);
        Self {
            view,
            cues,
            fade,
            quotes,
            today,
            session: None,
        }
    }

    /// Start a session over `lines`.
    ///
    /// An empty `lines` plays the quote of the day with the fallback cue.
    /// Returns `false` and changes nothing while a session is already running.
    pub(crate) fn play(&mut self, lines: Vec<String>, now: Instant) -> bool {
        if self.session.is_some() {
            tracing::debug!("chant already playing; ignoring trigger");
            return false;
        }
        self.view.set_trigger_visible(false);

        let (lines, cue) = LineSequence::resolve(lines, &self.quotes, (self.today)());
        self.cues.start(cue);

        let fade = FadeState::new(now);
        self.view.show_text(lines.get(0).unwrap_or_default());
        self.view.set_opacity(fade.opacity());

        tracing::info!(lines = lines.len(), cue = cue.label(), "chant started");
        self.session = Some(Session {
            lines,
            cue,
            fade,
            timer: TickTimer::start(self.fade.tick, now),
            index: 0,
        });
        true
    }

    /// Run one fade tick if the timer is due.
    pub(crate) fn tick(&mut self, now: Instant) -> TickOutcome {
        let cfg = self.fade;
        let Some(session) = self.session.as_mut() else {
            return TickOutcome::Idle;
        };
        if !session.timer.poll(now) {
            return TickOutcome::Waiting;
        }

        let step = session.fade.step(&cfg, now);
        self.view.set_opacity(session.fade.opacity());
        if step != FadeStep::FadedOut {
            return TickOutcome::Ticked;
        }

        session.index += 1;
        let index = session.index;
        if let Some(line) = session.lines.get(index) {
            self.view.show_text(line);
            return TickOutcome::Advanced { index };
        }
        self.finish();
        TickOutcome::Finished
    }

    /// The active cue reached its end.
    ///
    /// While lines are still cycling the cue is rewound; otherwise the trigger
    /// is shown (again).
    pub(crate) fn on_cue_ended(&mut self, kind: CueKind) {
        match self.session.as_ref().map(|s| s.cue) {
            Some(cue) if cue == kind => {
                tracing::debug!(cue = kind.label(), "cue ended mid-chant; restarting");
                self.cues.restart(kind);
            }
            Some(_) => {}
            None => self.finish(),
        }
    }

    /// Single teardown path. Dropping the session cancels its tick timer.
    fn finish(&mut self) {
        if let Some(session) = self.session.take() {
            self.view.show_text("");
            tracing::info!(lines = session.lines.len(), "chant finished");
        }
        self.view.set_trigger_visible(true);
    }

    pub(crate) fn state(&self, now: Instant) -> PlayerState {
        match self.session.as_ref() {
            Some(session) => PlayerState::Playing {
                index: session.index,
                phase: session.fade.phase(&self.fade, now),
            },
            None => PlayerState::Idle,
        }
    }

    pub(crate) fn is_playing(&self) -> bool {
        self.session.is_some()
    }

    /// When the UI loop must wake up next to keep the fade smooth.
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.session.as_ref().map(|s| s.timer.next_due())
    }

    pub(crate) fn line_count(&self) -> Option<usize> {
        self.session.as_ref().map(|s| s.lines.len())
    }

    pub(crate) fn view(&self) -> &V {
        &self.view
    }

    pub(crate) fn cues(&self) -> &C {
        &self.cues
    }
}
