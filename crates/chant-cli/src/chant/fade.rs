//! Opacity fade for one displayed line, driven by wall-clock time.

use std::time::{Duration, Instant};

/// Fade timing. Thresholds are measured from the start of the current phase,
/// so the tick rate only affects smoothness, not the hold lengths.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct FadeConfig {
    /// Interval between ticks.
    pub(crate) tick: Duration,
    /// Opacity change per tick while fading.
    pub(crate) step: f32,
    /// Time at zero opacity before a line starts fading in.
    pub(crate) hold_before_fade_in: Duration,
    /// Time at full opacity before a line starts fading out.
    pub(crate) hold_before_fade_out: Duration,
}

impl Default for FadeConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(16),
            step: 0.03,
            hold_before_fade_in: Duration::from_millis(1300),
            hold_before_fade_out: Duration::from_millis(4300),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    /// Invisible, waiting out `hold_before_fade_in`.
    HoldOut,
    FadingIn,
    /// Fully visible, waiting out `hold_before_fade_out`.
    HoldIn,
    FadingOut,
}

impl Phase {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Phase::HoldOut => "hold-out",
            Phase::FadingIn => "fading-in",
            Phase::HoldIn => "hold-in",
            Phase::FadingOut => "fading-out",
        }
    }
}

/// What a single fade step did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FadeStep {
    /// Still inside a hold threshold.
    Held,
    /// Opacity moved but did not reach a bound.
    Moved,
    /// Opacity reached 1; the hold-in timer restarted.
    FadedIn,
    /// Opacity reached 0; the line is done.
    FadedOut,
}

#[derive(Clone, Debug)]
pub(crate) struct FadeState {
    opacity: f32,
    faded_in: bool,
    phase_start: Instant,
}

impl FadeState {
    pub(crate) fn new(now: Instant) -> Self {
        Self {
            opacity: 0.0,
            faded_in: false,
            phase_start: now,
        }
    }

    pub(crate) fn opacity(&self) -> f32 {
        self.opacity
    }

    pub(crate) fn phase(&self, cfg: &FadeConfig, now: Instant) -> Phase {
        let elapsed = now.saturating_duration_since(self.phase_start);
        match self.faded_in {
            false if elapsed < cfg.hold_before_fade_in => Phase::HoldOut,
            false => Phase::FadingIn,
            true if elapsed < cfg.hold_before_fade_out => Phase::HoldIn,
            true => Phase::FadingOut,
        }
    }

    /// Advance one tick. Opacity stays within `[0, 1]`.
    pub(crate) fn step(&mut self, cfg: &FadeConfig, now: Instant) -> FadeStep {
        let elapsed = now.saturating_duration_since(self.phase_start);
        if !self.faded_in {
            if elapsed < cfg.hold_before_fade_in {
                return FadeStep::Held;
            }
            self.opacity = (self.opacity + cfg.step).min(1.0);
            if self.opacity >= 1.0 {
                self.faded_in = true;
                self.phase_start = now;
                return FadeStep::FadedIn;
            }
            FadeStep::Moved
        } else {
            if elapsed < cfg.hold_before_fade_out {
                return FadeStep::Held;
            }
            self.opacity = (self.opacity - cfg.step).max(0.0);
            if self.opacity <= 0.0 {
                self.faded_in = false;
                self.phase_start = now;
                return FadeStep::FadedOut;
            }
            FadeStep::Moved
        }
    }
}

/// Deadline-based periodic timer. A late poll fires once and reschedules from
/// the poll time, so missed intervals are coalesced rather than replayed.
#[derive(Clone, Debug)]
pub(crate) struct TickTimer {
    interval: Duration,
    next_due: Instant,
}

impl TickTimer {
    pub(crate) fn start(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next_due: now + interval,
        }
    }

    /// `true` when a tick is due; the next one is scheduled one interval later.
    pub(crate) fn poll(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due = now + self.interval;
        true
    }

    pub(crate) fn next_due(&self) -> Instant {
        self.next_due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick() -> FadeConfig {
        FadeConfig {
            tick: Duration::from_millis(10),
            step: 0.3,
            hold_before_fade_in: Duration::from_millis(100),
            hold_before_fade_out: Duration::from_millis(200),
        }
    }

    #[test]
    fn holds_at_zero_before_fade_in_threshold() {
        let cfg = quick();
        let t0 = Instant::now();
        let mut fade = FadeState::new(t0);
        assert_eq!(fade.phase(&cfg, t0), Phase::HoldOut);
        assert_eq!(fade.step(&cfg, t0 + Duration::from_millis(99)), FadeStep::Held);
        assert_eq!(fade.opacity(), 0.0);
    }

    #[test]
    fn fades_in_to_exactly_one_then_holds() {
        let cfg = quick();
        let t0 = Instant::now();
        let mut fade = FadeState::new(t0);
        let t = t0 + Duration::from_millis(100);
        assert_eq!(fade.phase(&cfg, t), Phase::FadingIn);
        assert_eq!(fade.step(&cfg, t), FadeStep::Moved);
        assert_eq!(fade.step(&cfg, t), FadeStep::Moved);
        assert_eq!(fade.step(&cfg, t), FadeStep::Moved);
        assert_eq!(fade.step(&cfg, t), FadeStep::FadedIn);
        assert_eq!(fade.opacity(), 1.0);
        assert_eq!(fade.phase(&cfg, t), Phase::HoldIn);
        assert_eq!(fade.step(&cfg, t + Duration::from_millis(199)), FadeStep::Held);
    }

    #[test]
    fn fades_out_to_exactly_zero_after_hold() {
        let cfg = quick();
        let t0 = Instant::now();
        let mut fade = FadeState::new(t0);
        let t_in = t0 + Duration::from_millis(100);
        while fade.step(&cfg, t_in) != FadeStep::FadedIn {}
        let t_out = t_in + Duration::from_millis(200);
        assert_eq!(fade.phase(&cfg, t_out), Phase::FadingOut);
        let mut steps = 0;
        while fade.step(&cfg, t_out) != FadeStep::FadedOut {
            steps += 1;
            assert!(steps < 10);
        }
        assert_eq!(fade.opacity(), 0.0);
        assert_eq!(fade.phase(&cfg, t_out), Phase::HoldOut);
    }

    #[test]
    fn opacity_stays_clamped_under_jitter() {
        let cfg = FadeConfig {
            step: 0.7,
            ..quick()
        };
        let t0 = Instant::now();
        let mut fade = FadeState::new(t0);
        let mut now = t0;
        for i in 0..500u64 {
            now += Duration::from_millis(1 + (i * 37) % 120);
            fade.step(&cfg, now);
            assert!((0.0..=1.0).contains(&fade.opacity()));
        }
    }

    #[test]
    fn zero_holds_fade_immediately() {
        let cfg = FadeConfig {
            hold_before_fade_in: Duration::ZERO,
            hold_before_fade_out: Duration::ZERO,
            step: 0.5,
            ..quick()
        };
        let t0 = Instant::now();
        let mut fade = FadeState::new(t0);
        assert_eq!(fade.step(&cfg, t0), FadeStep::Moved);
        assert_eq!(fade.step(&cfg, t0), FadeStep::FadedIn);
        assert_eq!(fade.step(&cfg, t0), FadeStep::Moved);
        assert_eq!(fade.step(&cfg, t0), FadeStep::FadedOut);
    }

    #[test]
    fn timer_fires_once_per_interval_and_coalesces_late_polls() {
        let t0 = Instant::now();
        let mut timer = TickTimer::start(Duration::from_millis(16), t0);
        assert!(!timer.poll(t0 + Duration::from_millis(15)));
        assert!(timer.poll(t0 + Duration::from_millis(16)));
        assert!(!timer.poll(t0 + Duration::from_millis(20)));
        let late = t0 + Duration::from_millis(500);
        assert!(timer.poll(late));
        assert!(!timer.poll(late));
        assert_eq!(timer.next_due(), late + Duration::from_millis(16));
    }
}
