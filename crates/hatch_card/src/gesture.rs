//! Tap / double-tap / hold recognition for the card's main surface.
//!
//! The recogniser never looks at a clock itself. Callers feed it press and
//! release events with their timestamps and call [`GestureRecognizer::poll`]
//! whenever [`GestureRecognizer::next_deadline`] passes. Every physical
//! gesture yields exactly one [`Gesture`].

use tracing::debug;

use crate::clock::Millis;

/// Press duration after which a press counts as a hold.
pub const HOLD_THRESHOLD_MS: Millis = 500;

/// Time a first tap waits for a second one.
pub const DOUBLE_TAP_WINDOW_MS: Millis = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Gesture {
    Tap,
    DoubleTap,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum GesturePhase {
    Idle,
    /// Finger down, hold deadline armed.
    Pressed,
    /// Hold already fired; the release will be swallowed.
    HoldFired,
    /// One tap released, waiting for a second.
    AwaitingSecondTap,
}

#[derive(Debug, Default)]
pub struct GestureRecognizer {
    press_started_at: Option<Millis>,
    hold_deadline: Option<Millis>,
    hold_fired: bool,
    /// Taps released but not yet resolved, 0-1 between events.
    pending_taps: u8,
    tap_deadline: Option<Millis>,
}

impl GestureRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> GesturePhase {
        if self.hold_fired {
            GesturePhase::HoldFired
        } else if self.press_started_at.is_some() {
            GesturePhase::Pressed
        } else if self.tap_deadline.is_some() {
            GesturePhase::AwaitingSecondTap
        } else {
            GesturePhase::Idle
        }
    }

    /// Finger down. Re-arms the hold deadline but leaves a pending
    /// second-tap window alone.
    pub fn press(&mut self, now: Millis) {
        self.press_started_at = Some(now);
        self.hold_deadline = Some(now + HOLD_THRESHOLD_MS);
        self.hold_fired = false;
        debug!("Gesture press at {}", now);
    }

    /// Finger up. Returns a gesture only for the second tap of a pair.
    pub fn release(&mut self, now: Millis) -> Option<Gesture> {
        let Some(started) = self.press_started_at.take() else {
            debug!("Ignoring release without press");
            return None;
        };
        self.hold_deadline = None;

        if std::mem::take(&mut self.hold_fired) {
            debug!("Swallowing release after hold");
            return None;
        }

        self.pending_taps += 1;
        debug!("Tap {} released after {} ms", self.pending_taps, now - started);

        if self.pending_taps >= 2 {
            self.pending_taps = 0;
            self.tap_deadline = None;
            return Some(Gesture::DoubleTap);
        }

        self.tap_deadline = Some(now + DOUBLE_TAP_WINDOW_MS);
        None
    }

    /// Press aborted by the platform (touch cancel). Drops the hold deadline.
    pub fn cancel_press(&mut self) {
        self.press_started_at = None;
        self.hold_deadline = None;
        self.hold_fired = false;
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Millis> {
        match (self.hold_deadline, self.tap_deadline) {
            (Some(h), Some(t)) => Some(h.min(t)),
            (h, t) => h.or(t),
        }
    }

    /// Fire the earliest deadline that has passed, if any. Call repeatedly
    /// until it returns `None`.
    pub fn poll(&mut self, now: Millis) -> Option<Gesture> {
        let hold_due = self.hold_deadline.filter(|d| *d <= now);
        let tap_due = self.tap_deadline.filter(|d| *d <= now);

        match (hold_due, tap_due) {
            (Some(h), Some(t)) if t < h => self.fire_tap(),
            (Some(_), _) => {
                self.hold_deadline = None;
                self.hold_fired = true;
                Some(Gesture::Hold)
            }
            (None, Some(_)) => self.fire_tap(),
            (None, None) => None,
        }
    }

    fn fire_tap(&mut self) -> Option<Gesture> {
        self.tap_deadline = None;
        self.pending_taps = 0;
        Some(Gesture::Tap)
    }

    /// Drop every pending deadline.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Release, then poll through the end of every window.
    fn drain(recognizer: &mut GestureRecognizer, until: Millis) -> Vec<Gesture> {
        let mut fired = Vec::new();
        while let Some(deadline) = recognizer.next_deadline() {
            if deadline > until {
                break;
            }
            fired.extend(recognizer.poll(deadline));
        }
        fired
    }

    #[test]
    fn test_single_tap_fires_after_window() {
        let mut r = GestureRecognizer::new();
        r.press(0);
        assert_eq!(r.phase(), GesturePhase::Pressed);
        assert_eq!(r.release(100), None);
        assert_eq!(r.phase(), GesturePhase::AwaitingSecondTap);

        assert_eq!(r.poll(349), None);
        assert_eq!(r.poll(350), Some(Gesture::Tap));
        assert_eq!(r.phase(), GesturePhase::Idle);
        assert_eq!(r.next_deadline(), None);
    }

    #[test]
    fn test_double_tap_cancels_single() {
        let mut r = GestureRecognizer::new();
        r.press(0);
        assert_eq!(r.release(80), None);
        r.press(150);
        assert_eq!(r.release(220), Some(Gesture::DoubleTap));

        assert_eq!(drain(&mut r, 10_000), vec![]);
        assert_eq!(r.phase(), GesturePhase::Idle);
    }

    #[test]
    fn test_hold_fires_once_and_swallows_release() {
        let mut r = GestureRecognizer::new();
        r.press(0);
        assert_eq!(r.poll(499), None);
        assert_eq!(r.poll(500), Some(Gesture::Hold));
        assert_eq!(r.phase(), GesturePhase::HoldFired);
        assert_eq!(r.poll(600), None);

        assert_eq!(r.release(600), None);
        assert_eq!(drain(&mut r, 10_000), vec![]);
        assert_eq!(r.phase(), GesturePhase::Idle);
    }

    #[test]
    fn test_release_before_threshold_disarms_hold() {
        let mut r = GestureRecognizer::new();
        r.press(0);
        r.release(499);
        assert_eq!(drain(&mut r, 10_000), vec![Gesture::Tap]);
    }

    #[test]
    fn test_new_press_rearms_hold() {
        let mut r = GestureRecognizer::new();
        r.press(0);
        r.press(300);
        assert_eq!(r.poll(500), None);
        assert_eq!(r.poll(800), Some(Gesture::Hold));
    }

    #[test]
    fn test_press_keeps_second_tap_window() {
        let mut r = GestureRecognizer::new();
        r.press(0);
        r.release(50);
        r.press(100);
        // window from the first tap still runs while the finger is down
        assert_eq!(r.next_deadline(), Some(300));
        assert_eq!(r.release(150), Some(Gesture::DoubleTap));
    }

    #[test]
    fn test_third_tap_starts_a_new_gesture() {
        let mut r = GestureRecognizer::new();
        r.press(0);
        r.release(40);
        r.press(80);
        assert_eq!(r.release(120), Some(Gesture::DoubleTap));
        r.press(160);
        assert_eq!(r.release(200), None);
        assert_eq!(drain(&mut r, 10_000), vec![Gesture::Tap]);
    }

    #[test]
    fn test_slow_second_tap_is_two_taps() {
        let mut r = GestureRecognizer::new();
        r.press(0);
        r.release(50);
        assert_eq!(drain(&mut r, 400), vec![Gesture::Tap]);
        r.press(400);
        assert_eq!(r.release(450), None);
        assert_eq!(drain(&mut r, 10_000), vec![Gesture::Tap]);
    }

    #[test]
    fn test_tap_window_expiring_during_hold() {
        let mut r = GestureRecognizer::new();
        r.press(0);
        r.release(50);
        r.press(200);
        assert_eq!(drain(&mut r, 1_000), vec![Gesture::Tap, Gesture::Hold]);
        assert_eq!(r.release(1_000), None);
    }

    #[test]
    fn test_cancel_press_and_stray_release() {
        let mut r = GestureRecognizer::new();
        r.press(0);
        r.cancel_press();
        assert_eq!(r.next_deadline(), None);
        assert_eq!(r.release(100), None);
        assert_eq!(r.phase(), GesturePhase::Idle);
    }
}
