use tracing::debug;
use tracing::info;

use super::backend::Countdown;
use super::backend::JsonHelperBackend;
use super::backend::LocalBackend;
use super::backend::NativeTimerBackend;
use super::backend::TimerBackend;
use super::expiration::DeferredCall;
use super::expiration::execute_expiration_actions;
use super::format;
use crate::clock::Millis;
use crate::config::CardConfig;
use crate::config::ConfigError;
use crate::config::TimerSource;
use crate::host;
use crate::host::Host;
use crate::host::ServiceCall;

/// How often the countdown is re-read while the card is mounted.
pub const POLL_INTERVAL_MS: Millis = 1_000;

/// Custom domain of the device driver that may run its own timer.
const DEVICE_DOMAIN: &str = "hatch";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimerError {
    #[error("timer duration must be at least one minute")]
    ZeroDuration,
}

/// What the card shows for a running countdown.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerSnapshot {
    pub remaining_ms: Millis,
    pub total_ms: Millis,
    /// 0-100
    pub percent_remaining: f64,
    /// `M:SS` or `H:MM:SS`
    pub display: String,
    pub paused: bool,
}

impl TimerSnapshot {
    fn from_countdown(countdown: &Countdown) -> Self {
        let total_ms = countdown
            .total_ms
            .filter(|t| *t > 0)
            .unwrap_or(countdown.remaining_ms.max(1));
        let percent = countdown.remaining_ms as f64 / total_ms as f64 * 100.0;
        Self {
            remaining_ms: countdown.remaining_ms,
            total_ms,
            percent_remaining: percent.clamp(0.0, 100.0),
            display: format::format_remaining(countdown.remaining_ms),
            paused: countdown.paused,
        }
    }
}

/// Result of one poll.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TickOutcome {
    /// The countdown completed during this poll and the expiration actions ran.
    pub expired: bool,

    /// Light change to dispatch later, see `LIGHT_CHANGE_DELAY_MS`.
    pub deferred: Option<DeferredCall>,
}

/// Owns the sleep timer of one card.
pub struct TimerTracker {
    config: CardConfig,
    source: TimerSource,
    backend: Box<dyn TimerBackend>,
    snapshot: Option<TimerSnapshot>,

    /// Countdown seen on the previous poll.
    last_seen: Option<Countdown>,

    /// Completion time of the countdown whose expiration already ran.
    /// `Some(None)` covers backends that cannot tell the completion time.
    fired_for: Option<Option<Millis>>,
}

impl TimerTracker {
    pub fn new(config: &CardConfig) -> Result<Self, ConfigError> {
        let source = config.timer_source()?;
        let backend: Box<dyn TimerBackend> = match &source {
            TimerSource::Local => Box::new(LocalBackend::default()),
            TimerSource::JsonHelper { entity_id } => Box::new(JsonHelperBackend::new(entity_id)),
            TimerSource::NativeTimer { entity_id } => Box::new(NativeTimerBackend::new(entity_id)),
        };
        info!("Sleep timer backed by {}", source);

        Ok(Self {
            config: config.clone(),
            source,
            backend,
            snapshot: None,
            last_seen: None,
            fired_for: None,
        })
    }

    /// Latest countdown, `None` when nothing is running.
    pub fn snapshot(&self) -> Option<&TimerSnapshot> {
        self.snapshot.as_ref()
    }

    /// Start a countdown of `minutes`, replacing any running one.
    pub fn start(&mut self, host: &dyn Host, minutes: u32, now: Millis) -> Result<(), TimerError> {
        if minutes == 0 {
            return Err(TimerError::ZeroDuration);
        }

        host::haptic_pulse(host, self.config.haptic);

        let duration_ms = format::minutes_to_ms(minutes);
        info!("Starting {} minute sleep timer ({})", minutes, self.source);
        self.backend.start(host, duration_ms, now);
        self.fired_for = None;
        self.last_seen = None;

        if self.config.device_timer_sync && host.has_service(DEVICE_DOMAIN, "set_timer") {
            host::fire_and_forget(
                host,
                ServiceCall::for_entity(DEVICE_DOMAIN, "set_timer", &self.config.media_player_entity)
                    .with("duration", minutes),
            );
        }

        Ok(())
    }

    /// Cancel the countdown. Safe to call when nothing is running.
    pub fn cancel(&mut self, host: &dyn Host) {
        host::haptic_pulse(host, self.config.haptic);

        info!("Cancelling sleep timer ({})", self.source);
        self.backend.cancel(host);
        self.snapshot = None;
        self.last_seen = None;

        if self.config.device_timer_sync && host.has_service(DEVICE_DOMAIN, "cancel_timer") {
            host::fire_and_forget(
                host,
                ServiceCall::for_entity(
                    DEVICE_DOMAIN,
                    "cancel_timer",
                    &self.config.media_player_entity,
                ),
            );
        }
    }

    /// Re-read the countdown and run the expiration actions if it just ended.
    pub fn tick(&mut self, host: &dyn Host, now: Millis) -> TickOutcome {
        let countdown = self.backend.read(host, now);
        let previous = self.last_seen.take();

        match countdown {
            Some(c) if c.remaining_ms > 0 || c.paused => {
                debug!("Sleep timer: {} ms remaining", c.remaining_ms);
                self.snapshot = Some(TimerSnapshot::from_countdown(&c));
                self.last_seen = Some(c);
                if c.remaining_ms > 0 {
                    self.fired_for = None;
                }
                TickOutcome::default()
            }
            Some(c) => {
                self.snapshot = None;
                if self.fired_for == Some(c.end_at) {
                    return TickOutcome::default();
                }
                self.fired_for = Some(c.end_at);
                self.backend.clear_expired(host);
                self.expire(host)
            }
            None => {
                self.snapshot = None;
                if self.finished_while_away(previous.as_ref()) {
                    self.fired_for = Some(previous.and_then(|p| p.end_at));
                    return self.expire(host);
                }
                TickOutcome::default()
            }
        }
    }

    /// A host timer that was about to finish and is now gone ran out between
    /// two polls; the host clears it before the card sees zero.
    fn finished_while_away(&self, previous: Option<&Countdown>) -> bool {
        matches!(self.source, TimerSource::NativeTimer { .. })
            && self.fired_for.is_none()
            && previous.is_some_and(|p| !p.paused && p.remaining_ms <= POLL_INTERVAL_MS)
    }

    fn expire(&mut self, host: &dyn Host) -> TickOutcome {
        let deferred = execute_expiration_actions(
            host,
            &self.config.light_entity,
            &self.config.media_player_entity,
            &self.config.expiration,
        );
        TickOutcome {
            expired: true,
            deferred,
        }
    }
}
