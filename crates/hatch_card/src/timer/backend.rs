use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use tracing::warn;

use super::format;
use crate::clock::Millis;
use crate::host;
use crate::host::Host;
use crate::host::ServiceCall;

/// A countdown as read from a backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Countdown {
    /// Absolute completion time, when the backend knows it.
    pub end_at: Option<Millis>,

    pub remaining_ms: Millis,

    /// Originally requested duration, when the backend knows it.
    pub total_ms: Option<Millis>,

    pub paused: bool,
}

/// Storage for one countdown.
pub trait TimerBackend: Send {
    fn start(&mut self, host: &dyn Host, duration_ms: Millis, now: Millis);

    fn cancel(&mut self, host: &dyn Host);

    /// Current countdown, or `None` when no countdown is active.
    fn read(&mut self, host: &dyn Host, now: Millis) -> Option<Countdown>;

    /// Forget a countdown that ran out.
    fn clear_expired(&mut self, host: &dyn Host);
}

/// Countdown held in memory only; lost when the card goes away.
#[derive(Debug, Default)]
pub struct LocalBackend {
    /// `(end_at, total_ms)`, always set together.
    active: Option<(Millis, Millis)>,
}

impl TimerBackend for LocalBackend {
    fn start(&mut self, _host: &dyn Host, duration_ms: Millis, now: Millis) {
        self.active = Some((now + duration_ms, duration_ms));
    }

    fn cancel(&mut self, _host: &dyn Host) {
        self.active = None;
    }

    fn read(&mut self, _host: &dyn Host, now: Millis) -> Option<Countdown> {
        let (end_at, total_ms) = self.active?;
        Some(Countdown {
            end_at: Some(end_at),
            remaining_ms: end_at.saturating_sub(now).max(0),
            total_ms: Some(total_ms),
            paused: false,
        })
    }

    fn clear_expired(&mut self, _host: &dyn Host) {
        self.active = None;
    }
}

/// Largest magnitude accepted for payload fields: the range of a host date
/// in epoch ms.
const MAX_PAYLOAD_MS: f64 = 8.64e15;

/// Payload stored in the helper entity, both fields in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JsonTimerPayload {
    pub end: Millis,
    pub duration: Millis,
}

impl JsonTimerPayload {
    /// Parse a helper state. Empty text means no countdown; anything that is
    /// not an object with numeric `end` and `duration` within the host's date
    /// range is logged and ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() || text == "unknown" || text == "unavailable" {
            return None;
        }

        let value: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                warn!("Ignoring malformed timer payload {:?}: {}", text, e);
                return None;
            }
        };

        let field = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_f64)
                .filter(|v| v.is_finite() && v.abs() <= MAX_PAYLOAD_MS)
                .map(|v| v.round() as Millis)
        };
        match (field("end"), field("duration")) {
            (Some(end), Some(duration)) if duration > 0 => Some(Self { end, duration }),
            _ => {
                warn!("Ignoring incomplete timer payload {:?}", text);
                None
            }
        }
    }
}

/// Countdown stored as JSON text in an `input_text` helper, so every
/// dashboard showing the card sees the same countdown.
#[derive(Debug)]
pub struct JsonHelperBackend {
    entity_id: String,
}

impl JsonHelperBackend {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
        }
    }

    fn write(&self, host: &dyn Host, value: String) {
        host::fire_and_forget(
            host,
            ServiceCall::for_entity("input_text", "set_value", &self.entity_id).with("value", value),
        );
    }
}

impl TimerBackend for JsonHelperBackend {
    fn start(&mut self, host: &dyn Host, duration_ms: Millis, now: Millis) {
        let payload = JsonTimerPayload {
            end: now + duration_ms,
            duration: duration_ms,
        };
        match serde_json::to_string(&payload) {
            Ok(text) => self.write(host, text),
            Err(e) => warn!("Failed to encode timer payload: {}", e),
        }
    }

    fn cancel(&mut self, host: &dyn Host) {
        self.write(host, String::new());
    }

    fn read(&mut self, host: &dyn Host, now: Millis) -> Option<Countdown> {
        let entity = host.entity(&self.entity_id)?;
        let payload = JsonTimerPayload::parse(&entity.state)?;
        Some(Countdown {
            end_at: Some(payload.end),
            remaining_ms: payload.end.saturating_sub(now).max(0),
            total_ms: Some(payload.duration),
            paused: false,
        })
    }

    fn clear_expired(&mut self, host: &dyn Host) {
        self.write(host, String::new());
    }
}

/// Countdown owned by a host `timer` entity. The card only reads it.
#[derive(Debug)]
pub struct NativeTimerBackend {
    entity_id: String,
}

impl NativeTimerBackend {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
        }
    }
}

impl TimerBackend for NativeTimerBackend {
    fn start(&mut self, host: &dyn Host, duration_ms: Millis, _now: Millis) {
        host::fire_and_forget(
            host,
            ServiceCall::for_entity("timer", "start", &self.entity_id)
                .with("duration", format::format_hms(duration_ms)),
        );
    }

    fn cancel(&mut self, host: &dyn Host) {
        host::fire_and_forget(host, ServiceCall::for_entity("timer", "cancel", &self.entity_id));
    }

    fn read(&mut self, host: &dyn Host, now: Millis) -> Option<Countdown> {
        let entity = host.entity(&self.entity_id)?;
        let total_ms = entity.attribute_str("duration").and_then(format::parse_hms);
        let remaining_attr = entity.attribute_str("remaining").and_then(format::parse_hms);

        match entity.state.as_str() {
            "active" => {
                let end_at = entity.attribute_str("finishes_at").and_then(format::parse_timestamp);
                let remaining_ms = match end_at {
                    Some(end) => end.saturating_sub(now).max(0),
                    None => remaining_attr?,
                };
                Some(Countdown {
                    end_at,
                    remaining_ms,
                    total_ms,
                    paused: false,
                })
            }
            "paused" => Some(Countdown {
                end_at: None,
                remaining_ms: remaining_attr?,
                total_ms,
                paused: true,
            }),
            other => {
                debug!("Timer {} is {}", self.entity_id, other);
                None
            }
        }
    }

    fn clear_expired(&mut self, _host: &dyn Host) {}
}
