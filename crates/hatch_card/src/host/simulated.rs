use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use serde_json::Value;
use serde_json::json;
use tracing::debug;

use super::EntityState;
use super::Host;
use super::HostError;
use super::HostEvent;
use super::ServiceCall;
use crate::clock::Clock;
use crate::timer::format;

/// Services every dashboard host provides for the domains the card touches.
const BUILTIN_SERVICES: &[(&str, &str)] = &[
    ("light", "turn_on"),
    ("light", "turn_off"),
    ("light", "toggle"),
    ("media_player", "media_play"),
    ("media_player", "media_pause"),
    ("media_player", "media_stop"),
    ("media_player", "volume_set"),
    ("media_player", "select_sound_mode"),
    ("media_player", "turn_on"),
    ("media_player", "turn_off"),
    ("media_player", "toggle"),
    ("input_text", "set_value"),
    ("timer", "start"),
    ("timer", "pause"),
    ("timer", "cancel"),
];

#[derive(Debug, Default)]
struct Inner {
    entities: BTreeMap<String, EntityState>,
    services: BTreeSet<(String, String)>,
    rejected: BTreeSet<(String, String)>,
    calls: Vec<ServiceCall>,
    events: Vec<HostEvent>,
    vibrations: usize,
}

/// In-memory host.
///
/// Keeps a state table, applies the subset of service semantics the card
/// relies on, and records every accepted call so tests can assert on them.
pub struct SimulatedHost {
    inner: Mutex<Inner>,
    clock: Arc<dyn Clock>,
}

impl SimulatedHost {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let services = BUILTIN_SERVICES
            .iter()
            .map(|(d, s)| (d.to_string(), s.to_string()))
            .collect();
        Self {
            inner: Mutex::new(Inner {
                services,
                ..Inner::default()
            }),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_entity(&self, entity_id: &str, state: EntityState) {
        self.lock().entities.insert(entity_id.to_string(), state);
    }

    pub fn remove_entity(&self, entity_id: &str) {
        self.lock().entities.remove(entity_id);
    }

    /// Register a custom `domain.service`, e.g. a device driver's timer service.
    pub fn register_service(&self, domain: &str, service: &str) {
        self.lock()
            .services
            .insert((domain.to_string(), service.to_string()));
    }

    /// Make the host refuse every future call to `domain.service`.
    pub fn reject_service(&self, domain: &str, service: &str) {
        self.lock()
            .rejected
            .insert((domain.to_string(), service.to_string()));
    }

    pub fn calls(&self) -> Vec<ServiceCall> {
        self.lock().calls.clone()
    }

    /// Accepted calls to one `domain.service`.
    pub fn calls_to(&self, domain: &str, service: &str) -> Vec<ServiceCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.domain == domain && c.service == service)
            .cloned()
            .collect()
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.lock().events.clone()
    }

    pub fn vibrations(&self) -> usize {
        self.lock().vibrations
    }

    fn apply(&self, inner: &mut Inner, call: &ServiceCall) {
        let Some(entity_id) = call.entity_id() else {
            return;
        };
        let now = self.clock.now_ms();
        let Some(entity) = inner.entities.get_mut(entity_id) else {
            debug!("{} targets unknown entity {}", call, entity_id);
            return;
        };

        match (call.domain.as_str(), call.service.as_str()) {
            ("light", "turn_on") => {
                entity.state = "on".to_string();
                if let Some(b) = call.data.get("brightness").and_then(Value::as_u64) {
                    entity.attributes.insert("brightness".into(), json!(b.min(255)));
                }
                if let Some(pct) = call.data.get("brightness_pct").and_then(Value::as_f64) {
                    let b = (pct.clamp(0.0, 100.0) * 255.0 / 100.0).round() as u64;
                    entity.attributes.insert("brightness".into(), json!(b));
                }
                if let Some(rgb) = call.data.get("rgb_color") {
                    entity.attributes.insert("rgb_color".into(), rgb.clone());
                }
            }
            ("light", "turn_off") => entity.state = "off".to_string(),
            ("light", "toggle") => {
                entity.state = if entity.state == "on" { "off" } else { "on" }.to_string();
            }
            ("media_player", "media_play") => entity.state = "playing".to_string(),
            ("media_player", "media_pause") => entity.state = "paused".to_string(),
            ("media_player", "media_stop") => entity.state = "idle".to_string(),
            ("media_player", "turn_on") => entity.state = "on".to_string(),
            ("media_player", "turn_off") => entity.state = "off".to_string(),
            ("media_player", "toggle") => {
                entity.state = if entity.state == "off" { "on" } else { "off" }.to_string();
            }
            ("media_player", "volume_set") => {
                if let Some(v) = call.data.get("volume_level") {
                    entity.attributes.insert("volume_level".into(), v.clone());
                }
            }
            ("media_player", "select_sound_mode") => {
                if let Some(m) = call.data.get("sound_mode") {
                    entity.attributes.insert("sound_mode".into(), m.clone());
                }
            }
            ("input_text", "set_value") => {
                entity.state = call
                    .data
                    .get("value")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
            }
            ("timer", "start") => {
                let duration = call
                    .data
                    .get("duration")
                    .and_then(Value::as_str)
                    .and_then(format::parse_hms)
                    .or_else(|| entity.attribute_str("duration").and_then(format::parse_hms))
                    .unwrap_or_default();
                let text = host_duration(duration);
                entity.state = "active".to_string();
                entity.attributes.insert("duration".into(), json!(text));
                entity.attributes.insert("remaining".into(), json!(text));
                entity.attributes.insert(
                    "finishes_at".into(),
                    json!(format::format_timestamp(now + duration)),
                );
            }
            ("timer", "pause") => {
                if entity.state == "active" {
                    let remaining = entity
                        .attribute_str("finishes_at")
                        .and_then(format::parse_timestamp)
                        .map(|end| (end - now).max(0))
                        .unwrap_or_default();
                    entity.state = "paused".to_string();
                    entity.attributes.remove("finishes_at");
                    entity
                        .attributes
                        .insert("remaining".into(), json!(host_duration(remaining)));
                }
            }
            ("timer", "cancel") => idle_timer(entity),
            _ => {}
        }
    }
}

/// The host reports durations as `H:MM:SS` without padding the hours.
fn host_duration(ms: i64) -> String {
    let s = ms.max(0) / 1000;
    format!("{}:{:02}:{:02}", s / 3600, (s % 3600) / 60, s % 60)
}

fn idle_timer(entity: &mut EntityState) {
    entity.state = "idle".to_string();
    entity.attributes.remove("finishes_at");
    if let Some(duration) = entity.attributes.get("duration").cloned() {
        entity.attributes.insert("remaining".into(), duration);
    }
}

impl Host for SimulatedHost {
    fn entity(&self, entity_id: &str) -> Option<EntityState> {
        let now = self.clock.now_ms();
        let mut inner = self.lock();
        let entity = inner.entities.get_mut(entity_id)?;

        // Host timers finish on their own.
        if entity_id.starts_with("timer.") && entity.state == "active" {
            let finished = entity
                .attribute_str("finishes_at")
                .and_then(format::parse_timestamp)
                .is_some_and(|end| end <= now);
            if finished {
                debug!("Timer {} finished", entity_id);
                idle_timer(entity);
            }
        }

        Some(entity.clone())
    }

    fn call_service(&self, call: ServiceCall) -> Result<(), HostError> {
        let mut inner = self.lock();
        let key = (call.domain.clone(), call.service.clone());

        if inner.rejected.contains(&key) {
            return Err(HostError::Rejected {
                domain: call.domain,
                service: call.service,
                reason: "not supported by device".to_string(),
            });
        }
        if !inner.services.contains(&key) {
            return Err(HostError::ServiceNotFound {
                domain: call.domain,
                service: call.service,
            });
        }

        self.apply(&mut inner, &call);
        inner.calls.push(call);
        Ok(())
    }

    fn has_service(&self, domain: &str, service: &str) -> bool {
        self.lock()
            .services
            .contains(&(domain.to_string(), service.to_string()))
    }

    fn vibrate(&self) {
        self.lock().vibrations += 1;
    }

    fn fire_event(&self, event: HostEvent) {
        self.lock().events.push(event);
    }
}
