//! Tap, hold and double-tap actions.
//!
//! Every gesture outcome resolves to one `Action`. Performing an action makes
//! at most one host call, except `toggle`, which walks a fallback chain
//! because not every device implements every service.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use tracing::info;
use tracing::warn;

use crate::config::CardConfig;
use crate::host;
use crate::host::Host;
use crate::host::HostEvent;
use crate::host::ServiceCall;

/// Entity id placeholder for "the configured light".
const LIGHT_PLACEHOLDER: &str = "light";

/// Entity id placeholder for "the configured media player".
const MEDIA_PLAYER_PLACEHOLDER: &str = "media_player";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Action {
    #[default]
    None,

    Toggle {
        #[serde(default)]
        target: ToggleTarget,
    },

    MoreInfo,

    CallService {
        /// `domain.service`
        service: String,

        #[serde(default, skip_serializing_if = "Map::is_empty")]
        service_data: Map<String, Value>,

        #[serde(default, skip_serializing_if = "Map::is_empty")]
        data: Map<String, Value>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<ServiceTarget>,
    },

    Navigate {
        navigation_path: Option<String>,
    },

    Url {
        url_path: Option<String>,

        #[serde(default = "default_new_tab")]
        new_tab: bool,
    },
}

fn default_new_tab() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleTarget {
    #[default]
    Light,
    MediaPlayer,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ServiceTarget {
    pub entity_id: Option<String>,
}

impl Action {
    pub fn is_none(&self) -> bool {
        matches!(self, Action::None)
    }
}

/// Perform `action` for the card described by `config`.
///
/// `none` does nothing at all. Every other action pulses haptics once before
/// its own side effects.
pub fn perform<H: Host + ?Sized>(host: &H, config: &CardConfig, action: &Action) {
    if action.is_none() {
        return;
    }

    host::haptic_pulse(host, config.haptic);

    match action {
        Action::None => {}
        Action::Toggle { target } => toggle(host, config, *target),
        Action::MoreInfo => {
            info!("Opening detail view for {}", config.light_entity);
            host.fire_event(HostEvent::MoreInfo {
                entity_id: config.light_entity.clone(),
            });
        }
        Action::CallService {
            service,
            service_data,
            data,
            target,
        } => match resolve_service_call(config, service, service_data, data, target.as_ref()) {
            Some(call) => host::fire_and_forget(host, call),
            None => warn!("Ignoring call-service action with malformed service '{}'", service),
        },
        Action::Navigate { navigation_path } => {
            if let Some(path) = navigation_path {
                host.fire_event(HostEvent::Navigate { path: path.clone() });
            }
        }
        Action::Url { url_path, new_tab } => {
            if let Some(url) = url_path {
                host.fire_event(HostEvent::OpenUrl {
                    url: url.clone(),
                    new_tab: *new_tab,
                });
            }
        }
    }
}

/// Services to try, in order, when toggling the given entity.
fn toggle_candidates(target: ToggleTarget, current_state: Option<&str>) -> &'static [&'static str] {
    match (target, current_state) {
        (ToggleTarget::Light, Some("on")) => &["toggle", "turn_off"],
        (ToggleTarget::Light, _) => &["toggle", "turn_on"],
        (ToggleTarget::MediaPlayer, Some("playing" | "on" | "buffering")) => {
            &["media_stop", "media_pause", "turn_off", "toggle"]
        }
        (ToggleTarget::MediaPlayer, _) => &["media_play", "turn_on", "toggle"],
    }
}

fn toggle<H: Host + ?Sized>(host: &H, config: &CardConfig, target: ToggleTarget) {
    let (domain, entity_id) = match target {
        ToggleTarget::Light => ("light", config.light_entity.as_str()),
        ToggleTarget::MediaPlayer => ("media_player", config.media_player_entity.as_str()),
    };
    let state = host.entity(entity_id).map(|e| e.state);

    for service in toggle_candidates(target, state.as_deref()) {
        if !host.has_service(domain, service) {
            continue;
        }
        match host.call_service(ServiceCall::for_entity(domain, service, entity_id)) {
            Ok(()) => {
                info!("Toggled {} with {}.{}", entity_id, domain, service);
                return;
            }
            Err(e) => warn!("{}.{} failed for {}, trying next: {}", domain, service, entity_id, e),
        }
    }

    warn!("No toggle service accepted for {}", entity_id);
}

fn resolve_placeholder(config: &CardConfig, entity_id: &str) -> String {
    match entity_id {
        LIGHT_PLACEHOLDER => config.light_entity.clone(),
        MEDIA_PLAYER_PLACEHOLDER => config.media_player_entity.clone(),
        other => other.to_string(),
    }
}

/// Build the call for a `call-service` action.
///
/// `data` overrides `service_data`, and an explicit target overrides both.
/// The placeholders `light` and `media_player` become the configured ids.
fn resolve_service_call(
    config: &CardConfig,
    service: &str,
    service_data: &Map<String, Value>,
    data: &Map<String, Value>,
    target: Option<&ServiceTarget>,
) -> Option<ServiceCall> {
    let (domain, service) = service.split_once('.')?;
    if domain.is_empty() || service.is_empty() {
        return None;
    }

    let mut call = ServiceCall::new(domain, service);
    call.data.extend(service_data.clone());
    call.data.extend(data.clone());

    let explicit = target.and_then(|t| t.entity_id.as_deref());
    if let Some(entity_id) = explicit {
        call.data.insert(
            "entity_id".to_string(),
            Value::String(resolve_placeholder(config, entity_id)),
        );
    } else if let Some(resolved) = call
        .data
        .get("entity_id")
        .and_then(Value::as_str)
        .map(|id| resolve_placeholder(config, id))
    {
        call.data.insert("entity_id".to_string(), Value::String(resolved));
    }

    Some(call)
}
