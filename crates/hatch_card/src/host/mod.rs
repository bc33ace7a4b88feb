//! Contract with the dashboard host.
//!
//! The card never owns device state. It reads entity snapshots from the host
//! and asks the host to run services on its behalf. Everything here is
//! synchronous: a successful `call_service` only means the host accepted the
//! call, not that the device did anything.

mod simulated;

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

pub use simulated::SimulatedHost;

/// Snapshot of one host entity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityState {
    pub state: String,

    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl EntityState {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key).filter(|v| !v.is_null())
    }

    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attribute(key).and_then(Value::as_str)
    }

    pub fn attribute_f64(&self, key: &str) -> Option<f64> {
        self.attribute(key).and_then(Value::as_f64)
    }
}

/// A single `domain.service` invocation with its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCall {
    pub domain: String,
    pub service: String,
    pub data: Map<String, Value>,
}

impl ServiceCall {
    pub fn new(domain: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            service: service.into(),
            data: Map::new(),
        }
    }

    /// Call targeting a single entity.
    pub fn for_entity(domain: &str, service: &str, entity_id: &str) -> Self {
        Self::new(domain, service).with("entity_id", entity_id)
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.data.get("entity_id").and_then(Value::as_str)
    }
}

impl std::fmt::Display for ServiceCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.domain, self.service)
    }
}

/// Notifications the card raises towards the host's frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    /// Open the detail dialog for an entity.
    MoreInfo { entity_id: String },
    Navigate { path: String },
    OpenUrl { url: String, new_tab: bool },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HostError {
    #[error("service {domain}.{service} is not registered")]
    ServiceNotFound { domain: String, service: String },

    #[error("service {domain}.{service} rejected: {reason}")]
    Rejected {
        domain: String,
        service: String,
        reason: String,
    },
}

/// Everything the card needs from the dashboard host.
pub trait Host: Send + Sync {
    /// Current state of an entity, if the host knows it.
    fn entity(&self, entity_id: &str) -> Option<EntityState>;

    /// Ask the host to run a service. Returns once the call is accepted.
    fn call_service(&self, call: ServiceCall) -> Result<(), HostError>;

    /// Whether `domain.service` is currently registered.
    fn has_service(&self, domain: &str, service: &str) -> bool;

    /// Short haptic pulse. Hosts without haptics ignore it.
    fn vibrate(&self);

    fn fire_event(&self, event: HostEvent);
}

impl<T: Host + ?Sized> Host for Arc<T> {
    fn entity(&self, entity_id: &str) -> Option<EntityState> {
        (**self).entity(entity_id)
    }

    fn call_service(&self, call: ServiceCall) -> Result<(), HostError> {
        (**self).call_service(call)
    }

    fn has_service(&self, domain: &str, service: &str) -> bool {
        (**self).has_service(domain, service)
    }

    fn vibrate(&self) {
        (**self).vibrate()
    }

    fn fire_event(&self, event: HostEvent) {
        (**self).fire_event(event)
    }
}

/// Dispatch a call and log instead of propagating a failure.
///
/// Used for every command whose outcome the card does not act on.
pub fn fire_and_forget<H: Host + ?Sized>(host: &H, call: ServiceCall) {
    let name = call.to_string();
    tracing::info!("Calling {} {:?}", name, call.data);
    if let Err(e) = host.call_service(call) {
        tracing::warn!("Call to {} failed: {}", name, e);
    }
}

/// Haptic feedback, if the card has it enabled.
pub fn haptic_pulse<H: Host + ?Sized>(host: &H, enabled: bool) {
    if enabled {
        host.vibrate();
    }
}
