//! Field-by-field editing of the settings object.
//!
//! Mirrors what the visual editor does when a form field changes: parse the
//! raw input for that key, drop the key when it is empty or equal to its
//! default, and hand back the new settings object.

use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use tracing::debug;

use super::CardConfig;
use super::ConfigError;
use super::card::DEFAULT_SECONDARY_INFO;
use super::card::DEFAULT_TIMER_PRESETS;
use super::color::color_from_name_or_rgb;

/// Raw input from one form widget.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Switch(bool),
    Select(String),
    Text(String),
}

#[derive(Debug, Clone, Default)]
pub struct ConfigEditor {
    config: Map<String, Value>,
}

fn default_for(key: &str) -> Option<Value> {
    let value = match key {
        "haptic" => json!(true),
        "volume_step" => json!(0.01),
        "secondary_info" => json!(DEFAULT_SECONDARY_INFO),
        "timer_presets" => json!(DEFAULT_TIMER_PRESETS),
        "timer_action_turn_off_light" => json!(true),
        "device_timer_sync" => json!(true),
        _ => return None,
    };
    Some(value)
}

fn parse_field(key: &str, value: FieldValue) -> Value {
    let text = match value {
        FieldValue::Switch(on) => return Value::Bool(on),
        FieldValue::Select(s) => return Value::String(s),
        FieldValue::Text(text) => text,
    };

    match key {
        "volume_presets" => {
            let presets: Vec<f64> = text
                .split(',')
                .filter_map(|v| v.trim().parse::<f64>().ok())
                .filter(|v| (0.0..=1.0).contains(v))
                .collect();
            if presets.is_empty() {
                Value::Null
            } else {
                json!(presets)
            }
        }
        "timer_presets" => {
            let presets: Vec<u32> = text
                .split(',')
                .filter_map(|v| v.trim().parse::<u32>().ok())
                .filter(|v| *v > 0)
                .collect();
            if presets.is_empty() {
                json!(DEFAULT_TIMER_PRESETS)
            } else {
                json!(presets)
            }
        }
        "timer_action_light_color" => color_from_name_or_rgb(&text)
            .map(|rgb| json!(rgb))
            .unwrap_or(Value::Null),
        "volume_step" => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| *v > 0.0 && *v <= 1.0)
            .map(|v| json!(v))
            .unwrap_or(Value::Null),
        k if k.starts_with("timer_action_")
            && (k.ends_with("_brightness") || k.ends_with("_volume")) =>
        {
            text.trim()
                .parse::<u8>()
                .ok()
                .filter(|v| *v <= 100)
                .map(|v| json!(v))
                .unwrap_or(Value::Null)
        }
        _ => Value::String(text),
    }
}

impl ConfigEditor {
    pub fn new(config: Map<String, Value>) -> Self {
        Self { config }
    }

    /// Start from an existing card configuration.
    pub fn from_card(card: &CardConfig) -> Result<Self, ConfigError> {
        match serde_json::to_value(card).map_err(ConfigError::Settings)? {
            Value::Object(config) => Ok(Self { config }),
            other => Err(ConfigError::Invalid {
                field: "card",
                message: format!("expected a table, got {}", other),
            }),
        }
    }

    pub fn config(&self) -> &Map<String, Value> {
        &self.config
    }

    /// Apply one field edit and return the resulting settings object.
    pub fn apply(&mut self, key: &str, value: FieldValue) -> &Map<String, Value> {
        let value = parse_field(key, value);

        let is_empty = match &value {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        };

        if default_for(key).is_some_and(|d| d == value) || is_empty {
            debug!("Removing {} from card config", key);
            self.config.remove(key);
        } else {
            debug!("Setting {} = {}", key, value);
            self.config.insert(key.to_string(), value);
        }

        &self.config
    }

    /// Build a validated card configuration from the edited object.
    pub fn to_card(&self) -> Result<CardConfig, ConfigError> {
        let card: CardConfig = serde_json::from_value(Value::Object(self.config.clone()))
            .map_err(ConfigError::Settings)?;
        card.check()?;
        Ok(card)
    }
}
