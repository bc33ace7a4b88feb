use serde::Deserialize;
use serde::Serialize;

use super::ConfigError;
use crate::actions::Action;

/// Timer presets offered when none are configured, in minutes.
pub const DEFAULT_TIMER_PRESETS: [u32; 4] = [15, 30, 60, 120];

pub const DEFAULT_ICON: &str = "mdi:speaker";

pub const DEFAULT_SECONDARY_INFO: &str = "Volume {volume}%";

/// Settings object of one card instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardConfig {
    pub light_entity: String,
    pub media_player_entity: String,

    /// Display name; falls back to the light's friendly name.
    pub name: Option<String>,

    /// Icon chosen by the user. When unset the sound mode picks the icon.
    pub icon: Option<String>,

    /// Backing store for the sleep timer. `input_text.*` stores a JSON
    /// payload, `timer.*` uses the host's native timer, unset keeps the
    /// countdown in memory.
    pub timer_entity: Option<String>,

    pub timer_presets: Vec<u32>,

    pub haptic: bool,

    pub secondary_info: String,

    pub volume_step: f64,
    pub volume_presets: Option<Vec<f64>>,

    /// Mirror timer start/cancel to the device driver's own timer service.
    pub device_timer_sync: bool,

    pub tap_action: Action,
    pub hold_action: Action,
    pub double_tap_action: Action,

    #[serde(flatten)]
    pub expiration: ExpirationActions,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            light_entity: String::new(),
            media_player_entity: String::new(),
            name: None,
            icon: None,
            timer_entity: None,
            timer_presets: DEFAULT_TIMER_PRESETS.to_vec(),
            haptic: true,
            secondary_info: DEFAULT_SECONDARY_INFO.to_string(),
            volume_step: 0.01,
            volume_presets: None,
            device_timer_sync: true,
            tap_action: Action::Toggle {
                target: Default::default(),
            },
            hold_action: Action::MoreInfo,
            double_tap_action: Action::None,
            expiration: ExpirationActions::default(),
        }
    }
}

/// What happens when the sleep timer runs out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpirationActions {
    #[serde(rename = "timer_action_turn_off_light")]
    pub turn_off_light: bool,

    #[serde(rename = "timer_action_turn_off_media")]
    pub stop_media: bool,

    #[serde(rename = "timer_action_sound_mode")]
    pub sound_mode: Option<String>,

    /// Percentage, 0-100.
    #[serde(rename = "timer_action_volume")]
    pub volume: Option<f64>,

    #[serde(rename = "timer_action_light_color")]
    pub light_color: Option<[u8; 3]>,

    /// Percentage, 0-100.
    #[serde(rename = "timer_action_light_brightness")]
    pub light_brightness: Option<u8>,
}

impl Default for ExpirationActions {
    fn default() -> Self {
        Self {
            turn_off_light: true,
            stop_media: false,
            sound_mode: None,
            volume: None,
            light_color: None,
            light_brightness: None,
        }
    }
}

/// Where the sleep timer lives.
#[derive(Debug, Clone, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum TimerSource {
    Local,
    JsonHelper { entity_id: String },
    NativeTimer { entity_id: String },
}

impl CardConfig {
    /// Message shown in place of the card when the entity ids are missing.
    pub fn missing_entities_message(&self) -> Option<&'static str> {
        if self.light_entity.trim().is_empty() || self.media_player_entity.trim().is_empty() {
            Some("You must define `light_entity` and `media_player_entity`.")
        } else {
            None
        }
    }

    /// Select the timer backend from the shape of `timer_entity`.
    pub fn timer_source(&self) -> Result<TimerSource, ConfigError> {
        let Some(entity_id) = self.timer_entity.as_deref().map(str::trim) else {
            return Ok(TimerSource::Local);
        };

        match entity_id.split_once('.') {
            _ if entity_id.is_empty() => Ok(TimerSource::Local),
            Some(("input_text", _)) => Ok(TimerSource::JsonHelper {
                entity_id: entity_id.to_string(),
            }),
            Some(("timer", _)) => Ok(TimerSource::NativeTimer {
                entity_id: entity_id.to_string(),
            }),
            _ => Err(ConfigError::Invalid {
                field: "timer_entity",
                message: format!(
                    "'{}' must be an input_text or timer entity",
                    entity_id
                ),
            }),
        }
    }

    /// Presets with empty or non-positive entries removed.
    pub fn presets(&self) -> Vec<u32> {
        let presets: Vec<u32> = self.timer_presets.iter().copied().filter(|m| *m > 0).collect();
        if presets.is_empty() {
            DEFAULT_TIMER_PRESETS.to_vec()
        } else {
            presets
        }
    }

    /// Checks that must hold before the card is mounted.
    ///
    /// Missing entity ids are not checked here; the card renders them as an
    /// inline message instead.
    pub(crate) fn check(&self) -> Result<(), ConfigError> {
        self.timer_source()?;

        if !(self.volume_step > 0.0 && self.volume_step <= 1.0) {
            return Err(ConfigError::Invalid {
                field: "volume_step",
                message: format!("{} is outside (0, 1]", self.volume_step),
            });
        }
        if let Some(volume) = self.expiration.volume {
            if !(0.0..=100.0).contains(&volume) {
                return Err(ConfigError::Invalid {
                    field: "timer_action_volume",
                    message: format!("{} is outside 0-100", volume),
                });
            }
        }
        if let Some(brightness) = self.expiration.light_brightness {
            if brightness > 100 {
                return Err(ConfigError::Invalid {
                    field: "timer_action_light_brightness",
                    message: format!("{} is outside 0-100", brightness),
                });
            }
        }
        Ok(())
    }
}
