//! What the card face shows, computed from host state.

use serde::Serialize;
use serde_json::Value;

use crate::config::CardConfig;
use crate::config::DEFAULT_ICON;
use crate::host::EntityState;
use crate::host::Host;
use crate::timer::TimerSnapshot;
use crate::timer::format;

pub const ENTITIES_NOT_FOUND: &str = "Entities not found. Please check your configuration.";

/// Tint used for lights in white mode.
pub const WARM_WHITE: [u8; 3] = [255, 206, 84];

/// Icon per sound mode of the device.
const SOUND_ICONS: &[(&str, &str)] = &[
    ("BrownNoise", "mdi:volume-high"),
    ("WhiteNoise", "mdi:waveform"),
    ("Ocean", "mdi:waves"),
    ("Thunderstorm", "mdi:weather-lightning"),
    ("Rain", "mdi:weather-rainy"),
    ("Water", "mdi:water"),
    ("Wind", "mdi:weather-windy"),
    ("Heartbeat", "mdi:heart-pulse"),
    ("Vacuum", "mdi:robot-vacuum"),
    ("Dryer", "mdi:tumble-dryer"),
    ("Fan", "mdi:fan"),
    ("ForestLake", "mdi:pine-tree"),
    ("CalmSea", "mdi:waves"),
    ("Crickets", "mdi:bug"),
    ("CampfireLake", "mdi:campfire"),
    ("Birds", "mdi:bird"),
    ("Brahms", "mdi:music-note"),
    ("Twinkle", "mdi:star-shooting"),
    ("RockABye", "mdi:music-box"),
];

pub fn sound_mode_icon(mode: &str) -> Option<&'static str> {
    SOUND_ICONS
        .iter()
        .find(|(name, _)| *name == mode)
        .map(|(_, icon)| *icon)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum CardView {
    /// Nothing rendered yet.
    Blank,
    Error { message: String },
    Card(CardFace),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardFace {
    pub name: String,
    pub is_on: bool,
    pub brightness_percent: u8,
    /// `None` while the light is off.
    pub light_color: Option<[u8; 3]>,
    pub volume_percent: u8,
    pub sound_mode: String,
    pub icon: String,
    pub secondary_info: String,
    pub timer_remaining: Option<String>,
    pub timer_percent: Option<f64>,
    /// Timer buttons as `(minutes, label)`.
    pub timer_presets: Vec<(u32, String)>,
    /// Volume buttons, each a level in `0.0..=1.0`. Empty hides the row.
    pub volume_presets: Vec<f64>,
}

pub fn render<H: Host + ?Sized>(
    host: &H,
    config: &CardConfig,
    timer: Option<&TimerSnapshot>,
) -> CardView {
    if let Some(message) = config.missing_entities_message() {
        return CardView::Error {
            message: message.to_string(),
        };
    }

    let (Some(light), Some(media)) = (
        host.entity(&config.light_entity),
        host.entity(&config.media_player_entity),
    ) else {
        return CardView::Error {
            message: ENTITIES_NOT_FOUND.to_string(),
        };
    };

    let is_on = light.state == "on";
    let brightness = light.attribute_f64("brightness").unwrap_or(0.0);
    let brightness_percent = percent(brightness / 255.0);
    let volume_percent = percent(media.attribute_f64("volume_level").unwrap_or(0.0));
    let sound_mode = media
        .attribute_str("sound_mode")
        .filter(|m| !m.is_empty())
        .unwrap_or("None")
        .to_string();

    let name = config
        .name
        .clone()
        .or_else(|| light.attribute_str("friendly_name").map(str::to_string))
        .unwrap_or_else(|| config.light_entity.clone());

    let icon = config
        .icon
        .as_deref()
        .or_else(|| sound_mode_icon(&sound_mode))
        .or_else(|| media.attribute_str("icon"))
        .unwrap_or(DEFAULT_ICON)
        .to_string();

    let remaining = timer.map(|t| t.display.clone());
    let template = if config.secondary_info.trim().is_empty() {
        String::new()
    } else {
        config
            .secondary_info
            .replacen("{volume}", &volume_percent.to_string(), 1)
            .replacen("{sound}", &sound_mode, 1)
            .replacen("{brightness}", &brightness_percent.to_string(), 1)
    };
    let secondary_info = match (&remaining, template.is_empty()) {
        (Some(r), false) => format!("{} • {}", template, r),
        (Some(r), true) => r.clone(),
        (None, _) => template,
    };

    CardView::Card(CardFace {
        name,
        is_on,
        brightness_percent,
        light_color: light_color(&light, is_on, brightness),
        volume_percent,
        sound_mode,
        icon,
        secondary_info,
        timer_remaining: remaining,
        timer_percent: timer.map(|t| t.percent_remaining),
        timer_presets: timer_presets(config),
        volume_presets: config.volume_presets.clone().unwrap_or_default(),
    })
}

fn timer_presets(config: &CardConfig) -> Vec<(u32, String)> {
    config
        .presets()
        .into_iter()
        .map(|m| (m, format::preset_label(m)))
        .collect()
}

fn percent(fraction: f64) -> u8 {
    (fraction * 100.0).round().clamp(0.0, 100.0) as u8
}

fn rgb_attribute(light: &EntityState) -> Option<[u8; 3]> {
    let values = light.attribute("rgb_color")?.as_array()?;
    let channel = |i: usize| -> Option<u8> {
        values.get(i).and_then(Value::as_u64).map(|c| c.min(255) as u8)
    };
    Some([channel(0)?, channel(1)?, channel(2)?])
}

/// Lights in white mode report black or zero saturation; show them warm.
fn light_color(light: &EntityState, is_on: bool, brightness: f64) -> Option<[u8; 3]> {
    if !is_on {
        return None;
    }
    let rgb = rgb_attribute(light)?;
    let saturation = light
        .attribute("hs_color")
        .and_then(Value::as_array)
        .and_then(|hs| hs.get(1))
        .and_then(Value::as_f64);

    let white = (rgb == [0, 0, 0] && brightness > 0.0) || saturation == Some(0.0);
    Some(if white { WARM_WHITE } else { rgb })
}
