//! Volume, brightness and sound-mode controls on the card face.

use tracing::debug;

use crate::config::CardConfig;
use crate::host;
use crate::host::Host;
use crate::host::ServiceCall;

/// Clamp to `[0, 1]` and round to two decimals.
fn normalize_volume(level: f64) -> f64 {
    ((level * 100.0).round() / 100.0).clamp(0.0, 1.0)
}

fn current_volume<H: Host + ?Sized>(host: &H, config: &CardConfig) -> f64 {
    host.entity(&config.media_player_entity)
        .and_then(|e| e.attribute_f64("volume_level"))
        .unwrap_or(0.0)
}

/// Nudge the volume by `delta`, usually `±config.volume_step`.
pub fn volume_step<H: Host + ?Sized>(host: &H, config: &CardConfig, delta: f64) {
    let level = current_volume(host, config) + delta;
    set_volume(host, config, level);
}

pub fn set_volume<H: Host + ?Sized>(host: &H, config: &CardConfig, level: f64) {
    host::haptic_pulse(host, config.haptic);
    let level = normalize_volume(level);
    host::fire_and_forget(
        host,
        ServiceCall::for_entity("media_player", "volume_set", &config.media_player_entity)
            .with("volume_level", level),
    );
}

/// Brightness on the host's 0-255 scale.
pub fn set_brightness<H: Host + ?Sized>(host: &H, config: &CardConfig, brightness: u8) {
    host::haptic_pulse(host, config.haptic);
    host::fire_and_forget(
        host,
        ServiceCall::for_entity("light", "turn_on", &config.light_entity)
            .with("brightness", brightness),
    );
}

/// Switch the sound mode. Selecting the active mode is a no-op.
pub fn select_sound_mode<H: Host + ?Sized>(host: &H, config: &CardConfig, mode: &str) {
    let current = host
        .entity(&config.media_player_entity)
        .and_then(|e| e.attribute_str("sound_mode").map(str::to_string));
    if current.as_deref() == Some(mode) {
        debug!("Sound mode already {}", mode);
        return;
    }

    host::haptic_pulse(host, config.haptic);
    host::fire_and_forget(
        host,
        ServiceCall::for_entity("media_player", "select_sound_mode", &config.media_player_entity)
            .with("sound_mode", mode),
    );
}

/// Volume for a click at `x` pixels into a bar `width` pixels wide.
pub fn volume_from_position(x: f64, width: f64) -> f64 {
    if width <= 0.0 {
        return 0.0;
    }
    normalize_volume(x / width)
}
