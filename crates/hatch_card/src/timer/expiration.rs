use serde_json::json;
use tracing::info;

use crate::clock::Millis;
use crate::config::ExpirationActions;
use crate::host;
use crate::host::Host;
use crate::host::ServiceCall;

/// Delay between stopping the media and changing the light, so the light
/// change visibly follows the sound stopping.
pub const LIGHT_CHANGE_DELAY_MS: Millis = 1_000;

/// A call the caller must dispatch after `delay_ms`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredCall {
    pub delay_ms: Millis,
    pub call: ServiceCall,
}

/// Run the configured expiration actions.
///
/// Each effect is dispatched on its own; a rejected call does not stop the
/// others. The light change that has to wait for the media stop is returned
/// instead of dispatched.
pub fn execute_expiration_actions<H: Host + ?Sized>(
    host: &H,
    light_entity: &str,
    media_player_entity: &str,
    actions: &ExpirationActions,
) -> Option<DeferredCall> {
    info!("Sleep timer expired, running expiration actions");

    if actions.turn_off_light {
        host::fire_and_forget(host, ServiceCall::for_entity("light", "turn_off", light_entity));
    }

    if actions.stop_media {
        // Not every player supports turning off, so stop playback and mute.
        host::fire_and_forget(
            host,
            ServiceCall::for_entity("media_player", "media_stop", media_player_entity),
        );
        host::fire_and_forget(
            host,
            ServiceCall::for_entity("media_player", "volume_set", media_player_entity)
                .with("volume_level", 0),
        );
    } else if let Some(mode) = &actions.sound_mode {
        host::fire_and_forget(
            host,
            ServiceCall::for_entity("media_player", "select_sound_mode", media_player_entity)
                .with("sound_mode", mode.as_str()),
        );
    } else if let Some(volume) = actions.volume {
        let level = (volume / 100.0).clamp(0.0, 1.0);
        host::fire_and_forget(
            host,
            ServiceCall::for_entity("media_player", "volume_set", media_player_entity)
                .with("volume_level", level),
        );
    }

    if actions.turn_off_light {
        return None;
    }

    let mut call = ServiceCall::for_entity("light", "turn_on", light_entity);
    if let Some(brightness) = actions.light_brightness {
        call = call.with("brightness_pct", brightness);
    }
    if let Some(rgb) = actions.light_color {
        call = call.with("rgb_color", json!(rgb));
    }
    if call.data.len() == 1 {
        return None;
    }

    if actions.stop_media {
        Some(DeferredCall {
            delay_ms: LIGHT_CHANGE_DELAY_MS,
            call,
        })
    } else {
        host::fire_and_forget(host, call);
        None
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::clock::ManualClock;
    use crate::host::EntityState;
    use crate::host::SimulatedHost;

    fn host() -> SimulatedHost {
        let host = SimulatedHost::new(Arc::new(ManualClock::new(0)));
        host.set_entity("light.rest", EntityState::new("on"));
        host.set_entity("media_player.rest", EntityState::new("playing"));
        host
    }

    fn run(host: &SimulatedHost, actions: &ExpirationActions) -> Option<DeferredCall> {
        execute_expiration_actions(host, "light.rest", "media_player.rest", actions)
    }

    #[test]
    fn test_default_turns_light_off_only() {
        let host = host();
        assert_eq!(run(&host, &ExpirationActions::default()), None);

        let calls = host.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].to_string(), "light.turn_off");
    }

    #[test]
    fn test_stop_media_wins_over_sound_and_volume() {
        let host = host();
        let actions = ExpirationActions {
            turn_off_light: true,
            stop_media: true,
            sound_mode: Some("Ocean".to_string()),
            volume: Some(40.0),
            ..ExpirationActions::default()
        };
        assert_eq!(run(&host, &actions), None);

        let names: Vec<String> = host.calls().iter().map(|c| c.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "light.turn_off",
                "media_player.media_stop",
                "media_player.volume_set"
            ]
        );
        assert_eq!(host.calls()[2].data["volume_level"], 0);
    }

    #[test]
    fn test_sound_mode_wins_over_volume() {
        let host = host();
        let actions = ExpirationActions {
            turn_off_light: false,
            sound_mode: Some("Ocean".to_string()),
            volume: Some(40.0),
            ..ExpirationActions::default()
        };
        run(&host, &actions);

        assert_eq!(host.calls_to("media_player", "select_sound_mode").len(), 1);
        assert!(host.calls_to("media_player", "volume_set").is_empty());
    }

    #[test]
    fn test_volume_is_a_clamped_fraction() {
        let host = host();
        let actions = ExpirationActions {
            turn_off_light: false,
            volume: Some(35.0),
            ..ExpirationActions::default()
        };
        run(&host, &actions);

        let calls = host.calls_to("media_player", "volume_set");
        assert_eq!(calls[0].data["volume_level"], 0.35);
    }

    #[test]
    fn test_light_change_is_immediate_without_media_stop() {
        let host = host();
        let actions = ExpirationActions {
            turn_off_light: false,
            light_brightness: Some(10),
            light_color: Some([255, 0, 0]),
            ..ExpirationActions::default()
        };
        assert_eq!(run(&host, &actions), None);

        let calls = host.calls_to("light", "turn_on");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].data["brightness_pct"], 10);
        assert_eq!(calls[0].data["rgb_color"], json!([255, 0, 0]));
    }

    #[test]
    fn test_light_change_is_deferred_after_media_stop() {
        let host = host();
        let actions = ExpirationActions {
            turn_off_light: false,
            stop_media: true,
            light_brightness: Some(5),
            ..ExpirationActions::default()
        };
        let deferred = run(&host, &actions).unwrap();

        assert_eq!(deferred.delay_ms, LIGHT_CHANGE_DELAY_MS);
        assert_eq!(deferred.call.to_string(), "light.turn_on");
        assert!(host.calls_to("light", "turn_on").is_empty());
    }

    #[test]
    fn test_light_change_skipped_when_light_turns_off() {
        let host = host();
        let actions = ExpirationActions {
            turn_off_light: true,
            light_brightness: Some(5),
            ..ExpirationActions::default()
        };
        assert_eq!(run(&host, &actions), None);
        assert!(host.calls_to("light", "turn_on").is_empty());
    }
}
