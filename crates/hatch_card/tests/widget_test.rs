use std::sync::Arc;
use std::time::Duration;

use hatch_card::Action;
use hatch_card::AnchoredClock;
use hatch_card::CardConfig;
use hatch_card::CardView;
use hatch_card::Clock;
use hatch_card::EntityState;
use hatch_card::Host;
use hatch_card::HostEvent;
use hatch_card::Millis;
use hatch_card::SimulatedHost;
use hatch_card::Widget;
use hatch_card::WidgetEvent;
use hatch_card::actions::ToggleTarget;
use hatch_card::view::CardFace;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const NOW: Millis = 1_700_000_000_000;
const MINUTE: u64 = 60_000;

struct Card {
    events: mpsc::Sender<WidgetEvent>,
    view: watch::Receiver<CardView>,
    task: JoinHandle<()>,
}

impl Card {
    async fn send(&self, event: WidgetEvent) {
        self.events.send(event).await.unwrap();
    }

    async fn unmount(self) {
        self.send(WidgetEvent::Unmount).await;
        self.task.await.unwrap();
    }

    fn face(&self) -> CardFace {
        match self.view.borrow().clone() {
            CardView::Card(face) => face,
            other => panic!("expected card, got {:?}", other),
        }
    }
}

fn config() -> CardConfig {
    CardConfig {
        light_entity: "light.rest".to_string(),
        media_player_entity: "media_player.rest".to_string(),
        ..CardConfig::default()
    }
}

fn setup() -> (Arc<dyn Clock>, Arc<SimulatedHost>) {
    let clock: Arc<dyn Clock> = Arc::new(AnchoredClock::starting_at(NOW));
    let host = Arc::new(SimulatedHost::new(clock.clone()));
    host.set_entity("light.rest", EntityState::new("off").with_attribute("brightness", 0));
    host.set_entity(
        "media_player.rest",
        EntityState::new("idle")
            .with_attribute("volume_level", 0.3)
            .with_attribute("sound_mode", "Ocean"),
    );
    (clock, host)
}

fn mount(clock: &Arc<dyn Clock>, host: &Arc<SimulatedHost>, config: CardConfig) -> Card {
    let widget = Widget::new(host.clone(), clock.clone(), config).unwrap();
    let view = widget.subscribe();
    let (events, rx) = mpsc::channel(16);
    let task = tokio::spawn(widget.run(rx));
    Card { events, view, task }
}

async fn wait_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

fn call_names(host: &SimulatedHost) -> String {
    host.calls()
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[tokio::test(start_paused = true)]
async fn test_single_tap_waits_for_double_tap_window() {
    let (clock, host) = setup();
    let card = mount(&clock, &host, config());

    card.send(WidgetEvent::Press).await;
    wait_ms(100).await;
    card.send(WidgetEvent::Release).await;

    wait_ms(200).await;
    assert!(host.calls_to("light", "toggle").is_empty());

    wait_ms(100).await;
    assert_eq!(host.calls_to("light", "toggle").len(), 1);
    assert_eq!(host.vibrations(), 1);

    wait_ms(2_000).await;
    assert_eq!(host.calls_to("light", "toggle").len(), 1);
    card.unmount().await;
}

#[tokio::test(start_paused = true)]
async fn test_double_tap_suppresses_single_tap() {
    let (clock, host) = setup();
    let card = mount(
        &clock,
        &host,
        CardConfig {
            double_tap_action: Action::Toggle {
                target: ToggleTarget::MediaPlayer,
            },
            ..config()
        },
    );

    card.send(WidgetEvent::Press).await;
    wait_ms(50).await;
    card.send(WidgetEvent::Release).await;
    wait_ms(50).await;
    card.send(WidgetEvent::Press).await;
    wait_ms(50).await;
    card.send(WidgetEvent::Release).await;
    wait_ms(1_000).await;

    insta::assert_snapshot!(call_names(&host), @"media_player.media_play");
    card.unmount().await;
}

#[tokio::test(start_paused = true)]
async fn test_hold_fires_once_without_tap() {
    let (clock, host) = setup();
    let card = mount(&clock, &host, config());

    card.send(WidgetEvent::Press).await;
    wait_ms(600).await;
    assert_eq!(
        host.events(),
        vec![HostEvent::MoreInfo {
            entity_id: "light.rest".to_string()
        }]
    );

    card.send(WidgetEvent::Release).await;
    wait_ms(1_000).await;
    assert_eq!(host.events().len(), 1);
    assert!(host.calls().is_empty());
    card.unmount().await;
}

#[tokio::test(start_paused = true)]
async fn test_touch_cancel_drops_press() {
    let (clock, host) = setup();
    let card = mount(&clock, &host, config());

    card.send(WidgetEvent::Press).await;
    wait_ms(100).await;
    card.send(WidgetEvent::PressCancel).await;
    wait_ms(1_000).await;

    assert!(host.events().is_empty());
    assert!(host.calls().is_empty());
    card.unmount().await;
}

#[tokio::test(start_paused = true)]
async fn test_unmount_clears_pending_tap() {
    let (clock, host) = setup();
    let card = mount(&clock, &host, config());

    card.send(WidgetEvent::Press).await;
    wait_ms(50).await;
    card.send(WidgetEvent::Release).await;
    card.unmount().await;

    wait_ms(1_000).await;
    assert!(host.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_thirty_minute_timer_end_to_end() {
    let (clock, host) = setup();
    let mut config = config();
    config.timer_presets = vec![15, 30];
    config.expiration.stop_media = true;
    let card = mount(&clock, &host, config);

    card.send(WidgetEvent::StartTimer(30)).await;
    wait_ms(1).await;
    let face = card.face();
    assert_eq!(face.timer_remaining.as_deref(), Some("30:00"));
    assert_eq!(face.secondary_info, "Volume 30% • 30:00");

    wait_ms(15 * MINUTE).await;
    let percent = card.face().timer_percent.unwrap();
    assert!((percent - 50.0).abs() < 0.1, "percent was {}", percent);

    wait_ms(15 * MINUTE + 1_500).await;
    insta::assert_snapshot!(call_names(&host), @r"
    light.turn_off
    media_player.media_stop
    media_player.volume_set
    ");
    assert_eq!(card.face().timer_remaining, None);

    wait_ms(10_000).await;
    assert_eq!(host.calls().len(), 3);
    card.unmount().await;
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_expiry_runs_nothing() {
    let (clock, host) = setup();
    let card = mount(&clock, &host, config());

    card.send(WidgetEvent::StartTimer(1)).await;
    wait_ms(10_000).await;
    card.send(WidgetEvent::CancelTimer).await;
    card.send(WidgetEvent::CancelTimer).await;
    wait_ms(2 * MINUTE).await;

    assert!(host.calls().is_empty());
    assert_eq!(card.face().timer_remaining, None);
    card.unmount().await;
}

#[tokio::test(start_paused = true)]
async fn test_light_change_follows_media_stop() {
    let (clock, host) = setup();
    let mut config = config();
    config.expiration.turn_off_light = false;
    config.expiration.stop_media = true;
    config.expiration.light_color = Some([255, 0, 0]);
    let card = mount(&clock, &host, config);

    card.send(WidgetEvent::StartTimer(1)).await;
    wait_ms(MINUTE + 100).await;
    insta::assert_snapshot!(call_names(&host), @r"
    media_player.media_stop
    media_player.volume_set
    ");

    wait_ms(1_000).await;
    let turn_on = host.calls_to("light", "turn_on");
    assert_eq!(turn_on.len(), 1);
    assert_eq!(turn_on[0].data["rgb_color"], json!([255, 0, 0]));
    card.unmount().await;
}

#[tokio::test(start_paused = true)]
async fn test_json_helper_timer_survives_remount() {
    let (clock, host) = setup();
    host.set_entity("input_text.sleep_timer", EntityState::new(""));
    let config = CardConfig {
        timer_entity: Some("input_text.sleep_timer".to_string()),
        ..config()
    };

    let card = mount(&clock, &host, config.clone());
    card.send(WidgetEvent::StartTimer(30)).await;
    wait_ms(10_000).await;
    card.unmount().await;

    let card = mount(&clock, &host, config);
    wait_ms(1).await;
    assert_eq!(card.face().timer_remaining.as_deref(), Some("29:50"));
    card.unmount().await;
}

#[tokio::test(start_paused = true)]
async fn test_malformed_json_helper_is_ignored() {
    let (clock, host) = setup();
    host.set_entity("input_text.sleep_timer", EntityState::new("{not json"));
    let card = mount(
        &clock,
        &host,
        CardConfig {
            timer_entity: Some("input_text.sleep_timer".to_string()),
            ..config()
        },
    );

    wait_ms(5_000).await;
    assert!(host.calls().is_empty());
    assert_eq!(card.face().timer_remaining, None);
    card.unmount().await;
}

#[tokio::test(start_paused = true)]
async fn test_stale_json_payload_expires_once_on_mount() {
    let (clock, host) = setup();
    let stale = json!({ "end": NOW - 5_000, "duration": 60_000 }).to_string();
    host.set_entity("input_text.sleep_timer", EntityState::new(stale));
    let card = mount(
        &clock,
        &host,
        CardConfig {
            timer_entity: Some("input_text.sleep_timer".to_string()),
            ..config()
        },
    );

    wait_ms(5_000).await;
    insta::assert_snapshot!(call_names(&host), @r"
    input_text.set_value
    light.turn_off
    ");
    assert_eq!(
        host.entity("input_text.sleep_timer").map(|e| e.state).as_deref(),
        Some("")
    );
    card.unmount().await;
}

#[tokio::test(start_paused = true)]
async fn test_native_timer_completion() {
    let (clock, host) = setup();
    host.set_entity("timer.sleep", EntityState::new("idle"));
    let card = mount(
        &clock,
        &host,
        CardConfig {
            timer_entity: Some("timer.sleep".to_string()),
            ..config()
        },
    );

    card.send(WidgetEvent::StartTimer(2)).await;
    wait_ms(MINUTE + 100).await;
    assert_eq!(card.face().timer_remaining.as_deref(), Some("1:00"));

    wait_ms(MINUTE + 2_000).await;
    assert_eq!(host.calls_to("timer", "start").len(), 1);
    assert_eq!(host.calls_to("light", "turn_off").len(), 1);

    wait_ms(10_000).await;
    assert_eq!(host.calls_to("light", "turn_off").len(), 1);
    card.unmount().await;
}

#[tokio::test(start_paused = true)]
async fn test_controls_publish_view() {
    let (clock, host) = setup();
    let card = mount(&clock, &host, config());
    wait_ms(1).await;
    assert_eq!(card.face().volume_percent, 30);

    card.send(WidgetEvent::VolumeStep(0.05)).await;
    card.send(WidgetEvent::SetBrightness(255)).await;
    card.send(WidgetEvent::SelectSoundMode("Rain".to_string())).await;
    wait_ms(1).await;

    let face = card.face();
    assert_eq!(face.volume_percent, 35);
    assert!(face.is_on);
    assert_eq!(face.brightness_percent, 100);
    assert_eq!(face.sound_mode, "Rain");
    assert_eq!(face.icon, "mdi:weather-rainy");
    card.unmount().await;
}

#[tokio::test(start_paused = true)]
async fn test_volume_preset_button_sets_level() {
    let (clock, host) = setup();
    let card = mount(
        &clock,
        &host,
        CardConfig {
            volume_presets: Some(vec![0.1, 0.6]),
            timer_presets: vec![45],
            ..config()
        },
    );
    wait_ms(1).await;

    let face = card.face();
    assert_eq!(face.timer_presets, vec![(45, "45m".to_string())]);
    card.send(WidgetEvent::SetVolume(face.volume_presets[1])).await;
    wait_ms(1).await;

    assert_eq!(card.face().volume_percent, 60);
    card.unmount().await;
}

#[tokio::test(start_paused = true)]
async fn test_missing_entities_render_error() {
    let (clock, host) = setup();
    host.remove_entity("light.rest");
    let card = mount(&clock, &host, config());
    wait_ms(1).await;

    assert_eq!(
        *card.view.borrow(),
        CardView::Error {
            message: "Entities not found. Please check your configuration.".to_string()
        }
    );
    card.unmount().await;
}
