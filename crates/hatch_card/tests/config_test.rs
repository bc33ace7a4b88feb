use std::fs;

use hatch_card::ConfigError;
use hatch_card::WidgetFile;
use hatch_card::config::ConfigEditor;
use hatch_card::config::FieldValue;
use hatch_card::config::LogLevel;
use hatch_card::config::TimerSource;
use tempfile::TempDir;

#[test]
fn test_load_widget_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("hatch_card.toml");

    fs::write(
        &path,
        r#"
        [logging]
        level = "debug"

        [logging.overrides]
        "hatch_card::gesture" = "trace"

        [card]
        light_entity = "light.rest"
        media_player_entity = "media_player.rest"
        timer_entity = "input_text.rest_timer"
        timer_action_sound_mode = "Ocean"

        [card.double_tap_action]
        action = "call-service"
        service = "media_player.select_sound_mode"
        service_data = { sound_mode = "Rain" }
        target = { entity_id = "media_player" }
        "#,
    )
    .unwrap();

    let file = WidgetFile::from_file(&path).unwrap();
    assert_eq!(file.logging.level, LogLevel::Debug);
    assert_eq!(file.logging.directives(), "debug,hatch_card::gesture=trace");
    assert_eq!(
        file.card.timer_source().unwrap(),
        TimerSource::JsonHelper {
            entity_id: "input_text.rest_timer".to_string()
        }
    );
    assert_eq!(file.card.expiration.sound_mode.as_deref(), Some("Ocean"));
    assert!(!file.card.double_tap_action.is_none());
}

#[test]
fn test_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let err = WidgetFile::from_file(temp_dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(..)));
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn test_rejects_unsupported_timer_entity() {
    let err = WidgetFile::from_toml(
        r#"
        [card]
        light_entity = "light.rest"
        media_player_entity = "media_player.rest"
        timer_entity = "sensor.rest_timer"
        "#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { field: "timer_entity", .. }));
}

#[test]
fn test_editor_output_loads_as_card() {
    let mut editor = ConfigEditor::default();
    editor.apply("light_entity", FieldValue::Select("light.rest".to_string()));
    editor.apply(
        "media_player_entity",
        FieldValue::Select("media_player.rest".to_string()),
    );
    editor.apply("timer_presets", FieldValue::Text("5, 20, 90".to_string()));
    editor.apply("timer_action_light_color", FieldValue::Text("red".to_string()));
    editor.apply("haptic", FieldValue::Switch(true));

    assert!(!editor.config().contains_key("haptic"));

    let card = editor.to_card().unwrap();
    assert_eq!(card.presets(), vec![5, 20, 90]);
    assert_eq!(card.expiration.light_color, Some([255, 0, 0]));
}
