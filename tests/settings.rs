// Integration tests for settings persistence

use calendar_dnd::dnd::DropContext;
use calendar_dnd::models::settings::Settings;
use calendar_dnd::models::ui::ViewKind;
use calendar_dnd::services::settings::SettingsService;
use tempfile::TempDir;

#[test]
fn test_partial_file_fills_in_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.toml");
    std::fs::write(
        &path,
        "time_zone = \"Europe/Berlin\"\nslot_height_px = 32.0\ndefault_calendar_id = \"team\"\n",
    )
    .unwrap();

    let settings = SettingsService::load(&path).unwrap();
    assert_eq!(settings.time_zone, chrono_tz::Europe::Berlin);
    assert_eq!(settings.slot_height_px, 32.0);
    assert_eq!(settings.drag_threshold_px, 5.0);
    assert_eq!(settings.task_duration_minutes, 60);

    let context = DropContext::from_settings(&settings, ViewKind::Week, &["other".to_string()]);
    assert_eq!(context.calendar_id.as_deref(), Some("team"));
    assert_eq!(context.time_zone, chrono_tz::Europe::Berlin);
}

#[test]
fn test_saved_settings_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config").join("settings.toml");

    let mut settings = Settings::default();
    settings.first_visible_hour = 7;
    settings.task_day_start_hour = 13;
    settings.task_day_end_hour = 15;
    SettingsService::save(&path, &settings).unwrap();

    assert!(path.exists());
    assert_eq!(SettingsService::load(&path).unwrap(), settings);
}

#[test]
fn test_invalid_task_window_is_refused() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.toml");
    std::fs::write(&path, "task_day_start_hour = 12\ntask_day_end_hour = 11\n").unwrap();

    let err = SettingsService::load(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("task_day_end_hour"));
}

#[test]
fn test_saving_invalid_settings_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.toml");
    let settings = Settings {
        slot_height_px: 0.0,
        ..Settings::default()
    };

    assert!(SettingsService::save(&path, &settings).is_err());
    assert!(!path.exists());
}
