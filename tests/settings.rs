//! Settings, config and adapter selection.

use std::path::PathBuf;

use memline::adapters::extractor_from_settings;
use memline::config::Config;
use memline::ingest::transcriber_from_settings;
use memline::settings::{keys, SettingsError, SettingsProvider};
use tempfile::TempDir;
use tokio_test::block_on;

#[test]
fn test_adapters_follow_saved_settings() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("settings.json");

    block_on(async {
        let mut settings = SettingsProvider::new(&path);
        settings.initialize().await.unwrap();
        assert_eq!(extractor_from_settings(&settings).unwrap().name(), "keyword");
        assert_eq!(transcriber_from_settings(&settings).unwrap().name(), "whisper");

        settings.set_string(keys::LLM_PROVIDER, "openai").await.unwrap();
        settings.set_string(keys::STT_ENGINE, "mock").await.unwrap();
        settings
            .set_string(keys::MOCK_TRANSCRIPT, "We adopted a dog in June 2022.")
            .await
            .unwrap();

        let mut reopened = SettingsProvider::new(&path);
        reopened.initialize().await.unwrap();
        assert_eq!(extractor_from_settings(&reopened).unwrap().name(), "openai");
        assert_eq!(transcriber_from_settings(&reopened).unwrap().name(), "mock");
    });
}

#[test]
fn test_unknown_engine_is_rejected() {
    let temp = TempDir::new().unwrap();

    block_on(async {
        let mut settings = SettingsProvider::new(temp.path().join("settings.json"));
        settings.initialize().await.unwrap();
        settings.set_string(keys::STT_ENGINE, "telepathy").await.unwrap();

        assert!(matches!(
            transcriber_from_settings(&settings),
            Err(SettingsError::InvalidValue { .. })
        ));
    });
}

#[test]
fn test_remove_and_reload() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("settings.json");

    block_on(async {
        let mut settings = SettingsProvider::new(&path);
        settings.initialize().await.unwrap();
        settings.set_from_str(keys::LLM_MODEL, "llama3").await.unwrap();
        assert!(path.exists());

        assert!(settings.remove(keys::LLM_MODEL).await.unwrap());
        assert!(!settings.remove(keys::LLM_MODEL).await.unwrap());

        settings.reload().await.unwrap();
        assert_eq!(settings.get_string(keys::LLM_MODEL).unwrap(), None);
    });
}

#[test]
fn test_config_paths_under_home() {
    let temp = TempDir::new().unwrap();
    let home = temp.path().join("memline-home");

    let config = Config::load_from(temp.path(), Some(home.clone())).unwrap();
    assert_eq!(config.home, home);
    assert_eq!(config.queue_path(), home.join("queue.jsonl"));
    assert_eq!(config.database_path(), home.join("memline.db"));
    assert_eq!(config.settings_path(), home.join("settings.json"));
    assert_eq!(config.recordings, None::<PathBuf>);
    assert_eq!(config.retry.max_attempts, 3);
}
