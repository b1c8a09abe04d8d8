use crate::error::ConfigError;
use crate::models::config::ScannerConfig;
use crate::models::roster::PrimaryCharacter;
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_DIR: &str = "party-scanner";

/// Storage for the user's primary character. The scanner only reads it.
pub trait PreferenceStore: Send + Sync {
    fn load_primary(&self) -> Result<Option<PrimaryCharacter>, ConfigError>;

    fn save_primary(&self, primary: Option<&PrimaryCharacter>) -> Result<(), ConfigError>;
}

/// On-disk preference file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
struct Preferences {
    #[serde(default)]
    primary_character: Option<PrimaryCharacter>,
}

/// Configuration manager for scanner settings and device-local preferences
pub struct ConfigManager {
    config_dir: PathBuf,
    config_path: PathBuf,
    preferences_path: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager in the platform config directory.
    ///
    /// This will create the config directory if it doesn't exist.
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join(APP_DIR);

        let manager = Self::with_dir(config_dir);
        manager.ensure_dir()?;
        Ok(manager)
    }

    /// Create a ConfigManager rooted at an explicit directory (created lazily on save)
    pub fn with_dir(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        Self {
            config_path: config_dir.join("config.json"),
            preferences_path: config_dir.join("preferences.json"),
            config_dir,
        }
    }

    fn ensure_dir(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.config_dir).map_err(|source| ConfigError::Io {
            path: self.config_dir.display().to_string(),
            source,
        })
    }

    /// Save configuration to disk
    pub fn save(&self, config: &ScannerConfig) -> Result<(), ConfigError> {
        self.write_json(&self.config_path, config)
    }

    /// Load configuration from disk
    ///
    /// If config file doesn't exist, returns default configuration
    pub fn load(&self) -> Result<ScannerConfig, ConfigError> {
        Ok(self.read_json(&self.config_path)?.unwrap_or_default())
    }

    /// Get the config file path
    pub fn config_file_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Check if config file exists
    pub fn config_exists(&self) -> bool {
        self.config_path.exists()
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), ConfigError> {
        self.ensure_dir()?;

        // Pretty print for human readability
        let json = serde_json::to_string_pretty(value)?;

        fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        debug!(path = %path.display(), "Wrote config file");
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Ok(Some(serde_json::from_str(&content)?))
    }
}

impl PreferenceStore for ConfigManager {
    fn load_primary(&self) -> Result<Option<PrimaryCharacter>, ConfigError> {
        let preferences: Option<Preferences> = self.read_json(&self.preferences_path)?;
        Ok(preferences.and_then(|p| p.primary_character))
    }

    fn save_primary(&self, primary: Option<&PrimaryCharacter>) -> Result<(), ConfigError> {
        let mut preferences: Preferences =
            self.read_json(&self.preferences_path)?.unwrap_or_default();
        preferences.primary_character = primary.cloned();
        self.write_json(&self.preferences_path, &preferences)
    }
}

/// Preference store kept in memory, for embedders without a filesystem
#[derive(Default)]
pub struct MemoryPreferenceStore {
    primary: Mutex<Option<PrimaryCharacter>>,
}

impl MemoryPreferenceStore {
    pub fn new(primary: Option<PrimaryCharacter>) -> Self {
        Self {
            primary: Mutex::new(primary),
        }
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load_primary(&self) -> Result<Option<PrimaryCharacter>, ConfigError> {
        Ok(self.primary.lock().clone())
    }

    fn save_primary(&self, primary: Option<&PrimaryCharacter>) -> Result<(), ConfigError> {
        *self.primary.lock() = primary.cloned();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    /// Helper to create a temporary test config manager
    fn create_test_manager() -> ConfigManager {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static COUNTER: AtomicUsize = AtomicUsize::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir_name = format!("party-scanner-test-{}-{}", std::process::id(), id);
        let temp_dir = std::env::temp_dir().join(dir_name);
        let _ = fs::remove_dir_all(&temp_dir);

        ConfigManager::with_dir(temp_dir)
    }

    /// Clean up test files
    fn cleanup_test_files(manager: &ConfigManager) {
        let _ = fs::remove_dir_all(&manager.config_dir);
    }

    fn primary() -> PrimaryCharacter {
        PrimaryCharacter {
            name: "검성하나".to_string(),
            server: "시엘".to_string(),
        }
    }

    #[test]
    fn test_config_load_default_when_not_exists() {
        let manager = create_test_manager();
        assert!(!manager.config_exists());

        let config = assert_ok!(manager.load());
        assert_eq!(config, ScannerConfig::default());

        cleanup_test_files(&manager);
    }

    #[test]
    fn test_config_save_and_load() {
        let manager = create_test_manager();

        let mut config = ScannerConfig::default();
        config.lookup.max_concurrent_lookups = 2;
        config.ocr.base_url = "http://ocr.local".to_string();

        assert_ok!(manager.save(&config));
        assert!(manager.config_exists());

        let loaded = assert_ok!(manager.load());
        assert_eq!(loaded, config);

        cleanup_test_files(&manager);
    }

    #[test]
    fn test_config_invalid_json() {
        let manager = create_test_manager();
        fs::create_dir_all(&manager.config_dir).unwrap();
        fs::write(&manager.config_path, "{ not json").unwrap();

        let err = assert_err!(manager.load());
        assert!(matches!(err, ConfigError::Parse(_)));

        cleanup_test_files(&manager);
    }

    #[test]
    fn test_config_file_path() {
        let manager = create_test_manager();
        assert!(manager.config_file_path().ends_with("config.json"));
    }

    #[test]
    fn test_primary_missing_by_default() {
        let manager = create_test_manager();
        assert_eq!(assert_ok!(manager.load_primary()), None);
    }

    #[test]
    fn test_primary_round_trip() {
        let manager = create_test_manager();

        assert_ok!(manager.save_primary(Some(&primary())));
        assert_eq!(assert_ok!(manager.load_primary()), Some(primary()));

        assert_ok!(manager.save_primary(None));
        assert_eq!(assert_ok!(manager.load_primary()), None);

        cleanup_test_files(&manager);
    }

    #[test]
    fn test_primary_does_not_touch_config() {
        let manager = create_test_manager();

        assert_ok!(manager.save_primary(Some(&primary())));
        assert!(!manager.config_exists(), "Preferences live in their own file");

        cleanup_test_files(&manager);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryPreferenceStore::default();
        assert_eq!(store.load_primary().unwrap(), None);

        store.save_primary(Some(&primary())).unwrap();
        assert_eq!(store.load_primary().unwrap(), Some(primary()));
    }
}
