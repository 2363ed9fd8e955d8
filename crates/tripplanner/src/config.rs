//! Configuration management for tripplanner.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::DEFAULT_BUDGET_TOTAL;
use crate::persistence::User;
use crate::storage::local::DEFAULT_STATE_KEY;
use crate::store::StoreSettings;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "tripplanner";

/// Default local storage file name.
const LOCAL_DATABASE_FILE_NAME: &str = "local.db";

/// Default document store file name.
const REMOTE_DATABASE_FILE_NAME: &str = "remote.db";

/// Placeholder replaced by the trip title in the cover image template.
pub const TITLE_PLACEHOLDER: &str = "{title}";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `TRIPPLANNER_`, `__` between sections)
/// 2. TOML config file at `~/.config/tripplanner/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Local mirror configuration.
    pub local: LocalConfig,
    /// Remote document store configuration.
    pub remote: RemoteConfig,
    /// Identity used when signing in.
    pub auth: AuthConfig,
    /// Defaults for new trips.
    pub trips: TripsConfig,
}

/// Local mirror configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Path to the local storage database.
    /// Defaults to `~/.local/share/tripplanner/local.db`
    pub database_path: Option<PathBuf>,
    /// Key the application state is stored under.
    pub state_key: String,
}

/// Remote document store configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Path to the document store database.
    /// Defaults to `~/.local/share/tripplanner/remote.db`
    pub database_path: Option<PathBuf>,
}

/// Identity produced by sign-in. Without a uid, sign-in fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Stable user id.
    pub uid: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Avatar URL.
    pub photo_url: Option<String>,
    /// Display name.
    pub display_name: Option<String>,
}

/// Defaults applied to new trips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripsConfig {
    /// Budget total of a new trip.
    pub default_budget: f64,
    /// Cover image URL used when none is given; `{title}` is replaced.
    pub cover_image_template: String,
    /// Show the preview trip when there are no trips.
    pub seed: bool,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            state_key: DEFAULT_STATE_KEY.to_string(),
        }
    }
}

impl Default for TripsConfig {
    fn default() -> Self {
        Self {
            default_budget: DEFAULT_BUDGET_TOTAL,
            cover_image_template: "https://picsum.photos/seed/{title}/800/400".to_string(),
            seed: true,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(Env::prefixed("TRIPPLANNER_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.local.state_key.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "local.state_key must not be empty".to_string(),
            });
        }

        let budget = self.trips.default_budget;
        if !budget.is_finite() || budget < 0.0 {
            return Err(Error::ConfigValidation {
                message: format!("trips.default_budget must be a non-negative number, got {budget}"),
            });
        }

        if !self.trips.cover_image_template.contains(TITLE_PLACEHOLDER) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "trips.cover_image_template must contain {TITLE_PLACEHOLDER}"
                ),
            });
        }

        if let Some(uid) = &self.auth.uid {
            if uid.trim().is_empty() {
                return Err(Error::ConfigValidation {
                    message: "auth.uid must not be empty when set".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Get the local storage path, resolving defaults if not set.
    #[must_use]
    pub fn local_database_path(&self) -> PathBuf {
        self.local
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(LOCAL_DATABASE_FILE_NAME))
    }

    /// Get the document store path, resolving defaults if not set.
    #[must_use]
    pub fn remote_database_path(&self) -> PathBuf {
        self.remote
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(REMOTE_DATABASE_FILE_NAME))
    }

    /// The configured sign-in identity, if a uid is set.
    #[must_use]
    pub fn identity(&self) -> Option<User> {
        self.auth.uid.as_ref().map(|uid| User {
            uid: uid.clone(),
            email: self.auth.email.clone(),
            photo_url: self.auth.photo_url.clone(),
            display_name: self.auth.display_name.clone(),
        })
    }

    /// Trip store settings derived from the `[trips]` section.
    #[must_use]
    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            default_budget: self.trips.default_budget,
            cover_image_template: self.trips.cover_image_template.clone(),
            seed: self.trips.seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.local.state_key, "us_travel_planner_v7");
        assert!(config.local.database_path.is_none());
        assert!(config.remote.database_path.is_none());
        assert!(config.auth.uid.is_none());
        assert!(config.trips.seed);
    }

    #[test]
    fn test_default_trips_config() {
        let trips = TripsConfig::default();

        assert!((trips.default_budget - 2000.0).abs() < f64::EPSILON);
        assert!(trips.cover_image_template.contains("{title}"));
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_state_key() {
        let mut config = Config::default();
        config.local.state_key = "  ".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("state_key"));
    }

    #[test]
    fn test_validate_negative_budget() {
        let mut config = Config::default();
        config.trips.default_budget = -1.0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("default_budget"));
    }

    #[test]
    fn test_validate_nan_budget() {
        let mut config = Config::default();
        config.trips.default_budget = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_template_without_placeholder() {
        let mut config = Config::default();
        config.trips.cover_image_template = "https://example.com/cover.jpg".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("cover_image_template"));
    }

    #[test]
    fn test_validate_empty_uid() {
        let mut config = Config::default();
        config.auth.uid = Some(String::new());

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("auth.uid"));
    }

    #[test]
    fn test_local_database_path_default() {
        let config = Config::default();
        let path = config.local_database_path();

        assert!(path.to_string_lossy().contains("tripplanner"));
        assert!(path.to_string_lossy().contains("local.db"));
    }

    #[test]
    fn test_remote_database_path_custom() {
        let mut config = Config::default();
        config.remote.database_path = Some(PathBuf::from("/custom/remote.db"));

        assert_eq!(
            config.remote_database_path(),
            PathBuf::from("/custom/remote.db")
        );
    }

    #[test]
    fn test_identity() {
        let mut config = Config::default();
        assert!(config.identity().is_none());

        config.auth.uid = Some("u1".to_string());
        config.auth.email = Some("me@example.com".to_string());
        let user = config.identity().unwrap();
        assert_eq!(user.uid, "u1");
        assert_eq!(user.email.as_deref(), Some("me@example.com"));
    }

    #[test]
    fn test_store_settings() {
        let mut config = Config::default();
        config.trips.default_budget = 750.0;
        config.trips.seed = false;

        let settings = config.store_settings();
        assert!((settings.default_budget - 750.0).abs() < f64::EPSILON);
        assert!(!settings.seed);
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("tripplanner"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        // Loading from a nonexistent path should work (uses defaults)
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(result.is_ok());

        let config = result.unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_trips_config_deserialize() {
        let json = r#"{"default_budget": 1500.0}"#;
        let trips: TripsConfig = serde_json::from_str(json).unwrap();
        assert!((trips.default_budget - 1500.0).abs() < f64::EPSILON);
        assert!(trips.seed);
    }

    #[test]
    fn test_config_serialize() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("state_key"));
        assert!(json.contains("cover_image_template"));
    }
}
