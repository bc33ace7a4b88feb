//! Card configuration.
//!
//! The card is configured from a TOML document. Every option has a default so
//! that a bare `[card]` table with the two entity ids is a working card.

mod card;
mod color;
mod editor;
mod logging;

use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

pub use card::CardConfig;
pub use card::DEFAULT_ICON;
pub use card::DEFAULT_TIMER_PRESETS;
pub use card::ExpirationActions;
pub use card::TimerSource;
pub use color::color_from_name_or_rgb;
pub use color::color_name_for_rgb;
pub use editor::ConfigEditor;
pub use editor::FieldValue;
pub use logging::LogLevel;
pub use logging::LoggingConfig;

/// Top-level file: the card settings plus logging for the simulator binary.
#[derive(Debug, Default, Deserialize)]
pub struct WidgetFile {
    #[serde(default)]
    pub card: CardConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl WidgetFile {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().to_path_buf(), e))?;

        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let file: WidgetFile = toml::from_str(contents)?;
        file.card.check()?;
        Ok(file)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to read card settings: {0}")]
    Settings(#[source] serde_json::Error),

    #[error("Invalid value for `{field}`: {message}")]
    Invalid { field: &'static str, message: String },
}
