//src/config.rs
use comfy_table::Color;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;
use thiserror::Error;
use tracing::warn;

use crate::grid::Rgb;

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_CONFIG_DIR: &str = "fitlog";
const CONFIG_ENV_VAR: &str = "FITLOG_CONFIG_DIR"; // Environment variable name

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine configuration directory.")]
    CannotDetermineConfigDir,
    #[error("I/O error accessing config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file (TOML): {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to serialize config data (TOML): {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Invalid color name: {0}")]
    InvalidColor(String),
    #[error("Athlete '{0}' is not configured. Add it with 'add-athlete'.")]
    UnknownAthlete(String),
    #[error("Athlete '{0}' is already configured.")]
    AthleteExists(String),
    #[error("Athlete name cannot be empty.")]
    EmptyAthleteName,
    #[error("User '{0}' is not allowed to use this ledger.")]
    Unauthorized(String),
}

// Define standard colors using strum for easy iteration/parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum StandardColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    DarkGrey,
    DarkRed,
    DarkGreen,
    DarkYellow,
    DarkBlue,
    DarkMagenta,
    DarkCyan,
    Grey,
    LightGrey,
}

impl StandardColor {
    /// Cell fill used when shading archived rows in this color.
    pub const fn rgb(self) -> Rgb {
        match self {
            Self::Black => Rgb::new(0x00, 0x00, 0x00),
            Self::Red => Rgb::new(0xf4, 0xcc, 0xcc),
            Self::Green => Rgb::new(0xd9, 0xea, 0xd3),
            Self::Yellow => Rgb::new(0xff, 0xf2, 0xcc),
            Self::Blue => Rgb::new(0xcf, 0xe2, 0xf3),
            Self::Magenta => Rgb::new(0xea, 0xd1, 0xdc),
            Self::Cyan => Rgb::new(0xd0, 0xe0, 0xe3),
            Self::White => Rgb::new(0xff, 0xff, 0xff),
            Self::DarkGrey => Rgb::new(0x99, 0x99, 0x99),
            Self::DarkRed => Rgb::new(0xcc, 0x00, 0x00),
            Self::DarkGreen => Rgb::new(0x38, 0x76, 0x1d),
            Self::DarkYellow => Rgb::new(0xbf, 0x90, 0x00),
            Self::DarkBlue => Rgb::new(0x0b, 0x53, 0x94),
            Self::DarkMagenta => Rgb::new(0x74, 0x1b, 0x47),
            Self::DarkCyan => Rgb::new(0x13, 0x4f, 0x5c),
            Self::Grey => Rgb::new(0xb7, 0xb7, 0xb7),
            Self::LightGrey => Rgb::new(0xd9, 0xd9, 0xd9),
        }
    }
}

// Helper to convert our enum to comfy_table::Color
impl From<StandardColor> for Color {
    fn from(value: StandardColor) -> Self {
        match value {
            StandardColor::Black => Self::Black,
            StandardColor::Red => Self::Red,
            StandardColor::Green => Self::Green,
            StandardColor::Yellow => Self::Yellow,
            StandardColor::Blue => Self::Blue,
            StandardColor::Magenta => Self::Magenta,
            StandardColor::Cyan => Self::Cyan,
            StandardColor::White => Self::White,
            StandardColor::DarkGrey => Self::DarkGrey,
            StandardColor::DarkRed => Self::DarkRed,
            StandardColor::DarkGreen => Self::DarkGreen,
            StandardColor::DarkYellow => Self::DarkYellow,
            StandardColor::DarkBlue => Self::DarkBlue,
            StandardColor::DarkMagenta => Self::DarkMagenta,
            StandardColor::DarkCyan => Self::DarkCyan,
            StandardColor::Grey | StandardColor::LightGrey => Self::Grey,
        }
    }
}

// Helper to parse a string into our StandardColor enum
pub fn parse_color(color_str: &str) -> Result<StandardColor, ConfigError> {
    for color in StandardColor::iter() {
        if format!("{color:?}").eq_ignore_ascii_case(color_str.trim()) {
            return Ok(color);
        }
    }
    Err(ConfigError::InvalidColor(color_str.to_string()))
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)] // Ensure defaults are used if fields are missing
pub struct Theme {
    pub header_color: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            header_color: "Green".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)] // Ensure defaults are used if fields are missing
pub struct Config {
    /// Account keys, one grid per athlete.
    pub athletes: Vec<String>,
    /// Usernames (without '@') allowed to drive the ledger. Nobody else is.
    pub allowed_usernames: Vec<String>,
    /// Fill for archived rows, as a `StandardColor` name.
    pub archive_color: String,
    /// Exercises still kept in the old row-block layout.
    pub legacy_exercises: Vec<String>,
    pub default_oldest_limit: usize,
    pub theme: Theme,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            athletes: Vec::new(),
            allowed_usernames: Vec::new(),
            archive_color: "LightGrey".to_string(),
            legacy_exercises: Vec::new(),
            default_oldest_limit: 3,
            theme: Theme::default(),
        }
    }
}

impl Config {
    /// The configured archive fill. Unknown color names fall back to light grey.
    pub fn archive_shade(&self) -> Rgb {
        match parse_color(&self.archive_color) {
            Ok(color) => color.rgb(),
            Err(e) => {
                warn!(error = %e, "using default archive color");
                StandardColor::LightGrey.rgb()
            }
        }
    }

    /// True only for listed usernames; an empty list lets nobody in.
    pub fn is_allowed(&self, username: &str) -> bool {
        let username = username.trim().trim_start_matches('@');
        if username.is_empty() {
            return false;
        }
        self.allowed_usernames
            .iter()
            .any(|u| u.trim().trim_start_matches('@').eq_ignore_ascii_case(username))
    }

    /// Checks a username against the allow list.
    /// # Errors
    /// `ConfigError::Unauthorized` if the user is not listed.
    pub fn authorize(&self, username: &str) -> Result<(), ConfigError> {
        if self.is_allowed(username) {
            Ok(())
        } else {
            Err(ConfigError::Unauthorized(username.to_string()))
        }
    }

    /// The configured account key matching `athlete` (case-insensitive).
    /// # Errors
    /// `ConfigError::UnknownAthlete` if it is not configured.
    pub fn resolve_athlete(&self, athlete: &str) -> Result<&str, ConfigError> {
        let wanted = athlete.trim();
        let key = wanted.to_lowercase();
        self.athletes
            .iter()
            .find(|a| a.trim().to_lowercase() == key)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::UnknownAthlete(wanted.to_string()))
    }

    /// Adds an athlete key.
    /// # Errors
    /// `ConfigError::EmptyAthleteName` or `ConfigError::AthleteExists`.
    pub fn add_athlete(&mut self, athlete: &str) -> Result<(), ConfigError> {
        let athlete = athlete.trim();
        if athlete.is_empty() {
            return Err(ConfigError::EmptyAthleteName);
        }
        if self.resolve_athlete(athlete).is_ok() {
            return Err(ConfigError::AthleteExists(athlete.to_string()));
        }
        self.athletes.push(athlete.to_string());
        Ok(())
    }
}

/// Determines the path to the configuration file.
/// Exposed at crate root as get_config_path_util
pub fn get_config_path() -> Result<PathBuf, ConfigError> {
    let config_dir_override = std::env::var(CONFIG_ENV_VAR).ok();

    let config_dir_path = if let Some(path_str) = config_dir_override {
        let path = PathBuf::from(path_str);
        if !path.is_dir() {
            warn!(
                "Environment variable {} points to '{}', which is not a directory. Trying to create it.",
                CONFIG_ENV_VAR,
                path.display()
            );
            fs::create_dir_all(&path)?;
        }
        path
    } else {
        let base_config_dir = dirs::config_dir().ok_or(ConfigError::CannotDetermineConfigDir)?;
        base_config_dir.join(APP_CONFIG_DIR)
    };

    if !config_dir_path.exists() {
        fs::create_dir_all(&config_dir_path)?;
    }

    Ok(config_dir_path.join(CONFIG_FILE_NAME))
}

/// Loads the configuration from the TOML file at the given path, writing the
/// defaults first when the file does not exist.
/// Exposed at crate root as load_config_util
pub fn load(config_path: &Path) -> Result<Config, ConfigError> {
    if config_path.exists() {
        let config_content = fs::read_to_string(config_path)?;
        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    } else {
        let default_config = Config::default();
        save(config_path, &default_config)?;
        Ok(default_config)
    }
}

/// Saves the configuration to the TOML file.
/// Exposed at crate root as save_config_util
pub fn save(config_path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent_dir) = config_path.parent() {
        if !parent_dir.exists() {
            fs::create_dir_all(parent_dir)?;
        }
    }
    let config_content = toml::to_string_pretty(config)?;
    fs::write(config_path, config_content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_color_case_insensitive() {
        assert_eq!(parse_color("lightgrey").unwrap(), StandardColor::LightGrey);
        assert_eq!(parse_color(" Blue ").unwrap(), StandardColor::Blue);
        assert!(matches!(
            parse_color("chartreuse"),
            Err(ConfigError::InvalidColor(_))
        ));
    }

    #[test]
    fn test_unknown_archive_color_falls_back() {
        let config = Config {
            archive_color: "chartreuse".to_string(),
            ..Default::default()
        };
        assert_eq!(config.archive_shade(), StandardColor::LightGrey.rgb());
    }

    #[test]
    fn test_allow_list() {
        let config = Config {
            allowed_usernames: vec!["gblsh".to_string(), "@StayTorqued".to_string()],
            ..Default::default()
        };
        assert!(config.is_allowed("@GBLSH"));
        assert!(config.is_allowed("staytorqued"));
        assert!(!config.is_allowed("someone"));
        assert!(!config.is_allowed(""));
        assert!(matches!(
            config.authorize("someone"),
            Err(ConfigError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_empty_allow_list_denies_everyone() {
        let config = Config::default();
        assert!(config.allowed_usernames.is_empty());
        assert!(!config.is_allowed("stranger"));
        assert!(config.authorize("gblsh").is_err());
    }

    #[test]
    fn test_athletes() {
        let mut config = Config::default();
        config.add_athlete("Роман Г.").unwrap();
        assert_eq!(config.resolve_athlete("роман г.").unwrap(), "Роман Г.");
        assert!(matches!(
            config.add_athlete("РОМАН Г."),
            Err(ConfigError::AthleteExists(_))
        ));
        assert!(matches!(
            config.resolve_athlete("Anna"),
            Err(ConfigError::UnknownAthlete(_))
        ));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: Config = toml::from_str("athletes = [\"anna\"]").unwrap();
        assert_eq!(config.athletes, vec!["anna"]);
        assert_eq!(config.default_oldest_limit, 3);
        assert_eq!(config.archive_color, "LightGrey");
    }
}
