use std::env;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

use crate::ingest::extract::ocr::DEFAULT_OCR_LANGUAGE;
use crate::ingest::validation::{GRADE_LEVEL_RANGE, MAX_WORDS_RANGE};

/// Summary length requested when the caller does not provide one.
pub const DEFAULT_MAX_WORDS: u32 = 1000;
/// Reading grade level requested when the caller does not provide one.
pub const DEFAULT_GRADE_LEVEL: u32 = 8;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// Environment variable parsed but fell outside its accepted range.
    #[error("Value out of range for environment variable: {0}")]
    OutOfRange(String),
}

/// Runtime configuration for the docprep server and CLI.
#[derive(Debug, Clone)]
pub struct Config {
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Tesseract language used by the OCR fallback.
    pub ocr_language: String,
    /// Optional directory holding Tesseract traineddata files.
    pub tessdata_dir: Option<String>,
    /// Summary length forwarded downstream when a request omits `maxWords`.
    pub default_max_words: u32,
    /// Grade level forwarded downstream when a request omits `gradeLevel`.
    pub default_grade_level: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: None,
            ocr_language: DEFAULT_OCR_LANGUAGE.to_string(),
            tessdata_dir: None,
            default_max_words: DEFAULT_MAX_WORDS,
            default_grade_level: DEFAULT_GRADE_LEVEL,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let optional = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let default_max_words = parse_optional(
            optional("DOCPREP_DEFAULT_MAX_WORDS"),
            "DOCPREP_DEFAULT_MAX_WORDS",
        )?
        .unwrap_or(defaults.default_max_words);
        if !MAX_WORDS_RANGE.contains(&default_max_words) {
            return Err(ConfigError::OutOfRange("DOCPREP_DEFAULT_MAX_WORDS".into()));
        }
        let default_grade_level = parse_optional(
            optional("DOCPREP_DEFAULT_GRADE_LEVEL"),
            "DOCPREP_DEFAULT_GRADE_LEVEL",
        )?
        .unwrap_or(defaults.default_grade_level);
        if !GRADE_LEVEL_RANGE.contains(&default_grade_level) {
            return Err(ConfigError::OutOfRange("DOCPREP_DEFAULT_GRADE_LEVEL".into()));
        }

        Ok(Self {
            server_port: parse_optional(optional("DOCPREP_SERVER_PORT"), "DOCPREP_SERVER_PORT")?,
            ocr_language: optional("DOCPREP_OCR_LANGUAGE").unwrap_or(defaults.ocr_language),
            tessdata_dir: optional("DOCPREP_TESSDATA_DIR"),
            default_max_words,
            default_grade_level,
        })
    }
}

fn parse_optional<T: FromStr>(value: Option<String>, key: &str) -> Result<Option<T>, ConfigError> {
    value
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        server_port = ?config.server_port,
        ocr_language = %config.ocr_language,
        tessdata_dir = ?config.tessdata_dir,
        default_max_words = config.default_max_words,
        default_grade_level = config.default_grade_level,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
