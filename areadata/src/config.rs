//! Configuration file handling.
//!
//! Settings live in `~/.areadata/config.ini`:
//!
//! ```ini
//! [figshare]
//! base_url = https://api.figshare.com/v2
//! token_file = areadata-token.txt
//! article_id = 16587311
//!
//! [upload]
//! parallel = 1
//! max_attempts = 4
//! timeout_secs = 300
//! relist_after_delete = false
//! ```
//!
//! Missing keys fall back to defaults. CLI arguments override file values.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use crate::api::endpoints::DEFAULT_BASE_URL;
use crate::api::{Credential, DEFAULT_TIMEOUT_SECS};
use crate::upload::DEFAULT_MAX_ATTEMPTS;

/// Environment variable checked before the token file.
pub const TOKEN_ENV_VAR: &str = "AREADATA_TOKEN";

/// Token file used when none is configured (relative to the working directory).
pub const DEFAULT_TOKEN_FILE: &str = "areadata-token.txt";

const CONFIG_DIR_NAME: &str = ".areadata";
const CONFIG_FILE_NAME: &str = "config.ini";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    #[error("failed to write config file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid value '{value}' for [{section}] {key}: {reason}")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("no API token: set AREADATA_TOKEN or create {}", path.display())]
    MissingToken { path: PathBuf },
}

/// `[figshare]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FigshareSettings {
    pub base_url: String,
    pub token_file: PathBuf,
    /// Default article for commands that take `--article`.
    pub article_id: Option<u64>,
}

impl Default for FigshareSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
            article_id: None,
        }
    }
}

/// `[upload]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSettings {
    /// Concurrent part transfers per file (1 = sequential).
    pub parallel: usize,
    pub max_attempts: u32,
    pub timeout_secs: u64,
    pub relist_after_delete: bool,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            parallel: 1,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            relist_after_delete: false,
        }
    }
}

/// Parsed contents of `config.ini`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub figshare: FigshareSettings,
    pub upload: UploadSettings,
}

impl ConfigFile {
    /// Load from the default location, or defaults if the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_file_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("figshare")) {
            if let Some(v) = non_empty(section.get("base_url")) {
                config.figshare.base_url = v.trim_end_matches('/').to_string();
            }
            if let Some(v) = non_empty(section.get("token_file")) {
                config.figshare.token_file = expand_tilde(v);
            }
            if let Some(v) = non_empty(section.get("article_id")) {
                config.figshare.article_id = Some(parse("figshare", "article_id", v)?);
            }
        }

        if let Some(section) = ini.section(Some("upload")) {
            if let Some(v) = non_empty(section.get("parallel")) {
                let parallel: usize = parse("upload", "parallel", v)?;
                if parallel == 0 {
                    return Err(ConfigError::InvalidValue {
                        section: "upload",
                        key: "parallel",
                        value: v.to_string(),
                        reason: "must be at least 1".to_string(),
                    });
                }
                config.upload.parallel = parallel;
            }
            if let Some(v) = non_empty(section.get("max_attempts")) {
                config.upload.max_attempts = parse("upload", "max_attempts", v)?;
            }
            if let Some(v) = non_empty(section.get("timeout_secs")) {
                config.upload.timeout_secs = parse("upload", "timeout_secs", v)?;
            }
            if let Some(v) = non_empty(section.get("relist_after_delete")) {
                config.upload.relist_after_delete = parse_bool("upload", "relist_after_delete", v)?;
            }
        }

        Ok(config)
    }

    /// Save to the default location, creating the directory if needed.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let mut ini = Ini::new();
        ini.with_section(Some("figshare"))
            .set("base_url", self.figshare.base_url.as_str())
            .set("token_file", self.figshare.token_file.to_string_lossy())
            .set(
                "article_id",
                self.figshare
                    .article_id
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
            );
        ini.with_section(Some("upload"))
            .set("parallel", self.upload.parallel.to_string())
            .set("max_attempts", self.upload.max_attempts.to_string())
            .set("timeout_secs", self.upload.timeout_secs.to_string())
            .set(
                "relist_after_delete",
                self.upload.relist_after_delete.to_string(),
            );

        ini.write_to_file(path).map_err(write_err)
    }

    /// Resolve the API token: the environment variable first, then the token
    /// file with surrounding whitespace stripped.
    pub fn resolve_token(&self) -> Result<Credential, ConfigError> {
        if let Ok(token) = env::var(TOKEN_ENV_VAR) {
            let credential = Credential::new(token);
            if !credential.is_empty() {
                return Ok(credential);
            }
        }
        read_token_file(&self.figshare.token_file)
    }
}

/// Read a token from `path`.
pub fn read_token_file(path: &Path) -> Result<Credential, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|_| ConfigError::MissingToken {
        path: path.to_path_buf(),
    })?;
    let credential = Credential::new(contents);
    if credential.is_empty() {
        return Err(ConfigError::MissingToken {
            path: path.to_path_buf(),
        });
    }
    Ok(credential)
}

/// Directory holding the configuration file (`~/.areadata`).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Full path of the configuration file.
pub fn config_file_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn expand_tilde(value: &str) -> PathBuf {
    match value.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(value)),
        None => PathBuf::from(value),
    }
}

fn parse<T>(section: &'static str, key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        section,
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_bool(section: &'static str, key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            section,
            key,
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}
