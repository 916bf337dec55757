use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "TASKS_CONFIG_PATH";
pub const DEFAULT_NOTICE_TTL_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct Palette {
    pub accent: &'static str,
    pub muted: &'static str,
    pub error: &'static str,
    pub reset: &'static str,
}

impl Palette {
    fn paint(&self, color: &str, text: &str) -> String {
        if color.is_empty() {
            text.to_string()
        } else {
            format!("{color}{text}{}", self.reset)
        }
    }

    pub fn accentize(&self, text: &str) -> String {
        self.paint(self.accent, text)
    }

    pub fn mutedize(&self, text: &str) -> String {
        self.paint(self.muted, text)
    }

    pub fn errorize(&self, text: &str) -> String {
        self.paint(self.error, text)
    }
}

pub fn palette_for_theme(theme: Option<&str>) -> Palette {
    match theme.and_then(canonical_theme_name).as_deref() {
        Some("noir") => Palette {
            accent: "\x1b[38;5;208m",
            muted: "\x1b[38;5;250m",
            error: "\x1b[38;5;196m",
            reset: "\x1b[0m",
        },
        Some("solarized") => Palette {
            accent: "\x1b[38;5;108m",
            muted: "\x1b[38;5;250m",
            error: "\x1b[38;5;160m",
            reset: "\x1b[0m",
        },
        _ => Palette {
            accent: "",
            muted: "",
            error: "",
            reset: "",
        },
    }
}

/// Lowercases and collapses separators, then folds the known aliases onto
/// `default` and `noir`. Blank input means `default`.
pub fn canonical_theme_name(raw: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    match cleaned.trim_matches('_') {
        "" | "vanilla" | "light" => Some("default".to_string()),
        "dark" | "dark_mode" | "darkmode" => Some("noir".to_string()),
        other => Some(other.to_string()),
    }
}

fn default_notice_ttl_secs() -> u64 {
    DEFAULT_NOTICE_TTL_SECS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default = "default_notice_ttl_secs")]
    pub notice_ttl_secs: u64,
    #[serde(default)]
    pub desktop_notifications: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: None,
            notice_ttl_secs: DEFAULT_NOTICE_TTL_SECS,
            desktop_notifications: false,
        }
    }
}

impl Config {
    pub fn notice_ttl(&self) -> time::Duration {
        time::Duration::seconds(i64::try_from(self.notice_ttl_secs).unwrap_or(i64::MAX))
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub theme: Option<String>,
    pub notice_ttl_secs: Option<u64>,
    pub desktop_notifications: Option<bool>,
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("tasks").join(CONFIG_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("tasks")
            .join(CONFIG_FILE_NAME))
    }
}

/// Never fails: a missing file gives defaults, an unreadable one gives
/// defaults plus the error so the caller can report it.
pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "falling back to default config");
            ConfigLoad {
                config: Config::default(),
                error: Some(err),
            }
        }
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let mut config: Config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    config.theme = config.theme.and_then(|name| canonical_theme_name(&name));
    Ok(config)
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(theme) = overrides.theme.as_deref().and_then(canonical_theme_name) {
        merged.theme = Some(theme);
    }
    if let Some(ttl) = overrides.notice_ttl_secs {
        merged.notice_ttl_secs = ttl;
    }
    if let Some(enabled) = overrides.desktop_notifications {
        merged.desktop_notifications = enabled;
    }
    merged
}
