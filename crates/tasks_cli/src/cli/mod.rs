use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new task
    ///
    /// Example: tasks add "Buy milk" "2%"
    Add {
        title: Option<String>,
        description: Option<String>,
    },
    /// Mark a task as completed
    ///
    /// Example: tasks done 1
    Done { id: i64 },
    /// List open tasks
    ///
    /// Example: tasks list
    List,
    /// Show active notices
    Notices,
    /// Dismiss a notice by key
    ///
    /// Example: tasks dismiss 1766221200000000000
    Dismiss { key: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverride {
    Theme(String),
    NoticeTtlSecs(u64),
    DesktopNotifications(bool),
}

/// Parse a raw `KEY=VALUE` override string into a typed value.
pub fn parse_config_override(raw: &str) -> Result<ConfigOverride, String> {
    let (key_raw, value_raw) = raw
        .trim()
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;
    let value = value_raw.trim();

    let field =
        canonicalize_flag_name(key_raw).ok_or_else(|| "override key cannot be empty".to_string())?;

    match field.as_str() {
        "theme" => Ok(ConfigOverride::Theme(value.to_string())),
        "notice_ttl_secs" | "notice_ttl" => value
            .parse::<u64>()
            .map(ConfigOverride::NoticeTtlSecs)
            .map_err(|_| format!("notice_ttl_secs must be a whole number, got '{value}'")),
        "desktop_notifications" => parse_bool(value)
            .map(ConfigOverride::DesktopNotifications)
            .ok_or_else(|| format!("desktop_notifications must be true or false, got '{value}'")),
        other => Err(format!("unknown config field '{other}'")),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
