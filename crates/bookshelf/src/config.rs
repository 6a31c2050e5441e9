//! Persisted settings: backend, sheets, wiki target and display options.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BookshelfError, Result};
use crate::intake::IntakeForm;
use crate::loader::{DEFAULT_CATALOG_SHEET, DEFAULT_LOAN_SHEET};
use crate::relay::RelayConfig;
use crate::table::DEFAULT_PAGE_SIZE;

/// Default auto-sync interval: one hour.
pub const DEFAULT_SYNC_INTERVAL_MS: u64 = 3_600_000;

/// File name of the settings file inside the config directory.
pub const SETTINGS_FILE: &str = "settings.json";

fn default_loan_sheet() -> String {
    DEFAULT_LOAN_SHEET.to_string()
}

fn default_catalog_sheet() -> String {
    DEFAULT_CATALOG_SHEET.to_string()
}

fn default_sync_interval() -> u64 {
    DEFAULT_SYNC_INTERVAL_MS
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// User settings. Absent keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Sheet API and notification backend URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_url: Option<String>,
    #[serde(default = "default_loan_sheet")]
    pub loan_sheet: String,
    #[serde(default = "default_catalog_sheet")]
    pub catalog_sheet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wiki_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub enable_messaging: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messenger_channel: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub auto_sync: bool,
    #[serde(default = "default_sync_interval")]
    pub sync_interval_ms: u64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub notify_on_loan: bool,
    /// Directory holding `books.csv` and `library.csv`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub intake: IntakeForm,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: None,
            loan_sheet: default_loan_sheet(),
            catalog_sheet: default_catalog_sheet(),
            wiki_id: None,
            page_id: None,
            enable_messaging: false,
            messenger_channel: None,
            auto_sync: false,
            sync_interval_ms: DEFAULT_SYNC_INTERVAL_MS,
            notify_on_loan: false,
            data_dir: default_data_dir(),
            page_size: DEFAULT_PAGE_SIZE,
            intake: IntakeForm::default(),
        }
    }
}

/// Keys accepted by [`Settings::set`].
pub const SETTING_KEYS: &[&str] = &[
    "backend_url",
    "loan_sheet",
    "catalog_sheet",
    "wiki_id",
    "page_id",
    "enable_messaging",
    "messenger_channel",
    "auto_sync",
    "sync_interval_ms",
    "notify_on_loan",
    "data_dir",
    "page_size",
    "form_url",
    "add_book_url",
];

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" | "" => Ok(false),
        other => Err(BookshelfError::Config(format!(
            "Invalid value for {}: '{}' (expected true or false)",
            key, other
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        BookshelfError::Config(format!("Invalid value for {}: '{}' (expected a number)", key, value))
    })
}

impl Settings {
    /// Default settings path in the user's config directory.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("org", "bookshelf", "bookshelf")
            .map(|d| d.config_dir().join(SETTINGS_FILE))
            .unwrap_or_else(|| PathBuf::from(".bookshelf").join(SETTINGS_FILE))
    }

    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }

        let file = File::open(path).map_err(|e| {
            BookshelfError::Persistence(format!(
                "Failed to open settings '{}': {}",
                path.display(),
                e
            ))
        })?;

        serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            BookshelfError::Persistence(format!(
                "Failed to parse settings '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Save settings to `path`, creating parent directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    BookshelfError::Persistence(format!(
                        "Failed to create directory '{}': {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let file = File::create(path).map_err(|e| {
            BookshelfError::Persistence(format!(
                "Failed to create file '{}': {}",
                path.display(),
                e
            ))
        })?;

        serde_json::to_writer_pretty(BufWriter::new(file), self).map_err(|e| {
            BookshelfError::Persistence(format!("Failed to serialize settings: {}", e))
        })?;

        debug!(path = %path.display(), "Saved settings");
        Ok(())
    }

    /// Set one value by key. String values are trimmed; an empty value
    /// clears an optional setting.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "backend_url" => self.backend_url = optional(value),
            "loan_sheet" => self.loan_sheet = optional(value).unwrap_or_else(default_loan_sheet),
            "catalog_sheet" => {
                self.catalog_sheet = optional(value).unwrap_or_else(default_catalog_sheet)
            }
            "wiki_id" => self.wiki_id = optional(value),
            "page_id" => self.page_id = optional(value),
            "enable_messaging" => self.enable_messaging = parse_bool(key, value)?,
            "messenger_channel" => self.messenger_channel = optional(value),
            "auto_sync" => self.auto_sync = parse_bool(key, value)?,
            "sync_interval_ms" => {
                let interval: u64 = parse_number(key, value)?;
                if interval == 0 {
                    return Err(BookshelfError::Config("sync_interval_ms must be positive".to_string()));
                }
                self.sync_interval_ms = interval;
            }
            "notify_on_loan" => self.notify_on_loan = parse_bool(key, value)?,
            "data_dir" => self.data_dir = optional(value).map(PathBuf::from).unwrap_or_else(default_data_dir),
            "page_size" => {
                let size: usize = parse_number(key, value)?;
                if size == 0 {
                    return Err(BookshelfError::Config("page_size must be positive".to_string()));
                }
                self.page_size = size;
            }
            "form_url" => {
                self.intake.form_url = optional(value).unwrap_or_else(|| IntakeForm::default().form_url)
            }
            "add_book_url" => {
                self.intake.add_book_url =
                    optional(value).unwrap_or_else(|| IntakeForm::default().add_book_url)
            }
            other => {
                return Err(BookshelfError::Config(format!(
                    "Unknown setting: {}. Known settings: {}",
                    other,
                    SETTING_KEYS.join(", ")
                )))
            }
        }
        Ok(())
    }

    /// Whether the notification relay has everything it needs.
    pub fn is_relay_enabled(&self) -> bool {
        self.relay_config().is_enabled()
    }

    /// Relay settings.
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            backend_url: self.backend_url.clone(),
            wiki_id: self.wiki_id.clone(),
            page_id: self.page_id.clone(),
            enable_messaging: self.enable_messaging,
            messenger_channel: self.messenger_channel.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_for_absent_keys() {
        let settings: Settings = serde_json::from_str(r#"{"wiki_id": "w1"}"#).unwrap();
        assert_eq!(settings.loan_sheet, "Books");
        assert_eq!(settings.catalog_sheet, "Library");
        assert_eq!(settings.sync_interval_ms, 3_600_000);
        assert_eq!(settings.page_size, 20);
        assert_eq!(settings.wiki_id.as_deref(), Some("w1"));
        assert_eq!(settings.intake, IntakeForm::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE);

        let mut settings = Settings::default();
        settings.set("backend_url", "  https://relay.example.com/exec ").unwrap();
        settings.set("auto_sync", "true").unwrap();
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.backend_url.as_deref(), Some("https://relay.example.com/exec"));
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempdir().unwrap();
        let loaded = Settings::load(dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Settings::load(&path), Err(BookshelfError::Persistence(_))));
    }

    #[test]
    fn test_set_validation() {
        let mut settings = Settings::default();
        assert!(settings.set("page_size", "0").is_err());
        assert!(settings.set("auto_sync", "maybe").is_err());
        assert!(settings.set("colour", "blue").is_err());

        settings.set("wiki_id", "w1").unwrap();
        settings.set("wiki_id", "   ").unwrap();
        assert!(settings.wiki_id.is_none());
    }

    #[test]
    fn test_relay_enabled() {
        let mut settings = Settings::default();
        assert!(!settings.is_relay_enabled());
        settings.set("backend_url", "https://relay.example.com/exec").unwrap();
        settings.set("wiki_id", "w1").unwrap();
        settings.set("page_id", "p1").unwrap();
        assert!(settings.is_relay_enabled());
    }
}
