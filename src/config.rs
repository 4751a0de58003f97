//! User defaults and batch config files.
//!
//! The user config lives at `<config dir>/spotify-dl/config.json` and is
//! created with defaults on first run. A batch config file (`-k`) is an
//! ordered list of download instructions; any unrecognized key or
//! wrong-typed value in it is fatal before a single download starts.

use crate::downloader::Backend;
use crate::duplicates::DuplicatePolicy;
use crate::errors::{AppError, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Mp3,
    M4a,
}

impl FileType {
    pub fn extension(&self) -> &'static str {
        match self {
            FileType::Mp3 => "mp3",
            FileType::M4a => "m4a",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub default_output_dir: PathBuf,
    pub filename_template: String,
    pub backend: Backend,
    pub file_type: FileType,
    pub duplicate_download_handling: Option<DuplicatePolicy>,
    pub retry_count: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_output_dir: dirs::download_dir()
                .unwrap_or_else(|| PathBuf::from("./downloads")),
            filename_template: crate::template::DEFAULT_TEMPLATE.to_string(),
            backend: Backend::Mirror,
            file_type: FileType::Mp3,
            duplicate_download_handling: None,
            retry_count: 0,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: AppConfig = serde_json::from_str(&content)
                .map_err(|e| AppError::InvalidConfig(format!("{}: {}", config_path.display(), e)))?;
            Ok(config)
        } else {
            let config = AppConfig::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(config_dir) = config_path.parent() {
            if !config_dir.exists() {
                std::fs::create_dir_all(config_dir)?;
            }
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            AppError::InvalidConfig("could not determine the config directory".to_string())
        })?;
        Ok(config_dir.join("spotify-dl").join("config.json"))
    }
}

/// One entry of a batch config file. `deny_unknown_fields` makes a typo a
/// validation error instead of a silently ignored key.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchEntry {
    pub url: String,
    pub output_dir: Option<PathBuf>,
    pub create_dir: Option<bool>,
    pub duplicate_download_handling: Option<DuplicatePolicy>,
    pub filename_template: Option<String>,
    pub file_type: Option<FileType>,
}

pub fn load_batch_config(path: &Path) -> Result<Vec<BatchEntry>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        AppError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
    })?;

    let entries: Vec<BatchEntry> = serde_json::from_str(&content)
        .map_err(|e| AppError::InvalidConfig(format!("{}: {}", path.display(), e)))?;

    if entries.is_empty() {
        return Err(AppError::InvalidConfig(format!(
            "{} contains no entries",
            path.display()
        )));
    }

    // Surface template problems before any network activity.
    for entry in &entries {
        if let Some(template) = &entry.filename_template {
            crate::template::validate(template)?;
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn valid_batch_config_parses() {
        let file = write_config(
            r#"[
                {
                    "url": "https://open.spotify.com/playlist/abc|1,4,15-",
                    "output_dir": "/music",
                    "create_dir": true,
                    "duplicate_download_handling": "append_number",
                    "filename_template": "{track_num} - {title}",
                    "file_type": "mp3"
                },
                { "url": "https://open.spotify.com/track/xyz" }
            ]"#,
        );

        let entries = load_batch_config(file.path()).expect("valid config");
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0].duplicate_download_handling,
            Some(DuplicatePolicy::AppendNumber)
        );
        assert_eq!(entries[0].file_type, Some(FileType::Mp3));
        assert!(entries[1].output_dir.is_none());
    }

    #[test]
    fn unknown_key_is_fatal() {
        let file = write_config(
            r#"[{ "url": "https://open.spotify.com/track/x", "retries": 3 }]"#,
        );
        let err = load_batch_config(file.path()).unwrap_err();
        assert!(matches!(err, AppError::InvalidConfig(_)));
    }

    #[test]
    fn wrong_value_type_is_fatal() {
        let file = write_config(r#"[{ "url": "https://x", "create_dir": "yes" }]"#);
        assert!(load_batch_config(file.path()).is_err());
    }

    #[test]
    fn bad_duplicate_policy_value_is_fatal() {
        let file = write_config(
            r#"[{ "url": "https://x", "duplicate_download_handling": "ask_me" }]"#,
        );
        assert!(load_batch_config(file.path()).is_err());
    }

    #[test]
    fn bad_template_in_entry_is_fatal_before_downloads() {
        let file = write_config(
            r#"[{ "url": "https://x", "filename_template": "{nope}" }]"#,
        );
        let err = load_batch_config(file.path()).unwrap_err();
        assert!(matches!(err, AppError::InvalidTemplate(_)));
    }

    #[test]
    fn empty_batch_config_is_fatal() {
        let file = write_config("[]");
        assert!(load_batch_config(file.path()).is_err());
    }

    #[test]
    fn missing_batch_config_file_is_fatal() {
        assert!(load_batch_config(Path::new("/nonexistent/batch.json")).is_err());
    }

    #[test]
    fn file_type_extensions() {
        assert_eq!(FileType::Mp3.extension(), "mp3");
        assert_eq!(FileType::M4a.extension(), "m4a");
    }
}
