//! Config manager for loading, saving, and atomic updates.
//!
//! Key features:
//! - Atomic writes (write to temp file, then rename)
//! - Section-level updates (only modified section is changed)
//! - Validation on load (rejects values the engine cannot run with)
//! - Preserves comments and formatting with toml_edit

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item};

use super::settings::{ConfigSection, Settings};

/// Errors that can occur during config operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Failed to parse config for editing: {0}")]
    EditParseError(#[from] toml_edit::TomlError),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid config: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Manages application configuration.
///
/// Handles loading, saving, and atomic section-level updates.
pub struct ConfigManager {
    /// Path to the config file.
    config_path: PathBuf,
    /// Current settings loaded in memory.
    settings: Settings,
}

impl ConfigManager {
    /// Create a new config manager with the given config file path.
    ///
    /// Does not load the config - call `load()` or `load_or_create()` after.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    /// Get the config file path.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Get a reference to the current settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get a mutable reference to the current settings.
    ///
    /// Changes made here are only in memory until `save()` or
    /// `update_section()` is called.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Consume the manager, keeping only the settings.
    pub fn into_settings(self) -> Settings {
        self.settings
    }

    /// Load config from file.
    ///
    /// Returns error if file doesn't exist or holds invalid values.
    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }

        let content = fs::read_to_string(&self.config_path)?;
        self.settings = parse_and_validate(&content)?;
        Ok(())
    }

    /// Load config from file, creating with defaults if it doesn't exist.
    ///
    /// Unknown sections are dropped and missing defaults are written back.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)?;
            let (settings, was_modified) = parse_validate_and_clean(&content)?;
            self.settings = settings;

            if was_modified {
                tracing::debug!(
                    "Rewriting config {} with defaults filled in",
                    self.config_path.display()
                );
                self.save()?;
            }
        } else {
            self.settings = Settings::default();
            self.save()?;
        }
        Ok(())
    }

    /// Ensure all configured directories exist.
    pub fn ensure_dirs_exist(&self) -> ConfigResult<()> {
        let paths = &self.settings.paths;
        let dirs = [
            &paths.work_folder,
            &paths.output_folder,
            &paths.logs_folder,
            &paths.cache_folder,
        ];

        for dir in dirs {
            let path = PathBuf::from(dir);
            if !path.exists() {
                fs::create_dir_all(&path)?;
            }
        }

        Ok(())
    }

    /// Save the entire config atomically.
    pub fn save(&self) -> ConfigResult<()> {
        let content = self.generate_config_with_comments()?;
        self.atomic_write(&content)?;
        Ok(())
    }

    /// Update a specific section atomically.
    ///
    /// Re-reads the file from disk, replaces only the specified table and
    /// writes back atomically, leaving other sections (and their comments)
    /// untouched.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        let current_content = if self.config_path.exists() {
            fs::read_to_string(&self.config_path)?
        } else {
            String::new()
        };

        let mut doc: DocumentMut = if current_content.is_empty() {
            DocumentMut::new()
        } else {
            current_content.parse()?
        };

        let section_doc: DocumentMut = self.section_toml(section)?.parse()?;
        let section_table = section_doc.as_table().clone();

        doc[section.table_name()] = Item::Table(section_table);

        self.atomic_write(&doc.to_string())?;

        Ok(())
    }

    /// Serialize one section's body (without its table header).
    fn section_toml(&self, section: ConfigSection) -> ConfigResult<String> {
        let s = &self.settings;
        let body = match section {
            ConfigSection::Paths => toml::to_string_pretty(&s.paths)?,
            ConfigSection::Logging => toml::to_string_pretty(&s.logging)?,
            ConfigSection::Synthesis => toml::to_string_pretty(&s.synthesis)?,
            ConfigSection::Cache => toml::to_string_pretty(&s.cache)?,
            ConfigSection::Timeline => toml::to_string_pretty(&s.timeline)?,
            ConfigSection::Script => toml::to_string_pretty(&s.script)?,
        };
        Ok(body)
    }

    /// Generate config content with a comment above every section.
    fn generate_config_with_comments(&self) -> ConfigResult<String> {
        let mut output = String::new();

        output.push_str("# Narration Sync Configuration\n");
        output.push_str(
            "# This file is auto-generated. Comments may be preserved on section updates.\n",
        );

        for section in ConfigSection::ALL {
            output.push('\n');
            output.push_str(section.comment());
            output.push('\n');
            output.push_str(&format!("[{}]\n", section.table_name()));
            for line in self.section_toml(section)?.lines() {
                output.push_str(line);
                output.push('\n');
            }
        }

        Ok(output)
    }

    /// Write content to config file atomically.
    fn atomic_write(&self, content: &str) -> io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Temp file in same directory so the rename stays on one filesystem
        let temp_path = self.config_path.with_extension("toml.tmp");

        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }

        fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }
}

/// Parse and validate config content.
fn parse_and_validate(content: &str) -> ConfigResult<Settings> {
    let settings: Settings = toml::from_str(content)?;
    let problems = settings.validate();
    if !problems.is_empty() {
        return Err(ConfigError::Invalid(problems));
    }
    Ok(settings)
}

/// Parse, validate, and check whether the file needs rewriting.
///
/// Returns the settings and whether any modifications were made.
fn parse_validate_and_clean(content: &str) -> ConfigResult<(Settings, bool)> {
    let doc: DocumentMut = content.parse()?;
    let settings = parse_and_validate(content)?;

    let has_unknown = doc.iter().any(|(key, _)| {
        !ConfigSection::ALL
            .iter()
            .any(|section| section.table_name() == key)
    });

    // A section missing entirely means defaults were applied
    let has_missing = ConfigSection::ALL
        .iter()
        .any(|section| !doc.contains_key(section.table_name()));

    Ok((settings, has_unknown || has_missing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn load_or_create_creates_default() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(".config").join("narsync.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        assert!(config_path.exists());
        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[paths]"));
        assert!(content.contains("[synthesis]"));
        assert!(content.contains("[timeline]"));
        assert!(content.contains("# Slide/narration reconciliation"));
    }

    #[test]
    fn generated_file_loads_back() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("narsync.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        let mut reloaded = ConfigManager::new(&config_path);
        reloaded.load().unwrap();
        assert_eq!(reloaded.settings().synthesis.workers, 4);
        assert_eq!(reloaded.settings().cache.max_entries, 512);
    }

    #[test]
    fn load_or_create_preserves_existing() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("narsync.toml");

        fs::write(&config_path, "[synthesis]\nworkers = 6\n").unwrap();

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        assert_eq!(manager.settings().synthesis.workers, 6);
        // Missing sections were written back
        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[cache]"));
        assert!(content.contains("workers = 6"));
    }

    #[test]
    fn load_rejects_invalid_values() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("narsync.toml");
        fs::write(&config_path, "[synthesis]\nworkers = 0\n").unwrap();

        let mut manager = ConfigManager::new(&config_path);
        let err = manager.load().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("workers"));
    }

    #[test]
    fn update_section_only_changes_target() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("narsync.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        manager.settings_mut().synthesis.workers = 2;
        manager.settings_mut().timeline.min_frame_secs = 9.0;

        manager.update_section(ConfigSection::Synthesis).unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("workers = 2"));
        // Timeline was changed in memory only, not written
        assert!(content.contains("min_frame_secs = 1.0"));
        assert!(content.contains("[paths]"));
    }

    #[test]
    fn atomic_write_creates_no_temp_on_success() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("narsync.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        let temp_path = config_path.with_extension("toml.tmp");
        assert!(!temp_path.exists());
    }
}
