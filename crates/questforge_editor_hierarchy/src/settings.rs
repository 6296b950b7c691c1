// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor settings.
//!
//! Settings are stored as RON next to the project. Missing fields fall back
//! to their defaults so older files keep loading.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Settings file name
pub const SETTINGS_FILE_NAME: &str = "editor_settings.ron";

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    /// File could not be read or written
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File contents are not valid settings
    #[error("Settings parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Settings could not be serialized
    #[error("Settings serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// File was written by a newer editor
    #[error("Unsupported settings version {0}")]
    UnsupportedVersion(u32),
}

/// Hierarchy panel behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchySettings {
    /// Horizontal pixels per tree level; also the X-depth step while dragging
    pub indent_width: f32,
    /// Left padding before depth 0 starts
    pub indent_offset: f32,
    /// Fraction of a row's height used by the ABOVE and BELOW drop zones
    pub zone_fraction: f32,
    /// Offset applied to the root of a duplicated subtree
    pub duplicate_offset: [f32; 3],
    /// Suffix appended to the name of a duplicated root
    pub copy_suffix: String,
}

impl Default for HierarchySettings {
    fn default() -> Self {
        Self {
            indent_width: 16.0,
            indent_offset: 0.0,
            zone_fraction: 0.25,
            duplicate_offset: [16.0, -16.0, 0.0],
            copy_suffix: "_copy".to_string(),
        }
    }
}

/// Top-level editor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Format version
    pub version: u32,
    /// Maximum undo history depth
    pub history_depth: usize,
    /// Hierarchy panel behaviour
    pub hierarchy: HierarchySettings,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            history_depth: crate::history::MAX_HISTORY,
            hierarchy: HierarchySettings::default(),
        }
    }
}

impl EditorSettings {
    /// Parse settings from RON
    pub fn from_ron(s: &str) -> Result<Self, SettingsError> {
        let settings: Self = ron::from_str(s)?;
        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(SettingsError::UnsupportedVersion(settings.version));
        }
        Ok(settings)
    }

    /// Serialize to RON format
    pub fn to_ron(&self) -> Result<String, SettingsError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Load settings from file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron(&contents)
    }

    /// Load settings, falling back to defaults if the file is missing or invalid
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => {
                tracing::info!("Loaded editor settings from {:?}", path);
                settings
            }
            Err(SettingsError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No settings at {:?}, using defaults", path);
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to load settings from {:?}: {e}; using defaults", path);
                Self::default()
            }
        }
    }

    /// Save settings to file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }
}
