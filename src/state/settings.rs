/// Catalog settings
///
/// These are the knobs the browsing UI exposes: whether to recurse into
/// subfolders, which filter group is active, and the thumbnail box.
/// Settings are serialized to JSON so a shell can persist them between
/// sessions.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SettingsError;
use crate::scan::FileExtensionGroup;

const APP_DIR: &str = "media-catalog";
const SETTINGS_FILE: &str = "settings.json";

/// Schema file name inside a catalog directory
pub const CATALOG_FILE: &str = "catalog.sqlite";

/// Thumbnail box and encoding quality
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct ThumbnailSettings {
    /// Target box width in pixels
    pub width: u32,
    /// Target box height in pixels
    pub height: u32,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for ThumbnailSettings {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            jpeg_quality: 85,
        }
    }
}

/// Everything the engine needs besides the catalog itself
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CatalogSettings {
    /// Scan subfolders (true) or only the chosen folder's files (false)
    pub recursive: bool,
    /// Filter group used for the id list reported after each pass
    pub active_group: FileExtensionGroup,
    pub thumbnail: ThumbnailSettings,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            recursive: true,
            active_group: FileExtensionGroup::All,
            thumbnail: ThumbnailSettings::default(),
        }
    }
}

impl CatalogSettings {
    /// Load settings from a JSON file; a missing file gives the defaults
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&json).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save settings as pretty-printed JSON, creating parent folders
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let io_error = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(io_error)
    }

    /// Where settings live by default
    /// - Linux: ~/.config/media-catalog/settings.json
    /// - macOS: ~/Library/Application Support/media-catalog/settings.json
    /// - Windows: %APPDATA%\media-catalog\settings.json
    pub fn default_path() -> Result<PathBuf, SettingsError> {
        let mut path = dirs::config_dir()
            .or_else(dirs::home_dir)
            .ok_or(SettingsError::NoConfigDir)?;
        path.push(APP_DIR);
        path.push(SETTINGS_FILE);
        Ok(path)
    }
}

/// Default catalog directory (schema file + thumbnails) under the user data dir
pub fn default_catalog_dir() -> Option<PathBuf> {
    let mut path = dirs::data_dir().or_else(dirs::home_dir)?;
    path.push(APP_DIR);
    Some(path)
}
