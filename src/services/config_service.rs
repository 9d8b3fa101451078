use crate::models::BootstrapConfig;
use crate::utils::error::{LauncherError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Launcher settings persisted on disk.
///
/// Only bootstrap defaults are stored; credentials are never written.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LauncherSettings {
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

/// Service for managing configuration persistence
pub struct ConfigService {
    config_dir: PathBuf,
}

impl ConfigService {
    /// Create a new config service with default directory
    pub fn new() -> Result<Self> {
        let config_dir = Self::get_config_dir()?;

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
            tracing::info!("Created config directory: {:?}", config_dir);

            // Set permissions to 0700 on Unix
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let mut perms = fs::metadata(&config_dir)?.permissions();
                perms.set_mode(0o700);
                fs::set_permissions(&config_dir, perms)?;
            }
        }

        Ok(Self { config_dir })
    }

    /// Create a config service with custom directory
    pub fn with_dir(config_dir: PathBuf) -> Result<Self> {
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
        }
        Ok(Self { config_dir })
    }

    /// Get default config directory
    fn get_config_dir() -> Result<PathBuf> {
        ProjectDirs::from("dev", "remote-code-launcher", "remote-code-launcher")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or_else(|| LauncherError::ConfigError("Failed to get config directory".to_string()))
    }

    /// Get path to the launcher settings file
    fn settings_file(&self) -> PathBuf {
        self.config_dir.join("launcher.toml")
    }

    /// Load settings, falling back to built-in defaults when no file exists
    pub fn load_settings(&self) -> Result<LauncherSettings> {
        let path = self.settings_file();

        if !path.exists() {
            tracing::info!("No settings file found, using defaults");
            return Ok(LauncherSettings::default());
        }

        let content = fs::read_to_string(&path)?;
        let settings: LauncherSettings = toml::from_str(&content)
            .map_err(|e| LauncherError::ConfigError(format!("Failed to parse settings: {}", e)))?;

        tracing::info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings
    pub fn save_settings(&self, settings: &LauncherSettings) -> Result<()> {
        let content = toml::to_string_pretty(settings)
            .map_err(|e| LauncherError::ConfigError(format!("Failed to serialize settings: {}", e)))?;

        let path = self.settings_file();
        fs::write(&path, content)?;

        tracing::info!("Saved settings to {:?}", path);
        Ok(())
    }
}
