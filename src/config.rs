use std::fs;
use std::io;
use std::path::PathBuf;
use serde::{Deserialize, Serialize};

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Maximum wall-clock time for a single shell command, in seconds
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    /// Minimum gap between Telegram API calls per chat, in milliseconds
    #[serde(default = "default_telegram_polling_time")]
    pub telegram_polling_time: u64,
    /// Base directory for per-user workspaces (default: ~/.shellgram/sessions)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_base: Option<String>,
}

fn default_command_timeout_secs() -> u64 {
    25
}

fn default_telegram_polling_time() -> u64 {
    3000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            command_timeout_secs: default_command_timeout_secs(),
            telegram_polling_time: default_telegram_polling_time(),
            session_base: None,
        }
    }
}

impl Settings {
    /// Returns the config directory path (~/.shellgram)
    pub fn config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".shellgram"))
    }

    /// Returns the config file path (~/.shellgram/settings.json)
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("settings.json"))
    }

    /// Ensures config directory and default settings file exist
    /// Called on startup to initialize configuration
    pub fn ensure_config_exists() {
        if let Some(config_dir) = Self::config_dir() {
            if !config_dir.exists() {
                if fs::create_dir_all(&config_dir).is_ok() {
                    // Set directory permissions to user-only on Unix
                    #[cfg(unix)]
                    {
                        use std::os::unix::fs::PermissionsExt;
                        let perms = fs::Permissions::from_mode(0o700);
                        let _ = fs::set_permissions(&config_dir, perms);
                    }
                }
            }
        }

        if let Some(config_path) = Self::config_path() {
            if !config_path.exists() {
                let default_settings = Self::default();
                let _ = default_settings.save();
            }
        }
    }

    /// Loads settings from the config file, returns default if not found or invalid
    pub fn load() -> Self {
        Self::load_with_error().unwrap_or_default()
    }

    /// Loads settings from the config file with error information
    pub fn load_with_error() -> Result<Self, String> {
        Self::ensure_config_exists();

        let config_path = Self::config_path()
            .ok_or_else(|| "Could not determine config path".to_string())?;

        let content = fs::read_to_string(&config_path)
            .map_err(|e| format!("Failed to read settings file: {}", e))?;

        serde_json::from_str(&content)
            .map_err(|e| format!("Invalid JSON in settings.json: {}", e))
    }

    /// Saves settings to the config file using atomic write pattern
    pub fn save(&self) -> io::Result<()> {
        let Some(config_dir) = Self::config_dir() else {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "Could not determine config directory",
            ));
        };

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let perms = fs::Permissions::from_mode(0o700);
                let _ = fs::set_permissions(&config_dir, perms);
            }
        }

        let config_path = config_dir.join("settings.json");
        let temp_path = config_dir.join("settings.json.tmp");
        let content = serde_json::to_string_pretty(self)?;

        // Atomic write: write to temp file first, then rename
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, &config_path)?;

        Ok(())
    }

    /// Returns the workspace base directory, creating nothing.
    /// Falls back to ~/.shellgram/sessions, then a temp-dir location.
    pub fn session_base_dir(&self) -> PathBuf {
        if let Some(base) = &self.session_base {
            let path = PathBuf::from(base);
            if path.is_absolute() {
                return path;
            }
        }
        Self::config_dir()
            .map(|d| d.join("sessions"))
            .unwrap_or_else(|| std::env::temp_dir().join("shellgram_sessions"))
    }
}
