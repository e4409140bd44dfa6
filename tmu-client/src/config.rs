use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tmu_types::{FeedTab, Theme};

use crate::api::DEFAULT_API_URL;

/// Environment variable overriding the saved server URL
pub const SERVER_URL_ENV: &str = "TMU_SERVER_URL";

/// Server configuration stored locally
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub server_url: String,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileVisibility {
    #[default]
    Public,
    Students,
    Private,
}

impl ProfileVisibility {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "public" => Some(Self::Public),
            "students" => Some(Self::Students),
            "private" => Some(Self::Private),
            _ => None,
        }
    }
}

/// Privacy choices. Kept on this device only; the backend has no endpoint for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacySettings {
    pub show_email: bool,
    pub show_department: bool,
    pub allow_messages: bool,
    pub show_online_status: bool,
    pub profile_visibility: ProfileVisibility,
}

impl Default for PrivacySettings {
    fn default() -> Self {
        Self {
            show_email: false,
            show_department: true,
            allow_messages: true,
            show_online_status: true,
            profile_visibility: ProfileVisibility::Public,
        }
    }
}

/// User preferences stored locally
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub theme: Theme,
    pub default_tab: FeedTab,
    pub privacy: PrivacySettings,
}

/// Pick the server URL: CLI flag, then environment, then saved file, then default.
pub fn resolve_server_url(cli: Option<String>, env: Option<String>, saved: Option<&ServerConfig>) -> String {
    [cli, env, saved.map(|c| c.server_url.clone())]
        .into_iter()
        .flatten()
        .find(|url| !url.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string())
}

/// Files under `~/.tmu`
pub struct ConfigManager {
    config_dir: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        let home_dir = dirs::home_dir().context("Could not determine home directory")?;
        Self::with_dir(home_dir.join(".tmu"))
    }

    pub fn with_dir(config_dir: impl Into<PathBuf>) -> Result<Self> {
        let config_dir = config_dir.into();
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
        }
        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    fn server_config_file(&self) -> PathBuf {
        self.config_dir.join("server.json")
    }

    fn preferences_file(&self) -> PathBuf {
        self.config_dir.join("preferences.json")
    }

    fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(path).with_context(|| format!("Failed to read {}", what))?;
        let value = serde_json::from_str(&json).with_context(|| format!("Failed to parse {}", what))?;
        Ok(Some(value))
    }

    fn write_json<T: Serialize>(path: &Path, value: &T, what: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(value).with_context(|| format!("Failed to serialize {}", what))?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", what))
    }

    pub fn load_server_config(&self) -> Result<Option<ServerConfig>> {
        Self::read_json(&self.server_config_file(), "server config")
    }

    pub fn save_server_url(&self, server_url: &str) -> Result<()> {
        let config = ServerConfig {
            server_url: server_url.trim_end_matches('/').to_string(),
            last_updated: Utc::now(),
        };
        Self::write_json(&self.server_config_file(), &config, "server config")
    }

    pub fn clear_server_url(&self) -> Result<()> {
        let path = self.server_config_file();
        if path.exists() {
            fs::remove_file(&path).context("Failed to delete server config")?;
        }
        Ok(())
    }

    /// Resolve the server URL with the CLI flag and `TMU_SERVER_URL` taking precedence
    pub fn determine_server_url(&self, cli_override: Option<String>) -> Result<String> {
        let env = std::env::var(SERVER_URL_ENV).ok();
        let saved = self.load_server_config()?;
        Ok(resolve_server_url(cli_override, env, saved.as_ref()))
    }

    /// Stored preferences, or defaults when none were saved
    pub fn load_preferences(&self) -> Result<Preferences> {
        Ok(Self::read_json(&self.preferences_file(), "preferences")?.unwrap_or_default())
    }

    pub fn save_preferences(&self, prefs: &Preferences) -> Result<()> {
        Self::write_json(&self.preferences_file(), prefs, "preferences")
    }
}

/// Short label for where a URL points
pub fn server_description(url: &str) -> &'static str {
    let local = url.contains("localhost") || url.contains("127.0.0.1");
    match (url == DEFAULT_API_URL, local) {
        (true, _) => "Local Development Server (default)",
        (false, true) => "Local Development Server (custom)",
        (false, false) => "Custom Server",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn saved(url: &str) -> ServerConfig {
        ServerConfig {
            server_url: url.to_string(),
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_server_url_priority() {
        let file = saved("https://file.example/api");

        assert_eq!(
            resolve_server_url(Some("https://cli/api".into()), Some("https://env/api".into()), Some(&file)),
            "https://cli/api"
        );
        assert_eq!(
            resolve_server_url(None, Some("https://env/api".into()), Some(&file)),
            "https://env/api"
        );
        assert_eq!(resolve_server_url(None, None, Some(&file)), "https://file.example/api");
        assert_eq!(resolve_server_url(None, None, None), DEFAULT_API_URL);
    }

    #[test]
    fn test_server_config_roundtrip() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_dir(dir.path().join(".tmu")).unwrap();

        assert!(manager.load_server_config().unwrap().is_none());
        manager.save_server_url("https://times.tmu.ac/api/").unwrap();
        assert_eq!(
            manager.load_server_config().unwrap().unwrap().server_url,
            "https://times.tmu.ac/api"
        );

        manager.clear_server_url().unwrap();
        assert!(manager.load_server_config().unwrap().is_none());
    }

    #[test]
    fn test_preferences_default_and_save() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_dir(dir.path()).unwrap();

        let mut prefs = manager.load_preferences().unwrap();
        assert_eq!(prefs.theme, Theme::Light);
        assert!(prefs.privacy.show_department);

        prefs.theme = Theme::Dark;
        prefs.default_tab = FeedTab::Campus;
        prefs.privacy.profile_visibility = ProfileVisibility::Students;
        manager.save_preferences(&prefs).unwrap();

        assert_eq!(manager.load_preferences().unwrap(), prefs);
    }

    #[test]
    fn test_partial_preferences_file() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_dir(dir.path()).unwrap();
        fs::write(dir.path().join("preferences.json"), r#"{"theme":"dark"}"#).unwrap();

        let prefs = manager.load_preferences().unwrap();
        assert_eq!(prefs.theme, Theme::Dark);
        assert_eq!(prefs.default_tab, FeedTab::ForYou);
    }

    #[test]
    fn test_server_description() {
        assert_eq!(server_description(DEFAULT_API_URL), "Local Development Server (default)");
        assert_eq!(server_description("http://127.0.0.1:8080/api"), "Local Development Server (custom)");
        assert_eq!(server_description("https://times.tmu.ac/api"), "Custom Server");
    }
}
