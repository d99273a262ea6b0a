use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::modules::notifications::Permission;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { base_url: "http://127.0.0.1:5000".to_string() }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SoundConfig {
    pub path: PathBuf,
    pub player: String,
}

impl Default for SoundConfig {
    fn default() -> Self {
        let path = config_dir()
            .map(|d| d.join("taskbell").join("notification.wav"))
            .unwrap_or_else(|| PathBuf::from("notification.wav"));
        Self { path, player: default_player().to_string() }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotificationsConfig {
    pub permission: Permission,
    pub native: bool,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { permission: Permission::Default, native: true }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ConfigFile {
    pub server: ServerConfig,
    pub polling: PollingConfig,
    pub sound: SoundConfig,
    pub notifications: NotificationsConfig,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub path: PathBuf,
    pub server: ServerConfig,
    pub polling: PollingConfig,
    pub sound: SoundConfig,
    pub notifications: NotificationsConfig,
}

impl Config {
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(p) => p,
            None => config_path()?,
        };
        if !path.exists() {
            let default = ConfigFile::default();
            let toml = toml::to_string_pretty(&default)?;
            if let Some(parent) = path.parent() { fs::create_dir_all(parent)?; }
            fs::write(&path, toml)?;
        }
        let content = fs::read_to_string(&path).with_context(|| format!("Reading {:?}", &path))?;
        let cfg: ConfigFile = toml::from_str(&content).with_context(|| "Parsing config TOML")?;
        Ok(Self {
            path,
            server: cfg.server,
            polling: cfg.polling,
            sound: cfg.sound,
            notifications: cfg.notifications,
        })
    }

    fn save(&self) -> Result<()> {
        let cfg = ConfigFile {
            server: self.server.clone(),
            polling: self.polling.clone(),
            sound: self.sound.clone(),
            notifications: self.notifications.clone(),
        };
        let toml = toml::to_string_pretty(&cfg)?;
        if let Some(parent) = self.path.parent() { fs::create_dir_all(parent)?; }
        fs::write(&self.path, toml).with_context(|| format!("Writing {:?}", &self.path))?;
        Ok(())
    }

    /// Remembers the answer to the permission prompt across runs.
    pub fn set_permission(&mut self, permission: Permission) -> Result<()> {
        self.notifications.permission = permission;
        self.save()
    }

    pub fn poll_interval(&self) -> Duration {
        // A zero period would make tokio's interval panic.
        Duration::from_secs(self.polling.interval_secs.max(1))
    }
}

fn config_path() -> Result<PathBuf> {
    let base = config_dir().context("Could not determine config directory")?;
    Ok(base.join("taskbell").join("config.toml"))
}

fn default_player() -> &'static str {
    if cfg!(target_os = "macos") { "afplay" } else { "paplay" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_load_creates_default_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load(Some(path.clone())).unwrap();

        assert!(path.exists());
        assert_eq!(config.server, ServerConfig::default());
        assert_eq!(config.polling.interval_secs, 30);
        assert_eq!(config.notifications.permission, Permission::Default);
        assert!(config.notifications.native);
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server]\nbase_url = \"http://tasks.local:8080\"\n").unwrap();

        let config = Config::load(Some(path)).unwrap();

        assert_eq!(config.server.base_url, "http://tasks.local:8080");
        assert_eq!(config.polling, PollingConfig::default());
        assert_eq!(config.notifications, NotificationsConfig::default());
    }

    #[test]
    fn test_set_permission_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::load(Some(path.clone())).unwrap();
        config.set_permission(Permission::Denied).unwrap();

        let reloaded = Config::load(Some(path)).unwrap();
        assert_eq!(reloaded.notifications.permission, Permission::Denied);
    }

    #[test]
    fn test_poll_interval_never_zero() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::load(Some(dir.path().join("config.toml"))).unwrap();
        config.polling.interval_secs = 0;
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server\nbase_url = ").unwrap();
        assert!(Config::load(Some(path)).is_err());
    }
}
