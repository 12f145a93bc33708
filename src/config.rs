use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:38081";

/// Polling stays sub-second.
pub const POLL_INTERVAL_MS: RangeInclusive<u64> = 1..=999;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub theme_name: String,
    pub is_transparent: bool,
    pub server_url: String,
    /// Where the browser pages live; the API server when unset.
    pub dashboard_url: Option<String>,
    pub last_env_name: Option<String>,
    pub poll_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme_name: "Default".to_string(),
            is_transparent: false,
            server_url: DEFAULT_SERVER_URL.to_string(),
            dashboard_url: None,
            last_env_name: None,
            poll_interval_ms: crate::controller::DEFAULT_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

impl Config {
    pub fn load() -> Self {
        Self::get_config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    pub fn load_from(path: &PathBuf) -> Self {
        if path.exists() {
            if let Ok(content) = fs::read_to_string(path) {
                match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config")
                    }
                }
            }
        }
        Self::default()
    }

    pub fn save(&self) {
        if let Some(config_path) = Self::get_config_path() {
            self.save_to(&config_path);
        }
    }

    pub fn save_to(&self, path: &PathBuf) {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Ok(content) = serde_json::to_string_pretty(self) {
            if let Err(e) = fs::write(path, content) {
                tracing::warn!(path = %path.display(), error = %e, "could not save config");
            }
        }
    }

    /// The list poll interval, kept within `POLL_INTERVAL_MS`.
    pub fn poll_interval(&self) -> Duration {
        let ms = self.poll_interval_ms;
        if !POLL_INTERVAL_MS.contains(&ms) {
            tracing::warn!(
                poll_interval_ms = ms,
                "poll interval out of range, clamping to {}..={} ms",
                POLL_INTERVAL_MS.start(),
                POLL_INTERVAL_MS.end()
            );
        }
        Duration::from_millis(ms.clamp(*POLL_INTERVAL_MS.start(), *POLL_INTERVAL_MS.end()))
    }

    pub fn dashboard_url(&self) -> &str {
        self.dashboard_url.as_deref().unwrap_or(&self.server_url)
    }

    fn get_config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "appdeck", "appdeck")
            .map(|proj_dirs| proj_dirs.config_dir().join("config.json"))
    }
}
