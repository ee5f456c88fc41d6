//! Centralized configuration for warezbot.
//!
//! Tunable constants live in the unit structs below. Deployment settings
//! (credentials, hosts, TLS material) come from a JSON file loaded through
//! [`Settings::load`].

use crate::{Result, WarezError};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// HTTP server timeouts and limits.
pub struct ServerConfig;

impl ServerConfig {
    pub const IDLE_TIMEOUT: Duration = Duration::from_secs(30);
    pub const READ_HEADER_TIMEOUT: Duration = Duration::from_secs(5);
    pub const WRITE_TIMEOUT: Duration = Duration::from_secs(15);
    pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(60);
    pub const MAX_BODY_BYTES: usize = 1024 * 1024;
}

/// Webhook route paths.
pub struct RouteConfig;

impl RouteConfig {
    pub const MESSAGE_EVENTS_PATH: &'static str = "/slack/events";
    pub const INTERACTION_PATH: &'static str = "/slack/actions";
    pub const MEDIA_EVENTS_PATH: &'static str = "/emby/events";
}

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
    pub const USER_AGENT: &'static str = "warezbot/0.6";
    pub const SLACK_API_BASE: &'static str = "https://slack.com/api";
}

/// Defaults applied when asking Radarr to add a movie.
pub struct RadarrConfig;

impl RadarrConfig {
    pub const QUALITY_PROFILE_ID: u32 = 3;
    pub const ROOT_FOLDER_PATH: &'static str = "/movies/";
    pub const MINIMUM_AVAILABILITY: &'static str = "announced";
    pub const SEARCH_COMMAND: &'static str = "MoviesSearch";
    /// Radarr needs a moment to register a new movie before a search command
    /// for it is accepted.
    pub const COMMAND_DELAY: Duration = Duration::from_secs(5);
}

/// Chat notification constants.
pub struct NotifyConfig;

impl NotifyConfig {
    pub const BOT_NAME: &'static str = "warezbot";
    pub const BOT_ICON_URL: &'static str = "https://i.imgur.com/s0F5TJA.jpg";
    pub const PING_IMAGE_URL: &'static str = "https://encrypted-tbn0.gstatic.com/images?q=tbn:ANd9GcQ3cSyJ752nVIUGaR4QRzf1qNfKA2XsFAtqWZ78c3xIJlFOvpqh";
    pub const IMAGE_NOT_FOUND_URL: &'static str =
        "https://www.howtogeek.com/wp-content/uploads/2018/05/2018-06-03-2.png";
    pub const MAX_MOVIE_CANDIDATES: usize = 5;
    pub const DOWNLOAD_PROMPT_CALLBACK: &'static str = "movieDownloadPrompt";
    pub const SEARCH_RESULT_CALLBACK: &'static str = "movieSearchResult";
}

/// Detached task pool sizing.
pub struct TaskConfig;

impl TaskConfig {
    pub const MAX_DETACHED_TASKS: usize = 32;
}

/// Deployment settings loaded from the JSON config file.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(rename = "loglevel", default)]
    pub log_level: String,
    pub slack: SlackSettings,
    pub emby: EmbySettings,
    pub radarr: RadarrSettings,
    #[serde(rename = "tlsconfig")]
    pub tls: TlsSettings,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(rename = "maxdetachedtasks", default = "default_max_detached_tasks")]
    pub max_detached_tasks: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackSettings {
    #[serde(rename = "bottoken")]
    pub bot_token: String,
    #[serde(rename = "botid", default)]
    pub bot_id: String,
    #[serde(rename = "channelid")]
    pub channel_id: String,
    #[serde(rename = "eventpath", default = "default_event_path")]
    pub event_path: String,
    #[serde(rename = "apiurl", default = "default_slack_api")]
    pub api_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbySettings {
    #[serde(rename = "adminid")]
    pub admin_id: String,
    pub path: String,
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RadarrSettings {
    pub path: String,
    #[serde(rename = "apikey")]
    pub api_key: String,
}

/// PEM text for the server identity and the CA pool.
#[derive(Debug, Clone, Deserialize)]
pub struct TlsSettings {
    #[serde(rename = "tlsca")]
    pub ca_pem: String,
    #[serde(rename = "tlscert")]
    pub cert_pem: String,
    #[serde(rename = "tlskey")]
    pub key_pem: String,
    #[serde(rename = "requireclientcert", default)]
    pub require_client_cert: bool,
}

/// Server timeouts in seconds; zero means "use the default".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpSettings {
    #[serde(rename = "idletimeoutsecs", default)]
    pub idle_timeout_secs: u64,
    #[serde(rename = "readheadertimeoutsecs", default)]
    pub read_header_timeout_secs: u64,
    #[serde(rename = "writetimeoutsecs", default)]
    pub write_timeout_secs: u64,
}

fn default_max_detached_tasks() -> usize {
    TaskConfig::MAX_DETACHED_TASKS
}

fn default_event_path() -> String {
    RouteConfig::MESSAGE_EVENTS_PATH.to_string()
}

fn default_slack_api() -> String {
    NetworkConfig::SLACK_API_BASE.to_string()
}

impl Settings {
    /// Read and validate the config file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| WarezError::io_with_path(e, path))?;
        Self::from_json(&raw)
    }

    /// Parse and validate settings from JSON text.
    pub fn from_json(raw: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(raw)
            .map_err(|e| WarezError::config(format!("failed to decode configs: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        let path = self.slack.event_path.as_str();
        if !path.starts_with('/') {
            return Err(WarezError::Validation {
                field: "slack.eventpath".into(),
                message: format!("route path must start with '/', got {path:?}"),
            });
        }
        if path == RouteConfig::INTERACTION_PATH || path == RouteConfig::MEDIA_EVENTS_PATH {
            return Err(WarezError::Validation {
                field: "slack.eventpath".into(),
                message: format!("{path} is already served by another webhook"),
            });
        }
        if self.max_detached_tasks == 0 {
            return Err(WarezError::Validation {
                field: "maxdetachedtasks".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"{
        "loglevel": "info",
        "slack": { "bottoken": "xoxb-1", "botid": "B1", "channelid": "C1" },
        "emby": { "adminid": "a1", "path": "emby.local", "token": "t" },
        "radarr": { "path": "radarr.local", "apikey": "k" },
        "tlsconfig": { "tlsca": "ca", "tlscert": "cert", "tlskey": "key" }
    }"#;

    #[test]
    fn test_defaults_for_optional_settings() {
        let settings = Settings::from_json(MINIMAL).unwrap();
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.slack.event_path, "/slack/events");
        assert_eq!(settings.slack.api_url, "https://slack.com/api");
        assert!(!settings.tls.require_client_cert);
        assert_eq!(settings.http.idle_timeout_secs, 0);
        assert_eq!(settings.max_detached_tasks, 32);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.slack.channel_id, "C1");
        assert_eq!(settings.radarr.api_key, "k");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, WarezError::Io { path: Some(_), .. }));
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let err = Settings::from_json("{ not json").unwrap_err();
        assert!(matches!(err, WarezError::Config { .. }));
    }

    #[test]
    fn test_event_path_must_not_collide() {
        let raw = MINIMAL.replace(
            r#""channelid": "C1""#,
            r#""channelid": "C1", "eventpath": "/emby/events""#,
        );
        let err = Settings::from_json(&raw).unwrap_err();
        assert!(matches!(err, WarezError::Validation { .. }));
    }
}
