use serde::Deserialize;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub camera: CameraConfig,
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    pub url: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_quality")]
    pub quality: u32,
    #[serde(default = "default_fps")]
    pub fps: f64,
    #[serde(default = "default_ideal_width")]
    pub ideal_width: u32,
    #[serde(default = "default_ideal_height")]
    pub ideal_height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default)]
    pub auto_send: bool,
    #[serde(default = "default_auto_send_interval")]
    pub auto_send_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_export_dir")]
    pub dir: String,
    #[serde(default)]
    pub share_command: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            auto_send: false,
            auto_send_interval_ms: default_auto_send_interval(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: default_export_dir(),
            share_command: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(config)
    }
}

impl TelegramConfig {
    /// Environment variables take precedence over the config file so the bot
    /// credential never has to live in a checked-in TOML.
    pub fn resolve_secrets(&mut self) -> Result<(), ConfigError> {
        if let Ok(token) = std::env::var("LOVELENS_BOT_TOKEN") {
            info!("using bot token from LOVELENS_BOT_TOKEN");
            self.bot_token = token;
        }
        if let Ok(chat_id) = std::env::var("LOVELENS_CHAT_ID") {
            info!("using chat id from LOVELENS_CHAT_ID");
            self.chat_id = chat_id;
        }
        if self.bot_token.is_empty() {
            return Err(ConfigError::MissingSecret("bot_token / LOVELENS_BOT_TOKEN"));
        }
        if self.chat_id.is_empty() {
            return Err(ConfigError::MissingSecret("chat_id / LOVELENS_CHAT_ID"));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("missing required secret: {0}")]
    MissingSecret(&'static str),
}

// Default value functions
fn default_mode() -> String {
    "mjpeg".into()
}
fn default_quality() -> u32 {
    80
}
fn default_fps() -> f64 {
    10.0
}
fn default_ideal_width() -> u32 {
    1080
}
fn default_ideal_height() -> u32 {
    1080
}
fn default_api_base() -> String {
    "https://api.telegram.org".into()
}
fn default_filter() -> String {
    "none".into()
}
fn default_auto_send_interval() -> u64 {
    5000
}
fn default_export_dir() -> String {
    "./photos".into()
}
fn default_log_level() -> String {
    "info".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let toml = r#"
            [camera]
            url = "http://192.168.1.10:8080/stream"

            [telegram]
            bot_token = "123:abc"
            chat_id = "42"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.camera.mode, "mjpeg");
        assert_eq!(config.camera.quality, 80);
        assert_eq!(config.camera.ideal_width, 1080);
        assert_eq!(config.camera.ideal_height, 1080);
        assert_eq!(config.telegram.api_base, "https://api.telegram.org");
        assert_eq!(config.capture.filter, "none");
        assert!(!config.capture.auto_send);
        assert_eq!(config.capture.auto_send_interval_ms, 5000);
        assert_eq!(config.export.dir, "./photos");
        assert!(config.export.share_command.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn missing_camera_section_is_a_parse_error() {
        let toml = r#"
            [telegram]
            bot_token = "123:abc"
            chat_id = "42"
        "#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }
}
