use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::engine::avatar_cache::AvatarSettings;

/// Top-level bot configuration, loaded from estella.toml.
#[derive(Deserialize, Default)]
#[serde(default)]
pub struct BotConfig {
    pub bot: BotSection,
    pub database: DatabaseSection,
    pub avatars: AvatarSection,
    pub logging: LoggingSection,
}

#[derive(Deserialize)]
#[serde(default)]
pub struct BotSection {
    pub token: String,
    pub application_id: u64,
    pub api_base_url: String,
}

impl Default for BotSection {
    fn default() -> Self {
        Self {
            token: String::new(),
            application_id: 0,
            api_base_url: "https://discord.com/api/v10".into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: "sqlite:estella.db?mode=rwc".into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
pub struct AvatarSection {
    /// Base URL of the player head service.
    pub source_url: String,
    pub size: u32,
    pub revalidate_after_minutes: i64,
}

impl Default for AvatarSection {
    fn default() -> Self {
        Self {
            source_url: "https://crafthead.net".into(),
            size: 128,
            revalidate_after_minutes: 10,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Used when RUST_LOG is not set.
    pub filter: String,
    /// Webhook that receives background task failures.
    pub error_webhook: Option<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: "info".into(),
            error_webhook: None,
        }
    }
}

impl BotConfig {
    /// Load config from a TOML file. Falls back to defaults if the file doesn't exist.
    /// Environment variables override TOML values.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let mut config = if Path::new(path).exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {path}"))?;
            Self::from_toml(&contents)
                .with_context(|| format!("failed to parse config file {path}"))?
        } else {
            info!("No config file found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("DISCORD_TOKEN") {
            self.bot.token = v;
        }
        if let Some(v) = var("APPLICATION_ID")
            && let Ok(id) = v.parse()
        {
            self.bot.application_id = id;
        }
        if let Some(v) = var("DISCORD_API_URL") {
            self.bot.api_base_url = v;
        }
        if let Some(v) = var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(v) = var("AVATAR_SOURCE_URL") {
            self.avatars.source_url = v;
        }
        if let Some(v) = var("AVATAR_SIZE")
            && let Ok(size) = v.parse()
        {
            self.avatars.size = size;
        }
        if let Some(v) = var("AVATAR_REVALIDATE_MINUTES")
            && let Ok(minutes) = v.parse()
        {
            self.avatars.revalidate_after_minutes = minutes;
        }
        if let Some(v) = var("LOG_FUNNEL_WEBHOOK")
            && !v.is_empty()
        {
            self.logging.error_webhook = Some(v);
        }
    }

    /// Convert into the settings the avatar cache runs with.
    pub fn avatar_settings(&self) -> AvatarSettings {
        AvatarSettings {
            size: self.avatars.size,
            revalidate_after: chrono::Duration::minutes(self.avatars.revalidate_after_minutes),
        }
    }
}
