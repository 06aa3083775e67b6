//! craftd configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding `discord.craft-role-id`
pub const CRAFT_ROLE_ID_ENV: &str = "CRAFT_ROLE_ID";

/// Environment variable overriding `discord.log-channel-id`
pub const LOG_CHANNEL_ID_ENV: &str = "LOG_CHANNEL_ID";

/// Environment variable overriding `discord.guild-id`
pub const GUILD_ID_ENV: &str = "GUILD_ID";

/// Main craftd configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Discord connection and server ids
    pub discord: DiscordConfig,

    /// Daemon socket
    pub ipc: IpcConfig,

    /// Log level (trace, debug, info, warn, error)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that the token variable and the server ids are set.
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        self.validate_with(|key| std::env::var(key).ok())
    }

    /// Validate against an explicit environment lookup
    pub fn validate_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if lookup(&self.discord.token_env).is_none_or(|token| token.trim().is_empty()) {
            return Err(eyre::eyre!(
                "Discord bot token not found. Set the {} environment variable.",
                self.discord.token_env
            ));
        }
        for (key, value) in [
            ("guild-id", &self.discord.guild_id),
            ("craft-role-id", &self.discord.craft_role_id),
            ("log-channel-id", &self.discord.log_channel_id),
        ] {
            if value.trim().is_empty() {
                return Err(eyre::eyre!("discord.{} is not configured", key));
            }
        }
        Ok(())
    }

    /// Override server ids from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_with(|key| std::env::var(key).ok());
    }

    /// Override server ids from an explicit environment lookup
    pub fn apply_env_overrides_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for (key, target) in [
            (CRAFT_ROLE_ID_ENV, &mut self.discord.craft_role_id),
            (LOG_CHANNEL_ID_ENV, &mut self.discord.log_channel_id),
            (GUILD_ID_ENV, &mut self.discord.guild_id),
        ] {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                tracing::debug!(%key, "apply_env_overrides: override from environment");
                *target = value.trim().to_string();
            }
        }
    }

    /// Read the bot token from the configured environment variable
    pub fn token(&self) -> Result<String> {
        std::env::var(&self.discord.token_env)
            .context(format!("Failed to read {} from the environment", self.discord.token_env))
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::load_file(config_path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn load_file(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .craftd.yml
        let local_config = PathBuf::from(".craftd.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/craftd/craftd.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("craftd").join("craftd.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    ///
    /// Errors are swallowed; a broken config is reported again by `load`.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates: Vec<PathBuf> = match config_path {
            Some(path) => vec![path.clone()],
            None => {
                let mut paths = vec![PathBuf::from(".craftd.yml")];
                if let Some(config_dir) = dirs::config_dir() {
                    paths.push(config_dir.join("craftd").join("craftd.yml"));
                }
                paths
            }
        };

        candidates
            .iter()
            .filter(|p| p.exists())
            .find_map(|p| fs::read_to_string(p).ok())
            .and_then(|content| serde_yaml::from_str::<Self>(&content).ok())
            .and_then(|config| config.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Discord configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Environment variable containing the bot token
    #[serde(rename = "token-env")]
    pub token_env: String,

    /// REST API base URL
    #[serde(rename = "api-base")]
    pub api_base: String,

    /// Server the crafter role lives in
    #[serde(rename = "guild-id")]
    pub guild_id: String,

    /// Role whose members are invited to claim requests
    #[serde(rename = "craft-role-id")]
    pub craft_role_id: String,

    /// Audit log channel
    #[serde(rename = "log-channel-id")]
    pub log_channel_id: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token_env: "DISCORD_TOKEN".to_string(),
            api_base: "https://discord.com/api/v10".to_string(),
            guild_id: String::new(),
            craft_role_id: String::new(),
            log_channel_id: String::new(),
            timeout_ms: 10_000,
        }
    }
}

/// IPC configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IpcConfig {
    /// Socket path; defaults to the runtime dir
    #[serde(rename = "socket-path")]
    pub socket_path: Option<PathBuf>,
}

impl IpcConfig {
    /// Configured socket path, or the default one
    pub fn resolved_socket_path(&self) -> PathBuf {
        self.socket_path.clone().unwrap_or_else(crate::ipc::get_socket_path)
    }
}
