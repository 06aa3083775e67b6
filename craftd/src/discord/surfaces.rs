//! DiscordSurfaces - SurfaceSink over the Discord REST API

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use eyre::{Context, Result};
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::payload::{create_message, edit_message};
use crate::config::DiscordConfig;
use crate::domain::{SurfaceRef, UserId};
use crate::notify::{Card, Controls, DeliveryError, Member, SurfaceEdit, SurfaceSink};

/// Page size of the member listing; a shorter page is the last one
const MEMBER_PAGE_LIMIT: usize = 1000;

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GuildMember {
    user: Option<GuildUser>,
    #[serde(default)]
    roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GuildUser {
    id: String,
    #[serde(default)]
    bot: bool,
}

/// Renders surfaces as Discord messages
pub struct DiscordSurfaces {
    http: Client,
    api_base: String,
    token: String,
    guild_id: String,
    craft_role_id: String,
    log_channel_id: String,
    /// DM channel per user, opened lazily
    dm_channels: Mutex<HashMap<UserId, String>>,
}

impl DiscordSurfaces {
    /// Create the adapter from configuration and a bot token
    pub fn from_config(config: &DiscordConfig, token: impl Into<String>) -> Result<Self> {
        debug!(api_base = %config.api_base, "from_config: called");
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: token.into(),
            guild_id: config.guild_id.clone(),
            craft_role_id: config.craft_role_id.clone(),
            log_channel_id: config.log_channel_id.clone(),
            dm_channels: Mutex::new(HashMap::new()),
        })
    }

    /// Send one request; 403 means the recipient is unreachable
    async fn call(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, DeliveryError> {
        let url = format!("{}{}", self.api_base, path);
        debug!(%method, %url, "call: called");

        let mut request = self
            .http
            .request(method, &url)
            .header("Authorization", format!("Bot {}", self.token));
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DeliveryError::Fatal(format!("{}: {}", url, e)))?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            let detail = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Unavailable(format!("{} returned 403: {}", url, detail)));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Fatal(format!("{} returned {}: {}", url, status, detail)));
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| DeliveryError::Fatal(format!("{}: invalid response body: {}", url, e)))
    }

    fn cached_dm_channel(&self, user: &UserId) -> Option<String> {
        self.dm_channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(user)
            .cloned()
    }

    async fn dm_channel(&self, user: &UserId) -> Result<String, DeliveryError> {
        if let Some(channel) = self.cached_dm_channel(user) {
            return Ok(channel);
        }

        let value = self
            .call(Method::POST, "/users/@me/channels", Some(json!({ "recipient_id": user.as_str() })))
            .await?;
        let channel = parse_created(value)?;

        self.dm_channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(user.clone(), channel.clone());
        Ok(channel)
    }

    async fn post(&self, channel_id: &str, card: &Card, controls: &Controls) -> Result<SurfaceRef, DeliveryError> {
        let path = format!("/channels/{}/messages", channel_id);
        let value = self
            .call(Method::POST, &path, Some(create_message(card, controls)))
            .await?;
        let message_id = parse_created(value)?;
        Ok(SurfaceRef::new(channel_id, message_id))
    }
}

fn parse_created(value: Value) -> Result<String, DeliveryError> {
    serde_json::from_value::<Created>(value)
        .map(|c| c.id)
        .map_err(|e| DeliveryError::Fatal(format!("response without id: {}", e)))
}

#[async_trait]
impl SurfaceSink for DiscordSurfaces {
    async fn post_log(&self, card: &Card) -> Result<SurfaceRef, DeliveryError> {
        self.post(&self.log_channel_id, card, &Controls::None).await
    }

    async fn send_direct(&self, user: &UserId, card: &Card, controls: &Controls) -> Result<SurfaceRef, DeliveryError> {
        let channel = self.dm_channel(user).await?;
        self.post(&channel, card, controls).await
    }

    async fn post_channel(
        &self,
        channel_id: &str,
        card: &Card,
        controls: &Controls,
    ) -> Result<SurfaceRef, DeliveryError> {
        self.post(channel_id, card, controls).await
    }

    async fn edit(&self, surface: &SurfaceRef, edit: &SurfaceEdit) -> Result<(), DeliveryError> {
        let path = format!("/channels/{}/messages/{}", surface.channel_id, surface.message_id);
        self.call(Method::PATCH, &path, Some(edit_message(edit))).await?;
        Ok(())
    }

    async fn eligible_fulfillers(&self) -> Result<Vec<Member>, DeliveryError> {
        let mut crafters = Vec::new();
        let mut after = "0".to_string();

        loop {
            let path = format!(
                "/guilds/{}/members?limit={}&after={}",
                self.guild_id, MEMBER_PAGE_LIMIT, after
            );
            let value = self.call(Method::GET, &path, None).await?;
            let page: Vec<GuildMember> = serde_json::from_value(value)
                .map_err(|e| DeliveryError::Fatal(format!("invalid member list: {}", e)))?;

            let full = page.len() >= MEMBER_PAGE_LIMIT;
            let last = page.iter().rev().find_map(|m| m.user.as_ref()).map(|u| u.id.clone());
            debug!(%after, size = page.len(), "eligible_fulfillers: fetched member page");

            crafters.extend(
                page.into_iter()
                    .filter(|m| m.roles.iter().any(|r| r == &self.craft_role_id))
                    .filter_map(|m| m.user)
                    .map(|u| Member {
                        user: UserId::from(u.id),
                        bot: u.bot,
                    }),
            );

            match (full, last) {
                (true, Some(last)) => after = last,
                _ => break,
            }
        }

        debug!(count = crafters.len(), "eligible_fulfillers: listed role members");
        Ok(crafters)
    }
}
