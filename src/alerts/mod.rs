use async_trait::async_trait;
use eyre::{eyre, Result, WrapErr};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::AlertsConfig;
use crate::events::{ChainEvent, ContractKind};
use crate::handlers::EventHandler;
use crate::labels::{label, title, EventLabel};

#[derive(Debug, Serialize)]
struct DiscordEmbed {
    title: String,
    description: String,
    color: u32,
    fields: Vec<EmbedField>,
}

#[derive(Debug, Serialize)]
struct EmbedField {
    name: String,
    value: String,
    inline: bool,
}

#[derive(Debug, Serialize)]
struct DiscordPayload {
    content: Option<String>,
    embeds: Vec<DiscordEmbed>,
}

/// Posts a labelled embed to a Discord-style webhook for every event.
///
/// Identical notifications (same heading and label) are posted at most once
/// per cooldown; a suppressed or unconfigured post passes the previous
/// result through.
pub struct WebhookHandler {
    client: Client,
    config: AlertsConfig,
    chain_id: String,
    last_alerts: Mutex<HashMap<String, Instant>>,
    cooldown: Duration,
}

impl WebhookHandler {
    pub fn new(config: AlertsConfig, chain_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            config,
            chain_id: chain_id.into(),
            last_alerts: Mutex::new(HashMap::new()),
            cooldown: Duration::from_secs(60),
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Marks `key` as sent unless it was sent within the cooldown. Expired
    /// keys are forgotten on every call.
    async fn claim(&self, key: String) -> bool {
        let mut history = self.last_alerts.lock().await;
        history.retain(|_, sent| sent.elapsed() < self.cooldown);
        if history.contains_key(&key) {
            return false;
        }
        history.insert(key, Instant::now());
        true
    }

    fn payload(&self, event: &ChainEvent, label: &EventLabel) -> DiscordPayload {
        let kind = event.data.kind();
        let color = match kind.contract() {
            ContractKind::Token => 0x3498DB,
            ContractKind::Governance => 0x2ECC71,
            ContractKind::Timelock => 0xE67E22,
        };

        let mut fields = vec![
            EmbedField {
                name: "Event".to_string(),
                value: title(kind).title.to_string(),
                inline: true,
            },
            EmbedField {
                name: "Block".to_string(),
                value: event.block_number.to_string(),
                inline: true,
            },
        ];
        if let Some(link) = &label.link_url {
            fields.push(EmbedField {
                name: "Link".to_string(),
                value: link.clone(),
                inline: false,
            });
        }

        DiscordPayload {
            content: None,
            embeds: vec![DiscordEmbed {
                title: label.heading.clone(),
                description: label.label.clone(),
                color,
                fields,
            }],
        }
    }
}

#[async_trait]
impl EventHandler for WebhookHandler {
    async fn handle(&self, event: &ChainEvent, previous: Option<Value>) -> Result<Option<Value>> {
        if self.config.webhook_url.is_empty() {
            return Ok(previous);
        }

        let label = label(Some(&self.chain_id), &event.data);
        if !self.claim(format!("{}:{}", label.heading, label.label)).await {
            warn!("Alert suppressed (Rate Limit): {}", label.label);
            return Ok(previous);
        }

        let response = self
            .client
            .post(&self.config.webhook_url)
            .json(&self.payload(event, &label))
            .send()
            .await
            .wrap_err("Failed to send webhook alert")?;
        if !response.status().is_success() {
            return Err(eyre!("Webhook rejected alert with status {}", response.status()));
        }

        info!("Webhook alert sent: {}", label.heading);
        Ok(Some(Value::String(label.heading)))
    }
}
