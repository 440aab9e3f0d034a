use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::PushConfig;

/// Outbound push channel. Implementations may fail; callers decide whether
/// that matters.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(&self, token: &str, title: &str, body: &str, data: &Value) -> anyhow::Result<()>;
}

#[derive(Debug, Serialize)]
struct ExpoMessage<'a> {
    to: &'a str,
    sound: &'static str,
    title: &'a str,
    body: &'a str,
    data: &'a Value,
    priority: &'static str,
}

#[derive(Debug, Deserialize)]
struct ExpoTicket {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExpoResponse {
    data: Option<ExpoTicket>,
}

/// Expo push service client.
#[derive(Clone, Debug)]
pub struct ExpoPush {
    http: Client,
    endpoint: String,
}

impl ExpoPush {
    pub fn new(cfg: &PushConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("build push http client")?;
        Ok(Self {
            http,
            endpoint: cfg.endpoint.clone(),
        })
    }
}

#[async_trait]
impl PushTransport for ExpoPush {
    async fn send(&self, token: &str, title: &str, body: &str, data: &Value) -> anyhow::Result<()> {
        let msg = ExpoMessage {
            to: token,
            sound: "default",
            title,
            body,
            data,
            priority: "high",
        };
        let resp: ExpoResponse = self
            .http
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&msg)
            .send()
            .await
            .context("expo push request")?
            .error_for_status()
            .context("expo push status")?
            .json()
            .await
            .context("expo push response body")?;

        match resp.data {
            Some(ticket) if ticket.status == "ok" => {
                debug!(title, "push accepted");
                Ok(())
            }
            Some(ticket) => anyhow::bail!(
                "push rejected: {} {}",
                ticket.status,
                ticket.message.unwrap_or_default()
            ),
            None => anyhow::bail!("push response carried no ticket"),
        }
    }
}
