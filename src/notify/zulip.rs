//! Zulip stream messages via the REST API.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{ChannelError, NotifyChannel};
use crate::config::ZulipConfig;

pub struct ZulipChannel {
    site: String,
    email: String,
    api_key: String,
    stream: String,
    topic: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ZulipResponse {
    result: String,
    #[serde(default)]
    msg: String,
}

impl ZulipChannel {
    pub fn new(config: &ZulipConfig, timeout: Duration) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            site: config.site.trim_end_matches('/').to_string(),
            email: config.email.clone(),
            api_key: config.api_key.clone(),
            stream: config.stream.clone(),
            topic: config.topic.clone(),
            client,
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/api/v1/messages", self.site)
    }
}

#[async_trait]
impl NotifyChannel for ZulipChannel {
    fn name(&self) -> &'static str {
        "zulip"
    }

    async fn send(&self, message: &str) -> Result<(), ChannelError> {
        let form = [
            ("type", "stream"),
            ("to", self.stream.as_str()),
            ("topic", self.topic.as_str()),
            ("content", message),
        ];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.email, Some(&self.api_key))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // Zulip reports most failures as a JSON body with result="error".
        match serde_json::from_str::<ZulipResponse>(&body) {
            Ok(parsed) if parsed.result == "success" && status.is_success() => Ok(()),
            Ok(parsed) => Err(ChannelError::Rejected(if parsed.msg.is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                parsed.msg
            })),
            Err(_) => Err(ChannelError::Status { status: status.as_u16(), body }),
        }
    }
}
