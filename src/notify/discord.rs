use async_trait::async_trait;
use std::time::Duration;

use super::{ChannelError, NotifyChannel};

/// Discord (or any Discord-compatible) incoming webhook.
pub struct DiscordChannel {
    webhook_url: String,
    client: reqwest::Client,
}

impl DiscordChannel {
    pub fn new(webhook_url: impl Into<String>, timeout: Duration) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { webhook_url: webhook_url.into(), client })
    }
}

#[async_trait]
impl NotifyChannel for DiscordChannel {
    fn name(&self) -> &'static str {
        "discord"
    }

    async fn send(&self, message: &str) -> Result<(), ChannelError> {
        let payload = serde_json::json!({
            "username": "sshwatch",
            "content": message,
        });

        let response = self.client.post(&self.webhook_url).json(&payload).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(ChannelError::Status { status: status.as_u16(), body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_posts_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/webhooks/1/abc"))
            .and(body_partial_json(serde_json::json!({"content": "VM-10.0.0.5 went offline"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let channel = DiscordChannel::new(
            format!("{}/api/webhooks/1/abc", server.uri()),
            Duration::from_secs(5),
        )
        .unwrap();
        channel.send("VM-10.0.0.5 went offline").await.unwrap();
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Unknown Webhook"))
            .mount(&server)
            .await;

        let channel = DiscordChannel::new(server.uri(), Duration::from_secs(5)).unwrap();
        match channel.send("x").await {
            Err(ChannelError::Status { status, body }) => {
                assert_eq!(status, 404);
                assert_eq!(body, "Unknown Webhook");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
