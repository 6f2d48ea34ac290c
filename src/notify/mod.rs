//! Chat notifications for reachability transitions.
//!
//! Each destination implements [`NotifyChannel`]. The [`Notifier`] sends a
//! message to every configured channel and reports which ones failed; it
//! never retries.

pub mod discord;
pub mod zulip;

pub use discord::DiscordChannel;
pub use zulip::ZulipChannel;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Server rejected message: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("No notification channels configured")]
    NoChannels,

    #[error("Delivery failed on {}", describe_failures(.failed))]
    Delivery { failed: Vec<(String, ChannelError)> },
}

fn describe_failures(failed: &[(String, ChannelError)]) -> String {
    failed
        .iter()
        .map(|(name, e)| format!("{}: {}", name, e))
        .collect::<Vec<_>>()
        .join("; ")
}

#[async_trait]
pub trait NotifyChannel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, message: &str) -> Result<(), ChannelError>;
}

pub struct Notifier {
    channels: Vec<Arc<dyn NotifyChannel>>,
}

impl Notifier {
    pub fn new(channels: Vec<Arc<dyn NotifyChannel>>) -> Self {
        Self { channels }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Send `message` to every channel, attempting all of them even after a failure.
    pub async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        if self.channels.is_empty() {
            return Err(NotifyError::NoChannels);
        }

        let mut failed = Vec::new();
        for channel in &self.channels {
            match channel.send(message).await {
                Ok(()) => debug!(channel = channel.name(), "Notification sent"),
                Err(e) => {
                    error!(channel = channel.name(), error = %e, "Failed to send notification");
                    failed.push((channel.name().to_string(), e));
                }
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(NotifyError::Delivery { failed })
        }
    }
}
