use chrono::{DateTime, Local};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::classifier::classify;
use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::hostname::{self, resolve_display_name, NameResolver};
use crate::models::{NotifyOutcome, RunReport, Status, Target, TransitionEvent};
use crate::notify::{DiscordChannel, NotifyChannel, Notifier, ZulipChannel};
use crate::probe::{Probe, TcpProbe};
use crate::store::{FileStatusStore, StatusStore};

pub struct Monitor {
    host: String,
    port: u16,
    prober: Box<dyn Probe>,
    store: Box<dyn StatusStore>,
    notifier: Notifier,
    resolver: Option<Box<dyn NameResolver>>,
}

impl Monitor {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        prober: Box<dyn Probe>,
        store: Box<dyn StatusStore>,
        notifier: Notifier,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            prober,
            store,
            notifier,
            resolver: None,
        }
    }

    pub fn with_resolver(mut self, resolver: Box<dyn NameResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn from_config(config: &MonitorConfig) -> Result<Self> {
        let mut channels: Vec<Arc<dyn NotifyChannel>> = Vec::new();
        if let Some(zulip) = &config.zulip {
            let channel = ZulipChannel::new(zulip, config.notify_timeout())
                .map_err(|e| MonitorError::Config(format!("Failed to set up Zulip client: {}", e)))?;
            channels.push(Arc::new(channel));
        }
        if let Some(url) = &config.discord_webhook_url {
            let channel = DiscordChannel::new(url.clone(), config.notify_timeout())
                .map_err(|e| MonitorError::Config(format!("Failed to set up Discord client: {}", e)))?;
            channels.push(Arc::new(channel));
        }
        if channels.is_empty() {
            return Err(MonitorError::Config("no notification channel configured".into()));
        }

        let mut monitor = Monitor::new(
            config.target.host.clone(),
            config.target.port,
            Box::new(TcpProbe::new(config.probe_timeout())),
            Box::new(FileStatusStore::new(config.status_file.clone())),
            Notifier::new(channels),
        );
        if let Some(display_name) = &config.display_name {
            monitor = monitor.with_resolver(hostname::from_config(display_name, config.target.port));
        }

        info!(
            host = %config.target.host,
            port = config.target.port,
            status_file = %config.status_file.display(),
            channels = monitor.notifier.channel_count(),
            "Monitor configured"
        );
        Ok(monitor)
    }

    /// One monitoring pass. Only status store failures are returned as errors.
    pub async fn run_once(&self) -> Result<RunReport> {
        let display_name = resolve_display_name(self.resolver.as_deref(), &self.host).await;
        let target = Target {
            host: self.host.clone(),
            port: self.port,
            display_name,
        };

        let probe = self.prober.probe(&target.host, target.port).await;
        let current = probe.status;
        let previous = self.store.load()?;
        let event = classify(previous, current);

        let notification = match format_message(event, &target, Local::now()) {
            None => NotifyOutcome::Skipped,
            Some(message) => {
                match event {
                    TransitionEvent::BecameUnreachable => {
                        error!(vm = %target.display_name, reason = %probe.message, "[CHANGE] {} -> {}", previous, current)
                    }
                    _ => warn!(vm = %target.display_name, "[CHANGE] {} -> {}", previous, current),
                }
                match self.notifier.notify(&message).await {
                    Ok(()) => NotifyOutcome::Sent,
                    Err(e) => {
                        error!(error = %e, "Notification failed, status will still be saved");
                        NotifyOutcome::Failed(e.to_string())
                    }
                }
            }
        };

        self.store.save(current)?;

        info!(
            vm = %target.display_name,
            address = %target.address(),
            %previous,
            %current,
            latency_ms = ?probe.latency_ms,
            "Check complete"
        );

        Ok(RunReport {
            target,
            previous,
            current,
            event,
            notification,
        })
    }

    /// Post a one-off "watching" message. Failures are logged and reported, never fatal.
    pub async fn announce_start(&self) -> NotifyOutcome {
        let target = Target {
            host: self.host.clone(),
            port: self.port,
            display_name: resolve_display_name(self.resolver.as_deref(), &self.host).await,
        };

        match self.notifier.notify(&format_start_message(&target, Local::now())).await {
            Ok(()) => {
                info!(vm = %target.display_name, "Start announcement sent");
                NotifyOutcome::Sent
            }
            Err(e) => {
                warn!(error = %e, "Start announcement failed, continuing");
                NotifyOutcome::Failed(e.to_string())
            }
        }
    }

    /// Repeat [`Monitor::run_once`] every `interval` until the future is dropped.
    pub async fn run(&self, interval: Duration) {
        info!(interval_secs = interval.as_secs(), "Watching {}:{}", self.host, self.port);
        loop {
            if let Err(e) = self.run_once().await {
                error!(error = %e, "Check failed");
            }
            tokio::time::sleep(interval).await;
        }
    }
}

/// Text posted for `event`, or `None` when nothing changed.
pub fn format_message(event: TransitionEvent, target: &Target, at: DateTime<Local>) -> Option<String> {
    let what = match event {
        TransitionEvent::None => return None,
        TransitionEvent::FirstObservation(Status::Reachable) => ("🟢", "is reachable (first check)".to_string()),
        TransitionEvent::FirstObservation(Status::Unreachable) => ("🔴", "is unreachable (first check)".to_string()),
        TransitionEvent::BecameUnreachable => ("🚨", format!("went offline: now {}", Status::Unreachable)),
        TransitionEvent::BecameReachable => ("✅", format!("is back online: now {}", Status::Reachable)),
    };

    Some(format!(
        "[{}] {} **{}** ({}) {}",
        at.format("%Y-%m-%d %H:%M:%S"),
        what.0,
        target.display_name,
        target.address(),
        what.1
    ))
}

pub fn format_start_message(target: &Target, at: DateTime<Local>) -> String {
    format!(
        "[{}] 🤖 Bot started and ready! Watching **{}** ({})",
        at.format("%Y-%m-%d %H:%M:%S"),
        target.display_name,
        target.address()
    )
}
