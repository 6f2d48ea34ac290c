//! Display-name lookup for the monitored host.
//!
//! Lookups are best effort. Any failure ends in the `VM-<host>` fallback
//! rather than an error, so a broken lookup never stops a run.

use async_trait::async_trait;
use hickory_resolver::config::ResolverConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::TokioResolver;
use ssh2::Session;
use std::io::Read;
use std::net::{IpAddr, TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::DisplayNameConfig;
use crate::models::fallback_display_name;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("lookup timed out after {0}ms")]
    Timeout(u128),

    #[error("SSH error: {0}")]
    Ssh(#[from] ssh2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DNS lookup failed: {0}")]
    Dns(String),

    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn resolve(&self, host: &str) -> Result<String, LookupError>;
}

/// Resolve the display name, falling back to `VM-<host>` on any failure.
pub async fn resolve_display_name(resolver: Option<&dyn NameResolver>, host: &str) -> String {
    let Some(resolver) = resolver else {
        return fallback_display_name(host);
    };

    match resolver.resolve(host).await {
        Ok(name) if !name.trim().is_empty() => {
            debug!(host, name = %name, "Display name resolved");
            name.trim().to_string()
        }
        Ok(_) => {
            warn!(host, "Display name lookup returned nothing, using fallback");
            fallback_display_name(host)
        }
        Err(e) => {
            warn!(host, error = %e, "Display name lookup failed, using fallback");
            fallback_display_name(host)
        }
    }
}

/// Build the resolver selected in the configuration.
pub fn from_config(config: &DisplayNameConfig, ssh_port: u16) -> Box<dyn NameResolver> {
    match config {
        DisplayNameConfig::Ssh { username, password, private_key, timeout_ms } => {
            let auth = match (private_key, password) {
                (Some(path), passphrase) => SshAuth::KeyFile { path: path.clone(), passphrase: passphrase.clone() },
                (None, password) => SshAuth::Password(password.clone().unwrap_or_default()),
            };
            Box::new(SshHostnameResolver::new(
                ssh_port,
                username.clone(),
                auth,
                Duration::from_millis(*timeout_ms),
            ))
        }
        DisplayNameConfig::ReverseDns { timeout_ms } => {
            Box::new(ReverseDnsResolver::new(Duration::from_millis(*timeout_ms)))
        }
        DisplayNameConfig::Static { name } => Box::new(StaticName(name.clone())),
    }
}

pub struct StaticName(pub String);

#[async_trait]
impl NameResolver for StaticName {
    async fn resolve(&self, _host: &str) -> Result<String, LookupError> {
        Ok(self.0.clone())
    }
}

#[derive(Clone)]
pub enum SshAuth {
    Password(String),
    /// With a key configured, the password (if any) unlocks the key.
    KeyFile { path: PathBuf, passphrase: Option<String> },
}

/// Logs in over SSH and asks the host for its own `hostname`.
pub struct SshHostnameResolver {
    port: u16,
    username: String,
    auth: SshAuth,
    timeout: Duration,
}

impl SshHostnameResolver {
    pub fn new(port: u16, username: String, auth: SshAuth, timeout: Duration) -> Self {
        Self { port, username, auth, timeout }
    }
}

#[async_trait]
impl NameResolver for SshHostnameResolver {
    async fn resolve(&self, host: &str) -> Result<String, LookupError> {
        let host = host.to_string();
        let port = self.port;
        let username = self.username.clone();
        let auth = self.auth.clone();
        let timeout = self.timeout;

        // libssh2 is blocking; its own timeout stops the worker even if we give up first.
        let task = tokio::task::spawn_blocking(move || {
            ssh_hostname(&host, port, &username, &auth, timeout)
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(LookupError::Other(format!("SSH lookup task failed: {}", e))),
            Err(_) => Err(LookupError::Timeout(self.timeout.as_millis())),
        }
    }
}

fn ssh_hostname(
    host: &str,
    port: u16,
    username: &str,
    auth: &SshAuth,
    timeout: Duration,
) -> Result<String, LookupError> {
    let addr = (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| LookupError::Other(format!("{} did not resolve to an address", host)))?;
    let tcp = TcpStream::connect_timeout(&addr, timeout)?;

    let mut session = Session::new()?;
    session.set_tcp_stream(tcp);
    session.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
    session.handshake()?;

    match auth {
        SshAuth::Password(password) => session.userauth_password(username, password)?,
        SshAuth::KeyFile { path, passphrase } => {
            session.userauth_pubkey_file(username, None, path, passphrase.as_deref())?
        }
    }
    if !session.authenticated() {
        return Err(LookupError::Other(format!("authentication rejected for {}", username)));
    }

    let mut channel = session.channel_session()?;
    channel.exec("hostname")?;
    let mut output = String::new();
    channel.read_to_string(&mut output)?;
    channel.wait_close()?;

    let name = output.trim();
    if name.is_empty() {
        return Err(LookupError::Other("remote hostname was empty".into()));
    }
    Ok(name.to_string())
}

/// PTR lookup for IP targets. Named targets are already readable and are returned as-is.
pub struct ReverseDnsResolver {
    timeout: Duration,
}

impl ReverseDnsResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn resolver() -> TokioResolver {
        match TokioResolver::builder_tokio() {
            Ok(builder) => builder.build(),
            Err(e) => {
                debug!(error = %e, "System resolver config unavailable, using Cloudflare");
                TokioResolver::builder_with_config(
                    ResolverConfig::cloudflare(),
                    TokioConnectionProvider::default(),
                )
                .build()
            }
        }
    }
}

#[async_trait]
impl NameResolver for ReverseDnsResolver {
    async fn resolve(&self, host: &str) -> Result<String, LookupError> {
        let Ok(ip) = host.parse::<IpAddr>() else {
            return Ok(host.to_string());
        };

        let resolver = Self::resolver();
        let lookup = tokio::time::timeout(self.timeout, resolver.reverse_lookup(ip))
            .await
            .map_err(|_| LookupError::Timeout(self.timeout.as_millis()))?
            .map_err(|e| LookupError::Dns(e.to_string()))?;

        lookup
            .iter()
            .next()
            .map(|name| name.to_string().trim_end_matches('.').to_string())
            .ok_or_else(|| LookupError::Dns(format!("no PTR record for {}", ip)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    #[async_trait]
    impl NameResolver for Failing {
        async fn resolve(&self, _host: &str) -> Result<String, LookupError> {
            Err(LookupError::Other("permission denied".into()))
        }
    }

    #[tokio::test]
    async fn test_failure_falls_back() {
        let name = resolve_display_name(Some(&Failing), "203.0.113.7").await;
        assert_eq!(name, "VM-203.0.113.7");
    }

    #[tokio::test]
    async fn test_no_resolver_uses_fallback() {
        assert_eq!(resolve_display_name(None, "10.0.0.5").await, "VM-10.0.0.5");
    }

    #[tokio::test]
    async fn test_blank_name_falls_back() {
        let resolver = StaticName("  \n".into());
        assert_eq!(resolve_display_name(Some(&resolver), "10.0.0.5").await, "VM-10.0.0.5");
    }

    #[tokio::test]
    async fn test_static_name_is_trimmed() {
        let resolver = StaticName("build-vm-01\n".into());
        assert_eq!(resolve_display_name(Some(&resolver), "10.0.0.5").await, "build-vm-01");
    }

    #[tokio::test]
    async fn test_reverse_dns_keeps_hostnames() {
        let resolver = ReverseDnsResolver::new(Duration::from_secs(1));
        assert_eq!(resolver.resolve("vm1.internal").await.unwrap(), "vm1.internal");
    }

    #[tokio::test]
    async fn test_ssh_lookup_against_closed_port_fails() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let resolver = SshHostnameResolver::new(
            port,
            "admin".into(),
            SshAuth::Password("hunter2".into()),
            Duration::from_secs(2),
        );
        assert!(resolver.resolve("127.0.0.1").await.is_err());
        assert_eq!(resolve_display_name(Some(&resolver), "127.0.0.1").await, "VM-127.0.0.1");
    }

    #[tokio::test]
    async fn test_ssh_lookup_gives_up_at_timeout() {
        let resolver = SshHostnameResolver::new(
            22,
            "admin".into(),
            SshAuth::Password("hunter2".into()),
            Duration::from_millis(300),
        );
        let start = std::time::Instant::now();
        let name = resolve_display_name(Some(&resolver), "203.0.113.7").await;

        assert_eq!(name, "VM-203.0.113.7");
        assert!(start.elapsed() < Duration::from_secs(3));
    }
}
