//! Server management - the in-process stub or a remote deployment

use std::time::Duration;

use apiprobe_stub::{StubOptions, StubServer};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// Where scenarios send their requests
#[derive(Debug, Clone)]
pub enum Target {
    /// Spawn the stub on an ephemeral port
    Stub(StubOptions),
    /// An already running deployment
    Remote(String),
}

/// Configuration for reaching a server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub target: Target,

    /// Path polled until it answers 2xx
    pub health_path: String,

    /// Timeout for the server to become healthy
    pub startup_timeout: Duration,
}

impl ServerConfig {
    pub fn stub() -> Self {
        Self {
            target: Target::Stub(StubOptions::default()),
            health_path: "/health".to_string(),
            startup_timeout: Duration::from_secs(10),
        }
    }

    /// The remote API has no health route; the public catalog serves instead
    pub fn remote(base_url: impl Into<String>) -> Self {
        Self {
            target: Target::Remote(base_url.into()),
            health_path: "/BookStore/v1/Books".to_string(),
            startup_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::stub()
    }
}

/// Handle to a healthy server; owns the stub when one was spawned
pub struct ServerHandle {
    base_url: String,
    stub: Option<StubServer>,
}

impl ServerHandle {
    pub async fn spawn(config: ServerConfig) -> E2eResult<Self> {
        let handle = match config.target {
            Target::Stub(options) => {
                let stub = StubServer::spawn(options)
                    .await
                    .map_err(|e| E2eError::ServerStartup(format!("stub: {:#}", e)))?;
                info!("Using in-process stub at {}", stub.base_url());
                ServerHandle {
                    base_url: stub.base_url(),
                    stub: Some(stub),
                }
            }
            Target::Remote(url) => {
                info!("Using remote API at {}", url);
                ServerHandle {
                    base_url: url.trim_end_matches('/').to_string(),
                    stub: None,
                }
            }
        };

        handle
            .wait_for_healthy(&config.health_path, config.startup_timeout)
            .await?;

        info!("Server is healthy at {}", handle.base_url);
        Ok(handle)
    }

    /// Poll `health_path` until it answers with a success status
    async fn wait_for_healthy(&self, health_path: &str, timeout: Duration) -> E2eResult<()> {
        let health_url = format!("{}{}", self.base_url, health_path);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout {
            attempts += 1;

            match client.get(&health_url).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => {
                    warn!("Health check returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for server to answer...");
                    }
                    if !e.is_connect() {
                        warn!("Health check error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(100)).await;
        }

        Err(E2eError::ServerHealthCheck(attempts))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_stub(&self) -> bool {
        self.stub.is_some()
    }

    pub fn stub(&self) -> Option<&StubServer> {
        self.stub.as_ref()
    }

    /// Shut the stub down gracefully; a remote target is left alone
    pub async fn stop(self) {
        if let Some(stub) = self.stub {
            info!("Stopping stub at {}", stub.base_url());
            stub.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_target_becomes_healthy() {
        let server = ServerHandle::spawn(ServerConfig::stub()).await.unwrap();
        assert!(server.is_stub());
        assert!(server.base_url().starts_with("http://127.0.0.1:"));
        server.stop().await;
    }

    #[tokio::test]
    async fn test_unreachable_remote_fails_health_check() {
        let config = ServerConfig {
            startup_timeout: Duration::from_millis(300),
            ..ServerConfig::remote("http://127.0.0.1:1/")
        };
        let err = ServerHandle::spawn(config).await.err().unwrap();
        assert!(matches!(err, E2eError::ServerHealthCheck(n) if n >= 1));
    }
}
