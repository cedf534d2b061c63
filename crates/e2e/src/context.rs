//! Per-scenario fixture: a client plus the identities the scenario owns
//!
//! Every scenario gets its own context and every account it creates through
//! the context is deleted on teardown. Teardown failures are recorded on the
//! shared [`CleanupLedger`] and never fail the scenario.

use std::sync::Arc;

use apiprobe_client::{CleanupLedger, DomainClient};
use apiprobe_common::{payload, Credentials, ProbeConfig};
use tracing::debug;

use crate::error::{E2eError, E2eResult};

/// What the runner provisions before a scenario starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixture {
    /// No account
    Anonymous,
    /// A fresh account, no token yet
    Account,
    /// A fresh account and a bearer token for it
    Authorized,
}

/// An account created for one scenario
#[derive(Debug, Clone)]
pub struct Identity {
    pub credentials: Credentials,
    pub user_id: String,
    pub token: Option<String>,
}

impl Identity {
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

pub struct ScenarioContext {
    pub client: DomainClient,
    pub config: Arc<ProbeConfig>,
    ledger: Arc<CleanupLedger>,
    primary: Option<Identity>,
    owned: Vec<Identity>,
}

impl ScenarioContext {
    pub fn new(client: DomainClient, config: Arc<ProbeConfig>, ledger: Arc<CleanupLedger>) -> Self {
        Self {
            client,
            config,
            ledger,
            primary: None,
            owned: Vec::new(),
        }
    }

    /// Build a context and provision what `fixture` asks for
    pub async fn provision(
        client: DomainClient,
        config: Arc<ProbeConfig>,
        ledger: Arc<CleanupLedger>,
        fixture: Fixture,
    ) -> E2eResult<Self> {
        let mut ctx = Self::new(client, config, ledger);
        let provisioned = match fixture {
            Fixture::Anonymous => Ok(None),
            Fixture::Account => ctx.create_identity(false).await.map(Some),
            Fixture::Authorized => ctx.create_identity(true).await.map(Some),
        };
        match provisioned {
            Ok(identity) => {
                ctx.primary = identity;
                Ok(ctx)
            }
            Err(e) => {
                // The account may exist even though token issuance failed
                ctx.teardown().await;
                Err(e)
            }
        }
    }

    /// The provisioned account
    pub fn identity(&self) -> E2eResult<&Identity> {
        self.primary
            .as_ref()
            .ok_or_else(|| E2eError::AssertionFailed("scenario has no provisioned account".into()))
    }

    pub fn user_id(&self) -> E2eResult<&str> {
        Ok(&self.identity()?.user_id)
    }

    pub fn token(&self) -> E2eResult<&str> {
        self.identity()?
            .token()
            .ok_or_else(|| E2eError::AssertionFailed("provisioned account has no token".into()))
    }

    /// Create another account with unique credentials, owned by this context
    pub async fn create_identity(&mut self, authorize: bool) -> E2eResult<Identity> {
        let credentials = payload::unique_credentials();
        let created = self.client.create_account(&credentials).await?;
        let mut identity = Identity {
            credentials,
            user_id: created.user_id,
            token: None,
        };
        self.adopt(identity.clone());

        if authorize {
            identity.token = self.authorize(&identity.credentials).await?;
            if let Some(owned) = self.owned.iter_mut().find(|i| i.user_id == identity.user_id) {
                owned.token = identity.token.clone();
            }
        }

        debug!("provisioned {}", identity.user_id);
        Ok(identity)
    }

    async fn authorize(&self, credentials: &Credentials) -> E2eResult<Option<String>> {
        let token = self.client.issue_token(credentials).await?;
        match token.bearer() {
            Some(bearer) => Ok(Some(bearer.to_string())),
            None => Err(E2eError::AssertionFailed(format!(
                "token issuance for a fresh account returned {}: {}",
                token.status, token.result
            ))),
        }
    }

    /// Take ownership of an account created outside the context
    pub fn adopt(&mut self, identity: Identity) {
        self.owned.push(identity);
    }

    /// The scenario deleted this account itself; skip it on teardown
    pub fn forget(&mut self, user_id: &str) {
        self.owned.retain(|i| i.user_id != user_id);
    }

    /// Best-effort deletion of every owned account
    pub async fn teardown(self) {
        for identity in &self.owned {
            let what = format!("delete account {}", identity.user_id);
            let token = match &identity.token {
                Some(token) => Some(token.clone()),
                None => match self.client.issue_token(&identity.credentials).await {
                    Ok(envelope) => envelope.bearer().map(str::to_string),
                    Err(e) => {
                        self.ledger.record::<()>(&what, Err(e));
                        continue;
                    }
                },
            };
            let result = self
                .client
                .delete_account(&identity.user_id, token.as_deref())
                .await;
            self.ledger.record(&what, result);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use apiprobe_stub::{StubOptions, StubServer};

    use super::*;
    use crate::testing::ScriptedServer;

    async fn setup() -> (StubServer, DomainClient, Arc<CleanupLedger>) {
        let server = StubServer::spawn(StubOptions::default()).await.unwrap();
        let client = DomainClient::new(&server.base_url(), Duration::from_secs(5)).unwrap();
        (server, client, Arc::new(CleanupLedger::new()))
    }

    #[tokio::test]
    async fn test_authorized_fixture_is_torn_down() {
        let (server, client, ledger) = setup().await;
        let ctx = ScenarioContext::provision(
            client,
            Arc::new(ProbeConfig::default()),
            ledger.clone(),
            Fixture::Authorized,
        )
        .await
        .unwrap();

        assert!(!ctx.token().unwrap().is_empty());
        assert_eq!(server.user_count().await, 1);

        ctx.teardown().await;
        assert_eq!(server.user_count().await, 0);
        let stats = ledger.stats();
        assert_eq!((stats.attempted, stats.failed), (1, 0));
    }

    #[tokio::test]
    async fn test_untokened_accounts_are_still_deleted() {
        let (server, client, ledger) = setup().await;
        let mut ctx =
            ScenarioContext::new(client, Arc::new(ProbeConfig::default()), ledger.clone());

        ctx.create_identity(false).await.unwrap();
        let gone = ctx.create_identity(true).await.unwrap();
        ctx.client
            .delete_account(&gone.user_id, gone.token())
            .await
            .unwrap();
        ctx.forget(&gone.user_id);

        ctx.teardown().await;
        assert_eq!(server.user_count().await, 0);
        assert_eq!(ledger.stats().failed, 0);
    }

    #[tokio::test]
    async fn test_anonymous_fixture_has_no_identity() {
        let (_server, client, ledger) = setup().await;
        let ctx = ScenarioContext::provision(
            client,
            Arc::new(ProbeConfig::default()),
            ledger,
            Fixture::Anonymous,
        )
        .await
        .unwrap();
        assert!(ctx.identity().is_err());
    }

    #[tokio::test]
    async fn test_failed_authorization_still_tears_down_account() {
        // Account creation succeeds, every later call is refused
        let server = ScriptedServer::spawn(|method, path| match (method, path) {
            ("POST", "/Account/v1/User") => {
                (201, r#"{"userID":"u-1","username":"x","books":[]}"#)
            }
            _ => (503, r#"{"code":"503","message":"unavailable"}"#),
        })
        .await;
        let client = DomainClient::new(&server.base_url(), Duration::from_secs(5)).unwrap();
        let ledger = Arc::new(CleanupLedger::new());

        let result = ScenarioContext::provision(
            client,
            Arc::new(ProbeConfig::default()),
            ledger.clone(),
            Fixture::Authorized,
        )
        .await;

        assert!(result.is_err());
        let stats = ledger.stats();
        assert_eq!(stats.attempted, 1, "created account never reached teardown");
        assert_eq!(stats.failed, 1);
    }
}
