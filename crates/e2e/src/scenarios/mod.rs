//! Scenario groups

pub mod account;
pub mod bookstore;

use apiprobe_client::{ApiRequest, ApiResponse, USER_PATH};
use apiprobe_common::{CreatedAccount, Credentials};
use serde_json::Value;
use tracing::warn;

use crate::context::{Identity, ScenarioContext};
use crate::error::E2eResult;

/// POST a hand-built account body; a 201 is adopted so teardown removes it
pub(crate) async fn create_json(ctx: &mut ScenarioContext, body: &Value) -> E2eResult<ApiResponse> {
    let response = ctx
        .client
        .send(ApiRequest::post(USER_PATH).json(body.clone()))
        .await?;

    if response.status == 201 {
        let password = body
            .get("password")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let requested = body
            .get("userName")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let identity = match response.decode::<CreatedAccount>() {
            Ok(created) => Some((created.username, created.user_id)),
            // Keep hold of the account even when the rest of the body is off
            Err(_) => response
                .json()
                .ok()
                .and_then(|v| v.get("userID").and_then(Value::as_str).map(str::to_string))
                .map(|user_id| (requested.to_string(), user_id)),
        };
        match identity {
            Some((username, user_id)) => ctx.adopt(Identity {
                credentials: Credentials::new(username, password),
                user_id,
                token: None,
            }),
            None => warn!("201 without a userID, account cannot be cleaned up: {}", response.body),
        }
    }
    Ok(response)
}

/// The first `n` ISBNs the catalog lists
pub(crate) async fn catalog_isbns(ctx: &ScenarioContext, n: usize) -> E2eResult<Vec<String>> {
    let catalog = ctx.client.list_catalog().await?;
    crate::scenario::ensure(catalog.len() >= n, || {
        format!("catalog has {} books, scenario needs {}", catalog.len(), n)
    })?;
    Ok(catalog.books.into_iter().take(n).map(|b| b.isbn).collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use apiprobe_client::{CleanupLedger, DomainClient};
    use apiprobe_common::ProbeConfig;
    use serde_json::json;

    use super::*;
    use crate::testing::ScriptedServer;

    #[tokio::test]
    async fn test_created_account_with_odd_body_is_still_cleaned_up() {
        // `books` has the wrong type and `username` is missing
        let server = ScriptedServer::spawn(|method, _| match method {
            "POST" => (201, r#"{"userID":"u-9","books":"none"}"#),
            _ => (503, r#"{"code":"503","message":"unavailable"}"#),
        })
        .await;
        let client = DomainClient::new(&server.base_url(), Duration::from_secs(5)).unwrap();
        let ledger = Arc::new(CleanupLedger::new());
        let mut ctx = ScenarioContext::new(client, Arc::new(ProbeConfig::default()), ledger.clone());

        let body = json!({ "userName": "odd_body", "password": "Passw0rd!" });
        let response = create_json(&mut ctx, &body).await.unwrap();
        assert_eq!(response.status, 201);
        assert!(response.decode::<CreatedAccount>().is_err());

        ctx.teardown().await;
        assert_eq!(ledger.stats().attempted, 1);
    }
}
