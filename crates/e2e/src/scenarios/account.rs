//! Account API scenarios

use apiprobe_client::{ApiRequest, TOKEN_PATH, USER_PATH};
use apiprobe_common::payload::{self, PayloadClass, PayloadValue};
use apiprobe_common::{schema, AccountView, AuthToken, CreatedAccount, Credentials, TokenStatus};
use futures::future::BoxFuture;
use serde_json::{json, Map, Value};

use crate::context::{Fixture, Identity, ScenarioContext};
use crate::error::E2eResult;
use crate::scenario::{ensure, ensure_eq, expect_rejection, expect_status, Scenario};
use crate::scenarios::create_json;

const GROUP: &str = "account";

macro_rules! scenario {
    ($name:ident, $fixture:expr, [$($tag:expr),*]) => {
        Scenario {
            name: stringify!($name),
            group: GROUP,
            tags: &[$($tag),*],
            fixture: $fixture,
            run: $name,
        }
    };
}

pub fn scenarios() -> Vec<Scenario> {
    vec![
        scenario!(account_lifecycle, Fixture::Anonymous, ["smoke"]),
        scenario!(created_account_matches_schema, Fixture::Anonymous, ["schema"]),
        scenario!(fetch_returns_created_user, Fixture::Authorized, ["smoke", "schema"]),
        scenario!(unicode_username_with_spaces_accepted, Fixture::Anonymous, ["edge"]),
        scenario!(duplicate_username_conflicts, Fixture::Anonymous, []),
        scenario!(invalid_bodies_rejected, Fixture::Anonymous, ["negative"]),
        scenario!(authorized_with_wrong_password_not_found, Fixture::Account, ["negative"]),
        scenario!(token_issued_twice_both_valid, Fixture::Account, []),
        scenario!(foreign_token_cannot_read_account, Fixture::Authorized, ["security"]),
        scenario!(deleted_account_token_is_dead, Fixture::Authorized, ["security"]),
        scenario!(missing_authorization_header_unauthorized, Fixture::Account, ["security"]),
        scenario!(weak_password_rejected_with_hint, Fixture::Anonymous, ["negative"]),
        scenario!(weak_password_catalog_rejected, Fixture::Anonymous, ["negative"]),
        scenario!(malformed_user_id_without_token, Fixture::Anonymous, ["negative"]),
        scenario!(invalid_credentials_token_failed, Fixture::Anonymous, ["schema"]),
        scenario!(hostile_usernames_never_stored, Fixture::Anonymous, ["security"]),
        scenario!(questionable_usernames_handled_consistently, Fixture::Anonymous, ["edge"]),
        scenario!(oversized_username_rejected, Fixture::Anonymous, ["edge"]),
        scenario!(non_string_usernames_rejected, Fixture::Anonymous, ["edge"]),
    ]
}

/// create, token, fetch, delete, then the old token no longer reads the account
fn account_lifecycle(ctx: &mut ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let credentials = payload::unique_credentials();
        let created = ctx.client.create_account(&credentials).await?;
        ctx.adopt(Identity {
            credentials: credentials.clone(),
            user_id: created.user_id.clone(),
            token: None,
        });
        ensure_eq(created.username.as_str(), credentials.user_name.as_str(), "created username")?;

        let token = ctx.client.issue_token(&credentials).await?;
        ensure_eq(token.status, TokenStatus::Success, "token status")?;
        let bearer = token
            .bearer()
            .map(str::to_string)
            .ok_or_else(|| crate::E2eError::AssertionFailed("empty token".into()))?;
        ensure(ctx.client.is_authorized(&credentials).await?, || {
            "account not authorized after token issuance".into()
        })?;

        let account = ctx.client.fetch_account(&created.user_id, Some(&bearer)).await?;
        ensure_eq(account.username.as_str(), credentials.user_name.as_str(), "fetched username")?;
        ensure(account.books.is_empty(), || "fresh account has books".into())?;

        ctx.client.delete_account(&created.user_id, Some(&bearer)).await?;
        ctx.forget(&created.user_id);

        let after = ctx.client.fetch_account(&created.user_id, Some(&bearer)).await;
        expect_rejection(after, &[401, 404], "fetch after delete")?;
        Ok(())
    })
}

fn created_account_matches_schema(ctx: &mut ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let credentials = payload::unique_credentials();
        let response = create_json(ctx, &json!(credentials)).await?;
        expect_status(&response, &[201], "create account")?;

        let created: CreatedAccount = response.validate(schema::created_account())?;
        ensure_eq(created.username, credentials.user_name, "created username")?;
        Ok(())
    })
}

fn fetch_returns_created_user(ctx: &mut ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let identity = ctx.identity()?.clone();
        let response = ctx
            .client
            .send(
                ApiRequest::get(format!("{}/{}", USER_PATH, identity.user_id))
                    .bearer(identity.token()),
            )
            .await?;
        expect_status(&response, &[200], "fetch account")?;

        let account: AccountView = response.validate(schema::account())?;
        ensure_eq(account.user_id, identity.user_id, "user id")?;
        ensure_eq(account.username, identity.credentials.user_name, "username")?;
        ensure(account.books.is_empty(), || "fresh account has books".into())
    })
}

fn unicode_username_with_spaces_accepted(ctx: &mut ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let username = format!("{} {}", payload::unicode_payload(), payload::valid_username());
        let body = json!({ "userName": username, "password": payload::valid_password() });
        let response = create_json(ctx, &body).await?;
        expect_status(&response, &[201], "create unicode account")?;

        let created: CreatedAccount = response.decode()?;
        ensure_eq(created.username, username, "stored username")
    })
}

fn duplicate_username_conflicts(ctx: &mut ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let credentials = payload::unique_credentials();
        let first = create_json(ctx, &json!(credentials)).await?;
        expect_status(&first, &[201], "first create")?;

        let second = ctx.client.create_account(&credentials).await;
        expect_rejection(second, &[400, 406, 409], "duplicate create")?;
        Ok(())
    })
}

fn invalid_bodies_rejected(ctx: &mut ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let missing_password = json!({ "userName": payload::valid_username() });
        let response = create_json(ctx, &missing_password).await?;
        expect_status(&response, &[400, 415], "missing password")?;

        let response = create_json(ctx, &json!({})).await?;
        expect_status(&response, &[400, 415], "empty body")?;

        let text_plain = ApiRequest::post(USER_PATH).raw(
            Some("text/plain"),
            json!({ "userName": "x", "password": "y" }).to_string(),
        );
        let response = ctx.client.send(text_plain).await?;
        expect_status(&response, &[400, 415], "text/plain body")
    })
}

fn authorized_with_wrong_password_not_found(
    ctx: &mut ScenarioContext,
) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let identity = ctx.identity()?;
        let wrong = Credentials::new(identity.credentials.user_name.clone(), "Wrong!Pass123");
        let result = ctx.client.is_authorized(&wrong).await;
        expect_rejection(result, &[404], "authorized with wrong password")?;
        Ok(())
    })
}

fn token_issued_twice_both_valid(ctx: &mut ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let credentials = ctx.identity()?.credentials.clone();
        for attempt in 1..=2 {
            let token = ctx.client.issue_token(&credentials).await?;
            ensure_eq(token.status, TokenStatus::Success, "token status")?;
            let bearer = token.bearer().unwrap_or_default();
            ensure(bearer.split('.').count() >= 2, || {
                format!("token #{} is not dotted: {:?}", attempt, bearer)
            })?;
        }
        Ok(())
    })
}

fn foreign_token_cannot_read_account(ctx: &mut ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let other = ctx.create_identity(false).await?;
        let token = ctx.token()?.to_string();
        let result = ctx.client.fetch_account(&other.user_id, Some(&token)).await;
        expect_rejection(result, &[401], "fetch with another user's token")?;
        Ok(())
    })
}

fn deleted_account_token_is_dead(ctx: &mut ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let user_id = ctx.user_id()?.to_string();
        let token = ctx.token()?.to_string();

        ctx.client.delete_account(&user_id, Some(&token)).await?;
        ctx.forget(&user_id);

        let result = ctx.client.fetch_account(&user_id, Some(&token)).await;
        expect_rejection(result, &[401, 404], "reuse token after delete")?;
        Ok(())
    })
}

fn missing_authorization_header_unauthorized(
    ctx: &mut ScenarioContext,
) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let result = ctx.client.fetch_account(ctx.user_id()?, None).await;
        expect_rejection(result, &[401], "fetch without Authorization")?;
        Ok(())
    })
}

fn weak_password_rejected_with_hint(ctx: &mut ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let body = json!({ "userName": format!("weak_{}", payload::valid_username()), "password": "abc123" });
        let response = create_json(ctx, &body).await?;
        expect_status(&response, &[400], "weak password")?;
        ensure(response.body.to_lowercase().contains("password"), || {
            format!("no password policy hint in {:?}", response.body)
        })
    })
}

fn weak_password_catalog_rejected(ctx: &mut ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        for password in payload::invalid_passwords() {
            let body = json!({ "userName": payload::valid_username(), "password": password });
            let response = create_json(ctx, &body).await?;
            expect_status(&response, &[400], &format!("password {:?}", password))?;
        }
        Ok(())
    })
}

fn malformed_user_id_without_token(ctx: &mut ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let result = ctx.client.fetch_account("not-a-uuid", None).await;
        expect_rejection(result, &[400, 401], "malformed user id")?;
        Ok(())
    })
}

/// Unknown credentials still get a 200 envelope, with the failure in the payload
fn invalid_credentials_token_failed(ctx: &mut ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let credentials = Credentials::new("no-user", "badpass");
        let response = ctx
            .client
            .send(ApiRequest::post(TOKEN_PATH).json(json!(credentials)))
            .await?;
        expect_status(&response, &[200], "token for unknown user")?;

        let envelope: AuthToken = response.validate(schema::token_envelope())?;
        ensure_eq(envelope.status, TokenStatus::Failed, "envelope status")?;
        ensure(envelope.token.is_none(), || "failed envelope carries a token".into())?;

        let typed = ctx.client.issue_token(&credentials).await?;
        ensure(!typed.is_success() && typed.bearer().is_none(), || {
            "typed issuance reported success".into()
        })
    })
}

/// Injection, markup and oversized names are refused and cannot sign in
fn hostile_usernames_never_stored(ctx: &mut ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let hostile = PayloadClass::ALL
            .into_iter()
            .filter(PayloadClass::is_hostile)
            .flat_map(payload::payloads);

        for entry in hostile {
            let Some(username) = entry.value.as_text().map(str::to_string) else {
                continue;
            };
            let password = payload::valid_password();
            let body = json!({ "userName": username, "password": password });
            let response = create_json(ctx, &body).await?;
            ensure(response.status != 201, || {
                format!("{} username {:?} was accepted", entry.class, username)
            })?;

            let token = ctx
                .client
                .issue_token(&Credentials::new(username.clone(), password))
                .await?;
            ensure(!token.is_success(), || {
                format!("{} username {:?} can sign in", entry.class, username)
            })?;
        }
        Ok(())
    })
}

/// Odd but harmless names are either stored verbatim or refused with a documented status
fn questionable_usernames_handled_consistently(
    ctx: &mut ScenarioContext,
) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        for username in payload::invalid_usernames() {
            let body = json!({ "userName": username, "password": payload::valid_password() });
            let response = create_json(ctx, &body).await?;
            expect_status(&response, &[201, 400, 406], &format!("create {:?}", username))?;
            if response.status == 201 {
                let created: CreatedAccount = response.decode()?;
                ensure_eq(created.username, username, "stored username")?;
            }
        }
        Ok(())
    })
}

fn oversized_username_rejected(ctx: &mut ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let body = json!({
            "userName": payload::large_payload(payload::DEFAULT_LARGE_PAYLOAD_SIZE),
            "password": payload::valid_password(),
        });
        let response = create_json(ctx, &body).await?;
        expect_status(&response, &[400, 413], "oversized username")
    })
}

/// null, booleans, numbers and a missing field in place of `userName`
fn non_string_usernames_rejected(ctx: &mut ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let classes = [
            PayloadClass::NullLike,
            PayloadClass::BooleanLike,
            PayloadClass::NumericEdge,
        ];
        let candidates = classes
            .into_iter()
            .flat_map(payload::payloads)
            .filter(|p| !matches!(p.value.to_json(), Some(Value::String(_))));

        for entry in candidates {
            let mut body = Map::new();
            if let Some(value) = entry.value.to_json() {
                body.insert("userName".to_string(), value);
            }
            body.insert("password".to_string(), json!(payload::valid_password()));

            let response = create_json(ctx, &Value::Object(body)).await?;
            let label = match &entry.value {
                PayloadValue::Absent => "absent userName".to_string(),
                other => format!("userName {:?}", other),
            };
            expect_status(&response, &[400, 415], &label)?;
        }
        Ok(())
    })
}
