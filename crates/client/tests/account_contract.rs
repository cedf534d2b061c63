//! Account operations against the in-process stub

use std::time::Duration;

use apiprobe_client::{ApiRequest, DomainClient};
use apiprobe_common::{payload, schema, Credentials, Error, TokenStatus};
use apiprobe_stub::{StubOptions, StubServer};

async fn setup() -> (StubServer, DomainClient) {
    let server = StubServer::spawn(StubOptions::default()).await.unwrap();
    let client = DomainClient::new(&server.base_url(), Duration::from_secs(5)).unwrap();
    (server, client)
}

#[tokio::test]
async fn test_account_lifecycle() {
    let (_server, client) = setup().await;
    let creds = payload::unique_credentials();

    let created = client.create_account(&creds).await.unwrap();
    assert_eq!(created.username, creds.user_name);
    assert!(created.books.is_empty());

    assert!(!client.is_authorized(&creds).await.unwrap());
    let token = client.issue_token(&creds).await.unwrap();
    assert_eq!(token.status, TokenStatus::Success);
    let bearer = token.bearer().unwrap().to_string();
    assert!(client.is_authorized(&creds).await.unwrap());

    let account = client
        .fetch_account(&created.user_id, Some(&bearer))
        .await
        .unwrap();
    assert_eq!(account.username, creds.user_name);
    assert!(account.books.is_empty());

    client
        .delete_account(&created.user_id, Some(&bearer))
        .await
        .unwrap();

    let after = client
        .fetch_account(&created.user_id, Some(&bearer))
        .await
        .unwrap_err();
    assert!(matches!(after.status(), Some(401) | Some(404)));
}

#[tokio::test]
async fn test_duplicate_account_is_conflict() {
    let (_server, client) = setup().await;
    let creds = payload::unique_credentials();
    client.create_account(&creds).await.unwrap();

    let err = client.create_account(&creds).await.unwrap_err();
    assert!(matches!(err, Error::Conflict { status: 406, .. }), "{:?}", err);
}

#[tokio::test]
async fn test_failed_token_is_returned_not_raised() {
    let (_server, client) = setup().await;
    let token = client
        .issue_token(&Credentials::new("no-user", "badpass"))
        .await
        .unwrap();
    assert_eq!(token.status, TokenStatus::Failed);
    assert!(token.token.is_none());
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let (_server, client) = setup().await;
    let created = client
        .create_account(&payload::unique_credentials())
        .await
        .unwrap();

    let err = client.fetch_account(&created.user_id, None).await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized { status: 401, .. }));
}

#[tokio::test]
async fn test_delete_with_foreign_id_is_not_found() {
    let (server, client) = setup().await;
    let creds = payload::unique_credentials();
    client.create_account(&creds).await.unwrap();
    let token = client.issue_token(&creds).await.unwrap();

    let err = client
        .delete_account("00000000-0000-0000-0000-000000000000", token.bearer())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { status: 200, .. }), "{:?}", err);
    assert_eq!(server.user_count().await, 1);
}

#[tokio::test]
async fn test_second_delete_is_not_success() {
    let (server, client) = setup().await;
    let creds = payload::unique_credentials();
    let created = client.create_account(&creds).await.unwrap();
    let token = client.issue_token(&creds).await.unwrap();

    client
        .delete_account(&created.user_id, token.bearer())
        .await
        .unwrap();
    assert_eq!(server.user_count().await, 0);

    let err = client
        .delete_account(&created.user_id, token.bearer())
        .await
        .unwrap_err();
    assert!(matches!(err.status(), Some(401) | Some(404)), "{:?}", err);
}

#[tokio::test]
async fn test_weak_password_rejected() {
    let (_server, client) = setup().await;
    let err = client
        .create_account(&Credentials::new(payload::valid_username(), "abc123"))
        .await
        .unwrap_err();
    match err {
        Error::Rejected { status, body, .. } => {
            assert_eq!(status, 400);
            assert!(body.to_lowercase().contains("password"));
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_raw_send_validates_created_account_schema() {
    let (_server, client) = setup().await;
    let creds = payload::unique_credentials();
    let response = client
        .send(ApiRequest::post("/Account/v1/User").json(serde_json::to_value(&creds).unwrap()))
        .await
        .unwrap();
    assert_eq!(response.status, 201);
    let created: apiprobe_common::CreatedAccount =
        response.validate(schema::created_account()).unwrap();
    assert_eq!(created.username, creds.user_name);
}
