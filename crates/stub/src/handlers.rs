//! Route handlers for the Account and BookStore endpoints

use std::collections::HashMap;
use std::sync::Arc;

use apiprobe_common::{
    AccountView, AddedBooks, ApiMessage, AuthToken, Book, BookCollection, CreatedAccount,
    IsbnRef, TokenStatus,
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{StubError, StubResult};
use crate::state::{password_is_strong, username_is_acceptable, StubState, UserRecord};

type SharedState = Arc<StubState>;

const TOKEN_LIFETIME_DAYS: i64 = 7;

fn json_body(payload: Result<Json<Value>, JsonRejection>) -> StubResult<Value> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(JsonRejection::MissingJsonContentType(e)) => {
            Err(StubError::UnsupportedMediaType(e.body_text()))
        }
        Err(e) => Err(StubError::bad_request("0", e.body_text())),
    }
}

fn str_field<'a>(body: &'a Value, name: &str) -> Option<&'a str> {
    body.get(name).and_then(Value::as_str)
}

/// `userName` and `password`, both present and non-empty
fn credentials(body: &Value) -> StubResult<(String, String)> {
    match (str_field(body, "userName"), str_field(body, "password")) {
        (Some(user), Some(password)) if !user.is_empty() && !password.is_empty() => {
            Ok((user.to_string(), password.to_string()))
        }
        _ => Err(StubError::missing_credentials()),
    }
}

fn view(user: &UserRecord) -> AccountView {
    AccountView {
        user_id: user.id.clone(),
        username: user.username.clone(),
        books: user.books.clone(),
    }
}

pub async fn health() -> &'static str {
    "ok"
}

// ============================================================================
// Account
// ============================================================================

pub async fn create_user(
    State(state): State<SharedState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> StubResult<Response> {
    let body = json_body(payload)?;
    let (username, password) = credentials(&body)?;

    if !username_is_acceptable(&username) {
        return Err(StubError::bad_request("1200", "UserName is not valid."));
    }
    if !password_is_strong(&password) {
        return Err(StubError::bad_request(
            "1300",
            "Passwords must have at least one non alphanumeric character, one digit ('0'-'9'), \
             one uppercase ('A'-'Z'), one lowercase ('a'-'z'), one special character and \
             Password must be eight characters or longer.",
        ));
    }

    let mut users = state.users.write().await;
    if users.values().any(|u| u.username == username) {
        return Err(StubError::NotAcceptable {
            code: "1204",
            message: "User exists!".to_string(),
        });
    }

    let user = UserRecord {
        id: Uuid::new_v4().to_string(),
        username,
        password,
        books: Vec::new(),
        token_issued: false,
    };
    info!("stub: created user {}", user.id);
    let created = CreatedAccount {
        user_id: user.id.clone(),
        username: user.username.clone(),
        books: Vec::new(),
    };
    users.insert(user.id.clone(), user);

    Ok((StatusCode::CREATED, Json(created)).into_response())
}

pub async fn generate_token(
    State(state): State<SharedState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> StubResult<Json<AuthToken>> {
    let body = json_body(payload)?;
    let (username, password) = credentials(&body)?;

    let mut users = state.users.write().await;
    let user = users
        .values_mut()
        .find(|u| u.username == username && u.password == password);

    let Some(user) = user else {
        return Ok(Json(AuthToken {
            token: None,
            expires: None,
            status: TokenStatus::Failed,
            result: "User authorization failed.".to_string(),
        }));
    };

    let token = format!("stub.{}.{}", user.id, Uuid::new_v4().simple());
    let expires = chrono::Utc::now() + chrono::Duration::days(TOKEN_LIFETIME_DAYS);
    user.token_issued = true;
    state
        .tokens
        .write()
        .await
        .insert(token.clone(), user.id.clone());
    debug!("stub: issued token for {}", user.id);

    Ok(Json(AuthToken {
        token: Some(token),
        expires: Some(expires.to_rfc3339()),
        status: TokenStatus::Success,
        result: "User authorized successfully.".to_string(),
    }))
}

pub async fn authorized(
    State(state): State<SharedState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> StubResult<Json<bool>> {
    let body = json_body(payload)?;
    let (username, password) = credentials(&body)?;

    let users = state.users.read().await;
    users
        .values()
        .find(|u| u.username == username && u.password == password)
        .map(|u| Json(u.token_issued))
        .ok_or_else(|| StubError::NotFound {
            code: "1207",
            message: "User not found!".to_string(),
        })
}

pub async fn get_user(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> StubResult<Json<AccountView>> {
    state.authorize_for(&headers, &id).await?;
    let users = state.users.read().await;
    users
        .get(&id)
        .map(|u| Json(view(u)))
        .ok_or_else(StubError::not_authorized)
}

/// A token for a different user answers 200 with an error body
pub async fn delete_user(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> StubResult<Response> {
    let owner = state.authenticate(&headers).await?;
    if owner != id {
        return Ok((
            StatusCode::OK,
            Json(ApiMessage::new("1207", "User Id not correct!")),
        )
            .into_response());
    }

    state.users.write().await.remove(&id);
    state.tokens.write().await.retain(|_, user| user != &id);
    info!("stub: deleted user {}", id);

    Ok(StatusCode::NO_CONTENT.into_response())
}

// ============================================================================
// BookStore
// ============================================================================

pub async fn list_books(State(state): State<SharedState>) -> Json<BookCollection> {
    Json(BookCollection {
        books: state.catalog.clone(),
    })
}

/// Only the exact `ISBN` query parameter is recognised
pub async fn get_book(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> StubResult<Response> {
    let isbn = params.get("ISBN").ok_or_else(StubError::unknown_isbn)?;
    let book = state.find_book(isbn).ok_or_else(StubError::unknown_isbn)?;
    Ok(Json(book.clone()).into_response())
}

pub async fn add_books(
    State(state): State<SharedState>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> StubResult<Response> {
    let owner = state.authenticate(&headers).await?;
    let body = json_body(payload)?;

    if str_field(&body, "userId") != Some(owner.as_str()) {
        return Err(StubError::wrong_user_id());
    }
    let requested: Vec<String> = body
        .get("collectionOfIsbns")
        .and_then(Value::as_array)
        .ok_or_else(|| StubError::bad_request("1211", "Collection of books required."))?
        .iter()
        .map(|entry| {
            entry
                .get("isbn")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(StubError::unknown_isbn)
        })
        .collect::<StubResult<_>>()?;

    let mut users = state.users.write().await;
    let user = users.get_mut(&owner).ok_or_else(StubError::not_authorized)?;

    // Validate the whole request before touching the collection.
    let mut accepted: Vec<Book> = Vec::with_capacity(requested.len());
    for isbn in &requested {
        let book = state.find_book(isbn).ok_or_else(StubError::unknown_isbn)?;
        let already = user.books.iter().any(|b| &b.isbn == isbn)
            || accepted.iter().any(|b| &b.isbn == isbn);
        if already {
            return Err(StubError::isbn_already_present());
        }
        accepted.push(book.clone());
    }

    let added = AddedBooks {
        books: accepted.iter().map(|b| IsbnRef::new(b.isbn.clone())).collect(),
    };
    user.books.extend(accepted);

    Ok((StatusCode::CREATED, Json(added)).into_response())
}

pub async fn remove_book(
    State(state): State<SharedState>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> StubResult<Response> {
    let owner = state.authenticate(&headers).await?;
    let body = json_body(payload)?;

    if str_field(&body, "userId") != Some(owner.as_str()) {
        return Err(StubError::wrong_user_id());
    }
    let isbn = str_field(&body, "isbn").ok_or_else(StubError::isbn_not_in_collection)?;

    let mut users = state.users.write().await;
    let user = users.get_mut(&owner).ok_or_else(StubError::not_authorized)?;
    let before = user.books.len();
    user.books.retain(|b| b.isbn != isbn);
    if user.books.len() == before {
        return Err(StubError::isbn_not_in_collection());
    }

    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Clearing an already empty collection succeeds
pub async fn remove_all_books(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> StubResult<Response> {
    let user_id = params.get("UserId").ok_or_else(StubError::wrong_user_id)?;
    state.authorize_for(&headers, user_id).await?;

    let mut users = state.users.write().await;
    let user = users.get_mut(user_id).ok_or_else(StubError::not_authorized)?;
    user.books.clear();

    Ok(StatusCode::NO_CONTENT.into_response())
}

pub async fn replace_book(
    State(state): State<SharedState>,
    Path(old_isbn): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> StubResult<Json<AccountView>> {
    let owner = state.authenticate(&headers).await?;
    let body = json_body(payload)?;

    if str_field(&body, "userId") != Some(owner.as_str()) {
        return Err(StubError::wrong_user_id());
    }
    let new_isbn = str_field(&body, "isbn").ok_or_else(StubError::unknown_isbn)?;
    let replacement = state
        .find_book(new_isbn)
        .ok_or_else(StubError::unknown_isbn)?
        .clone();

    let mut users = state.users.write().await;
    let user = users.get_mut(&owner).ok_or_else(StubError::not_authorized)?;
    if new_isbn != old_isbn && user.books.iter().any(|b| b.isbn == new_isbn) {
        return Err(StubError::isbn_already_present());
    }
    let slot = user
        .books
        .iter_mut()
        .find(|b| b.isbn == old_isbn)
        .ok_or_else(StubError::isbn_not_in_collection)?;
    *slot = replacement;

    Ok(Json(view(user)))
}
