//! BookStore API scenarios

use apiprobe_client::{retry, ApiRequest, RetryPolicy, BOOKS_PATH, BOOK_PATH};
use apiprobe_common::payload;
use apiprobe_common::{schema, AddBooksRequest, Book, BookCollection};
use futures::future::BoxFuture;
use serde_json::json;

use crate::context::{Fixture, ScenarioContext};
use crate::error::E2eResult;
use crate::scenario::{ensure, ensure_eq, expect_rejection, expect_status, Scenario};
use crate::scenarios::catalog_isbns;

const GROUP: &str = "bookstore";

/// An ISBN-shaped value that is not in the catalog
const UNKNOWN_ISBN: &str = "0000000000000";

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
        scenario!(collection_round_trip, Fixture::Authorized, ["smoke"]),
        scenario!(fetch_book_by_isbn, Fixture::Anonymous, ["smoke"]),
        scenario!(catalog_schema_and_latency, Fixture::Anonymous, ["schema", "performance"]),
        scenario!(catalog_listing_with_retry, Fixture::Anonymous, ["resilience"]),
        scenario!(add_multiple_isbns, Fixture::Authorized, []),
        scenario!(duplicate_isbn_not_duplicated, Fixture::Authorized, ["edge"]),
        scenario!(lowercase_isbn_param_rejected, Fixture::Anonymous, ["negative"]),
        scenario!(remove_all_is_idempotent, Fixture::Authorized, []),
        scenario!(remove_book_without_isbn_rejected, Fixture::Authorized, ["negative"]),
        scenario!(invalid_token_cannot_add, Fixture::Authorized, ["security"]),
        scenario!(missing_token_cannot_add, Fixture::Authorized, ["security"]),
        scenario!(unknown_isbn_rejected, Fixture::Authorized, ["negative"]),
        scenario!(invalid_isbns_not_found, Fixture::Anonymous, ["edge"]),
        scenario!(fetched_book_matches_schema, Fixture::Anonymous, ["schema"]),
        scenario!(replace_book_swaps_entry, Fixture::Authorized, []),
    ]
}

async fn collection(ctx: &ScenarioContext) -> E2eResult<BookCollection> {
    let account = ctx
        .client
        .fetch_account(ctx.user_id()?, Some(ctx.token()?))
        .await?;
    Ok(account.collection())
}

/// list, add one, read back, remove it, clear, read back empty
fn collection_round_trip(ctx: &mut ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let isbns = catalog_isbns(ctx, 2).await?;
        let (user_id, token) = (ctx.user_id()?, ctx.token()?);

        let added = ctx.client.add_books(user_id, Some(token), &isbns[..1]).await?;
        ensure_eq(added.isbns(), vec![isbns[0].as_str()], "added isbns")?;
        ensure_eq(collection(ctx).await?.count_of(&isbns[0]), 1, "entries after one add")?;

        ctx.client.add_books(user_id, Some(token), &isbns[1..2]).await?;
        ctx.client.remove_book(user_id, Some(token), &isbns[0]).await?;
        let after_remove = collection(ctx).await?;
        ensure(!after_remove.contains(&isbns[0]), || "removed book still listed".into())?;
        ensure(after_remove.contains(&isbns[1]), || "remove took the wrong book".into())?;

        ctx.client.remove_all_books(user_id, Some(token)).await?;
        ensure(collection(ctx).await?.is_empty(), || "collection not empty after clear".into())
    })
}

fn fetch_book_by_isbn(ctx: &mut ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let isbn = catalog_isbns(ctx, 1).await?.remove(0);
        let book = ctx.client.fetch_book(&isbn).await?;
        ensure_eq(book.isbn.as_str(), isbn.as_str(), "fetched isbn")?;
        ensure(!book.title.is_empty(), || "book has no title".into())
    })
}

fn catalog_schema_and_latency(ctx: &mut ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let response = ctx.client.send(ApiRequest::get(BOOKS_PATH)).await?;
        expect_status(&response, &[200], "list catalog")?;
        ensure(response.is_json(), || {
            format!("catalog content type {:?}", response.content_type)
        })?;

        let catalog: BookCollection = response.validate(schema::book_list())?;
        for book in &catalog.books {
            schema::book()
                .check(&serde_json::to_value(book)?)
                .map_err(apiprobe_common::Error::from)?;
        }

        let limit = ctx.config.bookstore.slow_threshold();
        ensure(response.elapsed < limit, || {
            format!(
                "catalog took {}ms, limit {}ms",
                response.elapsed.as_millis(),
                limit.as_millis()
            )
        })
    })
}

/// The one scenario that opts into retrying transient failures
fn catalog_listing_with_retry(ctx: &mut ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let client = &ctx.client;
        let catalog = retry(&RetryPolicy::default(), "list_catalog", || client.list_catalog()).await?;
        ensure(!catalog.is_empty(), || "catalog is empty".into())
    })
}

fn add_multiple_isbns(ctx: &mut ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let isbns = catalog_isbns(ctx, 3).await?;
        let added = ctx
            .client
            .add_books(ctx.user_id()?, Some(ctx.token()?), &isbns)
            .await?;
        for isbn in &isbns {
            ensure(added.isbns().contains(&isbn.as_str()), || {
                format!("{} missing from {:?}", isbn, added.isbns())
            })?;
        }
        ensure_eq(collection(ctx).await?.len(), 3, "collection size")
    })
}

/// A second add is either refused or collapses; the collection holds one entry
fn duplicate_isbn_not_duplicated(ctx: &mut ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let isbn = catalog_isbns(ctx, 1).await?.remove(0);
        let (user_id, token) = (ctx.user_id()?, ctx.token()?);
        ctx.client.add_books(user_id, Some(token), &[&isbn]).await?;

        let again = ApiRequest::post(BOOKS_PATH)
            .bearer(Some(token))
            .json(json!(AddBooksRequest::new(user_id, &[&isbn])));
        let response = ctx.client.send(again).await?;
        expect_status(&response, &[400, 201], "second add")?;

        ensure_eq(collection(ctx).await?.count_of(&isbn), 1, "entries for duplicated isbn")
    })
}

fn lowercase_isbn_param_rejected(ctx: &mut ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let isbn = catalog_isbns(ctx, 1).await?.remove(0);
        let response = ctx
            .client
            .send(ApiRequest::get(BOOK_PATH).query("isbn", &isbn))
            .await?;
        expect_status(&response, &[400, 404], "lowercase isbn parameter")
    })
}

fn remove_all_is_idempotent(ctx: &mut ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let (user_id, token) = (ctx.user_id()?, ctx.token()?);
        ctx.client.remove_all_books(user_id, Some(token)).await?;
        ctx.client.remove_all_books(user_id, Some(token)).await?;
        Ok(())
    })
}

fn remove_book_without_isbn_rejected(ctx: &mut ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let request = ApiRequest::delete(BOOK_PATH)
            .bearer(Some(ctx.token()?))
            .json(json!({ "userId": ctx.user_id()? }));
        let response = ctx.client.send(request).await?;
        expect_status(&response, &[400], "remove without isbn")
    })
}

fn invalid_token_cannot_add(ctx: &mut ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let isbns = catalog_isbns(ctx, 1).await?;
        let result = ctx
            .client
            .add_books(ctx.user_id()?, Some("invalid.token"), &isbns)
            .await;
        expect_rejection(result, &[401], "add with forged token")?;
        Ok(())
    })
}

fn missing_token_cannot_add(ctx: &mut ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let isbns = catalog_isbns(ctx, 1).await?;
        let result = ctx.client.add_books(ctx.user_id()?, None, &isbns).await;
        expect_rejection(result, &[401], "add without token")?;
        Ok(())
    })
}

fn unknown_isbn_rejected(ctx: &mut ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let result = ctx
            .client
            .add_books(ctx.user_id()?, Some(ctx.token()?), &[UNKNOWN_ISBN])
            .await;
        expect_rejection(result, &[400], "add unknown isbn")?;
        ensure(collection(ctx).await?.is_empty(), || "rejected add changed the collection".into())
    })
}

fn invalid_isbns_not_found(ctx: &mut ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        for isbn in payload::invalid_isbns() {
            let result = ctx.client.fetch_book(isbn).await;
            expect_rejection(result, &[400, 404], &format!("fetch isbn {:?}", isbn))?;
        }
        Ok(())
    })
}

fn fetched_book_matches_schema(ctx: &mut ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let isbn = catalog_isbns(ctx, 1).await?.remove(0);
        let response = ctx
            .client
            .send(ApiRequest::get(BOOK_PATH).query("ISBN", &isbn))
            .await?;
        expect_status(&response, &[200], "fetch book")?;
        let book: Book = response.validate(schema::book())?;
        ensure_eq(book.isbn, isbn, "fetched isbn")
    })
}

fn replace_book_swaps_entry(ctx: &mut ScenarioContext) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let isbns = catalog_isbns(ctx, 2).await?;
        let (user_id, token) = (ctx.user_id()?, ctx.token()?);
        ctx.client.add_books(user_id, Some(token), &isbns[..1]).await?;

        let view = ctx
            .client
            .replace_book(user_id, Some(token), &isbns[0], &isbns[1])
            .await?;
        let books = view.collection();
        ensure(books.contains(&isbns[1]) && !books.contains(&isbns[0]), || {
            format!("after replace: {:?}", books.isbns())
        })?;
        ensure_eq(books.len(), 1, "collection size after replace")
    })
}
