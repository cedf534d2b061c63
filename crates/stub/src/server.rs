//! Router assembly and the in-process server handle

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::StubError;
use crate::handlers;
use crate::state::{StubOptions, StubState};

const HEALTH_PATH: &str = "/health";

/// Build the application router over shared state
pub fn router(state: Arc<StubState>) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(handlers::health))
        .route("/Account/v1/User", post(handlers::create_user))
        .route(
            "/Account/v1/User/:id",
            get(handlers::get_user).delete(handlers::delete_user),
        )
        .route("/Account/v1/GenerateToken", post(handlers::generate_token))
        .route("/Account/v1/Authorized", post(handlers::authorized))
        .route(
            "/BookStore/v1/Books",
            get(handlers::list_books)
                .post(handlers::add_books)
                .delete(handlers::remove_all_books),
        )
        .route(
            "/BookStore/v1/Book",
            get(handlers::get_book).delete(handlers::remove_book),
        )
        .route("/BookStore/v1/Books/:isbn", put(handlers::replace_book))
        .layer(middleware::from_fn_with_state(state.clone(), inject_faults))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Apply configured delay and transient failures to everything but health
async fn inject_faults(State(state): State<Arc<StubState>>, request: Request, next: Next) -> Response {
    if request.uri().path() != HEALTH_PATH {
        if state.take_failure() {
            return StubError::Unavailable.into_response();
        }
        if !state.options.response_delay.is_zero() {
            tokio::time::sleep(state.options.response_delay).await;
        }
    }
    next.run(request).await
}

/// A stub bound to an ephemeral localhost port, serving until dropped
pub struct StubServer {
    addr: SocketAddr,
    state: Arc<StubState>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl StubServer {
    pub async fn spawn(options: StubOptions) -> anyhow::Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(StubState::new(options));
        let app = router(state.clone());
        let (tx, rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let shutdown = async {
                let _ = rx.await;
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                warn!("stub server stopped with error: {}", e);
            }
        });

        info!("Stub server listening on {}", addr);
        Ok(Self {
            addr,
            state,
            shutdown: Some(tx),
            task,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn user_count(&self) -> usize {
        self.state.users.read().await.len()
    }

    /// Stop accepting requests and wait for in-flight ones to finish
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.task).await;
    }

    /// Stored usernames, for checks that input came back unaltered
    pub async fn usernames(&self) -> Vec<String> {
        self.state
            .users
            .read()
            .await
            .values()
            .map(|u| u.username.clone())
            .collect()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
