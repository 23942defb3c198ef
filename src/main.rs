mod admin;
mod config;
mod controllers;
mod init;
mod models;
mod prelude;
mod result;

pub use crate::result::Result;

use std::{sync::Arc, time::Duration};

use axum::{error_handling::HandleErrorLayer, http::StatusCode, BoxError, Router};
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tower_sessions::{cookie::SameSite, Expiry, SessionManagerLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone)]
pub struct AppState {
    cfg: Arc<config::Config>,
    db: PgPool,
}

#[tokio::main]
async fn main() -> Result {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bingo_admin=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!("Server stopped: {:?}", e.0);
        return Err(e);
    }

    return Ok(());
}

async fn run() -> Result {
    let cfg = config::build()?;

    let db = init::init_pg_pool(&cfg).await?;
    init::init_bootstrap_admin(&cfg, &db).await?;

    let session_store = init::init_session_store(db.clone()).await?;

    let state = AppState {
        cfg: Arc::new(cfg),
        db,
    };

    let session_service = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(|_: BoxError| async {
            return StatusCode::BAD_REQUEST;
        }))
        .layer(
            SessionManagerLayer::new(session_store)
                .with_expiry(Expiry::OnSessionEnd)
                .with_secure(state.cfg.server_secure_cookies)
                .with_same_site(SameSite::Lax),
        );

    let site = admin::default_site()?;

    let router = controllers::add_routes(Router::new(), site);

    let addr = state.cfg.server_addr()?;
    let request_timeout = Duration::from_secs(state.cfg.request_timeout_secs);

    let router = router
        .with_state(state)
        .layer(session_service)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on {addr}");

    axum::Server::bind(&addr)
        .serve(router.into_make_service())
        .await?;

    return Ok(());
}
