mod config;
mod db;
mod engine;
mod error;
mod routes;
mod state;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "revisa=info,tower_http=info".into()),
        )
        .init();

    let config = config::Config::from_env()?;

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;

    let state = Arc::new(state::AppState::new(pool));

    let app = Router::new()
        .route("/api/reviewers", post(routes::reviewers::register))
        .route("/api/reviewers/eligible", get(routes::reviewers::eligible))
        .route("/api/reviewers/:id", get(routes::reviewers::get))
        .route("/api/reviewers/:id/activate", post(routes::reviewers::activate))
        .route("/api/reviewers/:id/availability", put(routes::reviewers::set_availability))
        .route("/api/submissions", post(routes::submissions::create).get(routes::submissions::list))
        .route("/api/submissions/:id", get(routes::submissions::get))
        .route("/api/submissions/:id/submit", post(routes::submissions::submit))
        .route("/api/submissions/:id/withdraw", post(routes::submissions::withdraw))
        .route("/api/submissions/:id/history", get(routes::submissions::history))
        .route("/api/submissions/:id/checks", get(routes::submissions::checks))
        .route("/api/submissions/:id/reviews", get(routes::submissions::reviews))
        .route("/api/submissions/:id/appeals", get(routes::submissions::appeals))
        .route("/api/checks", post(routes::checks::request))
        .route("/api/checks/:id/result", post(routes::checks::record_result))
        .route("/api/reviews", post(routes::reviews::assign))
        .route("/api/reviews/:id", get(routes::reviews::get))
        .route("/api/reviews/:id/start", post(routes::reviews::start))
        .route("/api/reviews/:id/decline", post(routes::reviews::decline))
        .route("/api/reviews/:id/submit", post(routes::reviews::submit))
        .route("/api/reviews/:id/comments", post(routes::reviews::add_comment).get(routes::reviews::list_comments))
        .route("/api/comments/:id/resolve", post(routes::reviews::resolve_comment))
        .route("/api/appeals", post(routes::appeals::create))
        .route("/api/appeals/:id", get(routes::appeals::get))
        .route("/api/appeals/:id/decide", post(routes::appeals::decide))
        .route("/api/appeals/:id/withdraw", post(routes::appeals::withdraw))
        .route("/api/stats", get(routes::stats))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Revisa listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
