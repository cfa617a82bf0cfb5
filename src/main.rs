mod admin;
mod catalog;
mod config;
mod db;
mod entities;
mod error;
mod extract;
mod media;
mod models;
mod routes;
mod tags;
mod templates;

#[cfg(test)]
mod test_support;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{catalog::Catalog, config::Config, media::MediaStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Catalog,
    pub media: MediaStore,
}

pub fn router(state: Arc<AppState>) -> Router {
    let media = ServeDir::new(state.media.root());

    Router::new()
        .route("/", get(routes::index))
        .route("/filter/", get(routes::filter))
        .route("/add-rating/", post(routes::add_rating))
        .route("/review/{movie_id}/", post(routes::add_review))
        .route("/search/", get(routes::search))
        .route("/actor/{name}/", get(routes::actor_detail))
        .route("/{slug}/", get(routes::movie_detail))
        .merge(admin::router(state.clone()))
        .nest_service("/media", media)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,cinema=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let db = db::connect_and_migrate(&config.database_url).await?;
    tokio::fs::create_dir_all(&config.media_root).await?;

    if config.admin.is_none() {
        tracing::warn!("ADMIN_USERNAME/ADMIN_PASSWORD not set, admin console is unauthenticated");
    }

    let state = Arc::new(AppState {
        catalog: Catalog::new(db, config.page_size, config.last_movies),
        media: MediaStore::new(config.media_root.clone()),
        config: config.clone(),
    });

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
