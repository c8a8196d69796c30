use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::api::{self, ErrorResponse};
use crate::catalog::{FavoriteService, ListingCache, ListingService};
use crate::db::Repository;

#[derive(Clone)]
pub struct AppState {
    pub listing: Arc<ListingService>,
    pub favorites: Arc<FavoriteService>,
}

impl AppState {
    pub fn new(db: Arc<dyn Repository>, cache: Arc<dyn ListingCache>) -> Self {
        Self {
            listing: Arc::new(ListingService::new(db.clone(), cache)),
            favorites: Arc::new(FavoriteService::new(db)),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    // Every route answers with and without a trailing slash.
    let catalog_routes = Router::new()
        .route("/favourite/movie", post(api::add_favorite_movie))
        .route("/favourite/movie/", post(api::add_favorite_movie))
        .route("/favourite/planet", post(api::add_favorite_planet))
        .route("/favourite/planet/", post(api::add_favorite_planet))
        .route("/movies", get(api::list_movies))
        .route("/movies/", get(api::list_movies))
        .route("/planets", get(api::list_planets))
        .route("/planets/", get(api::list_planets));

    Router::new()
        .route("/knockknock", get(api::health_check))
        .route("/knockknock/", get(api::health_check))
        .merge(catalog_routes)
        .fallback(fallback_handler)
        .layer(axum::middleware::from_fn(crate::middleware::log_request))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn fallback_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "Not found".to_string(),
        }),
    )
}
