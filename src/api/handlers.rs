use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Json,
};
use tracing::warn;

use super::error::ApiError;
use super::types::*;
use crate::catalog::{FavoriteOutcome, FavoriteRequest, ListingPage, ListingQuery};
use crate::db::ItemKind;
use crate::server::AppState;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn add_favorite_movie(
    State(state): State<AppState>,
    body: Result<Json<FavoriteMovieBody>, JsonRejection>,
) -> Result<(StatusCode, Json<FavoriteMovieResponse>), ApiError> {
    let Json(body) = body.map_err(invalid_body)?;
    let (status, success, id) = add_favorite(&state, ItemKind::Movie, body.into()).await?;

    Ok((
        status,
        Json(FavoriteMovieResponse {
            success,
            favorite_movie: id,
        }),
    ))
}

pub async fn add_favorite_planet(
    State(state): State<AppState>,
    body: Result<Json<FavoritePlanetBody>, JsonRejection>,
) -> Result<(StatusCode, Json<FavoritePlanetResponse>), ApiError> {
    let Json(body) = body.map_err(invalid_body)?;
    let (status, success, id) = add_favorite(&state, ItemKind::Planet, body.into()).await?;

    Ok((
        status,
        Json(FavoritePlanetResponse {
            success,
            favorite_planet: id,
        }),
    ))
}

pub async fn list_movies(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListingPage>, ApiError> {
    list(&state, ItemKind::Movie, params).await
}

pub async fn list_planets(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListingPage>, ApiError> {
    list(&state, ItemKind::Planet, params).await
}

fn invalid_body(rejection: JsonRejection) -> ApiError {
    warn!(error = %rejection, "Rejected request body");
    ApiError::BadRequest("Invalid request body".to_string())
}

async fn add_favorite(
    state: &AppState,
    kind: ItemKind,
    request: FavoriteRequest,
) -> Result<(StatusCode, String, i64), ApiError> {
    let FavoriteOutcome {
        created,
        favorite_id,
    } = state.favorites.add_favorite(kind, &request).await?;

    if created {
        Ok((
            StatusCode::CREATED,
            format!("{} added as favorite", kind.label()),
            favorite_id,
        ))
    } else {
        Ok((
            StatusCode::OK,
            format!("{} already added as favorite", kind.label()),
            favorite_id,
        ))
    }
}

async fn list(
    state: &AppState,
    kind: ItemKind,
    params: ListParams,
) -> Result<Json<ListingPage>, ApiError> {
    let user_id = match params.user_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(s) => Some(
            s.parse::<i64>()
                .map_err(|_| ApiError::BadRequest("Invalid user_id".to_string()))?,
        ),
    };
    let page = params.page.as_deref().map(parse_page).unwrap_or(1);

    let query = ListingQuery::new(kind, user_id, params.search_by, page);
    let listing = state.listing.list(&query).await?;
    Ok(Json(listing))
}

/// Non-numeric pages fall back to the first page; zero and negative pages
/// are out of range.
fn parse_page(s: &str) -> u32 {
    match s.trim().parse::<i64>() {
        Ok(n) if n < 1 => 0,
        Ok(n) => u32::try_from(n).unwrap_or(u32::MAX),
        Err(_) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MokaListingCache;
    use crate::db::{ItemRepo, NewCatalogItem, SqliteRepository};
    use axum::{body::Body, http::Request, Router};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    async fn app_with(items: &[(ItemKind, &str)]) -> Router {
        let db = SqliteRepository::in_memory().await.unwrap();
        for (kind, key) in items {
            db.upsert_item(&NewCatalogItem {
                kind: *kind,
                natural_key: key.to_string(),
                url: format!("http://localhost:8000/{}/{}", kind, key.len()),
                release_date: match kind {
                    ItemKind::Movie => chrono::NaiveDate::from_ymd_opt(2010, 7, 16),
                    ItemKind::Planet => None,
                },
            })
            .await
            .unwrap();
            // Distinct creation timestamps.
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        let cache = Arc::new(MokaListingCache::new(1000, Duration::from_secs(300)));
        let state = AppState::new(Arc::new(db), cache);
        crate::server::build_router(state)
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(app, req).await
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        send(app, req).await
    }

    #[test]
    fn test_parse_page() {
        assert_eq!(parse_page("3"), 3);
        assert_eq!(parse_page(" 2 "), 2);
        assert_eq!(parse_page("abc"), 1);
        assert_eq!(parse_page("0"), 0);
        assert_eq!(parse_page("-4"), 0);
        assert_eq!(parse_page("99999999999"), u32::MAX);
    }

    #[tokio::test]
    async fn test_knockknock() {
        let app = app_with(&[]).await;
        let (status, body) = get(&app, "/knockknock").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));

        let (status, _) = get(&app, "/knockknock/").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_add_favorite_movie() {
        let app = app_with(&[(ItemKind::Movie, "The Main")]).await;
        let body = json!({"title": "The Main", "user_id": 1, "custom_title": "My Custom Title"});

        let (status, first) = post(&app, "/favourite/movie", body.clone()).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(first["success"], "Movie added as favorite");
        assert!(first["favorite_movie"].is_i64());

        let (status, second) = post(&app, "/favourite/movie", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["success"], "Movie already added as favorite");
        assert_eq!(second["favorite_movie"], first["favorite_movie"]);
    }

    #[tokio::test]
    async fn test_add_favorite_movie_errors() {
        let app = app_with(&[(ItemKind::Movie, "The Main")]).await;

        let (status, body) = post(&app, "/favourite/movie", json!({"user_id": 1})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Missing required data"}));

        let (status, body) = post(&app, "/favourite/movie", json!({"title": "The Main"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required data");

        let (status, body) = post(
            &app,
            "/favourite/movie",
            json!({"title": "Not Found", "user_id": 1, "custom_title": "x"}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Movie not found"}));

        let req = Request::builder()
            .method("POST")
            .uri("/favourite/movie")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid request body");
    }

    #[tokio::test]
    async fn test_add_favorite_planet_scenario() {
        let app = app_with(&[(ItemKind::Planet, "Earth")]).await;
        let body = json!({"name": "Earth", "user_id": "1", "custom_name": "Home"});

        let (status, first) = post(&app, "/favourite/planet", body.clone()).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(first["success"], "Planet added as favorite");

        let (status, second) = post(&app, "/favourite/planet", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["success"], "Planet already added as favorite");
        assert_eq!(second["favorite_planet"], first["favorite_planet"]);

        let (status, body) = post(&app, "/favourite/planet", json!({"name": "Test Planet"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required data");

        let (status, body) = post(
            &app,
            "/favourite/planet",
            json!({"name": "Non-existent Planet", "user_id": 1}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Planet not found");
    }

    #[tokio::test]
    async fn test_movie_listing_scenario() {
        let app = app_with(&[
            (ItemKind::Movie, "Inception"),
            (ItemKind::Movie, "The Dark Knight"),
        ])
        .await;
        post(
            &app,
            "/favourite/movie",
            json!({"title": "Inception", "user_id": 1, "custom_title": "My Inception"}),
        )
        .await;

        let (status, body) = get(&app, "/movies/?user_id=1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["next_page"], Value::Null);
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["title"], "The Dark Knight");
        assert_eq!(results[0]["is_favourite"], false);
        assert_eq!(results[1]["title"], "My Inception");
        assert_eq!(results[1]["is_favourite"], true);

        let (status, body) = get(&app, "/movies/?user_id=1&search_by=Inception").await;
        assert_eq!(status, StatusCode::OK);
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["title"], "My Inception");
        assert_eq!(results[0]["release_date"], "2010-07-16");
        assert_eq!(results[0]["is_favourite"], true);
    }

    #[tokio::test]
    async fn test_planet_listing() {
        let app = app_with(&[(ItemKind::Planet, "Earth"), (ItemKind::Planet, "Mars")]).await;
        post(
            &app,
            "/favourite/planet",
            json!({"name": "Earth", "user_id": 1, "custom_name": "My Earth"}),
        )
        .await;

        let (_, body) = get(&app, "/planets/?user_id=1").await;
        assert_eq!(body["results"].as_array().unwrap().len(), 2);

        let (status, body) = get(&app, "/planets?user_id=1&search_by=Mars").await;
        assert_eq!(status, StatusCode::OK);
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["name"], "Mars");
        assert_eq!(results[0]["url"], "http://localhost:8000/planets/4");
        assert_eq!(results[0]["is_favourite"], false);
        assert!(results[0].get("release_date").is_none());
    }

    #[tokio::test]
    async fn test_listing_edge_cases() {
        let app = app_with(&[(ItemKind::Planet, "Earth")]).await;

        let (status, body) = get(&app, "/planets/?page=7").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"next_page": null, "results": []}));

        let (status, body) = get(&app, "/planets/?search_by=jakku").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"next_page": null, "results": []}));

        let (status, body) = get(&app, "/planets/?user_id=&page=abc").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"].as_array().unwrap().len(), 1);

        let (status, body) = get(&app, "/planets/?user_id=luke").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid user_id");
    }

    #[tokio::test]
    async fn test_listing_next_page() {
        let names: Vec<String> = (1..=12).map(|i| format!("Planet {}", i)).collect();
        let items: Vec<(ItemKind, &str)> = names
            .iter()
            .map(|n| (ItemKind::Planet, n.as_str()))
            .collect();
        let app = app_with(&items).await;

        let (_, body) = get(&app, "/planets/?user_id=5&search_by=planet").await;
        assert_eq!(body["results"].as_array().unwrap().len(), 10);
        assert_eq!(body["results"][0]["name"], "Planet 12");
        let next = body["next_page"].as_str().unwrap().to_string();
        assert_eq!(next, "/planets/?page=2&search_by=planet&user_id=5");

        let (_, body) = get(&app, &next).await;
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1]["name"], "Planet 1");
        assert_eq!(body["next_page"], Value::Null);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = app_with(&[]).await;
        let (status, body) = get(&app, "/death-star").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not found");
    }
}
