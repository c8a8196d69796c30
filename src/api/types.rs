use serde::{Deserialize, Serialize};

use crate::catalog::FavoriteRequest;

/// `user_id` arrives either as a JSON number or as a numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum UserIdInput {
    Number(i64),
    Text(String),
}

impl UserIdInput {
    pub fn as_id(&self) -> Option<i64> {
        match self {
            UserIdInput::Number(n) => Some(*n),
            UserIdInput::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FavoriteMovieBody {
    pub title: Option<String>,
    pub user_id: Option<UserIdInput>,
    pub custom_title: Option<String>,
}

impl From<FavoriteMovieBody> for FavoriteRequest {
    fn from(body: FavoriteMovieBody) -> Self {
        FavoriteRequest {
            natural_key: body.title,
            user_id: body.user_id.as_ref().and_then(UserIdInput::as_id),
            custom_label: body.custom_title,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FavoritePlanetBody {
    pub name: Option<String>,
    pub user_id: Option<UserIdInput>,
    pub custom_name: Option<String>,
}

impl From<FavoritePlanetBody> for FavoriteRequest {
    fn from(body: FavoritePlanetBody) -> Self {
        FavoriteRequest {
            natural_key: body.name,
            user_id: body.user_id.as_ref().and_then(UserIdInput::as_id),
            custom_label: body.custom_name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FavoriteMovieResponse {
    pub success: String,
    pub favorite_movie: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FavoritePlanetResponse {
    pub success: String,
    pub favorite_planet: i64,
}

/// Query string of the listing endpoints. Kept as raw strings so that the
/// handler decides how lenient to be.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub user_id: Option<String>,
    pub search_by: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
