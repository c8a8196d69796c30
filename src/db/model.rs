use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two kinds of catalog records we mirror. Each kind lives in its own
/// entity table with its own favorites join table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Movie,
    Planet,
}

impl ItemKind {
    /// Plural name, used for routes and cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Movie => "movies",
            ItemKind::Planet => "planets",
        }
    }

    /// Human name used in response messages.
    pub fn label(&self) -> &'static str {
        match self {
            ItemKind::Movie => "Movie",
            ItemKind::Planet => "Planet",
        }
    }

    pub(crate) fn table(&self) -> &'static str {
        match self {
            ItemKind::Movie => "movies",
            ItemKind::Planet => "planets",
        }
    }

    pub(crate) fn key_column(&self) -> &'static str {
        match self {
            ItemKind::Movie => "title",
            ItemKind::Planet => "name",
        }
    }

    pub(crate) fn favorite_table(&self) -> &'static str {
        match self {
            ItemKind::Movie => "favorite_movies",
            ItemKind::Planet => "favorite_planets",
        }
    }

    pub(crate) fn favorite_ref_column(&self) -> &'static str {
        match self {
            ItemKind::Movie => "movie_id",
            ItemKind::Planet => "planet_id",
        }
    }

    pub(crate) fn favorite_label_column(&self) -> &'static str {
        match self {
            ItemKind::Movie => "custom_title",
            ItemKind::Planet => "custom_name",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: i64,
    pub kind: ItemKind,
    pub natural_key: String,
    pub url: String,
    pub release_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A record as delivered by the importer, before it has an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCatalogItem {
    pub kind: ItemKind,
    pub natural_key: String,
    pub url: String,
    pub release_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteMark {
    pub id: i64,
    pub user_id: i64,
    pub item_id: i64,
    pub custom_label: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

pub type DbResult<T> = Result<T, DbError>;
