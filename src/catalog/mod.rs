pub mod cache;
pub mod favorite;
pub mod importer;
pub mod listing;

pub use cache::*;
pub use favorite::*;
pub use importer::*;
pub use listing::*;

use crate::db::{DbError, ItemKind};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{0}")]
    Validation(String),
    #[error("{} not found", .0.label())]
    NotFound(ItemKind),
    #[error(transparent)]
    Database(#[from] DbError),
}
