use std::sync::Arc;

use tracing::{error, info, warn};

use super::CatalogError;
use crate::db::{DbError, FavoriteRepo, ItemKind, ItemRepo, Repository};

/// Request to mark an item as a user's favorite, as received from a caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FavoriteRequest {
    pub natural_key: Option<String>,
    pub user_id: Option<i64>,
    pub custom_label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FavoriteOutcome {
    pub created: bool,
    pub favorite_id: i64,
}

pub struct FavoriteService {
    db: Arc<dyn Repository>,
}

impl FavoriteService {
    pub fn new(db: Arc<dyn Repository>) -> Self {
        Self { db }
    }

    /// Idempotently create the favorite mark. A custom label sent with a
    /// request for an already favorited item is ignored.
    pub async fn add_favorite(
        &self,
        kind: ItemKind,
        request: &FavoriteRequest,
    ) -> Result<FavoriteOutcome, CatalogError> {
        let key = request
            .natural_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty());
        let user_id = request.user_id.filter(|&id| id != 0);

        info!(
            kind = %kind,
            key = ?request.natural_key,
            user_id = ?request.user_id,
            "adding favourite"
        );

        let (key, user_id) = match (key, user_id) {
            (Some(key), Some(user_id)) => (key, user_id),
            _ => {
                error!(
                    kind = %kind,
                    key = ?request.natural_key,
                    user_id = ?request.user_id,
                    "Missing required data"
                );
                return Err(CatalogError::Validation("Missing required data".to_string()));
            }
        };

        let item = match self.db.find_item_by_key(kind, key).await {
            Ok(item) => item,
            Err(DbError::NotFound(_)) => {
                error!(kind = %kind, key, "{} not found", kind.label());
                return Err(CatalogError::NotFound(kind));
            }
            Err(e) => return Err(e.into()),
        };

        let custom_label = request.custom_label.as_deref().filter(|l| !l.is_empty());
        let (mark, created) = self
            .db
            .get_or_create_favorite(kind, user_id, item.id, custom_label)
            .await?;

        if created {
            info!(kind = %kind, key, user_id, favorite_id = mark.id, "{} added as favorite", kind.label());
        } else {
            warn!(kind = %kind, key, user_id, favorite_id = mark.id, "{} already added as favorite", kind.label());
        }

        Ok(FavoriteOutcome {
            created,
            favorite_id: mark.id,
        })
    }
}
