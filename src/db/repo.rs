use async_trait::async_trait;

use super::model::*;

#[async_trait]
pub trait ItemRepo: Send + Sync {
    /// First item of `kind` whose natural key matches case-insensitively,
    /// lowest id first.
    async fn find_item_by_key(&self, kind: ItemKind, key: &str) -> DbResult<CatalogItem>;
    /// All items of `kind` in insertion order.
    async fn list_items(&self, kind: ItemKind) -> DbResult<Vec<CatalogItem>>;
    /// Insert or refresh an item by its exact natural key.
    async fn upsert_item(&self, item: &NewCatalogItem) -> DbResult<CatalogItem>;
    async fn delete_item(&self, kind: ItemKind, id: i64) -> DbResult<()>;
}

#[async_trait]
pub trait FavoriteRepo: Send + Sync {
    async fn list_favorites(&self, kind: ItemKind, user_id: i64) -> DbResult<Vec<FavoriteMark>>;
    /// Returns the mark for (user, item) and whether this call created it.
    async fn get_or_create_favorite(
        &self,
        kind: ItemKind,
        user_id: i64,
        item_id: i64,
        custom_label: Option<&str>,
    ) -> DbResult<(FavoriteMark, bool)>;
    async fn count_favorites(&self, kind: ItemKind, user_id: i64, item_id: i64) -> DbResult<i64>;
}

pub trait Repository: ItemRepo + FavoriteRepo + Send + Sync {}

impl<T: ItemRepo + FavoriteRepo + Send + Sync> Repository for T {}
