use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, warn};

use super::cache::ListingCache;
use super::CatalogError;
use crate::db::{CatalogItem, FavoriteMark, FavoriteRepo, ItemKind, ItemRepo, Repository};

pub const PAGE_SIZE: usize = 10;

/// One listing request: which kind, on whose behalf, filtered how, which page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    pub kind: ItemKind,
    pub user_id: Option<i64>,
    pub search: Option<String>,
    pub page: u32,
}

impl ListingQuery {
    pub fn new(kind: ItemKind, user_id: Option<i64>, search: Option<String>, page: u32) -> Self {
        Self {
            kind,
            user_id,
            search: search.filter(|s| !s.is_empty()),
            page,
        }
    }

    /// `kind:user:search:page`, with absent parts left empty.
    pub fn cache_key(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.kind,
            self.user_id.map(|u| u.to_string()).unwrap_or_default(),
            self.search.as_deref().unwrap_or_default(),
            self.page
        )
    }

    fn link_to_page(&self, page: u32) -> String {
        let mut link = format!("/{}/?page={}", self.kind, page);
        if let Some(ref search) = self.search {
            link.push_str("&search_by=");
            link.push_str(&urlencoding::encode(search));
        }
        if let Some(user_id) = self.user_id {
            link.push_str(&format!("&user_id={}", user_id));
        }
        link
    }
}

/// A catalog item as seen by one user.
#[derive(Debug, Clone, PartialEq)]
pub struct ListedItem {
    pub kind: ItemKind,
    pub natural_key: String,
    pub label: String,
    pub release_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub url: String,
    pub is_favourite: bool,
}

// Movies carry `title` and `release_date`, planets only `name`.
impl Serialize for ListedItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self.kind {
            ItemKind::Movie => {
                map.serialize_entry("title", &self.label)?;
                map.serialize_entry("release_date", &self.release_date)?;
            }
            ItemKind::Planet => {
                map.serialize_entry("name", &self.label)?;
            }
        }
        map.serialize_entry("created_at", &self.created_at)?;
        map.serialize_entry("updated_at", &self.updated_at)?;
        map.serialize_entry("url", &self.url)?;
        map.serialize_entry("is_favourite", &self.is_favourite)?;
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ListingPage {
    pub next_page: Option<String>,
    pub results: Vec<ListedItem>,
}

/// Attach favorite status and display label to every item.
pub fn annotate(items: Vec<CatalogItem>, favorites: &[FavoriteMark]) -> Vec<ListedItem> {
    let labels: HashMap<i64, Option<&str>> = favorites
        .iter()
        .map(|f| (f.item_id, f.custom_label.as_deref().filter(|l| !l.is_empty())))
        .collect();

    items
        .into_iter()
        .map(|item| {
            let favorite = labels.get(&item.id);
            let label = favorite
                .copied()
                .flatten()
                .map(str::to_string)
                .unwrap_or_else(|| item.natural_key.clone());
            ListedItem {
                kind: item.kind,
                natural_key: item.natural_key,
                label,
                release_date: item.release_date,
                created_at: item.created_at,
                updated_at: item.updated_at,
                url: item.url,
                is_favourite: favorite.is_some(),
            }
        })
        .collect()
}

/// Filter, order and slice one page. `items` must be in insertion order so
/// that the stable sort keeps it for equal timestamps.
pub fn build_page(
    query: &ListingQuery,
    items: Vec<CatalogItem>,
    favorites: &[FavoriteMark],
) -> ListingPage {
    let needle = query.search.as_ref().map(|s| s.to_lowercase());

    let mut listed: Vec<ListedItem> = annotate(items, favorites)
        .into_iter()
        .filter(|item| match needle.as_deref() {
            Some(needle) => {
                item.natural_key.to_lowercase().contains(needle)
                    || item.label.to_lowercase().contains(needle)
            }
            None => true,
        })
        .collect();

    listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    if query.page == 0 {
        return ListingPage {
            next_page: None,
            results: Vec::new(),
        };
    }

    let start = (query.page as usize - 1).saturating_mul(PAGE_SIZE);
    if start >= listed.len() {
        return ListingPage {
            next_page: None,
            results: Vec::new(),
        };
    }

    let has_next = start + PAGE_SIZE < listed.len();
    let results: Vec<ListedItem> = listed.into_iter().skip(start).take(PAGE_SIZE).collect();

    ListingPage {
        next_page: has_next.then(|| query.link_to_page(query.page + 1)),
        results,
    }
}

pub struct ListingService {
    db: Arc<dyn Repository>,
    cache: Arc<dyn ListingCache>,
}

impl ListingService {
    pub fn new(db: Arc<dyn Repository>, cache: Arc<dyn ListingCache>) -> Self {
        Self { db, cache }
    }

    pub async fn list(&self, query: &ListingQuery) -> Result<ListingPage, CatalogError> {
        let key = query.cache_key();

        match self.cache.get_page(&key).await {
            Ok(Some(page)) => {
                debug!(cache_key = %key, "listing served from cache");
                return Ok(page);
            }
            Ok(None) => {}
            Err(e) => warn!(cache_key = %key, error = %e, "listing cache read failed, bypassing"),
        }

        let favorites = match query.user_id {
            Some(user_id) => self.db.list_favorites(query.kind, user_id).await?,
            None => Vec::new(),
        };
        let items = self.db.list_items(query.kind).await?;
        let page = build_page(query, items, &favorites);

        debug!(
            cache_key = %key,
            results = page.results.len(),
            has_next = page.next_page.is_some(),
            "listing computed"
        );

        if let Err(e) = self.cache.set_page(&key, &page).await {
            warn!(cache_key = %key, error = %e, "listing cache write failed");
        }

        Ok(page)
    }
}
