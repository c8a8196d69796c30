use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::CatalogConfig;
use crate::db::{DbError, ItemKind, ItemRepo, NewCatalogItem, Repository};

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

/// One page of the external catalog API.
#[derive(Debug, Deserialize)]
struct CatalogPage<T> {
    next: Option<String>,
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct PlanetRecord {
    name: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct FilmRecord {
    title: String,
    #[serde(default)]
    release_date: Option<String>,
    url: String,
}

impl From<PlanetRecord> for NewCatalogItem {
    fn from(record: PlanetRecord) -> Self {
        NewCatalogItem {
            kind: ItemKind::Planet,
            natural_key: record.name,
            url: record.url,
            release_date: None,
        }
    }
}

impl From<FilmRecord> for NewCatalogItem {
    fn from(record: FilmRecord) -> Self {
        let release_date = record.release_date.as_deref().and_then(|d| {
            NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .map_err(|e| warn!(title = %record.title, date = d, "Unparseable release date: {}", e))
                .ok()
        });
        NewCatalogItem {
            kind: ItemKind::Movie,
            natural_key: record.title,
            url: record.url,
            release_date,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub planets: usize,
    pub movies: usize,
}

/// Mirrors the external catalog into the local store.
pub struct Importer {
    client: reqwest::Client,
    db: Arc<dyn Repository>,
    config: CatalogConfig,
}

impl Importer {
    pub fn new(db: Arc<dyn Repository>, config: CatalogConfig) -> Result<Self, ImportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, db, config })
    }

    pub async fn run(&self) -> Result<ImportSummary, ImportError> {
        let planets = self
            .import::<PlanetRecord>(ItemKind::Planet, &self.config.planet_data_url)
            .await?;
        let movies = self
            .import::<FilmRecord>(ItemKind::Movie, &self.config.movie_data_url)
            .await?;

        let summary = ImportSummary { planets, movies };
        info!(planets, movies, "Catalog import finished");
        Ok(summary)
    }

    /// Follow `next` links from `start_url` until the API reports no more
    /// pages or answers with an error status.
    async fn import<T>(&self, kind: ItemKind, start_url: &str) -> Result<usize, ImportError>
    where
        T: DeserializeOwned + Into<NewCatalogItem>,
    {
        let mut url = Some(start_url.to_string());
        let mut count = 0;

        while let Some(current) = url.take() {
            let response = self.client.get(&current).send().await?;
            let status = response.status();
            info!(kind = %kind, url = %current, status = status.as_u16(), "Fetched catalog page");

            if !status.is_success() {
                warn!(kind = %kind, url = %current, status = status.as_u16(), "Stopping import");
                break;
            }

            let page: CatalogPage<T> = response.json().await?;
            for record in page.results {
                self.db.upsert_item(&record.into()).await?;
                count += 1;
            }
            url = page.next;
        }

        Ok(count)
    }
}
