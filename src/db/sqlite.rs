use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use super::model::*;
use super::repo::*;

type ItemRow = (i64, String, Option<String>, String, String, String);
type FavoriteRow = (i64, i64, i64, Option<String>, String, String);

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub async fn new(db_path: &str) -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str(db_path)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let repo = Self { pool };
        repo.init_schema().await?;

        info!("Database initialized at {}", db_path);

        Ok(repo)
    }

    /// A private in-memory database. Pinned to one connection that never
    /// expires, since every SQLite memory connection is its own database.
    pub async fn in_memory() -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let repo = Self { pool };
        repo.init_schema().await?;
        Ok(repo)
    }

    async fn init_schema(&self) -> DbResult<()> {
        let schema = include_str!("schema.sql");
        sqlx::raw_sql(schema).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn now_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> DbResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::InvalidData(format!("bad timestamp {:?}: {}", s, e)))
}

fn parse_date(s: &str) -> DbResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| DbError::InvalidData(format!("bad date {:?}: {}", s, e)))
}

fn item_from_row(kind: ItemKind, row: ItemRow) -> DbResult<CatalogItem> {
    Ok(CatalogItem {
        id: row.0,
        kind,
        natural_key: row.1,
        release_date: row.2.as_deref().map(parse_date).transpose()?,
        url: row.3,
        created_at: parse_timestamp(&row.4)?,
        updated_at: parse_timestamp(&row.5)?,
    })
}

fn favorite_from_row(row: FavoriteRow) -> DbResult<FavoriteMark> {
    Ok(FavoriteMark {
        id: row.0,
        user_id: row.1,
        item_id: row.2,
        custom_label: row.3,
        created_at: parse_timestamp(&row.4)?,
        updated_at: parse_timestamp(&row.5)?,
    })
}

fn item_columns(kind: ItemKind) -> String {
    let release = match kind {
        ItemKind::Movie => "release_date",
        ItemKind::Planet => "NULL AS release_date",
    };
    format!(
        "id, {}, {}, url, created_at, updated_at",
        kind.key_column(),
        release
    )
}

fn favorite_columns(kind: ItemKind) -> String {
    format!(
        "id, user_id, {}, {}, created_at, updated_at",
        kind.favorite_ref_column(),
        kind.favorite_label_column()
    )
}

#[async_trait]
impl ItemRepo for SqliteRepository {
    async fn find_item_by_key(&self, kind: ItemKind, key: &str) -> DbResult<CatalogItem> {
        let query = format!(
            "SELECT {} FROM {} WHERE {} = ? COLLATE NOCASE ORDER BY id LIMIT 1",
            item_columns(kind),
            kind.table(),
            kind.key_column()
        );

        let row = sqlx::query_as::<_, ItemRow>(&query)
            .bind(key)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    DbError::NotFound(format!("{} not found: {}", kind.label(), key))
                }
                _ => DbError::Sqlx(e),
            })?;

        item_from_row(kind, row)
    }

    async fn list_items(&self, kind: ItemKind) -> DbResult<Vec<CatalogItem>> {
        let query = format!(
            "SELECT {} FROM {} ORDER BY id",
            item_columns(kind),
            kind.table()
        );

        let rows = sqlx::query_as::<_, ItemRow>(&query)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(|r| item_from_row(kind, r)).collect()
    }

    async fn upsert_item(&self, item: &NewCatalogItem) -> DbResult<CatalogItem> {
        let now = now_string();
        let kind = item.kind;

        match kind {
            ItemKind::Movie => {
                sqlx::query(
                    "INSERT INTO movies (title, release_date, url, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?)
                    ON CONFLICT (title) DO UPDATE SET
                        release_date = excluded.release_date,
                        url = excluded.url,
                        updated_at = excluded.updated_at",
                )
                .bind(&item.natural_key)
                .bind(item.release_date.map(|d| d.format("%Y-%m-%d").to_string()))
                .bind(&item.url)
                .bind(&now)
                .bind(&now)
                .execute(&self.pool)
                .await?;
            }
            ItemKind::Planet => {
                sqlx::query(
                    "INSERT INTO planets (name, url, created_at, updated_at)
                    VALUES (?, ?, ?, ?)
                    ON CONFLICT (name) DO UPDATE SET
                        url = excluded.url,
                        updated_at = excluded.updated_at",
                )
                .bind(&item.natural_key)
                .bind(&item.url)
                .bind(&now)
                .bind(&now)
                .execute(&self.pool)
                .await?;
            }
        }

        let query = format!(
            "SELECT {} FROM {} WHERE {} = ?",
            item_columns(kind),
            kind.table(),
            kind.key_column()
        );
        let row = sqlx::query_as::<_, ItemRow>(&query)
            .bind(&item.natural_key)
            .fetch_one(&self.pool)
            .await?;

        item_from_row(kind, row)
    }

    async fn delete_item(&self, kind: ItemKind, id: i64) -> DbResult<()> {
        sqlx::query(&format!("DELETE FROM {} WHERE id = ?", kind.table()))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl FavoriteRepo for SqliteRepository {
    async fn list_favorites(&self, kind: ItemKind, user_id: i64) -> DbResult<Vec<FavoriteMark>> {
        let query = format!(
            "SELECT {} FROM {} WHERE user_id = ? ORDER BY id",
            favorite_columns(kind),
            kind.favorite_table()
        );

        let rows = sqlx::query_as::<_, FavoriteRow>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(favorite_from_row).collect()
    }

    async fn get_or_create_favorite(
        &self,
        kind: ItemKind,
        user_id: i64,
        item_id: i64,
        custom_label: Option<&str>,
    ) -> DbResult<(FavoriteMark, bool)> {
        let now = now_string();

        // The unique (user_id, item) constraint decides the winner; a losing
        // insert is a no-op and falls through to the select below.
        let insert = format!(
            "INSERT INTO {table} (user_id, {item}, {label}, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (user_id, {item}) DO NOTHING",
            table = kind.favorite_table(),
            item = kind.favorite_ref_column(),
            label = kind.favorite_label_column(),
        );
        let result = sqlx::query(&insert)
            .bind(user_id)
            .bind(item_id)
            .bind(custom_label)
            .bind(&now)
            .bind(&now)
            .execute(&self.pool)
            .await?;
        let created = result.rows_affected() > 0;

        let select = format!(
            "SELECT {} FROM {} WHERE user_id = ? AND {} = ?",
            favorite_columns(kind),
            kind.favorite_table(),
            kind.favorite_ref_column()
        );
        let row = sqlx::query_as::<_, FavoriteRow>(&select)
            .bind(user_id)
            .bind(item_id)
            .fetch_one(&self.pool)
            .await?;

        debug!(kind = %kind, user_id, item_id, created, "get_or_create_favorite");

        Ok((favorite_from_row(row)?, created))
    }

    async fn count_favorites(&self, kind: ItemKind, user_id: i64, item_id: i64) -> DbResult<i64> {
        let query = format!(
            "SELECT COUNT(*) FROM {} WHERE user_id = ? AND {} = ?",
            kind.favorite_table(),
            kind.favorite_ref_column()
        );
        let (count,) = sqlx::query_as::<_, (i64,)>(&query)
            .bind(user_id)
            .bind(item_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
