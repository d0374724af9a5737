//! `SQLite` implementation of [`ConfigEntryRepository`].

use std::future::Future;
use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use miotac_app::ports::ConfigEntryRepository;
use miotac_domain::config_entry::{ConfigEntry, EntryData};
use miotac_domain::device::Token;
use miotac_domain::error::{MiotError, NotFoundError};
use miotac_domain::id::EntryId;
use miotac_domain::time::{parse_rfc3339, to_rfc3339};

use crate::error::StorageError;

/// Wrapper for converting database rows into a domain [`ConfigEntry`].
struct Wrapper(ConfigEntry);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let entry_id: String = row.try_get("entry_id")?;
        let token: String = row.try_get("token")?;
        let retries: i64 = row.try_get("retries")?;
        let created_at: String = row.try_get("created_at")?;

        let entry_id = EntryId::from_str(&entry_id).map_err(decode)?;
        let token = Token::parse(&token).map_err(decode)?;
        let retries = u32::try_from(retries).map_err(decode)?;
        let created_at = parse_rfc3339(&created_at).map_err(decode)?;

        Ok(Self(ConfigEntry {
            entry_id,
            unique_id: row.try_get("unique_id")?,
            title: row.try_get("title")?,
            data: EntryData {
                host: row.try_get("host")?,
                token,
                name: row.try_get("name")?,
                retries,
            },
            created_at,
        }))
    }
}

fn decode<E: std::error::Error + Send + Sync + 'static>(err: E) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}

const INSERT: &str = "INSERT INTO config_entries (entry_id, unique_id, title, host, token, name, retries, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)";
const SELECT_BY_ID: &str = "SELECT * FROM config_entries WHERE entry_id = ?";
const SELECT_BY_UNIQUE_ID: &str = "SELECT * FROM config_entries WHERE unique_id = ?";
const SELECT_ALL: &str = "SELECT * FROM config_entries ORDER BY created_at, entry_id";
const DELETE_BY_ID: &str = "DELETE FROM config_entries WHERE entry_id = ?";

/// `SQLite`-backed config entry repository.
#[derive(Debug, Clone)]
pub struct SqliteConfigEntryRepository {
    pool: SqlitePool,
}

impl SqliteConfigEntryRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl ConfigEntryRepository for SqliteConfigEntryRepository {
    fn create(
        &self,
        entry: ConfigEntry,
    ) -> impl Future<Output = Result<ConfigEntry, MiotError>> + Send {
        let pool = self.pool.clone();
        async move {
            entry.data.validate()?;
            sqlx::query(INSERT)
                .bind(entry.entry_id.to_string())
                .bind(&entry.unique_id)
                .bind(&entry.title)
                .bind(&entry.data.host)
                .bind(entry.data.token.expose())
                .bind(&entry.data.name)
                .bind(i64::from(entry.data.retries))
                .bind(to_rfc3339(entry.created_at))
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(entry)
        }
    }

    fn get_by_id(
        &self,
        id: EntryId,
    ) -> impl Future<Output = Result<Option<ConfigEntry>, MiotError>> + Send {
        let pool = self.pool.clone();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
                .bind(id.to_string())
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(row.map(|w| w.0))
        }
    }

    fn find_by_unique_id(
        &self,
        unique_id: &str,
    ) -> impl Future<Output = Result<Option<ConfigEntry>, MiotError>> + Send {
        let pool = self.pool.clone();
        let unique_id = unique_id.to_string();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_UNIQUE_ID)
                .bind(unique_id)
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(row.map(|w| w.0))
        }
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<ConfigEntry>, MiotError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }

    fn delete(&self, id: EntryId) -> impl Future<Output = Result<(), MiotError>> + Send {
        let pool = self.pool.clone();
        async move {
            let result = sqlx::query(DELETE_BY_ID)
                .bind(id.to_string())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            if result.rows_affected() == 0 {
                return Err(NotFoundError {
                    entity: "ConfigEntry",
                    id: id.to_string(),
                }
                .into());
            }
            tracing::debug!(entry_id = %id, "config entry deleted");
            Ok(())
        }
    }
}
