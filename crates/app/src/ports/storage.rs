//! Storage port: persistence of config entries.

use std::future::Future;
use std::sync::Arc;

use miotac_domain::config_entry::ConfigEntry;
use miotac_domain::error::MiotError;
use miotac_domain::id::EntryId;

/// CRUD for [`ConfigEntry`] records.
pub trait ConfigEntryRepository {
    /// Persist a new entry.
    fn create(
        &self,
        entry: ConfigEntry,
    ) -> impl Future<Output = Result<ConfigEntry, MiotError>> + Send;

    fn get_by_id(
        &self,
        id: EntryId,
    ) -> impl Future<Output = Result<Option<ConfigEntry>, MiotError>> + Send;

    /// Look an entry up by the `<model>-<mac>` id of its unit.
    fn find_by_unique_id(
        &self,
        unique_id: &str,
    ) -> impl Future<Output = Result<Option<ConfigEntry>, MiotError>> + Send;

    /// All entries, oldest first.
    fn get_all(&self) -> impl Future<Output = Result<Vec<ConfigEntry>, MiotError>> + Send;

    /// Delete an entry.
    ///
    /// Returns [`MiotError::NotFound`] when no entry has `id`.
    fn delete(&self, id: EntryId) -> impl Future<Output = Result<(), MiotError>> + Send;
}

impl<T: ConfigEntryRepository + Send + Sync> ConfigEntryRepository for Arc<T> {
    fn create(
        &self,
        entry: ConfigEntry,
    ) -> impl Future<Output = Result<ConfigEntry, MiotError>> + Send {
        (**self).create(entry)
    }

    fn get_by_id(
        &self,
        id: EntryId,
    ) -> impl Future<Output = Result<Option<ConfigEntry>, MiotError>> + Send {
        (**self).get_by_id(id)
    }

    fn find_by_unique_id(
        &self,
        unique_id: &str,
    ) -> impl Future<Output = Result<Option<ConfigEntry>, MiotError>> + Send {
        (**self).find_by_unique_id(unique_id)
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<ConfigEntry>, MiotError>> + Send {
        (**self).get_all()
    }

    fn delete(&self, id: EntryId) -> impl Future<Output = Result<(), MiotError>> + Send {
        (**self).delete(id)
    }
}
