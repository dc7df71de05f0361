//! Resource repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide atomic write/read APIs over the `resources` table.
//! - Enforce identifier uniqueness for primary and derived records.
//! - Keep the category index in step with every resource row.
//!
//! # Invariants
//! - Writes run in one `IMMEDIATE` transaction, so the existence check and
//!   the insert cannot interleave with another writer for the same id.
//! - Write paths call `Resource::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::category::CategoryId;
use crate::model::resource::{
    Attachment, DerivedWrite, Resource, ResourceContent, ResourceId, ResourceValidationError,
    WriteSet,
};
use crate::repo::category_index;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

const RESOURCE_SELECT_SQL: &str = "SELECT
    id,
    category,
    location,
    attachment_id,
    attachment_location
FROM resources";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for resource persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ResourceValidationError),
    Db(DbError),
    NotFound(ResourceId),
    AlreadyExists(ResourceId),
    InvalidData(String),
    MissingRequiredTable(&'static str),
    /// A thread panicked while holding the connection.
    ConnectionPoisoned,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "resource not found: {id}"),
            Self::AlreadyExists(id) => write!(f, "resource already exists: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted resource data: {message}"),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::ConnectionPoisoned => write!(f, "resource store connection is poisoned"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceValidationError> for RepoError {
    fn from(value: ResourceValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for the resource store.
pub trait ResourceRepository {
    /// Inserts all records and their index entries in one transaction.
    ///
    /// Fails with `AlreadyExists` on the first id that is already taken
    /// (including an id repeated inside `resources`); nothing is persisted
    /// in that case.
    fn insert_resources(&self, resources: &[Resource]) -> RepoResult<()>;

    /// Loads resource `id`, lets `plan` derive the write set from it, and
    /// commits that write set in the same transaction.
    ///
    /// Fails with `NotFound` when `id` does not exist. Errors returned by
    /// `plan` roll the transaction back unchanged.
    fn modify_resource<E, F>(&self, id: ResourceId, plan: F) -> Result<WriteSet, E>
    where
        E: From<RepoError>,
        F: FnOnce(&Resource) -> Result<WriteSet, E>;

    /// Removes one resource and its index entry.
    ///
    /// When `with_attachment` is set, the derived record named by the
    /// resource's attachment is removed in the same transaction if it still
    /// exists. Returns the ids actually removed, primary first.
    fn delete_resource(&self, id: ResourceId, with_attachment: bool)
        -> RepoResult<Vec<ResourceId>>;

    fn get_resource(&self, id: ResourceId) -> RepoResult<Option<Resource>>;

    /// Returns the subset of `ids` that exist, sorted ascending by id.
    fn get_resources(&self, ids: &[ResourceId]) -> RepoResult<Vec<Resource>>;

    /// Returns every resource indexed under `category`, sorted by id.
    fn list_by_category(&self, category: CategoryId) -> RepoResult<Vec<Resource>>;

    /// Number of inconsistencies between `resources` and the category index.
    fn category_index_mismatches(&self) -> RepoResult<u64>;
}

impl<T: ResourceRepository> ResourceRepository for &T {
    fn insert_resources(&self, resources: &[Resource]) -> RepoResult<()> {
        (**self).insert_resources(resources)
    }

    fn modify_resource<E, F>(&self, id: ResourceId, plan: F) -> Result<WriteSet, E>
    where
        E: From<RepoError>,
        F: FnOnce(&Resource) -> Result<WriteSet, E>,
    {
        (**self).modify_resource(id, plan)
    }

    fn delete_resource(
        &self,
        id: ResourceId,
        with_attachment: bool,
    ) -> RepoResult<Vec<ResourceId>> {
        (**self).delete_resource(id, with_attachment)
    }

    fn get_resource(&self, id: ResourceId) -> RepoResult<Option<Resource>> {
        (**self).get_resource(id)
    }

    fn get_resources(&self, ids: &[ResourceId]) -> RepoResult<Vec<Resource>> {
        (**self).get_resources(ids)
    }

    fn list_by_category(&self, category: CategoryId) -> RepoResult<Vec<Resource>> {
        (**self).list_by_category(category)
    }

    fn category_index_mismatches(&self) -> RepoResult<u64> {
        (**self).category_index_mismatches()
    }
}

impl<T: ResourceRepository> ResourceRepository for Arc<T> {
    fn insert_resources(&self, resources: &[Resource]) -> RepoResult<()> {
        self.as_ref().insert_resources(resources)
    }

    fn modify_resource<E, F>(&self, id: ResourceId, plan: F) -> Result<WriteSet, E>
    where
        E: From<RepoError>,
        F: FnOnce(&Resource) -> Result<WriteSet, E>,
    {
        self.as_ref().modify_resource(id, plan)
    }

    fn delete_resource(
        &self,
        id: ResourceId,
        with_attachment: bool,
    ) -> RepoResult<Vec<ResourceId>> {
        self.as_ref().delete_resource(id, with_attachment)
    }

    fn get_resource(&self, id: ResourceId) -> RepoResult<Option<Resource>> {
        self.as_ref().get_resource(id)
    }

    fn get_resources(&self, ids: &[ResourceId]) -> RepoResult<Vec<Resource>> {
        self.as_ref().get_resources(ids)
    }

    fn list_by_category(&self, category: CategoryId) -> RepoResult<Vec<Resource>> {
        self.as_ref().list_by_category(category)
    }

    fn category_index_mismatches(&self) -> RepoResult<u64> {
        self.as_ref().category_index_mismatches()
    }
}

/// SQLite-backed resource store.
///
/// Owns its connection behind a mutex so one instance can be shared between
/// threads (by reference or `Arc`). Several instances may also point at the
/// same database file; SQLite's write lock then serializes their writers.
pub struct SqliteResourceRepository {
    conn: Mutex<Connection>,
}

impl SqliteResourceRepository {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_resource_connection_ready(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens (and migrates) a database file and wraps it as a store.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::try_new(open_db(path)?)
    }

    /// Opens an isolated in-memory store.
    pub fn open_in_memory() -> RepoResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| RepoError::ConnectionPoisoned)
    }
}

impl ResourceRepository for SqliteResourceRepository {
    fn insert_resources(&self, resources: &[Resource]) -> RepoResult<()> {
        for resource in resources {
            resource.validate()?;
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        for resource in resources {
            if resource_exists(&tx, resource.id)? {
                return Err(RepoError::AlreadyExists(resource.id));
            }
            insert_row(&tx, resource)?;
            category_index::insert_entry(&tx, resource.id, resource.category)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn modify_resource<E, F>(&self, id: ResourceId, plan: F) -> Result<WriteSet, E>
    where
        E: From<RepoError>,
        F: FnOnce(&Resource) -> Result<WriteSet, E>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RepoError::from)?;

        let existing = load_resource(&tx, id)?.ok_or(RepoError::NotFound(id))?;
        let write_set = plan(&existing)?;
        if write_set.primary.id != id {
            return Err(RepoError::InvalidData(format!(
                "write set primary `{}` does not match modified resource `{id}`",
                write_set.primary.id
            ))
            .into());
        }
        write_set.primary.validate().map_err(RepoError::from)?;

        update_row(&tx, &write_set.primary)?;
        category_index::set_entry(&tx, id, write_set.primary.category)?;

        match &write_set.derived {
            Some(DerivedWrite::Create(derived)) => {
                derived.validate().map_err(RepoError::from)?;
                if resource_exists(&tx, derived.id)? {
                    return Err(RepoError::AlreadyExists(derived.id).into());
                }
                insert_row(&tx, derived)?;
                category_index::insert_entry(&tx, derived.id, derived.category)?;
            }
            Some(DerivedWrite::Replace(derived)) => {
                derived.validate().map_err(RepoError::from)?;
                match load_resource(&tx, derived.id)? {
                    Some(current) if is_derived_shape(&current) => {
                        update_row(&tx, derived)?;
                        category_index::set_entry(&tx, derived.id, derived.category)?;
                    }
                    Some(_) => return Err(RepoError::AlreadyExists(derived.id).into()),
                    None => {
                        insert_row(&tx, derived)?;
                        category_index::insert_entry(&tx, derived.id, derived.category)?;
                    }
                }
            }
            None => {}
        }

        tx.commit().map_err(RepoError::from)?;
        Ok(write_set)
    }

    fn delete_resource(
        &self,
        id: ResourceId,
        with_attachment: bool,
    ) -> RepoResult<Vec<ResourceId>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing = load_resource(&tx, id)?.ok_or(RepoError::NotFound(id))?;
        let mut removed = vec![id];
        delete_row(&tx, id)?;

        if with_attachment {
            if let Some(Attachment {
                id: attachment_id, ..
            }) = existing.content.attachment
            {
                if attachment_id != id && resource_exists(&tx, attachment_id)? {
                    delete_row(&tx, attachment_id)?;
                    removed.push(attachment_id);
                }
            }
        }

        tx.commit()?;
        Ok(removed)
    }

    fn get_resource(&self, id: ResourceId) -> RepoResult<Option<Resource>> {
        let conn = self.lock()?;
        load_resource(&conn, id)
    }

    fn get_resources(&self, ids: &[ResourceId]) -> RepoResult<Vec<Resource>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let placeholders = vec!["?"; ids.len()].join(", ");
        let resources = {
            let mut stmt = tx.prepare(&format!(
                "{RESOURCE_SELECT_SQL}
                 WHERE id IN ({placeholders})
                 ORDER BY id ASC;"
            ))?;
            let mut rows = stmt.query(params_from_iter(ids.iter().map(|id| id.to_string())))?;
            let mut resources = Vec::new();
            while let Some(row) = rows.next()? {
                resources.push(parse_resource_row(row)?);
            }
            resources
        };
        tx.commit()?;
        Ok(resources)
    }

    fn list_by_category(&self, category: CategoryId) -> RepoResult<Vec<Resource>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut resources = Vec::new();
        for id in category_index::member_ids(&tx, category)? {
            let resource = load_resource(&tx, id)?.ok_or_else(|| {
                RepoError::InvalidData(format!("category index references missing resource `{id}`"))
            })?;
            resources.push(resource);
        }
        tx.commit()?;
        Ok(resources)
    }

    fn category_index_mismatches(&self) -> RepoResult<u64> {
        let conn = self.lock()?;
        category_index::count_mismatches(&conn)
    }
}

fn resource_exists(conn: &Connection, id: ResourceId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM resources WHERE id = ?1);",
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn load_resource(conn: &Connection, id: ResourceId) -> RepoResult<Option<Resource>> {
    let mut stmt = conn.prepare(&format!("{RESOURCE_SELECT_SQL} WHERE id = ?1;"))?;
    let parsed = stmt
        .query_row([id.to_string()], |row| Ok(parse_resource_row(row)))
        .optional()?;
    parsed.transpose()
}

fn insert_row(conn: &Connection, resource: &Resource) -> RepoResult<()> {
    let (attachment_id, attachment_location) = attachment_columns(&resource.content);
    conn.execute(
        "INSERT INTO resources (
            id,
            category,
            location,
            attachment_id,
            attachment_location
        ) VALUES (?1, ?2, ?3, ?4, ?5);",
        params![
            resource.id.to_string(),
            resource.category.0,
            resource.content.location.as_str(),
            attachment_id,
            attachment_location,
        ],
    )?;
    Ok(())
}

fn update_row(conn: &Connection, resource: &Resource) -> RepoResult<()> {
    let (attachment_id, attachment_location) = attachment_columns(&resource.content);
    let changed = conn.execute(
        "UPDATE resources
         SET
            category = ?1,
            location = ?2,
            attachment_id = ?3,
            attachment_location = ?4,
            updated_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?5;",
        params![
            resource.category.0,
            resource.content.location.as_str(),
            attachment_id,
            attachment_location,
            resource.id.to_string(),
        ],
    )?;

    if changed == 0 {
        return Err(RepoError::NotFound(resource.id));
    }
    Ok(())
}

/// A row that may be rewritten as a derived record: `Content` category and
/// no attachment of its own.
fn is_derived_shape(resource: &Resource) -> bool {
    resource.category == CategoryId::CONTENT && resource.content.attachment.is_none()
}

fn delete_row(conn: &Connection, id: ResourceId) -> RepoResult<()> {
    category_index::remove_entry(conn, id)?;
    let changed = conn.execute("DELETE FROM resources WHERE id = ?1;", [id.to_string()])?;
    if changed == 0 {
        return Err(RepoError::NotFound(id));
    }
    Ok(())
}

fn attachment_columns(content: &ResourceContent) -> (Option<String>, Option<&str>) {
    match &content.attachment {
        Some(attachment) => (
            Some(attachment.id.to_string()),
            Some(attachment.location.as_str()),
        ),
        None => (None, None),
    }
}

fn parse_resource_row(row: &Row<'_>) -> RepoResult<Resource> {
    let id_text: String = row.get("id")?;
    let id = parse_resource_id(&id_text, "resources.id")?;

    let attachment = match (
        row.get::<_, Option<String>>("attachment_id")?,
        row.get::<_, Option<String>>("attachment_location")?,
    ) {
        (Some(attachment_id), Some(location)) => Some(Attachment {
            id: parse_resource_id(&attachment_id, "resources.attachment_id")?,
            location,
        }),
        (None, None) => None,
        _ => {
            return Err(RepoError::InvalidData(format!(
                "half-populated attachment columns for resource `{id_text}`"
            )));
        }
    };

    let resource = Resource {
        id,
        category: CategoryId(row.get("category")?),
        content: ResourceContent {
            location: row.get("location")?,
            attachment,
        },
    };
    resource.validate()?;
    Ok(resource)
}

pub(crate) fn parse_resource_id(value: &str, column: &'static str) -> RepoResult<ResourceId> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

fn ensure_resource_connection_ready(conn: &Connection) -> RepoResult<()> {
    for table in ["resources", "resource_categories"] {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}
