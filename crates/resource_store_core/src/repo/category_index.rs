//! Category index maintenance.
//!
//! The index is the `resource_categories` table: one row per resource,
//! keyed by `(category, resource_id)`. Every function here runs on the
//! caller's transaction, so index rows commit or roll back together with the
//! resource rows they describe.

use crate::model::category::CategoryId;
use crate::model::resource::ResourceId;
use crate::repo::resource_repo::{parse_resource_id, RepoError, RepoResult};
use rusqlite::{params, Connection};

/// Registers `resource_id` as a member of `category`.
pub(crate) fn insert_entry(
    conn: &Connection,
    resource_id: ResourceId,
    category: CategoryId,
) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO resource_categories (category, resource_id) VALUES (?1, ?2);",
        params![category.0, resource_id.to_string()],
    )?;
    Ok(())
}

/// Points the entry of `resource_id` at `category`, creating it if missing.
pub(crate) fn set_entry(
    conn: &Connection,
    resource_id: ResourceId,
    category: CategoryId,
) -> RepoResult<()> {
    remove_entry(conn, resource_id)?;
    insert_entry(conn, resource_id, category)
}

/// Drops the entry of `resource_id`. Missing entries are not an error.
pub(crate) fn remove_entry(conn: &Connection, resource_id: ResourceId) -> RepoResult<()> {
    conn.execute(
        "DELETE FROM resource_categories WHERE resource_id = ?1;",
        [resource_id.to_string()],
    )?;
    Ok(())
}

/// Lists member ids of `category` in ascending id order.
pub(crate) fn member_ids(conn: &Connection, category: CategoryId) -> RepoResult<Vec<ResourceId>> {
    let mut stmt = conn.prepare(
        "SELECT resource_id
         FROM resource_categories
         WHERE category = ?1
         ORDER BY resource_id ASC;",
    )?;
    let mut rows = stmt.query([category.0])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        ids.push(parse_resource_id(&value, "resource_categories.resource_id")?);
    }
    Ok(ids)
}

/// Counts resources whose index entry is missing or names another category,
/// plus index entries whose resource row is gone.
pub(crate) fn count_mismatches(conn: &Connection) -> RepoResult<u64> {
    let missing_or_stale: i64 = conn.query_row(
        "SELECT COUNT(*)
         FROM resources r
         LEFT JOIN resource_categories rc ON rc.resource_id = r.id
         WHERE rc.resource_id IS NULL OR rc.category <> r.category;",
        [],
        |row| row.get(0),
    )?;
    let dangling: i64 = conn.query_row(
        "SELECT COUNT(*)
         FROM resource_categories rc
         LEFT JOIN resources r ON r.id = rc.resource_id
         WHERE r.id IS NULL;",
        [],
        |row| row.get(0),
    )?;
    let total = missing_or_stale + dangling;
    u64::try_from(total)
        .map_err(|_| RepoError::InvalidData(format!("negative category index mismatch count {total}")))
}
