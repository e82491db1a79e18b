//! Domain persistence operations.
//!
//! Functions take a bare connection so the same statements run on a pooled
//! connection or inside a transaction.

use chrono::{DateTime, Utc};
use isp_core::{Domain, SystemError};
use sqlx::PgConnection;

use super::error::db_error;
use crate::repository::RepoResult;

const COLUMNS: &str = "id, name, description, system_id, created_at, updated_at";

pub async fn get_by_id(conn: &mut PgConnection, id: i32) -> RepoResult<Domain> {
    let sql = format!("SELECT {COLUMNS} FROM domain WHERE id = $1");
    let row = sqlx::query_as::<_, DomainRow>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(db_error)?;
    row.map(DomainRow::into_record)
        .ok_or(SystemError::DomainNotFound)
}

pub async fn get_by_id_list(conn: &mut PgConnection, ids: &[i32]) -> RepoResult<Vec<Domain>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM domain WHERE id = ANY($1) ORDER BY created_at DESC, id DESC"
    );
    let rows = sqlx::query_as::<_, DomainRow>(&sql)
        .bind(ids)
        .fetch_all(conn)
        .await
        .map_err(db_error)?;
    Ok(rows.into_iter().map(DomainRow::into_record).collect())
}

pub async fn get_by_system_id(
    conn: &mut PgConnection,
    system_id: i32,
) -> RepoResult<Vec<Domain>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM domain WHERE system_id = $1 ORDER BY created_at DESC, id DESC"
    );
    let rows = sqlx::query_as::<_, DomainRow>(&sql)
        .bind(system_id)
        .fetch_all(conn)
        .await
        .map_err(db_error)?;
    Ok(rows.into_iter().map(DomainRow::into_record).collect())
}

pub async fn get_by_name_and_system_id(
    conn: &mut PgConnection,
    name: &str,
    system_id: i32,
) -> RepoResult<Domain> {
    let sql = format!("SELECT {COLUMNS} FROM domain WHERE name = $1 AND system_id = $2");
    let row = sqlx::query_as::<_, DomainRow>(&sql)
        .bind(name)
        .bind(system_id)
        .fetch_optional(conn)
        .await
        .map_err(db_error)?;
    row.map(DomainRow::into_record)
        .ok_or(SystemError::DomainNotFound)
}

pub async fn create(
    conn: &mut PgConnection,
    name: &str,
    description: &str,
    system_id: i32,
) -> RepoResult<Domain> {
    let sql = format!(
        "INSERT INTO domain (name, description, system_id) VALUES ($1, $2, $3) RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, DomainRow>(&sql)
        .bind(name)
        .bind(description)
        .bind(system_id)
        .fetch_one(conn)
        .await
        .map_err(db_error)?;
    Ok(row.into_record())
}

pub async fn update(
    conn: &mut PgConnection,
    id: i32,
    name: &str,
    description: &str,
) -> RepoResult<Domain> {
    let sql = format!(
        "UPDATE domain SET name = $2, description = $3, updated_at = now()
         WHERE id = $1 RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, DomainRow>(&sql)
        .bind(id)
        .bind(name)
        .bind(description)
        .fetch_optional(conn)
        .await
        .map_err(db_error)?;
    row.map(DomainRow::into_record)
        .ok_or(SystemError::DomainNotFound)
}

pub async fn delete_by_id_list(conn: &mut PgConnection, ids: &[i32]) -> RepoResult<u64> {
    let result = sqlx::query("DELETE FROM domain WHERE id = ANY($1)")
        .bind(ids)
        .execute(conn)
        .await
        .map_err(db_error)?;
    Ok(result.rows_affected())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct DomainRow {
    id: i32,
    name: String,
    description: String,
    system_id: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DomainRow {
    fn into_record(self) -> Domain {
        Domain {
            id: self.id,
            name: self.name,
            description: self.description,
            system_id: self.system_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
