//! Application group persistence operations (`app_group` table).

use chrono::{DateTime, Utc};
use isp_core::{AppGroup, SystemError};
use sqlx::PgConnection;

use super::error::db_error;
use crate::repository::RepoResult;

const COLUMNS: &str = "id, name, description, domain_id, created_at, updated_at";

pub async fn get_by_id(conn: &mut PgConnection, id: i32) -> RepoResult<AppGroup> {
    let sql = format!("SELECT {COLUMNS} FROM app_group WHERE id = $1");
    let row = sqlx::query_as::<_, AppGroupRow>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(db_error)?;
    row.map(AppGroupRow::into_record)
        .ok_or(SystemError::AppGroupNotFound)
}

pub async fn get_by_id_list(conn: &mut PgConnection, ids: &[i32]) -> RepoResult<Vec<AppGroup>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM app_group WHERE id = ANY($1) ORDER BY created_at DESC, id DESC"
    );
    let rows = sqlx::query_as::<_, AppGroupRow>(&sql)
        .bind(ids)
        .fetch_all(conn)
        .await
        .map_err(db_error)?;
    Ok(rows.into_iter().map(AppGroupRow::into_record).collect())
}

pub async fn get_by_domain_ids(
    conn: &mut PgConnection,
    domain_ids: &[i32],
) -> RepoResult<Vec<AppGroup>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM app_group WHERE domain_id = ANY($1)
         ORDER BY created_at DESC, id DESC"
    );
    let rows = sqlx::query_as::<_, AppGroupRow>(&sql)
        .bind(domain_ids)
        .fetch_all(conn)
        .await
        .map_err(db_error)?;
    Ok(rows.into_iter().map(AppGroupRow::into_record).collect())
}

pub async fn get_all(conn: &mut PgConnection) -> RepoResult<Vec<AppGroup>> {
    let sql = format!("SELECT {COLUMNS} FROM app_group ORDER BY created_at DESC, id DESC");
    let rows = sqlx::query_as::<_, AppGroupRow>(&sql)
        .fetch_all(conn)
        .await
        .map_err(db_error)?;
    Ok(rows.into_iter().map(AppGroupRow::into_record).collect())
}

pub async fn get_by_name_and_domain_id(
    conn: &mut PgConnection,
    name: &str,
    domain_id: i32,
) -> RepoResult<AppGroup> {
    let sql = format!("SELECT {COLUMNS} FROM app_group WHERE name = $1 AND domain_id = $2");
    let row = sqlx::query_as::<_, AppGroupRow>(&sql)
        .bind(name)
        .bind(domain_id)
        .fetch_optional(conn)
        .await
        .map_err(db_error)?;
    row.map(AppGroupRow::into_record)
        .ok_or(SystemError::AppGroupNotFound)
}

pub async fn create(
    conn: &mut PgConnection,
    name: &str,
    description: &str,
    domain_id: i32,
) -> RepoResult<AppGroup> {
    let sql = format!(
        "INSERT INTO app_group (name, description, domain_id) VALUES ($1, $2, $3)
         RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, AppGroupRow>(&sql)
        .bind(name)
        .bind(description)
        .bind(domain_id)
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
) -> RepoResult<AppGroup> {
    let sql = format!(
        "UPDATE app_group SET name = $2, description = $3, updated_at = now()
         WHERE id = $1 RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, AppGroupRow>(&sql)
        .bind(id)
        .bind(name)
        .bind(description)
        .fetch_optional(conn)
        .await
        .map_err(db_error)?;
    row.map(AppGroupRow::into_record)
        .ok_or(SystemError::AppGroupNotFound)
}

pub async fn delete_by_id_list(conn: &mut PgConnection, ids: &[i32]) -> RepoResult<u64> {
    let result = sqlx::query("DELETE FROM app_group WHERE id = ANY($1)")
        .bind(ids)
        .execute(conn)
        .await
        .map_err(db_error)?;
    Ok(result.rows_affected())
}

#[derive(sqlx::FromRow)]
struct AppGroupRow {
    id: i32,
    name: String,
    description: String,
    domain_id: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AppGroupRow {
    fn into_record(self) -> AppGroup {
        AppGroup {
            id: self.id,
            name: self.name,
            description: self.description,
            domain_id: self.domain_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
