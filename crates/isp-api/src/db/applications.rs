//! Application persistence operations.
//!
//! Application ids are chosen by callers. [`next_id`] is advisory only: a
//! concurrent insert may take the same id, in which case [`create`] fails
//! with `ApplicationDuplicateId` and the caller retries.

use chrono::{DateTime, Utc};
use isp_core::{Application, ApplicationType, NewApplication, SystemError};
use sqlx::PgConnection;

use super::error::db_error;
use crate::repository::RepoResult;

const COLUMNS: &str =
    "id, name, description, application_group_id, type, created_at, updated_at";

pub async fn get_by_id(conn: &mut PgConnection, id: i32) -> RepoResult<Application> {
    let sql = format!("SELECT {COLUMNS} FROM application WHERE id = $1");
    let row = sqlx::query_as::<_, ApplicationRow>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(db_error)?;
    row.ok_or(SystemError::ApplicationNotFound)?.into_record()
}

pub async fn get_by_id_list(conn: &mut PgConnection, ids: &[i32]) -> RepoResult<Vec<Application>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM application WHERE id = ANY($1) ORDER BY created_at DESC, id DESC"
    );
    let rows = sqlx::query_as::<_, ApplicationRow>(&sql)
        .bind(ids)
        .fetch_all(conn)
        .await
        .map_err(db_error)?;
    rows.into_iter().map(ApplicationRow::into_record).collect()
}

pub async fn get_by_app_group_ids(
    conn: &mut PgConnection,
    group_ids: &[i32],
) -> RepoResult<Vec<Application>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM application WHERE application_group_id = ANY($1)
         ORDER BY created_at DESC, id DESC"
    );
    let rows = sqlx::query_as::<_, ApplicationRow>(&sql)
        .bind(group_ids)
        .fetch_all(conn)
        .await
        .map_err(db_error)?;
    rows.into_iter().map(ApplicationRow::into_record).collect()
}

pub async fn get_by_name_and_app_group_id(
    conn: &mut PgConnection,
    name: &str,
    group_id: i32,
) -> RepoResult<Application> {
    let sql = format!(
        "SELECT {COLUMNS} FROM application WHERE name = $1 AND application_group_id = $2"
    );
    let row = sqlx::query_as::<_, ApplicationRow>(&sql)
        .bind(name)
        .bind(group_id)
        .fetch_optional(conn)
        .await
        .map_err(db_error)?;
    row.ok_or(SystemError::ApplicationNotFound)?.into_record()
}

pub async fn get_all(conn: &mut PgConnection) -> RepoResult<Vec<Application>> {
    let sql = format!("SELECT {COLUMNS} FROM application ORDER BY created_at DESC, id DESC");
    let rows = sqlx::query_as::<_, ApplicationRow>(&sql)
        .fetch_all(conn)
        .await
        .map_err(db_error)?;
    rows.into_iter().map(ApplicationRow::into_record).collect()
}

pub async fn next_id(conn: &mut PgConnection) -> RepoResult<i32> {
    sqlx::query_scalar::<_, i32>("SELECT COALESCE(MAX(id) + 1, 1) FROM application")
        .fetch_one(conn)
        .await
        .map_err(db_error)
}

pub async fn create(conn: &mut PgConnection, app: &NewApplication) -> RepoResult<Application> {
    let sql = format!(
        "INSERT INTO application (id, name, description, application_group_id, type)
         VALUES ($1, $2, $3, $4, $5) RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, ApplicationRow>(&sql)
        .bind(app.id)
        .bind(&app.name)
        .bind(&app.description)
        .bind(app.application_group_id)
        .bind(app.app_type.as_str())
        .fetch_one(conn)
        .await
        .map_err(db_error)?;
    row.into_record()
}

pub async fn update(
    conn: &mut PgConnection,
    id: i32,
    name: &str,
    description: &str,
) -> RepoResult<Application> {
    update_with_new_id(conn, id, id, name, description).await
}

/// Rewrite `id`, `name` and `description` in one statement. Tokens and ACL
/// rows follow through `ON UPDATE CASCADE`.
pub async fn update_with_new_id(
    conn: &mut PgConnection,
    old_id: i32,
    new_id: i32,
    name: &str,
    description: &str,
) -> RepoResult<Application> {
    let sql = format!(
        "UPDATE application SET id = $2, name = $3, description = $4, updated_at = now()
         WHERE id = $1 RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, ApplicationRow>(&sql)
        .bind(old_id)
        .bind(new_id)
        .bind(name)
        .bind(description)
        .fetch_optional(conn)
        .await
        .map_err(db_error)?;
    row.ok_or(SystemError::ApplicationNotFound)?.into_record()
}

pub async fn delete_by_id_list(conn: &mut PgConnection, ids: &[i32]) -> RepoResult<u64> {
    let result = sqlx::query("DELETE FROM application WHERE id = ANY($1)")
        .bind(ids)
        .execute(conn)
        .await
        .map_err(db_error)?;
    Ok(result.rows_affected())
}

#[derive(sqlx::FromRow)]
struct ApplicationRow {
    id: i32,
    name: String,
    description: String,
    application_group_id: i32,
    #[sqlx(rename = "type")]
    app_type: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ApplicationRow {
    fn into_record(self) -> RepoResult<Application> {
        let app_type = self.app_type.parse::<ApplicationType>().map_err(|_| {
            tracing::error!(
                id = self.id,
                app_type = %self.app_type,
                "unknown application type in database"
            );
            SystemError::Internal(format!("unknown application type {:?}", self.app_type))
        })?;
        Ok(Application {
            id: self.id,
            name: self.name,
            description: self.description,
            application_group_id: self.application_group_id,
            app_type,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
