//! Access-list persistence operations.

use isp_core::{AccessList, SystemError};
use sqlx::PgConnection;

use super::error::db_error;
use crate::repository::RepoResult;

pub async fn get_by_app_id(conn: &mut PgConnection, app_id: i32) -> RepoResult<Vec<AccessList>> {
    let rows = sqlx::query_as::<_, AccessListRow>(
        "SELECT app_id, method, value FROM access_list WHERE app_id = $1 ORDER BY method",
    )
    .bind(app_id)
    .fetch_all(conn)
    .await
    .map_err(db_error)?;
    Ok(rows.into_iter().map(AccessListRow::into_record).collect())
}

/// Exact-match lookup used by the authorize hot path.
pub async fn get_by_app_id_and_method(
    conn: &mut PgConnection,
    app_id: i32,
    method: &str,
) -> RepoResult<AccessList> {
    let row = sqlx::query_as::<_, AccessListRow>(
        "SELECT app_id, method, value FROM access_list WHERE app_id = $1 AND method = $2",
    )
    .bind(app_id)
    .bind(method)
    .fetch_optional(conn)
    .await
    .map_err(db_error)?;
    row.map(AccessListRow::into_record)
        .ok_or(SystemError::AccessListNotFound)
}

pub async fn upsert(conn: &mut PgConnection, row: &AccessList) -> RepoResult<u64> {
    let result = sqlx::query(
        "INSERT INTO access_list (app_id, method, value) VALUES ($1, $2, $3)
         ON CONFLICT (app_id, method) DO UPDATE SET value = EXCLUDED.value",
    )
    .bind(row.app_id)
    .bind(&row.method)
    .bind(row.value)
    .execute(conn)
    .await
    .map_err(db_error)?;
    Ok(result.rows_affected())
}

pub async fn delete_by_app_id(conn: &mut PgConnection, app_id: i32) -> RepoResult<u64> {
    let result = sqlx::query("DELETE FROM access_list WHERE app_id = $1")
        .bind(app_id)
        .execute(conn)
        .await
        .map_err(db_error)?;
    Ok(result.rows_affected())
}

pub async fn delete_by_app_id_and_methods(
    conn: &mut PgConnection,
    app_id: i32,
    methods: &[String],
) -> RepoResult<u64> {
    let result = sqlx::query("DELETE FROM access_list WHERE app_id = $1 AND method = ANY($2)")
        .bind(app_id)
        .bind(methods)
        .execute(conn)
        .await
        .map_err(db_error)?;
    Ok(result.rows_affected())
}

/// Bulk insert in one statement. Rows must share one `app_id`.
pub async fn insert_all(conn: &mut PgConnection, rows: &[AccessList]) -> RepoResult<u64> {
    let Some(first) = rows.first() else {
        return Ok(0);
    };
    let methods: Vec<String> = rows.iter().map(|r| r.method.clone()).collect();
    let values: Vec<bool> = rows.iter().map(|r| r.value).collect();
    let result = sqlx::query(
        "INSERT INTO access_list (app_id, method, value)
         SELECT $1::integer, m, v FROM UNNEST($2::text[], $3::bool[]) AS t(m, v)",
    )
    .bind(first.app_id)
    .bind(&methods)
    .bind(&values)
    .execute(conn)
    .await
    .map_err(db_error)?;
    Ok(result.rows_affected())
}

#[derive(sqlx::FromRow)]
struct AccessListRow {
    app_id: i32,
    method: String,
    value: bool,
}

impl AccessListRow {
    fn into_record(self) -> AccessList {
        AccessList {
            app_id: self.app_id,
            method: self.method,
            value: self.value,
        }
    }
}
