//! Token persistence operations and the authentication join.

use chrono::{DateTime, Utc};
use isp_core::{AuthData, SystemError, Token};
use sqlx::PgConnection;

use super::error::db_error;
use crate::repository::RepoResult;

pub async fn get_by_token(conn: &mut PgConnection, token: &str) -> RepoResult<Token> {
    let row = sqlx::query_as::<_, TokenRow>(
        "SELECT token, app_id, expire_time, created_at FROM token WHERE token = $1",
    )
    .bind(token)
    .fetch_optional(conn)
    .await
    .map_err(db_error)?;
    row.map(TokenRow::into_record)
        .ok_or(SystemError::TokenNotFound)
}

pub async fn get_by_app_id(conn: &mut PgConnection, app_id: i32) -> RepoResult<Vec<Token>> {
    let rows = sqlx::query_as::<_, TokenRow>(
        "SELECT token, app_id, expire_time, created_at FROM token
         WHERE app_id = $1 ORDER BY created_at DESC",
    )
    .bind(app_id)
    .fetch_all(conn)
    .await
    .map_err(db_error)?;
    Ok(rows.into_iter().map(TokenRow::into_record).collect())
}

pub async fn get_by_app_ids(conn: &mut PgConnection, app_ids: &[i32]) -> RepoResult<Vec<Token>> {
    let rows = sqlx::query_as::<_, TokenRow>(
        "SELECT token, app_id, expire_time, created_at FROM token
         WHERE app_id = ANY($1) ORDER BY created_at DESC",
    )
    .bind(app_ids)
    .fetch_all(conn)
    .await
    .map_err(db_error)?;
    Ok(rows.into_iter().map(TokenRow::into_record).collect())
}

/// Resolve a token to its full identity context in a single round trip.
pub async fn select_auth_data_by_token(
    conn: &mut PgConnection,
    token: &str,
) -> RepoResult<AuthData> {
    let row = sqlx::query_as::<_, AuthDataRow>(
        "SELECT a.id AS app_id, a.name AS app_name, g.id AS application_group_id,
                d.id AS domain_id, d.system_id, t.expire_time, t.created_at
         FROM token t
         JOIN application a ON a.id = t.app_id
         JOIN app_group g ON g.id = a.application_group_id
         JOIN domain d ON d.id = g.domain_id
         WHERE t.token = $1",
    )
    .bind(token)
    .fetch_optional(conn)
    .await
    .map_err(db_error)?;
    row.map(AuthDataRow::into_record)
        .ok_or(SystemError::TokenNotFound)
}

pub async fn save(conn: &mut PgConnection, token: &Token) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO token (token, app_id, expire_time, created_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(&token.token)
    .bind(token.app_id)
    .bind(token.expire_time)
    .bind(token.created_at)
    .execute(conn)
    .await
    .map_err(db_error)?;
    Ok(())
}

pub async fn delete_by_app_id_and_tokens(
    conn: &mut PgConnection,
    app_id: i32,
    tokens: &[String],
) -> RepoResult<u64> {
    let result = sqlx::query("DELETE FROM token WHERE app_id = $1 AND token = ANY($2)")
        .bind(app_id)
        .bind(tokens)
        .execute(conn)
        .await
        .map_err(db_error)?;
    Ok(result.rows_affected())
}

#[derive(sqlx::FromRow)]
struct TokenRow {
    token: String,
    app_id: i32,
    expire_time: i64,
    created_at: DateTime<Utc>,
}

impl TokenRow {
    fn into_record(self) -> Token {
        Token {
            token: self.token,
            app_id: self.app_id,
            expire_time: self.expire_time,
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AuthDataRow {
    app_id: i32,
    app_name: String,
    application_group_id: i32,
    domain_id: i32,
    system_id: i32,
    expire_time: i64,
    created_at: DateTime<Utc>,
}

impl AuthDataRow {
    fn into_record(self) -> AuthData {
        AuthData {
            app_id: self.app_id,
            app_name: self.app_name,
            application_group_id: self.application_group_id,
            domain_id: self.domain_id,
            system_id: self.system_id,
            expire_time: self.expire_time,
            created_at: self.created_at,
        }
    }
}
