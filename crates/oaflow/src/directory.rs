// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Direct reads of the vendor's HR tables.
//!
//! The open API has no lookup from work code to OA user id, so the client
//! reads the vendor's employee and department tables directly. Every table
//! and column name comes from [`DirectoryConfig`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::DirectoryConfig;
use crate::error::OaError;

/// Minimal row returned by a work-code lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub id: i64,
    pub department_id: Option<i64>,
}

/// One OA employee, as mirrored into the host database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OaUserRecord {
    pub id: i64,
    pub staff_code: Option<String>,
    pub department_id: Option<i64>,
    pub department_name: Option<String>,
    pub display_name: Option<String>,
}

impl OaUserRecord {
    /// Rows without a staff code cannot be linked to a host account.
    pub fn is_active(&self) -> bool {
        self.staff_code.as_deref().is_some_and(|c| !c.trim().is_empty())
    }
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_work_code(&self, work_code: &str) -> Result<Option<DirectoryUser>, OaError>;

    /// Returns `(id, work_code)` for each code that exists.
    async fn find_many_by_work_codes(
        &self,
        work_codes: &[String],
    ) -> Result<Vec<(i64, String)>, OaError>;

    /// Every employee with a staff code.
    async fn all_users(&self) -> Result<Vec<OaUserRecord>, OaError>;
}

/// SQL text derived from a [`DirectoryConfig`]. Identifiers are checked once;
/// values are always bound, never interpolated.
#[derive(Debug, Clone)]
pub struct DirectoryQueries {
    pub by_work_code: String,
    pub by_work_codes: String,
    pub all_users: String,
}

impl DirectoryQueries {
    pub fn new(config: &DirectoryConfig) -> Result<Self, OaError> {
        let users = ident(&config.user_table)?;
        let id = ident(&config.user_id_column)?;
        let name = ident(&config.user_name_column)?;
        let code = ident(&config.user_staff_code_column)?;
        let dept = ident(&config.user_dept_id_column)?;
        let depts = ident(&config.dept_table)?;
        let dept_id = ident(&config.dept_id_column)?;
        let dept_name = ident(&config.dept_name_column)?;

        Ok(Self {
            by_work_code: format!("SELECT u.{id}, u.{dept} FROM {users} u WHERE u.{code} = $1"),
            by_work_codes: format!(
                "SELECT u.{id}, u.{code} FROM {users} u WHERE u.{code} = ANY($1)"
            ),
            all_users: format!(
                "SELECT u.{id}, u.{code}, u.{dept}, d.{dept_name}, u.{name} \
                 FROM {users} u LEFT JOIN {depts} d ON u.{dept} = d.{dept_id} \
                 WHERE u.{code} IS NOT NULL"
            ),
        })
    }
}

/// Accept `[A-Za-z0-9_$]` segments joined by `.` (schema-qualified names)
/// and quote each segment, so vendor names keep their case.
pub(crate) fn ident(name: &str) -> Result<String, OaError> {
    let valid = !name.is_empty()
        && name.split('.').all(|seg| {
            !seg.is_empty() && seg.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        });
    if valid {
        Ok(name.split('.').map(|seg| format!("\"{seg}\"")).collect::<Vec<_>>().join("."))
    } else {
        Err(OaError::usage(format!("invalid SQL identifier in directory config: {name:?}")))
    }
}

#[cfg(feature = "directory")]
pub use sql::SqlDirectory;

#[cfg(feature = "directory")]
mod sql {
    use sqlx::postgres::{PgPool, PgRow};
    use sqlx::Row;

    use super::{DirectoryQueries, DirectoryUser, OaUserRecord, UserDirectory};
    use crate::config::DirectoryConfig;
    use crate::error::OaError;

    /// [`UserDirectory`] over a Postgres connection to the vendor database.
    #[derive(Clone)]
    pub struct SqlDirectory {
        pool: PgPool,
        queries: DirectoryQueries,
    }

    impl SqlDirectory {
        pub fn new(pool: PgPool, config: &DirectoryConfig) -> Result<Self, OaError> {
            Ok(Self { pool, queries: DirectoryQueries::new(config)? })
        }

        pub async fn connect(config: &DirectoryConfig) -> Result<Self, OaError> {
            let url = config
                .db_url
                .as_deref()
                .ok_or_else(|| OaError::usage("OA_DB_URL is not configured"))?;
            let pool = PgPool::connect(url).await?;
            Self::new(pool, config)
        }
    }

    /// Vendor ids are NUMBER columns; accept either integer width.
    fn int_at(row: &PgRow, idx: usize) -> Result<Option<i64>, sqlx::Error> {
        match row.try_get::<Option<i64>, _>(idx) {
            Ok(v) => Ok(v),
            Err(_) => Ok(row.try_get::<Option<i32>, _>(idx)?.map(i64::from)),
        }
    }

    fn required_id(row: &PgRow) -> Result<i64, OaError> {
        int_at(row, 0)?.ok_or_else(|| OaError::Directory("user row without id".to_owned()))
    }

    #[async_trait::async_trait]
    impl UserDirectory for SqlDirectory {
        async fn find_by_work_code(
            &self,
            work_code: &str,
        ) -> Result<Option<DirectoryUser>, OaError> {
            let row = sqlx::query(&self.queries.by_work_code)
                .bind(work_code)
                .fetch_optional(&self.pool)
                .await?;
            match row {
                Some(row) => Ok(Some(DirectoryUser {
                    id: required_id(&row)?,
                    department_id: int_at(&row, 1)?,
                })),
                None => Ok(None),
            }
        }

        async fn find_many_by_work_codes(
            &self,
            work_codes: &[String],
        ) -> Result<Vec<(i64, String)>, OaError> {
            if work_codes.is_empty() {
                return Ok(Vec::new());
            }
            let rows = sqlx::query(&self.queries.by_work_codes)
                .bind(work_codes)
                .fetch_all(&self.pool)
                .await?;
            rows.iter()
                .map(|row| Ok((required_id(row)?, row.try_get::<String, _>(1)?)))
                .collect()
        }

        async fn all_users(&self) -> Result<Vec<OaUserRecord>, OaError> {
            let rows = sqlx::query(&self.queries.all_users).fetch_all(&self.pool).await?;
            let mut users = Vec::with_capacity(rows.len());
            for row in &rows {
                users.push(OaUserRecord {
                    id: required_id(row)?,
                    staff_code: row.try_get(1)?,
                    department_id: int_at(row, 2)?,
                    department_name: row.try_get(3)?,
                    display_name: row.try_get(4)?,
                });
            }
            Ok(users)
        }
    }
}

#[cfg(test)]
#[path = "directory_tests.rs"]
mod tests;
