// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mirror of OA employees into the host database.

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::directory::{OaUserRecord, UserDirectory};
use crate::error::OaError;

/// Host-side store for mirrored OA users.
#[async_trait]
pub trait UserMirror: Send + Sync {
    /// Insert or update by user id. Returns rows written.
    async fn upsert(&self, users: &[OaUserRecord]) -> Result<u64, OaError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub fetched: usize,
    pub skipped: usize,
    pub upserted: u64,
}

/// Copy every OA user with a staff code into `mirror`.
pub async fn sync_users(
    directory: &dyn UserDirectory,
    mirror: &dyn UserMirror,
) -> Result<SyncReport, OaError> {
    let users = directory.all_users().await?;
    let fetched = users.len();
    let active: Vec<OaUserRecord> = users.into_iter().filter(OaUserRecord::is_active).collect();
    let skipped = fetched - active.len();

    let upserted = if active.is_empty() { 0 } else { mirror.upsert(&active).await? };
    let report = SyncReport { fetched, skipped, upserted };
    info!(fetched, skipped, upserted, "OA user sync finished");
    Ok(report)
}

#[cfg(feature = "directory")]
pub use sql::SqlUserMirror;

#[cfg(feature = "directory")]
mod sql {
    use sqlx::postgres::PgPool;
    use sqlx::{Postgres, QueryBuilder};

    use super::UserMirror;
    use crate::config::DirectoryConfig;
    use crate::directory::{ident, OaUserRecord};
    use crate::error::OaError;

    /// Postgres bind parameters are capped at 65535 per statement.
    const BATCH: usize = 1000;

    /// [`UserMirror`] writing `(user_id, staff_code, dept_id, name)` rows.
    #[derive(Clone)]
    pub struct SqlUserMirror {
        pool: PgPool,
        table: String,
    }

    impl SqlUserMirror {
        pub fn new(pool: PgPool, table: &str) -> Result<Self, OaError> {
            Ok(Self { pool, table: ident(table)? })
        }

        pub async fn connect(config: &DirectoryConfig) -> Result<Self, OaError> {
            let url = config
                .mirror_db_url
                .as_deref()
                .ok_or_else(|| OaError::usage("OA_MIRROR_DB_URL is not configured"))?;
            let pool = PgPool::connect(url).await?;
            Self::new(pool, &config.mirror_table)
        }
    }

    #[async_trait::async_trait]
    impl UserMirror for SqlUserMirror {
        async fn upsert(&self, users: &[OaUserRecord]) -> Result<u64, OaError> {
            let mut written = 0;
            for chunk in users.chunks(BATCH) {
                let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
                    "INSERT INTO {} (user_id, staff_code, dept_id, name) ",
                    self.table
                ));
                qb.push_values(chunk, |mut row, user| {
                    row.push_bind(user.id)
                        .push_bind(user.staff_code.as_deref())
                        .push_bind(user.department_id)
                        .push_bind(user.display_name.as_deref());
                });
                qb.push(
                    " ON CONFLICT (user_id) DO UPDATE SET staff_code = EXCLUDED.staff_code, \
                     dept_id = EXCLUDED.dept_id, name = EXCLUDED.name",
                );
                written += qb.build().execute(&self.pool).await?.rows_affected();
            }
            Ok(written)
        }
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
