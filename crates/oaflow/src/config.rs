// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection settings for the OA open API.
///
/// Resolved once at startup (flags, then env, then defaults) and validated
/// eagerly. Can also be loaded from a JSON file with the same field names.
#[derive(Debug, Clone, clap::Args, Serialize, Deserialize)]
#[serde(default)]
pub struct OaConfig {
    /// Application id registered with the OA server.
    #[arg(long, env = "OA_APP_ID", default_value = "")]
    pub app_id: String,

    /// Raw application secret (encrypted before it is sent).
    #[arg(long, env = "OA_APP_SECRET", default_value = "", hide_env_values = true)]
    pub app_secret: String,

    /// OA server public key, PEM or bare base64 body.
    #[arg(long, env = "OA_APP_SPK", default_value = "", hide_env_values = true)]
    pub app_spk: String,

    /// OA server base URL, e.g. `https://oa.example.com`.
    #[arg(long = "oa-host", env = "OA_HOST", default_value = "")]
    pub host: String,

    /// App id used for SSO token issuance. Empty disables SSO.
    #[arg(long, env = "OA_SSO_APP_ID", default_value = "")]
    pub sso_app_id: String,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, env = "OA_HTTP_TIMEOUT_SECS", default_value_t = 30)]
    pub http_timeout_secs: u64,

    /// Persist the app token to this file instead of keeping it in memory.
    #[arg(long, env = "OA_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,
}

impl Default for OaConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            app_secret: String::new(),
            app_spk: String::new(),
            host: String::new(),
            sso_app_id: String::new(),
            http_timeout_secs: 30,
            token_file: None,
        }
    }
}

impl OaConfig {
    /// Load from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: OaConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let required = [
            ("app_id", &self.app_id),
            ("app_secret", &self.app_secret),
            ("app_spk", &self.app_spk),
            ("host", &self.host),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                anyhow::bail!("missing required OA setting: {key}");
            }
        }
        if !(self.host.starts_with("http://") || self.host.starts_with("https://")) {
            anyhow::bail!("OA host must start with http:// or https://: {}", self.host);
        }
        if self.http_timeout_secs == 0 {
            anyhow::bail!("http_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    /// Host with any trailing `/` removed, ready for `host + path`.
    pub fn base_url(&self) -> &str {
        self.host.trim_end_matches('/')
    }

    pub fn sso_app_id(&self) -> Option<&str> {
        let id = self.sso_app_id.trim();
        if id.is_empty() {
            None
        } else {
            Some(id)
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Table and column names for direct reads of the vendor's HR tables, plus
/// the host-side mirror table.
#[derive(Debug, Clone, clap::Args, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Connection URL of the vendor database.
    #[arg(long, env = "OA_DB_URL")]
    pub db_url: Option<String>,

    #[arg(long, env = "OA_DB_USER_TABLE", default_value = "ECOLOGY.HRMRESOURCE")]
    pub user_table: String,

    #[arg(long, env = "OA_DB_USER_ID_COLUMN", default_value = "ID")]
    pub user_id_column: String,

    #[arg(long, env = "OA_DB_USER_NAME_COLUMN", default_value = "LASTNAME")]
    pub user_name_column: String,

    #[arg(long, env = "OA_DB_USER_STAFF_CODE_COLUMN", default_value = "LOGINID")]
    pub user_staff_code_column: String,

    #[arg(long, env = "OA_DB_USER_DEPT_ID_COLUMN", default_value = "DEPARTMENTID")]
    pub user_dept_id_column: String,

    #[arg(long, env = "OA_DB_DEPT_TABLE", default_value = "ECOLOGY.HRMDEPARTMENT")]
    pub dept_table: String,

    #[arg(long, env = "OA_DB_DEPT_ID_COLUMN", default_value = "ID")]
    pub dept_id_column: String,

    #[arg(long, env = "OA_DB_DEPT_NAME_COLUMN", default_value = "DEPARTMENTNAME")]
    pub dept_name_column: String,

    /// Connection URL of the host database holding the user mirror.
    #[arg(long, env = "OA_MIRROR_DB_URL")]
    pub mirror_db_url: Option<String>,

    #[arg(long, env = "OA_MIRROR_TABLE", default_value = "oa_user_info")]
    pub mirror_table: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            db_url: None,
            user_table: "ECOLOGY.HRMRESOURCE".to_owned(),
            user_id_column: "ID".to_owned(),
            user_name_column: "LASTNAME".to_owned(),
            user_staff_code_column: "LOGINID".to_owned(),
            user_dept_id_column: "DEPARTMENTID".to_owned(),
            dept_table: "ECOLOGY.HRMDEPARTMENT".to_owned(),
            dept_id_column: "ID".to_owned(),
            dept_name_column: "DEPARTMENTNAME".to_owned(),
            mirror_db_url: None,
            mirror_table: "oa_user_info".to_owned(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
