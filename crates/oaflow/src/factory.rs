// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use crate::config::OaConfig;
use crate::directory::UserDirectory;
use crate::error::OaError;
use crate::session::OaSession;
use crate::token_store::{FileTokenStore, MemoryTokenStore, TokenStore};

/// Hands out per-request sessions that share one HTTP connection pool, one
/// token store and, optionally, one user directory.
#[derive(Clone)]
pub struct SessionFactory {
    config: OaConfig,
    tokens: Arc<dyn TokenStore>,
    directory: Option<Arc<dyn UserDirectory>>,
    http: reqwest::Client,
}

impl SessionFactory {
    pub fn new(config: OaConfig, tokens: Arc<dyn TokenStore>) -> Result<Self, OaError> {
        let http = reqwest::Client::builder().timeout(config.http_timeout()).build()?;
        Ok(Self { config, tokens, directory: None, http })
    }

    /// Token store chosen by the config: the file at `token_file` when set,
    /// otherwise the process-wide memory slot.
    pub fn from_config(config: OaConfig) -> Result<Self, OaError> {
        let tokens: Arc<dyn TokenStore> = match &config.token_file {
            Some(path) => Arc::new(FileTokenStore::open(path.clone())),
            None => MemoryTokenStore::global(),
        };
        Self::new(config, tokens)
    }

    #[must_use]
    pub fn with_directory(mut self, directory: Arc<dyn UserDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn config(&self) -> &OaConfig {
        &self.config
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    /// Unregistered session.
    pub fn session(&self) -> Result<OaSession, OaError> {
        let session =
            OaSession::with_client(&self.config, Arc::clone(&self.tokens), self.http.clone())?;
        Ok(match &self.directory {
            Some(directory) => session.with_directory(Arc::clone(directory)),
            None => session,
        })
    }

    pub async fn for_user(&self, user_id: impl std::fmt::Display) -> Result<OaSession, OaError> {
        let mut session = self.session()?;
        session.register_user(user_id).await?;
        Ok(session)
    }

    pub async fn for_work_code(&self, work_code: &str) -> Result<OaSession, OaError> {
        let mut session = self.session()?;
        session.register_user_by_work_code(work_code).await?;
        Ok(session)
    }
}

#[cfg(test)]
#[path = "factory_tests.rs"]
mod tests;
