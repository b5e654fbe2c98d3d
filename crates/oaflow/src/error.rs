// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse error categories, stable across variants that carry different data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Usage,
    Crypto,
    Transport,
    Protocol,
    Api,
    Rejected,
    NotFound,
    BusinessRule,
    Http,
    Directory,
}

impl ErrorKind {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Usage => 500,
            Self::Crypto => 500,
            Self::Transport => 502,
            Self::Protocol => 502,
            Self::Api => 502,
            Self::Rejected => 502,
            Self::NotFound => 404,
            Self::BusinessRule => 400,
            Self::Http => 504,
            Self::Directory => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Usage => "USAGE",
            Self::Crypto => "CRYPTO",
            Self::Transport => "TRANSPORT",
            Self::Protocol => "PROTOCOL",
            Self::Api => "API",
            Self::Rejected => "REJECTED",
            Self::NotFound => "NOT_FOUND",
            Self::BusinessRule => "BUSINESS_RULE",
            Self::Http => "HTTP",
            Self::Directory => "DIRECTORY",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every failure the OA client can surface.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum OaError {
    /// Programmer misuse, e.g. calling an authenticated endpoint before
    /// registering a user.
    #[error("{0}")]
    Usage(String),

    #[error("crypto error: {0}")]
    Crypto(String),

    /// Non-200 HTTP status from the OA server.
    #[error("OA: Response[{status}]")]
    Transport { status: u16, body: String },

    /// JSON was expected but the body did not parse.
    #[error("OA: {body}")]
    Protocol { body: String },

    /// Vendor `code == -1` failure. The hint names the likely culprit.
    #[error("OA Error: {message} ({hint})")]
    Vendor { message: String, hint: &'static str },

    /// Vendor reported a workflow `code` other than `SUCCESS`.
    #[error("OA: {code}, {detail}")]
    Workflow { code: String, detail: String },

    /// Vendor login session timed out. Retried by the request loop.
    #[error("OA session timed out: {body}")]
    SessionTimeout { body: String },

    /// `status: false` with no recognised message.
    #[error("Error: {body}")]
    Rejected { body: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    BusinessRule(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("directory error: {0}")]
    Directory(String),
}

impl OaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Usage(_) => ErrorKind::Usage,
            Self::Crypto(_) => ErrorKind::Crypto,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::Vendor { .. } | Self::Workflow { .. } | Self::SessionTimeout { .. } => {
                ErrorKind::Api
            }
            Self::Rejected { .. } => ErrorKind::Rejected,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::BusinessRule(_) => ErrorKind::BusinessRule,
            Self::Http(_) => ErrorKind::Http,
            Self::Directory(_) => ErrorKind::Directory,
        }
    }

    pub(crate) fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }
}

#[cfg(feature = "directory")]
impl From<sqlx::Error> for OaError {
    fn from(e: sqlx::Error) -> Self {
        Self::Directory(e.to_string())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
