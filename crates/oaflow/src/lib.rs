// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Oaflow: client for an OA workflow engine's open API.
//!
//! Impersonates OA users behind one shared application identity, keeps the
//! app token fresh, and exposes the workflow verbs (list, submit, approve,
//! reject, forward, recall) as typed calls.

pub mod cli;
pub mod codec;
pub mod config;
pub mod directory;
pub mod error;
pub mod factory;
pub mod reply;
pub mod session;
pub mod sync;
pub mod token_store;
pub mod workflow;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{DirectoryConfig, OaConfig};
pub use directory::{DirectoryUser, OaUserRecord, UserDirectory};
pub use error::{ErrorKind, OaError};
pub use factory::SessionFactory;
pub use session::{AccountProfile, OaRequest, OaSession};
pub use sync::{sync_users, SyncReport, UserMirror};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use workflow::{ForwardMode, ListFilter, ListKind, NewRequest, Page, Workflow, WorkflowCategory};
