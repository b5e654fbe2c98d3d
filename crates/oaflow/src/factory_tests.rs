// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use super::*;
use crate::session::{ACCOUNT_INFO_PATH, TOKEN_PATH};
use crate::test_support::{test_config, MockOa, StaticDirectory};

#[tokio::test]
async fn sessions_share_the_token_store() -> anyhow::Result<()> {
    let mock = MockOa::start().await?;
    let store = Arc::new(MemoryTokenStore::new());
    let factory = SessionFactory::new(test_config(&mock.url()), store.clone())?;

    let first = factory.for_user(18781).await?;
    let second = factory.for_user(900).await?;
    assert_eq!(first.token(), Some("tok-1"));
    assert_eq!(second.token(), Some("tok-1"));
    assert_eq!(store.get().as_deref(), Some("tok-1"));
    assert_eq!(mock.count(TOKEN_PATH), 1);
    assert_eq!(mock.count(ACCOUNT_INFO_PATH), 2);
    Ok(())
}

#[tokio::test]
async fn work_code_sessions_use_factory_directory() -> anyhow::Result<()> {
    let mock = MockOa::start().await?;
    let factory = SessionFactory::new(test_config(&mock.url()), Arc::new(MemoryTokenStore::new()))?
        .with_directory(Arc::new(StaticDirectory::with(&[(18781, "A0009527", 21)])));

    let session = factory.for_work_code("A0009527").await?;
    assert_eq!(session.user_id(), Some("18781"));
    assert_eq!(session.login_id(), Some("A0009527"));
    Ok(())
}

#[tokio::test]
async fn unregistered_session_makes_no_calls() -> anyhow::Result<()> {
    let mock = MockOa::start().await?;
    let factory = SessionFactory::new(test_config(&mock.url()), Arc::new(MemoryTokenStore::new()))?;
    let session = factory.session()?;
    assert!(session.profile().is_none());
    assert!(mock.hits().is_empty());
    Ok(())
}

#[tokio::test]
async fn token_file_backs_factory_store() -> anyhow::Result<()> {
    let mock = MockOa::start().await?;
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("token.json");
    let mut config = test_config(&mock.url());
    config.token_file = Some(path.clone());

    let factory = SessionFactory::from_config(config.clone())?;
    factory.for_user(18781).await?;

    let reopened = SessionFactory::from_config(config)?;
    assert_eq!(reopened.tokens().get().as_deref(), Some("tok-1"));
    assert!(path.exists());
    Ok(())
}
