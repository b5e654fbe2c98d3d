// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator CLI: smoke-test credentials and inspect workflows from a shell.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use crate::config::{DirectoryConfig, OaConfig};
use crate::factory::SessionFactory;
use crate::session::{OaSession, DEFAULT_TOKEN_EXPIRY_SECS};
use crate::workflow::{ListFilter, ListKind};

#[derive(Debug, Parser)]
#[command(name = "oaflow", version, about = "OA workflow engine client")]
pub struct Cli {
    /// JSON file with OA settings. Replaces the `--oa-*` flags when given.
    #[arg(long, env = "OA_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub oa: OaConfig,

    #[command(flatten)]
    pub directory: DirectoryConfig,

    /// Log format: "text" or "json".
    #[arg(long, env = "OA_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    #[arg(long, env = "OA_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Which OA user to act as.
#[derive(Debug, Clone, Args)]
#[group(required = true, multiple = false)]
pub struct UserArgs {
    /// OA user id.
    #[arg(long)]
    pub user: Option<String>,

    /// Work code, resolved through the user directory.
    #[arg(long)]
    pub work_code: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch a fresh app token and print it.
    Token {
        #[arg(long, default_value_t = DEFAULT_TOKEN_EXPIRY_SECS)]
        expiry_secs: u64,
    },
    /// Print the account profile of a user.
    Whoami {
        #[command(flatten)]
        user: UserArgs,
    },
    /// Page through one of the personal request lists.
    List {
        #[command(flatten)]
        user: UserArgs,
        #[arg(long, value_enum, default_value = "todo")]
        kind: KindArg,
        #[arg(long, default_value = "")]
        workflow_ids: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        page_size: u32,
    },
    /// Workflows the user may start, by category.
    CreateList {
        #[command(flatten)]
        user: UserArgs,
        #[arg(long)]
        type_ids: Option<String>,
    },
    /// Status of one request.
    Status {
        #[command(flatten)]
        user: UserArgs,
        #[arg(long)]
        request_id: String,
    },
    /// Flow chart URL of one request.
    ChartUrl {
        #[command(flatten)]
        user: UserArgs,
        #[arg(long)]
        request_id: String,
    },
    /// Mirror OA employees into the host database.
    #[cfg(feature = "directory")]
    SyncUsers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum KindArg {
    Todo,
    Doing,
    Unread,
    Rejected,
    Handled,
}

impl From<KindArg> for ListKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Todo => Self::Todo,
            KindArg::Doing => Self::Doing,
            KindArg::Unread => Self::Unread,
            KindArg::Rejected => Self::Rejected,
            KindArg::Handled => Self::Handled,
        }
    }
}

impl Cli {
    /// OA settings from `--config` when given, else from flags and env.
    pub fn oa_config(&self) -> anyhow::Result<OaConfig> {
        let config = match &self.config {
            Some(path) => OaConfig::load(path)?,
            None => self.oa.clone(),
        };
        config.validate()?;
        Ok(config)
    }
}

pub fn init_tracing(cli: &Cli) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match cli.log_format.as_str() {
        "json" => fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().try_init(),
        _ => fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init(),
    };
    drop(result);
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    // Mirroring talks to the databases only; no OA settings needed.
    #[cfg(feature = "directory")]
    if matches!(cli.command, Command::SyncUsers) {
        return sync_users(&cli.directory).await;
    }

    let factory = build_factory(&cli).await?;

    match cli.command {
        Command::Token { expiry_secs } => {
            let token = factory.session()?.acquire_token(expiry_secs).await?;
            println!("{token}");
        }
        Command::Whoami { user } => {
            let session = open(&factory, &user).await?;
            print_json(&session.profile())?;
        }
        Command::List { user, kind, workflow_ids, page, page_size } => {
            let mut session = open(&factory, &user).await?;
            let filter = ListFilter::for_workflows(workflow_ids);
            let page = session.workflow().list_page(kind.into(), &filter, page, page_size).await?;
            print_json(&page)?;
        }
        Command::CreateList { user, type_ids } => {
            let mut session = open(&factory, &user).await?;
            print_json(&session.workflow().create_list(type_ids.as_deref()).await?)?;
        }
        Command::Status { user, request_id } => {
            let mut session = open(&factory, &user).await?;
            print_json(&session.workflow().status(&request_id).await?)?;
        }
        Command::ChartUrl { user, request_id } => {
            let mut session = open(&factory, &user).await?;
            println!("{}", session.workflow().chart_url(&request_id).await?);
        }
        #[cfg(feature = "directory")]
        Command::SyncUsers => sync_users(&cli.directory).await?,
    }
    Ok(())
}

#[cfg(feature = "directory")]
async fn sync_users(config: &DirectoryConfig) -> anyhow::Result<()> {
    let directory = crate::directory::SqlDirectory::connect(config).await?;
    let mirror = crate::sync::SqlUserMirror::connect(config).await?;
    let report = crate::sync::sync_users(&directory, &mirror).await?;
    print_json(&report)
}

async fn build_factory(cli: &Cli) -> anyhow::Result<SessionFactory> {
    let config = cli.oa_config()?;
    info!(host = %config.base_url(), app_id = %config.app_id, "starting OA client");
    let factory = SessionFactory::from_config(config)?;

    #[cfg(feature = "directory")]
    if cli.directory.db_url.is_some() {
        let directory = crate::directory::SqlDirectory::connect(&cli.directory).await?;
        return Ok(factory.with_directory(std::sync::Arc::new(directory)));
    }
    #[cfg(not(feature = "directory"))]
    let _ = &cli.directory;

    Ok(factory)
}

async fn open(factory: &SessionFactory, user: &UserArgs) -> anyhow::Result<OaSession> {
    let session = match (&user.user, &user.work_code) {
        (Some(id), _) => factory.for_user(id).await?,
        (None, Some(code)) => factory.for_work_code(code).await?,
        (None, None) => anyhow::bail!("either --user or --work-code is required"),
    };
    Ok(session)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
