//! Operator CLI: apply migrations and inspect the karma ledger.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::io;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use karma_backend::FeedSettings;
use karma_backend::domain::ports::LeaderboardQuery;
use karma_backend::domain::{
    LeaderboardLimit, LeaderboardRequest, LeaderboardService, LeaderboardSpan, UserId,
    UserKarmaRequest,
};
use karma_backend::outbound::persistence::{
    DbPool, DieselKarmaLedgerRepository, DieselUserRepository, PoolConfig, run_migrations,
};
use karma_backend::telemetry::init_tracing;
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use tokio::runtime::Builder;

/// `karma-admin` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "karma-admin",
    about = "Apply feed migrations and inspect ledger-derived karma",
    version
)]
struct CliArgs {
    /// Database connection URL. Falls back to `KARMA_DATABASE_URL`.
    #[arg(long = "database-url", value_name = "url", global = true)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Apply pending schema migrations.
    Migrate,
    /// Print the top karma earners over a trailing window.
    Leaderboard {
        /// Window length in hours.
        #[arg(long = "window-hours", value_name = "hours")]
        window_hours: Option<i64>,
        /// Number of rows to print.
        #[arg(long, value_name = "n")]
        limit: Option<usize>,
    },
    /// Print one user's karma, all-time unless a window is given.
    Karma {
        /// User identifier.
        #[arg(long = "user", value_name = "uuid", value_parser = parse_user_id)]
        user: UserId,
        /// Window length in hours.
        #[arg(long = "window-hours", value_name = "hours")]
        window_hours: Option<i64>,
    },
}

fn main() -> io::Result<()> {
    init_tracing();
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    let settings = FeedSettings::load_from_iter([OsString::from("karma-admin")])
        .map_err(|error| io::Error::other(format!("load settings: {error}")))?;
    let database_url = resolve_database_url(args.database_url, &settings)?;

    match args.command {
        Command::Migrate => {
            let applied = run_migrations(&database_url)
                .await
                .map_err(io::Error::other)?;
            println!("applied={}", applied.len());
            for version in applied {
                println!("migration={version}");
            }
            Ok(())
        }
        Command::Leaderboard {
            window_hours,
            limit,
        } => {
            let span = match window_hours {
                Some(hours) => LeaderboardSpan::from_hours(hours),
                None => settings.leaderboard_span(),
            }
            .map_err(invalid_input)?;
            let limit = match limit {
                Some(limit) => LeaderboardLimit::new(limit),
                None => settings.leaderboard_limit(),
            }
            .map_err(invalid_input)?;

            let service = leaderboard_service(&database_url, &settings).await?;
            let entries = service
                .top(LeaderboardRequest { span, limit })
                .await
                .map_err(|error| io::Error::other(format!("leaderboard failed: {error}")))?;
            for (rank, entry) in entries.iter().enumerate() {
                println!(
                    "rank={} user_id={} username={} total={}",
                    rank + 1,
                    entry.user_id,
                    entry.username,
                    entry.total
                );
            }
            Ok(())
        }
        Command::Karma { user, window_hours } => {
            let span = window_hours
                .map(LeaderboardSpan::from_hours)
                .transpose()
                .map_err(invalid_input)?;
            let service = leaderboard_service(&database_url, &settings).await?;
            let karma = service
                .user_karma(UserKarmaRequest {
                    user_id: user,
                    span,
                })
                .await
                .map_err(|error| io::Error::other(format!("karma lookup failed: {error}")))?;
            let rendered = serde_json::to_string(&karma).map_err(io::Error::other)?;
            println!("{rendered}");
            Ok(())
        }
    }
}

async fn leaderboard_service(
    database_url: &str,
    settings: &FeedSettings,
) -> io::Result<LeaderboardService<DieselKarmaLedgerRepository, DieselUserRepository>> {
    let pool = DbPool::new(
        PoolConfig::new(database_url)
            .with_max_size(settings.pool_max_size())
            .with_min_idle(Some(1)),
    )
    .await
    .map_err(|error| io::Error::other(format!("create database pool: {error}")))?;

    Ok(LeaderboardService::new(
        Arc::new(DieselKarmaLedgerRepository::new(pool.clone())),
        Arc::new(DieselUserRepository::new(pool)),
        Arc::new(DefaultClock),
    ))
}

fn invalid_input(error: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, error.to_string())
}

fn parse_user_id(raw: &str) -> Result<UserId, String> {
    UserId::new(raw).map_err(|error| error.to_string())
}

fn resolve_database_url(explicit: Option<String>, settings: &FeedSettings) -> io::Result<String> {
    if let Some(value) = explicit {
        if value.trim().is_empty() {
            return Err(invalid_input("--database-url must not be empty when provided"));
        }
        return Ok(value);
    }
    let configured = settings.database_url().map_err(invalid_input)?;
    if configured.trim().is_empty() {
        return Err(invalid_input("KARMA_DATABASE_URL must not be empty"));
    }
    Ok(configured.to_owned())
}
