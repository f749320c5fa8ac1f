use crate::{
    commands::{Commands, DatabaseArgs, SourceArgs},
    conn::pinger_for,
    env::EnvManager,
    error::CliError,
    pipeline::Pipeline,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use bigdecimal::BigDecimal;
use clap::Parser;
use connectors::{
    adapter::SourceKind,
    error::AdapterError,
    sql::mysql::{adapter::MySqlAdapter, seed::seed_from_csv},
};
use engine_core::metrics::Metrics;
use engine_processing::{
    aggregate::average_age,
    filter::{RecordFilter, older_than, stream_records},
};
use futures_util::{StreamExt, TryStreamExt};
use std::{path::Path, pin::pin, str::FromStr};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod conn;
mod env;
mod error;
mod output;
mod pipeline;
mod shutdown;

#[derive(Parser)]
#[command(
    name = "pagestream",
    version = "0.1.0",
    about = "Bounded-memory streaming over paged user data"
)]
struct Cli {
    #[arg(long, global = true, help = "Load variables from this .env file")]
    env_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let shutdown = ShutdownCoordinator::new(CancellationToken::new());
    shutdown.register_handlers();

    let code = match run(cli, &shutdown).await {
        Ok(()) if shutdown.is_shutdown_requested() => ExitCode::ShutdownRequested,
        Ok(()) => ExitCode::Success,
        Err(e) => {
            error!("{}", e);
            ExitCode::GeneralError
        }
    };

    std::process::exit(code.as_i32());
}

async fn run(cli: Cli, shutdown: &ShutdownCoordinator) -> Result<(), CliError> {
    let env = load_env(cli.env_file.as_deref())?;

    match cli.command {
        Commands::Stream { source } => {
            let pipeline = open_pipeline(&source, &env, shutdown)?;
            let result = async {
                let mut records = pin!(stream_records(pipeline.pages().await?));
                while let Some(record) = records.try_next().await? {
                    output::print_record(&record, source.json)?;
                }
                Ok::<_, CliError>(())
            }
            .await;
            finish(pipeline, result).await?;
        }
        Commands::Batches { source, min_age } => {
            let pipeline = open_pipeline(&source, &env, shutdown)?;
            let result = async {
                let filter =
                    RecordFilter::new(older_than(min_age)).with_metrics(pipeline.metrics().clone());
                let mut records = pin!(filter.apply(pipeline.pages().await?));
                while let Some(record) = records.try_next().await? {
                    output::print_record(&record, source.json)?;
                }
                Ok::<_, CliError>(())
            }
            .await;
            finish(pipeline, result).await?;
        }
        Commands::Paginate { source, max_pages } => {
            let pipeline = open_pipeline(&source, &env, shutdown)?;
            let result = async {
                let pages = pipeline.pages().await?;
                let mut pages = pin!(pages.take(max_pages.unwrap_or(usize::MAX)));
                while let Some(page) = pages.try_next().await? {
                    output::print_page(&page, source.json)?;
                }
                Ok::<_, CliError>(())
            }
            .await;
            finish(pipeline, result).await?;
        }
        Commands::AverageAge { source } => {
            let pipeline = open_pipeline(&source, &env, shutdown)?;
            let result = async {
                Ok::<_, CliError>(average_age(stream_records(pipeline.pages().await?)).await?)
            }
            .await;
            let average = finish(pipeline, result).await?;
            println!("Average age of users: {}", output::format_average(average));
        }
        Commands::Report { source, min_age } => {
            let pipeline = open_pipeline(&source, &env, shutdown)?;
            let average = async {
                Ok::<_, CliError>(average_age(stream_records(pipeline.pages().await?)).await?)
            };
            let result = tokio::try_join!(report_older(&pipeline, min_age.clone()), average);
            let (older, average) = finish(pipeline, result).await?;
            println!("Users older than {min_age}: {older}");
            println!("Average age of users: {}", output::format_average(average));
        }
        Commands::Concurrent { source, min_age } => {
            let pipeline = open_pipeline(&source, &env, shutdown)?;
            let result = pipeline.all_and_older(&min_age).await;
            let (all, older) = finish(pipeline, result).await?;

            println!("All users:");
            for record in &all {
                output::print_record(record, source.json)?;
            }
            println!("Users older than {min_age}:");
            for record in &older {
                output::print_record(record, source.json)?;
            }
        }
        Commands::Query { db, min_age } => {
            let adapter = mysql_adapter(&db, &env)?;
            let result = adapter.users_older_than(&db.table, &min_age).await;
            let closed = adapter.disconnect().await;
            let users = result?;
            closed?;
            println!("Users older than {min_age}:");
            for user in &users {
                output::print_record(user, false)?;
            }
        }
        Commands::Seed { db, csv } => {
            let adapter = mysql_adapter(&db, &env)?;
            let result = seed_from_csv(&adapter, &db.table, &csv).await;
            let closed = adapter.disconnect().await;
            let report = result?;
            closed?;
            println!(
                "Seeded {}: {} read, {} inserted, {} skipped",
                db.table,
                report.read,
                report.inserted,
                report.skipped()
            );
        }
        Commands::UpdateEmail { db, user_id, email } => {
            let adapter = mysql_adapter(&db, &env)?;
            let result = adapter.update_email(&db.table, &user_id, &email).await;
            let closed = adapter.disconnect().await;
            let updated = result?;
            closed?;
            println!("{updated} row(s) updated");
        }
        Commands::TestConn { source, url } => {
            let kind = SourceKind::from_str(&source)?;
            let location = env.database_url(url.as_deref())?;
            pinger_for(kind, location).ping().await?;
        }
    }

    Ok(())
}

fn load_env(env_file: Option<&str>) -> Result<EnvManager, CliError> {
    let mut env = EnvManager::new();
    match env_file {
        Some(path) => env.load_from_file(path)?,
        None if Path::new(".env").is_file() => env.load_from_file(".env")?,
        None => {}
    }
    Ok(env)
}

fn open_pipeline(
    args: &SourceArgs,
    env: &EnvManager,
    shutdown: &ShutdownCoordinator,
) -> Result<Pipeline, CliError> {
    Pipeline::new(args, env, Metrics::new(), shutdown.cancel_token())
}

fn mysql_adapter(db: &DatabaseArgs, env: &EnvManager) -> Result<MySqlAdapter, CliError> {
    let url = env.database_url(db.url.as_deref())?;
    let adapter = MySqlAdapter::connect(&url).map_err(AdapterError::from)?;
    Ok(adapter)
}

async fn report_older(pipeline: &Pipeline, min_age: BigDecimal) -> Result<u64, CliError> {
    let filter = RecordFilter::new(older_than(min_age)).with_metrics(pipeline.metrics().clone());
    let count = filter
        .apply(pipeline.pages().await?)
        .try_fold(0u64, |count, _| async move { Ok(count + 1) })
        .await?;
    Ok(count)
}

/// Logs the metrics and closes the source whether or not `result` is an
/// error. The work's own error wins over a failed close.
async fn finish<T>(pipeline: Pipeline, result: Result<T, CliError>) -> Result<T, CliError> {
    info!("Metrics: {}", pipeline.metrics().snapshot());
    let closed = pipeline.close().await;

    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(close_err)) => Err(close_err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            warn!("Closing the source also failed: {}", close_err);
            Err(err)
        }
    }
}
