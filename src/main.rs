use anyhow::Context;
use clap::{Parser, Subcommand};
use comfy_table::Table;
use core_types::{AnalystId, AnalystMetrics};
use database::{DbError, DbRepository, MetricsStore, connect, run_migrations};
use engine::{EngineError, MetricsService};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;

/// The main entry point for the AIMS metrics tool.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    let config = configuration::load_config_from(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let _log_guard = configuration::init_tracing(&config.logging)?;

    // Initialize the database connection and run migrations
    let db_pool = connect().await.context("connecting to the database")?;
    run_migrations(&db_pool).await.context("running migrations")?;

    let repo = Arc::new(DbRepository::new(db_pool));
    let store: Arc<dyn MetricsStore> = repo.clone();
    let service = Arc::new(MetricsService::new(Arc::clone(&store), repo, &config)?);

    // Execute the appropriate command
    match cli.command {
        Commands::Recompute(args) => handle_recompute(&service, args).await,
        Commands::Rank(args) => handle_rank(&service, args).await,
        Commands::Metrics(args) => handle_metrics(&service, args).await,
        Commands::Leaderboard(args) => handle_leaderboard(&service, args).await,
        Commands::Stress(args) => handle_stress(service, store, args).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Keeps analyst performance metrics up to date and ranks analysts by them.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recompute one analyst's metrics from their report history.
    Recompute(AnalystArgs),
    /// Show an analyst's position among all analysts.
    Rank(AnalystArgs),
    /// Show an analyst's metrics together with their rank.
    Metrics(AnalystArgs),
    /// List all scored analysts, best first.
    Leaderboard(LeaderboardArgs),
    /// Fire many concurrent recomputes at one analyst and check none were lost.
    Stress(StressArgs),
}

#[derive(Parser)]
struct AnalystArgs {
    /// The analyst id.
    #[arg(long)]
    analyst_id: i64,

    /// Print JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct LeaderboardArgs {
    /// Show only the top N analysts.
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Parser)]
struct StressArgs {
    /// The analyst id to hammer.
    #[arg(long)]
    analyst_id: i64,

    /// Number of concurrent recomputes.
    #[arg(long, default_value_t = 100)]
    tasks: usize,
}

// ==============================================================================
// Command Handlers
// ==============================================================================

async fn handle_recompute(service: &MetricsService, args: AnalystArgs) -> anyhow::Result<()> {
    let record = service
        .trigger_recompute(AnalystId(args.analyst_id))
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!("{}", metrics_table(&record, None, None));
    }
    Ok(())
}

async fn handle_rank(service: &MetricsService, args: AnalystArgs) -> anyhow::Result<()> {
    let analyst_id = AnalystId(args.analyst_id);
    let ranking = match service.get_rank(analyst_id).await {
        Ok(ranking) => ranking,
        Err(EngineError::NotFound(_)) => {
            println!("Analyst {analyst_id} has no metrics yet.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&ranking)?);
    } else {
        match ranking.position {
            Some(position) => println!(
                "Analyst {analyst_id} ranks {position} of {}",
                ranking.total_count
            ),
            None => println!(
                "Analyst {analyst_id} is unranked (not enough reports); {} analysts total",
                ranking.total_count
            ),
        }
    }
    Ok(())
}

async fn handle_metrics(service: &MetricsService, args: AnalystArgs) -> anyhow::Result<()> {
    let analyst_id = AnalystId(args.analyst_id);
    let report = match service.analyst_metrics(analyst_id).await {
        Ok(report) => report,
        Err(EngineError::NotFound(_)) => {
            println!("Analyst {analyst_id} has no metrics yet.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{}",
            metrics_table(&report.metrics, Some(report.rank), Some(report.total_analysts))
        );
    }
    Ok(())
}

async fn handle_leaderboard(service: &MetricsService, args: LeaderboardArgs) -> anyhow::Result<()> {
    let board = service.leaderboard().await?;
    let limit = args.limit.unwrap_or(board.len());

    let mut table = Table::new();
    table.set_header(vec!["Rank", "Analyst", "AIMS Score", "Reports"]);
    for row in board.iter().take(limit) {
        table.add_row(vec![
            row.position.to_string(),
            row.analyst_id.to_string(),
            row.aims_score.to_string(),
            row.report_count.to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// Fires `tasks` recomputes at once and compares the landed count with the
/// number of calls that reported success.
async fn handle_stress(
    service: Arc<MetricsService>,
    store: Arc<dyn MetricsStore>,
    args: StressArgs,
) -> anyhow::Result<()> {
    let analyst_id = AnalystId(args.analyst_id);
    let before = current_update_count(store.as_ref(), analyst_id).await?;

    let progress_bar = ProgressBar::new(args.tasks as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let tasks: Vec<_> = (0..args.tasks)
        .map(|_| {
            let service = Arc::clone(&service);
            let pb = progress_bar.clone();
            tokio::spawn(async move {
                let result = service.trigger_recompute(analyst_id).await;
                pb.inc(1);
                result
            })
        })
        .collect();

    let mut succeeded = 0i64;
    let mut exhausted = 0usize;
    for joined in join_all(tasks).await {
        match joined? {
            Ok(_) => succeeded += 1,
            Err(EngineError::ConcurrencyExhausted { .. }) => exhausted += 1,
            Err(e) => {
                tracing::error!(error = %e, "Recompute failed.");
            }
        }
    }
    progress_bar.finish_with_message("done");

    let after = current_update_count(store.as_ref(), analyst_id).await?;
    let landed = after - before;

    let mut table = Table::new();
    table.set_header(vec!["Tasks", "Succeeded", "Exhausted", "Landed", "Lost"]);
    table.add_row(vec![
        args.tasks.to_string(),
        succeeded.to_string(),
        exhausted.to_string(),
        landed.to_string(),
        (succeeded - landed).to_string(),
    ]);
    println!("{table}");

    anyhow::ensure!(
        landed == succeeded,
        "{} successful updates did not land",
        succeeded - landed
    );
    Ok(())
}

async fn current_update_count(
    store: &dyn MetricsStore,
    analyst_id: AnalystId,
) -> anyhow::Result<i64> {
    match store.get(analyst_id).await {
        Ok(record) => Ok(record.update_count),
        Err(DbError::NotFound) => Ok(0),
        Err(e) => Err(e.into()),
    }
}

fn metrics_table(
    record: &AnalystMetrics,
    rank: Option<Option<usize>>,
    total_analysts: Option<usize>,
) -> Table {
    fn show<T: ToString>(value: Option<T>) -> String {
        value.map_or_else(|| "-".to_string(), |v| v.to_string())
    }

    let m = &record.metrics;
    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["Analyst".to_string(), record.analyst_id.to_string()]);
    table.add_row(vec!["Accuracy rate".to_string(), show(m.accuracy_rate)]);
    table.add_row(vec!["Return rate".to_string(), show(m.return_rate)]);
    table.add_row(vec!["Target diff rate".to_string(), show(m.target_diff_rate)]);
    table.add_row(vec!["Return vs peers".to_string(), show(m.avg_return_diff)]);
    table.add_row(vec!["Target diff vs peers".to_string(), show(m.avg_target_diff)]);
    table.add_row(vec!["AIMS score".to_string(), show(m.aims_score)]);
    table.add_row(vec!["Reports".to_string(), m.report_count.to_string()]);
    if let Some(rank) = rank {
        table.add_row(vec!["Rank".to_string(), show(rank)]);
    }
    if let Some(total) = total_analysts {
        table.add_row(vec!["Analysts".to_string(), total.to_string()]);
    }
    table.add_row(vec!["Updates".to_string(), record.update_count.to_string()]);
    table.add_row(vec!["Updated at".to_string(), record.updated_at.to_rfc3339()]);
    table.add_row(vec!["Version".to_string(), record.version.to_string()]);
    table
}
