use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlx::SqlitePool;

use homebox_lib::kv::KvHandle;
use homebox_lib::{
    db, migrate, Config, SearchEngine, SearchFilters, SearchHistory, SearchOutcome, SqliteStore,
};

#[derive(Debug, Parser)]
#[command(name = "homebox", about = "Local home inventory", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance commands.
    #[command(subcommand)]
    Db(DbCommand),
    /// Search items by name, category, notes or tag.
    Search {
        query: String,
        /// Only items in this exact category.
        #[arg(long)]
        category: Option<String>,
        /// Only items stored in this box.
        #[arg(long = "box-id")]
        box_id: Option<String>,
        /// Emit the raw JSON outcome.
        #[arg(long)]
        json: bool,
    },
    /// Inspect or edit the search history.
    #[command(subcommand)]
    History(HistoryCommand),
    /// Print inventory totals as JSON.
    Stats,
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    /// Apply pending schema migrations.
    Migrate,
}

#[derive(Debug, Subcommand)]
enum HistoryCommand {
    /// List past queries, most recent first.
    List,
    /// Forget every past query.
    Clear,
    /// Forget a single query.
    Remove { query: String },
}

fn main() {
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            process::exit(1);
        }
    }
}

fn run(command: Commands) -> Result<i32> {
    let config = Config::from_env().context("read configuration")?;
    homebox_lib::init_logging(config.log_dir.as_deref());
    tracing::debug!(target: "homebox", event = "cli_start");

    match command {
        Commands::Db(DbCommand::Migrate) => block_on(async {
            let pool = open_pool(&config).await?;
            let applied = migrate::applied_migrations(&pool).await?;
            pool.close().await;
            println!("Schema up to date ({} migrations applied).", applied.len());
            Ok(0)
        }),
        Commands::Search {
            query,
            category,
            box_id,
            json,
        } => {
            let filters = SearchFilters {
                category,
                box_id,
                ..SearchFilters::default()
            };
            handle_search(&config, &query, filters, json)
        }
        Commands::History(command) => handle_history(&config, command),
        Commands::Stats => block_on(async {
            let pool = open_pool(&config).await?;
            let engine = SearchEngine::new(Arc::new(SqliteStore::new(pool.clone())));
            let stats = engine.stats().await.context("collect inventory stats")?;
            pool.close().await;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(0)
        }),
    }
}

fn block_on<F>(future: F) -> Result<i32>
where
    F: std::future::Future<Output = Result<i32>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start async runtime")?;
    runtime.block_on(future)
}

async fn open_pool(config: &Config) -> Result<SqlitePool> {
    let pool = db::open_sqlite_pool(&config.db_path).await?;
    migrate::apply_migrations(&pool)
        .await
        .context("apply migrations")?;
    Ok(pool)
}

fn open_history(config: &Config) -> Result<SearchHistory> {
    let kv = KvHandle::json_file(&config.history_path).context("open search history")?;
    Ok(SearchHistory::load(kv, config.search.history_limit))
}

fn handle_search(config: &Config, query: &str, filters: SearchFilters, json: bool) -> Result<i32> {
    block_on(async {
        let pool = open_pool(config).await?;
        let engine = SearchEngine::new(Arc::new(SqliteStore::new(pool.clone())));
        let outcome = engine.search_items(query, &filters).await;
        pool.close().await;

        if json {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        match outcome {
            SearchOutcome::Unavailable { error } => {
                if !json {
                    eprintln!("Error: {}: {}", error.code(), error.message());
                }
                Ok(2)
            }
            SearchOutcome::Ready { results } => {
                let history = open_history(config)?;
                if let Err(err) = history.record(query) {
                    eprintln!("Warning: {}", err.message());
                }
                if !json {
                    if results.is_empty() {
                        println!("No matching items.");
                    }
                    for enriched in &results {
                        println!(
                            "{}\tx{}\t{}",
                            enriched.item.name,
                            enriched.item.quantity,
                            enriched.location_text()
                        );
                    }
                }
                Ok(0)
            }
        }
    })
}

fn handle_history(config: &Config, command: HistoryCommand) -> Result<i32> {
    let history = open_history(config)?;
    match command {
        HistoryCommand::List => {
            for query in history.list() {
                println!("{query}");
            }
        }
        HistoryCommand::Clear => history.clear()?,
        HistoryCommand::Remove { query } => history.remove(&query)?,
    }
    Ok(0)
}
