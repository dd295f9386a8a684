use std::process::ExitCode;

use anyhow::{Context, Result};
use catalog_sync::database_ops::schema::ensure_schema;
use catalog_sync::database_ops::{CatalogWriter, MemoryStore, PgCatalogWriter};
use catalog_sync::orchestrator::{SyncOrchestrator, SyncReport};
use catalog_sync::shopify::{RetryPolicy, ShopifyClient};
use catalog_sync::util::{db::Db, env as env_util};
use catalog_sync::{DbConfig, Product, ShopConfig, SyncConfig};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};

const EXIT_WRITE_FAILURES: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "catalog-sync", version, about = "Sync a Shopify product catalog into Postgres")]
struct Cli {
    /// Database URL; overrides DATABASE_URL and the POSTGRES_* settings
    #[arg(long, global = true)]
    db_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,

    // Allow `catalog-sync --dry-run` without the explicit `sync` subcommand.
    #[command(flatten)]
    sync: SyncArgs,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Command {
    /// Fetch the catalog once and write it (default when no command supplied)
    Sync(SyncArgs),
    /// Create the products/variants tables if they do not exist
    InitSchema,
    /// Fetch the catalog and print it as JSON without touching the database
    Fetch,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Args)]
struct SyncArgs {
    /// Write into an in-memory store instead of the database
    #[arg(long)]
    dry_run: bool,
    /// Create missing tables before syncing
    #[arg(long)]
    init_schema: bool,
    /// Exit with status 2 when any product failed to write
    #[arg(long)]
    strict: bool,
}

impl SyncArgs {
    /// Flags given before the subcommand still count: `--strict sync` is strict.
    fn merge(self, other: SyncArgs) -> SyncArgs {
        SyncArgs {
            dry_run: self.dry_run || other.dry_run,
            init_schema: self.init_schema || other.init_schema,
            strict: self.strict || other.strict,
        }
    }
}

impl Cli {
    fn into_parts(self) -> (Option<String>, Command) {
        let command = match self.command {
            None => Command::Sync(self.sync),
            Some(Command::Sync(args)) => Command::Sync(args.merge(self.sync)),
            Some(other) => other,
        };
        (self.db_url, command)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_util::init_env();
    if let Err(e) = catalog_sync::tracing::init_tracing("info,sqlx=warn") {
        eprintln!("{e:#}");
    }

    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{e:#}"), "catalog sync aborted");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let (db_url, command) = cli.into_parts();

    match command {
        Command::Sync(args) => run_sync(args, db_url).await,
        Command::InitSchema => {
            let db_cfg = db_config(db_url)?;
            let db = Db::connect(&db_cfg).await?;
            let result = ensure_schema(&db).await;
            db.close().await;
            result?;
            println!("catalog tables ready");
            Ok(ExitCode::SUCCESS)
        }
        Command::Fetch => {
            let shop = ShopConfig::from_env().context("shop configuration")?;
            let client = ShopifyClient::new(&shop, RetryPolicy::from_env()?)?;
            let payloads = client.fetch_catalog().await.context("catalog fetch failed")?;
            let mut products = Vec::with_capacity(payloads.len());
            for payload in payloads {
                match Product::try_from(payload) {
                    Ok(product) => products.push(product),
                    Err(e) => warn!(product_id = e.product_id(), error = %e, "record rejected"),
                }
            }
            println!("{}", serde_json::to_string_pretty(&products)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn db_config(db_url: Option<String>) -> Result<DbConfig> {
    let mut cfg = DbConfig::from_env().context("database configuration")?;
    if db_url.is_some() {
        cfg.url_override = db_url;
    }
    Ok(cfg)
}

async fn run_sync(args: SyncArgs, db_url: Option<String>) -> Result<ExitCode> {
    let mut cfg = SyncConfig::from_env()?;
    if db_url.is_some() {
        cfg.db.url_override = db_url;
    }
    cfg.log_snapshot();

    let client = ShopifyClient::new(&cfg.shop, cfg.retry.clone())?;
    info!(endpoint = %client.endpoint(), dry_run = args.dry_run, "starting catalog sync");

    let report = if args.dry_run {
        let (report, _) = drive(client, MemoryStore::new()).await;
        report?
    } else {
        let db = Db::connect(&cfg.db).await?;
        if args.init_schema {
            if let Err(e) = ensure_schema(&db).await {
                db.close().await;
                return Err(e);
            }
        }
        let (report, writer) = drive(client, PgCatalogWriter::new(db)).await;
        writer.into_db().close().await;
        report?
    };

    print_report(&report);
    if args.strict && !report.is_clean() {
        warn!(failed = report.failed(), "strict mode: products failed to write");
        return Ok(ExitCode::from(EXIT_WRITE_FAILURES));
    }
    Ok(ExitCode::SUCCESS)
}

/// Run one pass and hand the writer back so the caller can release it.
async fn drive<W: CatalogWriter>(client: ShopifyClient, writer: W) -> (Result<SyncReport>, W) {
    let mut sync = SyncOrchestrator::new(client, writer);
    let report = sync.run().await.context("catalog fetch failed");
    if report.is_ok() {
        match sync.writer_mut().counts().await {
            Ok(counts) => info!(
                products = counts.products,
                variants = counts.variants,
                "store row counts"
            ),
            Err(e) => warn!(error = %e, "could not count stored rows"),
        }
    }
    (report, sync.into_writer())
}

fn print_report(report: &SyncReport) {
    println!("{report}");
    for failure in &report.failures {
        println!(
            "  failed product {} ({}): {}",
            failure.product_id, failure.title, failure.error
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> (Option<String>, Command) {
        Cli::try_parse_from(args).unwrap().into_parts()
    }

    #[test]
    fn bare_invocation_syncs() {
        let (db_url, command) = parse(&["catalog-sync", "--dry-run"]);
        assert_eq!(db_url, None);
        match command {
            Command::Sync(args) => {
                assert!(args.dry_run);
                assert!(!args.strict);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn flags_before_sync_subcommand_are_kept() {
        let (_, command) = parse(&["catalog-sync", "--strict", "sync", "--init-schema"]);
        match command {
            Command::Sync(args) => assert_eq!(
                args,
                SyncArgs {
                    dry_run: false,
                    init_schema: true,
                    strict: true,
                }
            ),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn db_url_is_global() {
        let (db_url, command) = parse(&["catalog-sync", "init-schema", "--db-url", "postgres://x/y"]);
        assert_eq!(db_url.as_deref(), Some("postgres://x/y"));
        assert!(matches!(command, Command::InitSchema));
    }
}
