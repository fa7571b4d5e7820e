//! Media Reconciler CLI
//!
//! Reconciles a media asset tree against the catalog database and applies
//! the cleanup operations selected by flags.

use chrono::Local;
use clap::Parser;
use env_logger::Env;
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;

use media_reconciler::config::{DEFAULT_HASH_PREFIX_LIMIT, DEFAULT_WORKERS};
use media_reconciler::{engine, report, CatalogDb, Config};

const ABOUT: &str = r#"
Media Reconciler - reconcile a media tree against the catalog database

Examples:
  media_reconciler --media-path /srv/media --db-path catalog.db -u -m -d
  media_reconciler --media-path /srv/media --db-path catalog.db -r -o
  media_reconciler --media-path /srv/media --db-path catalog.db --db-prefix mg2_ -x
  media_reconciler --media-path /srv/media --db-path catalog.db --json

Listing flags are read-only; -r, -o and -x mutate the filesystem and the
database and may be combined arbitrarily in one invocation.
"#;

/// Reconcile a media asset tree against the catalog database
#[derive(Parser)]
#[command(name = "media_reconciler")]
#[command(author, version, about = ABOUT, long_about = None)]
struct Cli {
    /// List unused media files
    #[arg(short = 'u', long)]
    list_unused: bool,

    /// List missing media files
    #[arg(short = 'm', long)]
    list_missing: bool,

    /// List duplicated files
    #[arg(short = 'd', long)]
    list_duplicates: bool,

    /// Remove unused media files
    #[arg(short = 'r', long)]
    remove_unused: bool,

    /// Remove orphaned media gallery rows
    #[arg(short = 'o', long)]
    remove_orphans: bool,

    /// Remove duplicated files and rewrite database references
    #[arg(short = 'x', long)]
    remove_duplicates: bool,

    /// Path to the media asset tree
    #[arg(long, value_name = "PATH")]
    media_path: PathBuf,

    /// Path to the catalog database file
    #[arg(long, value_name = "PATH")]
    db_path: PathBuf,

    /// Catalog table name prefix
    #[arg(long, default_value = "")]
    db_prefix: String,

    /// Number of parallel hashing workers
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Maximum leading bytes hashed per file
    #[arg(long, default_value_t = DEFAULT_HASH_PREFIX_LIMIT)]
    hash_limit: u64,

    /// Emit the report as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::builder()
        .media_root(cli.media_path)
        .db_path(cli.db_path)
        .table_prefix(cli.db_prefix)
        .workers(cli.workers)
        .hash_prefix_limit(cli.hash_limit)
        .list_unused(cli.list_unused)
        .list_missing(cli.list_missing)
        .list_duplicates(cli.list_duplicates)
        .remove_unused(cli.remove_unused)
        .remove_orphans(cli.remove_orphans)
        .remove_duplicates(cli.remove_duplicates)
        .build();

    let started = Local::now();

    let mut db = match CatalogDb::open(&config.db_path, config.table_prefix.as_str()) {
        Ok(db) => db,
        Err(err) => {
            eprintln!("Cannot open catalog database: {}", err);
            return ExitCode::FAILURE;
        }
    };

    info!("starting reconciliation of {:?}", config.media_root);
    let outcome = match engine::run(&config, &mut db) {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("Error: {}", err);
            return ExitCode::FAILURE;
        }
    };

    if cli.json {
        match report::render_json(&outcome, started, Local::now()) {
            Ok(rendered) => println!("{}", rendered),
            Err(err) => {
                eprintln!("Cannot render report: {}", err);
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    if config.list_unused {
        println!("\nUnused files:");
        let mut unused = outcome.unused.clone();
        unused.sort();
        for path in unused {
            println!("{}", path);
        }
    }

    if config.list_missing {
        println!("\nMissing files:");
        let mut missing = outcome.missing.clone();
        missing.sort();
        for path in missing {
            println!("{}", path);
        }
    }

    if config.list_duplicates {
        println!("\nDuplicate files:");
        let mut groups = outcome.duplicate_groups.clone();
        groups.sort_by_key(|group| group.digest);
        for group in groups {
            println!("Digest {:016x}:", group.digest);
            for file in &group.files {
                println!("  - {}", file.relative_path);
            }
        }
    }

    println!("\n{}", report::render_summary(&outcome));
    ExitCode::SUCCESS
}
