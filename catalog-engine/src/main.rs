//! Catalog Engine Main Entry Point
//!
//! Command line access to the offline jobs of the editorial engine: index
//! setup, snapshot export and import, backups, dedup runs and lock sweeping.

use std::env;
use std::path::PathBuf;

use catalog_engine::bulk::{self, ExportConfig, ImportOptions};
use catalog_engine::dedup::DedupConfig;
use catalog_engine::{Actor, CatalogError, Dependencies, EngineError};
use catalog_shared::types::envelope::now;
use catalog_shared::{Core, Query, Role, Visibility};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "catalog-engine")]
#[command(about = "Editorial metadata engine for the university bibliography catalogs")]
struct Cli {
    /// User recorded as the actor of imports and unlocks
    #[arg(long, env = "CATALOG_USER", default_value = "system", global = true)]
    user: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create missing core indices
    InitIndices,

    /// Write the records of a core to `<dir>/<core>_<timestamp>.json`
    Export {
        #[arg(long)]
        core: Core,
        /// Query selecting the records, e.g. `-editorial_status:imported`
        #[arg(long)]
        filter: Option<String>,
        /// Target directory (default: EXPORT_DIR)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Leave records marked deleted out of the snapshot
        #[arg(long)]
        skip_deleted: bool,
    },

    /// Full backup of every core into a weekday folder
    Backup {
        /// Limit the backup to one core
        #[arg(long)]
        core: Option<Core>,
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Import a snapshot file into a core
    Import {
        #[arg(long)]
        core: Core,
        #[arg(long)]
        file: PathBuf,
        /// Abort at the first record that fails
        #[arg(long)]
        stop_on_error: bool,
    },

    /// Regenerate the dedup candidate queue
    Dedup {
        #[arg(long, default_value = "10")]
        max_candidates: usize,
        #[arg(long, default_value = "0")]
        min_probability: u8,
    },

    /// List records whose lock is older than LOCK_SWEEP_AGE_SECS
    SweepLocks {
        #[arg(long)]
        core: Option<Core>,
    },

    /// Clear the lock of one record
    Unlock {
        #[arg(long)]
        core: Core,
        #[arg(long)]
        id: String,
    },
}

/// Initialize tracing/logging.
fn init_tracing() -> Result<(), CatalogError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("catalog_engine=info,catalog_repository=info"));

    let json = env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init()
            .map_err(|e| CatalogError::config(e.to_string()))?;

        info!(
            service_name = "catalog-engine",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with JSON format"
        );
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .try_init()
            .map_err(|e| CatalogError::config(e.to_string()))?;

        info!(
            service_name = "catalog-engine",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with console output"
        );
    }

    Ok(())
}

async fn run(cli: Cli, deps: Dependencies) -> Result<(), CatalogError> {
    let actor = Actor::new(cli.user, Role::Superadmin);

    match cli.command {
        Command::InitIndices => {
            deps.init_indices().await?;
            info!("Indices ready");
        }
        Command::Export {
            core,
            filter,
            dir,
            skip_deleted,
        } => {
            let filter = match filter {
                Some(raw) => Query::parse(&raw).map_err(EngineError::from)?,
                None => Query::MatchAll,
            };
            let mut config = ExportConfig::new(dir.unwrap_or(deps.settings.export_dir.clone()))
                .with_filter(filter);
            if skip_deleted {
                config.visibility = Visibility::Public;
            }
            let summary = bulk::export(&deps.gateway, core, &config).await?;
            info!(path = %summary.path.display(), records = summary.records, "Snapshot written");
        }
        Command::Backup { core, dir } => {
            let dir = dir.unwrap_or(deps.settings.export_dir.clone());
            let at = now();
            let cores = core.map_or_else(|| Core::all().to_vec(), |core| vec![core]);
            for core in cores {
                let summary = bulk::backup(&deps.gateway, core, &dir, at).await?;
                info!(
                    core = %core,
                    path = %summary.path.display(),
                    records = summary.records,
                    not_imported = summary.not_imported,
                    "Backup written"
                );
            }
        }
        Command::Import {
            core,
            file,
            stop_on_error,
        } => {
            let options = ImportOptions { stop_on_error };
            let summary = bulk::import_file(&deps.engine, &actor, core, &file, &options).await?;
            for failure in &summary.failures {
                error!(index = failure.index, id = ?failure.id, error = %failure.error, "Not imported");
            }
            info!(
                imported = summary.imported,
                failed = summary.failures.len(),
                duplicates = summary.duplicates,
                "Import done"
            );
        }
        Command::Dedup {
            max_candidates,
            min_probability,
        } => {
            let config = DedupConfig {
                max_candidates,
                min_probability,
            };
            let run = deps.dedup_job(config).await?.start().join_or_interrupt().await?;
            info!(
                completed = run.completed,
                works_scanned = run.works_scanned,
                candidates_emitted = run.candidates_emitted,
                "Dedup run finished"
            );
        }
        Command::SweepLocks { core } => {
            let sweeper = deps.sweeper()?;
            let cores = core.map_or_else(|| Core::all().to_vec(), |core| vec![core]);
            for core in cores {
                for lock in sweeper.scan(core).await? {
                    info!(
                        core = %lock.core,
                        id = %lock.id,
                        locked_since = lock.locked_since.as_deref().unwrap_or(""),
                        changed = lock.changed.as_deref().unwrap_or(""),
                        "Stale lock"
                    );
                }
            }
        }
        Command::Unlock { core, id } => {
            deps.sweeper()?.unlock(&actor, core, &id).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), CatalogError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing()?;

    let cli = Cli::parse();

    let deps = match Dependencies::new().await {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    match run(cli, deps).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!(error = %e, "Command failed");
            Err(e)
        }
    }
}
