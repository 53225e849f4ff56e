mod report;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use shopmigrate_config::{AppConfig, ConfigLoader, LogConfig};
use shopmigrate_db::{ConnectionOptions, Manifest, MigrationApplier, catalog, open_database};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "shopmigrate",
    version,
    about = "Apply the shop database schema in dependency order"
)]
struct Cli {
    /// Path to a config file (defaults to ~/.config/shopmigrate/config.yml)
    #[arg(long, global = true, env = "SHOPMIGRATE_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database to migrate, overriding the config
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `shopmigrate_db=trace`
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the order units would be applied in, without touching the database
    Plan {
        #[arg(long)]
        json: bool,
    },
    /// Apply every pending unit
    Migrate,
    /// Show which units are recorded in the ledger
    Status {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (loader, config) = load_config(cli.config.as_deref())?;
    init_tracing(&config.log, cli.log_level.as_deref());

    let applier = build_applier(&config)?;
    let db_path = cli
        .database
        .clone()
        .unwrap_or_else(|| loader.database_path(&config));
    let options = ConnectionOptions {
        busy_timeout: Duration::from_millis(config.database.busy_timeout_ms),
        foreign_keys: config.database.foreign_keys,
    };

    match cli.command {
        Command::Plan { json } => {
            let plan = applier.plan().context("failed to order migration units")?;
            report::print_plan(&plan, json)?;
        }
        Command::Status { json } => {
            let conn = open_database(&db_path, &options)?;
            let statuses = applier.status(&conn)?;
            report::print_status(&statuses, json)?;
        }
        Command::Migrate => migrate(applier, db_path, options).await?,
    }

    Ok(())
}

fn load_config(explicit: Option<&Path>) -> Result<(ConfigLoader, AppConfig)> {
    match explicit {
        Some(path) => {
            let dir = path.parent().unwrap_or(Path::new("."));
            let loader = ConfigLoader::with_dir(dir);
            let mut config = loader
                .load_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?;
            shopmigrate_config::loader::apply_overrides(&mut config, |key| std::env::var(key).ok());
            Ok((loader, config))
        }
        None => {
            let loader = ConfigLoader::new();
            let config = loader.load().context("failed to load config")?;
            Ok((loader, config))
        }
    }
}

/// `--log-level` wins over `RUST_LOG`, which wins over the config file.
fn init_tracing(log: &LogConfig, flag: Option<&str>) {
    let filter = match flag {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level)),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_applier(config: &AppConfig) -> Result<MigrationApplier> {
    let mut applier = MigrationApplier::new()
        .with_ledger_table(config.database.ledger_table.clone())
        .on_progress(|report| println!("{report}"));

    if config.catalog.builtin {
        applier.register_all(catalog::shop_units())?;
    }
    for path in &config.catalog.manifests {
        let manifest = Manifest::load(path)
            .with_context(|| format!("failed to load manifest {}", path.display()))?;
        applier.register_all(manifest.units)?;
    }

    if applier.is_empty() {
        bail!("no migration units registered (catalog.builtin is off and no manifests are listed)");
    }
    info!("{} migration unit(s) registered", applier.len());
    Ok(applier)
}

async fn migrate(
    applier: MigrationApplier,
    db_path: PathBuf,
    options: ConnectionOptions,
) -> Result<()> {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current unit");
            flag.store(true, Ordering::SeqCst);
        }
    });

    let outcome = tokio::task::spawn_blocking(move || {
        let mut conn = open_database(&db_path, &options)?;
        applier.migrate(&mut conn, &cancel)
    })
    .await
    .context("migration task panicked")?;

    let run = match outcome {
        Ok(run) => run,
        Err(e) => {
            let unit = e.unit().map(str::to_string);
            let err = anyhow::Error::new(e);
            return Err(match unit {
                Some(unit) => err.context(format!("migration failed at unit {unit}")),
                None => err.context("migration failed"),
            });
        }
    };

    report::print_summary(&run);
    if run.cancelled {
        bail!("migration cancelled; rerun to apply the remaining units");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "shopmigrate",
            "plan",
            "--json",
            "--database",
            "/tmp/shop.db",
        ])
        .unwrap();
        assert_eq!(cli.database, Some(PathBuf::from("/tmp/shop.db")));
        assert!(matches!(cli.command, Command::Plan { json: true }));
    }

    #[test]
    fn manifest_only_config_without_units_is_rejected() {
        let mut config = AppConfig::default();
        config.catalog.builtin = false;
        let err = build_applier(&config).err().unwrap();
        assert!(err.to_string().contains("no migration units registered"));
    }

    #[test]
    fn builtin_catalog_is_registered_by_default() {
        let applier = build_applier(&AppConfig::default()).unwrap();
        assert_eq!(applier.len(), catalog::shop_units().len());
    }
}
