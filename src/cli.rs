//! Pieces shared by the `create-tables` and `etl` binaries.

use crate::catalog::{Dialect, JsonFormat, SchemaCatalog, Statement};
use crate::config::DwhConfig;
use crate::error::Phase;
use crate::warehouse::{local_path, WarehouseTarget};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_CONFIG_FILE: &str = "dwh.cfg";

pub fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
pub struct CliArgs {
    /// Path to the INI config file with the CLUSTER, IAM_ROLE and S3 sections.
    #[clap(value_parser = parse_path, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Run against a local SQLite file instead of the cluster. S3 paths in
    /// the config are then read as local files or directories, and the
    /// staging loads read those files instead of running COPY.
    #[clap(long, value_parser = parse_path)]
    pub local_db: Option<PathBuf>,

    /// Print the statements in execution order without connecting.
    #[clap(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// Loads the config and builds the catalog for the selected target.
    pub fn prepare(&self) -> Result<(SchemaCatalog, WarehouseTarget)> {
        let config = DwhConfig::load(&self.config)
            .with_context(|| format!("Could not load config from {}", self.config.display()))?;
        let target = match &self.local_db {
            Some(path) => WarehouseTarget::Local(path.clone()),
            None => WarehouseTarget::Redshift(config.cluster.clone()),
        };
        let catalog = SchemaCatalog::new(&config, target.dialect());
        Ok((catalog, target))
    }
}

/// Logging goes to stderr, filtered by `LOG_LEVEL` (default `info`).
pub fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")
}

pub fn print_phases(catalog: &SchemaCatalog, phases: &[Phase]) {
    for &phase in phases {
        println!("-- {} phase", phase);
        for statement in catalog.group(phase) {
            println!("{}", describe(statement, catalog.dialect()));
        }
    }
}

/// Dry-run text of one statement. The local backend never sends COPY text,
/// so its staging loads are shown as the file load they run instead.
fn describe(statement: &Statement, dialect: Dialect) -> String {
    match statement.copy_spec() {
        Some(spec) if dialect == Dialect::Sqlite => {
            let format = match &spec.format {
                JsonFormat::Auto => "JSON auto".to_string(),
                JsonFormat::JsonPaths(paths) => {
                    format!("JSONPaths {}", local_path(paths).display())
                }
            };
            format!(
                "-- {}\n-- local file load into {} from {} ({}{})\n",
                statement.name(),
                spec.table.name,
                local_path(&spec.source).display(),
                format,
                if spec.truncate_columns {
                    ", TRUNCATECOLUMNS"
                } else {
                    ""
                }
            )
        }
        _ => format!("-- {}\n{}\n", statement.name(), statement.text()),
    }
}

pub fn log_report(phases: &[Phase], committed: usize) {
    let names: Vec<String> = phases.iter().map(|p| p.to_string()).collect();
    info!(
        "Done: {} phases, {} statements committed.",
        names.join(" + "),
        committed
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Dialect;
    use std::io::Write;

    #[test]
    fn defaults_to_dwh_cfg_in_working_directory() {
        let args = CliArgs::try_parse_from(["etl"]).unwrap();
        assert_eq!(
            args.config,
            std::env::current_dir().unwrap().join(DEFAULT_CONFIG_FILE)
        );
        assert!(args.local_db.is_none());
        assert!(!args.dry_run);
    }

    #[test]
    fn local_db_selects_sqlite_dialect() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"[CLUSTER]\nHOST=h\nDB_NAME=d\nDB_USER=u\nDB_PASSWORD=p\nDB_PORT=5439\n\
              [IAM_ROLE]\nARN=a\n[S3]\nLOG_DATA=l\nLOG_JSONPATH=j\nSONG_DATA=s\n",
        )
        .unwrap();
        let config = file.path().display().to_string();

        let args = CliArgs::try_parse_from(["etl", &config, "--local-db", "/tmp/dwh.db"]).unwrap();
        let (catalog, target) = args.prepare().unwrap();
        assert_eq!(catalog.dialect(), Dialect::Sqlite);
        assert!(matches!(target, WarehouseTarget::Local(_)));

        let args = CliArgs::try_parse_from(["etl", &config]).unwrap();
        let (catalog, target) = args.prepare().unwrap();
        assert_eq!(catalog.dialect(), Dialect::Redshift);
        assert!(matches!(target, WarehouseTarget::Redshift(ref c) if c.db_port == 5439));
    }

    fn catalog_for(dialect: Dialect) -> SchemaCatalog {
        let config = DwhConfig::from_ini_str(
            "[CLUSTER]\nHOST=h\nDB_NAME=d\nDB_USER=u\nDB_PASSWORD=p\nDB_PORT=5439\n\
             [IAM_ROLE]\nARN=a\n[S3]\nLOG_DATA=file:///data/log_data\n\
             LOG_JSONPATH=/data/log_json_path.json\nSONG_DATA=/data/song_data\n",
        )
        .unwrap();
        SchemaCatalog::new(&config, dialect)
    }

    #[test]
    fn local_dry_run_shows_file_loads() {
        let catalog = catalog_for(Dialect::Sqlite);
        let events = describe(&catalog.copy()[0], catalog.dialect());
        assert!(!events.contains("IAM_ROLE"), "{}", events);
        assert!(events.contains(
            "local file load into staging_events from /data/log_data \
             (JSONPaths /data/log_json_path.json)"
        ));
        let songs = describe(&catalog.copy()[1], catalog.dialect());
        assert!(songs.contains("from /data/song_data (JSON auto, TRUNCATECOLUMNS)"));

        let insert = describe(&catalog.insert()[0], catalog.dialect());
        assert!(insert.contains(catalog.insert()[0].text()));
    }

    #[test]
    fn cluster_dry_run_shows_copy_text() {
        let catalog = catalog_for(Dialect::Redshift);
        let events = describe(&catalog.copy()[0], catalog.dialect());
        assert!(events.contains(catalog.copy()[0].text()));
        assert!(events.contains("IAM_ROLE"));
    }

    #[test]
    fn missing_config_fails_prepare() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = dir.path().join("dwh.cfg").display().to_string();
        let args = CliArgs::try_parse_from(["create-tables", &config]).unwrap();
        assert!(args.prepare().is_err());
    }
}
