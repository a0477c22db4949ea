use anyhow::{Context, Result};
use clap::Parser;
use sparkify_dwh::cli::{init_tracing, log_report, print_phases, CliArgs};
use sparkify_dwh::{reset_schema, verify_schema, with_connection, Phase, WarehouseTarget};
use tracing::info;

const PHASES: &[Phase] = &[Phase::Drop, Phase::Create];

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();
    init_tracing()?;

    let (catalog, target) = cli_args.prepare()?;
    if cli_args.dry_run {
        print_phases(&catalog, PHASES);
        return Ok(());
    }

    let report = with_connection(&target, |conn| {
        reset_schema(conn, &catalog).map_err(anyhow::Error::from)
    })
    .context("Schema reset failed")?;

    if let WarehouseTarget::Local(db_path) = &target {
        let conn = rusqlite::Connection::open(db_path)?;
        verify_schema(&conn, &catalog).context("Schema verification failed")?;
        info!("Local schema verified.");
    }

    log_report(PHASES, report.committed.len());
    Ok(())
}
