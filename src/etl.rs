use anyhow::{Context, Result};
use clap::Parser;
use sparkify_dwh::cli::{init_tracing, log_report, print_phases, CliArgs};
use sparkify_dwh::{run_load, with_connection, Phase};

const PHASES: &[Phase] = &[Phase::Copy, Phase::Insert];

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();
    init_tracing()?;

    let (catalog, target) = cli_args.prepare()?;
    if cli_args.dry_run {
        print_phases(&catalog, PHASES);
        return Ok(());
    }

    let report = with_connection(&target, |conn| {
        run_load(conn, &catalog).map_err(anyhow::Error::from)
    })
    .context("Load failed")?;

    log_report(PHASES, report.committed.len());
    Ok(())
}
