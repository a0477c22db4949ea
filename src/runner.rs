use crate::catalog::SchemaCatalog;
use crate::error::{Phase, RunError};
use crate::warehouse::Warehouse;
use tracing::{debug, error, info};

/// Statements committed by a completed run, in execution order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub committed: Vec<String>,
}

/// Executes the catalog groups of `phases` in order, stopping at the first
/// failing statement.
pub(crate) fn run_phases<W: Warehouse + ?Sized>(
    warehouse: &mut W,
    catalog: &SchemaCatalog,
    phases: &[Phase],
) -> Result<RunReport, RunError> {
    let mut report = RunReport::default();
    for &phase in phases {
        let statements = catalog.group(phase);
        info!("Running {} phase, {} statements", phase, statements.len());
        for statement in statements {
            info!("Executing {}...", statement.name());
            debug!("{}", statement.text());
            if let Err(source) = warehouse.execute(statement) {
                error!(
                    "{} failed, {} statements were already committed",
                    statement.name(),
                    report.committed.len()
                );
                return Err(RunError {
                    phase,
                    statement: statement.name().to_string(),
                    committed: report.committed,
                    source,
                });
            }
            report.committed.push(statement.name().to_string());
        }
    }
    Ok(report)
}
