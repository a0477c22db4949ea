//! The load run: bulk copy into staging, then transform into the star schema.

use crate::catalog::SchemaCatalog;
use crate::error::{Phase, RunError};
use crate::runner::{run_phases, RunReport};
use crate::warehouse::Warehouse;

/// Runs every copy statement, then every insert statement.
///
/// A failed copy stops the run before any insert reads the partial staging
/// data. Inserts are not idempotent: running this twice without a schema
/// reset appends the staging data again and duplicates fact and dimension
/// rows.
pub fn run_load<W: Warehouse + ?Sized>(
    warehouse: &mut W,
    catalog: &SchemaCatalog,
) -> Result<RunReport, RunError> {
    run_phases(warehouse, catalog, &[Phase::Copy, Phase::Insert])
}
