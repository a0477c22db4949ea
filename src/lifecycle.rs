//! Schema reset: drops and recreates every table of the catalog.

use crate::catalog::{Dialect, SchemaCatalog};
use crate::error::{Phase, RunError};
use crate::runner::{run_phases, RunReport};
use crate::warehouse::Warehouse;
use anyhow::{bail, Result};
use rusqlite::{params, Connection};
use std::collections::BTreeSet;

/// Drops then recreates all seven tables, destroying their data.
///
/// Safe to repeat. On failure the statements listed in
/// [`RunError::committed`] remain applied, leaving a partially reset schema.
pub fn reset_schema<W: Warehouse + ?Sized>(
    warehouse: &mut W,
    catalog: &SchemaCatalog,
) -> Result<RunReport, RunError> {
    run_phases(warehouse, catalog, &[Phase::Drop, Phase::Create])
}

struct ActualColumn {
    name: String,
    sql_type: String,
    non_null: bool,
    is_primary_key: bool,
}

/// Checks a local warehouse against the catalog's table definitions: the
/// table set, column names, types, nullability and key indexes.
pub fn verify_schema(conn: &Connection, catalog: &SchemaCatalog) -> Result<()> {
    if catalog.dialect() != Dialect::Sqlite {
        bail!("Schema verification needs a catalog in the SQLite dialect");
    }

    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
    )?;
    let actual_tables: BTreeSet<String> = stmt
        .query_map(params![], |row| row.get(0))?
        .collect::<Result<_, _>>()?;
    let expected_tables: BTreeSet<String> =
        catalog.tables().iter().map(|t| t.name.to_string()).collect();
    if actual_tables != expected_tables {
        bail!(
            "Expected tables {:?}, found {:?}",
            expected_tables,
            actual_tables
        );
    }

    for table in catalog.tables() {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", table.name))?;
        let actual_columns: Vec<ActualColumn> = stmt
            .query_map(params![], |row| {
                Ok(ActualColumn {
                    name: row.get(1)?,
                    sql_type: row.get(2)?,
                    non_null: row.get::<_, i32>(3)? == 1,
                    is_primary_key: row.get::<_, i32>(5)? > 0,
                })
            })?
            .collect::<Result<_, _>>()?;

        if actual_columns.len() != table.columns.len() {
            bail!(
                "Table {} has {} columns, expected {}. Found column names: {}, expected: {}",
                table.name,
                actual_columns.len(),
                table.columns.len(),
                actual_columns
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                table.column_names().join(", ")
            );
        }

        for (actual, expected) in actual_columns.iter().zip(table.columns.iter()) {
            if actual.name != expected.name {
                bail!(
                    "Table {} Column name mismatch: expected {}, got {}",
                    table.name,
                    expected.name,
                    actual.name
                );
            }
            if actual.sql_type != expected.sql_type.sqlite_name() {
                bail!(
                    "Table {} Column {} type mismatch: expected {}, got {}",
                    table.name,
                    expected.name,
                    expected.sql_type.sqlite_name(),
                    actual.sql_type
                );
            }
            if actual.non_null != expected.non_null {
                bail!(
                    "Table {} Column {} non-null mismatch: expected {}, got {}",
                    table.name,
                    expected.name,
                    expected.non_null,
                    actual.non_null
                );
            }
            if actual.is_primary_key != expected.is_identity {
                bail!(
                    "Table {} Column {} primary key mismatch",
                    table.name,
                    expected.name
                );
            }
        }

        if let Some(key) = table.primary_key().filter(|c| !c.is_identity) {
            let index_name = table.key_index_name();
            let mut stmt = conn.prepare(&format!("PRAGMA index_info({});", index_name))?;
            let indexed: Vec<String> = stmt
                .query_map(params![], |row| row.get(2))?
                .collect::<Result<_, _>>()?;
            if indexed != [key.name] {
                bail!(
                    "Table {} key index {} covers {:?}, expected [{}]",
                    table.name,
                    index_name,
                    indexed,
                    key.name
                );
            }
        }
    }

    Ok(())
}
