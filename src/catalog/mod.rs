//! The schema catalog: every statement the two entry points execute,
//! grouped and ordered.

mod queries;
mod tables;

pub use queries::{quote_literal, CopySpec, JsonFormat};
pub use tables::{
    Column, SqlType, Table, TableKind, ARTISTS, SONGPLAYS, SONGS, STAGING_EVENTS, STAGING_SONGS,
    TABLES, TIME, USERS,
};

use crate::config::DwhConfig;
use crate::error::Phase;

/// SQL flavour the catalog is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Redshift,
    Sqlite,
}

#[derive(Debug, Clone)]
pub struct Statement {
    name: String,
    sql: String,
    copy: Option<CopySpec>,
}

impl Statement {
    fn plain(name: String, sql: String) -> Self {
        Statement {
            name,
            sql,
            copy: None,
        }
    }

    fn copy(spec: CopySpec) -> Self {
        Statement {
            name: format!("copy_{}", spec.table.name),
            sql: spec.sql(),
            copy: Some(spec),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.sql
    }

    /// Set for staging loads, which backends without a native COPY run
    /// themselves.
    pub fn copy_spec(&self) -> Option<&CopySpec> {
        self.copy.as_ref()
    }
}

#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    dialect: Dialect,
    drop: Vec<Statement>,
    create: Vec<Statement>,
    copy: Vec<Statement>,
    insert: Vec<Statement>,
}

impl SchemaCatalog {
    pub fn new(config: &DwhConfig, dialect: Dialect) -> Self {
        let drop = TABLES
            .iter()
            .map(|table| Statement::plain(format!("drop_{}", table.name), table.drop_sql()))
            .collect();

        let create = TABLES
            .iter()
            .map(|table| {
                Statement::plain(
                    format!("create_{}", table.name),
                    table.create_sql(dialect),
                )
            })
            .collect();

        let copy = vec![
            Statement::copy(CopySpec {
                table: &STAGING_EVENTS,
                source: config.s3.log_data.clone(),
                iam_role: config.iam_role_arn.clone(),
                region: config.s3.region.clone(),
                format: JsonFormat::JsonPaths(config.s3.log_jsonpath.clone()),
                truncate_columns: false,
            }),
            Statement::copy(CopySpec {
                table: &STAGING_SONGS,
                source: config.s3.song_data.clone(),
                iam_role: config.iam_role_arn.clone(),
                region: config.s3.region.clone(),
                format: JsonFormat::Auto,
                truncate_columns: true,
            }),
        ];

        // The fact table goes first although it logically references the
        // dimensions. Harmless while keys stay unenforced.
        let insert = queries::insert_queries(dialect)
            .iter()
            .map(|(table, sql)| Statement::plain(format!("insert_{}", table), sql.to_string()))
            .collect();

        SchemaCatalog {
            dialect,
            drop,
            create,
            copy,
            insert,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn tables(&self) -> &'static [&'static Table] {
        TABLES
    }

    pub fn drop(&self) -> &[Statement] {
        &self.drop
    }

    pub fn create(&self) -> &[Statement] {
        &self.create
    }

    pub fn copy(&self) -> &[Statement] {
        &self.copy
    }

    pub fn insert(&self) -> &[Statement] {
        &self.insert
    }

    pub fn group(&self, phase: Phase) -> &[Statement] {
        match phase {
            Phase::Drop => self.drop(),
            Phase::Create => self.create(),
            Phase::Copy => self.copy(),
            Phase::Insert => self.insert(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClusterConfig, S3Config, SslMode};

    fn test_config() -> DwhConfig {
        DwhConfig {
            cluster: ClusterConfig {
                host: "localhost".to_string(),
                db_name: "dwh".to_string(),
                db_user: "dwhuser".to_string(),
                db_password: "secret".to_string(),
                db_port: 5439,
                ssl_mode: SslMode::Prefer,
            },
            iam_role_arn: "arn:aws:iam::123456789012:role/dwhRole".to_string(),
            s3: S3Config {
                log_data: "s3://udacity-dend/log_data".to_string(),
                log_jsonpath: "s3://udacity-dend/log_json_path.json".to_string(),
                song_data: "s3://udacity-dend/song_data".to_string(),
                region: "us-west-2".to_string(),
            },
        }
    }

    fn names(statements: &[Statement]) -> Vec<&str> {
        statements.iter().map(|s| s.name()).collect()
    }

    #[test]
    fn drop_order() {
        let catalog = SchemaCatalog::new(&test_config(), Dialect::Redshift);
        assert_eq!(
            names(catalog.drop()),
            [
                "drop_staging_events",
                "drop_staging_songs",
                "drop_songplays",
                "drop_users",
                "drop_songs",
                "drop_artists",
                "drop_time",
            ]
        );
        assert!(catalog
            .drop()
            .iter()
            .all(|s| s.text().starts_with("DROP TABLE IF EXISTS ")));
    }

    #[test]
    fn create_order() {
        for dialect in [Dialect::Redshift, Dialect::Sqlite] {
            let catalog = SchemaCatalog::new(&test_config(), dialect);
            assert_eq!(
                names(catalog.create()),
                [
                    "create_staging_events",
                    "create_staging_songs",
                    "create_songplays",
                    "create_users",
                    "create_songs",
                    "create_artists",
                    "create_time",
                ]
            );
            assert!(catalog
                .create()
                .iter()
                .all(|s| s.text().starts_with("CREATE TABLE IF NOT EXISTS ")));
        }
    }

    #[test]
    fn insert_order_puts_fact_table_first() {
        let catalog = SchemaCatalog::new(&test_config(), Dialect::Redshift);
        assert_eq!(
            names(catalog.insert()),
            [
                "insert_songplays",
                "insert_users",
                "insert_songs",
                "insert_artists",
                "insert_time",
            ]
        );
        assert!(catalog.insert().iter().all(|s| s.copy_spec().is_none()));
    }

    #[test]
    fn copy_statements_are_parameterized_by_config() {
        let catalog = SchemaCatalog::new(&test_config(), Dialect::Redshift);
        assert_eq!(
            names(catalog.copy()),
            ["copy_staging_events", "copy_staging_songs"]
        );

        let events = &catalog.copy()[0];
        assert_eq!(
            events.text(),
            "COPY staging_events FROM 's3://udacity-dend/log_data'\n\
             IAM_ROLE 'arn:aws:iam::123456789012:role/dwhRole'\n\
             COMPUPDATE OFF REGION 'us-west-2'\n\
             JSON 's3://udacity-dend/log_json_path.json';"
        );
        let spec = events.copy_spec().unwrap();
        assert_eq!(spec.table.name, "staging_events");
        assert!(!spec.truncate_columns);

        let songs = &catalog.copy()[1];
        assert!(songs.text().contains("FROM 's3://udacity-dend/song_data'"));
        assert!(songs.text().ends_with("JSON 'auto' TRUNCATECOLUMNS;"));
        assert_eq!(songs.copy_spec().unwrap().format, JsonFormat::Auto);
    }

    #[test]
    fn artist_insert_has_no_null_filter() {
        let catalog = SchemaCatalog::new(&test_config(), Dialect::Redshift);
        let artists = catalog
            .insert()
            .iter()
            .find(|s| s.name() == "insert_artists")
            .unwrap();
        assert!(!artists.text().contains("IS NOT NULL"));
        assert!(!artists.text().contains("WHERE"));
    }

    #[test]
    fn group_maps_phases() {
        let catalog = SchemaCatalog::new(&test_config(), Dialect::Sqlite);
        assert_eq!(catalog.group(Phase::Drop).len(), 7);
        assert_eq!(catalog.group(Phase::Create).len(), 7);
        assert_eq!(catalog.group(Phase::Copy).len(), 2);
        assert_eq!(catalog.group(Phase::Insert).len(), 5);
        assert_eq!(catalog.dialect(), Dialect::Sqlite);
        assert_eq!(catalog.tables().len(), 7);
    }
}
