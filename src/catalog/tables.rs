//! Table definitions of the star schema, rendered to DDL per dialect.

use super::Dialect;

macro_rules! dwh_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            #[allow(unused_mut)]
            let mut column = Column {
                name: $name,
                sql_type: $sql_type,
                non_null: false,
                is_primary_key: false,
                is_identity: false,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Varchar(usize),
    Int,
    BigInt,
    Float,
    Timestamp,
}

impl SqlType {
    pub fn redshift_name(&self) -> String {
        match self {
            SqlType::Varchar(length) => format!("VARCHAR({})", length),
            SqlType::Int => "INT".to_string(),
            SqlType::BigInt => "BIGINT".to_string(),
            SqlType::Float => "FLOAT".to_string(),
            SqlType::Timestamp => "TIMESTAMP".to_string(),
        }
    }

    /// Declared type in SQLite, as reported back by `PRAGMA table_info`.
    pub fn sqlite_name(&self) -> &'static str {
        match self {
            SqlType::Varchar(_) | SqlType::Timestamp => "TEXT",
            SqlType::Int | SqlType::BigInt => "INTEGER",
            SqlType::Float => "REAL",
        }
    }

    pub fn max_length(&self) -> Option<usize> {
        match self {
            SqlType::Varchar(length) => Some(*length),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub non_null: bool,
    pub is_primary_key: bool,
    /// Synthetic auto-incrementing key.
    pub is_identity: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Staging,
    Fact,
    Dimension,
}

#[derive(Debug)]
pub struct Table {
    pub name: &'static str,
    pub kind: TableKind,
    pub columns: &'static [Column],
}

impl Table {
    pub fn primary_key(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.is_primary_key)
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Name of the index standing in for the key on dialects that cannot
    /// declare an unenforced primary key.
    pub fn key_index_name(&self) -> String {
        format!("{}_pkey", self.name)
    }

    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", self.name)
    }

    pub fn create_sql(&self, dialect: Dialect) -> String {
        match dialect {
            Dialect::Redshift => self.create_redshift(),
            Dialect::Sqlite => self.create_sqlite(),
        }
    }

    fn create_redshift(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|column| {
                let mut definition = format!("{} {}", column.name, column.sql_type.redshift_name());
                if column.is_identity {
                    definition.push_str(" IDENTITY(0,1)");
                }
                if column.is_primary_key {
                    definition.push_str(" PRIMARY KEY");
                }
                if column.non_null {
                    definition.push_str(" NOT NULL");
                }
                definition
            })
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);",
            self.name,
            columns.join(",\n    ")
        )
    }

    // SQLite enforces primary keys, the warehouse does not. Only the identity
    // column keeps a real key, the others become a plain index.
    fn create_sqlite(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|column| {
                let mut definition = format!("{} {}", column.name, column.sql_type.sqlite_name());
                if column.is_identity {
                    definition.push_str(" PRIMARY KEY AUTOINCREMENT");
                }
                if column.non_null {
                    definition.push_str(" NOT NULL");
                }
                definition
            })
            .collect();
        let mut sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);",
            self.name,
            columns.join(",\n    ")
        );
        if let Some(key) = self.primary_key().filter(|c| !c.is_identity) {
            sql.push_str(&format!(
                "\nCREATE INDEX IF NOT EXISTS {} ON {} ({});",
                self.key_index_name(),
                self.name,
                key.name
            ));
        }
        sql
    }
}

pub const STAGING_EVENTS: Table = Table {
    name: "staging_events",
    kind: TableKind::Staging,
    columns: &[
        dwh_column!("artist", SqlType::Varchar(255)),
        dwh_column!("auth", SqlType::Varchar(255)),
        dwh_column!("firstName", SqlType::Varchar(100)),
        dwh_column!("gender", SqlType::Varchar(1)),
        dwh_column!("itemInSession", SqlType::Int),
        dwh_column!("lastName", SqlType::Varchar(100)),
        dwh_column!("length", SqlType::Float),
        dwh_column!("level", SqlType::Varchar(20)),
        dwh_column!("location", SqlType::Varchar(255)),
        dwh_column!("method", SqlType::Varchar(10)),
        dwh_column!("page", SqlType::Varchar(50)),
        dwh_column!("registration", SqlType::Float),
        dwh_column!("sessionId", SqlType::Int),
        dwh_column!("song", SqlType::Varchar(255)),
        dwh_column!("status", SqlType::Int),
        dwh_column!("ts", SqlType::BigInt),
        dwh_column!("userAgent", SqlType::Varchar(255)),
        dwh_column!("userId", SqlType::Int),
    ],
};

pub const STAGING_SONGS: Table = Table {
    name: "staging_songs",
    kind: TableKind::Staging,
    columns: &[
        dwh_column!("num_songs", SqlType::Int),
        dwh_column!("artist_id", SqlType::Varchar(18)),
        dwh_column!("artist_latitude", SqlType::Float),
        dwh_column!("artist_longitude", SqlType::Float),
        dwh_column!("artist_location", SqlType::Varchar(255)),
        dwh_column!("artist_name", SqlType::Varchar(255)),
        dwh_column!("song_id", SqlType::Varchar(18)),
        dwh_column!("title", SqlType::Varchar(255)),
        dwh_column!("duration", SqlType::Float),
        dwh_column!("year", SqlType::Int),
    ],
};

pub const SONGPLAYS: Table = Table {
    name: "songplays",
    kind: TableKind::Fact,
    columns: &[
        dwh_column!(
            "songplay_id",
            SqlType::Int,
            is_primary_key = true,
            is_identity = true
        ),
        dwh_column!("start_time", SqlType::Timestamp, non_null = true),
        dwh_column!("user_id", SqlType::Int, non_null = true),
        dwh_column!("level", SqlType::Varchar(20)),
        dwh_column!("song_id", SqlType::Varchar(18), non_null = true),
        dwh_column!("artist_id", SqlType::Varchar(18), non_null = true),
        dwh_column!("session_id", SqlType::Int),
        dwh_column!("location", SqlType::Varchar(255)),
        dwh_column!("user_agent", SqlType::Varchar(255)),
    ],
};

pub const USERS: Table = Table {
    name: "users",
    kind: TableKind::Dimension,
    columns: &[
        dwh_column!("user_id", SqlType::Int, is_primary_key = true),
        dwh_column!("first_name", SqlType::Varchar(100), non_null = true),
        dwh_column!("last_name", SqlType::Varchar(100), non_null = true),
        dwh_column!("gender", SqlType::Varchar(1)),
        dwh_column!("level", SqlType::Varchar(20), non_null = true),
    ],
};

pub const SONGS: Table = Table {
    name: "songs",
    kind: TableKind::Dimension,
    columns: &[
        dwh_column!("song_id", SqlType::Varchar(18), is_primary_key = true),
        dwh_column!("title", SqlType::Varchar(255), non_null = true),
        dwh_column!("artist_id", SqlType::Varchar(18), non_null = true),
        dwh_column!("year", SqlType::Int),
        dwh_column!("duration", SqlType::Float),
    ],
};

pub const ARTISTS: Table = Table {
    name: "artists",
    kind: TableKind::Dimension,
    columns: &[
        dwh_column!("artist_id", SqlType::Varchar(18), is_primary_key = true),
        dwh_column!("name", SqlType::Varchar(255), non_null = true),
        dwh_column!("location", SqlType::Varchar(255)),
        dwh_column!("latitude", SqlType::Float),
        dwh_column!("longitude", SqlType::Float),
    ],
};

pub const TIME: Table = Table {
    name: "time",
    kind: TableKind::Dimension,
    columns: &[
        dwh_column!("start_time", SqlType::Timestamp, is_primary_key = true),
        dwh_column!("hour", SqlType::Int, non_null = true),
        dwh_column!("day", SqlType::Int, non_null = true),
        dwh_column!("week", SqlType::Int, non_null = true),
        dwh_column!("month", SqlType::Int, non_null = true),
        dwh_column!("year", SqlType::Int, non_null = true),
        dwh_column!("weekday", SqlType::Varchar(10), non_null = true),
    ],
};

/// All tables in drop/create order: staging, fact, dimensions.
pub const TABLES: &[&Table] = &[
    &STAGING_EVENTS,
    &STAGING_SONGS,
    &SONGPLAYS,
    &USERS,
    &SONGS,
    &ARTISTS,
    &TIME,
];
