//! Transform statements moving staging rows into the fact and dimension
//! tables, and the staging COPY statements.

use super::tables::Table;
use super::Dialect;

const SONGPLAY_INSERT_REDSHIFT: &str = r#"INSERT INTO songplays
    (start_time,
    user_id,
    level,
    song_id,
    artist_id,
    session_id,
    location,
    user_agent)
SELECT
    TIMESTAMP 'epoch' + events.ts/1000 * interval '1 second',
    events.userId,
    events.level,
    songs.song_id,
    songs.artist_id,
    events.sessionId,
    events.location,
    events.userAgent
FROM staging_events AS events
JOIN staging_songs AS songs
    ON events.song = songs.title
    AND events.artist = songs.artist_name
    AND events.length = songs.duration
WHERE events.page = 'NextSong';"#;

const SONGPLAY_INSERT_SQLITE: &str = r#"INSERT INTO songplays
    (start_time,
    user_id,
    level,
    song_id,
    artist_id,
    session_id,
    location,
    user_agent)
SELECT
    datetime(events.ts / 1000, 'unixepoch'),
    events.userId,
    events.level,
    songs.song_id,
    songs.artist_id,
    events.sessionId,
    events.location,
    events.userAgent
FROM staging_events AS events
JOIN staging_songs AS songs
    ON events.song = songs.title
    AND events.artist = songs.artist_name
    AND events.length = songs.duration
WHERE events.page = 'NextSong';"#;

// DISTINCT collapses identical tuples only, a user who changed level keeps
// one row per level.
const USER_INSERT: &str = r#"INSERT INTO users
    (user_id,
    first_name,
    last_name,
    gender,
    level)
SELECT
    DISTINCT events.userId,
    events.firstName,
    events.lastName,
    events.gender,
    events.level
FROM staging_events AS events
WHERE
    events.page = 'NextSong'
    AND events.userId IS NOT NULL
    AND events.firstName IS NOT NULL
    AND events.lastName IS NOT NULL
    AND events.gender IS NOT NULL;"#;

const SONG_INSERT: &str = r#"INSERT INTO songs
    (song_id,
    title,
    artist_id,
    year,
    duration)
SELECT
    DISTINCT songs.song_id,
    songs.title,
    songs.artist_id,
    songs.year,
    songs.duration
FROM staging_songs AS songs
WHERE
    songs.song_id IS NOT NULL;"#;

// No null filter here, unlike users and songs.
const ARTIST_INSERT: &str = r#"INSERT INTO artists
    (artist_id,
    name,
    location,
    latitude,
    longitude)
SELECT
    DISTINCT songs.artist_id,
    songs.artist_name,
    songs.artist_location,
    songs.artist_latitude,
    songs.artist_longitude
FROM staging_songs AS songs;"#;

const TIME_INSERT_REDSHIFT: &str = r#"INSERT INTO time
    (start_time,
    hour,
    day,
    week,
    month,
    year,
    weekday)
SELECT
    start_time,
    EXTRACT(HOUR FROM start_time) AS hour,
    EXTRACT(DAY FROM start_time) AS day,
    EXTRACT(WEEK FROM start_time) AS week,
    EXTRACT(MONTH FROM start_time) AS month,
    EXTRACT(YEAR FROM start_time) AS year,
    EXTRACT(DOW FROM start_time) AS weekday
FROM (SELECT
    DISTINCT TIMESTAMP 'epoch' + ts/1000 * interval '1 second' AS start_time
FROM staging_events);"#;

// ISO week: day-of-year of the Thursday in the same Monday-based week.
const TIME_INSERT_SQLITE: &str = r#"INSERT INTO time
    (start_time,
    hour,
    day,
    week,
    month,
    year,
    weekday)
SELECT
    start_time,
    CAST(strftime('%H', start_time) AS INTEGER) AS hour,
    CAST(strftime('%d', start_time) AS INTEGER) AS day,
    (CAST(strftime('%j', date(start_time, '-3 days', 'weekday 4')) AS INTEGER) - 1) / 7 + 1 AS week,
    CAST(strftime('%m', start_time) AS INTEGER) AS month,
    CAST(strftime('%Y', start_time) AS INTEGER) AS year,
    strftime('%w', start_time) AS weekday
FROM (SELECT
    DISTINCT datetime(ts / 1000, 'unixepoch') AS start_time
FROM staging_events);"#;

/// Insert statements as `(target table, sql)`, fact table first.
pub fn insert_queries(dialect: Dialect) -> [(&'static str, &'static str); 5] {
    let (songplay_insert, time_insert) = match dialect {
        Dialect::Redshift => (SONGPLAY_INSERT_REDSHIFT, TIME_INSERT_REDSHIFT),
        Dialect::Sqlite => (SONGPLAY_INSERT_SQLITE, TIME_INSERT_SQLITE),
    };
    [
        ("songplays", songplay_insert),
        ("users", USER_INSERT),
        ("songs", SONG_INSERT),
        ("artists", ARTIST_INSERT),
        ("time", time_insert),
    ]
}

/// How the JSON source maps onto the staging table columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonFormat {
    /// Object keys match lowercase column names.
    Auto,
    /// Location of a JSONPaths descriptor listing one path per column.
    JsonPaths(String),
}

/// A bulk load from object storage into a staging table.
#[derive(Debug, Clone)]
pub struct CopySpec {
    pub table: &'static Table,
    pub source: String,
    pub iam_role: String,
    pub region: String,
    pub format: JsonFormat,
    pub truncate_columns: bool,
}

impl CopySpec {
    pub fn sql(&self) -> String {
        let format = match &self.format {
            JsonFormat::Auto => quote_literal("auto"),
            JsonFormat::JsonPaths(path) => quote_literal(path),
        };
        let mut sql = format!(
            "COPY {} FROM {}\nIAM_ROLE {}\nCOMPUPDATE OFF REGION {}\nJSON {}",
            self.table.name,
            quote_literal(&self.source),
            quote_literal(&self.iam_role),
            quote_literal(&self.region),
            format
        );
        if self.truncate_columns {
            sql.push_str(" TRUNCATECOLUMNS");
        }
        sql.push(';');
        sql
    }
}

pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
