//! Local stand-in for the warehouse `COPY ... JSON` bulk load, reading JSON
//! records from the filesystem into a SQLite staging table.

use crate::catalog::{Column, CopySpec, JsonFormat, SqlType};
use crate::error::CopyError;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Debug, Deserialize)]
struct JsonPathsFile {
    jsonpaths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    Key(String),
    Index(usize),
}

/// Column mapping resolved once per copy.
enum Mapping {
    Auto(Vec<String>),
    Paths(Vec<Vec<PathSegment>>),
}

/// Loads every record under `spec.source` into `spec.table`, returning the
/// number of rows inserted.
pub fn copy_into(conn: &Connection, spec: &CopySpec) -> Result<usize, CopyError> {
    let source = local_path(&spec.source);
    let files = source_files(&source)?;
    let mapping = resolve_mapping(spec)?;

    let columns = spec.table.columns;
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    let insert_sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        spec.table.name,
        spec.table.column_names().join(", "),
        placeholders.join(", ")
    );
    let mut insert = conn
        .prepare(&insert_sql)
        .map_err(|e| copy_sqlite_error(&source, e))?;

    let mut rows = 0;
    for file in files {
        debug!("Copying {:?} into {}", file, spec.table.name);
        let text = std::fs::read_to_string(&file).map_err(|source| CopyError::Io {
            path: file.clone(),
            source,
        })?;
        for record in serde_json::Deserializer::from_str(&text).into_iter::<Value>() {
            let record = record.map_err(|source| CopyError::Json {
                path: file.clone(),
                source,
            })?;
            if !record.is_object() {
                return Err(CopyError::NotAnObject { path: file });
            }
            let values = row_values(&record, &mapping, columns, spec.truncate_columns)
                .map_err(|(column, value, reason)| CopyError::Value {
                    path: file.clone(),
                    column,
                    value,
                    reason,
                })?;
            insert
                .execute(params_from_iter(values.iter()))
                .map_err(|e| copy_sqlite_error(&file, e))?;
            rows += 1;
        }
    }

    info!("Copied {} rows into {}", rows, spec.table.name);
    Ok(rows)
}

fn copy_sqlite_error(path: &Path, source: rusqlite::Error) -> CopyError {
    CopyError::Insert {
        path: path.to_path_buf(),
        source,
    }
}

pub(crate) fn local_path(location: &str) -> PathBuf {
    PathBuf::from(location.strip_prefix("file://").unwrap_or(location))
}

fn source_files(source: &Path) -> Result<Vec<PathBuf>, CopyError> {
    if !source.exists() {
        return Err(CopyError::MissingSource(source.to_path_buf()));
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn resolve_mapping(spec: &CopySpec) -> Result<Mapping, CopyError> {
    match &spec.format {
        JsonFormat::Auto => Ok(Mapping::Auto(
            spec.table
                .columns
                .iter()
                .map(|c| c.name.to_lowercase())
                .collect(),
        )),
        JsonFormat::JsonPaths(location) => {
            let path = local_path(location);
            let text = std::fs::read_to_string(&path).map_err(|source| CopyError::Io {
                path: path.clone(),
                source,
            })?;
            let descriptor: JsonPathsFile =
                serde_json::from_str(&text).map_err(|source| CopyError::Json {
                    path: path.clone(),
                    source,
                })?;
            if descriptor.jsonpaths.len() != spec.table.columns.len() {
                return Err(CopyError::JsonPathsArity {
                    table: spec.table.name.to_string(),
                    paths: descriptor.jsonpaths.len(),
                    columns: spec.table.columns.len(),
                });
            }
            let paths = descriptor
                .jsonpaths
                .iter()
                .map(|p| parse_json_path(p))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|reason| CopyError::JsonPaths { path, reason })?;
            Ok(Mapping::Paths(paths))
        }
    }
}

/// Parses `$.a.b`, `$['a']['b']`, `$["a"][0]` and mixes of those.
fn parse_json_path(path: &str) -> Result<Vec<PathSegment>, String> {
    let mut rest = path
        .trim()
        .strip_prefix('$')
        .ok_or_else(|| format!("path {:?} does not start with $", path))?;
    let mut segments = Vec::new();
    while !rest.is_empty() {
        if let Some(after_dot) = rest.strip_prefix('.') {
            let end = after_dot.find(['.', '[']).unwrap_or(after_dot.len());
            let key = &after_dot[..end];
            if key.is_empty() {
                return Err(format!("empty key in path {:?}", path));
            }
            segments.push(PathSegment::Key(key.to_string()));
            rest = &after_dot[end..];
        } else if let Some(after_bracket) = rest.strip_prefix('[') {
            let end = after_bracket
                .find(']')
                .ok_or_else(|| format!("unclosed bracket in path {:?}", path))?;
            let inner = after_bracket[..end].trim();
            let quoted = inner
                .strip_prefix('\'')
                .and_then(|s| s.strip_suffix('\''))
                .or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')));
            let segment = match quoted {
                Some(key) => PathSegment::Key(key.to_string()),
                None => PathSegment::Index(
                    inner
                        .parse()
                        .map_err(|_| format!("invalid index {:?} in path {:?}", inner, path))?,
                ),
            };
            segments.push(segment);
            rest = &after_bracket[end + 1..];
        } else {
            return Err(format!("unexpected {:?} in path {:?}", rest, path));
        }
    }
    Ok(segments)
}

fn lookup<'a>(record: &'a Value, segments: &[PathSegment]) -> Option<&'a Value> {
    segments.iter().try_fold(record, |value, segment| match segment {
        PathSegment::Key(key) => value.get(key.as_str()),
        PathSegment::Index(index) => value.get(*index),
    })
}

type ValueError = (String, String, String);

fn row_values(
    record: &Value,
    mapping: &Mapping,
    columns: &[Column],
    truncate: bool,
) -> Result<Vec<SqlValue>, ValueError> {
    columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            let value = match mapping {
                Mapping::Auto(keys) => record.get(keys[index].as_str()),
                Mapping::Paths(paths) => lookup(record, &paths[index]),
            };
            coerce(value, column, truncate).map_err(|reason| {
                (
                    column.name.to_string(),
                    value.map(|v| v.to_string()).unwrap_or_default(),
                    reason,
                )
            })
        })
        .collect()
}

fn coerce(value: Option<&Value>, column: &Column, truncate: bool) -> Result<SqlValue, String> {
    let value = match value {
        None | Some(Value::Null) => return Ok(SqlValue::Null),
        Some(value) => value,
    };
    match column.sql_type {
        SqlType::Int | SqlType::BigInt => match value {
            Value::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .map(SqlValue::Integer)
                .ok_or_else(|| "not an integer".to_string()),
            Value::String(s) if s.trim().is_empty() => Ok(SqlValue::Null),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(SqlValue::Integer)
                .map_err(|e| e.to_string()),
            _ => Err("not an integer".to_string()),
        },
        SqlType::Float => match value {
            Value::Number(number) => number
                .as_f64()
                .map(SqlValue::Real)
                .ok_or_else(|| "not a number".to_string()),
            Value::String(s) if s.trim().is_empty() => Ok(SqlValue::Null),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(SqlValue::Real)
                .map_err(|e| e.to_string()),
            _ => Err("not a number".to_string()),
        },
        SqlType::Varchar(_) | SqlType::Timestamp => {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            // VARCHAR(n) holds n bytes of UTF-8, not n characters.
            match column.sql_type.max_length() {
                Some(max) if text.len() > max => {
                    if truncate {
                        Ok(SqlValue::Text(truncate_to_bytes(&text, max).to_string()))
                    } else {
                        Err(format!("longer than {} bytes", max))
                    }
                }
                _ => Ok(SqlValue::Text(text)),
            }
        }
    }
}

/// Longest prefix of `text` that fits in `max` bytes without splitting a
/// character.
fn truncate_to_bytes(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
