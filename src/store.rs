//! SQLite-backed case table.
//!
//! The table is created on first use and is otherwise only read: one
//! connection per [`CaseStore::load`], closed before it returns.

use crate::t_args;
use crate::types::CaseRecord;
use rusqlite::Connection;
use rusqlite::types::ValueRef;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_EXTENSION: &str = "sqlite3";

/// Table and column names. Fixed per deployment, configurable per store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    pub table: String,
    pub method_column: String,
    pub input_column: String,
    pub output_column: String,
    pub active_column: String,
    pub comment_column: String,
}

impl Default for StoreLayout {
    fn default() -> Self {
        Self {
            table: "Test".into(),
            method_column: "name_of_method_to_test".into(),
            input_column: "data_input".into(),
            output_column: "expected_output".into(),
            active_column: "perform_test".into(),
            comment_column: "comment".into(),
        }
    }
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

impl StoreLayout {
    fn create_sql(&self) -> String {
        format!(
            "CREATE TABLE {} ({} TEXT, {} TEXT, {} TEXT, {} INTEGER DEFAULT 1, {} TEXT)",
            quote(&self.table),
            quote(&self.method_column),
            quote(&self.input_column),
            quote(&self.output_column),
            quote(&self.active_column),
            quote(&self.comment_column),
        )
    }

    fn select_sql(&self) -> String {
        format!(
            "SELECT {}, {}, {}, {} FROM {} WHERE COALESCE({}, 1) = 1 ORDER BY rowid",
            quote(&self.method_column),
            quote(&self.input_column),
            quote(&self.output_column),
            quote(&self.comment_column),
            quote(&self.table),
            quote(&self.active_column),
        )
    }
}

/// The table did not exist and has just been created; it must be filled
/// before any case can be generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaNotice {
    pub database: PathBuf,
    pub layout: StoreLayout,
}

impl SchemaNotice {
    pub fn message(&self) -> String {
        t_args!("store-created",
            "database" => self.database.display(),
            "table" => &self.layout.table,
            "method" => &self.layout.method_column,
            "input" => &self.layout.input_column,
            "output" => &self.layout.output_column,
            "active" => &self.layout.active_column,
            "comment" => &self.layout.comment_column
        )
    }
}

impl fmt::Display for SchemaNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

#[derive(Debug)]
pub enum Loaded {
    Ready(Vec<CaseRecord>),
    Created(SchemaNotice),
}

impl Loaded {
    pub fn into_records(self) -> Result<Vec<CaseRecord>, StoreError> {
        match self {
            Loaded::Ready(records) => Ok(records),
            Loaded::Created(notice) => Err(StoreError::Uninitialized(notice)),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Uninitialized(SchemaNotice),

    #[error("row {row}: column '{column}' holds {found}, expected text")]
    InvalidCell {
        row: usize,
        column: String,
        found: &'static str,
    },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

#[derive(Debug, Clone)]
pub struct CaseStore {
    path: PathBuf,
    layout: StoreLayout,
}

impl CaseStore {
    pub fn new(path: impl Into<PathBuf>, layout: StoreLayout) -> Self {
        Self {
            path: path.into(),
            layout,
        }
    }

    /// `<dir>/<subject>.<extension>`
    pub fn for_subject(dir: &Path, subject: &str, extension: &str, layout: StoreLayout) -> Self {
        Self::new(dir.join(format!("{subject}.{extension}")), layout)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Returns the active rows in insertion order, or creates the table and
    /// reports that it needs data.
    pub fn load(&self) -> Result<Loaded, StoreError> {
        debug!("opening case store {}", self.path.display());
        let conn = Connection::open(&self.path)?;

        if !self.table_exists(&conn)? {
            conn.execute(&self.layout.create_sql(), [])?;
            info!(
                "created table '{}' in {}",
                self.layout.table,
                self.path.display()
            );
            return Ok(Loaded::Created(SchemaNotice {
                database: self.path.clone(),
                layout: self.layout.clone(),
            }));
        }

        let records = self.read_active(&conn)?;
        debug!("loaded {} active cases", records.len());
        Ok(Loaded::Ready(records))
    }

    fn table_exists(&self, conn: &Connection) -> Result<bool, StoreError> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            rusqlite::params![self.layout.table],
            |row| row.get(0),
        )?;
        Ok(count == 1)
    }

    fn read_active(&self, conn: &Connection) -> Result<Vec<CaseRecord>, StoreError> {
        let mut stmt = conn.prepare(&self.layout.select_sql())?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        let mut row_no = 0;

        while let Some(row) = rows.next()? {
            row_no += 1;
            let cell = |idx: usize, column: &str| -> Result<String, StoreError> {
                match row.get_ref(idx)? {
                    ValueRef::Text(bytes) => String::from_utf8(bytes.to_vec()).map_err(|_| {
                        StoreError::InvalidCell {
                            row: row_no,
                            column: column.to_string(),
                            found: "invalid utf-8",
                        }
                    }),
                    ValueRef::Integer(i) => Ok(i.to_string()),
                    ValueRef::Real(f) => Ok(f.to_string()),
                    ValueRef::Null => Err(StoreError::InvalidCell {
                        row: row_no,
                        column: column.to_string(),
                        found: "null",
                    }),
                    ValueRef::Blob(_) => Err(StoreError::InvalidCell {
                        row: row_no,
                        column: column.to_string(),
                        found: "blob",
                    }),
                }
            };

            let comment = match row.get_ref(3)? {
                ValueRef::Null => None,
                ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                    Some(String::from_utf8_lossy(bytes).into_owned())
                }
                ValueRef::Integer(i) => Some(i.to_string()),
                ValueRef::Real(f) => Some(f.to_string()),
            };

            records.push(CaseRecord {
                method_name: cell(0, &self.layout.method_column)?,
                input: cell(1, &self.layout.input_column)?,
                expected_output: cell(2, &self.layout.output_column)?,
                comment,
            });
        }

        Ok(records)
    }
}
