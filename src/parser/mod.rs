//! DDL parser using nom.
//!
//! Parses MySQL DDL text into a [`Schema`]. The same parser reads the
//! operator's desired schema file and the `SHOW CREATE TABLE` output of
//! the live database, so both sides are normalized identically.
//!
//! ```text
//! SQL text ──split──▶ RawStatement* ──grammar──▶ Statement* ──builder──▶ Schema
//! ```

pub mod builder;
pub mod grammar;
pub mod split;


use crate::error::{DefError, DefResult};
use crate::schema::{Column, ColumnPosition, IndexColumn, IndexKind, Schema, TableDefaults};

pub use builder::build_schema;
pub use split::{split_statements, RawStatement};

/// A parsed statement together with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// 1-based line the statement starts on.
    pub line: usize,
    /// Verbatim statement text.
    pub source: String,
    pub ddl: Ddl,
}

/// The statement kinds mysqldef understands.
#[derive(Debug, Clone, PartialEq)]
pub enum Ddl {
    CreateTable(CreateTable),
    AlterTable {
        table: String,
        actions: Vec<AlterAction>,
    },
    CreateIndex {
        table: String,
        index: IndexDef,
    },
    DropTable {
        name: String,
        if_exists: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub name: String,
    pub if_not_exists: bool,
    pub definitions: Vec<TableDefinition>,
    pub options: Vec<TableOption>,
}

/// One entry of a CREATE TABLE body.
#[derive(Debug, Clone, PartialEq)]
pub enum TableDefinition {
    Column(ColumnDef),
    Index(IndexDef),
}

/// A column plus the key constraints that may be declared inline with it.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub column: Column,
    pub primary_key: bool,
    pub unique: bool,
}

/// An index as written; unnamed indexes get their name when the schema is built.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDef {
    pub name: Option<String>,
    pub kind: IndexKind,
    pub columns: Vec<IndexColumn>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableOption {
    Engine(String),
    Charset(String),
    Collate(String),
    /// Accepted but irrelevant to the schema (AUTO_INCREMENT=, ROW_FORMAT=, ...).
    Ignored,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlterAction {
    AddColumn {
        column: ColumnDef,
        position: ColumnPosition,
    },
    DropColumn(String),
    ModifyColumn {
        column: ColumnDef,
        position: ColumnPosition,
    },
    AddIndex(IndexDef),
    DropIndex(String),
    DropPrimaryKey,
}

/// Parse every statement in `sql`.
///
/// Fails on the first statement that is malformed or not supported; the
/// error names the statement and its line.
pub fn parse_statements(sql: &str) -> DefResult<Vec<Statement>> {
    split_statements(sql)?
        .into_iter()
        .map(|raw| parse_statement(&raw))
        .collect()
}

fn parse_statement(raw: &RawStatement<'_>) -> DefResult<Statement> {
    match grammar::statement(&raw.body) {
        Ok((_, ddl)) => Ok(Statement {
            line: raw.line,
            source: raw.source.to_string(),
            ddl,
        }),
        Err(nom::Err::Error(_)) => Err(DefError::parse(
            raw.line,
            raw.source,
            "unsupported statement",
        )),
        Err(nom::Err::Failure(e)) => Err(DefError::parse(raw.line, raw.source, e.describe())),
        Err(nom::Err::Incomplete(_)) => Err(DefError::parse(
            raw.line,
            raw.source,
            "incomplete statement",
        )),
    }
}

/// Parse `sql` into a schema, filling omitted table options from `defaults`.
pub fn parse_schema(sql: &str, defaults: &TableDefaults) -> DefResult<Schema> {
    let statements = parse_statements(sql)?;
    build_schema(&statements, defaults)
}
