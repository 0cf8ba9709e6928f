//! Schema model.
//!
//! Both sides of a comparison are normalized into these types: the desired
//! schema comes from the operator's DDL file, the current schema from the
//! DDL the server reports for each existing table.
//!
//! ```text
//! Schema
//!  └── Table (name, ordered columns, primary key, secondary indexes, options)
//!       ├── Column (name, canonical type text, nullability, default, ...)
//!       └── Index  (name, kind, ordered columns)
//! ```
//!
//! Values are built once by the parser and treated as snapshots afterwards.

use serde::Deserialize;
use std::fmt;

/// Storage engine assumed when a CREATE TABLE does not name one.
pub const DEFAULT_ENGINE: &str = "InnoDB";

/// Character set assumed when a CREATE TABLE does not name one.
pub const DEFAULT_CHARSET: &str = "latin1";

/// Name the server gives every primary key.
pub const PRIMARY_KEY_NAME: &str = "PRIMARY";

/// Table options filled in when the DDL leaves them out.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TableDefaults {
    pub engine: String,
    pub charset: String,
}

impl Default for TableDefaults {
    fn default() -> Self {
        Self {
            engine: DEFAULT_ENGINE.to_string(),
            charset: DEFAULT_CHARSET.to_string(),
        }
    }
}

/// A complete database schema, tables in declaration (or discovery) order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub tables: Vec<Table>,
}

/// A table definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub primary_key: Option<Index>,
    pub indexes: Vec<Index>,
    pub engine: String,
    pub charset: String,
    pub collate: Option<String>,
    /// Verbatim CREATE TABLE text, kept while it still describes the table.
    pub source: Option<String>,
}

/// A column definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    /// Canonical type text, e.g. `bigint unsigned` or `varchar(40)`.
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<DefaultValue>,
    pub auto_increment: bool,
    pub on_update: Option<String>,
    pub comment: Option<String>,
    /// Zero-based ordinal position within the table.
    pub position: usize,
}

/// A column default. `None` on the column means "unset".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultValue {
    /// `DEFAULT NULL`
    Null,
    /// A string or numeric literal, stored unquoted.
    Literal(String),
    /// `CURRENT_TIMESTAMP`, `(expr)` and friends, stored as written (upper-cased keywords).
    Expression(String),
}

/// Where a column lands when it is added to an existing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnPosition {
    First,
    After(String),
    /// Appended after the current last column.
    Last,
}

/// What kind of index an [`Index`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Primary,
    Unique,
    Regular,
}

/// One column reference inside an index, with an optional prefix length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexColumn {
    pub name: String,
    pub length: Option<u32>,
}

/// An index definition. The primary key is an index of kind `Primary`
/// named `PRIMARY`.
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    pub name: String,
    pub kind: IndexKind,
    pub columns: Vec<IndexColumn>,
    /// Declared outside the table's own CREATE TABLE (e.g. `ALTER TABLE ... ADD INDEX`).
    pub supplementary: bool,
}

impl Schema {
    pub fn new(tables: Vec<Table>) -> Self {
        Self { tables }
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Structural equality: same tables (in any order), each with the same
    /// columns in the same order and the same indexes. Engine, charset and
    /// source text are ignored.
    pub fn same_structure(&self, other: &Schema) -> bool {
        self.len() == other.len()
            && self.tables.iter().all(|table| {
                other
                    .table(&table.name)
                    .is_some_and(|theirs| table.same_structure(theirs))
            })
    }
}

impl Table {
    pub fn new(name: impl Into<String>, defaults: &TableDefaults) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: None,
            indexes: Vec::new(),
            engine: defaults.engine.clone(),
            charset: defaults.charset.clone(),
            collate: None,
            source: None,
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Primary key first, then secondary indexes in declaration order.
    pub fn all_indexes(&self) -> impl Iterator<Item = &Index> {
        self.primary_key.iter().chain(self.indexes.iter())
    }

    pub fn same_structure(&self, other: &Table) -> bool {
        let columns_match = self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| a.name == b.name && a.same_definition(b));

        let primary_match = match (&self.primary_key, &other.primary_key) {
            (Some(a), Some(b)) => a.same_definition(b),
            (None, None) => true,
            _ => false,
        };

        let indexes_match = self.indexes.len() == other.indexes.len()
            && self.indexes.iter().all(|index| {
                other
                    .index(&index.name)
                    .is_some_and(|theirs| index.same_definition(theirs))
            });

        self.name == other.name && columns_match && primary_match && indexes_match
    }
}

impl Column {
    /// A nullable column with no default and no extra attributes.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default: None,
            auto_increment: false,
            on_update: None,
            comment: None,
            position: 0,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn default(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// The default the server actually applies: a nullable column without
    /// an explicit default behaves as `DEFAULT NULL`.
    pub fn effective_default(&self) -> Option<&DefaultValue> {
        match &self.default {
            None if self.nullable => Some(&DefaultValue::Null),
            other => other.as_ref(),
        }
    }

    /// Every attribute except name and position matches.
    pub fn same_definition(&self, other: &Column) -> bool {
        self.data_type == other.data_type
            && self.nullable == other.nullable
            && self.effective_default() == other.effective_default()
            && self.auto_increment == other.auto_increment
            && self.on_update == other.on_update
            && self.comment == other.comment
    }
}

impl Index {
    pub fn primary(columns: Vec<IndexColumn>) -> Self {
        Self {
            name: PRIMARY_KEY_NAME.to_string(),
            kind: IndexKind::Primary,
            columns,
            supplementary: false,
        }
    }

    pub fn new(name: impl Into<String>, columns: Vec<IndexColumn>) -> Self {
        Self {
            name: name.into(),
            kind: IndexKind::Regular,
            columns,
            supplementary: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.kind = IndexKind::Unique;
        self
    }

    pub fn is_unique(&self) -> bool {
        matches!(self.kind, IndexKind::Primary | IndexKind::Unique)
    }

    /// Same columns in the same order and the same kind.
    pub fn same_definition(&self, other: &Index) -> bool {
        self.kind == other.kind && self.columns == other.columns
    }
}

impl IndexColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            length: None,
        }
    }
}

impl From<&str> for IndexColumn {
    fn from(name: &str) -> Self {
        IndexColumn::new(name)
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Primary => write!(f, "PRIMARY KEY"),
            IndexKind::Unique => write!(f, "UNIQUE INDEX"),
            IndexKind::Regular => write!(f, "INDEX"),
        }
    }
}
