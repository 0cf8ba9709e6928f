//! # mysqldef
//!
//! Idempotent MySQL schema management: declare the schema you want as
//! plain DDL, and mysqldef works out the statements that get the live
//! database there.
//!
//! ## Quick Example
//!
//! ```rust
//! use mysqldef::prelude::*;
//!
//! let current = mysqldef::parse("CREATE TABLE users (id int, name varchar(40));").unwrap();
//! let desired = mysqldef::parse(
//!     "CREATE TABLE users (id int, name varchar(40), created_at datetime NOT NULL);",
//! )
//! .unwrap();
//!
//! let sql: Vec<String> = plan(&current, &desired).iter().map(|op| op.to_sql()).collect();
//! assert_eq!(sql, vec!["ALTER TABLE users ADD COLUMN created_at datetime NOT NULL ;"]);
//! ```
//!
//! ## Pipeline
//!
//! | Stage    | Module     | Output                          |
//! |----------|------------|---------------------------------|
//! | Parse    | [`parser`] | [`schema::Schema`]              |
//! | Diff     | [`diff`]   | ordered [`diff::Operation`]s    |
//! | Render   | [`render`] | SQL statements                  |
//! | Export   | [`export`] | canonical `CREATE TABLE` text   |
//! | Run      | [`run`]    | printed and executed statements |

pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod export;
pub mod parser;
pub mod render;
pub mod run;
pub mod schema;

pub mod prelude {
    pub use crate::config::{Config, ConnectionConfig};
    pub use crate::diff::{plan, ColumnPosition, KeyChange, Operation};
    pub use crate::engine::{Database, MySqlDatabase};
    pub use crate::error::*;
    pub use crate::export::export;
    pub use crate::parser::parse_schema;
    pub use crate::render::ToSql;
    pub use crate::run::{introspect, run, Mode, RunContext};
    pub use crate::schema::{Column, DefaultValue, Index, IndexKind, Schema, Table, TableDefaults};
}

/// Parse DDL into a schema using the default engine and charset.
///
/// # Example
///
/// ```
/// let schema = mysqldef::parse("CREATE TABLE bigdata (data bigint);").unwrap();
/// assert_eq!(schema.tables[0].name, "bigdata");
/// ```
pub fn parse(sql: &str) -> Result<schema::Schema, error::DefError> {
    parser::parse_schema(sql, &schema::TableDefaults::default())
}
