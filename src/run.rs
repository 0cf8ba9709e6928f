//! A single mysqldef invocation.
//!
//! ```text
//! desired SQL ──parse──┐
//!                      ├──plan──▶ operations ──render──▶ statements ──▶ print / execute
//! live tables ──parse──┘
//! ```
//!
//! The whole plan is rendered before anything runs, so a dry run prints
//! exactly what a real run would.

use std::io::Write;

use tracing::{debug, info};

use crate::diff::plan;
use crate::engine::Database;
use crate::error::DefResult;
use crate::export::export;
use crate::parser::{build_schema, parse_schema, parse_statements};
use crate::render::ToSql;
use crate::schema::{Schema, TableDefaults};

/// Marker printed before the statements of a dry run.
pub const DRY_RUN_MARKER: &str = "--- dry run ---";

/// What an invocation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Plan and execute.
    #[default]
    Apply,
    /// Plan and print only.
    DryRun,
    /// Print the current schema; no desired schema involved.
    Export,
}

/// Settings for one invocation, passed explicitly to every step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunContext {
    pub mode: Mode,
    pub defaults: TableDefaults,
}

impl RunContext {
    pub fn new(mode: Mode, defaults: TableDefaults) -> Self {
        Self { mode, defaults }
    }
}

/// Read the live schema through the same parser used for the desired one.
pub async fn introspect<D: Database>(db: &D, defaults: &TableDefaults) -> DefResult<Schema> {
    let mut statements = Vec::new();
    for name in db.table_names().await? {
        let ddl = db.show_create_table(&name).await?;
        debug!(table = %name, "introspected table");
        statements.extend(parse_statements(&ddl)?);
    }
    build_schema(&statements, defaults)
}

/// The statements that turn the live schema into `desired`.
pub async fn plan_statements<D: Database>(
    db: &D,
    desired: &Schema,
    defaults: &TableDefaults,
) -> DefResult<Vec<String>> {
    let current = introspect(db, defaults).await?;
    let operations = plan(&current, desired);
    for op in &operations {
        debug!(table = op.table_name(), "{}", op);
    }
    Ok(operations.iter().map(ToSql::to_sql).collect())
}

/// Run one invocation, writing the report to `out`.
///
/// The desired schema is parsed before the database is consulted, so a
/// malformed file never touches the server. In apply mode execution stops
/// at the first rejected statement; statements before it stay applied.
pub async fn run<D: Database, W: Write>(
    db: &mut D,
    desired_sql: &str,
    ctx: &RunContext,
    out: &mut W,
) -> DefResult<()> {
    if ctx.mode == Mode::Export {
        let current = introspect(db, &ctx.defaults).await?;
        out.write_all(export(&current).as_bytes())?;
        return Ok(());
    }

    let desired = parse_schema(desired_sql, &ctx.defaults)?;
    let statements = plan_statements(db, &desired, &ctx.defaults).await?;

    if ctx.mode == Mode::DryRun {
        writeln!(out, "{}", DRY_RUN_MARKER)?;
        for sql in &statements {
            writeln!(out, "Run: '{}'", sql)?;
        }
        return Ok(());
    }

    if statements.is_empty() {
        info!("nothing is modified");
        return Ok(());
    }

    for sql in &statements {
        writeln!(out, "Run: '{}'", sql)?;
        out.flush()?;
        db.execute(sql).await?;
    }
    info!(statements = statements.len(), "schema updated");
    Ok(())
}
