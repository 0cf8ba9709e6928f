//! Diff planner.
//!
//! Compares the current schema against the desired one and produces the
//! ordered operations that turn the first into the second. Pure: no I/O,
//! no failure on schemas the parser accepted.
//!
//! Ordering:
//!
//! ```text
//! CreateTable (desired order, each followed by its supplementary AddIndex)
//! per shared table (desired order):
//!     AddColumn → DropIndex → ModifyColumn → DropColumn → AddIndex
//! DropTable (current order)
//! ```
//!
//! The server requires an AUTO_INCREMENT column to lead a key after every
//! statement, so key changes involving such a column travel with its
//! `AddColumn` / `ModifyColumn` as [`KeyChange`]s instead of standing alone.

use std::fmt;

use tracing::debug;

use crate::schema::{Column, Index, IndexKind, Schema, Table};

pub use crate::schema::ColumnPosition;

/// A single schema change.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    CreateTable(Table),
    DropTable(String),
    AddColumn {
        table: String,
        column: Column,
        position: ColumnPosition,
        keys: Vec<KeyChange>,
    },
    DropColumn {
        table: String,
        column: String,
    },
    ModifyColumn {
        table: String,
        column: Column,
        keys: Vec<KeyChange>,
    },
    AddIndex {
        table: String,
        index: Index,
    },
    DropIndex {
        table: String,
        index: Index,
    },
}

/// A key change applied in the same statement as a column change.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyChange {
    Drop(Index),
    Add(Index),
}

impl Operation {
    /// Name of the table the operation touches.
    pub fn table_name(&self) -> &str {
        match self {
            Operation::CreateTable(table) => &table.name,
            Operation::DropTable(name) => name,
            Operation::AddColumn { table, .. }
            | Operation::DropColumn { table, .. }
            | Operation::ModifyColumn { table, .. }
            | Operation::AddIndex { table, .. }
            | Operation::DropIndex { table, .. } => table,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::CreateTable(table) => write!(f, "create table {}", table.name),
            Operation::DropTable(name) => write!(f, "drop table {}", name),
            Operation::AddColumn { table, column, .. } => {
                write!(f, "add column {}.{}", table, column.name)
            }
            Operation::DropColumn { table, column } => write!(f, "drop column {}.{}", table, column),
            Operation::ModifyColumn { table, column, .. } => {
                write!(f, "modify column {}.{}", table, column.name)
            }
            Operation::AddIndex { table, index } => write!(f, "add index {}.{}", table, index.name),
            Operation::DropIndex { table, index } => write!(f, "drop index {}.{}", table, index.name),
        }
    }
}

/// Plan the operations that turn `current` into `desired`.
pub fn plan(current: &Schema, desired: &Schema) -> Vec<Operation> {
    let mut ops = Vec::new();

    for table in &desired.tables {
        if !current.contains(&table.name) {
            ops.extend(create_table(table));
        }
    }

    for table in &desired.tables {
        if let Some(existing) = current.table(&table.name) {
            ops.extend(diff_table(existing, table));
        }
    }

    for table in &current.tables {
        if !desired.contains(&table.name) {
            ops.push(Operation::DropTable(table.name.clone()));
        }
    }

    debug!(operations = ops.len(), "planned schema changes");
    ops
}

/// A new table. When its CREATE TABLE text is reused verbatim, indexes
/// declared by later statements are added separately; when one of those is
/// the key of an AUTO_INCREMENT column the table is created from the model
/// instead, keys included.
fn create_table(table: &Table) -> Vec<Operation> {
    let keys_auto_increment = table
        .all_indexes()
        .filter(|index| index.supplementary)
        .any(|index| {
            table
                .columns
                .iter()
                .any(|column| column.auto_increment && leads(index, &column.name))
        });
    if keys_auto_increment {
        let mut rebuilt = table.clone();
        rebuilt.source = None;
        return vec![Operation::CreateTable(rebuilt)];
    }

    let mut ops = vec![Operation::CreateTable(table.clone())];
    if table.source.is_some() {
        ops.extend(
            table
                .all_indexes()
                .filter(|index| index.supplementary)
                .map(|index| Operation::AddIndex {
                    table: table.name.clone(),
                    index: index.clone(),
                }),
        );
    }
    ops
}

fn diff_table(current: &Table, desired: &Table) -> Vec<Operation> {
    let name = &desired.name;
    let (mut drop_indexes, mut add_indexes) = diff_indexes(current, desired);
    let mut ops = Vec::new();

    // Added columns, positioned against the column list as it will look
    // after each earlier addition.
    let mut layout: Vec<&str> = current.columns.iter().map(|c| c.name.as_str()).collect();
    for (i, column) in desired.columns.iter().enumerate() {
        if current.column(&column.name).is_some() {
            continue;
        }
        let position = match i.checked_sub(1).map(|p| desired.columns[p].name.as_str()) {
            None => ColumnPosition::First,
            Some(previous) if layout.last() == Some(&previous) => ColumnPosition::Last,
            Some(previous) => ColumnPosition::After(previous.to_string()),
        };
        let at = match &position {
            ColumnPosition::First => 0,
            ColumnPosition::Last => layout.len(),
            ColumnPosition::After(previous) => layout
                .iter()
                .position(|c| *c == previous.as_str())
                .map_or(layout.len(), |p| p + 1),
        };
        layout.insert(at, &column.name);
        let keys = auto_increment_keys(None, column, &mut drop_indexes, &mut add_indexes);
        ops.push(Operation::AddColumn {
            table: name.clone(),
            column: column.clone(),
            position,
            keys,
        });
    }

    let mut modified = Vec::new();
    for column in &desired.columns {
        if let Some(existing) = current.column(&column.name) {
            if !existing.same_definition(column) {
                let keys =
                    auto_increment_keys(Some(existing), column, &mut drop_indexes, &mut add_indexes);
                modified.push(Operation::ModifyColumn {
                    table: name.clone(),
                    column: column.clone(),
                    keys,
                });
            }
        }
    }

    // Index drops go first: a column modified while a primary key still
    // covers it stays NOT NULL, and dropping a column silently drops an
    // index it alone made up.
    ops.extend(drop_indexes.into_iter().map(|index| Operation::DropIndex {
        table: name.clone(),
        index,
    }));
    ops.extend(modified);

    for column in &current.columns {
        if desired.column(&column.name).is_none() {
            ops.push(Operation::DropColumn {
                table: name.clone(),
                column: column.name.clone(),
            });
        }
    }

    ops.extend(add_indexes.into_iter().map(|index| Operation::AddIndex {
        table: name.clone(),
        index,
    }));

    ops
}

/// Takes out of `drops` and `adds` the key changes that must share a
/// statement with the change to `column`: drops of keys led by a column
/// that is AUTO_INCREMENT now, and the first added key led by a column that
/// will be. Replacing the primary key that way drops the old one too.
fn auto_increment_keys(
    existing: Option<&Column>,
    column: &Column,
    drops: &mut Vec<Index>,
    adds: &mut Vec<Index>,
) -> Vec<KeyChange> {
    let mut keys = Vec::new();

    if existing.is_some_and(|c| c.auto_increment) {
        let (led, rest): (Vec<Index>, Vec<Index>) = std::mem::take(drops)
            .into_iter()
            .partition(|index| leads(index, &column.name));
        *drops = rest;
        keys.extend(led.into_iter().map(KeyChange::Drop));
    }

    if column.auto_increment {
        if let Some(i) = adds.iter().position(|index| leads(index, &column.name)) {
            let key = adds.remove(i);
            if key.kind == IndexKind::Primary {
                if let Some(j) = drops.iter().position(|index| index.kind == IndexKind::Primary) {
                    keys.push(KeyChange::Drop(drops.remove(j)));
                }
            }
            keys.push(KeyChange::Add(key));
        }
    }

    keys
}

fn leads(index: &Index, column: &str) -> bool {
    index.columns.first().is_some_and(|c| c.name == column)
}

/// Indexes to drop (current order) and to add (desired order). A changed
/// index appears in both.
fn diff_indexes(current: &Table, desired: &Table) -> (Vec<Index>, Vec<Index>) {
    let mut drops = Vec::new();
    let mut adds = Vec::new();

    match (&current.primary_key, &desired.primary_key) {
        (Some(old), Some(new)) if !old.same_definition(new) => {
            drops.push(old.clone());
            adds.push(new.clone());
        }
        (Some(old), None) => drops.push(old.clone()),
        (None, Some(new)) => adds.push(new.clone()),
        _ => {}
    }

    for index in &current.indexes {
        let keep = desired
            .index(&index.name)
            .is_some_and(|wanted| wanted.same_definition(index));
        if !keep {
            drops.push(index.clone());
        }
    }

    for index in &desired.indexes {
        let present = current
            .index(&index.name)
            .is_some_and(|existing| existing.same_definition(index));
        if !present {
            adds.push(index.clone());
        }
    }

    (drops, adds)
}
