//! Schema building.
//!
//! Replays parsed statements in order: CREATE TABLE defines a table,
//! ALTER TABLE and CREATE INDEX amend a table defined earlier, DROP TABLE
//! removes one. The result is normalized the way the server would report
//! it (primary key columns are NOT NULL, unnamed indexes are named after
//! their first column).

use tracing::trace;

use super::{AlterAction, ColumnDef, CreateTable, Ddl, IndexDef, Statement, TableDefinition, TableOption};
use crate::error::{DefError, DefResult};
use crate::schema::{ColumnPosition, Index, IndexColumn, IndexKind, Schema, Table, TableDefaults};

/// Build a schema from statements.
pub fn build_schema(statements: &[Statement], defaults: &TableDefaults) -> DefResult<Schema> {
    let mut tables: Vec<Table> = Vec::new();

    for statement in statements {
        apply_statement(&mut tables, statement, defaults)
            .map_err(|message| DefError::parse(statement.line, &statement.source, message))?;
    }

    for table in &mut tables {
        finalize(table);
    }

    Ok(Schema::new(tables))
}

fn apply_statement(
    tables: &mut Vec<Table>,
    statement: &Statement,
    defaults: &TableDefaults,
) -> Result<(), String> {
    match &statement.ddl {
        Ddl::CreateTable(create) => {
            if tables.iter().any(|t| t.name == create.name) {
                if create.if_not_exists {
                    return Ok(());
                }
                return Err(format!("table `{}` is defined twice", create.name));
            }
            let table = create_table(create, &statement.source, defaults)?;
            trace!(table = %table.name, columns = table.columns.len(), "defined table");
            tables.push(table);
        }
        Ddl::AlterTable { table, actions } => {
            let table = find_table(tables, table)?;
            for action in actions {
                alter(table, action)?;
            }
        }
        Ddl::CreateIndex { table, index } => {
            let table = find_table(tables, table)?;
            add_index(table, index, true)?;
        }
        Ddl::DropTable { name, if_exists } => match tables.iter().position(|t| &t.name == name) {
            Some(i) => {
                tables.remove(i);
            }
            None if *if_exists => {}
            None => return Err(format!("DROP TABLE references unknown table `{}`", name)),
        },
    }
    Ok(())
}

fn find_table<'a>(tables: &'a mut [Table], name: &str) -> Result<&'a mut Table, String> {
    tables
        .iter_mut()
        .find(|t| t.name == name)
        .ok_or_else(|| format!("table `{}` must be created before it is altered", name))
}

fn create_table(create: &CreateTable, source: &str, defaults: &TableDefaults) -> Result<Table, String> {
    let mut table = Table::new(&create.name, defaults);

    for option in &create.options {
        match option {
            TableOption::Engine(engine) => table.engine = engine.clone(),
            TableOption::Charset(charset) => table.charset = charset.to_ascii_lowercase(),
            TableOption::Collate(collate) => table.collate = Some(collate.to_ascii_lowercase()),
            TableOption::Ignored => {}
        }
    }

    // Columns first so index definitions may precede the columns they cover.
    for definition in &create.definitions {
        if let TableDefinition::Column(def) = definition {
            insert_column(&mut table, def, &ColumnPosition::Last)?;
        }
    }
    for definition in &create.definitions {
        match definition {
            TableDefinition::Column(def) => add_inline_keys(&mut table, def, false)?,
            TableDefinition::Index(index) => add_index(&mut table, index, false)?,
        }
    }

    table.source = Some(source.to_string());
    Ok(table)
}

fn alter(table: &mut Table, action: &AlterAction) -> Result<(), String> {
    match action {
        AlterAction::AddColumn { column, position } => {
            insert_column(table, column, position)?;
            add_inline_keys(table, column, true)?;
            table.source = None;
        }
        AlterAction::DropColumn(name) => {
            let i = column_index(table, name)?;
            table.columns.remove(i);
            remove_from_indexes(table, name);
            table.source = None;
        }
        AlterAction::ModifyColumn { column, position } => {
            let i = column_index(table, &column.column.name)?;
            table.columns.remove(i);
            let position = match position {
                ColumnPosition::Last if i < table.columns.len() => {
                    // MODIFY without a position keeps the column where it was.
                    if i == 0 {
                        ColumnPosition::First
                    } else {
                        ColumnPosition::After(table.columns[i - 1].name.clone())
                    }
                }
                other => other.clone(),
            };
            insert_column(table, column, &position)?;
            add_inline_keys(table, column, true)?;
            table.source = None;
        }
        AlterAction::AddIndex(index) => add_index(table, index, true)?,
        AlterAction::DropIndex(name) => {
            let i = table
                .indexes
                .iter()
                .position(|index| &index.name == name)
                .ok_or_else(|| format!("index `{}` does not exist on `{}`", name, table.name))?;
            let removed = table.indexes.remove(i);
            if !removed.supplementary {
                table.source = None;
            }
        }
        AlterAction::DropPrimaryKey => {
            if table.primary_key.take().is_none() {
                return Err(format!("table `{}` has no primary key", table.name));
            }
            table.source = None;
        }
    }
    Ok(())
}

fn column_index(table: &Table, name: &str) -> Result<usize, String> {
    table
        .columns
        .iter()
        .position(|c| c.name == name)
        .ok_or_else(|| format!("column `{}` does not exist on `{}`", name, table.name))
}

fn insert_column(table: &mut Table, def: &ColumnDef, position: &ColumnPosition) -> Result<(), String> {
    let name = &def.column.name;
    if table.column(name).is_some() {
        return Err(format!("column `{}` is defined twice on `{}`", name, table.name));
    }

    let at = match position {
        ColumnPosition::First => 0,
        ColumnPosition::Last => table.columns.len(),
        ColumnPosition::After(anchor) => column_index(table, anchor)? + 1,
    };
    table.columns.insert(at, def.column.clone());
    Ok(())
}

/// `PRIMARY KEY` / `UNIQUE` written on the column itself.
fn add_inline_keys(table: &mut Table, def: &ColumnDef, supplementary: bool) -> Result<(), String> {
    let columns = vec![IndexColumn::new(def.column.name.clone())];
    if def.primary_key {
        add_index(
            table,
            &IndexDef {
                name: None,
                kind: IndexKind::Primary,
                columns: columns.clone(),
            },
            supplementary,
        )?;
    }
    if def.unique {
        add_index(
            table,
            &IndexDef {
                name: None,
                kind: IndexKind::Unique,
                columns,
            },
            supplementary,
        )?;
    }
    Ok(())
}

fn add_index(table: &mut Table, def: &IndexDef, supplementary: bool) -> Result<(), String> {
    for column in &def.columns {
        if table.column(&column.name).is_none() {
            return Err(format!(
                "index on `{}` references unknown column `{}`",
                table.name, column.name
            ));
        }
    }

    if def.kind == IndexKind::Primary {
        if table.primary_key.is_some() {
            return Err(format!("table `{}` has more than one primary key", table.name));
        }
        let mut index = Index::primary(def.columns.clone());
        index.supplementary = supplementary;
        table.primary_key = Some(index);
        return Ok(());
    }

    let name = match &def.name {
        Some(name) => {
            if table.index(name).is_some() {
                return Err(format!("index `{}` is defined twice on `{}`", name, table.name));
            }
            name.clone()
        }
        None => generated_index_name(table, &def.columns[0].name),
    };

    table.indexes.push(Index {
        name,
        kind: def.kind,
        columns: def.columns.clone(),
        supplementary,
    });
    Ok(())
}

/// The server names an unnamed index after its first column, adding
/// `_2`, `_3`, ... when that name is taken.
fn generated_index_name(table: &Table, first_column: &str) -> String {
    if table.index(first_column).is_none() {
        return first_column.to_string();
    }
    (2..)
        .map(|n| format!("{}_{}", first_column, n))
        .find(|candidate| table.index(candidate).is_none())
        .unwrap_or_else(|| first_column.to_string())
}

/// Dropping a column removes it from every index; an index left without
/// columns goes away with it.
fn remove_from_indexes(table: &mut Table, column: &str) {
    for index in &mut table.indexes {
        index.columns.retain(|c| c.name != column);
    }
    table.indexes.retain(|index| !index.columns.is_empty());

    if let Some(primary) = &mut table.primary_key {
        primary.columns.retain(|c| c.name != column);
        if primary.columns.is_empty() {
            table.primary_key = None;
        }
    }
}

fn finalize(table: &mut Table) {
    let primary_columns: Vec<String> = table
        .primary_key
        .iter()
        .flat_map(|pk| pk.columns.iter().map(|c| c.name.clone()))
        .collect();

    for (position, column) in table.columns.iter_mut().enumerate() {
        column.position = position;
        if primary_columns.contains(&column.name) {
            column.nullable = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_statements;
    use pretty_assertions::assert_eq;

    fn build(sql: &str) -> DefResult<Schema> {
        build_schema(&parse_statements(sql)?, &TableDefaults::default())
    }

    #[test]
    fn test_alter_add_index_amends_created_table() {
        let schema = build(
            "CREATE TABLE users (id int PRIMARY KEY, name varchar(40));\n\
             ALTER TABLE users ADD INDEX index_name(name);",
        )
        .unwrap();
        let users = schema.table("users").unwrap();
        let index = users.index("index_name").unwrap();
        assert!(index.supplementary);
        assert!(users.source.is_some());
        assert!(!users.column("id").unwrap().nullable);
    }

    #[test]
    fn test_alter_unknown_table_is_error() {
        let err = build("ALTER TABLE ghosts ADD INDEX ix(a);").unwrap_err();
        assert!(err.to_string().contains("must be created before it is altered"));
    }

    #[test]
    fn test_unnamed_indexes_get_column_names() {
        let schema = build("CREATE TABLE t (a int, b int, KEY (a), KEY (a, b), UNIQUE (b));").unwrap();
        let names: Vec<&str> = schema.tables[0].indexes.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["a", "a_2", "b"]);
    }

    #[test]
    fn test_duplicate_names_are_errors() {
        assert!(build("CREATE TABLE t (a int, a int);").is_err());
        assert!(build("CREATE TABLE t (a int, KEY ix (a), KEY ix (a));").is_err());
        assert!(build("CREATE TABLE t (a int); CREATE TABLE t (b int);").is_err());
        assert!(build("CREATE TABLE t (a int PRIMARY KEY, PRIMARY KEY (a));").is_err());
    }

    #[test]
    fn test_if_not_exists_keeps_first_definition() {
        let schema = build("CREATE TABLE t (a int); CREATE TABLE IF NOT EXISTS t (b int);").unwrap();
        assert!(schema.tables[0].column("a").is_some());
    }

    #[test]
    fn test_replaying_alters() {
        let schema = build(
            "CREATE TABLE users (id int NOT NULL, name varchar(40), KEY index_name (name));\n\
             ALTER TABLE users ADD COLUMN created_at datetime NOT NULL AFTER id;\n\
             ALTER TABLE users DROP COLUMN name;\n\
             ALTER TABLE users MODIFY COLUMN id bigint NOT NULL;\n\
             ALTER TABLE users ADD COLUMN zz int FIRST;",
        )
        .unwrap();
        let users = &schema.tables[0];
        let names: Vec<&str> = users.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["zz", "id", "created_at"]);
        assert_eq!(users.column("id").unwrap().data_type, "bigint");
        assert_eq!(users.column("created_at").unwrap().position, 2);
        assert!(users.indexes.is_empty());
        assert!(users.source.is_none());
    }

    #[test]
    fn test_drop_table_and_primary_key() {
        let schema = build(
            "CREATE TABLE a (id int PRIMARY KEY);\n\
             CREATE TABLE b (id int);\n\
             ALTER TABLE a DROP PRIMARY KEY;\n\
             DROP TABLE b;\n\
             DROP TABLE IF EXISTS c;",
        )
        .unwrap();
        assert_eq!(schema.len(), 1);
        assert!(schema.tables[0].primary_key.is_none());
        assert!(build("DROP TABLE c;").is_err());
    }

    #[test]
    fn test_index_on_unknown_column() {
        let err = build("CREATE TABLE t (a int, KEY ix (b));").unwrap_err();
        assert!(err.to_string().contains("unknown column `b`"));
    }
}
