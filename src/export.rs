//! Exporter.
//!
//! Prints a schema as canonical `CREATE TABLE` statements in the layout the
//! server itself uses for `SHOW CREATE TABLE`. The output parses back into
//! the same schema.

use crate::render::{quote_literal, ToSql};
use crate::schema::{Column, Index, IndexKind, Schema, Table};

/// Printed instead of nothing when the schema has no tables.
pub const NO_TABLE_EXISTS: &str = "-- No table exists\n";

/// Every table of `schema`, one statement each, separated by blank lines.
pub fn export(schema: &Schema) -> String {
    if schema.is_empty() {
        return NO_TABLE_EXISTS.to_string();
    }
    let statements: Vec<String> = schema
        .tables
        .iter()
        .map(|table| format!("{};", create_table_sql(table)))
        .collect();
    format!("{}\n", statements.join("\n\n"))
}

/// Canonical `CREATE TABLE` text for one table, without the trailing `;`.
pub fn create_table_sql(table: &Table) -> String {
    let mut lines: Vec<String> = table.columns.iter().map(column_line).collect();
    lines.extend(table.all_indexes().map(index_line));

    let mut sql = format!("CREATE TABLE {} (\n", backtick(&table.name));
    sql.push_str(&lines.join(",\n"));
    sql.push_str(&format!(
        "\n) ENGINE={} DEFAULT CHARSET={}",
        table.engine, table.charset
    ));
    if let Some(collate) = &table.collate {
        sql.push_str(&format!(" COLLATE={}", collate));
    }
    sql
}

fn column_line(column: &Column) -> String {
    let mut line = format!("  {} {}", backtick(&column.name), display_type(&column.data_type));
    if !column.nullable {
        line.push_str(" NOT NULL");
    }
    if let Some(default) = column.effective_default() {
        line.push_str(" DEFAULT ");
        line.push_str(&default.to_sql());
    }
    if let Some(on_update) = &column.on_update {
        line.push_str(" ON UPDATE ");
        line.push_str(on_update);
    }
    if column.auto_increment {
        line.push_str(" AUTO_INCREMENT");
    }
    if let Some(comment) = &column.comment {
        line.push_str(" COMMENT ");
        line.push_str(&quote_literal(comment));
    }
    line
}

fn index_line(index: &Index) -> String {
    let columns = index
        .columns
        .iter()
        .map(|c| match c.length {
            Some(length) => format!("{}({})", backtick(&c.name), length),
            None => backtick(&c.name),
        })
        .collect::<Vec<_>>()
        .join(",");
    match index.kind {
        IndexKind::Primary => format!("  PRIMARY KEY ({})", columns),
        IndexKind::Unique => format!("  UNIQUE KEY {} ({})", backtick(&index.name), columns),
        IndexKind::Regular => format!("  KEY {} ({})", backtick(&index.name), columns),
    }
}

fn backtick(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Canonical type text keeps charset clauses lower-case; the server prints them upper-case.
fn display_type(data_type: &str) -> String {
    data_type
        .replace(" character set ", " CHARACTER SET ")
        .replace(" collate ", " COLLATE ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_schema;
    use crate::schema::TableDefaults;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_schema_prints_sentinel() {
        assert_eq!(export(&Schema::default()), "-- No table exists\n");
    }

    #[test]
    fn test_export_users() {
        let schema = parse_schema(
            "CREATE TABLE users (name varchar(40), created_at datetime NOT NULL);",
            &TableDefaults::default(),
        )
        .unwrap();
        assert_eq!(
            export(&schema),
            "CREATE TABLE `users` (\n  `name` varchar(40) DEFAULT NULL,\n  `created_at` datetime NOT NULL\n) ENGINE=InnoDB DEFAULT CHARSET=latin1;\n"
        );
    }

    #[test]
    fn test_export_keys_and_options() {
        let schema = parse_schema(
            "CREATE TABLE posts (\n\
               id bigint unsigned NOT NULL AUTO_INCREMENT,\n\
               slug varchar(64) CHARACTER SET utf8mb4 NOT NULL,\n\
               views int DEFAULT 0 COMMENT 'hits',\n\
               PRIMARY KEY (id),\n\
               UNIQUE KEY uq_slug (slug),\n\
               KEY ix_views (views, slug(8))\n\
             ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_bin;\n\
             CREATE TABLE tags (name varchar(10));",
            &TableDefaults::default(),
        )
        .unwrap();
        let expected = "CREATE TABLE `posts` (
  `id` bigint unsigned NOT NULL AUTO_INCREMENT,
  `slug` varchar(64) CHARACTER SET utf8mb4 NOT NULL,
  `views` int DEFAULT '0' COMMENT 'hits',
  PRIMARY KEY (`id`),
  UNIQUE KEY `uq_slug` (`slug`),
  KEY `ix_views` (`views`,`slug`(8))
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_bin;

CREATE TABLE `tags` (
  `name` varchar(10) DEFAULT NULL
) ENGINE=InnoDB DEFAULT CHARSET=latin1;
";
        assert_eq!(export(&schema), expected);
    }

    #[test]
    fn test_export_parses_back() {
        let sql = "CREATE TABLE t (a int NOT NULL DEFAULT 1, b timestamp NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP, PRIMARY KEY (a), KEY (b));";
        let original = parse_schema(sql, &TableDefaults::default()).unwrap();
        let exported = parse_schema(&export(&original), &TableDefaults::default()).unwrap();
        assert!(original.same_structure(&exported));
    }
}
