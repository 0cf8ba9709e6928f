//! SQL renderer.
//!
//! Turns planned operations back into statements the server accepts. The
//! exact text is part of the tool's output contract, so the rules are fixed:
//! upper-case keywords, identifiers bare unless they need backticks, one
//! statement per operation, each terminated by `;`.

use std::borrow::Cow;

use crate::diff::{ColumnPosition, KeyChange, Operation};
use crate::export;
use crate::schema::{Column, DefaultValue, Index, IndexColumn, IndexKind};

/// Trait for converting schema values to SQL.
pub trait ToSql {
    /// Convert this value to SQL text.
    fn to_sql(&self) -> String;
}

impl ToSql for Operation {
    fn to_sql(&self) -> String {
        match self {
            Operation::CreateTable(table) => match &table.source {
                Some(source) if source.trim_end().ends_with(';') => source.clone(),
                Some(source) => format!("{};", source.trim_end()),
                None => format!("{};", export::create_table_sql(table)),
            },
            Operation::DropTable(name) => format!("DROP TABLE {};", quote_identifier(name)),
            Operation::AddColumn {
                table,
                column,
                position,
                keys,
            } => alter_table(
                table,
                format!("ADD COLUMN {} {}", column.to_sql(), position.to_sql()),
                keys,
            ),
            Operation::DropColumn { table, column } => format!(
                "ALTER TABLE {} DROP COLUMN {};",
                quote_identifier(table),
                quote_identifier(column)
            ),
            Operation::ModifyColumn { table, column, keys } => {
                alter_table(table, format!("MODIFY COLUMN {}", column.to_sql()), keys)
            }
            Operation::AddIndex { table, index } => {
                format!("ALTER TABLE {} ADD {};", quote_identifier(table), index.to_sql())
            }
            Operation::DropIndex { table, index } => {
                format!("ALTER TABLE {} {};", quote_identifier(table), drop_clause(index))
            }
        }
    }
}

/// Column definition as used by ADD/MODIFY COLUMN.
impl ToSql for Column {
    fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", quote_identifier(&self.name), self.data_type);
        if !self.nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default.to_sql());
        }
        if let Some(on_update) = &self.on_update {
            sql.push_str(" ON UPDATE ");
            sql.push_str(on_update);
        }
        if self.auto_increment {
            sql.push_str(" AUTO_INCREMENT");
        }
        if let Some(comment) = &self.comment {
            sql.push_str(" COMMENT ");
            sql.push_str(&quote_literal(comment));
        }
        sql
    }
}

impl ToSql for KeyChange {
    fn to_sql(&self) -> String {
        match self {
            KeyChange::Drop(index) => drop_clause(index),
            KeyChange::Add(index) => format!("ADD {}", index.to_sql()),
        }
    }
}

/// A column change plus the key changes riding along with it. A lone
/// `ADD COLUMN` keeps its trailing space when appended.
fn alter_table(table: &str, clause: String, keys: &[KeyChange]) -> String {
    if keys.is_empty() {
        return format!("ALTER TABLE {} {};", quote_identifier(table), clause);
    }
    let mut clauses = vec![clause.trim_end().to_string()];
    clauses.extend(keys.iter().map(ToSql::to_sql));
    format!("ALTER TABLE {} {};", quote_identifier(table), clauses.join(", "))
}

fn drop_clause(index: &Index) -> String {
    match index.kind {
        IndexKind::Primary => "DROP PRIMARY KEY".to_string(),
        IndexKind::Unique | IndexKind::Regular => {
            format!("DROP INDEX {}", quote_identifier(&index.name))
        }
    }
}

impl ToSql for DefaultValue {
    fn to_sql(&self) -> String {
        match self {
            DefaultValue::Null => "NULL".to_string(),
            DefaultValue::Literal(value) => quote_literal(value),
            DefaultValue::Expression(expr) => expr.clone(),
        }
    }
}

/// Index clause as used by `ALTER TABLE ... ADD`.
impl ToSql for Index {
    fn to_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(ToSql::to_sql)
            .collect::<Vec<_>>()
            .join(", ");
        match self.kind {
            IndexKind::Primary => format!("PRIMARY KEY({})", columns),
            IndexKind::Unique | IndexKind::Regular => {
                format!("{} {}({})", self.kind, quote_identifier(&self.name), columns)
            }
        }
    }
}

impl ToSql for IndexColumn {
    fn to_sql(&self) -> String {
        match self.length {
            Some(length) => format!("{}({})", quote_identifier(&self.name), length),
            None => quote_identifier(&self.name).into_owned(),
        }
    }
}

/// The position clause; empty when the column is appended.
impl ToSql for ColumnPosition {
    fn to_sql(&self) -> String {
        match self {
            ColumnPosition::First => "FIRST".to_string(),
            ColumnPosition::After(column) => format!("AFTER {}", quote_identifier(column)),
            ColumnPosition::Last => String::new(),
        }
    }
}

/// MySQL 8 reserved words; they cannot appear as bare identifiers.
const RESERVED: &[&str] = &[
    "accessible", "add", "all", "alter", "analyze", "and", "as", "asc", "asensitive", "before",
    "between", "bigint", "binary", "blob", "both", "by", "call", "cascade", "case", "change",
    "char", "character", "check", "collate", "column", "condition", "constraint", "continue",
    "convert", "create", "cross", "cube", "cume_dist", "current_date", "current_time",
    "current_timestamp", "current_user", "cursor", "database", "databases", "day_hour",
    "day_microsecond", "day_minute", "day_second", "dec", "decimal", "declare", "default",
    "delayed", "delete", "dense_rank", "desc", "describe", "deterministic", "distinct",
    "distinctrow", "div", "double", "drop", "dual", "each", "else", "elseif", "empty",
    "enclosed", "escaped", "except", "exists", "exit", "explain", "false", "fetch",
    "first_value", "float", "float4", "float8", "for", "force", "foreign", "from", "fulltext",
    "function", "generated", "get", "grant", "group", "grouping", "groups", "having",
    "high_priority", "hour_microsecond", "hour_minute", "hour_second", "if", "ignore", "in",
    "index", "infile", "inner", "inout", "insensitive", "insert", "int", "int1", "int2", "int3",
    "int4", "int8", "integer", "intersect", "interval", "into", "io_after_gtids",
    "io_before_gtids", "is", "iterate", "join", "json_table", "key", "keys", "kill", "lag",
    "last_value", "lateral", "lead", "leading", "leave", "left", "like", "limit", "linear",
    "lines", "load", "localtime", "localtimestamp", "lock", "long", "longblob", "longtext",
    "loop", "low_priority", "master_bind", "master_ssl_verify_server_cert", "match", "maxvalue",
    "mediumblob", "mediumint", "mediumtext", "middleint", "minute_microsecond", "minute_second",
    "mod", "modifies", "natural", "not", "no_write_to_binlog", "nth_value", "ntile", "null",
    "numeric", "of", "on", "optimize", "optimizer_costs", "option", "optionally", "or", "order",
    "out", "outer", "outfile", "over", "partition", "percent_rank", "precision", "primary",
    "procedure", "purge", "qualify", "range", "rank", "read", "read_write", "reads", "real",
    "recursive", "references", "regexp", "release", "rename", "repeat", "replace", "require",
    "resignal", "restrict", "return", "revoke", "right", "rlike", "row", "row_number", "rows",
    "schema", "schemas", "second_microsecond", "select", "sensitive", "separator", "set",
    "show", "signal", "smallint", "spatial", "specific", "sql", "sql_big_result",
    "sql_calc_found_rows", "sql_small_result", "sqlexception", "sqlstate", "sqlwarning", "ssl",
    "starting", "stored", "straight_join", "system", "table", "terminated", "then", "tinyblob",
    "tinyint", "tinytext", "to", "trailing", "trigger", "true", "undo", "union", "unique",
    "unlock", "unsigned", "update", "usage", "use", "using", "utc_date", "utc_time",
    "utc_timestamp", "values", "varbinary", "varchar", "varcharacter", "varying", "virtual",
    "when", "where", "while", "window", "with", "write", "xor", "year_month", "zerofill",
];

/// Backtick `name` when it cannot be written bare.
pub fn quote_identifier(name: &str) -> Cow<'_, str> {
    let plain = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && !name.chars().all(|c| c.is_ascii_digit())
        && !RESERVED.contains(&name.to_ascii_lowercase().as_str());
    if plain {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("`{}`", name.replace('`', "``")))
    }
}

/// Single-quoted string literal with `'` doubled and `\` escaped.
pub fn quote_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}
