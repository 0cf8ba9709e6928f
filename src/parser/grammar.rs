//! nom grammar for the MySQL DDL subset mysqldef understands.
//!
//! ```text
//! statement    = create_table | create_index | alter_table | drop_table
//! create_table = CREATE TABLE [IF NOT EXISTS] name "(" definition {"," definition} ")" {table_option}
//! definition   = index_def | column_def
//! column_def   = name type {attribute}
//! index_def    = [CONSTRAINT [name]] PRIMARY KEY index_cols
//!              | [CONSTRAINT [name]] UNIQUE [KEY|INDEX] [name] index_cols
//!              | (KEY|INDEX) [name] index_cols
//! alter_table  = ALTER TABLE name action {"," action}
//! create_index = CREATE [UNIQUE] INDEX name ON name index_cols
//! drop_table   = DROP TABLE [IF EXISTS] name
//! ```
//!
//! Keywords are case-insensitive. Once a statement's leading keywords
//! match, the rest is parsed under `cut` so errors point at the offending
//! input instead of falling through to "unsupported statement".

use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_while1},
    character::complete::{char, digit1, multispace0},
    combinator::{cut, map, not, opt, recognize, value},
    error::{ErrorKind, ParseError},
    multi::{many0, separated_list1},
    sequence::{pair, preceded, terminated, tuple},
    IResult,
};

use super::{AlterAction, ColumnDef, CreateTable, Ddl, IndexDef, TableDefinition, TableOption};
use crate::schema::{Column, ColumnPosition, DefaultValue, IndexColumn, IndexKind};

/// Grammar error: where parsing stopped, plus an explanation when we have one.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError<'a> {
    pub input: &'a str,
    pub message: Option<&'static str>,
}

impl<'a> ParseError<&'a str> for SyntaxError<'a> {
    fn from_error_kind(input: &'a str, _kind: ErrorKind) -> Self {
        Self {
            input,
            message: None,
        }
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

impl SyntaxError<'_> {
    /// Human readable description, quoting the input where parsing stopped.
    pub fn describe(&self) -> String {
        let near = snippet(self.input);
        match (self.message, near.is_empty()) {
            (Some(message), true) => format!("{} at end of statement", message),
            (Some(message), false) => format!("{} near '{}'", message, near),
            (None, true) => "unexpected end of statement".to_string(),
            (None, false) => format!("syntax error near '{}'", near),
        }
    }
}

pub type PResult<'a, T> = IResult<&'a str, T, SyntaxError<'a>>;

fn failure<'a, T>(input: &'a str, message: &'static str) -> PResult<'a, T> {
    Err(nom::Err::Failure(SyntaxError {
        input,
        message: Some(message),
    }))
}

/// Turn a recoverable error into a hard failure once a statement is recognised.
fn committed(err: nom::Err<SyntaxError<'_>>) -> nom::Err<SyntaxError<'_>> {
    match err {
        nom::Err::Error(e) => nom::Err::Failure(e),
        other => other,
    }
}

/// First few words of `input`, for error messages.
pub fn snippet(input: &str) -> String {
    let flat: Vec<&str> = input.split_whitespace().take(6).collect();
    flat.join(" ")
}

// ========================================================================
// Lexical helpers
// ========================================================================

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// A case-insensitive keyword that is not the prefix of a longer word.
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    move |input: &'a str| {
        let (input, _) = multispace0(input)?;
        let (rest, matched) = tag_no_case(word)(input)?;
        if rest.starts_with(is_ident_char) {
            return Err(nom::Err::Error(SyntaxError::from_error_kind(
                input,
                ErrorKind::Tag,
            )));
        }
        Ok((rest, matched))
    }
}

/// A sequence of keywords, e.g. `NOT NULL`.
fn keywords<'a>(words: &'static [&'static str]) -> impl FnMut(&'a str) -> PResult<'a, ()> {
    move |mut input: &'a str| {
        for &word in words {
            let (rest, _) = keyword(word)(input)?;
            input = rest;
        }
        Ok((input, ()))
    }
}

fn symbol<'a>(c: char) -> impl FnMut(&'a str) -> PResult<'a, char> {
    move |input: &'a str| preceded(multispace0, char(c))(input)
}

/// Bare or backtick-quoted identifier.
pub fn identifier(input: &str) -> PResult<'_, String> {
    let (input, _) = multispace0(input)?;
    alt((
        quoted_identifier,
        map(take_while1(is_ident_char), |s: &str| s.to_string()),
    ))(input)
}

fn quoted_identifier(input: &str) -> PResult<'_, String> {
    let (mut rest, _) = char('`')(input)?;
    let mut name = String::new();
    loop {
        let Some(end) = rest.find('`') else {
            return failure(input, "unterminated quoted identifier");
        };
        name.push_str(&rest[..end]);
        rest = &rest[end + 1..];
        match rest.strip_prefix('`') {
            Some(after) => {
                name.push('`');
                rest = after;
            }
            None => return Ok((rest, name)),
        }
    }
}

/// Table name, optionally schema-qualified. The qualifier is dropped.
fn table_name(input: &str) -> PResult<'_, String> {
    let (input, first) = identifier(input)?;
    let (input, second) = opt(preceded(char('.'), identifier))(input)?;
    Ok((input, second.unwrap_or(first)))
}

/// Single- or double-quoted string literal, unescaped.
fn string_literal(input: &str) -> PResult<'_, String> {
    let (input, _) = multispace0(input)?;
    let quote = match input.chars().next() {
        Some(q @ ('\'' | '"')) => q,
        _ => {
            return Err(nom::Err::Error(SyntaxError::from_error_kind(
                input,
                ErrorKind::Char,
            )));
        }
    };

    let body = &input[1..];
    let mut out = String::new();
    let mut chars = body.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, '0')) => out.push('\0'),
                Some((_, other)) => out.push(other),
                None => break,
            }
        } else if c == quote {
            if chars.peek().is_some_and(|&(_, next)| next == quote) {
                chars.next();
                out.push(quote);
            } else {
                return Ok((&body[i + 1..], out));
            }
        } else {
            out.push(c);
        }
    }

    failure(input, "unterminated string literal")
}

fn number(input: &str) -> PResult<'_, &str> {
    let (input, _) = multispace0(input)?;
    recognize(tuple((
        opt(alt((char('-'), char('+')))),
        digit1,
        opt(pair(char('.'), digit1)),
    )))(input)
}

/// `( ... )` with balanced nesting, returning the raw inner text.
fn parenthesized(input: &str) -> PResult<'_, &str> {
    let (inner, _) = symbol('(')(input)?;
    let mut depth = 1usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in inner.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&inner[i + 1..], &inner[..i]));
                }
            }
            _ => {}
        }
    }

    failure(input, "unbalanced parentheses")
}

// ========================================================================
// Statements
// ========================================================================

/// Parse one statement body.
pub fn statement(input: &str) -> PResult<'_, Ddl> {
    let (input, ddl) = alt((create_table, create_index, alter_table, drop_table))(input)?;
    let (input, _) = multispace0(input)?;
    if !input.is_empty() {
        return failure(input, "unexpected input");
    }
    Ok((input, ddl))
}

fn create_table(input: &str) -> PResult<'_, Ddl> {
    let (input, _) = keywords(&["CREATE", "TABLE"])(input)?;
    create_table_rest(input).map_err(committed)
}

fn create_table_rest(input: &str) -> PResult<'_, Ddl> {
    let (input, if_not_exists) = opt(keywords(&["IF", "NOT", "EXISTS"]))(input)?;
    let (input, name) = table_name(input)?;
    let (input, definitions) = table_body(input)?;
    let (input, options) = many0(terminated(table_option, opt(symbol(','))))(input)?;
    Ok((
        input,
        Ddl::CreateTable(CreateTable {
            name,
            if_not_exists: if_not_exists.is_some(),
            definitions,
            options,
        }),
    ))
}

fn create_index(input: &str) -> PResult<'_, Ddl> {
    let (input, _) = keyword("CREATE")(input)?;
    let (input, unique) = opt(keyword("UNIQUE"))(input)?;
    let (input, _) = keyword("INDEX")(input)?;
    let kind = if unique.is_some() {
        IndexKind::Unique
    } else {
        IndexKind::Regular
    };
    create_index_rest(input, kind).map_err(committed)
}

fn create_index_rest(input: &str, kind: IndexKind) -> PResult<'_, Ddl> {
    let (input, name) = identifier(input)?;
    let (input, _) = opt(using_clause)(input)?;
    let (input, _) = keyword("ON")(input)?;
    let (input, table) = table_name(input)?;
    let (input, columns) = index_columns(input)?;
    Ok((
        input,
        Ddl::CreateIndex {
            table,
            index: IndexDef {
                name: Some(name),
                kind,
                columns,
            },
        },
    ))
}

fn alter_table(input: &str) -> PResult<'_, Ddl> {
    let (input, _) = keywords(&["ALTER", "TABLE"])(input)?;
    alter_table_rest(input).map_err(committed)
}

fn alter_table_rest(input: &str) -> PResult<'_, Ddl> {
    let (input, table) = table_name(input)?;
    let (input, actions) = separated_list1(symbol(','), alter_action)(input)?;
    Ok((input, Ddl::AlterTable { table, actions }))
}

fn drop_table(input: &str) -> PResult<'_, Ddl> {
    let (input, _) = keywords(&["DROP", "TABLE"])(input)?;
    drop_table_rest(input).map_err(committed)
}

fn drop_table_rest(input: &str) -> PResult<'_, Ddl> {
    let (input, if_exists) = opt(keywords(&["IF", "EXISTS"]))(input)?;
    let (input, name) = table_name(input)?;
    Ok((
        input,
        Ddl::DropTable {
            name,
            if_exists: if_exists.is_some(),
        },
    ))
}

// ========================================================================
// CREATE TABLE body
// ========================================================================

fn table_body(input: &str) -> PResult<'_, Vec<TableDefinition>> {
    let (mut input, _) = symbol('(')(input)?;
    let mut definitions = Vec::new();

    loop {
        let (rest, definition) = cut(table_definition)(input)?;
        definitions.push(definition);

        let (rest, separator) = match alt((symbol(','), symbol(')')))(rest) {
            Ok(ok) => ok,
            Err(_) => return failure(rest, "expected ',' or ')' after definition"),
        };
        if separator == ')' {
            return Ok((rest, definitions));
        }
        if symbol(')')(rest).is_ok() {
            return failure(rest, "trailing comma before ')'");
        }
        input = rest;
    }
}

fn table_definition(input: &str) -> PResult<'_, TableDefinition> {
    alt((
        unsupported_definition,
        map(index_def, TableDefinition::Index),
        map(column_def, TableDefinition::Column),
    ))(input)
}

fn unsupported_definition(input: &str) -> PResult<'_, TableDefinition> {
    let (rest, _) = multispace0(input)?;
    let (after, _) = opt(constraint_prefix)(rest)?;
    let (_, _) = alt((
        keywords(&["FOREIGN", "KEY"]),
        map(keyword("FULLTEXT"), |_| ()),
        map(keyword("SPATIAL"), |_| ()),
        map(keyword("CHECK"), |_| ()),
    ))(after)?;
    failure(rest, "unsupported definition")
}

fn column_def(input: &str) -> PResult<'_, ColumnDef> {
    let (input, name) = identifier(input)?;
    let (input, mut data_type) = cut(data_type)(input)?;
    let (input, attributes) = many0(column_attribute)(input)?;

    let mut def = ColumnDef {
        column: Column::new(name, String::new()),
        primary_key: false,
        unique: false,
    };
    for attribute in attributes {
        match attribute {
            ColumnAttribute::Null => def.column.nullable = true,
            ColumnAttribute::NotNull => def.column.nullable = false,
            ColumnAttribute::Default(value) => def.column.default = Some(value),
            ColumnAttribute::AutoIncrement => def.column.auto_increment = true,
            ColumnAttribute::PrimaryKey => def.primary_key = true,
            ColumnAttribute::Unique => def.unique = true,
            ColumnAttribute::OnUpdate(expr) => def.column.on_update = Some(expr),
            ColumnAttribute::Comment(text) => def.column.comment = Some(text),
            ColumnAttribute::Charset(charset) => {
                data_type.push_str(" character set ");
                data_type.push_str(&charset.to_ascii_lowercase());
            }
            ColumnAttribute::Collate(collate) => {
                data_type.push_str(" collate ");
                data_type.push_str(&collate.to_ascii_lowercase());
            }
        }
    }
    if let Some(DefaultValue::Literal(literal)) = &mut def.column.default {
        if let Some(padded) = decimal_literal(&data_type, literal) {
            *literal = padded;
        }
    }
    def.column.data_type = data_type;
    Ok((input, def))
}

/// A numeric literal written at a `decimal(p,s)` column's scale, the way
/// the server reports it (`0` becomes `0.00` for `decimal(10,2)`). `None`
/// when the type is not decimal or the literal is not a plain number that
/// fits the scale.
fn decimal_literal(data_type: &str, literal: &str) -> Option<String> {
    let args = data_type.strip_prefix("decimal(")?;
    let args = &args[..args.find(')')?];
    let scale: usize = args.split(',').nth(1)?.parse().ok()?;

    let (negative, digits) = match literal.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, literal.strip_prefix('+').unwrap_or(literal)),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    let numeric = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if whole.len() + fraction.len() == 0 || !numeric(whole) || !numeric(fraction) {
        return None;
    }
    if fraction.len() > scale {
        return None;
    }

    let whole = match whole.trim_start_matches('0') {
        "" => "0",
        trimmed => trimmed,
    };
    let zero = whole == "0" && fraction.chars().all(|c| c == '0');
    let mut out = String::new();
    if negative && !zero {
        out.push('-');
    }
    out.push_str(whole);
    if scale > 0 {
        out.push('.');
        out.push_str(fraction);
        out.extend(std::iter::repeat('0').take(scale - fraction.len()));
    }
    Some(out)
}

#[derive(Debug, Clone, PartialEq)]
enum ColumnAttribute {
    Null,
    NotNull,
    Default(DefaultValue),
    AutoIncrement,
    PrimaryKey,
    Unique,
    OnUpdate(String),
    Comment(String),
    Charset(String),
    Collate(String),
}

fn column_attribute(input: &str) -> PResult<'_, ColumnAttribute> {
    alt((
        value(ColumnAttribute::NotNull, keywords(&["NOT", "NULL"])),
        value(ColumnAttribute::Null, keyword("NULL")),
        map(preceded(keyword("DEFAULT"), cut(default_value)), ColumnAttribute::Default),
        value(ColumnAttribute::AutoIncrement, keyword("AUTO_INCREMENT")),
        value(ColumnAttribute::PrimaryKey, keywords(&["PRIMARY", "KEY"])),
        value(ColumnAttribute::PrimaryKey, keyword("KEY")),
        value(
            ColumnAttribute::Unique,
            pair(keyword("UNIQUE"), opt(keyword("KEY"))),
        ),
        map(
            preceded(keywords(&["ON", "UPDATE"]), cut(current_timestamp)),
            ColumnAttribute::OnUpdate,
        ),
        map(
            preceded(keyword("COMMENT"), cut(string_literal)),
            ColumnAttribute::Comment,
        ),
        map(charset_clause, ColumnAttribute::Charset),
        map(
            preceded(keyword("COLLATE"), cut(identifier)),
            ColumnAttribute::Collate,
        ),
    ))(input)
}

fn charset_clause(input: &str) -> PResult<'_, String> {
    preceded(
        alt((keywords(&["CHARACTER", "SET"]), map(keyword("CHARSET"), |_| ()))),
        cut(identifier),
    )(input)
}

fn data_type(input: &str) -> PResult<'_, String> {
    let (input, _) = multispace0(input)?;
    let (input, word) = take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)?;
    let word = word.to_ascii_lowercase();
    let (name, input) = match word.as_str() {
        "double" => match keyword("PRECISION")(input) {
            Ok((rest, _)) => (word.clone(), rest),
            Err(_) => (word.clone(), input),
        },
        "character" | "char" => match keyword("VARYING")(input) {
            Ok((rest, _)) => ("varchar".to_string(), rest),
            Err(_) => (word.clone(), input),
        },
        _ => (word.clone(), input),
    };

    let (input, args) = opt(parenthesized)(input)?;
    let (input, modifiers) = many0(alt((
        keyword("UNSIGNED"),
        keyword("SIGNED"),
        keyword("ZEROFILL"),
    )))(input)?;
    let (input, charset) = opt(charset_clause)(input)?;
    let (input, collate) = opt(preceded(keyword("COLLATE"), cut(identifier)))(input)?;

    let unsigned = modifiers
        .iter()
        .any(|m| m.eq_ignore_ascii_case("unsigned") || m.eq_ignore_ascii_case("zerofill"));
    let zerofill = modifiers.iter().any(|m| m.eq_ignore_ascii_case("zerofill"));

    let mut canonical = canonical_type(&name, args);
    if unsigned {
        canonical.push_str(" unsigned");
    }
    if zerofill {
        canonical.push_str(" zerofill");
    }
    if let Some(charset) = charset {
        canonical.push_str(" character set ");
        canonical.push_str(&charset.to_ascii_lowercase());
    }
    if let Some(collate) = collate {
        canonical.push_str(" collate ");
        canonical.push_str(&collate.to_ascii_lowercase());
    }
    Ok((input, canonical))
}

const INTEGER_TYPES: &[&str] = &["tinyint", "smallint", "mediumint", "int", "bigint"];

/// Fold synonyms and cosmetic differences so that the same type written
/// two ways compares equal.
pub fn canonical_type(name: &str, args: Option<&str>) -> String {
    let args = args.map(normalize_args);
    let (name, args) = match name {
        "integer" => ("int", args),
        "bool" | "boolean" => ("tinyint", Some("1".to_string())),
        "numeric" | "dec" | "fixed" => ("decimal", args),
        "real" => ("double", args),
        other => (other, args),
    };

    let args = match (name, args) {
        ("decimal", None) => Some("10,0".to_string()),
        ("decimal", Some(p)) if !p.contains(',') => Some(format!("{},0", p)),
        ("tinyint", Some(width)) if width == "1" => Some(width),
        (n, _) if INTEGER_TYPES.contains(&n) => None,
        (_, args) => args,
    };

    match args {
        Some(args) => format!("{}({})", name, args),
        None => name.to_string(),
    }
}

/// Lower-case and strip whitespace outside quoted parts of a type argument list.
fn normalize_args(args: &str) -> String {
    let mut out = String::with_capacity(args.len());
    let mut quote: Option<char> = None;
    for c in args.chars() {
        match quote {
            Some(q) if c == q => {
                out.push('\'');
                quote = None;
            }
            Some(_) => out.push(c),
            None if c == '\'' || c == '"' => {
                quote = Some(c);
                out.push('\'');
            }
            None if c.is_whitespace() => {}
            None => out.push(c.to_ascii_lowercase()),
        }
    }
    out
}

fn default_value(input: &str) -> PResult<'_, DefaultValue> {
    alt((
        value(DefaultValue::Null, keyword("NULL")),
        map(string_literal, DefaultValue::Literal),
        map(number, |n| DefaultValue::Literal(n.trim_start_matches('+').to_string())),
        value(DefaultValue::Literal("1".to_string()), keyword("TRUE")),
        value(DefaultValue::Literal("0".to_string()), keyword("FALSE")),
        map(current_timestamp, DefaultValue::Expression),
        map(parenthesized, |inner| {
            DefaultValue::Expression(format!("({})", inner.trim()))
        }),
        map(
            preceded(not(column_attribute_start), identifier),
            |word| DefaultValue::Expression(word.to_ascii_uppercase()),
        ),
    ))(input)
}

/// Guards `DEFAULT <word>` from swallowing the next attribute keyword.
fn column_attribute_start(input: &str) -> PResult<'_, ()> {
    map(
        alt((
            keyword("NOT"),
            keyword("AUTO_INCREMENT"),
            keyword("PRIMARY"),
            keyword("UNIQUE"),
            keyword("COMMENT"),
            keyword("ON"),
        )),
        |_| (),
    )(input)
}

/// `CURRENT_TIMESTAMP`, `NOW()` and synonyms, with optional fractional precision.
fn current_timestamp(input: &str) -> PResult<'_, String> {
    let (input, _) = alt((
        keyword("CURRENT_TIMESTAMP"),
        keyword("NOW"),
        keyword("LOCALTIMESTAMP"),
        keyword("LOCALTIME"),
    ))(input)?;
    let (input, precision) = opt(parenthesized)(input)?;
    let expr = match precision.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) => format!("CURRENT_TIMESTAMP({})", p),
        None => "CURRENT_TIMESTAMP".to_string(),
    };
    Ok((input, expr))
}

// ========================================================================
// Indexes
// ========================================================================

fn index_def(input: &str) -> PResult<'_, IndexDef> {
    alt((primary_key_def, unique_def, plain_index_def))(input)
}

/// `CONSTRAINT [name]`, yielding the optional constraint name.
fn constraint_prefix(input: &str) -> PResult<'_, Option<String>> {
    let (input, _) = keyword("CONSTRAINT")(input)?;
    opt(preceded(
        not(alt((
            keyword("PRIMARY"),
            keyword("UNIQUE"),
            keyword("FOREIGN"),
            keyword("CHECK"),
        ))),
        identifier,
    ))(input)
}

fn primary_key_def(input: &str) -> PResult<'_, IndexDef> {
    let (input, _) = opt(constraint_prefix)(input)?;
    let (input, _) = keywords(&["PRIMARY", "KEY"])(input)?;
    index_def_rest(input, None, IndexKind::Primary).map_err(committed)
}

fn unique_def(input: &str) -> PResult<'_, IndexDef> {
    let (input, constraint) = opt(constraint_prefix)(input)?;
    let (input, _) = keyword("UNIQUE")(input)?;
    let (input, _) = opt(alt((keyword("KEY"), keyword("INDEX"))))(input)?;
    index_def_rest(input, constraint.flatten(), IndexKind::Unique).map_err(committed)
}

fn plain_index_def(input: &str) -> PResult<'_, IndexDef> {
    let (input, _) = alt((keyword("KEY"), keyword("INDEX")))(input)?;
    index_def_rest(input, None, IndexKind::Regular).map_err(committed)
}

/// `[name] [USING ...] (columns) [options]`. Primary keys take no name.
fn index_def_rest(
    input: &str,
    fallback_name: Option<String>,
    kind: IndexKind,
) -> PResult<'_, IndexDef> {
    let (input, name) = if kind == IndexKind::Primary {
        (input, None)
    } else {
        opt(preceded(not(keyword("USING")), identifier))(input)?
    };
    let (input, _) = opt(using_clause)(input)?;
    let (input, columns) = index_columns(input)?;
    Ok((
        input,
        IndexDef {
            name: name.or(fallback_name),
            kind,
            columns,
        },
    ))
}

fn using_clause(input: &str) -> PResult<'_, ()> {
    map(
        preceded(
            keyword("USING"),
            cut(alt((keyword("BTREE"), keyword("HASH")))),
        ),
        |_| (),
    )(input)
}

/// `(col[(len)] [ASC|DESC], ...)` followed by ignorable index options.
fn index_columns(input: &str) -> PResult<'_, Vec<IndexColumn>> {
    let (input, _) = symbol('(')(input)?;
    let (input, columns) = separated_list1(symbol(','), index_column)(input)?;
    let (input, _) = match symbol(')')(input) {
        Ok(ok) => ok,
        Err(_) => return failure(input, "expected ')' after index columns"),
    };
    let (input, _) = many0(index_option)(input)?;
    Ok((input, columns))
}

fn index_column(input: &str) -> PResult<'_, IndexColumn> {
    let (input, name) = identifier(input)?;
    let (input, length) = opt(preceded(symbol('('), terminated(preceded(multispace0, digit1), symbol(')'))))(input)?;
    let (input, _) = opt(alt((keyword("ASC"), keyword("DESC"))))(input)?;
    let length = match length.map(str::parse::<u32>) {
        Some(Ok(n)) => Some(n),
        Some(Err(_)) => return failure(input, "index prefix length out of range"),
        None => None,
    };
    Ok((input, IndexColumn { name, length }))
}

fn index_option(input: &str) -> PResult<'_, ()> {
    alt((
        using_clause,
        map(preceded(keyword("COMMENT"), cut(string_literal)), |_| ()),
        map(keyword("VISIBLE"), |_| ()),
        map(keyword("INVISIBLE"), |_| ()),
    ))(input)
}

// ========================================================================
// Table options
// ========================================================================

fn table_option(input: &str) -> PResult<'_, TableOption> {
    alt((
        map(
            preceded(pair(keyword("ENGINE"), opt(symbol('='))), cut(identifier)),
            TableOption::Engine,
        ),
        map(
            preceded(
                tuple((
                    opt(keyword("DEFAULT")),
                    alt((keywords(&["CHARACTER", "SET"]), map(keyword("CHARSET"), |_| ()))),
                    opt(symbol('=')),
                )),
                cut(identifier),
            ),
            TableOption::Charset,
        ),
        map(
            preceded(
                tuple((opt(keyword("DEFAULT")), keyword("COLLATE"), opt(symbol('=')))),
                cut(identifier),
            ),
            TableOption::Collate,
        ),
        map(
            preceded(pair(keyword("COMMENT"), opt(symbol('='))), cut(string_literal)),
            |_| TableOption::Ignored,
        ),
        map(
            tuple((
                ignored_option_name,
                opt(symbol('=')),
                cut(alt((
                    map(string_literal, |_| ()),
                    map(number, |_| ()),
                    map(identifier, |_| ()),
                ))),
            )),
            |_| TableOption::Ignored,
        ),
    ))(input)
}

/// Table options accepted without affecting the schema.
const IGNORED_OPTIONS: &[&str] = &[
    "AUTO_INCREMENT",
    "AVG_ROW_LENGTH",
    "CHECKSUM",
    "COMPRESSION",
    "CONNECTION",
    "DELAY_KEY_WRITE",
    "ENCRYPTION",
    "ENGINE_ATTRIBUTE",
    "INSERT_METHOD",
    "KEY_BLOCK_SIZE",
    "MAX_ROWS",
    "MIN_ROWS",
    "PACK_KEYS",
    "PASSWORD",
    "ROW_FORMAT",
    "SECONDARY_ENGINE",
    "SECONDARY_ENGINE_ATTRIBUTE",
    "STATS_AUTO_RECALC",
    "STATS_PERSISTENT",
    "STATS_SAMPLE_PAGES",
    "TABLESPACE",
];

fn ignored_option_name(input: &str) -> PResult<'_, ()> {
    for &name in IGNORED_OPTIONS {
        if let Ok((rest, _)) = keyword(name)(input) {
            return Ok((rest, ()));
        }
    }
    alt((
        keywords(&["DATA", "DIRECTORY"]),
        keywords(&["INDEX", "DIRECTORY"]),
    ))(input)
}

// ========================================================================
// ALTER TABLE actions
// ========================================================================

fn alter_action(input: &str) -> PResult<'_, AlterAction> {
    alt((
        map(preceded(keyword("ADD"), index_def), AlterAction::AddIndex),
        add_column,
        value(AlterAction::DropPrimaryKey, keywords(&["DROP", "PRIMARY", "KEY"])),
        drop_index,
        drop_column,
        modify_column,
    ))(input)
}

fn column_position(input: &str) -> PResult<'_, ColumnPosition> {
    map(
        opt(alt((
            value(ColumnPosition::First, keyword("FIRST")),
            map(preceded(keyword("AFTER"), cut(identifier)), ColumnPosition::After),
        ))),
        |position| position.unwrap_or(ColumnPosition::Last),
    )(input)
}

fn add_column(input: &str) -> PResult<'_, AlterAction> {
    let (input, _) = keyword("ADD")(input)?;
    let (input, _) = opt(keyword("COLUMN"))(input)?;
    let (input, (column, position)) = column_change(input).map_err(committed)?;
    Ok((input, AlterAction::AddColumn { column, position }))
}

fn column_change(input: &str) -> PResult<'_, (ColumnDef, ColumnPosition)> {
    let (input, column) = column_def(input)?;
    let (input, position) = column_position(input)?;
    Ok((input, (column, position)))
}

fn drop_index(input: &str) -> PResult<'_, AlterAction> {
    let (input, _) = keyword("DROP")(input)?;
    let (input, _) = alt((keyword("INDEX"), keyword("KEY")))(input)?;
    cut(map(identifier, AlterAction::DropIndex))(input)
}

fn drop_column(input: &str) -> PResult<'_, AlterAction> {
    let (input, _) = keyword("DROP")(input)?;
    let (input, _) = opt(keyword("COLUMN"))(input)?;
    cut(map(identifier, AlterAction::DropColumn))(input)
}

fn modify_column(input: &str) -> PResult<'_, AlterAction> {
    let (input, _) = keyword("MODIFY")(input)?;
    let (input, _) = opt(keyword("COLUMN"))(input)?;
    let (input, (column, position)) = column_change(input).map_err(committed)?;
    Ok((input, AlterAction::ModifyColumn { column, position }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_keyword_is_case_insensitive_and_whole_word() {
        assert!(keyword("KEY")(" key (a)").is_ok());
        assert!(keyword("KEY")("key_block_size").is_err());
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(identifier("  users(").unwrap(), ("(", "users".to_string()));
        assert_eq!(identifier("`odd``name` x").unwrap(), (" x", "odd`name".to_string()));
    }

    #[test]
    fn test_string_literal_escapes() {
        assert_eq!(string_literal("'it''s'").unwrap().1, "it's");
        assert_eq!(string_literal(r"'a\'b'").unwrap().1, "a'b");
        assert_eq!(string_literal("\"x\" rest").unwrap(), (" rest", "x".to_string()));
    }

    #[test]
    fn test_canonical_type() {
        assert_eq!(canonical_type("bigint", Some("20")), "bigint");
        assert_eq!(canonical_type("tinyint", Some("1")), "tinyint(1)");
        assert_eq!(canonical_type("boolean", None), "tinyint(1)");
        assert_eq!(canonical_type("integer", None), "int");
        assert_eq!(canonical_type("decimal", None), "decimal(10,0)");
        assert_eq!(canonical_type("numeric", Some("10, 2")), "decimal(10,2)");
        assert_eq!(canonical_type("enum", Some("'A', 'b'")), "enum('A','b')");
    }

    #[test]
    fn test_data_type_modifiers() {
        assert_eq!(data_type(" BIGINT UNSIGNED NOT NULL").unwrap().1, "bigint unsigned");
        assert_eq!(data_type(" VarChar (40) DEFAULT").unwrap().1, "varchar(40)");
        assert_eq!(data_type(" int(10) zerofill").unwrap().1, "int unsigned zerofill");
        assert_eq!(
            data_type(" varchar(10) CHARACTER SET utf8mb4 COLLATE utf8mb4_bin").unwrap().1,
            "varchar(10) character set utf8mb4 collate utf8mb4_bin"
        );
    }

    #[test]
    fn test_default_values() {
        assert_eq!(default_value(" NULL").unwrap().1, DefaultValue::Null);
        assert_eq!(default_value(" '0'").unwrap().1, DefaultValue::Literal("0".into()));
        assert_eq!(default_value(" 0").unwrap().1, DefaultValue::Literal("0".into()));
        assert_eq!(default_value(" -1.5").unwrap().1, DefaultValue::Literal("-1.5".into()));
        assert_eq!(default_value(" TRUE").unwrap().1, DefaultValue::Literal("1".into()));
        assert_eq!(
            default_value(" now()").unwrap().1,
            DefaultValue::Expression("CURRENT_TIMESTAMP".into())
        );
        assert_eq!(
            default_value(" CURRENT_TIMESTAMP(3)").unwrap().1,
            DefaultValue::Expression("CURRENT_TIMESTAMP(3)".into())
        );
        assert_eq!(
            default_value(" (uuid())").unwrap().1,
            DefaultValue::Expression("(uuid())".into())
        );
    }

    #[test]
    fn test_column_def() {
        let (rest, def) =
            column_def("id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,").unwrap();
        assert_eq!(rest, ",");
        assert_eq!(def.column.name, "id");
        assert_eq!(def.column.data_type, "bigint unsigned");
        assert!(!def.column.nullable);
        assert!(def.column.auto_increment);
        assert!(def.primary_key);
        assert!(!def.unique);
    }

    #[test]
    fn test_column_def_with_on_update_and_comment() {
        let (_, def) = column_def(
            "updated_at timestamp NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP COMMENT 'touched'",
        )
        .unwrap();
        assert_eq!(
            def.column.default,
            Some(DefaultValue::Expression("CURRENT_TIMESTAMP".into()))
        );
        assert_eq!(def.column.on_update.as_deref(), Some("CURRENT_TIMESTAMP"));
        assert_eq!(def.column.comment.as_deref(), Some("touched"));
    }

    #[test]
    fn test_index_defs() {
        let (_, key) = index_def("KEY index_name(name)").unwrap();
        assert_eq!(key.name.as_deref(), Some("index_name"));
        assert_eq!(key.kind, IndexKind::Regular);
        assert_eq!(key.columns, vec![IndexColumn::new("name")]);

        let (_, pk) = index_def("PRIMARY KEY (`a`, b)").unwrap();
        assert_eq!(pk.kind, IndexKind::Primary);
        assert_eq!(pk.columns.len(), 2);

        let (_, unique) = index_def("CONSTRAINT uq_email UNIQUE (email(20) DESC)").unwrap();
        assert_eq!(unique.name.as_deref(), Some("uq_email"));
        assert_eq!(unique.kind, IndexKind::Unique);
        assert_eq!(unique.columns[0].length, Some(20));

        let (_, unnamed) = index_def("INDEX USING BTREE (a)").unwrap();
        assert_eq!(unnamed.name, None);
    }

    #[test]
    fn test_trailing_comma_in_table_body() {
        let err = table_body("(\n  a int,\n  b int,\n)").unwrap_err();
        match err {
            nom::Err::Failure(e) => assert_eq!(e.message, Some("trailing comma before ')'")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_statement_is_soft_error() {
        assert!(matches!(statement("SELECT 1"), Err(nom::Err::Error(_))));
        assert!(matches!(
            statement("CREATE TABLE t (a int) garbage here ("),
            Err(nom::Err::Failure(_))
        ));
    }

    #[test]
    fn test_foreign_keys_are_rejected() {
        let err = table_body("(a int, FOREIGN KEY (a) REFERENCES b (id))").unwrap_err();
        match err {
            nom::Err::Failure(e) => {
                assert_eq!(e.describe(), "unsupported definition near 'FOREIGN KEY (a) REFERENCES b (id))'")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_decimal_defaults_take_the_column_scale() {
        let default_of = |sql: &str| column_def(sql).unwrap().1.column.default;
        assert_eq!(
            default_of("p decimal(10,2) DEFAULT 0"),
            Some(DefaultValue::Literal("0.00".into()))
        );
        assert_eq!(
            default_of("p DECIMAL(10, 2) NOT NULL DEFAULT '-1.5'"),
            Some(DefaultValue::Literal("-1.50".into()))
        );
        assert_eq!(
            default_of("p numeric DEFAULT 007"),
            Some(DefaultValue::Literal("7".into()))
        );
        assert_eq!(
            default_of("p decimal(10,2) DEFAULT '0.00'"),
            Some(DefaultValue::Literal("0.00".into()))
        );
        assert_eq!(
            default_of("p decimal(10,1) DEFAULT '1.25'"),
            Some(DefaultValue::Literal("1.25".into()))
        );
        assert_eq!(default_of("p int DEFAULT 0"), Some(DefaultValue::Literal("0".into())));
    }

    #[test]
    fn test_table_options() {
        let (_, ddl) = statement(
            "CREATE TABLE t (a int) ENGINE=InnoDB AUTO_INCREMENT=12 ROW_FORMAT=DYNAMIC DEFAULT CHARSET=utf8mb4 COMMENT='x'",
        )
        .unwrap();
        match ddl {
            Ddl::CreateTable(create) => assert_eq!(
                create.options,
                vec![
                    TableOption::Engine("InnoDB".into()),
                    TableOption::Ignored,
                    TableOption::Ignored,
                    TableOption::Charset("utf8mb4".into()),
                    TableOption::Ignored,
                ]
            ),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(
            statement("CREATE TABLE t (a int) foo bar"),
            Err(nom::Err::Failure(_))
        ));
        assert!(matches!(
            statement("CREATE TABLE t (a int) ROW_FORMAT="),
            Err(nom::Err::Failure(_))
        ));
    }
}
