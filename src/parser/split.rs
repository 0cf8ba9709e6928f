//! Statement splitting.
//!
//! Cuts SQL text into statements at top-level `;`, honouring quotes and
//! comments. Each statement keeps its verbatim text (what gets echoed back
//! for a CREATE TABLE) and a comment-free body (what the grammar parses).

use crate::error::{DefError, DefResult};

/// One statement as it appeared in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStatement<'a> {
    /// 1-based line of the first character of the statement.
    pub line: usize,
    /// Verbatim text, including the terminating `;` when present.
    pub source: &'a str,
    /// Text with comments blanked out and without the terminating `;`.
    pub body: String,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    Quoted(char),
    LineComment,
    BlockComment,
}

/// Split `input` into statements.
pub fn split_statements(input: &str) -> DefResult<Vec<RawStatement<'_>>> {
    let mut statements = Vec::new();
    let mut state = State::Code;
    let mut start: Option<usize> = None;
    let mut body = String::new();
    let mut depth: usize = 0;
    let mut escaped = false;

    let mut chars = input.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match state {
            State::Quoted(quote) => {
                body.push(c);
                if escaped {
                    escaped = false;
                } else if c == '\\' && quote != '`' {
                    escaped = true;
                } else if c == quote {
                    state = State::Code;
                }
            }
            State::LineComment => {
                if c == '\n' {
                    state = State::Code;
                    body.push('\n');
                }
            }
            State::BlockComment => {
                if c == '*' && chars.peek().is_some_and(|&(_, next)| next == '/') {
                    chars.next();
                    state = State::Code;
                    body.push(' ');
                }
            }
            State::Code => {
                let next = chars.peek().map(|&(_, n)| n);
                if c == '#' || (c == '-' && next == Some('-') && starts_line_comment(&input[i..])) {
                    state = State::LineComment;
                    continue;
                }
                if c == '/' && next == Some('*') {
                    chars.next();
                    state = State::BlockComment;
                    continue;
                }
                if c.is_whitespace() && start.is_none() {
                    continue;
                }
                if start.is_none() {
                    start = Some(i);
                }
                match c {
                    '\'' | '"' | '`' => {
                        state = State::Quoted(c);
                        body.push(c);
                    }
                    '(' => {
                        depth += 1;
                        body.push(c);
                    }
                    ')' => {
                        depth = depth.saturating_sub(1);
                        body.push(c);
                    }
                    ';' if depth == 0 => {
                        if let Some(begin) = start.take() {
                            statements.push(RawStatement {
                                line: line_of(input, begin),
                                source: &input[begin..=i],
                                body: std::mem::take(&mut body),
                            });
                        }
                    }
                    _ => body.push(c),
                }
            }
        }
    }

    match state {
        State::Quoted(quote) => {
            let begin = start.unwrap_or(0);
            return Err(DefError::parse(
                line_of(input, begin),
                &input[begin..],
                format!("unterminated {} quote", quote),
            ));
        }
        State::BlockComment => {
            let begin = start.unwrap_or(0);
            return Err(DefError::parse(
                line_of(input, begin),
                &input[begin..],
                "unterminated /* comment",
            ));
        }
        State::Code | State::LineComment => {}
    }

    if let Some(begin) = start {
        if !body.trim().is_empty() {
            statements.push(RawStatement {
                line: line_of(input, begin),
                source: input[begin..].trim_end(),
                body,
            });
        }
    }

    Ok(statements)
}

/// MySQL only treats `--` as a comment when followed by whitespace.
fn starts_line_comment(rest: &str) -> bool {
    rest[2..].chars().next().is_none_or(char::is_whitespace)
}

fn line_of(input: &str, offset: usize) -> usize {
    input[..offset].matches('\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_keeps_source_verbatim() {
        let sql = "CREATE TABLE users (\n  id int\n);\nCREATE TABLE bigdata (\n  data bigint\n);";
        let statements = split_statements(sql).unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].source, "CREATE TABLE users (\n  id int\n);");
        assert_eq!(statements[0].line, 1);
        assert_eq!(statements[1].source, "CREATE TABLE bigdata (\n  data bigint\n);");
        assert_eq!(statements[1].line, 4);
    }

    #[test]
    fn test_split_without_trailing_semicolon() {
        let statements = split_statements("  CREATE TABLE t (a int)  \n").unwrap();
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].source, "CREATE TABLE t (a int)");
        assert_eq!(statements[0].body, "CREATE TABLE t (a int)  \n");
    }

    #[test]
    fn test_semicolons_inside_quotes_and_comments() {
        let sql = "-- leading; comment\nCREATE TABLE t (a varchar(3) DEFAULT ';' /* ; */);\n# done;\n";
        let statements = split_statements(sql).unwrap();
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].line, 2);
        assert!(statements[0].body.contains("DEFAULT ';'"));
        assert!(!statements[0].body.contains("/*"));
    }

    #[test]
    fn test_double_dash_needs_whitespace() {
        let statements = split_statements("CREATE TABLE t (a int DEFAULT 1--1);").unwrap();
        assert!(statements[0].body.contains("1--1"));
    }

    #[test]
    fn test_empty_input() {
        assert!(split_statements("  \n -- nothing here\n").unwrap().is_empty());
    }

    #[test]
    fn test_unterminated_quote() {
        let err = split_statements("CREATE TABLE t (a int DEFAULT 'x);").unwrap_err();
        assert!(err.to_string().contains("unterminated ' quote"));
    }
}
