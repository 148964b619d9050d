//! Canonical (MySQL-flavoured) SQL → backend dialect rewriting.
//!
//! Conversion is plain text rewriting. Phrase substitutions only touch SQL outside literals and
//! comments; anything a converter does not recognise passes through unchanged and the backend
//! gets to reject it.

mod mysql;
mod postgres;
mod sqlite;

use std::sync::LazyLock;

use regex::Regex;

use crate::format::{strip_leading_comments, walk};
use crate::types::DatabaseType;

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

/// A converted statement plus the auxiliary DDL that must run before it, in order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConvertedSql {
    pub statement: String,
    pub preamble: Vec<String>,
}

impl ConvertedSql {
    #[must_use]
    pub fn unchanged(sql: &str) -> Self {
        Self {
            statement: sql.to_string(),
            preamble: Vec::new(),
        }
    }
}

/// Rewrites canonical SQL for one backend.
pub trait Dialect: Send + Sync {
    fn database_type(&self) -> DatabaseType;

    fn convert(&self, sql: &str) -> ConvertedSql;
}

/// The converter for `db_type`.
#[must_use]
pub fn dialect_for(db_type: DatabaseType) -> &'static dyn Dialect {
    match db_type {
        DatabaseType::MySql => &MySqlDialect,
        DatabaseType::Postgres => &PostgresDialect,
        DatabaseType::Sqlite => &SqliteDialect,
    }
}

/// Shorthand for `dialect_for(db_type).convert(sql)`, applied after any leading comments.
///
/// Leading comments are dropped so table statements are recognised by their first keyword. A
/// statement that is nothing but comments is passed through unchanged.
#[must_use]
pub fn convert(db_type: DatabaseType, sql: &str) -> ConvertedSql {
    let code = strip_leading_comments(sql);
    if code.is_empty() {
        return ConvertedSql::unchanged(sql);
    }
    dialect_for(db_type).convert(code)
}

/// Apply `rewrite` to every run of SQL that lies outside literals, quoted identifiers and
/// comments; everything else is copied verbatim.
pub(crate) fn rewrite_code(sql: &str, mut rewrite: impl FnMut(&str) -> String) -> String {
    let mut visible = vec![false; sql.len()];
    let _ = walk::<(), _>(sql, |idx| {
        visible[idx] = true;
        Ok(None)
    });

    let mut out = String::with_capacity(sql.len());
    let mut start = 0;
    while start < sql.len() {
        let kind = visible[start];
        let mut end = start;
        while end < sql.len() && visible[end] == kind {
            end += 1;
        }
        if kind {
            out.push_str(&rewrite(&sql[start..end]));
        } else {
            out.push_str(&sql[start..end]);
        }
        start = end;
    }
    out
}

/// Replace every match of each pattern in order.
pub(crate) fn replace_each(segment: &str, rules: &[(&LazyLock<Regex>, &str)]) -> String {
    let mut out = segment.to_string();
    for (pattern, replacement) in rules {
        if pattern.is_match(&out) {
            out = pattern.replace_all(&out, *replacement).into_owned();
        }
    }
    out
}

/// Table-level statement kinds the converters special-case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TableStatement {
    Create {
        table: String,
    },
    Alter {
        table: String,
        action: AlterAction,
        rest: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AlterAction {
    Add,
    Drop,
    Change,
    Rename,
}

static CREATE_TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*create\s+(?:temporary\s+)?table\s+(?:if\s+not\s+exists\s+)?([^\s(]+)")
        .unwrap()
});
static ALTER_TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*alter\s+table\s+([^\s]+)\s+(add|drop|change|rename)\s+(.+?)\s*;?\s*$")
        .unwrap()
});

pub(crate) fn table_statement(sql: &str) -> Option<TableStatement> {
    if let Some(caps) = CREATE_TABLE_RE.captures(sql) {
        return Some(TableStatement::Create {
            table: unquote_identifier(&caps[1]),
        });
    }
    let caps = ALTER_TABLE_RE.captures(sql)?;
    let action = match caps[2].to_ascii_lowercase().as_str() {
        "add" => AlterAction::Add,
        "drop" => AlterAction::Drop,
        "change" => AlterAction::Change,
        _ => AlterAction::Rename,
    };
    Some(TableStatement::Alter {
        table: unquote_identifier(&caps[1]),
        action,
        rest: caps[3].to_string(),
    })
}

fn unquote_identifier(name: &str) -> String {
    name.trim_matches(|c| c == '`' || c == '"' || c == '[' || c == ']')
        .to_string()
}

static ENGINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*\bengine\s*=\s*\w+").unwrap());
static CHARSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*(\bdefault\s+)?\b(character\s+set|charset)\s*=?\s*\w+").unwrap()
});
static COLLATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*(\bdefault\s+)?\bcollate\s*=?\s*\w+").unwrap());
static TABLE_AUTO_INCREMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*\bauto_increment\s*=\s*\d+").unwrap());

/// Drop storage-engine, charset, collation and auto-increment seed options that follow the
/// column list of a `CREATE TABLE`.
pub(crate) fn strip_table_options(sql: &str) -> String {
    let Some(close) = sql.rfind(')') else {
        return sql.to_string();
    };
    let (columns, options) = sql.split_at(close + 1);
    let options = replace_each(
        options,
        &[
            (&ENGINE_RE, ""),
            (&CHARSET_RE, ""),
            (&COLLATE_RE, ""),
            (&TABLE_AUTO_INCREMENT_RE, ""),
        ],
    );
    format!("{columns}{}", options.trim_end_matches(|c: char| c == ',' || c.is_whitespace()))
}

static COLUMN_POSITION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(?:(?:after|before)\s+[^\s;]+|first)\s*(;?)\s*$").unwrap()
});

/// Remove a trailing `AFTER col` / `BEFORE col` / `FIRST` from `ALTER TABLE ... ADD`.
pub(crate) fn strip_column_position(sql: &str) -> String {
    COLUMN_POSITION_RE.replace(sql, "$1").into_owned()
}

/// An inline `col ENUM('a', 'b')` definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EnumColumn {
    /// Byte range of `ENUM(...)` in the statement.
    pub(crate) type_range: std::ops::Range<usize>,
    pub(crate) column: String,
    /// The quoted value list as written, without the parentheses.
    pub(crate) values: String,
}

static ENUM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)([\w`"]+)\s+(enum\s*\(((?:'[^']*'|[^)'])*)\))"#).unwrap()
});

pub(crate) fn enum_columns(sql: &str) -> Vec<EnumColumn> {
    ENUM_RE
        .captures_iter(sql)
        .filter_map(|caps| {
            let ty = caps.get(2)?;
            Some(EnumColumn {
                type_range: ty.range(),
                column: unquote_identifier(&caps[1]),
                values: caps[3].trim().to_string(),
            })
        })
        .collect()
}

/// Replace each enum type with the text `render` produces for it.
pub(crate) fn replace_enum_types(
    sql: &str,
    columns: &[EnumColumn],
    mut render: impl FnMut(&EnumColumn) -> String,
) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut last = 0;
    for column in columns {
        out.push_str(&sql[last..column.type_range.start]);
        out.push_str(&render(column));
        last = column.type_range.end;
    }
    out.push_str(&sql[last..]);
    out
}

/// `ALTER TABLE t CHANGE [COLUMN] old new definition` broken into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ColumnChange {
    pub(crate) old_name: String,
    pub(crate) new_name: String,
    /// Column type with the `NOT NULL` / `DEFAULT` constraints removed.
    pub(crate) column_type: String,
    pub(crate) not_null: bool,
    pub(crate) default: Option<String>,
}

static CHANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^(?:column\s+)?([^\s]+)\s+([^\s]+)\s+(.+)$").unwrap()
});
static NOT_NULL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+not\s+null\b").unwrap());
static NULL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\s+null\b").unwrap());
static DEFAULT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+default\s+('[^']*'|[^\s]+)").unwrap());

pub(crate) fn parse_column_change(rest: &str) -> Option<ColumnChange> {
    let caps = CHANGE_RE.captures(rest.trim())?;
    let mut definition = caps[3].trim().to_string();

    let not_null = NOT_NULL_RE.is_match(&definition);
    definition = NOT_NULL_RE.replace_all(&definition, "").into_owned();
    definition = NULL_RE.replace_all(&definition, "").into_owned();

    let default = DEFAULT_RE
        .captures(&definition)
        .map(|caps| caps[1].to_string());
    definition = DEFAULT_RE.replace_all(&definition, "").into_owned();

    Some(ColumnChange {
        old_name: unquote_identifier(&caps[1]),
        new_name: unquote_identifier(&caps[2]),
        column_type: definition.trim().to_string(),
        not_null,
        default,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_rewrites_skip_literals() {
        let out = rewrite_code("SELECT 'id = 1', id = 1 -- id = 2\n", |s| {
            s.replace("id = ", "rowid = ")
        });
        assert_eq!(out, "SELECT 'id = 1', rowid = 1 -- id = 2\n");
    }

    #[test]
    fn detects_table_statements() {
        assert_eq!(
            table_statement("CREATE TABLE IF NOT EXISTS `users` (id INT)"),
            Some(TableStatement::Create {
                table: "users".into()
            })
        );
        assert_eq!(
            table_statement("alter table users change name full_name VARCHAR(100) NOT NULL"),
            Some(TableStatement::Alter {
                table: "users".into(),
                action: AlterAction::Change,
                rest: "name full_name VARCHAR(100) NOT NULL".into(),
            })
        );
        assert_eq!(table_statement("SELECT 1"), None);
    }

    #[test]
    fn strips_only_trailing_table_options() {
        let sql = "CREATE TABLE t (name VARCHAR(10) COLLATE utf8mb4_bin) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 AUTO_INCREMENT=5";
        assert_eq!(
            strip_table_options(sql),
            "CREATE TABLE t (name VARCHAR(10) COLLATE utf8mb4_bin)"
        );
        assert_eq!(
            strip_table_options("CREATE TABLE t (a INT) engine = InnoDB DEFAULT CHARACTER SET=utf8"),
            "CREATE TABLE t (a INT)"
        );
    }

    #[test]
    fn finds_enum_columns() {
        let sql = "CREATE TABLE t (status ENUM('active','in)active') NOT NULL, kind enum ('a'))";
        let found = enum_columns(sql);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].column, "status");
        assert_eq!(found[0].values, "'active','in)active'");
        assert_eq!(found[1].column, "kind");
        assert_eq!(&sql[found[1].type_range.clone()], "enum ('a')");
    }

    #[test]
    fn parses_column_changes() {
        let change = parse_column_change("name full_name VARCHAR(100) NOT NULL DEFAULT 'x'").unwrap();
        assert_eq!(change.old_name, "name");
        assert_eq!(change.new_name, "full_name");
        assert_eq!(change.column_type, "VARCHAR(100)");
        assert!(change.not_null);
        assert_eq!(change.default.as_deref(), Some("'x'"));

        let same = parse_column_change("COLUMN age age INT").unwrap();
        assert_eq!(same.old_name, same.new_name);
        assert!(!same.not_null);
    }

    #[test]
    fn strips_column_positions() {
        assert_eq!(
            strip_column_position("ALTER TABLE t ADD note TEXT AFTER name"),
            "ALTER TABLE t ADD note TEXT"
        );
        assert_eq!(
            strip_column_position("ALTER TABLE t ADD note TEXT FIRST;"),
            "ALTER TABLE t ADD note TEXT;"
        );
    }
}
