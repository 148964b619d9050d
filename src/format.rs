//! Placeholder formatting: resolves `%kind`, `{name}` and `{n}` tokens against arguments.
//!
//! Formatting walks the template once and produces three outputs in lock-step: backend SQL with
//! native parameter markers, a diagnostic rendering with quoted literals, and the bound values.
//! Tokens inside quoted literals, quoted identifiers and comments are left alone.
//!
//! ```rust
//! use sql_conduit::prelude::*;
//!
//! let out = format_statement(
//!     DatabaseType::Postgres,
//!     "SELECT * FROM users WHERE status = %s AND group_id = %i",
//!     &Args::positional([RowValues::from("active"), RowValues::Int(2)]),
//! )
//! .unwrap();
//! assert_eq!(out.sql, "SELECT * FROM users WHERE status = $1 AND group_id = $2");
//! ```

mod parsers;
mod scanner;

use std::sync::LazyLock;

use regex::Regex;

use crate::args::Args;
use crate::error::SqlConduitError;
use crate::types::{DatabaseType, RowValues};
use crate::validation::{PlaceholderKind, validate};

pub use scanner::{split_sql_statements, strip_leading_comments};
pub(crate) use scanner::walk;

/// Payload of one bound parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundData {
    Null,
    /// Validated, normalised text; backends convert it to the native type at bind time.
    Text(String),
    Bytes(Vec<u8>),
}

/// A validated value ready for binding, tagged with the placeholder kind it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundValue {
    pub kind: PlaceholderKind,
    pub data: BoundData,
}

impl BoundValue {
    #[must_use]
    pub fn text(kind: PlaceholderKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            data: BoundData::Text(value.into()),
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            BoundData::Text(s) => Some(s),
            BoundData::Null | BoundData::Bytes(_) => None,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.data == BoundData::Null
    }
}

/// Output of [`format_statement`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedStatement {
    /// SQL with backend-native parameter markers; the prepared-statement cache key is derived
    /// from this text.
    pub sql: String,
    /// Literal-substituted rendering for logs and errors. Never executed.
    pub diagnostic: String,
    pub values: Vec<BoundValue>,
}

/// Resolve every placeholder in `template` against `args`.
///
/// # Errors
/// `MissingArgument` when a token has no value to bind, `InvalidArgument` when a value fails
/// validation for its kind. Nothing is bound when either occurs.
pub fn format_statement(
    db_type: DatabaseType,
    template: &str,
    args: &Args,
) -> Result<FormattedStatement, SqlConduitError> {
    let mut builder = Builder {
        db_type,
        template,
        args,
        next_positional: 0,
        last: 0,
        sql: String::with_capacity(template.len() + 8),
        diagnostic: String::with_capacity(template.len() + 16),
        values: Vec::new(),
    };
    walk(template, |idx| builder.visit(idx))?;
    Ok(builder.finish())
}

struct Builder<'a> {
    db_type: DatabaseType,
    template: &'a str,
    args: &'a Args,
    next_positional: usize,
    last: usize,
    sql: String,
    diagnostic: String,
    values: Vec<BoundValue>,
}

impl Builder<'_> {
    fn visit(&mut self, idx: usize) -> Result<Option<usize>, SqlConduitError> {
        let (template, args) = (self.template, self.args);
        let bytes = template.as_bytes();
        let (end, kind, value) = match bytes[idx] {
            b'%' => {
                let Some((end, word)) = parsers::typed_token(bytes, idx) else {
                    return Ok(None);
                };
                let value = args.nth(self.next_positional);
                self.next_positional += 1;
                (end, PlaceholderKind::from_token(word), value)
            }
            b'{' => {
                let Some((end, selector)) = parsers::selector_token(bytes, idx) else {
                    return Ok(None);
                };
                let value = if args.is_named() {
                    args.by_name(selector)
                } else {
                    selector
                        .parse::<usize>()
                        .ok()
                        .filter(|n| *n >= 1)
                        .and_then(|n| args.nth(n - 1))
                };
                (end, PlaceholderKind::String, value)
            }
            _ => return Ok(None),
        };

        let Some(value) = value else {
            return Err(SqlConduitError::MissingArgument {
                token: template[idx..end].to_string(),
                sql: template.to_string(),
            });
        };
        let (bound, display) =
            resolve(&kind, value).ok_or_else(|| SqlConduitError::InvalidArgument {
                kind: kind.clone(),
                value: value.to_plain_string(),
                sql: template.to_string(),
            })?;

        let literal = &template[self.last..idx];
        self.sql.push_str(literal);
        self.sql
            .push_str(&self.db_type.placeholder(self.values.len() + 1));
        self.diagnostic.push_str(literal);
        self.diagnostic.push_str(&display);
        self.values.push(bound);
        self.last = end;
        Ok(Some(end))
    }

    fn finish(mut self) -> FormattedStatement {
        let tail = &self.template[self.last..];
        self.sql.push_str(tail);
        self.diagnostic.push_str(tail);
        FormattedStatement {
            sql: self.sql,
            diagnostic: self.diagnostic,
            values: self.values,
        }
    }
}

/// Validate one argument for `kind`, returning the bound value and its diagnostic rendering.
fn resolve(kind: &PlaceholderKind, value: &RowValues) -> Option<(BoundValue, String)> {
    let data_kind = kind.clone();
    match value {
        RowValues::Null => Some((
            BoundValue {
                kind: data_kind,
                data: BoundData::Null,
            },
            "NULL".to_string(),
        )),
        RowValues::Blob(bytes) if accepts_bytes(kind) => Some(blob(data_kind, bytes.clone())),
        RowValues::Text(text) if *kind == PlaceholderKind::Blob => {
            Some(blob(data_kind, text.clone().into_bytes()))
        }
        other => {
            let validated = validate(kind, &other.to_plain_string())?;
            let display = quote_literal(&validated);
            let bound = if *kind == PlaceholderKind::Contains {
                format!("%{validated}%")
            } else {
                validated
            };
            Some((BoundValue::text(data_kind, bound), display))
        }
    }
}

fn accepts_bytes(kind: &PlaceholderKind) -> bool {
    matches!(
        kind,
        PlaceholderKind::Blob | PlaceholderKind::String | PlaceholderKind::Other(_)
    )
}

fn blob(kind: PlaceholderKind, bytes: Vec<u8>) -> (BoundValue, String) {
    let display = format!("'<blob {} bytes>'", bytes.len());
    (
        BoundValue {
            kind,
            data: BoundData::Bytes(bytes),
        },
        display,
    )
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

static BOOLEAN_COLUMN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(bool|boolean|tinyint\(1\))$").unwrap());
static INTEGER_COLUMN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(tiny|small|medium|big)?int(eger)?(\(\d+\))?( unsigned)?$|^(small|big)?serial$|^int[248]$")
        .unwrap()
});
static DECIMAL_COLUMN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(decimal|numeric|real|float|double|double precision|float[48])(\(.*\))?( unsigned)?$")
        .unwrap()
});
static BLOB_COLUMN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^((tiny|medium|long)?blob|bytea|binary.*|varbinary.*)$").unwrap());

/// Typed placeholder kind used by the CRUD helpers for a column with declared type `column_type`.
#[must_use]
pub fn placeholder_for_column_type(column_type: &str) -> PlaceholderKind {
    let normalized = column_type.trim().to_ascii_lowercase();
    if BOOLEAN_COLUMN_RE.is_match(&normalized) {
        PlaceholderKind::Boolean
    } else if INTEGER_COLUMN_RE.is_match(&normalized) {
        PlaceholderKind::Integer
    } else if DECIMAL_COLUMN_RE.is_match(&normalized) {
        PlaceholderKind::Decimal
    } else if BLOB_COLUMN_RE.is_match(&normalized) {
        PlaceholderKind::Blob
    } else {
        PlaceholderKind::String
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::FieldMap;

    fn args(values: Vec<RowValues>) -> Args {
        Args::Positional(values)
    }

    #[test]
    fn typed_round_trip() {
        let out = format_statement(
            DatabaseType::MySql,
            "SELECT * FROM users WHERE status = %s AND group_id = %i",
            &args(vec!["active".into(), RowValues::Int(2)]),
        )
        .unwrap();
        assert_eq!(out.sql, "SELECT * FROM users WHERE status = ? AND group_id = ?");
        assert_eq!(
            out.diagnostic,
            "SELECT * FROM users WHERE status = 'active' AND group_id = '2'"
        );
        let bound: Vec<_> = out.values.iter().filter_map(BoundValue::as_text).collect();
        assert_eq!(bound, vec!["active", "2"]);
    }

    #[test]
    fn postgres_markers_are_numbered() {
        let out = format_statement(
            DatabaseType::Postgres,
            "UPDATE t SET a = %s, b = %b WHERE id = %i",
            &args(vec!["x".into(), RowValues::Bool(true), RowValues::Int(9)]),
        )
        .unwrap();
        assert_eq!(out.sql, "UPDATE t SET a = $1, b = $2 WHERE id = $3");
        assert_eq!(out.values[1].as_text(), Some("1"));
    }

    #[test]
    fn swapping_values_keeps_sql_shape() {
        let template = "SELECT * FROM t WHERE a = %s AND b = %s AND c = %s";
        let first = format_statement(
            DatabaseType::Sqlite,
            template,
            &args(vec!["1".into(), "2".into(), "3".into()]),
        )
        .unwrap();
        let second = format_statement(
            DatabaseType::Sqlite,
            template,
            &args(vec!["3".into(), "2".into(), "1".into()]),
        )
        .unwrap();
        assert_eq!(first.sql, second.sql);
        assert_ne!(first.values, second.values);
        assert_eq!(first.values[0], second.values[2]);
    }

    #[test]
    fn named_and_sequential_selectors() {
        let mut map = FieldMap::new();
        map.insert("status".into(), "active".into());
        let named = format_statement(
            DatabaseType::Sqlite,
            "SELECT name FROM users WHERE status = {status}",
            &Args::Named(map),
        )
        .unwrap();
        let typed = format_statement(
            DatabaseType::Sqlite,
            "SELECT name FROM users WHERE status = %s",
            &args(vec!["active".into()]),
        )
        .unwrap();
        assert_eq!(named, typed);

        let sequential = format_statement(
            DatabaseType::Sqlite,
            "SELECT {2}, {1}",
            &args(vec!["a".into(), "b".into()]),
        )
        .unwrap();
        assert_eq!(sequential.diagnostic, "SELECT 'b', 'a'");
    }

    #[test]
    fn invalid_values_abort_the_call() {
        let err = format_statement(
            DatabaseType::Sqlite,
            "SELECT * FROM t WHERE a = %s AND b = %i",
            &args(vec!["ok".into(), "abc".into()]),
        )
        .unwrap_err();
        match err {
            SqlConduitError::InvalidArgument { kind, value, .. } => {
                assert_eq!(kind, PlaceholderKind::Integer);
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn missing_arguments_are_reported() {
        let err = format_statement(DatabaseType::Sqlite, "SELECT %s, %s", &args(vec!["a".into()]))
            .unwrap_err();
        assert!(matches!(err, SqlConduitError::MissingArgument { ref token, .. } if token == "%s"));

        let err = format_statement(DatabaseType::Sqlite, "SELECT {name}", &args(vec!["a".into()]))
            .unwrap_err();
        assert!(matches!(err, SqlConduitError::MissingArgument { .. }));
    }

    #[test]
    fn contains_wraps_only_bound_value() {
        let out = format_statement(
            DatabaseType::Sqlite,
            "SELECT * FROM t WHERE name LIKE %ls",
            &args(vec!["smi".into()]),
        )
        .unwrap();
        assert_eq!(out.values[0].as_text(), Some("%smi%"));
        assert_eq!(out.diagnostic, "SELECT * FROM t WHERE name LIKE 'smi'");
    }

    #[test]
    fn quoted_tokens_and_nulls() {
        let out = format_statement(
            DatabaseType::Sqlite,
            "SELECT '%s', \"{x}\" FROM t WHERE a = %s -- %i\n AND b = %blob",
            &args(vec![RowValues::Null, RowValues::Blob(vec![0, 1, 2])]),
        )
        .unwrap();
        assert_eq!(
            out.sql,
            "SELECT '%s', \"{x}\" FROM t WHERE a = ? -- %i\n AND b = ?"
        );
        assert_eq!(
            out.diagnostic,
            "SELECT '%s', \"{x}\" FROM t WHERE a = NULL -- %i\n AND b = '<blob 3 bytes>'"
        );
        assert!(out.values[0].is_null());
        assert_eq!(out.values[1].data, BoundData::Bytes(vec![0, 1, 2]));
    }

    #[test]
    fn diagnostic_escapes_quotes() {
        let out =
            format_statement(DatabaseType::MySql, "SELECT %s", &args(vec!["O'Brien".into()]))
                .unwrap();
        assert_eq!(out.diagnostic, "SELECT 'O''Brien'");
        assert_eq!(out.values[0].as_text(), Some("O'Brien"));
    }

    #[test]
    fn column_type_placeholders() {
        assert_eq!(placeholder_for_column_type("tinyint(1)"), PlaceholderKind::Boolean);
        assert_eq!(placeholder_for_column_type("BOOLEAN"), PlaceholderKind::Boolean);
        assert_eq!(placeholder_for_column_type("int(11)"), PlaceholderKind::Integer);
        assert_eq!(placeholder_for_column_type("INTEGER"), PlaceholderKind::Integer);
        assert_eq!(placeholder_for_column_type("bigint"), PlaceholderKind::Integer);
        assert_eq!(placeholder_for_column_type("decimal(12,2)"), PlaceholderKind::Decimal);
        assert_eq!(placeholder_for_column_type("double precision"), PlaceholderKind::Decimal);
        assert_eq!(placeholder_for_column_type("bytea"), PlaceholderKind::Blob);
        assert_eq!(placeholder_for_column_type("varchar(255)"), PlaceholderKind::String);
        assert_eq!(placeholder_for_column_type("point"), PlaceholderKind::String);
        assert_eq!(placeholder_for_column_type("interval"), PlaceholderKind::String);
    }
}
