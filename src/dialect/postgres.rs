use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::{
    AlterAction, ConvertedSql, Dialect, TableStatement, enum_columns, parse_column_change,
    replace_each, replace_enum_types, rewrite_code, strip_column_position, strip_table_options,
    table_statement,
};
use crate::types::DatabaseType;

/// Canonical SQL → `PostgreSQL`.
///
/// Auto-increment keys become `SERIAL`, MySQL-only type names are mapped, `LIMIT offset,count`
/// becomes `OFFSET offset LIMIT count` (token order preserved), and inline `ENUM` columns turn
/// into named enum types created ahead of the statement.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

static AUTO_INCREMENT_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(big)?int(?:eger)?(?:\(\d+\))?(?:\s+unsigned)?((?:\s+(?:not\s+null|primary\s+key|auto_increment))+)",
    )
    .unwrap()
});
static TINYINT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\btinyint(\(\d+\))?").unwrap());
static MEDIUMINT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bmediumint(\(\d+\))?").unwrap());
static INT_WIDTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(big|small)?int\(\d+\)").unwrap());
static UNSIGNED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+unsigned\b").unwrap());
static DATETIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bdatetime\b").unwrap());
static LONGTEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(long|medium|tiny)text\b").unwrap());
static BLOB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(long|medium|tiny)?blob\b").unwrap());
static DOUBLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bdouble(\s*\(\d+\s*,\s*\d+\))?(\s+precision)?").unwrap());
static RAND_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\brand\(\)").unwrap());
static LIMIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+LIMIT\s+([^\s,]+)\s*,\s*([^\s,;)]+)").unwrap()
});

impl Dialect for PostgresDialect {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Postgres
    }

    fn convert(&self, sql: &str) -> ConvertedSql {
        let mut converted = ConvertedSql {
            statement: rewrite_code(sql, rewrite_phrases),
            preamble: Vec::new(),
        };

        match table_statement(&converted.statement) {
            Some(TableStatement::Create { table }) => {
                converted.statement = strip_table_options(&converted.statement);
                expand_enums(&table, &mut converted);
            }
            Some(TableStatement::Alter {
                table,
                action: AlterAction::Add,
                ..
            }) => {
                converted.statement = strip_column_position(&converted.statement);
                expand_enums(&table, &mut converted);
            }
            Some(TableStatement::Alter {
                table,
                action: AlterAction::Change,
                rest,
            }) => {
                if let Some(change) = parse_column_change(&rest) {
                    if change.old_name != change.new_name {
                        converted.preamble.push(format!(
                            "ALTER TABLE {table} RENAME COLUMN {} TO {}",
                            change.old_name, change.new_name
                        ));
                    }
                    let column = change.new_name;
                    if change.not_null {
                        converted
                            .preamble
                            .push(format!("ALTER TABLE {table} ALTER COLUMN {column} SET NOT NULL"));
                    }
                    if let Some(default) = change.default {
                        converted.preamble.push(format!(
                            "ALTER TABLE {table} ALTER COLUMN {column} SET DEFAULT {default}"
                        ));
                    }
                    converted.statement = format!(
                        "ALTER TABLE {table} ALTER COLUMN {column} TYPE {}",
                        change.column_type
                    );
                    expand_enums(&table, &mut converted);
                }
            }
            Some(TableStatement::Alter { .. }) | None => {}
        }

        converted
    }
}

fn rewrite_phrases(segment: &str) -> String {
    let out = AUTO_INCREMENT_KEY_RE.replace_all(segment, |caps: &Captures<'_>| {
        let constraints = caps[2].to_ascii_lowercase();
        if !constraints.contains("auto_increment") {
            return caps[0].to_string();
        }
        let serial = if caps.get(1).is_some() {
            "BIGSERIAL"
        } else {
            "SERIAL"
        };
        if constraints.contains("primary") {
            format!("{serial} PRIMARY KEY")
        } else if constraints.contains("not") {
            format!("{serial} NOT NULL")
        } else {
            serial.to_string()
        }
    });

    let out = replace_each(
        &out,
        &[
            (&TINYINT_RE, "SMALLINT"),
            (&MEDIUMINT_RE, "INTEGER"),
            (&UNSIGNED_RE, ""),
            (&DATETIME_RE, "TIMESTAMP"),
            (&LONGTEXT_RE, "TEXT"),
            (&BLOB_RE, "BYTEA"),
            (&DOUBLE_RE, "DOUBLE PRECISION"),
            (&RAND_RE, "RANDOM()"),
            (&LIMIT_RE, " OFFSET $1 LIMIT $2"),
        ],
    );

    INT_WIDTH_RE
        .replace_all(&out, |caps: &Captures<'_>| {
            match caps.get(1).map(|m| m.as_str().to_ascii_lowercase()) {
                Some(ref prefix) if prefix == "big" => "BIGINT",
                Some(_) => "SMALLINT",
                None => "INTEGER",
            }
        })
        .into_owned()
}

fn expand_enums(table: &str, converted: &mut ConvertedSql) {
    let columns = enum_columns(&converted.statement);
    if columns.is_empty() {
        return;
    }
    for column in &columns {
        let type_name = enum_type_name(table, &column.column);
        converted
            .preamble
            .push(format!("DROP TYPE IF EXISTS {type_name}"));
        converted.preamble.push(format!(
            "CREATE TYPE {type_name} AS ENUM ({})",
            column.values
        ));
    }
    converted.statement = replace_enum_types(&converted.statement, &columns, |column| {
        enum_type_name(table, &column.column)
    });
}

fn enum_type_name(table: &str, column: &str) -> String {
    let table = table.rsplit('.').next().unwrap_or(table);
    format!("enum_{table}_{column}")
}
