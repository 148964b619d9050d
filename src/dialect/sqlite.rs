use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::{
    AlterAction, ConvertedSql, Dialect, TableStatement, enum_columns, parse_column_change,
    replace_each, replace_enum_types, rewrite_code, strip_column_position, strip_table_options,
    table_statement,
};
use crate::types::DatabaseType;

/// Canonical SQL → `SQLite`.
///
/// `SQLite` has no auto-increment `id` column of its own, so auto-increment keys become rowid
/// aliases and `id` references in simple statements are pointed at `rowid`. `LIMIT offset,count`
/// is native and left alone. Inline `ENUM` columns become `TEXT` with a `CHECK` constraint.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

static AUTO_INCREMENT_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:big)?int(?:eger)?(?:\(\d+\))?(?:\s+unsigned)?((?:\s+(?:not\s+null|primary\s+key|auto_increment))+)",
    )
    .unwrap()
});
static SELECT_STAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\s*SELECT\s+)\*(\s+FROM\s+[\w.]+)(\s|;|$)").unwrap()
});
static JOIN_OR_LIST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bjoin\b|^\s*SELECT\s+\*\s+FROM\s+[\w.]+\s*,").unwrap()
});
static SELECT_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\s*SELECT\s+)id(\s*,)").unwrap());
static ID_EQUALS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\s)id(\s*=)").unwrap());
static RAND_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\brand\(\)").unwrap());

impl Dialect for SqliteDialect {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Sqlite
    }

    fn convert(&self, sql: &str) -> ConvertedSql {
        let table = table_statement(sql);
        let is_ddl = table.is_some();
        let mut statement = rewrite_code(sql, |segment| rewrite_phrases(segment, is_ddl));

        if !is_ddl && !JOIN_OR_LIST_RE.is_match(&statement) {
            statement = SELECT_STAR_RE
                .replace(&statement, "${1}rowid,*${2}${3}")
                .into_owned();
        }

        match table {
            Some(TableStatement::Create { .. }) => {
                statement = strip_table_options(&statement);
                statement = enums_to_checks(&statement);
            }
            Some(TableStatement::Alter {
                action: AlterAction::Add,
                ..
            }) => {
                statement = strip_column_position(&statement);
                statement = enums_to_checks(&statement);
            }
            Some(TableStatement::Alter {
                table,
                action: AlterAction::Change,
                rest,
            }) => {
                // only renames are expressible; retyping passes through for the backend to reject
                if let Some(change) = parse_column_change(&rest) {
                    if change.old_name != change.new_name {
                        statement = format!(
                            "ALTER TABLE {table} RENAME COLUMN {} TO {}",
                            change.old_name, change.new_name
                        );
                    }
                }
            }
            Some(TableStatement::Alter { .. }) | None => {}
        }

        ConvertedSql {
            statement,
            preamble: Vec::new(),
        }
    }
}

fn rewrite_phrases(segment: &str, is_ddl: bool) -> String {
    let out = AUTO_INCREMENT_KEY_RE.replace_all(segment, |caps: &Captures<'_>| {
        let constraints = caps[1].to_ascii_lowercase();
        if !constraints.contains("auto_increment") {
            caps[0].to_string()
        } else if constraints.contains("primary") {
            "INTEGER PRIMARY KEY AUTOINCREMENT".to_string()
        } else if constraints.contains("not") {
            "INTEGER NOT NULL".to_string()
        } else {
            "INTEGER".to_string()
        }
    });

    if is_ddl {
        return replace_each(&out, &[(&RAND_RE, "RANDOM()")]);
    }
    replace_each(
        &out,
        &[
            (&RAND_RE, "RANDOM()"),
            (&SELECT_ID_RE, "${1}rowid${2}"),
            (&ID_EQUALS_RE, "${1}rowid${2}"),
        ],
    )
}

fn enums_to_checks(sql: &str) -> String {
    let columns = enum_columns(sql);
    if columns.is_empty() {
        return sql.to_string();
    }
    replace_enum_types(sql, &columns, |column| {
        format!(
            "TEXT CHECK ({} IN ({}))",
            column.column, column.values
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(sql: &str) -> String {
        let out = SqliteDialect.convert(sql);
        assert!(out.preamble.is_empty());
        out.statement
    }

    #[test]
    fn auto_increment_key_becomes_rowid_alias() {
        assert_eq!(
            convert("CREATE TABLE users (id INT NOT NULL PRIMARY KEY AUTO_INCREMENT, name VARCHAR(100)) ENGINE=InnoDB"),
            "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name VARCHAR(100))"
        );
    }

    #[test]
    fn select_star_gains_rowid() {
        assert_eq!(
            convert("SELECT * FROM users WHERE status = %s AND group_id = %i"),
            "SELECT rowid,* FROM users WHERE status = %s AND group_id = %i"
        );
        assert_eq!(convert("SELECT * FROM users"), "SELECT rowid,* FROM users");
        assert_eq!(
            convert("SELECT * FROM a JOIN b ON a.id = b.a_id"),
            "SELECT * FROM a JOIN b ON a.id = b.a_id"
        );
        assert_eq!(convert("SELECT * FROM a, b"), "SELECT * FROM a, b");
        assert_eq!(
            convert("SELECT * FROM (SELECT 1) x"),
            "SELECT * FROM (SELECT 1) x"
        );
    }

    #[test]
    fn id_references_point_at_rowid() {
        assert_eq!(
            convert("SELECT id, name FROM users WHERE id = %i"),
            "SELECT rowid, name FROM users WHERE rowid = %i"
        );
        assert_eq!(
            convert("UPDATE users SET name = %s WHERE group_id = %i"),
            "UPDATE users SET name = %s WHERE group_id = %i"
        );
        assert_eq!(
            convert("DELETE FROM users WHERE note = ' id = 1'"),
            "DELETE FROM users WHERE note = ' id = 1'"
        );
    }

    #[test]
    fn limit_passes_through() {
        assert_eq!(
            convert("SELECT name FROM t ORDER BY rand() LIMIT 5,10"),
            "SELECT name FROM t ORDER BY RANDOM() LIMIT 5,10"
        );
    }

    #[test]
    fn enums_become_check_constraints() {
        assert_eq!(
            convert("CREATE TABLE users (status ENUM('active','inactive') NOT NULL DEFAULT 'active', name TEXT)"),
            "CREATE TABLE users (status TEXT CHECK (status IN ('active','inactive')) NOT NULL DEFAULT 'active', name TEXT)"
        );
    }

    #[test]
    fn change_column_renames() {
        assert_eq!(
            convert("ALTER TABLE users CHANGE name full_name VARCHAR(150) NOT NULL"),
            "ALTER TABLE users RENAME COLUMN name TO full_name"
        );
        assert_eq!(
            convert("ALTER TABLE users ADD nickname TEXT AFTER name"),
            "ALTER TABLE users ADD nickname TEXT"
        );
    }

    #[test]
    fn conversion_is_idempotent() {
        for sql in [
            "SELECT * FROM users WHERE id = %i",
            "CREATE TABLE t (id INT NOT NULL PRIMARY KEY AUTO_INCREMENT, s ENUM('a','b'))",
        ] {
            let once = convert(sql);
            assert_eq!(convert(&once), once);
        }
    }
}
