#![cfg(feature = "sqlite")]

use sql_conduit::prelude::*;

const CREATE_USERS: &str = "CREATE TABLE users (id INT NOT NULL PRIMARY KEY AUTO_INCREMENT, \
     status VARCHAR(20) NOT NULL, group_id INT, score DECIMAL(8,2))";

fn users_db() -> Result<Engine, SqlConduitError> {
    let mut db = Engine::sqlite(":memory:");
    db.query(CREATE_USERS, ())?;
    for (status, group_id) in [("active", 2), ("inactive", 2), ("active", 3)] {
        db.query(
            "INSERT INTO users (status, group_id) VALUES (%s, %i)",
            [RowValues::from(status), RowValues::Int(group_id)],
        )?;
    }
    Ok(db)
}

#[test]
fn query_returns_positionable_cursor() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = users_db()?;
    let mut rows = db.query(
        "SELECT * FROM users WHERE status = %s ORDER BY id",
        [RowValues::from("active")],
    )?;
    assert_eq!(rows.num_rows(), 2);

    let first = rows.fetch_assoc().expect("first row");
    assert_eq!(first["status"], "active");
    assert_eq!(first["group_id"], "2");
    let second = rows.fetch_row().expect("second row");
    assert_eq!(second.get("group_id"), Some(&RowValues::Int(3)));
    assert!(rows.fetch_row().is_none());

    assert!(rows.seek(0));
    assert_eq!(rows.fetch_assoc().expect("rewound")["group_id"], "2");
    Ok(())
}

#[test]
fn statements_without_columns_report_changes() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = users_db()?;
    let cursor = db.query(
        "UPDATE users SET status = %s WHERE group_id = %i",
        [RowValues::from("archived"), RowValues::Int(2)],
    )?;
    assert!(!cursor.has_columns());
    assert_eq!(cursor.num_rows(), 2);
    assert_eq!(db.execute("DELETE FROM users WHERE group_id = %i", [RowValues::Int(3)])?, 1);
    Ok(())
}

#[test]
fn invalid_argument_never_reaches_the_database() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = users_db()?;
    let cached = db.cached_statements();
    let err = db
        .query("SELECT * FROM users WHERE group_id = %i", [RowValues::from("abc")])
        .unwrap_err();
    assert!(matches!(err, SqlConduitError::InvalidArgument { .. }));
    assert_eq!(db.cached_statements(), cached);
    Ok(())
}

#[test]
fn prepared_statements_are_reused_per_shape() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = users_db()?;
    db.clear_statement_cache();
    for group_id in [2, 3, 4] {
        db.query("SELECT status FROM users WHERE group_id = %i", [RowValues::Int(group_id)])?;
    }
    assert_eq!(db.cached_statements(), 1);
    db.query("SELECT status FROM users WHERE status = %s", [RowValues::from("x")])?;
    assert_eq!(db.cached_statements(), 2);
    Ok(())
}

#[test]
fn errors_carry_diagnostic_sql() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = users_db()?;
    let err = db
        .query("SELECT * FROM missing_table WHERE status = %s", [RowValues::from("active")])
        .unwrap_err();
    match err {
        SqlConduitError::PrepareError { sql, .. } => {
            assert_eq!(sql, "SELECT rowid,* FROM missing_table WHERE status = 'active'");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}

#[test]
fn insert_id_and_transactions() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = users_db()?;
    assert_eq!(db.insert_id()?, Some(3));

    db.begin_transaction(false)?;
    db.begin_transaction(false)?;
    db.query(
        "INSERT INTO users (status, group_id) VALUES (%s, %i)",
        [RowValues::from("pending"), RowValues::Int(9)],
    )?;
    db.commit()?;
    assert_eq!(db.transaction_depth(), 1);
    db.rollback()?;
    assert_eq!(db.transaction_depth(), 0);

    let count = db.get_field("SELECT COUNT(*) FROM users WHERE group_id = %i", [RowValues::Int(9)])?;
    assert_eq!(count, Some(RowValues::Int(0)));

    // unmatched commit is a no-op
    db.commit()?;
    assert_eq!(db.transaction_depth(), 0);
    Ok(())
}

#[test]
fn schema_lookups() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = users_db()?;
    assert!(db.check_table("users")?);
    assert!(!db.check_table("nope")?);
    assert_eq!(db.column_names("users")?, vec!["id", "status", "group_id", "score"]);
    assert_eq!(db.primary_key("users")?.as_deref(), Some("id"));

    db.query("CREATE TABLE tags (name TEXT)", ())?;
    assert!(db.check_table("tags")?);
    assert_eq!(db.primary_key("tags")?, None);
    // AUTOINCREMENT keys create the internal sqlite_sequence table
    assert_eq!(db.table_names()?, vec!["tags", "users"]);
    Ok(())
}

#[test]
fn time_arithmetic() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = Engine::sqlite(":memory:");
    let from = "2024-01-31 08:00:00";
    assert_eq!(db.add_time(TimePeriod::Day, 1, from, false)?, "2024-02-01 08:00:00");
    assert_eq!(db.add_time(TimePeriod::Week, 2, from, false)?, "2024-02-14 08:00:00");
    assert_eq!(db.subtract_time(TimePeriod::Hour, 9, from, false)?, "2024-01-30 23:00:00");
    assert_eq!(db.add_time(TimePeriod::Second, 0, "1970-01-01 00:00:10", true)?, "10");
    Ok(())
}
