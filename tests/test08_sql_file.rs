#![cfg(feature = "sqlite")]

use std::io::Write;

use sql_conduit::prelude::*;
use tempfile::NamedTempFile;

#[test]
fn sql_file_runs_every_statement() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = NamedTempFile::new()?;
    writeln!(
        file,
        "-- schema\n\
         CREATE TABLE notes (id INT NOT NULL PRIMARY KEY AUTO_INCREMENT, body TEXT);\n\
         INSERT INTO notes (body) VALUES ('first; with a semicolon');\n\
         INSERT INTO notes (body) VALUES ('it''s second');\n\
         /* trailing comment; ignored */"
    )?;

    let mut db = Engine::sqlite(":memory:");
    assert_eq!(db.execute_sql_file(file.path())?, 3);
    let bodies = db.get_column("SELECT body FROM notes ORDER BY id", ())?;
    assert_eq!(
        bodies,
        vec![
            RowValues::from("first; with a semicolon"),
            RowValues::from("it's second")
        ]
    );
    Ok(())
}

#[test]
fn missing_file_is_reported() {
    let mut db = Engine::sqlite(":memory:");
    let err = db.execute_sql_file("/nonexistent/schema.sql").unwrap_err();
    assert!(matches!(err, SqlConduitError::SqlFileError { ref path, .. } if path == "/nonexistent/schema.sql"));
}

#[test]
fn execution_stops_at_the_first_failure() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = Engine::sqlite(":memory:");
    let err = db
        .execute_statements([
            "CREATE TABLE t (a TEXT)",
            "INSERT INTO missing VALUES (1)",
            "INSERT INTO t VALUES ('never')",
        ])
        .unwrap_err();
    assert!(err.statement().is_some_and(|sql| sql.contains("missing")));
    assert_eq!(db.get_field("SELECT COUNT(*) FROM t", ())?, Some(RowValues::Int(0)));
    Ok(())
}

#[test]
fn commented_schema_is_converted_and_refreshes_lookups() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = NamedTempFile::new()?;
    writeln!(
        file,
        "-- tickets schema\n\
         /* v1 */\n\
         CREATE TABLE tickets (\n\
           id INT NOT NULL PRIMARY KEY AUTO_INCREMENT,\n\
           status ENUM('open', 'closed') NOT NULL,\n\
           body TEXT\n\
         ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;"
    )?;

    let mut db = Engine::sqlite(":memory:");
    // populate the table cache before the schema changes
    assert!(!db.check_table("tickets")?);
    assert_eq!(db.execute_sql_file(file.path())?, 1);

    let row = FieldMap::from([
        ("id".to_string(), RowValues::Int(0)),
        ("status".to_string(), RowValues::from("open")),
        ("body".to_string(), RowValues::from("printer on fire")),
    ]);
    assert_eq!(db.insert("tickets", &[row])?, 1);

    let bad = FieldMap::from([("status".to_string(), RowValues::from("lost"))]);
    assert!(matches!(
        db.insert("tickets", &[bad]),
        Err(SqlConduitError::QueryError { .. })
    ));

    assert_eq!(
        db.get_column("SELECT status FROM tickets", ())?,
        vec![RowValues::from("open")]
    );
    Ok(())
}
