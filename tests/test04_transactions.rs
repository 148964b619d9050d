mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use common::{Journal, scripted_router};
use sql_conduit::prelude::*;

fn served_by(db: &mut Engine, sql: &str) -> Result<String, SqlConduitError> {
    let row = db.get_row(sql, ())?.expect("scripted select returns a row");
    Ok(row.get("served_by").expect("served_by column").to_plain_string())
}

#[test]
fn nested_transactions_touch_the_backend_once() -> Result<(), Box<dyn std::error::Error>> {
    let journal = Arc::new(Journal::default());
    let mut db = Engine::new(scripted_router(&journal, &["replica1"]));

    db.begin_transaction(false)?;
    db.begin_transaction(false)?;
    db.begin_transaction(false)?;
    assert_eq!(db.transaction_depth(), 3);
    db.commit()?;
    db.commit()?;
    assert_eq!(journal.count("commit"), 0);
    db.commit()?;

    assert_eq!(db.transaction_depth(), 0);
    assert_eq!(journal.count("begin primary"), 1);
    assert_eq!(journal.count("commit primary"), 1);
    Ok(())
}

#[test]
fn inner_rollback_does_not_roll_back_physically() -> Result<(), Box<dyn std::error::Error>> {
    let journal = Arc::new(Journal::default());
    let mut db = Engine::new(scripted_router(&journal, &[]));

    db.begin_transaction(false)?;
    db.begin_transaction(false)?;
    db.rollback()?;
    assert_eq!(journal.count("rollback"), 0);
    assert_eq!(db.transaction_depth(), 1);
    db.commit()?;
    assert_eq!(journal.count("commit primary"), 1);
    assert_eq!(journal.count("rollback"), 0);
    Ok(())
}

#[test]
fn unmatched_commit_and_rollback_are_noops() -> Result<(), Box<dyn std::error::Error>> {
    let journal = Arc::new(Journal::default());
    let mut db = Engine::new(scripted_router(&journal, &[]));

    db.commit()?;
    db.rollback()?;
    assert_eq!(db.transaction_depth(), 0);
    assert!(journal.events().is_empty(), "nothing should connect: {:?}", journal.events());
    Ok(())
}

#[test]
fn failed_physical_operations_leave_depth_unchanged() -> Result<(), Box<dyn std::error::Error>> {
    let journal = Arc::new(Journal::default());
    let mut db = Engine::new(scripted_router(&journal, &[]));

    journal.fail_next_begin.store(true, Ordering::SeqCst);
    let err = db.begin_transaction(false).unwrap_err();
    assert!(matches!(err, SqlConduitError::BeginTransactionError(_)));
    assert_eq!(db.transaction_depth(), 0);

    db.begin_transaction(false)?;
    journal.fail_next_commit.store(true, Ordering::SeqCst);
    let err = db.commit().unwrap_err();
    assert!(matches!(err, SqlConduitError::CommitError(ref msg) if msg == "deadlock detected"));
    assert_eq!(db.transaction_depth(), 1);

    db.rollback()?;
    assert_eq!(db.transaction_depth(), 0);
    assert_eq!(journal.count("rollback primary"), 1);
    Ok(())
}

#[test]
fn force_write_transaction_pins_reads_to_write() -> Result<(), Box<dyn std::error::Error>> {
    let journal = Arc::new(Journal::default());
    let mut db = Engine::new(scripted_router(&journal, &["replica1"]));

    db.begin_transaction(true)?;
    db.begin_transaction(false)?;
    assert_eq!(served_by(&mut db, "SELECT 1")?, "primary");
    db.commit()?;
    assert_eq!(served_by(&mut db, "SELECT 1")?, "primary");
    db.commit()?;
    assert_eq!(served_by(&mut db, "SELECT 1")?, "replica1");
    Ok(())
}

#[test]
fn plain_transaction_keeps_reads_on_the_read_connection() -> Result<(), Box<dyn std::error::Error>> {
    let journal = Arc::new(Journal::default());
    let mut db = Engine::new(scripted_router(&journal, &["replica1"]));

    db.begin_transaction(false)?;
    assert_eq!(served_by(&mut db, "SELECT 1")?, "replica1");
    db.execute("UPDATE users SET status = %s", [RowValues::from("x")])?;
    db.commit()?;
    assert!(journal.events().contains(&"execute primary: UPDATE users SET status = ? [1]".to_string()));
    Ok(())
}

#[test]
fn force_write_next_and_always() -> Result<(), Box<dyn std::error::Error>> {
    let journal = Arc::new(Journal::default());
    let mut db = Engine::new(scripted_router(&journal, &["replica1"]));

    db.force_write(false);
    assert_eq!(served_by(&mut db, "SELECT 1")?, "primary");
    assert_eq!(served_by(&mut db, "SELECT 1")?, "replica1");

    db.force_write(true);
    for _ in 0..3 {
        assert_eq!(served_by(&mut db, "SELECT 1")?, "primary");
    }
    // a one-shot request turns "always" off after its use
    db.force_write(false);
    assert_eq!(served_by(&mut db, "SELECT 1")?, "primary");
    assert_eq!(served_by(&mut db, "SELECT 1")?, "replica1");
    Ok(())
}

#[test]
fn insert_id_comes_from_the_write_connection() -> Result<(), Box<dyn std::error::Error>> {
    let journal = Arc::new(Journal::default());
    let mut db = Engine::new(scripted_router(&journal, &["replica1"]));
    assert_eq!(db.insert_id()?, Some(42));
    assert_eq!(journal.events(), vec!["connect primary".to_string()]);
    Ok(())
}

#[test]
fn close_all_resets_the_session() -> Result<(), Box<dyn std::error::Error>> {
    let journal = Arc::new(Journal::default());
    let mut db = Engine::new(scripted_router(&journal, &["replica1"]));
    db.begin_transaction(false)?;
    served_by(&mut db, "SELECT 1")?;

    db.close_all();
    assert_eq!(db.transaction_depth(), 0);
    assert_eq!(db.cached_statements(), 0);
    assert_eq!(journal.count("close"), 2);

    served_by(&mut db, "SELECT 1")?;
    assert_eq!(journal.count("connect replica1"), 2);
    Ok(())
}
