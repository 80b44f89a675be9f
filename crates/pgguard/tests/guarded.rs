//! Guarded reads and writes against a live database.

mod common;

use common::{TableForTest, seed, try_db, try_db_with, unique_uid};
use pgguard::{
    Assignments, Executor, Fatal, Filter, GuardConfig, GuardError, Page, Record,
    disable_seq_scan_check,
};

#[derive(Debug, Default, Record)]
struct NarrowTableForTest {
    #[orm(column = "id")]
    id: uuid::Uuid,
    #[orm(column = "uid")]
    uid: String,
}

#[tokio::test]
async fn insert_then_find_round_trips() {
    let Some(db) = try_db().await else { return };
    let uid = unique_uid("find");

    let record = TableForTest {
        uid: uid.clone(),
        name: Some("alice".into()),
        is_active: true,
        ..Default::default()
    };
    assert_eq!(db.insert(&record).await.unwrap(), 1);

    let found: Vec<TableForTest> = db
        .find(&Filter::new().eq("uid", uid.clone()), &Page::new())
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].uid, uid);
    assert_eq!(found[0].name.as_deref(), Some("alice"));
    assert!(found[0].is_active);
    assert!(!found[0].id.is_nil());

    let first: Option<TableForTest> = db
        .first(&Filter::new().eq("uid", uid), &Page::new())
        .await
        .unwrap();
    assert!(first.is_some());
}

#[tokio::test]
async fn zero_rows_is_an_empty_vec() {
    let Some(db) = try_db().await else { return };
    let uid = unique_uid("none");

    let rows: Vec<TableForTest> = db
        .query("SELECT * FROM table_for_tests WHERE uid = $1", &[&uid])
        .await
        .unwrap();
    assert!(rows.is_empty());

    let first: Option<TableForTest> = db
        .query_first("SELECT * FROM table_for_tests WHERE uid = $1", &[&uid])
        .await
        .unwrap();
    assert!(first.is_none());
}

#[tokio::test]
async fn null_column_leaves_option_empty() {
    let Some(db) = try_db().await else { return };
    let uid = unique_uid("null");
    db.exec(
        "INSERT INTO table_for_tests (uid) VALUES ($1)",
        &[&uid],
    )
    .await
    .unwrap();

    let rows: Vec<TableForTest> = db
        .query("SELECT * FROM table_for_tests WHERE uid = $1", &[&uid])
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].name.is_none());
}

#[tokio::test]
async fn unknown_result_column_is_fatal_even_without_rows() {
    let Some(db) = try_db().await else { return };
    let uid = unique_uid("narrow");

    let err = db
        .query::<NarrowTableForTest>("SELECT * FROM table_for_tests WHERE uid = $1", &[&uid])
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_fatal(),
        Some(Fatal::UnknownColumn { record: "NarrowTableForTest", .. })
    ));

    let ok: Vec<NarrowTableForTest> = db
        .query("SELECT id, uid FROM table_for_tests WHERE uid = $1", &[&uid])
        .await
        .unwrap();
    assert!(ok.is_empty());
}

#[tokio::test]
async fn statement_guards_reject_before_execution() {
    let Some(db) = try_db().await else { return };

    let err = db
        .query::<TableForTest>("SELECT * FROM table_for_tests", &[])
        .await
        .unwrap_err();
    assert!(matches!(err.as_fatal(), Some(Fatal::SelectWithoutWhere { .. })));

    let err = db
        .query::<TableForTest>("SELECT * FROM table_for_tests WHERE uid = $1", &[])
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_fatal(),
        Some(Fatal::PlaceholderMismatch { placeholders: 1, args: 0 })
    ));

    let err = db
        .query::<TableForTest>(
            "SELECT * FROM table_for_tests WHERE uid = $1 FOR UPDATE",
            &[&"x"],
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_fatal(),
        Some(Fatal::LockingReadWithoutNowait { .. })
    ));

    let err = db.exec("DELETE FROM table_for_tests", &[]).await.unwrap_err();
    assert!(matches!(err.as_fatal(), Some(Fatal::DeleteWithoutWhere { .. })));

    let err = db
        .exec("UPDATE table_for_tests SET name = $1 WHERE uid = $2", &[&"n", &"x"])
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_fatal(),
        Some(Fatal::UpdateWithoutUpdatedAt { .. })
    ));
}

#[tokio::test]
async fn driver_failure_carries_statement() {
    let Some(db) = try_db().await else { return };
    let sql = "SELECT * FROM no_such_table_for_tests WHERE uid = $1";
    let err = db.query::<TableForTest>(sql, &[&"x"]).await.unwrap_err();
    match err {
        GuardError::Fatal(Fatal::Query { sql: failed, .. }) => assert_eq!(failed, sql),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn sequential_scan_is_fatal_in_debug() {
    let Some(db) = try_db().await else { return };
    let sql = "SELECT * FROM table_for_tests WHERE name = $1";

    let err = db.query::<TableForTest>(sql, &[&"nobody"]).await.unwrap_err();
    match err {
        GuardError::Fatal(Fatal::SeqScan { sql: failed }) => assert_eq!(failed, sql),
        other => panic!("unexpected error: {other:?}"),
    }

    // Opting out of the audit for this one statement.
    let exempt = format!(
        "SELECT * FROM table_for_tests WHERE {} AND name = $1",
        disable_seq_scan_check()
    );
    let rows: Vec<TableForTest> = db.query(&exempt, &[&"nobody"]).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn auditor_reports_plans_directly() {
    let Some(db) = try_db().await else { return };
    let auditor = db.auditor();

    assert!(
        auditor
            .audit("SELECT * FROM table_for_tests WHERE uid = $1", &[&"x"])
            .await
            .unwrap()
    );
    assert!(
        !auditor
            .audit("SELECT * FROM table_for_tests WHERE name = $1", &[&"x"])
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn production_skips_the_audit() {
    let Some(db) = try_db_with(GuardConfig::new().production()).await else {
        return;
    };
    let rows: Vec<TableForTest> = db
        .query("SELECT * FROM table_for_tests WHERE name = $1", &[&"nobody"])
        .await
        .unwrap();
    assert!(rows.is_empty());

    let err = db
        .auditor()
        .audit("SELECT * FROM table_for_tests WHERE uid = $1", &[&"x"])
        .await
        .unwrap_err();
    assert!(matches!(err.as_fatal(), Some(Fatal::DebugOnly { .. })));

    let err = db.truncate(&["table_for_tests"]).await.unwrap_err();
    assert!(matches!(err.as_fatal(), Some(Fatal::DebugOnly { .. })));
}

#[tokio::test]
async fn unique_violation_is_recoverable() {
    let Some(db) = try_db().await else { return };
    let uid = unique_uid("uniq");
    seed(&db, &uid, "aaaaaa").await;

    let err = db
        .exec(
            "INSERT INTO table_for_tests (name, uid) VALUES ($1, $2)",
            &[&"aaaaaa", &uid],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GuardError::UniqueViolation));
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn update_sets_updated_at_and_now_values_together() {
    let Some(db) = try_db().await else { return };
    let uid = unique_uid("update");
    seed(&db, &uid, "before").await;

    let affected = db
        .update::<TableForTest>(
            &Assignments::new()
                .set("name", "after")
                .set_now("created_at")
                .set("is_active", false),
            &Filter::new().eq("uid", uid.clone()),
        )
        .await
        .unwrap();
    assert_eq!(affected, 1);

    let row: TableForTest = db
        .first(&Filter::new().eq("uid", uid), &Page::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.name.as_deref(), Some("after"));
    assert!(!row.is_active);
    // created_at is builder-owned, so the NOW assignment above was dropped.
    assert!(row.created_at <= row.updated_at);
}

#[tokio::test]
async fn bulk_insert_and_delete() {
    let Some(db) = try_db().await else { return };
    let prefix = unique_uid("bulk");
    let records: Vec<TableForTest> = (0..3)
        .map(|i| TableForTest {
            uid: format!("{prefix}-{i}"),
            name: Some(format!("n{i}")),
            ..Default::default()
        })
        .collect();

    assert_eq!(db.bulk_insert(&records).await.unwrap(), 3);
    assert_eq!(db.bulk_insert::<TableForTest>(&[]).await.unwrap(), 0);

    let mut deleted = 0;
    for record in &records {
        deleted += db
            .delete::<TableForTest>(&Filter::new().eq("uid", record.uid.clone()))
            .await
            .unwrap();
    }
    assert_eq!(deleted, 3);
}

#[tokio::test]
async fn stats_report_the_pool() {
    let Some(db) = try_db().await else { return };
    let status = db.stats();
    assert!(status.max_size >= 1);
}
