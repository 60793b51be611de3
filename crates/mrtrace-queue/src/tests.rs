//! Unit tests for the durable statement queue.

use mrtrace_db::{create_pool, run_migrations, DbRuntimeSettings};
use mrtrace_types::{ext, Actor, Extensions, SessionId, Statement, TraceContext};
use mrtrace_vocab::make_statement;
use rusqlite::Connection;

use crate::error::QueueError;
use crate::store::{
    append, dead_letter, dead_letter_count, peek_oldest, queued_count, record_failure, remove,
};

/// Creates an in-memory SQLite database with migrations applied.
fn test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("should open in-memory db");
    run_migrations(&conn).expect("migrations should succeed");
    conn
}

fn statement(verb: &str, activity: &str) -> Statement {
    let ctx = TraceContext::new(Actor::from_hash("20eabe5d64"), SessionId::from("5e55105e55"));
    make_statement(&ctx, verb, activity, None).expect("known keys")
}

// ── append / peek / remove ───────────────────────────────────────────

#[test]
fn empty_queue_peeks_nothing() {
    let conn = test_db();
    assert!(peek_oldest(&conn).expect("peek").is_none());
    assert_eq!(queued_count(&conn).expect("count"), 0);
}

#[test]
fn append_records_clear_text_metadata() {
    let conn = test_db();
    let s = statement("opened", "application");

    let entry = append(&conn, &s).expect("append");

    assert!(entry.id > 0);
    assert_eq!(entry.statement_id, s.id().to_string());
    assert_eq!(entry.verb_id, "http://activitystrea.ms/schema/1.0/open");
    assert_eq!(entry.activity_id, "http://activitystrea.ms/schema/1.0/application");
    assert_eq!(entry.attempts, 0);
    assert!(entry.last_error.is_none());
}

#[test]
fn peek_order_equals_insertion_order() {
    let conn = test_db();
    let inserted: Vec<Statement> = [
        ("opened", "application"),
        ("created", "file"),
        ("saved", "file"),
        ("switched", "mode"),
        ("closed", "application"),
    ]
    .into_iter()
    .map(|(verb, activity)| statement(verb, activity))
    .collect();

    for s in &inserted {
        append(&conn, s).expect("append");
    }

    let mut drained = Vec::new();
    while let Some(entry) = peek_oldest(&conn).expect("peek") {
        drained.push(entry.statement().expect("decode"));
        assert!(remove(&conn, entry.id).expect("remove"));
    }

    assert_eq!(drained, inserted);
    assert_eq!(queued_count(&conn).expect("count"), 0);
}

#[test]
fn interleaved_append_and_remove_stays_fifo() {
    let conn = test_db();
    let a = statement("opened", "application");
    let b = statement("created", "file");
    let c = statement("saved", "file");

    append(&conn, &a).expect("append a");
    append(&conn, &b).expect("append b");
    let head = peek_oldest(&conn).expect("peek").expect("a queued");
    remove(&conn, head.id).expect("remove a");
    append(&conn, &c).expect("append c");

    let head = peek_oldest(&conn).expect("peek").expect("b queued");
    assert_eq!(head.statement().expect("decode"), b);
    remove(&conn, head.id).expect("remove b");

    let head = peek_oldest(&conn).expect("peek").expect("c queued");
    assert_eq!(head.statement().expect("decode"), c);
}

#[test]
fn peek_does_not_consume() {
    let conn = test_db();
    append(&conn, &statement("opened", "application")).expect("append");

    let first = peek_oldest(&conn).expect("peek").expect("entry");
    let second = peek_oldest(&conn).expect("peek").expect("entry");
    assert_eq!(first, second);
}

#[test]
fn remove_only_touches_the_given_entry() {
    let conn = test_db();
    let first = append(&conn, &statement("opened", "application")).expect("append");
    let second = append(&conn, &statement("closed", "application")).expect("append");

    assert!(remove(&conn, second.id).expect("remove"));
    assert!(!remove(&conn, second.id).expect("second remove is a no-op"));

    let head = peek_oldest(&conn).expect("peek").expect("first still queued");
    assert_eq!(head.id, first.id);
}

#[test]
fn entry_reproduces_statement_with_extensions() {
    let conn = test_db();
    let ctx = TraceContext::new(Actor::from_hash("0123456789"), SessionId::from("abcdefabcd"));
    let original = make_statement(
        &ctx,
        "had",
        "execution-error",
        Some(
            Extensions::new()
                .with(ext::ERROR_LINE, 23)
                .with(ext::ERROR_SEVERITY, "error")
                .with(ext::ERROR_INSTRUCTION, "LR.append(L[i])"),
        ),
    )
    .expect("build");

    append(&conn, &original).expect("append");
    let restored = peek_oldest(&conn)
        .expect("peek")
        .expect("entry")
        .statement()
        .expect("decode");

    assert_eq!(restored.verb().id, original.verb().id);
    assert_eq!(restored.object().id, original.object().id);
    assert_eq!(restored.extensions(), original.extensions());
    assert_eq!(restored.actor().pseudonymous_id, "0123456789");
    assert_eq!(restored.session_id(), Some("abcdefabcd"));
    assert_eq!(restored, original);
}

// ── Crash consistency ────────────────────────────────────────────────

#[test]
fn appended_entry_survives_process_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("queue.db");
    let path = path.to_str().expect("utf-8 path");
    let s = statement("started", "execution");

    {
        let pool = create_pool(path, DbRuntimeSettings::default()).expect("pool");
        let conn = pool.get().expect("connection");
        run_migrations(&conn).expect("migrations");
        append(&conn, &s).expect("append");
        // Dropped without any remove: simulates a crash before delivery.
    }

    let pool = create_pool(path, DbRuntimeSettings::default()).expect("pool");
    let conn = pool.get().expect("connection");
    let entry = peek_oldest(&conn).expect("peek").expect("entry survived");
    assert_eq!(entry.statement().expect("decode"), s);

    assert!(remove(&conn, entry.id).expect("remove"));
    drop(conn);
    drop(pool);

    let pool = create_pool(path, DbRuntimeSettings::default()).expect("pool");
    let conn = pool.get().expect("connection");
    assert!(
        peek_oldest(&conn).expect("peek").is_none(),
        "a removed entry must not come back"
    );
}

// ── Failure bookkeeping ──────────────────────────────────────────────

#[test]
fn record_failure_counts_attempts() {
    let conn = test_db();
    let entry = append(&conn, &statement("opened", "application")).expect("append");

    assert_eq!(record_failure(&conn, entry.id, "400 Bad Request").expect("record"), 1);
    assert_eq!(record_failure(&conn, entry.id, "400 Bad Request").expect("record"), 2);

    let head = peek_oldest(&conn).expect("peek").expect("entry");
    assert_eq!(head.attempts, 2);
    assert_eq!(head.last_error.as_deref(), Some("400 Bad Request"));

    assert_eq!(record_failure(&conn, 9_999, "gone").expect("record"), 0);
}

#[test]
fn dead_letter_moves_entry_out_of_the_queue() {
    let conn = test_db();
    let poisoned = append(&conn, &statement("opened", "application")).expect("append");
    let healthy = append(&conn, &statement("closed", "application")).expect("append");

    assert!(dead_letter(&conn, poisoned.id, "rejected 5 times").expect("dead letter"));
    assert!(!dead_letter(&conn, poisoned.id, "again").expect("already moved"));

    assert_eq!(dead_letter_count(&conn).expect("count"), 1);
    assert_eq!(queued_count(&conn).expect("count"), 1);
    assert_eq!(peek_oldest(&conn).expect("peek").expect("entry").id, healthy.id);

    let reason: String = conn
        .query_row(
            "SELECT reason FROM statement_dead_letter WHERE queue_id = ?1",
            [poisoned.id],
            |row| row.get(0),
        )
        .expect("dead letter row");
    assert_eq!(reason, "rejected 5 times");
}

#[test]
fn malformed_payload_fails_to_decode() {
    let conn = test_db();
    conn.execute(
        "INSERT INTO statement_queue (statement_id, verb_id, activity_id, payload_json)
         VALUES ('broken', 'v', 'a', '{not json')",
        [],
    )
    .expect("insert raw row");

    let entry = peek_oldest(&conn).expect("peek").expect("entry");
    let err = entry.statement().expect_err("payload is not a statement");
    assert!(matches!(err, QueueError::Serialization(_)));
}

#[test]
fn missing_schema_surfaces_database_error() {
    let conn = Connection::open_in_memory().expect("should open in-memory db");
    let err = peek_oldest(&conn).expect_err("no table");
    assert!(matches!(err, QueueError::Database(_)));
}
