use mrtrace_db::{create_pool, run_migrations, DbRuntimeSettings};

#[test]
fn schema_survives_reopening_the_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("trace.db");
    let path = path.to_str().expect("utf-8 path");

    {
        let pool = create_pool(path, DbRuntimeSettings::default()).expect("pool");
        let conn = pool.get().expect("connection");
        assert_eq!(run_migrations(&conn).expect("migrations"), 4);
        conn.execute(
            "INSERT INTO statement_queue (statement_id, verb_id, activity_id, payload_json)
             VALUES ('s-1', 'verb', 'activity', '{}')",
            [],
        )
        .expect("insert");
    }

    let pool = create_pool(path, DbRuntimeSettings::default()).expect("pool");
    let conn = pool.get().expect("connection");
    assert_eq!(run_migrations(&conn).expect("migrations"), 0);

    let queued: i64 = conn
        .query_row("SELECT COUNT(*) FROM statement_queue", [], |row| row.get(0))
        .expect("count");
    assert_eq!(queued, 1);
}
