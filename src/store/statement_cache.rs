//! Prepared-statement lifecycle, keyed by SQL text.
//!
//! `rusqlite::Connection::prepare_cached` already gives per-connection
//! statement caching keyed by SQL text, which is exactly the "SQL text as
//! key" rationale this component names. This is a thin wrapper adding the
//! explicit `finalize`/`cleanup` operations the lifecycle requires:
//! `CachedStatement::discard()` evicts one entry, and
//! `Connection::flush_prepared_statement_cache()` finalizes every cached
//! statement on writer shutdown.

use rusqlite::{CachedStatement, Connection, Result};

/// Looks up (or compiles and caches) the prepared statement for `sql`.
pub fn prepare<'conn>(conn: &'conn Connection, sql: &str) -> Result<CachedStatement<'conn>> {
    conn.prepare_cached(sql)
}

/// Finalizes a single statement: it is dropped from the connection's cache
/// rather than returned to it, so the next `prepare` for the same SQL
/// recompiles from scratch.
pub fn finalize(stmt: CachedStatement<'_>) {
    stmt.discard();
}

/// Finalizes every statement currently cached on `conn`. Called once at
/// writer shutdown, after the drain completes and before the connection is
/// closed.
pub fn cleanup(conn: &Connection) {
    conn.flush_prepared_statement_cache();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_then_reuse_hits_cache() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE t (v INTEGER)", []).unwrap();
        {
            let mut stmt = prepare(&conn, "INSERT INTO t (v) VALUES (1)").unwrap();
            stmt.execute([]).unwrap();
        }
        {
            let mut stmt = prepare(&conn, "INSERT INTO t (v) VALUES (1)").unwrap();
            stmt.execute([]).unwrap();
        }
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn finalize_evicts_single_entry() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE t (v INTEGER)", []).unwrap();
        let stmt = prepare(&conn, "SELECT * FROM t").unwrap();
        finalize(stmt);
        // Re-preparing after finalize still succeeds (recompiles fresh).
        let _stmt = prepare(&conn, "SELECT * FROM t").unwrap();
    }

    #[test]
    fn cleanup_does_not_error_on_empty_cache() {
        let conn = Connection::open_in_memory().unwrap();
        cleanup(&conn);
    }
}
