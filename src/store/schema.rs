//! Backing-store schema and boot-time expiry sweep.

use rusqlite::Connection;

pub const CREATE_TABLE_SQL: &str =
    "CREATE TABLE IF NOT EXISTS cache (key TEXT PRIMARY KEY NOT NULL, value TEXT NOT NULL, expires_at INTEGER DEFAULT 0)";

const SWEEP_EXPIRED_SQL: &str = "DELETE FROM cache WHERE expires_at != 0 AND expires_at <= ?1";

/// Runs once, synchronously, on the writer's connection before the writer
/// thread's main loop starts: creates the table if absent, then sweeps any
/// rows that expired while the process was down.
pub fn init(conn: &Connection, now: u64) -> rusqlite::Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;
    conn.execute(CREATE_TABLE_SQL, [])?;
    conn.execute(SWEEP_EXPIRED_SQL, [now])?;
    Ok(())
}
