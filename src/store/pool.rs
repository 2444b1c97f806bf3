//! Read-only connection pool shared by the HTTP request workers.
//!
//! The writer thread owns the sole writable connection (see
//! [`crate::store::writer`]); every other thread reads through a pool of
//! read-only connections so that request handlers never contend with the
//! writer for the write lock.

use std::path::Path;

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;

pub type Pool = r2d2::Pool<SqliteConnectionManager>;

/// Builds a pool of read-only connections against the sqlite file at
/// `path`, sized to `max_size` (typically the worker/concurrency count).
pub fn build(path: impl AsRef<Path>, max_size: u32) -> anyhow::Result<Pool> {
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let manager = SqliteConnectionManager::file(path.as_ref()).with_flags(flags);
    let pool = r2d2::Pool::builder().max_size(max_size.max(1)).build(manager)?;
    Ok(pool)
}
