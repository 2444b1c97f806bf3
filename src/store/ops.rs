//! SQL text and write-intent constructors shared between the HTTP handlers
//! (which enqueue intents) and the writer thread (which runs them).

use rusqlite::{params, Connection};

use crate::clock::{del_intent_id, set_intent_id};
use crate::store::intent::WriteIntent;
use crate::store::statement_cache;

const UPSERT_SQL: &str = "INSERT INTO cache (key, value, expires_at) VALUES (?1, ?2, ?3) \
     ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at";
const DELETE_SQL: &str = "DELETE FROM cache WHERE key = ?1";
const SELECT_BY_KEY_SQL: &str = "SELECT value, expires_at FROM cache WHERE key = ?1";

/// An immediate upsert of `key` to `value`/`expires_at`, run as soon as the
/// writer thread picks it up.
pub fn set_intent(key: &str, value: &str, expires_at: u64) -> WriteIntent {
    let key_owned = key.to_string();
    let value_owned = value.to_string();
    WriteIntent::new(set_intent_id(key), 0, UPSERT_SQL, false, move |conn, sql| {
        let mut stmt = statement_cache::prepare(conn, sql)?;
        stmt.execute(params![key_owned, value_owned, expires_at])?;
        Ok(())
    })
}

/// An immediate delete of `key`, superseding any pending scheduled delete
/// for the same key (same id).
pub fn delete_intent(key: &str) -> WriteIntent {
    let key_owned = key.to_string();
    WriteIntent::new(del_intent_id(key), 0, DELETE_SQL, false, move |conn, sql| {
        let mut stmt = statement_cache::prepare(conn, sql)?;
        stmt.execute(params![key_owned])?;
        Ok(())
    })
}

/// A future deletion scheduled for a key's TTL expiry. Tagged
/// `must_on_schedule`: a shutdown drain skips it if `expires_at` hasn't
/// arrived yet, since its only purpose is eventual cleanup.
pub fn expire_intent(key: &str, expires_at: u64) -> WriteIntent {
    let key_owned = key.to_string();
    WriteIntent::new(del_intent_id(key), expires_at, DELETE_SQL, true, move |conn, sql| {
        let mut stmt = statement_cache::prepare(conn, sql)?;
        stmt.execute(params![key_owned])?;
        Ok(())
    })
}

/// Probes the backing store for `key` on a read-only connection. Returns
/// `None` if no row exists.
pub fn fetch_by_key(conn: &Connection, key: &str) -> rusqlite::Result<Option<(String, u64)>> {
    let mut stmt = statement_cache::prepare(conn, SELECT_BY_KEY_SQL)?;
    let mut rows = stmt.query(params![key])?;
    match rows.next()? {
        Some(row) => Ok(Some((row.get(0)?, row.get(1)?))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::schema;

    #[test]
    fn set_then_fetch_round_trips() {
        let conn = Connection::open_in_memory().unwrap();
        schema::init(&conn, 0).unwrap();
        let intent = set_intent("k", "v", 0);
        (intent.run)(&conn, intent.sql).unwrap();
        let row = fetch_by_key(&conn, "k").unwrap();
        assert_eq!(row, Some(("v".to_string(), 0)));
    }

    #[test]
    fn delete_removes_row() {
        let conn = Connection::open_in_memory().unwrap();
        schema::init(&conn, 0).unwrap();
        let set = set_intent("k", "v", 0);
        (set.run)(&conn, set.sql).unwrap();
        let del = delete_intent("k");
        (del.run)(&conn, del.sql).unwrap();
        assert_eq!(fetch_by_key(&conn, "k").unwrap(), None);
    }

    #[test]
    fn set_and_expire_intent_ids_share_delete_namespace() {
        assert_eq!(expire_intent("k", 123).id, delete_intent("k").id);
        assert_ne!(set_intent("k", "v", 0).id, delete_intent("k").id);
    }
}
