//! Request handlers implementing the cache HTTP surface.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::cache::Entry;
use crate::clock::{del_intent_id, now_ms, set_intent_id};
use crate::http::response::{CacheApiError, CacheResponse, Message};
use crate::http::AppState;
use crate::store::ops;

#[derive(Debug, Serialize)]
pub struct CacheEntryBody {
    pub value: String,
    pub expires_at: u64,
}

#[derive(Debug, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub ttl: Option<u64>,
}

fn require_key(key: &str) -> Result<(), CacheApiError> {
    if key.trim().is_empty() {
        return Err(CacheApiError::BadRequest("key must not be empty".into()));
    }
    Ok(())
}

fn validate_set_request(req: &SetRequest) -> Result<(), CacheApiError> {
    require_key(&req.key)?;
    if req.value.is_empty() {
        return Err(CacheApiError::BadRequest("value must not be empty".into()));
    }
    Ok(())
}

/// Unwraps a `Json<T>` extraction result, mapping a rejection (malformed
/// JSON, missing/mistyped fields) into the same `{success:false,...}`
/// envelope every other client error goes through, instead of letting
/// axum's default `JsonRejection` response (plain text, 422) escape.
fn require_json<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, CacheApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| CacheApiError::BadRequest(rejection.to_string()))
}

/// Looks up `key`, applying the lazy-expire-on-read policy: an in-memory
/// entry whose deadline has passed is treated as a miss and cleared before
/// anything else happens.
fn live_entry(state: &AppState, key: &str, now: u64) -> Entry {
    let entry = state.cache.get(key);
    if entry.expired(now) {
        state.cache.delete(key);
        Entry::default()
    } else {
        entry
    }
}

/// Probes the backing store for a cache-miss key, populating the in-memory
/// map with either the found row or a known-absent sentinel, and schedules
/// a future deletion intent when the stored row carries a real TTL.
fn probe_store(state: &AppState, key: &str, now: u64) -> Result<Entry, CacheApiError> {
    let conn = state
        .pool
        .get()
        .map_err(|err| CacheApiError::Internal(format!("failed to acquire read connection: {err}")))?;
    let row = ops::fetch_by_key(&conn, key)
        .map_err(|err| CacheApiError::Internal(format!("backing store read failed: {err}")))?;

    let entry = match row {
        None => Entry::sentinel(),
        Some((value, expires_at)) => {
            if expires_at > 1 {
                state
                    .queue
                    .enqueue(ops::expire_intent(key, expires_at));
            }
            if expires_at > 1 && expires_at <= now {
                Entry::sentinel()
            } else {
                Entry::new(value, expires_at)
            }
        }
    };
    state.cache.set(key, entry.clone());
    Ok(entry)
}

fn entry_response(entry: &Entry) -> Json<CacheResponse<CacheEntryBody>> {
    CacheResponse::ok(CacheEntryBody {
        value: entry.value.clone(),
        expires_at: entry.external_expires_at(),
    })
}

pub async fn get_cache(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<CacheResponse<CacheEntryBody>>, CacheApiError> {
    require_key(&key)?;
    let now = now_ms();
    let entry = live_entry(&state, &key, now);

    let entry = if entry.is_sentinel() {
        entry
    } else if entry.empty() {
        probe_store(&state, &key, now)?
    } else {
        entry
    };

    if entry.is_sentinel() || entry.empty() {
        return Err(CacheApiError::NotFound);
    }

    Ok(entry_response(&entry))
}

/// Stores `req`, canceling any pending scheduled delete when the new entry
/// has no TTL, or scheduling one when it does.
fn apply_set(state: &AppState, req: &SetRequest) -> Entry {
    let now = now_ms();
    let expires_at = match req.ttl {
        None | Some(0) => 0,
        Some(ttl) => now + ttl,
    };
    let entry = Entry::new(req.value.clone(), expires_at);
    state.cache.set(&req.key, entry.clone());

    if expires_at == 0 {
        state.queue.remove_by_id(&del_intent_id(&req.key));
    } else {
        state.queue.enqueue(ops::expire_intent(&req.key, expires_at));
    }
    state.queue.enqueue(ops::set_intent(&req.key, &req.value, expires_at));

    entry
}

pub async fn set_cache(
    State(state): State<AppState>,
    body: Result<Json<SetRequest>, JsonRejection>,
) -> Result<Json<CacheResponse<CacheEntryBody>>, CacheApiError> {
    let req = require_json(body)?;
    validate_set_request(&req)?;
    let entry = apply_set(&state, &req);
    Ok(entry_response(&entry))
}

pub async fn get_or_set_cache(
    State(state): State<AppState>,
    body: Result<Json<SetRequest>, JsonRejection>,
) -> Result<Json<CacheResponse<CacheEntryBody>>, CacheApiError> {
    let req = require_json(body)?;
    validate_set_request(&req)?;
    let now = now_ms();
    let mut existing = live_entry(&state, &req.key, now);
    if existing.empty() {
        existing = probe_store(&state, &req.key, now)?;
    }

    if existing.cached() && !existing.is_sentinel() && !existing.empty() {
        return Ok(entry_response(&existing));
    }

    let entry = apply_set(&state, &req);
    Ok(entry_response(&entry))
}

pub async fn delete_cache(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<CacheResponse<Message>>, CacheApiError> {
    require_key(&key)?;
    state.cache.delete(&key);
    state.queue.remove_by_id(&set_intent_id(&key));
    state.queue.remove_by_id(&del_intent_id(&key));
    state.queue.enqueue(ops::delete_intent(&key));
    Ok(CacheResponse::ok(Message {
        message: "OK".to_string(),
    }))
}

pub async fn not_found() -> CacheApiError {
    CacheApiError::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{schema, Pool, WriteQueue};
    use r2d2_sqlite::SqliteConnectionManager;
    use std::sync::Arc;

    fn state_over(path: &std::path::Path) -> AppState {
        {
            let conn = rusqlite::Connection::open(path).unwrap();
            schema::init(&conn, now_ms()).unwrap();
        }
        let manager = SqliteConnectionManager::file(path);
        let pool: Pool = r2d2::Pool::builder().max_size(2).build(manager).unwrap();
        AppState {
            cache: crate::cache::CacheMap::new(),
            pool,
            queue: Arc::new(WriteQueue::new()),
        }
    }

    #[test]
    fn set_then_get_is_served_from_memory() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_over(&dir.path().join("cache.db"));
        let req = SetRequest {
            key: "k".into(),
            value: "v".into(),
            ttl: None,
        };
        let entry = apply_set(&state, &req);
        assert_eq!(entry.value, "v");
        assert_eq!(entry.expires_at, 0);
        let fetched = live_entry(&state, "k", now_ms());
        assert_eq!(fetched.value, "v");
    }

    #[test]
    fn probing_absent_key_caches_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_over(&dir.path().join("cache.db"));
        let entry = probe_store(&state, "missing", now_ms()).unwrap();
        assert!(entry.is_sentinel());
        assert!(state.cache.get("missing").is_sentinel());
    }

    #[test]
    fn expired_in_memory_entry_is_treated_as_miss() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_over(&dir.path().join("cache.db"));
        state.cache.set("k", Entry::new("v", 1));
        let entry = live_entry(&state, "k", 2);
        assert!(entry.empty());
        assert!(state.cache.get("k").empty());
    }

    #[test]
    fn set_with_ttl_cancels_are_symmetric() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_over(&dir.path().join("cache.db"));
        apply_set(
            &state,
            &SetRequest {
                key: "k".into(),
                value: "v".into(),
                ttl: Some(5000),
            },
        );
        assert_eq!(state.queue.len(), 2); // set/k + del/k
        apply_set(
            &state,
            &SetRequest {
                key: "k".into(),
                value: "v".into(),
                ttl: None,
            },
        );
        assert_eq!(state.queue.len(), 1); // del/k cancelled, set/k remains
    }
}
