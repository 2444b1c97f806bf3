//! Wall-clock milliseconds and write-intent identity helpers.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds since the Unix epoch.
///
/// Every TTL comparison and schedule deadline in this crate goes through
/// this function; there is no seconds-based timestamp anywhere.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_millis() as u64
}

/// Stable identity for a `set` write intent targeting `key`.
pub fn set_intent_id(key: &str) -> String {
    format!("set/{key}")
}

/// Stable identity for a `del` write intent targeting `key`.
pub fn del_intent_id(key: &str) -> String {
    format!("del/{key}")
}
