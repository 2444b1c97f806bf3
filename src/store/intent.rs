//! Write intents: deferred, deduplicated mutations against the backing store.

use std::sync::Arc;

use rusqlite::Connection;

/// The body of a write intent: binds parameters against the prepared
/// statement for `sql` and steps it to completion.
///
/// Mirrors `query_runner::run_until_done` — the closure is expected to use
/// `rusqlite`'s own step-until-`DONE` behavior (`Connection::execute`
/// already loops internally), returning `Ok(())` on success and propagating
/// `rusqlite::Error` (including `SQLITE_BUSY`) on failure.
pub type RunFn = dyn Fn(&Connection, &str) -> rusqlite::Result<()> + Send + Sync;

/// A scheduled mutation against the backing store, identified by a stable
/// id so that repeated writes to the same target collapse to one.
#[derive(Clone)]
pub struct WriteIntent {
    /// Stable identity, e.g. `"set/<key>"` or `"del/<key>"`. Two intents
    /// with the same id are equivalent; enqueuing one supersedes the other.
    pub id: String,
    /// Absolute millisecond deadline; `0` means "eligible immediately".
    pub scheduled_at: u64,
    /// SQL text to prepare (via the statement cache) before running.
    pub sql: &'static str,
    /// If `true`, this intent is skipped (not run) during a shutdown drain
    /// when its `scheduled_at` has not yet arrived.
    pub must_on_schedule: bool,
    pub run: Arc<RunFn>,
}

impl WriteIntent {
    pub fn new(
        id: impl Into<String>,
        scheduled_at: u64,
        sql: &'static str,
        must_on_schedule: bool,
        run: impl Fn(&Connection, &str) -> rusqlite::Result<()> + Send + Sync + 'static,
    ) -> Self {
        WriteIntent {
            id: id.into(),
            scheduled_at,
            sql,
            must_on_schedule,
            run: Arc::new(run),
        }
    }

    /// A copy of this intent rescheduled to run `delay_ms` from `now`, used
    /// to re-enqueue after a `SQLITE_BUSY` step.
    pub fn rescheduled(&self, now: u64, delay_ms: u64) -> WriteIntent {
        WriteIntent {
            scheduled_at: now + delay_ms,
            ..self.clone()
        }
    }

    /// Whether this intent is eligible to run at `now` (not in shutdown).
    pub fn due(&self, now: u64) -> bool {
        self.scheduled_at <= now
    }

    /// Whether a shutdown drain must still execute this intent: either it
    /// isn't tagged `must_on_schedule`, or its time has already come.
    pub fn required_at_shutdown(&self, now: u64) -> bool {
        !self.must_on_schedule || self.scheduled_at <= now
    }
}

impl std::fmt::Debug for WriteIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteIntent")
            .field("id", &self.id)
            .field("scheduled_at", &self.scheduled_at)
            .field("sql", &self.sql)
            .field("must_on_schedule", &self.must_on_schedule)
            .finish()
    }
}
