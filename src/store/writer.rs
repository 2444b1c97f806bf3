//! The writer thread: sole consumer of the write queue, sole owner of the
//! writable connection to the backing store.
//!
//! Mirrors `ssplus-cache-me`'s `run.cpp` main loop (wait on condvar, drain
//! while due, shutdown drain once) and the teacher's
//! `LifestatsProcessor`/`writer_thread` shape (a dedicated
//! `thread::Builder`-spawned OS thread owning the one writable connection),
//! generalized to a real condvar wait-until-deadline rather than a channel
//! `recv_timeout` (see [`crate::store::queue`]).

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::Context;
use rusqlite::Connection;

use crate::clock::now_ms;
use crate::store::intent::WriteIntent;
use crate::store::queue::WriteQueue;
use crate::store::schema;
use crate::store::statement_cache;

const BUSY_RETRY_DELAY_MS: u64 = 5000;

/// Handle to the running writer thread. Dropping it (or calling
/// [`Writer::shutdown`]) signals shutdown and blocks until the drain
/// completes and the thread has exited.
pub struct Writer {
    queue: Arc<WriteQueue>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Writer {
    /// Opens the backing store, runs schema init + the boot-time expiry
    /// sweep synchronously (so a fatal open failure surfaces before the
    /// process starts serving requests), then spawns the writer thread.
    pub fn spawn(database_path: PathBuf, queue: Arc<WriteQueue>) -> anyhow::Result<Writer> {
        let conn = Connection::open(&database_path)
            .with_context(|| format!("failed to open backing store at {}", database_path.display()))?;
        schema::init(&conn, now_ms()).context("failed to initialize backing store schema")?;

        let running = Arc::new(AtomicBool::new(true));
        let running_for_thread = running.clone();
        let queue_for_thread = queue.clone();

        let handle = thread::Builder::new()
            .name("cache-writer".into())
            .spawn(move || writer_loop(conn, queue_for_thread, running_for_thread))
            .context("failed to spawn cache-writer thread")?;

        Ok(Writer {
            queue,
            running,
            handle: Some(handle),
        })
    }

    /// Requests shutdown and blocks until the writer thread has drained the
    /// queue and exited.
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.queue.shutdown();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("cache-writer thread panicked during shutdown");
            }
        }
    }
}

impl Drop for Writer {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.shutdown();
        }
    }
}

fn writer_loop(conn: Connection, queue: Arc<WriteQueue>, running: Arc<AtomicBool>) {
    while running.load(Ordering::SeqCst) {
        queue.wait_for_work();
        if !running.load(Ordering::SeqCst) {
            break;
        }
        drain_due(&conn, &queue);
    }

    drain_shutdown(&conn, &queue);
    statement_cache::cleanup(&conn);
    tracing::info!("cache-writer thread exiting");
}

/// Drains every intent that is due right now, stopping as soon as the
/// earliest remaining intent is scheduled in the future.
fn drain_due(conn: &Connection, queue: &WriteQueue) {
    loop {
        let now = now_ms();
        match queue.pop_earliest_if_due(now, false) {
            Some(intent) => execute(conn, &intent, queue),
            None => break,
        }
    }
}

/// Runs every remaining intent once, exactly once, at shutdown: intents
/// tagged `must_on_schedule` whose time has not yet come are discarded
/// silently; everything else runs regardless of `scheduled_at`.
fn drain_shutdown(conn: &Connection, queue: &WriteQueue) {
    let now = now_ms();
    while let Some(intent) = queue.pop_any() {
        if intent.required_at_shutdown(now) {
            execute(conn, &intent, queue);
        } else {
            tracing::debug!(id = %intent.id, "discarding future-scheduled intent at shutdown");
        }
    }
}

fn execute(conn: &Connection, intent: &WriteIntent, queue: &WriteQueue) {
    match (intent.run)(conn, intent.sql) {
        Ok(()) => {}
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::DatabaseBusy =>
        {
            tracing::warn!(id = %intent.id, "database is busy, rescheduling");
            queue.enqueue(intent.rescheduled(now_ms(), BUSY_RETRY_DELAY_MS));
        }
        Err(err) => {
            tracing::error!(id = %intent.id, error = %err, "write intent failed");
        }
    }
}
