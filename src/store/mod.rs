//! Durable backing storage: schema, write-intent queue, writer thread, and
//! the read-only connection pool shared by HTTP request workers.

pub mod intent;
pub mod ops;
pub mod pool;
pub mod queue;
pub mod schema;
pub mod statement_cache;
pub mod writer;

pub use intent::WriteIntent;
pub use pool::Pool;
pub use queue::WriteQueue;
pub use writer::Writer;
