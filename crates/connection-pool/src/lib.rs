//! Bounded, blocking connection pool for broker sockets.
//!
//! A [`ConnectionPool`] owns up to `capacity` TCP connections to a single
//! address. Callers [`borrow`](ConnectionPool::borrow) a connection, use it
//! exclusively, and hand it back with [`release`](ConnectionPool::release).
//!
//! # Behavior
//!
//! - Idle connections are reused oldest-first (FIFO).
//! - A new connection is dialed only when no idle connection exists and
//!   fewer than `capacity` connections have been opened.
//! - When the pool is exhausted, `borrow` blocks the calling thread until a
//!   connection is released. There is no built-in timeout.
//! - The pool is grow-only: it never closes, evicts or health-checks the
//!   connections it hands out.

mod pool;


pub use pool::{ConnectionPool, PoolStats};
