use std::collections::VecDeque;
use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tracing::{debug, trace};

/// Point-in-time view of a pool's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Maximum number of connections the pool will ever open
    pub capacity: usize,
    /// Connections opened so far (never decreases)
    pub allocated: usize,
    /// Connections currently waiting to be borrowed
    pub idle: usize,
}

#[derive(Debug, Default)]
struct PoolState {
    allocated: usize,
    idle: VecDeque<TcpStream>,
}

/// A bounded set of TCP connections to one address.
///
/// Invariants, held under the state mutex at all times:
/// `allocated <= capacity` and `idle.len() <= allocated`.
#[derive(Debug)]
pub struct ConnectionPool {
    address: String,
    capacity: usize,
    keep_alive: Option<Duration>,
    connect_timeout: Option<Duration>,
    state: Mutex<PoolState>,
    released: Condvar,
}

impl ConnectionPool {
    /// Create an empty pool for `address` (`host:port`).
    ///
    /// No connection is opened until the first [`borrow`](Self::borrow).
    /// A capacity of zero is raised to one, since such a pool could only
    /// ever block.
    pub fn new(address: impl Into<String>, capacity: usize) -> Self {
        Self {
            address: address.into(),
            capacity: capacity.max(1),
            keep_alive: None,
            connect_timeout: None,
            state: Mutex::new(PoolState::default()),
            released: Condvar::new(),
        }
    }

    /// Enable TCP keep-alive with the given idle period on every new connection.
    pub fn with_keep_alive(mut self, period: Duration) -> Self {
        self.keep_alive = Some(period);
        self
    }

    /// Bound the time spent dialing each resolved address.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Take a connection out of the pool, blocking while the pool is exhausted.
    ///
    /// Prefers the oldest idle connection. Otherwise dials a new one; a
    /// failed resolve or dial is returned as-is and consumes no capacity.
    pub fn borrow(&self) -> io::Result<TcpStream> {
        let state = self.lock();
        let mut state = self
            .released
            .wait_while(state, |s| s.allocated >= self.capacity && s.idle.is_empty())
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(conn) = state.idle.pop_front() {
            trace!(address = %self.address, idle = state.idle.len(), "Reusing idle connection");
            return Ok(conn);
        }

        let conn = self.connect()?;
        state.allocated += 1;
        trace!(
            address = %self.address,
            allocated = state.allocated,
            capacity = self.capacity,
            "Opened new connection"
        );
        Ok(conn)
    }

    /// Hand a borrowed connection back and wake every waiting borrower.
    ///
    /// The connection is dropped instead of queued if the idle queue is
    /// already as large as the number of connections ever opened, which
    /// only happens when a connection is returned twice or came from
    /// elsewhere.
    pub fn release(&self, conn: TcpStream) {
        let mut state = self.lock();
        if state.idle.len() < state.allocated {
            state.idle.push_back(conn);
            self.released.notify_all();
        } else {
            debug!(
                address = %self.address,
                allocated = state.allocated,
                "Dropping connection released into a full idle queue"
            );
        }
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.lock();
        PoolStats {
            capacity: self.capacity,
            allocated: state.allocated,
            idle: state.idle.len(),
        }
    }

    // Pool state is only ever mutated after fallible work has succeeded, so
    // a poisoned lock still guards consistent data.
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn connect(&self) -> io::Result<TcpStream> {
        let mut last_err = None;
        for addr in self.address.to_socket_addrs()? {
            let attempt = match self.connect_timeout {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => {
                    if let Some(period) = self.keep_alive {
                        SockRef::from(&stream)
                            .set_tcp_keepalive(&TcpKeepalive::new().with_time(period))?;
                    }
                    return Ok(stream);
                }
                Err(e) => {
                    trace!(address = %self.address, %addr, error = %e, "Dial attempt failed");
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("{} did not resolve to any address", self.address),
            )
        }))
    }
}
