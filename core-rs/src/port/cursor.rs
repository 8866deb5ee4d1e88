/**
 * cursor.rs
 * Resume point for sequential port searches
 *
 * The cursor holds the lowest port that implicit searches have not yet
 * handed out. It starts at the "floor": the first port at or above the
 * configured minimum (stepping by `floor_step`) that accepts a TCP bind.
 * The floor listener can be kept open so no other process takes it while
 * the allocator is alive.
 */

use std::net::{SocketAddr, TcpListener};
use tokio::sync::Mutex;
use tracing::{debug, trace};

use super::probe;

/// Mutex-protected cursor value
///
/// Values are `u32` because the cursor moves to `port + 1` after handing
/// out a port, which is one past `u16::MAX` for the last port.
#[derive(Debug)]
pub struct PortCursor {
    value: Mutex<u32>,
}

impl PortCursor {
    /// Create a cursor starting at `start`
    pub fn new(start: u32) -> Self {
        PortCursor {
            value: Mutex::new(start),
        }
    }

    /// Read the current value
    pub async fn get(&self) -> u32 {
        *self.value.lock().await
    }

    /// Replace the current value
    pub async fn set(&self, value: u32) {
        *self.value.lock().await = value;
    }

    /// Find the floor port by probing TCP binds upward from `min_port`
    ///
    /// # Arguments
    /// * `min_port` - First port to try
    /// * `step` - Increment applied after each failed bind
    ///
    /// # Returns
    /// The floor port and the listener still bound to it
    ///
    /// The loop has no upper bound: if nothing above `min_port` is ever
    /// bindable it does not return.
    pub fn reserve_floor(min_port: u32, step: u32) -> (u16, TcpListener) {
        let mut port = min_port;

        loop {
            if let Ok(candidate) = u16::try_from(port) {
                match probe::bind_tcp(SocketAddr::new(probe::wildcard_address(), candidate)) {
                    Ok(listener) => {
                        debug!(port = candidate, "reserved floor port");
                        return (candidate, listener);
                    }
                    Err(e) => trace!(port = candidate, error = %e, "floor port busy"),
                }
            }
            port = port.saturating_add(step);
        }
    }
}
