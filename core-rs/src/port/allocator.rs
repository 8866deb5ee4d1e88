/**
 * allocator.rs
 * Serialized free-port search
 *
 * A PortAllocator hands out ports that were bindable for both TCP and UDP
 * at the moment they were checked.
 *
 * Search modes:
 * - Implicit (no start port): scan from the cursor, then move the cursor
 *   past the port that was found
 * - Explicit (start port given): scan from the start port, cursor untouched
 *
 * Only one search runs at a time per allocator. The cursor never moves
 * backwards, so implicit searches never return the same port twice.
 *
 * Example:
 * - Floor reserved at 1100, cursor = 1100
 * - find_free_local_port(None, None) → 1101 (1100 is held), cursor = 1102
 * - find_free_local_port(Some(1102), None) → 1102, cursor stays 1102
 * - find_free_local_port(Some(1101), None) → InvalidArgument
 */

use once_cell::sync::OnceCell;
use std::net::{IpAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::cursor::PortCursor;
use super::probe;
use crate::config::AllocatorConfig;
use crate::errors::{ConfigError, PortError, Result};

static GLOBAL_ALLOCATOR: OnceCell<PortAllocator> = OnceCell::new();

/// Flags a running scan to stop once the search future is dropped
struct ScanGuard(Arc<AtomicBool>);

impl Drop for ScanGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// Lowest port in `start..=max_port` accepted by `available`
///
/// Checks `cancelled` before every candidate and gives up once it is set.
fn scan_range<F>(start: u16, max_port: u16, cancelled: &AtomicBool, available: F) -> Option<u16>
where
    F: Fn(u16) -> bool,
{
    (start..=max_port)
        .take_while(|_| !cancelled.load(Ordering::Relaxed))
        .find(|&port| available(port))
}

/// Free port finder with a shared cursor
pub struct PortAllocator {
    config: AllocatorConfig,
    /// Held for the whole of each search
    gate: Mutex<()>,
    cursor: PortCursor,
    floor_port: u16,
    /// Floor reservation, closed when the allocator is dropped
    _floor_listener: Option<TcpListener>,
}

impl PortAllocator {
    /// Create an allocator with the default configuration
    ///
    /// Blocks while the floor port is probed.
    pub fn new() -> Self {
        Self::init(AllocatorConfig::default())
    }

    /// Create an allocator from a validated configuration
    ///
    /// # Example
    /// ```
    /// use fpf_core::{AllocatorConfig, PortAllocator};
    ///
    /// let allocator = PortAllocator::with_config(AllocatorConfig::with_range(42000, 42999))?;
    /// assert!(allocator.floor_port() >= 42000);
    /// # Ok::<(), fpf_core::ConfigError>(())
    /// ```
    pub fn with_config(config: AllocatorConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::init(config))
    }

    /// Process-wide allocator with the default configuration
    ///
    /// Initialized on first call. Its floor reservation lives until the
    /// process exits.
    pub fn global() -> &'static PortAllocator {
        GLOBAL_ALLOCATOR.get_or_init(PortAllocator::new)
    }

    fn init(config: AllocatorConfig) -> Self {
        let (floor_port, listener) =
            PortCursor::reserve_floor(config.min_port.into(), config.floor_step.into());

        let floor_listener = if config.reserve_floor {
            Some(listener)
        } else {
            drop(listener);
            None
        };

        debug!(
            floor_port,
            max_port = config.max_port,
            reserved = config.reserve_floor,
            "port allocator ready"
        );

        PortAllocator {
            cursor: PortCursor::new(floor_port.into()),
            gate: Mutex::new(()),
            floor_port,
            _floor_listener: floor_listener,
            config,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Port found during initialization
    pub fn floor_port(&self) -> u16 {
        self.floor_port
    }

    /// Next port an implicit search will start from
    pub async fn cursor(&self) -> u32 {
        self.cursor.get().await
    }

    /// Find the lowest free port at or above a start port
    ///
    /// # Arguments
    /// * `from_port` - Explicit start port, or `None` to start at the cursor
    /// * `bind_address` - Address to probe, or `None` for the wildcard address
    ///
    /// # Returns
    /// A port bindable for TCP and UDP on `bind_address` at check time.
    /// Implicit searches move the cursor past it.
    ///
    /// # Errors
    /// - `InvalidArgument` if the start port is below the cursor or above
    ///   the maximum port
    /// - `NotFound` if no port up to the maximum is available
    pub async fn find_free_local_port(
        &self,
        from_port: Option<u32>,
        bind_address: Option<IpAddr>,
    ) -> Result<u16> {
        let _gate = self.gate.lock().await;

        let floor = self.cursor.get().await;
        let start = self.validate_start(from_port.unwrap_or(floor), floor)?;

        let port = self
            .scan(start, move |port| probe::is_available(port, bind_address))
            .await?;

        if from_port.is_none() {
            self.cursor.set(u32::from(port) + 1).await;
        }

        Ok(port)
    }

    /// Find the lowest free port at or above the cursor on any of `bind_addresses`
    ///
    /// A candidate qualifies when at least one address accepts both binds;
    /// `None` entries probe the wildcard address. Always moves the cursor
    /// on success.
    ///
    /// # Errors
    /// - `InvalidArgument` if the cursor is above the maximum port
    /// - `NotFound` if no port up to the maximum is available (always the
    ///   case for an empty list)
    pub async fn find_free_local_port_on_addresses(
        &self,
        bind_addresses: &[Option<IpAddr>],
    ) -> Result<u16> {
        let _gate = self.gate.lock().await;

        let floor = self.cursor.get().await;
        let start = self.validate_start(floor, floor)?;

        let addresses = bind_addresses.to_vec();
        let port = self
            .scan(start, move |port| probe::is_available_on_any(port, &addresses))
            .await?;

        self.cursor.set(u32::from(port) + 1).await;

        Ok(port)
    }

    /// Reject start ports below the cursor or beyond the configured maximum
    fn validate_start(&self, start: u32, floor: u32) -> Result<u16> {
        match u16::try_from(start) {
            Ok(port) if start >= floor && port <= self.config.max_port => Ok(port),
            _ => {
                warn!(start, floor, max_port = self.config.max_port, "rejected start port");
                Err(PortError::InvalidArgument(format!(
                    "From port number not in valid range: {}",
                    start
                )))
            }
        }
    }

    /// Probe `start..=max_port` on the blocking pool, lowest port first
    ///
    /// Dropping the returned future stops the scan before its next probe.
    /// A probe already running when the gate is released still completes.
    async fn scan<F>(&self, start: u16, available: F) -> Result<u16>
    where
        F: Fn(u16) -> bool + Send + 'static,
    {
        let max_port = self.config.max_port;
        let cancelled = Arc::new(AtomicBool::new(false));
        let _guard = ScanGuard(Arc::clone(&cancelled));

        let found = tokio::task::spawn_blocking(move || {
            scan_range(start, max_port, &cancelled, available)
        })
        .await;

        match found {
            Ok(Some(port)) => {
                debug!(port, start, "found free port");
                Ok(port)
            }
            Ok(None) => {
                warn!(start, max_port, "no free port left in range");
                Err(PortError::NotFound(format!(
                    "Could not find an available port above {}",
                    start
                )))
            }
            Err(e) => match e.try_into_panic() {
                Ok(payload) => std::panic::resume_unwind(payload),
                Err(e) => Err(PortError::NotFound(format!(
                    "Port search above {} did not complete: {}",
                    start, e
                ))),
            },
        }
    }
}

impl Default for PortAllocator {
    fn default() -> Self {
        Self::new()
    }
}
