//! # FPF Core - Free Port Finder
//!
//! Hands out local port numbers that were bindable for both TCP and UDP at
//! the moment they were checked. Meant for test harnesses and ephemeral
//! services that need a port before they bind.
//!
//! ## Key Features
//!
//! - Sequential allocation from a shared cursor, so the same port is never
//!   handed out twice by one allocator
//! - Explicit start ports that do not disturb the cursor
//! - Multi-address search (a port qualifies if any listed address binds)
//! - One search at a time per allocator; socket probing runs on the
//!   blocking pool
//!
//! ## Usage
//!
//! ```no_run
//! use fpf_core::PortAllocator;
//!
//! # async fn example() -> Result<(), fpf_core::PortError> {
//! let port = PortAllocator::global().find_free_local_port(None, None).await?;
//! let _listener = std::net::TcpListener::bind(("0.0.0.0", port)).unwrap();
//! # Ok(())
//! # }
//! ```
//!
//! There is always a window between the check and the caller's own bind in
//! which another process can take the port.

pub mod config;
pub mod errors;
pub mod port;

pub use config::{AllocatorConfig, FLOOR_STEP, MAX_PORT_NUMBER, MIN_PORT_NUMBER};
pub use errors::{ConfigError, PortError};
pub use port::{PortAllocator, PortCursor};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
