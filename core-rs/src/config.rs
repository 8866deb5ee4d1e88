/**
 * config.rs
 * Allocator configuration
 *
 * Built in code; the defaults match the documented port bounds.
 */

use crate::errors::ConfigError;

/// Lowest port the allocator starts from. Keeps clear of privileged ports.
pub const MIN_PORT_NUMBER: u16 = 1100;

/// Highest port number
pub const MAX_PORT_NUMBER: u16 = 65535;

/// Step used while searching for the floor port
pub const FLOOR_STEP: u16 = 200;

/// Allocator settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatorConfig {
    /// Where floor probing starts
    pub min_port: u16,
    /// Inclusive upper bound of every scan
    pub max_port: u16,
    /// Increment applied after each busy floor candidate
    pub floor_step: u16,
    /// Keep the floor listener open for the allocator's lifetime
    pub reserve_floor: bool,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        AllocatorConfig {
            min_port: MIN_PORT_NUMBER,
            max_port: MAX_PORT_NUMBER,
            floor_step: FLOOR_STEP,
            reserve_floor: true,
        }
    }
}

impl AllocatorConfig {
    /// Default config restricted to `[min_port, max_port]`
    ///
    /// # Example
    /// ```
    /// use fpf_core::AllocatorConfig;
    ///
    /// let config = AllocatorConfig::with_range(40000, 40999);
    /// assert_eq!(config.min_port, 40000);
    /// assert!(config.reserve_floor);
    /// ```
    pub fn with_range(min_port: u16, max_port: u16) -> Self {
        AllocatorConfig {
            min_port,
            max_port,
            ..Self::default()
        }
    }

    /// Validate port bounds
    ///
    /// Ensures:
    /// - min_port is not 0
    /// - min_port <= max_port
    /// - floor_step is not 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_port == 0 {
            return Err(ConfigError::Validation("min_port cannot be 0".to_string()));
        }

        if self.min_port > self.max_port {
            return Err(ConfigError::Validation(format!(
                "min_port {} is above max_port {}",
                self.min_port, self.max_port
            )));
        }

        if self.floor_step == 0 {
            return Err(ConfigError::Validation("floor_step cannot be 0".to_string()));
        }

        Ok(())
    }
}
