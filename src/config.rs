//! Configuration for LogDB
//!
//! Centralized configuration with sensible defaults.

use crate::codec::ByteOrder;
use crate::error::{LogDbError, Result};

/// Configuration for a LogDB store file
///
/// Capacities are fixed when the file is created and apply to every page in
/// it. When opening an existing file the capacities stored in the file header
/// win; only the byte order is taken from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    // -------------------------------------------------------------------------
    // Page Geometry
    // -------------------------------------------------------------------------
    /// Number of Minor Page slots in each Major Page table
    pub major_capacity: u16,

    /// Number of record slots in each Minor Page table
    pub minor_capacity: u16,

    // -------------------------------------------------------------------------
    // Encoding
    // -------------------------------------------------------------------------
    /// Byte order applied to every multi-byte field in the file
    pub byte_order: ByteOrder,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            major_capacity: 10,
            minor_capacity: 10,
            byte_order: ByteOrder::Little,
        }
    }
}

impl StoreConfig {
    /// Create a new config builder
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::default()
    }

    /// Reject geometries the allocation policy cannot make progress with.
    pub fn validate(&self) -> Result<()> {
        if self.major_capacity == 0 {
            return Err(LogDbError::Config(
                "major page capacity must be at least 1".to_string(),
            ));
        }
        if self.minor_capacity == 0 {
            return Err(LogDbError::Config(
                "minor page capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for StoreConfig
#[derive(Default)]
pub struct StoreConfigBuilder {
    config: StoreConfig,
}

impl StoreConfigBuilder {
    /// Set the number of Minor Pages each Major Page can index
    pub fn major_capacity(mut self, capacity: u16) -> Self {
        self.config.major_capacity = capacity;
        self
    }

    /// Set the number of records each Minor Page can index
    pub fn minor_capacity(mut self, capacity: u16) -> Self {
        self.config.minor_capacity = capacity;
        self
    }

    /// Set the file-wide byte order
    pub fn byte_order(mut self, order: ByteOrder) -> Self {
        self.config.byte_order = order;
        self
    }

    pub fn build(self) -> StoreConfig {
        self.config
    }
}
