//! # Voltcast
//!
//! Workspace facade re-exporting the `energy_forecast` library.
//!
//! ## Example
//!
//! ```
//! use voltcast_workspace::{FeatureSchema, ServiceConfig};
//!
//! let config = ServiceConfig::default();
//! assert_eq!(config.window_length, 30);
//! assert_eq!(FeatureSchema::default().len(), config.features.len());
//! ```

pub use energy_forecast::*;

/// Version of the workspace facade
pub const WORKSPACE_VERSION: &str = env!("CARGO_PKG_VERSION");
