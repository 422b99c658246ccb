//! Project configuration for the Keel scanner core.
//!
//! Parses `keel.toml` into a [`ScanConfig`] that supplies the scanner's
//! collaborator values: the base path for file-pattern resolution, the
//! parse-cache location, the target library, and the testcase identifier.

#![warn(missing_docs)]

mod error;
mod loader;
mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str};
pub use types::{PathsConfig, ProjectMeta, ScanConfig};
