//! Configuration types deserialized from `keel.toml`.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default target library for scanned files.
const DEFAULT_LIBRARY: &str = "work";

/// Default generic/parameter name whose quoted comparisons mark test cases.
const DEFAULT_TESTCASE_IDENTIFIER: &str = "gc_testcase";

/// Default parse-cache file location, relative to the project directory.
const DEFAULT_CACHE_FILE: &str = ".keel/parse_cache.bin";

/// The top-level project configuration parsed from `keel.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct ScanConfig {
    /// Core project metadata.
    #[serde(default)]
    pub project: ProjectMeta,

    /// Filesystem locations used by the scanner core.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Interactive/GUI mode. When set, file patterns are resolved as given
    /// (the base path is forced to empty), typically as absolute paths.
    #[serde(default)]
    pub gui_mode: bool,
}

/// Core project metadata.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    #[serde(default)]
    pub name: String,

    /// The library that scanned design units compile into.
    #[serde(default = "default_library")]
    pub library: String,

    /// The generic/parameter name the scanners look for when discovering
    /// test cases (e.g. `gc_testcase = "read_test"`).
    #[serde(default = "default_testcase_identifier")]
    pub testcase_identifier: String,
}

/// Filesystem locations used by the scanner core.
#[derive(Debug, Deserialize)]
pub struct PathsConfig {
    /// Base directory that relative file patterns are resolved against.
    #[serde(default = "default_script_path")]
    pub script_path: PathBuf,

    /// Location of the persisted parse cache.
    #[serde(default = "default_cache_file")]
    pub cache_file: PathBuf,
}

fn default_library() -> String {
    DEFAULT_LIBRARY.to_string()
}

fn default_testcase_identifier() -> String {
    DEFAULT_TESTCASE_IDENTIFIER.to_string()
}

fn default_script_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_cache_file() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_FILE)
}

impl Default for ProjectMeta {
    fn default() -> Self {
        Self {
            name: String::new(),
            library: default_library(),
            testcase_identifier: default_testcase_identifier(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            script_path: default_script_path(),
            cache_file: default_cache_file(),
        }
    }
}

impl ScanConfig {
    /// The directory file patterns are resolved against.
    ///
    /// Empty in GUI mode: patterns are then taken as given.
    pub fn base_path(&self) -> &Path {
        if self.gui_mode {
            Path::new("")
        } else {
            &self.paths.script_path
        }
    }

    /// The configured parse-cache file location.
    pub fn cache_file(&self) -> &Path {
        &self.paths.cache_file
    }

    /// The target library for scanned design units.
    pub fn library(&self) -> &str {
        &self.project.library
    }

    /// The testcase identifier the dialect scanners search for.
    pub fn testcase_identifier(&self) -> &str {
        &self.project.testcase_identifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.library(), "work");
        assert_eq!(config.testcase_identifier(), "gc_testcase");
        assert_eq!(config.base_path(), Path::new("."));
        assert_eq!(config.cache_file(), Path::new(".keel/parse_cache.bin"));
        assert!(!config.gui_mode);
    }

    #[test]
    fn gui_mode_forces_empty_base_path() {
        let config = ScanConfig {
            gui_mode: true,
            ..ScanConfig::default()
        };
        assert_eq!(config.base_path(), Path::new(""));
    }
}
