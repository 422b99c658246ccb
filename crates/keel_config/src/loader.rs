//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ScanConfig;
use std::path::Path;

/// Loads and validates a `keel.toml` configuration from a project directory.
///
/// Reads `<project_dir>/keel.toml`, parses it, and validates required fields.
pub fn load_config(project_dir: &Path) -> Result<ScanConfig, ConfigError> {
    let config_path = project_dir.join("keel.toml");
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `keel.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<ScanConfig, ConfigError> {
    let config: ScanConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present.
fn validate_config(config: &ScanConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    if config.project.library.is_empty() {
        return Err(ConfigError::MissingField("project.library".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
[project]
name = "uvvm_util"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.name, "uvvm_util");
        assert_eq!(config.library(), "work");
        assert_eq!(config.testcase_identifier(), "gc_testcase");
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
gui_mode = false

[project]
name = "uart_regression"
library = "uart_lib"
testcase_identifier = "gc_test"

[paths]
script_path = "hw/sim"
cache_file = "hw/sim/.keel/parse_cache.bin"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.name, "uart_regression");
        assert_eq!(config.library(), "uart_lib");
        assert_eq!(config.testcase_identifier(), "gc_test");
        assert_eq!(config.base_path(), PathBuf::from("hw/sim"));
        assert_eq!(
            config.cache_file(),
            PathBuf::from("hw/sim/.keel/parse_cache.bin")
        );
    }

    #[test]
    fn missing_name_errors() {
        let toml = r#"
[project]
library = "work"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn empty_library_errors() {
        let toml = r#"
[project]
name = "test"
library = ""
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn io_error_from_nonexistent_dir() {
        let err = load_config(Path::new("/nonexistent/dir")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
