//! Configuration errors.
//!
//! A bad configuration file stops the run before any project is touched.
//! Errors raised while patching a project live in [`crate::cproject::error`].

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading the patch policy from a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file given with `--config`, or the default one, could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON or has unknown keys.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// An explicitly requested configuration file does not exist.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path given on the command line.
        path: PathBuf,
    },

    /// The patch policy would produce a broken descriptor, e.g. an exclusion
    /// containing the `|` separator.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}
