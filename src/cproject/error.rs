//! Error types for project descriptor operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use super::document::XmlError;
use super::writer::WriteError;

/// Result type for project descriptor operations.
pub type ProjectResult<T> = Result<T, ProjectError>;

/// Exit code for a missing project folder or project file.
pub const EXIT_NOT_FOUND: i32 = -1;

/// Exit code for a project file that cannot be loaded as XML.
pub const EXIT_LOAD_FAILED: i32 = -2;

/// Exit code for every other failure.
pub const EXIT_FAILURE: i32 = 1;

/// Errors that can occur while loading, patching or saving a project.
#[derive(Debug, Error)]
pub enum ProjectError {
    /// The project folder does not exist.
    #[error("Path does not exist: {path}")]
    ProjectDirNotFound {
        /// Folder given on the command line.
        path: PathBuf,
    },

    /// The project folder has no `.cproject` file.
    #[error("Project file does not exist: {path}")]
    ProjectFileNotFound {
        /// Expected descriptor path.
        path: PathBuf,
    },

    /// Failed to read the project file.
    #[error("Failed to read file: {path}")]
    FileRead {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The project file is not well-formed XML.
    #[error("Failed to load XML project file: {path}")]
    Parse {
        /// Path to the file.
        path: PathBuf,
        /// Underlying XML error.
        #[source]
        source: XmlError,
    },

    /// The descriptor does not have the expected structure.
    #[error("Project file has no {element}")]
    MissingElement {
        /// Description of the element that was looked for.
        element: String,
    },

    /// A backup with the same timestamp already exists.
    #[error("Backup file already exists: {path}")]
    BackupExists {
        /// Path of the existing backup.
        path: PathBuf,
    },

    /// Failed to write a file.
    #[error("Failed to write file: {path}")]
    FileWrite {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The patched document could not be serialised.
    #[error("Failed to serialise project file")]
    Serialize {
        /// Underlying writer error.
        #[from]
        source: WriteError,
    },
}

impl ProjectError {
    /// Creates a missing project folder error.
    pub fn project_dir_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ProjectDirNotFound { path: path.into() }
    }

    /// Creates a missing project file error.
    pub fn project_file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ProjectFileNotFound { path: path.into() }
    }

    /// Creates a file read error.
    pub fn file_read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates an XML parse error.
    pub fn parse(path: impl Into<PathBuf>, source: impl Into<XmlError>) -> Self {
        Self::Parse {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Creates a missing element error.
    pub fn missing_element(element: impl Into<String>) -> Self {
        Self::MissingElement {
            element: element.into(),
        }
    }

    /// Creates a file write error.
    pub fn file_write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this error.
    ///
    /// Missing inputs and unreadable XML keep the historical negative codes so
    /// scripts wrapping the tool can tell them apart from hard failures.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::ProjectDirNotFound { .. } | Self::ProjectFileNotFound { .. } => EXIT_NOT_FOUND,
            Self::FileRead { .. } | Self::Parse { .. } => EXIT_LOAD_FAILED,
            Self::MissingElement { .. }
            | Self::BackupExists { .. }
            | Self::FileWrite { .. }
            | Self::Serialize { .. } => EXIT_FAILURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ProjectError::project_file_not_found("/work/Demo/.cproject");
        assert_eq!(
            err.to_string(),
            "Project file does not exist: /work/Demo/.cproject"
        );
    }

    #[test]
    fn missing_element_display() {
        let err = ProjectError::missing_element("configuration named 'Debug'");
        assert_eq!(
            err.to_string(),
            "Project file has no configuration named 'Debug'"
        );
    }

    #[test]
    fn exit_codes() {
        assert_eq!(ProjectError::project_dir_not_found("x").exit_code(), -1);
        assert_eq!(ProjectError::project_file_not_found("x").exit_code(), -1);
        assert_eq!(
            ProjectError::parse("x", XmlError::MissingRoot).exit_code(),
            -2
        );
        assert_eq!(ProjectError::missing_element("tool").exit_code(), 1);
        assert_eq!(
            ProjectError::BackupExists {
                path: PathBuf::from("x.backup")
            }
            .exit_code(),
            1
        );
    }
}
