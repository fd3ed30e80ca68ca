//! Loading, navigating and saving the `.cproject` descriptor.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use super::document::{Document, Element};
use super::error::{ProjectError, ProjectResult};
use super::writer;

/// Descriptor file name inside the project folder.
pub const PROJECT_FILE: &str = ".cproject";

/// `moduleId` of the storage module holding the build configurations.
pub const SETTINGS_MODULE_ID: &str = "org.eclipse.cdt.core.settings";

/// Timestamp inserted in backup file names (`YYYYMMDD_hh_mm_ss_AM`).
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%I_%M_%S_%p";

/// Suffix of backup files.
pub const BACKUP_SUFFIX: &str = "backup";

/// A loaded project descriptor.
#[derive(Debug, Clone)]
pub struct ProjectDescriptor {
    path: PathBuf,
    document: Document,
    project_name: String,
}

impl ProjectDescriptor {
    /// Loads `<project_dir>/.cproject`.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder or the file does not exist, the file
    /// cannot be read or is not well-formed XML, or no project name can be
    /// found in it.
    pub fn load(project_dir: &Path) -> ProjectResult<Self> {
        if !project_dir.is_dir() {
            return Err(ProjectError::project_dir_not_found(project_dir));
        }
        let path = project_dir.join(PROJECT_FILE);
        if !path.is_file() {
            return Err(ProjectError::project_file_not_found(path));
        }

        let bytes = fs::read(&path).map_err(|e| ProjectError::file_read(&path, e))?;
        let document = Document::from_bytes(bytes).map_err(|e| ProjectError::parse(&path, e))?;
        Self::from_document(path, document)
    }

    /// Wraps an already parsed document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document has no `project` element with a
    /// `name` inside a `storageModule`.
    pub fn from_document(path: impl Into<PathBuf>, document: Document) -> ProjectResult<Self> {
        let path = path.into();
        let project_name = find_project_name(&document.root)
            .ok_or_else(|| ProjectError::missing_element("storageModule/project with a name"))?
            .to_string();
        tracing::debug!(project = %project_name, path = %path.display(), "Loaded project descriptor");
        Ok(Self {
            path,
            document,
            project_name,
        })
    }

    /// Path of the descriptor file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Project name as recorded by the IDE.
    #[must_use]
    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// The parsed document.
    #[must_use]
    pub const fn document(&self) -> &Document {
        &self.document
    }

    /// Returns the build configuration called `name`.
    ///
    /// The configuration is looked up under the settings storage module: the
    /// one with `moduleId="org.eclipse.cdt.core.settings"` and no `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings module or the configuration is missing.
    pub fn configuration_mut(&mut self, name: &str) -> ProjectResult<&mut Element> {
        let settings = self
            .document
            .root
            .find_mut(|e| {
                e.is("storageModule")
                    && e.attribute("moduleId") == Some(SETTINGS_MODULE_ID)
                    && !e.has_attribute("id")
            })
            .ok_or_else(|| {
                ProjectError::missing_element(format!(
                    "storageModule with moduleId '{SETTINGS_MODULE_ID}'"
                ))
            })?;

        settings
            .find_mut(|e| {
                e.is("cconfiguration") && e.find(|c| is_configuration(c, name)).is_some()
            })
            .and_then(|cconfiguration| cconfiguration.find_mut(|c| is_configuration(c, name)))
            .ok_or_else(|| ProjectError::missing_element(format!("configuration named '{name}'")))
    }

    /// Writes a timestamped backup of the file on disk, then overwrites it
    /// with the in-memory document. Returns the backup path.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be serialised, the backup
    /// already exists or cannot be written, or the descriptor cannot be
    /// overwritten.
    pub fn save(&self) -> ProjectResult<PathBuf> {
        self.save_at(&Local::now())
    }

    /// [`ProjectDescriptor::save`] with an explicit backup timestamp.
    ///
    /// # Errors
    ///
    /// See [`ProjectDescriptor::save`].
    pub fn save_at(&self, timestamp: &DateTime<Local>) -> ProjectResult<PathBuf> {
        let xml = writer::to_xml_string(&self.document)?;

        let backup = backup_path(&self.path, timestamp);
        tracing::info!(backup = %backup.display(), "Backing up project file");
        copy_to_new_file(&self.path, &backup)?;

        fs::write(&self.path, xml).map_err(|e| ProjectError::file_write(&self.path, e))?;
        tracing::info!(path = %self.path.display(), "Wrote patched project file");
        Ok(backup)
    }
}

/// Returns the `sourceEntries` element of a configuration.
///
/// # Errors
///
/// Returns an error if the configuration has no `sourceEntries`.
pub fn source_entries_mut(configuration: &mut Element) -> ProjectResult<&mut Element> {
    configuration
        .find_mut(|e| e.is("sourceEntries"))
        .ok_or_else(|| ProjectError::missing_element("sourceEntries in the build configuration"))
}

/// Returns the include path `option` of the compiler tool named `tool_name`.
///
/// # Errors
///
/// Returns an error if no `folderInfo` holds such a tool, or the tool has no
/// option with `valueType="includePath"`.
pub fn include_path_option_mut<'a>(
    configuration: &'a mut Element,
    tool_name: &str,
) -> ProjectResult<&'a mut Element> {
    let tool = configuration
        .find_mut(|e| e.is("folderInfo") && e.find(|t| is_tool(t, tool_name)).is_some())
        .and_then(|folder_info| folder_info.find_mut(|t| is_tool(t, tool_name)))
        .ok_or_else(|| ProjectError::missing_element(format!("tool named '{tool_name}'")))?;

    tool.find_mut(|e| e.is("option") && e.attribute("valueType") == Some("includePath"))
        .ok_or_else(|| {
            ProjectError::missing_element(format!("include path option in '{tool_name}'"))
        })
}

/// Computes `<descriptor>.<timestamp>.backup`.
#[must_use]
pub fn backup_path(descriptor: &Path, timestamp: &DateTime<Local>) -> PathBuf {
    let mut name = descriptor.as_os_str().to_owned();
    name.push(format!(
        ".{}.{BACKUP_SUFFIX}",
        timestamp.format(BACKUP_TIMESTAMP_FORMAT)
    ));
    PathBuf::from(name)
}

fn copy_to_new_file(source: &Path, destination: &Path) -> ProjectResult<()> {
    let mut target = match OpenOptions::new().write(true).create_new(true).open(destination) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(ProjectError::BackupExists {
                path: destination.to_path_buf(),
            });
        }
        Err(e) => return Err(ProjectError::file_write(destination, e)),
    };
    let mut original = File::open(source).map_err(|e| ProjectError::file_read(source, e))?;
    io::copy(&mut original, &mut target).map_err(|e| ProjectError::file_write(destination, e))?;
    Ok(())
}

fn find_project_name(root: &Element) -> Option<&str> {
    root.descendants()
        .filter(|e| e.is("storageModule"))
        .find_map(|module| module.find(|e| e.is("project") && e.has_attribute("name")))
        .and_then(|project| project.attribute("name"))
}

fn is_configuration(element: &Element, name: &str) -> bool {
    element.is("configuration") && element.attribute("name") == Some(name)
}

fn is_tool(element: &Element, name: &str) -> bool {
    element.is("tool") && element.attribute("name") == Some(name)
}
