//! STM32CubeIDE project descriptor handling.
//!
//! This module provides read/write capabilities for the Eclipse CDT
//! `.cproject` file that STM32CubeIDE keeps in every project folder.
//!
//! # File Format
//!
//! The descriptor is an XML document with a fixed layout:
//!
//! - A `storageModule` with `moduleId="org.eclipse.cdt.core.settings"`
//!   holding one `cconfiguration` per build configuration
//! - Inside each, a `configuration` element (named e.g. `Debug`) with:
//!   - `folderInfo` → `toolChain` → `tool` → `option` → `listOptionValue`
//!     for compiler settings such as include paths
//!   - `sourceEntries` → `entry` for the source folders and their
//!     `excluding` lists
//! - A `cdtBuildSystem` storage module with the `project` element and name
//!
//! The file starts with a `<?fileVersion 4.0.0?>` instruction that the IDE
//! expects to find glued to the root start tag.

pub mod descriptor;
pub mod document;
pub mod error;
pub mod writer;

pub use descriptor::{ProjectDescriptor, PROJECT_FILE};
pub use document::{Document, Element, LineEnding, Node, XmlError};
pub use error::{ProjectError, ProjectResult};
pub use writer::WriteError;
