//! newlib/FreeRTOS heap shim.
//!
//! STM32CubeIDE projects using FreeRTOS ship both newlib's `_sbrk` in
//! `sysmem.c` and FreeRTOS' `heap_4.c`, which gives two heaps and no locking
//! around `malloc`. The shim routes FreeRTOS allocations through newlib's
//! `malloc` and provides the newlib lock hooks. Background:
//! <http://www.nadler.com/embedded/newlibAndFreeRTOS.html>

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::cproject::{ProjectError, ProjectResult};

/// File name of the shim.
pub const HEAP_SHIM_FILE: &str = "heap_useNewlib.c";

/// Project folder the shim is written to.
pub const HEAP_SHIM_DIR: &str = "Src";

/// Shim source, written byte-for-byte.
pub const HEAP_SHIM_SOURCE: &str = include_str!("../../assets/heap_useNewlib.c");

/// Location of the shim inside a project folder.
#[must_use]
pub fn heap_shim_path(project_dir: &Path) -> PathBuf {
    project_dir.join(HEAP_SHIM_DIR).join(HEAP_SHIM_FILE)
}

/// Writes the shim into `<project_dir>/Src` unless a file with that name
/// already exists. Returns the path when the file was created.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written, for example
/// because the project has no `Src` folder.
pub fn install_heap_shim(project_dir: &Path) -> ProjectResult<Option<PathBuf>> {
    let path = heap_shim_path(project_dir);
    let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            tracing::debug!(path = %path.display(), "Heap shim already present");
            return Ok(None);
        }
        Err(e) => return Err(ProjectError::file_write(&path, e)),
    };

    file.write_all(HEAP_SHIM_SOURCE.as_bytes())
        .map_err(|e| ProjectError::file_write(&path, e))?;
    tracing::info!(path = %path.display(), "Installed heap shim");
    Ok(Some(path))
}
