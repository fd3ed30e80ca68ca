//! Patching a TouchGFX project for STM32CubeIDE.
//!
//! A patch run loads the descriptor, applies a fixed set of idempotent
//! corrections to one build configuration, optionally installs the newlib
//! heap shim and writes the descriptor back (with a backup) only when a
//! correction changed it. Running it twice leaves the project untouched the
//! second time.
//!
//! Corrections, in order:
//!
//! 1. Exclusion rules (`TouchGFX` without `simulator`, `Middlewares` without
//!    the SDL2 simulator sources)
//! 2. Additional source folders
//! 3. Additional include paths for the G++ compiler
//! 4. Newlib exclusion rules (`Src/sysmem.c`, FreeRTOS `heap_4.c`) and the
//!    heap shim, unless disabled

pub mod entries;
pub mod newlib;

use std::path::PathBuf;

use crate::config::PatchConfig;
use crate::cproject::descriptor::{include_path_option_mut, source_entries_mut};
use crate::cproject::{ProjectDescriptor, ProjectResult};

pub use entries::{add_include_paths, add_source_paths, ensure_exclusion, substitute_project_name};

/// What to patch.
#[derive(Debug, Clone)]
pub struct PatchOptions {
    /// Folder holding the `.cproject` file.
    pub project_dir: PathBuf,
    /// Apply the newlib/FreeRTOS heap fix.
    pub apply_newlib_fix: bool,
}

impl PatchOptions {
    /// Options with the newlib fix enabled.
    #[must_use]
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            apply_newlib_fix: true,
        }
    }
}

/// Outcome of a patch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    /// Project name read from the descriptor.
    pub project_name: String,
    /// Path of the descriptor.
    pub descriptor_path: PathBuf,
    /// Backup of the original descriptor; `None` when nothing changed.
    pub backup_path: Option<PathBuf>,
    /// Heap shim written during this run.
    pub installed_shim: Option<PathBuf>,
}

impl PatchReport {
    /// Returns `true` if the descriptor was rewritten.
    #[must_use]
    pub const fn modified(&self) -> bool {
        self.backup_path.is_some()
    }
}

/// Applies every correction of `policy` to the in-memory descriptor.
///
/// Returns `true` if the document changed. Nothing is written to disk.
///
/// # Errors
///
/// Returns an error if the configuration, its source entries or the
/// compiler's include path option cannot be found.
pub fn apply(
    descriptor: &mut ProjectDescriptor,
    policy: &PatchConfig,
    apply_newlib_fix: bool,
) -> ProjectResult<bool> {
    let project_name = descriptor.project_name().to_string();
    let configuration = descriptor.configuration_mut(&policy.configuration)?;
    let mut modified = false;

    {
        let source_entries = source_entries_mut(configuration)?;
        for rule in &policy.exclusions {
            modified |= ensure_exclusion(source_entries, &rule.folder, &rule.excluding);
        }
        modified |= add_source_paths(source_entries, &policy.source_paths, &project_name);
    }

    {
        let option = include_path_option_mut(configuration, &policy.compiler_tool)?;
        modified |= add_include_paths(option, &policy.include_paths, &project_name);
    }

    if apply_newlib_fix {
        let source_entries = source_entries_mut(configuration)?;
        for rule in &policy.newlib_exclusions {
            modified |= ensure_exclusion(source_entries, &rule.folder, &rule.excluding);
        }
    }

    Ok(modified)
}

/// Runs a complete patch on one project folder.
///
/// # Errors
///
/// Returns an error if the descriptor cannot be loaded, does not have the
/// expected structure, or if writing the shim, the backup or the descriptor
/// fails. The descriptor is never written when an error occurs before the
/// backup has been made.
pub fn run(options: &PatchOptions, policy: &PatchConfig) -> ProjectResult<PatchReport> {
    let mut descriptor = ProjectDescriptor::load(&options.project_dir)?;
    tracing::info!(project = %descriptor.project_name(), "Patching project");

    let modified = apply(&mut descriptor, policy, options.apply_newlib_fix)?;

    let installed_shim = if options.apply_newlib_fix {
        newlib::install_heap_shim(&options.project_dir)?
    } else {
        None
    };

    let backup_path = if modified {
        Some(descriptor.save()?)
    } else {
        tracing::info!("No patch required");
        None
    };

    Ok(PatchReport {
        project_name: descriptor.project_name().to_string(),
        descriptor_path: descriptor.path().to_path_buf(),
        backup_path,
        installed_shim,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExclusionRule;
    use crate::cproject::{Document, Element};

    const PROJECT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<?fileVersion 4.0.0?><cproject>
  <storageModule moduleId="org.eclipse.cdt.core.settings">
    <cconfiguration id="debug">
      <storageModule moduleId="cdtBuildSystem" version="4.0.0">
        <configuration id="debug" name="Debug">
          <folderInfo id="debug." name="/" resourcePath="">
            <toolChain id="tc">
              <tool id="gpp" name="MCU G++ Compiler">
                <option id="gpp.inc" valueType="includePath"/>
              </tool>
            </toolChain>
          </folderInfo>
          <sourceEntries/>
        </configuration>
      </storageModule>
    </cconfiguration>
  </storageModule>
  <storageModule moduleId="cdtBuildSystem" version="4.0.0">
    <project id="Foo.null.1" name="Foo"/>
  </storageModule>
</cproject>"#;

    fn descriptor() -> ProjectDescriptor {
        ProjectDescriptor::from_document(".cproject", Document::parse(PROJECT).unwrap()).unwrap()
    }

    fn source_entries(descriptor: &mut ProjectDescriptor) -> Element {
        let debug = descriptor.configuration_mut("Debug").unwrap();
        source_entries_mut(debug).unwrap().clone()
    }

    #[test]
    fn apply_is_idempotent() {
        let mut descriptor = descriptor();
        let policy = PatchConfig::default();

        assert!(apply(&mut descriptor, &policy, true).unwrap());
        let once = descriptor.document().clone();

        assert!(!apply(&mut descriptor, &policy, true).unwrap());
        assert_eq!(descriptor.document(), &once);
    }

    #[test]
    fn newlib_rules_only_when_enabled() {
        let policy = PatchConfig::default();

        let mut without = descriptor();
        apply(&mut without, &policy, false).unwrap();
        let entries = source_entries(&mut without);
        assert!(entries.elements().all(|e| e.attribute("name") != Some("Src")));
        let middlewares = entries
            .elements()
            .find(|e| e.attribute("name") == Some("Middlewares"))
            .unwrap();
        assert!(!middlewares.attribute("excluding").unwrap().contains("heap_4.c"));

        let mut with = descriptor();
        apply(&mut with, &policy, true).unwrap();
        let entries = source_entries(&mut with);
        let src = entries
            .elements()
            .find(|e| e.attribute("name") == Some("Src"))
            .unwrap();
        assert_eq!(src.attribute("excluding"), Some("sysmem.c"));
    }

    #[test]
    fn policy_from_configuration_is_used() {
        let mut descriptor = descriptor();
        let policy = PatchConfig {
            source_paths: vec!["{projectName}_Board".to_string()],
            include_paths: Vec::new(),
            exclusions: vec![ExclusionRule::new("Drivers", &["CMSIS/DSP"])],
            newlib_exclusions: Vec::new(),
            ..PatchConfig::default()
        };

        assert!(apply(&mut descriptor, &policy, true).unwrap());
        let entries = source_entries(&mut descriptor);
        let names: Vec<&str> = entries.elements().filter_map(|e| e.attribute("name")).collect();
        assert_eq!(names, vec!["Drivers", "Foo_Board"]);
    }

    #[test]
    fn unknown_configuration_is_an_error() {
        let mut descriptor = descriptor();
        let policy = PatchConfig {
            configuration: "Release".to_string(),
            ..PatchConfig::default()
        };
        assert!(apply(&mut descriptor, &policy, true).is_err());
    }
}
