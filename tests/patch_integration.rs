//! End-to-end tests for patching a project folder.
//!
//! Each test copies a fixture descriptor into a fresh temporary project
//! folder, runs the patch and inspects the files left on disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use touchgfx_cproject_fix::config::PatchConfig;
use touchgfx_cproject_fix::cproject::{Document, Element, ProjectError, PROJECT_FILE};
use touchgfx_cproject_fix::patch::newlib::{heap_shim_path, HEAP_SHIM_SOURCE};
use touchgfx_cproject_fix::patch::{self, PatchOptions};

const MINIMAL: &str = include_str!("fixtures/minimal.cproject");
const DUPLICATES: &str = include_str!("fixtures/duplicate_entries.cproject");

/// Creates a temporary directory inside `.tmp/` for test isolation.
/// The directory is automatically cleaned up when the returned `TempDir` is dropped.
///
/// Converts to an absolute path to avoid issues with parallel test execution.
fn test_temp_dir() -> TempDir {
    let tmp_root = Path::new(".tmp");
    fs::create_dir_all(tmp_root).expect("Failed to create .tmp directory");
    let tmp_root = tmp_root
        .canonicalize()
        .expect("Failed to canonicalize .tmp path");
    tempfile::tempdir_in(&tmp_root).expect("Failed to create temp dir")
}

/// Creates a project folder holding `descriptor` and an empty `Src` folder.
fn project_with(descriptor: &str) -> TempDir {
    let dir = test_temp_dir();
    fs::write(dir.path().join(PROJECT_FILE), descriptor).expect("Failed to write descriptor");
    fs::create_dir(dir.path().join("Src")).expect("Failed to create Src");
    dir
}

fn backups(dir: &Path) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = fs::read_dir(dir)
        .expect("Failed to list project folder")
        .map(|entry| entry.expect("Failed to read entry").path())
        .filter(|path| path.to_string_lossy().ends_with(".backup"))
        .collect();
    found.sort();
    found
}

fn read_descriptor(dir: &Path) -> Document {
    let xml = fs::read_to_string(dir.join(PROJECT_FILE)).expect("Failed to read descriptor");
    Document::parse(&xml).expect("Patched descriptor is not well-formed")
}

fn debug_configuration(doc: &Document) -> &Element {
    doc.root
        .find(|e| e.is("configuration") && e.attribute("name") == Some("Debug"))
        .expect("Debug configuration missing")
}

fn source_entries<'a>(doc: &'a Document, name: &str) -> Vec<&'a Element> {
    debug_configuration(doc)
        .find(|e| e.is("sourceEntries"))
        .expect("sourceEntries missing")
        .elements()
        .filter(|e| e.attribute("name") == Some(name))
        .collect()
}

fn include_paths(doc: &Document) -> Vec<String> {
    debug_configuration(doc)
        .find(|e| e.is("tool") && e.attribute("name") == Some("MCU G++ Compiler"))
        .and_then(|tool| tool.find(|e| e.attribute("valueType") == Some("includePath")))
        .expect("G++ include path option missing")
        .elements()
        .filter_map(|e| e.attribute("value").map(ToString::to_string))
        .collect()
}

fn excluding<'a>(entry: &'a Element) -> &'a str {
    entry.attribute("excluding").unwrap_or_default()
}

// =============================================================================
// Full patch runs
// =============================================================================

#[test]
fn patches_minimal_project() {
    let dir = project_with(MINIMAL);

    let report = patch::run(&PatchOptions::new(dir.path()), &PatchConfig::default())
        .expect("Patch failed");
    assert_eq!(report.project_name, "Foo");
    assert!(report.modified());

    let doc = read_descriptor(dir.path());

    let touchgfx = source_entries(&doc, "TouchGFX");
    assert_eq!(touchgfx.len(), 1);
    assert_eq!(excluding(touchgfx[0]), "simulator");
    assert_eq!(
        touchgfx[0].attribute("flags"),
        Some("VALUE_WORKSPACE_PATH|RESOLVED")
    );

    let middlewares = source_entries(&doc, "Middlewares");
    assert_eq!(middlewares.len(), 1);
    assert_eq!(
        excluding(middlewares[0]),
        "ST/TouchGFX/touchgfx/framework/source/platform/driver/touch/SDL2TouchController.cpp\
         |ST/TouchGFX/touchgfx/framework/source/platform/hal/simulator\
         |Third_Party/FreeRTOS/Source/portable/MemMang/heap_4.c"
    );

    for folder in ["Components/Common", "Components/ft5336", "STM32746G-Discovery"] {
        let entries = source_entries(&doc, folder);
        assert_eq!(entries.len(), 1, "missing source entry {folder}");
        assert_eq!(entries[0].attribute("flags"), Some("VALUE_WORKSPACE_PATH"));
    }

    assert_eq!(
        include_paths(&doc),
        vec![
            r#""${workspace_loc:/Foo/Components/Common}""#.to_string(),
            r#""${workspace_loc:/Foo/Components/ft5336}""#.to_string(),
            r#""${workspace_loc:/Foo/STM32746G-Discovery}""#.to_string(),
        ]
    );

    let backups = backups(dir.path());
    assert_eq!(backups.len(), 1);
    assert_eq!(report.backup_path.as_ref(), Some(&backups[0]));
    assert_eq!(fs::read_to_string(&backups[0]).unwrap(), MINIMAL);
}

#[test]
fn rewritten_descriptor_keeps_ide_layout() {
    let dir = project_with(MINIMAL);
    patch::run(&PatchOptions::new(dir.path()), &PatchConfig::default()).expect("Patch failed");

    let xml = fs::read_to_string(dir.path().join(PROJECT_FILE)).unwrap();
    let mut lines = xml.lines();
    assert_eq!(
        lines.next(),
        Some(r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>"#)
    );
    assert!(lines
        .next()
        .unwrap()
        .starts_with(r#"<?fileVersion 4.0.0?><cproject storage_type_id="#));
    assert!(!xml.starts_with('\u{feff}'));

    // untouched elements keep their attributes in the original order
    assert!(xml.contains(
        r#"<project id="Foo.null.1445478523" name="Foo"/>"#
    ));
    assert!(xml.contains(
        r#"<entry flags="VALUE_WORKSPACE_PATH|RESOLVED" kind="sourcePath" name="TouchGFX" excluding="simulator"/>"#
    ));
}

#[test]
fn windows_line_endings_survive_patching() {
    let original = MINIMAL.replace('\n', "\r\n");
    let dir = project_with(&original);
    let report =
        patch::run(&PatchOptions::new(dir.path()), &PatchConfig::default()).expect("Patch failed");
    assert!(report.modified());

    let xml = fs::read_to_string(dir.path().join(PROJECT_FILE)).unwrap();
    assert_eq!(xml.matches('\n').count(), xml.matches("\r\n").count());
    assert!(xml.contains("name=\"Foo\"/>\r\n"));

    let backup = backups(dir.path()).pop().expect("No backup written");
    assert_eq!(fs::read_to_string(backup).unwrap(), original);
}

#[test]
fn second_run_changes_nothing() {
    let dir = project_with(MINIMAL);
    let options = PatchOptions::new(dir.path());
    let policy = PatchConfig::default();

    patch::run(&options, &policy).expect("First patch failed");
    let patched = fs::read_to_string(dir.path().join(PROJECT_FILE)).unwrap();

    let report = patch::run(&options, &policy).expect("Second patch failed");
    assert!(!report.modified());
    assert_eq!(report.installed_shim, None);
    assert_eq!(backups(dir.path()).len(), 1);
    assert_eq!(
        fs::read_to_string(dir.path().join(PROJECT_FILE)).unwrap(),
        patched
    );
}

#[test]
fn cleans_up_duplicate_entries() {
    let dir = project_with(DUPLICATES);

    patch::run(&PatchOptions::new(dir.path()), &PatchConfig::default()).expect("Patch failed");
    let doc = read_descriptor(dir.path());

    let touchgfx = source_entries(&doc, "TouchGFX");
    assert_eq!(touchgfx.len(), 1);
    assert_eq!(excluding(touchgfx[0]), "simulator");

    // existing exclusions survive, required ones are appended
    let middlewares = source_entries(&doc, "Middlewares");
    assert_eq!(middlewares.len(), 1);
    let value = excluding(middlewares[0]);
    assert!(value.starts_with("Third_Party/FreeRTOS/Source/portable/MemMang/heap_4.c|"));
    assert!(value.contains("SDL2TouchController.cpp"));
    assert!(value.contains("platform/hal/simulator"));
    assert_eq!(value.matches("heap_4.c").count(), 1);

    assert_eq!(source_entries(&doc, "Inc").len(), 1);
}

#[test]
fn every_required_exclusion_is_present() {
    let policy = PatchConfig::default();
    for fixture in [MINIMAL, DUPLICATES] {
        let dir = project_with(fixture);
        patch::run(&PatchOptions::new(dir.path()), &policy).expect("Patch failed");
        let doc = read_descriptor(dir.path());

        for rule in policy.exclusions.iter().chain(&policy.newlib_exclusions) {
            let entries = source_entries(&doc, &rule.folder);
            assert_eq!(entries.len(), 1, "folder {}", rule.folder);
            for exclusion in &rule.excluding {
                assert!(
                    excluding(entries[0]).contains(exclusion.as_str()),
                    "{} lacks {exclusion}",
                    rule.folder
                );
            }
        }
    }
}

// =============================================================================
// Newlib heap shim
// =============================================================================

#[test]
fn installs_heap_shim_when_enabled() {
    let dir = project_with(MINIMAL);

    let report = patch::run(&PatchOptions::new(dir.path()), &PatchConfig::default())
        .expect("Patch failed");
    assert_eq!(report.installed_shim, Some(heap_shim_path(dir.path())));
    assert_eq!(
        fs::read(heap_shim_path(dir.path())).unwrap(),
        HEAP_SHIM_SOURCE.as_bytes()
    );

    let doc = read_descriptor(dir.path());
    assert_eq!(excluding(source_entries(&doc, "Src")[0]), "sysmem.c");
}

#[test]
fn skips_heap_shim_when_disabled() {
    let dir = project_with(MINIMAL);
    let options = PatchOptions {
        project_dir: dir.path().to_path_buf(),
        apply_newlib_fix: false,
    };

    let report = patch::run(&options, &PatchConfig::default()).expect("Patch failed");
    assert_eq!(report.installed_shim, None);
    assert!(!heap_shim_path(dir.path()).exists());

    let doc = read_descriptor(dir.path());
    assert!(source_entries(&doc, "Src").is_empty());
    assert!(!excluding(source_entries(&doc, "Middlewares")[0]).contains("heap_4.c"));
}

// =============================================================================
// Error paths
// =============================================================================

#[test]
fn missing_descriptor_is_reported() {
    let dir = test_temp_dir();

    let err = patch::run(&PatchOptions::new(dir.path()), &PatchConfig::default()).unwrap_err();
    assert!(matches!(err, ProjectError::ProjectFileNotFound { .. }));
    assert_eq!(err.exit_code(), -1);
    assert!(backups(dir.path()).is_empty());
}

#[test]
fn missing_debug_configuration_leaves_project_untouched() {
    let descriptor = MINIMAL.replace("name=\"Debug\"", "name=\"Release\"");
    let dir = project_with(&descriptor);

    let err = patch::run(&PatchOptions::new(dir.path()), &PatchConfig::default()).unwrap_err();
    assert!(matches!(err, ProjectError::MissingElement { .. }));
    assert_eq!(
        fs::read_to_string(dir.path().join(PROJECT_FILE)).unwrap(),
        descriptor
    );
    assert!(backups(dir.path()).is_empty());
    assert!(!heap_shim_path(dir.path()).exists());
}

#[test]
fn malformed_descriptor_is_reported() {
    let dir = project_with("<cproject><storageModule></cproject>");

    let err = patch::run(&PatchOptions::new(dir.path()), &PatchConfig::default()).unwrap_err();
    assert_eq!(err.exit_code(), -2);
    assert!(backups(dir.path()).is_empty());
}

// =============================================================================
// Command line
// =============================================================================

#[test]
fn cli_missing_descriptor_exits_with_minus_one() {
    let dir = test_temp_dir();

    let output = Command::new(env!("CARGO_BIN_EXE_touchgfx-cproject-fix"))
        .arg("--path")
        .arg(dir.path())
        .output()
        .expect("Failed to run binary");

    let code = output.status.code().expect("Process was killed");
    assert_eq!(code & 0xFF, 0xFF);
    assert!(String::from_utf8_lossy(&output.stdout).contains("Project file does not exist"));
    assert!(backups(dir.path()).is_empty());
}

#[test]
fn cli_patches_project() {
    let dir = project_with(MINIMAL);

    let output = Command::new(env!("CARGO_BIN_EXE_touchgfx-cproject-fix"))
        .arg("-p")
        .arg(dir.path())
        .arg("-n")
        .output()
        .expect("Failed to run binary");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Patching project 'Foo':"));
    assert!(stdout.contains("Successfully patched!"));
    assert!(!heap_shim_path(dir.path()).exists());
}

#[test]
fn cli_requires_path() {
    let output = Command::new(env!("CARGO_BIN_EXE_touchgfx-cproject-fix"))
        .output()
        .expect("Failed to run binary");

    assert!(!output.status.success());
}
