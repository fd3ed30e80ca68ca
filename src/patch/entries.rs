//! Idempotent corrections to source entries and include paths.
//!
//! Every function returns `true` when it changed the tree, so the caller can
//! decide whether the descriptor needs to be written back.

use tracing::{debug, info, warn};

use crate::config::PROJECT_NAME_PLACEHOLDER;
use crate::cproject::Element;

/// Flags of entries created for managed folders.
pub const RESOLVED_WORKSPACE_FLAGS: &str = "VALUE_WORKSPACE_PATH|RESOLVED";

/// Flags of entries created for additional source folders.
pub const WORKSPACE_FLAGS: &str = "VALUE_WORKSPACE_PATH";

const EXCLUDING: &str = "excluding";
const EXCLUSION_SEPARATOR: &str = "|";

/// Replaces `{projectName}` in a path template.
#[must_use]
pub fn substitute_project_name(template: &str, project_name: &str) -> String {
    template.replace(PROJECT_NAME_PLACEHOLDER, project_name)
}

fn is_source_entry(element: &Element, name: &str) -> bool {
    element.is("entry") && element.attribute("name") == Some(name)
}

fn source_entry(name: &str, flags: &str) -> Element {
    Element::new("entry")
        .with_attribute("flags", flags)
        .with_attribute("kind", "sourcePath")
        .with_attribute("name", name)
}

/// Makes sure `source_entries` has a single entry called `name` whose
/// `excluding` list contains every string in `exclusions`.
///
/// - Duplicate entries are a known IDE corruption: when more than one entry
///   has the name, the ones carrying `excluding` are dropped and only the
///   first remaining one is kept.
/// - A missing entry is created with [`RESOLVED_WORKSPACE_FLAGS`].
/// - Exclusions are checked by substring containment against the whole
///   attribute value; missing ones are appended with `|`.
pub fn ensure_exclusion(source_entries: &mut Element, name: &str, exclusions: &[String]) -> bool {
    let mut modified = false;

    let count = source_entries
        .elements()
        .filter(|e| is_source_entry(e, name))
        .count();
    if count > 1 {
        warn!(folder = name, count, "Removing duplicate source entries");
        source_entries.retain_elements(|e| !(is_source_entry(e, name) && e.has_attribute(EXCLUDING)));
        let mut seen = false;
        source_entries.retain_elements(|e| {
            if !is_source_entry(e, name) {
                return true;
            }
            let keep = !seen;
            seen = true;
            keep
        });
        modified = true;
    }

    if !source_entries.elements().any(|e| is_source_entry(e, name)) {
        info!(folder = name, "Adding source entry");
        source_entries.push_element(source_entry(name, RESOLVED_WORKSPACE_FLAGS));
        modified = true;
    }

    if exclusions.is_empty() {
        return modified;
    }
    let Some(entry) = source_entries
        .elements_mut()
        .find(|e| is_source_entry(e, name))
    else {
        return modified;
    };

    match entry.attribute(EXCLUDING) {
        None => {
            let joined = exclusions.join(EXCLUSION_SEPARATOR);
            info!(folder = name, excluding = %joined, "Adding exclusions");
            entry.set_attribute(EXCLUDING, joined);
            modified = true;
        }
        Some(existing) => {
            let mut value = existing.to_string();
            let mut appended = false;
            for exclusion in exclusions {
                if value.contains(exclusion.as_str()) {
                    debug!(folder = name, exclusion = %exclusion, "Exclusion already present");
                    continue;
                }
                info!(folder = name, exclusion = %exclusion, "Adding exclusion");
                if !value.is_empty() {
                    value.push_str(EXCLUSION_SEPARATOR);
                }
                value.push_str(exclusion);
                appended = true;
            }
            if appended {
                entry.set_attribute(EXCLUDING, value);
                modified = true;
            }
        }
    }

    modified
}

/// Appends a source entry for every path not yet present, in the given order.
pub fn add_source_paths(source_entries: &mut Element, paths: &[String], project_name: &str) -> bool {
    let mut modified = false;
    for template in paths {
        let path = substitute_project_name(template, project_name);
        if source_entries.elements().any(|e| is_source_entry(e, &path)) {
            debug!(path = %path, "Source entry already present");
            continue;
        }
        info!(path = %path, "Adding source path");
        source_entries.push_element(source_entry(&path, WORKSPACE_FLAGS));
        modified = true;
    }
    modified
}

/// Appends a `listOptionValue` for every include path not yet present.
///
/// Templates carry the quotes the IDE's macro syntax needs; the comparison
/// with existing values is exact.
pub fn add_include_paths(option: &mut Element, paths: &[String], project_name: &str) -> bool {
    let mut modified = false;
    for template in paths {
        let path = substitute_project_name(template, project_name);
        let present = option
            .elements()
            .any(|e| e.is("listOptionValue") && e.attribute("value") == Some(path.as_str()));
        if present {
            debug!(path = %path, "Include path already present");
            continue;
        }
        info!(path = %path, "Adding include path");
        option.push_element(
            Element::new("listOptionValue")
                .with_attribute("builtIn", "false")
                .with_attribute("value", path),
        );
        modified = true;
    }
    modified
}
