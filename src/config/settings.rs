//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.
//! Every field has a default, so an empty object yields the built-in patch
//! policy for the STM32F746G-Discovery TouchGFX template.

use serde::Deserialize;

use crate::error::ConfigError;

/// Placeholder replaced by the project name in source and include paths.
pub const PROJECT_NAME_PLACEHOLDER: &str = "{projectName}";

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    pub(crate) _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    pub(crate) _comment: Option<String>,

    /// Patch policy applied to the project descriptor.
    #[serde(default)]
    pub patch: PatchConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.patch.validate()
    }
}

/// Folder that must carry a set of `excluding` entries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExclusionRule {
    /// Source entry name (project-relative folder).
    pub folder: String,

    /// Paths, relative to `folder`, that must be excluded from the build.
    pub excluding: Vec<String>,
}

impl ExclusionRule {
    /// Creates a rule from string slices.
    #[must_use]
    pub fn new(folder: &str, excluding: &[&str]) -> Self {
        Self {
            folder: folder.to_string(),
            excluding: excluding.iter().map(ToString::to_string).collect(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.folder.trim().is_empty() {
            return Err(validation("exclusion rule with an empty folder name"));
        }
        for exclusion in &self.excluding {
            if exclusion.trim().is_empty() {
                return Err(validation(format!(
                    "empty exclusion for folder '{}'",
                    self.folder
                )));
            }
            if exclusion.contains('|') {
                return Err(validation(format!(
                    "exclusion '{exclusion}' for folder '{}' must not contain '|'",
                    self.folder
                )));
            }
        }
        Ok(())
    }
}

/// Patch policy: what the descriptor must contain after patching.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatchConfig {
    /// Name of the build configuration to patch.
    /// Default: "Debug"
    #[serde(default = "default_configuration")]
    pub configuration: String,

    /// Name of the compiler tool holding the include paths.
    /// Default: "MCU G++ Compiler"
    #[serde(default = "default_compiler_tool")]
    pub compiler_tool: String,

    /// Extra source folders, in insertion order.
    #[serde(default = "default_source_paths")]
    pub source_paths: Vec<String>,

    /// Extra include paths, in insertion order. Values are written verbatim
    /// (including the surrounding quotes the IDE expects).
    #[serde(default = "default_include_paths")]
    pub include_paths: Vec<String>,

    /// Exclusions that are always enforced.
    #[serde(default = "default_exclusions")]
    pub exclusions: Vec<ExclusionRule>,

    /// Exclusions enforced together with the newlib heap shim.
    #[serde(default = "default_newlib_exclusions")]
    pub newlib_exclusions: Vec<ExclusionRule>,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            configuration: default_configuration(),
            compiler_tool: default_compiler_tool(),
            source_paths: default_source_paths(),
            include_paths: default_include_paths(),
            exclusions: default_exclusions(),
            newlib_exclusions: default_newlib_exclusions(),
        }
    }
}

impl PatchConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.configuration.trim().is_empty() {
            return Err(validation("configuration name must not be empty"));
        }
        if self.compiler_tool.trim().is_empty() {
            return Err(validation("compiler tool name must not be empty"));
        }
        if self.source_paths.iter().any(|p| p.trim().is_empty()) {
            return Err(validation("source paths must not be empty"));
        }
        if self.include_paths.iter().any(|p| p.trim().is_empty()) {
            return Err(validation("include paths must not be empty"));
        }
        self.exclusions
            .iter()
            .chain(&self.newlib_exclusions)
            .try_for_each(ExclusionRule::validate)
    }
}

fn validation(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        message: message.into(),
    }
}

fn default_configuration() -> String {
    "Debug".to_string()
}

fn default_compiler_tool() -> String {
    "MCU G++ Compiler".to_string()
}

fn default_source_paths() -> Vec<String> {
    ["Components/Common", "Components/ft5336", "STM32746G-Discovery"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

fn default_include_paths() -> Vec<String> {
    [
        r#""${workspace_loc:/{projectName}/Components/Common}""#,
        r#""${workspace_loc:/{projectName}/Components/ft5336}""#,
        r#""${workspace_loc:/{projectName}/STM32746G-Discovery}""#,
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

fn default_exclusions() -> Vec<ExclusionRule> {
    vec![
        ExclusionRule::new("TouchGFX", &["simulator"]),
        ExclusionRule::new(
            "Middlewares",
            &[
                "ST/TouchGFX/touchgfx/framework/source/platform/driver/touch/SDL2TouchController.cpp",
                "ST/TouchGFX/touchgfx/framework/source/platform/hal/simulator",
            ],
        ),
    ]
}

// http://www.nadler.com/embedded/newlibAndFreeRTOS.html
fn default_newlib_exclusions() -> Vec<ExclusionRule> {
    vec![
        ExclusionRule::new("Src", &["sysmem.c"]),
        ExclusionRule::new(
            "Middlewares",
            &["Third_Party/FreeRTOS/Source/portable/MemMang/heap_4.c"],
        ),
    ]
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
