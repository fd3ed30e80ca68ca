//! touchgfx-cproject-fix: patches STM32CubeIDE projects generated for TouchGFX
//!
//! TouchGFX Designer generates STM32CubeIDE projects whose `.cproject`
//! descriptor compiles the PC simulator sources, misses the board support
//! folders and include paths, and pairs newlib with a second FreeRTOS heap.
//! This library fixes the descriptor in place.
//!
//! # Architecture
//!
//! - **Descriptor I/O**: read the `.cproject` XML into an owned tree and write
//!   it back in the layout the IDE produces
//! - **Corrections**: idempotent edits to source entries, exclusion lists and
//!   include paths, driven by a static patch policy
//! - **Heap shim**: optional `heap_useNewlib.c` dropped into `Src/`
//!
//! # Modules
//!
//! - [`config`]: Configuration loading and validation
//! - [`error`]: Configuration error types
//! - [`cproject`]: Descriptor parsing, navigation and writing
//! - [`patch`]: The corrections and the patch run

pub mod config;
pub mod cproject;
pub mod error;
pub mod patch;
