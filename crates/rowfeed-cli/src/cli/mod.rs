//! Building blocks of the `rowfeed` binary.
//!
//! ## Submodules
//!
//! - [`config`] - CLI arguments and their validated form.
//! - [`input`] - Configuration edits read from stdin.
//! - [`render`] - Text and JSON rendering of display views.
//! - [`telemetry`] - `tracing` subscriber setup.

pub mod config;
pub mod input;
pub mod render;
pub mod telemetry;
