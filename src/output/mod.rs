//! Output formatting for bump test reports.
//!
//! - Terminal: human-readable summary with colors and box drawing
//! - JSON: machine-readable serialization

mod json;
mod terminal;

pub use json::{to_json, to_json_pretty};
pub use terminal::format_report;
