//! Port implementations.
//!
//! - `browser`: fetch, `window.history`, the document head, zoon tasks and
//!   the zoon renderer for synthesized components.
//! - `memory`: scripted doubles and a manually advanced clock, for tests and
//!   headless runs.

pub mod browser;
pub mod memory;
