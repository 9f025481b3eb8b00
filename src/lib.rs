//! Nightly observation planning for a single telescope.
//!
//! The member crates are re-exported under short module names so front-ends
//! depend on one crate. [`session`] wires them into the load, plan, persist,
//! and export sequence used by the command line.

pub use nightplan_astro as astro;
pub use nightplan_config as config;
pub use nightplan_core as core;
pub use nightplan_export as export;
pub use nightplan_scheduler as scheduler;
pub use nightplan_store as store;

pub mod session;

/// Returns the version of the library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
