//! Command implementations
//!
//! Each module corresponds to a subcommand in the CLI and to one of the
//! standalone binaries.

pub mod gather;
pub mod wipe;

// Re-export commonly used types
pub use gather::{run as gather_run, GatherArgs, GatherSummary};
pub use wipe::{run as wipe_run, WipeArgs, WipeSummary};
