//! CLI command implementations

pub mod panels;
pub mod run;

pub use panels::panels_command;
pub use run::run_command;
