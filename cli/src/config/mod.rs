//! Configuration discovery for the CLI

mod loader;

pub use loader::{expand_path, CliConfigLoader};
