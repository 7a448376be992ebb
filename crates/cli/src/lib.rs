//! forgepack-cli: the command-line front end over forgepack-core.

pub mod cli;

pub use cli::Cli;
