//! Built-in command plugins.

pub mod build;
pub mod help;
pub mod inspect;
pub mod serve;
