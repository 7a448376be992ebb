//! Umbrella package for workspace-level integration tests.

pub use forgepack_core;
