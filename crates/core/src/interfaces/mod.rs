//! Trait seams for the pluggable backends.
//!
//! The composer produces plain JSON configs; actually bundling them or
//! serving them is delegated behind these traits so embedders and tests can
//! substitute their own implementations.

pub mod compiler;
pub mod dev_server;

pub use compiler::{CompileStats, Compiler, NoopCompiler};
pub use dev_server::{
    DevServer, DevServerContext, DevServerHook, NoopDevServer, RunningServer, ServeSettings,
};
