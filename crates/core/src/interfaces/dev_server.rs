//! Dev-server backend seam.

use crate::error::Result;
use crate::interfaces::compiler::CompileStats;
use serde_json::Value;
use std::sync::Arc;

/// Handle plugins get to extend a running dev server, e.g. to mount extra
/// middleware routes.
pub trait DevServerContext {
    fn mount(&mut self, path: &str, description: &str);
}

/// Hook registered by a plugin, invoked once when the server starts.
pub type DevServerHook = Arc<dyn Fn(&mut dyn DevServerContext) -> Result<()> + Send + Sync>;

/// Listen settings resolved from options, env and CLI flags.
#[derive(Debug, Clone)]
pub struct ServeSettings {
    pub host: String,
    pub port: u16,
    pub https: bool,
    pub open: bool,
    pub public_url: Option<String>,
}

impl Default for ServeSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            https: false,
            open: false,
            public_url: None,
        }
    }
}

/// Serves a composed configuration with rebuild-on-change.
pub trait DevServer: Send + Sync {
    fn serve(
        &self,
        config: &Value,
        settings: &ServeSettings,
        hooks: &[DevServerHook],
    ) -> Result<Arc<dyn RunningServer>>;
}

/// A started server instance.
pub trait RunningServer: Send + Sync {
    /// Block until the first compilation settles.
    fn wait_for_first_build(&self) -> Result<CompileStats>;

    fn close(&self);

    /// Block until the server is shut down. The default returns immediately,
    /// which suits in-process test servers.
    fn wait_until_stopped(&self) -> Result<()> {
        Ok(())
    }
}

/// Default backend: starts nothing, reports one clean build, stops at once.
pub struct NoopDevServer;

impl DevServer for NoopDevServer {
    fn serve(
        &self,
        _config: &Value,
        _settings: &ServeSettings,
        hooks: &[DevServerHook],
    ) -> Result<Arc<dyn RunningServer>> {
        let mut context = NoopContext;
        for hook in hooks {
            hook(&mut context)?;
        }
        Ok(Arc::new(NoopRunningServer))
    }
}

struct NoopContext;

impl DevServerContext for NoopContext {
    fn mount(&mut self, _path: &str, _description: &str) {}
}

struct NoopRunningServer;

impl RunningServer for NoopRunningServer {
    fn wait_for_first_build(&self) -> Result<CompileStats> {
        Ok(CompileStats::default())
    }

    fn close(&self) {}
}
