//! Compiler backend seam.

use crate::error::Result;
use serde_json::Value;

/// Outcome of a compilation pass.
#[derive(Debug, Clone, Default)]
pub struct CompileStats {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub assets: Vec<String>,
}

impl CompileStats {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Runs a composed bundler configuration to completion.
pub trait Compiler: Send + Sync {
    fn run(&self, config: &Value) -> Result<CompileStats>;

    /// Continuous compilation: invoke `on_build` after each pass. The
    /// default compiles once and stops, which suits one-shot backends.
    fn watch(&self, config: &Value, on_build: &dyn Fn(&CompileStats)) -> Result<()> {
        let stats = self.run(config)?;
        on_build(&stats);
        Ok(())
    }

    /// Run several configs (library builds emit one per output format) and
    /// fold their stats together.
    fn run_multi(&self, configs: &[Value]) -> Result<CompileStats> {
        let mut combined = CompileStats::default();
        for config in configs {
            let stats = self.run(config)?;
            combined.errors.extend(stats.errors);
            combined.warnings.extend(stats.warnings);
            combined.assets.extend(stats.assets);
        }
        Ok(combined)
    }
}

/// Default backend: accepts any config and reports a clean, empty build.
pub struct NoopCompiler;

impl Compiler for NoopCompiler {
    fn run(&self, _config: &Value) -> Result<CompileStats> {
        Ok(CompileStats::default())
    }
}
