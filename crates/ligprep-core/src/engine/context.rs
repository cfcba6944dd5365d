use super::config::PipelineConfig;
use super::progress::ProgressReporter;
use super::registry::EngineRegistry;

/// Read-only state shared by every task of a collection.
#[derive(Clone, Copy)]
pub struct PipelineContext<'a> {
    pub config: &'a PipelineConfig,
    pub registry: &'a EngineRegistry,
    pub reporter: &'a ProgressReporter<'a>,
}

impl<'a> PipelineContext<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        registry: &'a EngineRegistry,
        reporter: &'a ProgressReporter<'a>,
    ) -> Self {
        Self {
            config,
            registry,
            reporter,
        }
    }
}
