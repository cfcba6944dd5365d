use super::config::StageConfig;
use super::error::EngineError;
use super::registry::EngineRegistry;
use super::stage::{EngineChoice, EngineId, EngineOutput, EngineRequest, Stage};
use crate::core::chem::desalt::first_token;
use crate::core::chem::pdb::validate_geometry;
use crate::core::models::node::NodeLog;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Result of driving one stage through its engine preferences.
#[derive(Debug)]
pub struct StageOutcome {
    pub stage: Stage,
    /// Engine that satisfied the stage.
    pub engine: Option<EngineId>,
    /// Engines actually contacted.
    pub attempts: usize,
    pub elapsed: Duration,
    pub result: Result<EngineOutput, EngineError>,
}

impl StageOutcome {
    /// Whether the failure must abort the node. Only obligatory stages do,
    /// including those whose preferences never named a usable engine.
    pub fn is_fatal(&self, obligatory: bool) -> bool {
        self.result.is_err() && obligatory
    }
}

/// Tries the primary engine, then the secondary one.
///
/// Every attempt that contacts an engine appends a `<engine>_<suffix>` timer to
/// `log`, and a failed attempt also appends a status entry under the same
/// name. When both slots fail, the secondary's error is the one returned.
#[instrument(skip_all, fields(stage = %stage, key = request.key))]
pub fn run_stage(
    stage: Stage,
    config: &StageConfig,
    registry: &EngineRegistry,
    request: &EngineRequest<'_>,
    log: &mut NodeLog,
) -> StageOutcome {
    let started = Instant::now();
    let mut attempts = 0;
    let mut last_error = None;

    for choice in config.preferences() {
        let engine = match resolve(stage, choice) {
            Ok(engine) => engine,
            Err(err) => {
                debug!(error = %err, "Preference slot cannot be used.");
                last_error = Some(err);
                continue;
            }
        };

        attempts += 1;
        let attempt_started = Instant::now();
        let request = request.with_timeout(config.timeout_for(engine));
        let result = attempt(stage, engine, registry, &request);
        let timer = format!("{}_{}", engine, stage.timer_suffix());
        log.time(&timer, attempt_started.elapsed());

        match result {
            Ok(output) => {
                info!(engine = %engine, "Stage satisfied.");
                return StageOutcome {
                    stage,
                    engine: Some(engine),
                    attempts,
                    elapsed: started.elapsed(),
                    result: Ok(output),
                };
            }
            Err(err) => {
                warn!(engine = %engine, error = %err, "Stage attempt failed.");
                log.failed(timer, err.to_string());
                last_error = Some(err);
            }
        }
    }

    StageOutcome {
        stage,
        engine: None,
        attempts,
        elapsed: started.elapsed(),
        result: Err(last_error.unwrap_or_else(|| {
            EngineError::Configuration(format!("No {stage} program remaining"))
        })),
    }
}

fn resolve(stage: Stage, choice: EngineChoice) -> Result<EngineId, EngineError> {
    match choice {
        EngineChoice::None => Err(EngineError::Configuration(format!(
            "No {stage} program remaining"
        ))),
        EngineChoice::Engine(engine) if !stage.accepts(engine) => Err(
            EngineError::Configuration(format!("{stage} program '{engine}' is not valid")),
        ),
        EngineChoice::Engine(engine) => Ok(engine),
    }
}

fn attempt(
    stage: Stage,
    engine: EngineId,
    registry: &EngineRegistry,
    request: &EngineRequest<'_>,
) -> Result<EngineOutput, EngineError> {
    let adapter = registry
        .engine(engine)
        .ok_or_else(|| EngineError::execution(engine.as_str(), "not available on this worker"))?;
    let output = adapter.run(stage, request)?;
    validate_output(engine, output)
}

fn validate_output(engine: EngineId, output: EngineOutput) -> Result<EngineOutput, EngineError> {
    match output {
        EngineOutput::Structure(smiles) => {
            let smiles = first_token(&smiles);
            if smiles.is_empty() {
                return Err(EngineError::execution(engine.as_str(), "no output structure"));
            }
            Ok(EngineOutput::Structure(smiles.to_string()))
        }
        EngineOutput::Variants(variants) => {
            let variants: Vec<String> = variants
                .iter()
                .map(|v| first_token(v))
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect();
            if variants.is_empty() {
                return Err(EngineError::execution(engine.as_str(), "no output structures"));
            }
            Ok(EngineOutput::Variants(variants))
        }
        EngineOutput::Geometry(path) => {
            let content = std::fs::read_to_string(&path).map_err(|e| {
                EngineError::execution(
                    engine.as_str(),
                    format!("output file {} was not written: {e}", path.display()),
                )
            })?;
            validate_geometry(&content)?;
            Ok(EngineOutput::Geometry(path))
        }
    }
}
