//! Scripted engines and a fake toolkit for exercising the workflows without
//! external binaries.

use crate::core::models::collection::Collection;
use crate::core::models::format::TargetFormat;
use crate::engine::context::PipelineContext;
use crate::engine::error::EngineError;
use crate::engine::process::ProcessOutput;
use crate::engine::stage::{EngineId, EngineOutput, EngineRequest, Stage, StageEngine, Toolkit};
use crate::workflows::TaskContext;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

pub const EMBEDDED_PDB: &str = "\
COMPND    UNNAMED
AUTHOR    GENERATED BY OPEN BABEL 3.1.0
HETATM    1  C1  UNL     1       1.204  -0.120   0.031  1.00  0.00           C
HETATM    2  O1  UNL     1      -0.352   0.410   0.000  1.00  0.00           O
END
";

pub const FLAT_PDB: &str = "\
COMPND    UNNAMED
HETATM    1  C1  UNL     1       0.000   0.000   0.000  1.00  0.00           C
END
";

type Handler = Box<dyn Fn(&EngineRequest<'_>) -> Result<EngineOutput, EngineError> + Send + Sync>;

pub struct ScriptedEngine {
    id: EngineId,
    handlers: HashMap<Stage, Handler>,
    properties: HashMap<String, String>,
    calls: AtomicUsize,
    smiles_seen: Mutex<Vec<String>>,
}

impl ScriptedEngine {
    pub fn new(id: EngineId) -> Self {
        Self {
            id,
            handlers: HashMap::new(),
            properties: HashMap::new(),
            calls: AtomicUsize::new(0),
            smiles_seen: Mutex::new(Vec::new()),
        }
    }

    /// Replies to every `stage` call with `result`.
    pub fn on(self, stage: Stage, result: Result<EngineOutput, EngineError>) -> Self {
        let id = self.id;
        let response = result.map_err(|err| match err {
            EngineError::Execution { reason, .. } => reason,
            other => other.to_string(),
        });
        self.with_handler(stage, move |_| {
            response
                .clone()
                .map_err(|reason| EngineError::execution(id.as_str(), reason))
        })
    }

    /// Writes `content` to the requested output path and reports it.
    pub fn writes_geometry(self, stage: Stage, content: &'static str) -> Self {
        let id = self.id;
        self.with_handler(stage, move |request| {
            let path = request
                .output_path
                .ok_or_else(|| EngineError::execution(id.as_str(), "no output path"))?;
            fs::write(path, content)?;
            Ok(EngineOutput::Geometry(path.to_path_buf()))
        })
    }

    pub fn with_handler(
        mut self,
        stage: Stage,
        handler: impl Fn(&EngineRequest<'_>) -> Result<EngineOutput, EngineError> + Send + Sync + 'static,
    ) -> Self {
        self.handlers.insert(stage, Box::new(handler));
        self
    }

    pub fn with_property(mut self, name: &str, value: &str) -> Self {
        self.properties.insert(name.to_string(), value.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn smiles_seen(&self) -> Vec<String> {
        self.smiles_seen.lock().unwrap().clone()
    }
}

impl StageEngine for ScriptedEngine {
    fn id(&self) -> EngineId {
        self.id
    }

    fn describe(&self) -> String {
        format!("{} (scripted)", self.id)
    }

    fn run(&self, stage: Stage, request: &EngineRequest<'_>) -> Result<EngineOutput, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.smiles_seen
            .lock()
            .unwrap()
            .push(request.smiles.to_string());
        match self.handlers.get(&stage) {
            Some(handler) => handler(request),
            None => Err(EngineError::execution(
                self.id.as_str(),
                format!("no scripted response for {stage}"),
            )),
        }
    }

    fn properties(
        &self,
        _request: &EngineRequest<'_>,
        names: &[&str],
    ) -> Result<HashMap<String, String>, EngineError> {
        Ok(self
            .properties
            .iter()
            .filter(|(name, _)| names.contains(&name.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[derive(Default)]
pub struct MockToolkit {
    pub fail_generation: bool,
    pub energy_stdout: Option<String>,
    pub failing_formats: Vec<TargetFormat>,
    pub properties: HashMap<String, String>,
    pub generations: AtomicUsize,
}

impl Toolkit for MockToolkit {
    fn id(&self) -> EngineId {
        EngineId::Obabel
    }

    fn describe(&self) -> String {
        "Mock Toolkit version 1.0".to_string()
    }

    fn generate_pdb(&self, request: &EngineRequest<'_>) -> Result<(), EngineError> {
        self.generations.fetch_add(1, Ordering::SeqCst);
        if self.fail_generation {
            return Err(EngineError::execution("obabel", "0 molecules converted"));
        }
        let path = request
            .output_path
            .ok_or_else(|| EngineError::execution("obabel", "no output path"))?;
        fs::write(path, EMBEDDED_PDB)?;
        Ok(())
    }

    fn energy_report(&self, _pdb: &Path, _timeout: Duration) -> Result<ProcessOutput, EngineError> {
        Ok(ProcessOutput {
            stdout: self
                .energy_stdout
                .clone()
                .unwrap_or_else(|| "TOTAL ENERGY = 12.50000 kJ/mol\n".to_string()),
            stderr: String::new(),
        })
    }

    fn convert(
        &self,
        pdb: &Path,
        format: TargetFormat,
        output: &Path,
        _timeout: Duration,
    ) -> Result<(), EngineError> {
        if self.failing_formats.contains(&format) {
            return Err(EngineError::execution("obabel", "0 molecules converted"));
        }
        let source = fs::read_to_string(pdb)?;
        let content = match format {
            TargetFormat::Pdb | TargetFormat::Pdbqt => format!(
                "REMARK  Name = {}\nAUTHOR    GENERATED BY OPEN BABEL 3.1.0\n{}",
                pdb.display(),
                source
            ),
            _ => format!("{}\n OpenBabel\n\n  2  1  0\nM  END\n", pdb.display()),
        };
        fs::write(output, content)?;
        Ok(())
    }

    fn properties(
        &self,
        _request: &EngineRequest<'_>,
        names: &[&str],
    ) -> Result<HashMap<String, String>, EngineError> {
        Ok(self
            .properties
            .iter()
            .filter(|(name, _)| names.contains(&name.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn appended_descriptor(
        &self,
        _request: &EngineRequest<'_>,
        _descriptor: &str,
    ) -> Result<String, EngineError> {
        Ok("2".to_string())
    }
}

/// Staging, scratch and intermediate directories of one test task.
pub struct TaskDirs {
    _root: TempDir,
    pub staging: PathBuf,
    pub scratch: PathBuf,
    pub intermediate: PathBuf,
    pub collection: Collection,
}

impl TaskDirs {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let staging = root.path().join("staging");
        let scratch = root.path().join("scratch");
        let intermediate = root.path().join("intermediate");
        for dir in [&staging, &scratch, &intermediate] {
            fs::create_dir_all(dir).unwrap();
        }
        Self {
            _root: root,
            staging,
            scratch,
            intermediate,
            collection: Collection::new("AA", "BB", "00001"),
        }
    }

    pub fn task<'a>(&'a self, pipeline: PipelineContext<'a>) -> TaskContext<'a> {
        TaskContext {
            pipeline,
            collection: &self.collection,
            staging_dir: &self.staging,
            scratch_dir: &self.scratch,
            intermediate_root: &self.intermediate,
        }
    }
}
