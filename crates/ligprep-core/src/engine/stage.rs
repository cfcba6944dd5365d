//! The stage-engine interface: which stages exist, which engines may satisfy
//! them, and the contract every engine implements.

use super::error::EngineError;
use super::process::ProcessOutput;
use crate::core::models::format::TargetFormat;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EngineId {
    Obabel,
    Cxcalc,
    Rdkit,
    Standardizer,
    Molconvert,
}

impl EngineId {
    pub const ALL: [EngineId; 5] = [
        EngineId::Obabel,
        EngineId::Cxcalc,
        EngineId::Rdkit,
        EngineId::Standardizer,
        EngineId::Molconvert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineId::Obabel => "obabel",
            EngineId::Cxcalc => "cxcalc",
            EngineId::Rdkit => "rdkit",
            EngineId::Standardizer => "standardizer",
            EngineId::Molconvert => "molconvert",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.as_str() == name)
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One engine preference slot: an engine, or `none` for "no further fallback".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineChoice {
    Engine(EngineId),
    #[default]
    None,
}

impl FromStr for EngineChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "none" => Ok(EngineChoice::None),
            name => EngineId::from_name(name)
                .map(EngineChoice::Engine)
                .ok_or_else(|| name.to_string()),
        }
    }
}

impl fmt::Display for EngineChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineChoice::Engine(id) => id.fmt(f),
            EngineChoice::None => f.write_str("none"),
        }
    }
}

/// Stages satisfied by interchangeable external engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Neutralization,
    StereoisomerGeneration,
    Tautomerization,
    Protonation,
    Conformation,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Neutralization,
        Stage::StereoisomerGeneration,
        Stage::Tautomerization,
        Stage::Protonation,
        Stage::Conformation,
    ];

    /// Name used for status entries and stage timers.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Neutralization => "neutralization",
            Stage::StereoisomerGeneration => "stereoisomer",
            Stage::Tautomerization => "tautomerization",
            Stage::Protonation => "protonation",
            Stage::Conformation => "conformation",
        }
    }

    /// Suffix of the per-attempt timer `<engine>_<suffix>`.
    pub fn timer_suffix(&self) -> &'static str {
        match self {
            Stage::Neutralization => "neutralize",
            Stage::StereoisomerGeneration => "stereoisomer_generation",
            Stage::Tautomerization => "tautomerize",
            Stage::Protonation => "protonate",
            Stage::Conformation => "conformation",
        }
    }

    pub fn valid_engines(&self) -> &'static [EngineId] {
        match self {
            Stage::Neutralization => &[EngineId::Standardizer, EngineId::Obabel],
            Stage::StereoisomerGeneration => &[EngineId::Rdkit, EngineId::Cxcalc],
            Stage::Tautomerization => &[EngineId::Cxcalc, EngineId::Obabel],
            Stage::Protonation => &[EngineId::Cxcalc, EngineId::Obabel],
            Stage::Conformation => &[EngineId::Molconvert, EngineId::Obabel],
        }
    }

    pub fn accepts(&self, engine: EngineId) -> bool {
        self.valid_engines().contains(&engine)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Input handed to an engine for one attempt.
#[derive(Debug, Clone, Copy)]
pub struct EngineRequest<'a> {
    pub key: &'a str,
    pub smiles: &'a str,
    /// Private to the current task; engines may write anything here.
    pub scratch_dir: &'a Path,
    /// Target file for stages that produce a geometry.
    pub output_path: Option<&'a Path>,
    pub timeout: Duration,
    pub ph: f64,
}

impl<'a> EngineRequest<'a> {
    pub fn new(key: &'a str, smiles: &'a str, scratch_dir: &'a Path) -> Self {
        Self {
            key,
            smiles,
            scratch_dir,
            output_path: None,
            timeout: Duration::from_secs(30),
            ph: 7.4,
        }
    }

    pub fn with_output(mut self, path: &'a Path) -> Self {
        self.output_path = Some(path);
        self
    }

    pub fn with_ph(mut self, ph: f64) -> Self {
        self.ph = ph;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutput {
    Structure(String),
    Variants(Vec<String>),
    /// Raw geometry written to the requested output path.
    Geometry(std::path::PathBuf),
}

impl EngineOutput {
    /// The output as an ordered list of structures.
    pub fn into_variants(self) -> Vec<String> {
        match self {
            EngineOutput::Structure(s) => vec![s],
            EngineOutput::Variants(v) => v,
            EngineOutput::Geometry(_) => Vec::new(),
        }
    }

    pub fn into_structure(self) -> Option<String> {
        self.into_variants().into_iter().next()
    }
}

/// An external engine able to satisfy one or more stages.
pub trait StageEngine: Send + Sync {
    fn id(&self) -> EngineId;

    /// Name and version quoted in remarks.
    fn describe(&self) -> String;

    fn run(&self, stage: Stage, request: &EngineRequest<'_>) -> Result<EngineOutput, EngineError>;

    /// Batch property calculation for attribute generation.
    fn properties(
        &self,
        _request: &EngineRequest<'_>,
        _names: &[&str],
    ) -> Result<HashMap<String, String>, EngineError> {
        Err(EngineError::execution(
            self.id().as_str(),
            "property calculation is not supported",
        ))
    }
}

/// The general-purpose toolkit used outside the fallback stages: flat PDB
/// generation, energy evaluation, format conversion and its own properties.
pub trait Toolkit: Send + Sync {
    /// Prefix of the toolkit's own timers, e.g. `obabel_generation`.
    fn id(&self) -> EngineId;

    fn describe(&self) -> String;

    /// Writes a PDB without 3D embedding to `request.output_path`.
    fn generate_pdb(&self, request: &EngineRequest<'_>) -> Result<(), EngineError>;

    fn energy_report(&self, pdb: &Path, timeout: Duration) -> Result<ProcessOutput, EngineError>;

    /// Converts a PDB into `format`, writing the raw result to `output`.
    fn convert(
        &self,
        pdb: &Path,
        format: TargetFormat,
        output: &Path,
        timeout: Duration,
    ) -> Result<(), EngineError>;

    fn properties(
        &self,
        request: &EngineRequest<'_>,
        names: &[&str],
    ) -> Result<HashMap<String, String>, EngineError>;

    /// A single descriptor appended to a SMILES conversion.
    fn appended_descriptor(
        &self,
        request: &EngineRequest<'_>,
        descriptor: &str,
    ) -> Result<String, EngineError>;
}
