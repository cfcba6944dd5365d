use super::stage::{EngineChoice, EngineId, Stage};
use crate::core::attributes::Attribute;
use crate::core::models::format::TargetFormat;
use crate::core::tranche::{TrancheScheme, TrancheType};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ENGINE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Unknown engine '{name}' for stage '{stage}'")]
    UnknownEngine { stage: &'static str, name: String },

    #[error("Engine '{engine}' cannot be used for stage '{stage}'")]
    EngineNotValidForStage { stage: &'static str, engine: EngineId },

    #[error("Unsupported attribute '{0}'")]
    UnknownAttribute(String),

    #[error("Unsupported target format '{0}'")]
    UnknownTargetFormat(String),

    #[error("Invalid tranche configuration: {0}")]
    InvalidTranche(String),

    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
}

/// Settings of one fallback stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageConfig {
    pub enabled: bool,
    pub obligatory: bool,
    pub primary: EngineChoice,
    pub secondary: EngineChoice,
    pub timeouts: HashMap<EngineId, Duration>,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

impl StageConfig {
    pub fn new(primary: EngineChoice, secondary: EngineChoice) -> Self {
        Self {
            enabled: true,
            obligatory: false,
            primary,
            secondary,
            timeouts: HashMap::new(),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(EngineChoice::None, EngineChoice::None)
        }
    }

    /// Parses both preference slots, rejecting names outside the engine set.
    pub fn from_names(stage: Stage, primary: &str, secondary: &str) -> Result<Self, ConfigError> {
        let parse = |name: &str| {
            name.parse::<EngineChoice>()
                .map_err(|name| ConfigError::UnknownEngine {
                    stage: stage.name(),
                    name,
                })
        };
        Ok(Self::new(parse(primary)?, parse(secondary)?))
    }

    pub fn obligatory(mut self, obligatory: bool) -> Self {
        self.obligatory = obligatory;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_timeout(mut self, engine: EngineId, timeout: Duration) -> Self {
        self.timeouts.insert(engine, timeout);
        self
    }

    pub fn timeout_for(&self, engine: EngineId) -> Duration {
        self.timeouts
            .get(&engine)
            .copied()
            .unwrap_or(DEFAULT_ENGINE_TIMEOUT)
    }

    pub fn preferences(&self) -> [EngineChoice; 2] {
        [self.primary, self.secondary]
    }

    fn validate(&self, stage: Stage) -> Result<(), ConfigError> {
        for choice in self.preferences() {
            if let EngineChoice::Engine(engine) = choice {
                if !stage.accepts(engine) {
                    return Err(ConfigError::EngineNotValidForStage {
                        stage: stage.name(),
                        engine,
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DesaltingConfig {
    pub enabled: bool,
    pub obligatory: bool,
}

/// When neutralization runs, given it is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NeutralizationMode {
    #[default]
    Always,
    OnlyGenuineDesalting,
    OnlyGenuineDesaltingAndIfCharged,
}

impl FromStr for NeutralizationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" => Ok(NeutralizationMode::Always),
            "only_genuine_desalting" => Ok(NeutralizationMode::OnlyGenuineDesalting),
            "only_genuine_desalting_and_if_charged" => {
                Ok(NeutralizationMode::OnlyGenuineDesaltingAndIfCharged)
            }
            other => Err(ConfigError::InvalidValue {
                parameter: "neutralization_mode",
                reason: format!("unknown mode '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyCheckConfig {
    pub max_kj_per_mol: f64,
    pub timeout: Duration,
}

/// Immutable configuration shared read-only by every task.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub desalting: DesaltingConfig,
    pub neutralization_mode: NeutralizationMode,
    stages: HashMap<Stage, StageConfig>,
    pub protonation_ph: f64,
    pub energy_check: Option<EnergyCheckConfig>,
    /// `None` when tranche assignment is disabled.
    pub tranche: Option<TrancheScheme>,
    pub attributes: Vec<Attribute>,
    pub target_formats: Vec<TargetFormat>,
    pub store_intermediate_logs: bool,
    /// Budget for toolkit calls outside the fallback stages.
    pub tool_timeout: Duration,
}

impl PipelineConfig {
    pub fn stage(&self, stage: Stage) -> &StageConfig {
        static DISABLED: std::sync::LazyLock<StageConfig> =
            std::sync::LazyLock::new(StageConfig::disabled);
        self.stages.get(&stage).unwrap_or(&DISABLED)
    }

    /// Tranche types followed by additional attributes, without duplicates.
    pub fn attributes_to_compute(&self) -> Vec<Attribute> {
        let mut out: Vec<Attribute> = Vec::new();
        let tranche_attributes = self
            .tranche
            .iter()
            .flat_map(|scheme| scheme.attributes())
            .filter_map(Attribute::from_name);
        for attribute in tranche_attributes.chain(self.attributes.iter().copied()) {
            if !out.iter().any(|a| a.name == attribute.name) {
                out.push(attribute);
            }
        }
        out
    }
}

#[derive(Default)]
pub struct PipelineConfigBuilder {
    desalting: Option<DesaltingConfig>,
    neutralization_mode: Option<NeutralizationMode>,
    stages: HashMap<Stage, StageConfig>,
    protonation_ph: Option<f64>,
    energy_check: Option<EnergyCheckConfig>,
    tranche_assignments: bool,
    tranche_types: Vec<String>,
    tranche_partitions: HashMap<String, Vec<f64>>,
    tranche_mappings: HashMap<String, HashMap<String, char>>,
    attributes: Vec<String>,
    target_formats: Option<Vec<String>>,
    store_intermediate_logs: bool,
    tool_timeout: Option<Duration>,
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn desalting(mut self, enabled: bool, obligatory: bool) -> Self {
        self.desalting = Some(DesaltingConfig {
            enabled,
            obligatory,
        });
        self
    }
    pub fn neutralization_mode(mut self, mode: NeutralizationMode) -> Self {
        self.neutralization_mode = Some(mode);
        self
    }
    pub fn stage(mut self, stage: Stage, config: StageConfig) -> Self {
        self.stages.insert(stage, config);
        self
    }
    pub fn protonation_ph(mut self, ph: f64) -> Self {
        self.protonation_ph = Some(ph);
        self
    }
    pub fn energy_check(mut self, max_kj_per_mol: f64, timeout: Duration) -> Self {
        self.energy_check = Some(EnergyCheckConfig {
            max_kj_per_mol,
            timeout,
        });
        self
    }
    pub fn tranche_assignments(mut self, enabled: bool) -> Self {
        self.tranche_assignments = enabled;
        self
    }
    pub fn tranche_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tranche_types = types.into_iter().map(Into::into).collect();
        self
    }
    pub fn tranche_partitions(mut self, attribute: impl Into<String>, partitions: Vec<f64>) -> Self {
        self.tranche_partitions.insert(attribute.into(), partitions);
        self
    }
    pub fn tranche_mapping(
        mut self,
        attribute: impl Into<String>,
        mapping: HashMap<String, char>,
    ) -> Self {
        self.tranche_mappings.insert(attribute.into(), mapping);
        self
    }
    pub fn attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = names.into_iter().map(Into::into).collect();
        self
    }
    pub fn target_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_formats = Some(formats.into_iter().map(Into::into).collect());
        self
    }
    pub fn store_intermediate_logs(mut self, store: bool) -> Self {
        self.store_intermediate_logs = store;
        self
    }
    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<PipelineConfig, ConfigError> {
        for (stage, config) in &self.stages {
            config.validate(*stage)?;
        }

        let protonation_enabled = self
            .stages
            .get(&Stage::Protonation)
            .is_some_and(|s| s.enabled);
        let protonation_ph = match self.protonation_ph {
            Some(ph) if !(0.0..=14.0).contains(&ph) => {
                return Err(ConfigError::InvalidValue {
                    parameter: "protonation_pH_value",
                    reason: format!("{ph} is outside 0-14"),
                });
            }
            Some(ph) => ph,
            None if protonation_enabled => {
                return Err(ConfigError::MissingParameter("protonation_pH_value"));
            }
            None => 7.4,
        };

        let tranche = if self.tranche_assignments {
            Some(Self::build_tranche(
                self.tranche_types,
                self.tranche_partitions,
                self.tranche_mappings,
            )?)
        } else {
            None
        };

        let attributes = self
            .attributes
            .iter()
            .map(|name| {
                Attribute::from_name(name).ok_or_else(|| ConfigError::UnknownAttribute(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let target_formats = self
            .target_formats
            .ok_or(ConfigError::MissingParameter("target_formats"))?
            .iter()
            .map(|name| {
                name.parse::<TargetFormat>()
                    .map_err(|_| ConfigError::UnknownTargetFormat(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PipelineConfig {
            desalting: self.desalting.unwrap_or_default(),
            neutralization_mode: self.neutralization_mode.unwrap_or_default(),
            stages: self.stages,
            protonation_ph,
            energy_check: self.energy_check,
            tranche,
            attributes,
            target_formats,
            store_intermediate_logs: self.store_intermediate_logs,
            tool_timeout: self.tool_timeout.unwrap_or(DEFAULT_ENGINE_TIMEOUT),
        })
    }

    fn build_tranche(
        types: Vec<String>,
        mut partitions: HashMap<String, Vec<f64>>,
        mut mappings: HashMap<String, HashMap<String, char>>,
    ) -> Result<TrancheScheme, ConfigError> {
        if types.is_empty() {
            return Err(ConfigError::MissingParameter("tranche_types"));
        }
        let mut tranche_types = Vec::with_capacity(types.len());
        for name in types {
            if !Attribute::is_known(&name) {
                return Err(ConfigError::UnknownAttribute(name));
            }
            let tranche_type = if let Some(mapping) = mappings.remove(&name) {
                TrancheType::categorical(name, mapping)
            } else if let Some(bounds) = partitions.remove(&name) {
                TrancheType::numeric(name, bounds)
            } else {
                return Err(ConfigError::InvalidTranche(format!(
                    "tranche type '{name}' has neither partitions nor a mapping"
                )));
            };
            tranche_types.push(tranche_type);
        }
        TrancheScheme::new(tranche_types).map_err(|e| ConfigError::InvalidTranche(e.to_string()))
    }
}
