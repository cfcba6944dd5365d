mod defaults;

use crate::cli::RunArgs;
use crate::error::{CliError, Result};
use crate::utils::parser;
use defaults::DefaultsConfig;
use ligprep::core::io::routing::Addressing;
use ligprep::engine::config::{NeutralizationMode, PipelineConfig, PipelineConfigBuilder, StageConfig};
use ligprep::engine::stage::{EngineId, Stage};
use ligprep::workflows::collection::ExecutionMode;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Pipeline configuration as written in a control file. Keys keep their
/// control-file names; every key is optional here and checked when the core
/// configuration is built.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct PartialPipelineConfig {
    // --- Desalting ---
    #[serde(default, deserialize_with = "parser::switch")]
    desalting: Option<bool>,
    #[serde(default, deserialize_with = "parser::switch")]
    desalting_obligatory: Option<bool>,

    // --- Neutralization ---
    #[serde(default, deserialize_with = "parser::switch")]
    neutralization: Option<bool>,
    #[serde(default, deserialize_with = "parser::switch")]
    neutralization_obligatory: Option<bool>,
    neutralization_mode: Option<String>,
    neutralization_program_1: Option<String>,
    neutralization_program_2: Option<String>,
    #[serde(default, deserialize_with = "parser::seconds")]
    standardizer_neutralization_timeout: Option<Duration>,
    #[serde(default, deserialize_with = "parser::seconds")]
    obabel_neutralization_timeout: Option<Duration>,

    // --- Stereoisomers ---
    #[serde(default, deserialize_with = "parser::switch")]
    stereoisomer_generation: Option<bool>,
    #[serde(default, deserialize_with = "parser::switch")]
    stereoisomer_obligatory: Option<bool>,
    stereoisomer_generation_program_1: Option<String>,
    stereoisomer_generation_program_2: Option<String>,
    #[serde(default, deserialize_with = "parser::seconds")]
    rdkit_stereoisomer_timeout: Option<Duration>,
    #[serde(default, deserialize_with = "parser::seconds")]
    cxcalc_stereoisomer_timeout: Option<Duration>,

    // --- Tautomers ---
    #[serde(default, deserialize_with = "parser::switch")]
    tautomerization: Option<bool>,
    #[serde(default, deserialize_with = "parser::switch")]
    tautomerization_obligatory: Option<bool>,
    tautomerization_program_1: Option<String>,
    tautomerization_program_2: Option<String>,
    #[serde(default, deserialize_with = "parser::seconds")]
    cxcalc_tautomerization_timeout: Option<Duration>,
    #[serde(default, deserialize_with = "parser::seconds")]
    obabel_tautomerization_timeout: Option<Duration>,

    // --- Protonation ---
    #[serde(default, deserialize_with = "parser::switch")]
    protonation_state_generation: Option<bool>,
    #[serde(default, deserialize_with = "parser::switch")]
    protonation_obligatory: Option<bool>,
    protonation_program_1: Option<String>,
    protonation_program_2: Option<String>,
    #[serde(default, rename = "protonation_pH_value", deserialize_with = "parser::number")]
    protonation_ph_value: Option<f64>,
    #[serde(default, deserialize_with = "parser::seconds")]
    cxcalc_protonation_timeout: Option<Duration>,
    #[serde(default, deserialize_with = "parser::seconds")]
    obabel_protonation_timeout: Option<Duration>,

    // --- Conformation ---
    #[serde(default, deserialize_with = "parser::switch")]
    conformation_generation: Option<bool>,
    #[serde(default, deserialize_with = "parser::switch")]
    conformation_obligatory: Option<bool>,
    conformation_program_1: Option<String>,
    conformation_program_2: Option<String>,
    #[serde(default, deserialize_with = "parser::seconds")]
    molconvert_conformation_timeout: Option<Duration>,
    #[serde(default, deserialize_with = "parser::seconds")]
    obabel_conformation_timeout: Option<Duration>,

    // --- Energy check ---
    #[serde(default, deserialize_with = "parser::switch")]
    energy_check: Option<bool>,
    #[serde(default, deserialize_with = "parser::number")]
    energy_max: Option<f64>,
    #[serde(default, deserialize_with = "parser::seconds")]
    energy_check_timeout: Option<Duration>,

    // --- Tranches and attributes ---
    #[serde(default, deserialize_with = "parser::switch")]
    tranche_assignments: Option<bool>,
    tranche_types: Option<Vec<String>>,
    tranche_partitions: Option<HashMap<String, Vec<f64>>>,
    tranche_mappings: Option<HashMap<String, HashMap<String, char>>>,
    attributes_to_generate: Option<Vec<String>>,

    // --- Output ---
    target_formats: Option<Vec<String>>,
    #[serde(default, deserialize_with = "parser::switch")]
    store_all_intermediate_logs: Option<bool>,
    #[serde(default, deserialize_with = "parser::seconds")]
    toolkit_timeout: Option<Duration>,

    // --- Storage ---
    job_storage_output_addressing: Option<String>,
    sharedfs_workflow_path: Option<PathBuf>,
    sharedfs_collection_path: Option<PathBuf>,
}

/// Per-stage keys of the control file.
struct StageKeys<'a> {
    enabled: Option<bool>,
    obligatory: Option<bool>,
    program_1: Option<&'a str>,
    program_2: Option<&'a str>,
    timeouts: [(EngineId, Option<Duration>); 2],
}

/// Everything the `run` command needs besides the work unit.
#[derive(Debug)]
pub struct RunSettings {
    pub pipeline: PipelineConfig,
    pub workflow_path: PathBuf,
    pub collection_path: PathBuf,
    pub addressing: Addressing,
    pub temp_path: PathBuf,
    pub mode: ExecutionMode,
}

impl PartialPipelineConfig {
    /// TOML by default, JSON when the file name ends in `.json`.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let is_json = path.extension().is_some_and(|ext| ext == "json");

        let parsed: std::result::Result<Self, anyhow::Error> = if is_json {
            serde_json::from_str(&content).map_err(anyhow::Error::from)
        } else {
            toml::from_str(&content).map_err(anyhow::Error::from)
        };
        parsed.map_err(|source| CliError::FileParsing {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Configuration embedded in a work unit.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| CliError::Config(format!("Invalid embedded configuration: {e}")))
    }

    fn stage_keys(&self, stage: Stage) -> StageKeys<'_> {
        match stage {
            Stage::Neutralization => StageKeys {
                enabled: self.neutralization,
                obligatory: self.neutralization_obligatory,
                program_1: self.neutralization_program_1.as_deref(),
                program_2: self.neutralization_program_2.as_deref(),
                timeouts: [
                    (EngineId::Standardizer, self.standardizer_neutralization_timeout),
                    (EngineId::Obabel, self.obabel_neutralization_timeout),
                ],
            },
            Stage::StereoisomerGeneration => StageKeys {
                enabled: self.stereoisomer_generation,
                obligatory: self.stereoisomer_obligatory,
                program_1: self.stereoisomer_generation_program_1.as_deref(),
                program_2: self.stereoisomer_generation_program_2.as_deref(),
                timeouts: [
                    (EngineId::Rdkit, self.rdkit_stereoisomer_timeout),
                    (EngineId::Cxcalc, self.cxcalc_stereoisomer_timeout),
                ],
            },
            Stage::Tautomerization => StageKeys {
                enabled: self.tautomerization,
                obligatory: self.tautomerization_obligatory,
                program_1: self.tautomerization_program_1.as_deref(),
                program_2: self.tautomerization_program_2.as_deref(),
                timeouts: [
                    (EngineId::Cxcalc, self.cxcalc_tautomerization_timeout),
                    (EngineId::Obabel, self.obabel_tautomerization_timeout),
                ],
            },
            Stage::Protonation => StageKeys {
                enabled: self.protonation_state_generation,
                obligatory: self.protonation_obligatory,
                program_1: self.protonation_program_1.as_deref(),
                program_2: self.protonation_program_2.as_deref(),
                timeouts: [
                    (EngineId::Cxcalc, self.cxcalc_protonation_timeout),
                    (EngineId::Obabel, self.obabel_protonation_timeout),
                ],
            },
            Stage::Conformation => StageKeys {
                enabled: self.conformation_generation,
                obligatory: self.conformation_obligatory,
                program_1: self.conformation_program_1.as_deref(),
                program_2: self.conformation_program_2.as_deref(),
                timeouts: [
                    (EngineId::Molconvert, self.molconvert_conformation_timeout),
                    (EngineId::Obabel, self.obabel_conformation_timeout),
                ],
            },
        }
    }

    fn stage_config(&self, stage: Stage, defaults: &DefaultsConfig) -> Result<StageConfig> {
        let keys = self.stage_keys(stage);
        let (default_1, default_2) = defaults.programs(stage);

        let mut config = StageConfig::from_names(
            stage,
            keys.program_1.unwrap_or(default_1),
            keys.program_2.unwrap_or(default_2),
        )?
        .enabled(keys.enabled.unwrap_or(false))
        .obligatory(keys.obligatory.unwrap_or(false));

        for (engine, timeout) in keys.timeouts {
            if let Some(timeout) = timeout {
                config = config.with_timeout(engine, timeout);
            }
        }
        Ok(config)
    }

    /// Builds the immutable core configuration from the file values alone.
    pub fn build_pipeline(&self) -> Result<PipelineConfig> {
        let defaults = DefaultsConfig::default();

        let mode: NeutralizationMode = self
            .neutralization_mode
            .as_deref()
            .unwrap_or(&defaults.neutralization_mode)
            .parse()?;

        let mut builder = PipelineConfigBuilder::new()
            .desalting(
                self.desalting.unwrap_or(false),
                self.desalting_obligatory.unwrap_or(false),
            )
            .neutralization_mode(mode)
            .store_intermediate_logs(self.store_all_intermediate_logs.unwrap_or(false))
            .tool_timeout(
                self.toolkit_timeout
                    .unwrap_or(Duration::from_secs(defaults.toolkit_timeout_secs)),
            )
            .attributes(self.attributes_to_generate.iter().flatten().map(String::as_str));

        for stage in Stage::ALL {
            builder = builder.stage(stage, self.stage_config(stage, &defaults)?);
        }

        if let Some(ph) = self.protonation_ph_value {
            builder = builder.protonation_ph(ph);
        }

        if self.energy_check.unwrap_or(false) {
            let max = self.energy_max.ok_or_else(|| {
                CliError::Config("`energy_max` is required when `energy_check` is \"true\".".to_string())
            })?;
            let timeout = self
                .energy_check_timeout
                .unwrap_or(Duration::from_secs(defaults.energy_check_timeout_secs));
            builder = builder.energy_check(max, timeout);
        }

        if self.tranche_assignments.unwrap_or(false) {
            builder = builder
                .tranche_assignments(true)
                .tranche_types(self.tranche_types.iter().flatten().map(String::as_str));
            for (attribute, partitions) in self.tranche_partitions.iter().flatten() {
                builder = builder.tranche_partitions(attribute.as_str(), partitions.clone());
            }
            for (attribute, mapping) in self.tranche_mappings.iter().flatten() {
                builder = builder.tranche_mapping(attribute.as_str(), mapping.clone());
            }
        }

        if let Some(formats) = &self.target_formats {
            builder = builder.target_formats(formats.iter().map(String::as_str));
        }

        Ok(builder.build()?)
    }

    /// Command-line values take precedence over file values, which take
    /// precedence over built-in defaults.
    pub fn merge_with_cli(self, args: &RunArgs) -> Result<RunSettings> {
        let defaults = DefaultsConfig::default();
        let pipeline = self.build_pipeline()?;

        let workflow_path = args
            .workflow_path
            .clone()
            .or(self.sharedfs_workflow_path)
            .ok_or_else(|| {
                CliError::Config(
                    "`sharedfs_workflow_path` is required either in the config file or via --workflow-path."
                        .to_string(),
                )
            })?;
        let collection_path = args
            .collection_path
            .clone()
            .or(self.sharedfs_collection_path)
            .ok_or_else(|| {
                CliError::Config(
                    "`sharedfs_collection_path` is required either in the config file or via --collection-path."
                        .to_string(),
                )
            })?;

        let addressing = self
            .job_storage_output_addressing
            .as_deref()
            .unwrap_or(&defaults.output_addressing)
            .parse::<Addressing>()
            .map_err(|e| CliError::Config(e.to_string()))?;

        let mode = match (args.sequential, args.workers) {
            (true, _) => ExecutionMode::Sequential,
            (false, Some(0)) => {
                return Err(CliError::Argument("--workers must be at least 1".to_string()));
            }
            (false, Some(workers)) => ExecutionMode::ParallelWith { workers },
            (false, None) => ExecutionMode::Parallel,
        };

        Ok(RunSettings {
            pipeline,
            workflow_path,
            collection_path,
            addressing,
            temp_path: args.temp_path.clone().unwrap_or_else(std::env::temp_dir),
            mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use ligprep::core::models::format::TargetFormat;
    use ligprep::engine::stage::EngineChoice;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    const TOML_CONFIG: &str = r#"
desalting = "true"
desalting_obligatory = "false"
neutralization = "true"
neutralization_mode = "only_genuine_desalting"
neutralization_program_1 = "standardizer"
neutralization_program_2 = "obabel"
obabel_neutralization_timeout = "10"
tautomerization = "true"
tautomerization_obligatory = "true"
tautomerization_program_1 = "obabel"
tautomerization_program_2 = "none"
protonation_state_generation = "false"
protonation_pH_value = "7.4"
energy_check = "true"
energy_max = "17"
tranche_assignments = "true"
tranche_types = ["hbd_obabel", "formalcharge"]
attributes_to_generate = ["mw_obabel"]
target_formats = ["pdbqt", "smi"]
store_all_intermediate_logs = "true"
job_storage_output_addressing = "hash"
sharedfs_workflow_path = "/shared/workflow"
sharedfs_collection_path = "/shared/collections"

[tranche_partitions]
hbd_obabel = [0, 1, 2]

[tranche_mappings.formalcharge]
"-1" = "A"
"0" = "B"
"1" = "C"
"#;

    fn write_config(name: &str, content: &str) -> (TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["ligprep", "run", "--workunit", "wu.json.gz", "--subjob", "1"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Run(args) => args,
            Commands::Validate(_) => unreachable!(),
        }
    }

    #[test]
    fn toml_control_file_builds_the_pipeline() {
        let (_dir, path) = write_config("pipeline.toml", TOML_CONFIG);
        let pipeline = PartialPipelineConfig::from_file(&path)
            .unwrap()
            .build_pipeline()
            .unwrap();

        assert!(pipeline.desalting.enabled);
        assert!(!pipeline.desalting.obligatory);
        assert_eq!(
            pipeline.neutralization_mode,
            NeutralizationMode::OnlyGenuineDesalting
        );

        let neutralization = pipeline.stage(Stage::Neutralization);
        assert!(neutralization.enabled);
        assert_eq!(
            neutralization.preferences(),
            [
                EngineChoice::Engine(EngineId::Standardizer),
                EngineChoice::Engine(EngineId::Obabel)
            ]
        );
        assert_eq!(
            neutralization.timeout_for(EngineId::Obabel),
            Duration::from_secs(10)
        );

        assert!(pipeline.stage(Stage::Tautomerization).obligatory);
        assert!(!pipeline.stage(Stage::Protonation).enabled);
        assert!(!pipeline.stage(Stage::Conformation).enabled);
        assert_eq!(pipeline.energy_check.map(|e| e.max_kj_per_mol), Some(17.0));
        assert!(pipeline.tranche.is_some());
        assert_eq!(
            pipeline.target_formats,
            [TargetFormat::Pdbqt, TargetFormat::Smi]
        );
        assert!(pipeline.store_intermediate_logs);
    }

    #[test]
    fn json_control_file_is_selected_by_extension() {
        let json = r#"{
            "protonation_state_generation": "true",
            "protonation_program_1": "cxcalc",
            "protonation_program_2": "obabel",
            "protonation_pH_value": "6.5",
            "target_formats": ["smi"]
        }"#;
        let (_dir, path) = write_config("pipeline.json", json);
        let pipeline = PartialPipelineConfig::from_file(&path)
            .unwrap()
            .build_pipeline()
            .unwrap();

        assert!(pipeline.stage(Stage::Protonation).enabled);
        assert_eq!(pipeline.protonation_ph, 6.5);
    }

    #[test]
    fn unknown_keys_are_rejected_at_load_time() {
        let (_dir, path) = write_config("pipeline.toml", "target_formats = [\"smi\"]\nselfies = \"true\"\n");
        let err = PartialPipelineConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, CliError::FileParsing { .. }));
    }

    #[test]
    fn switches_must_be_literal_strings() {
        let (_dir, path) = write_config("pipeline.toml", "desalting = \"yes\"\n");
        assert!(PartialPipelineConfig::from_file(&path).is_err());
    }

    #[test]
    fn engine_outside_the_stage_set_is_a_config_error() {
        let config: PartialPipelineConfig = toml::from_str(
            "target_formats = [\"smi\"]\nconformation_generation = \"true\"\nconformation_program_1 = \"rdkit\"\n",
        )
        .unwrap();
        let err = config.build_pipeline().unwrap_err();
        assert!(matches!(err, CliError::Config(msg) if msg.contains("rdkit")));
    }

    #[test]
    fn missing_target_formats_is_reported() {
        let err = PartialPipelineConfig::default().build_pipeline().unwrap_err();
        assert!(matches!(err, CliError::Config(msg) if msg.contains("target_formats")));
    }

    #[test]
    fn energy_check_requires_a_maximum() {
        let config: PartialPipelineConfig =
            toml::from_str("target_formats = [\"smi\"]\nenergy_check = \"true\"\n").unwrap();
        let err = config.build_pipeline().unwrap_err();
        assert!(matches!(err, CliError::Config(msg) if msg.contains("energy_max")));
    }

    #[test]
    fn cli_arguments_override_file_values() {
        let config: PartialPipelineConfig = toml::from_str(TOML_CONFIG).unwrap();
        let args = run_args(&[
            "--workflow-path",
            "/elsewhere/workflow",
            "--temp-path",
            "/scratch",
            "--workers",
            "8",
        ]);
        let settings = config.merge_with_cli(&args).unwrap();

        assert_eq!(settings.workflow_path, PathBuf::from("/elsewhere/workflow"));
        assert_eq!(settings.collection_path, PathBuf::from("/shared/collections"));
        assert_eq!(settings.addressing, Addressing::Hash);
        assert_eq!(settings.temp_path, PathBuf::from("/scratch"));
        assert_eq!(settings.mode, ExecutionMode::ParallelWith { workers: 8 });
    }

    #[test]
    fn storage_paths_are_required() {
        let config: PartialPipelineConfig = toml::from_str("target_formats = [\"smi\"]\n").unwrap();
        let err = config.merge_with_cli(&run_args(&[])).unwrap_err();
        assert!(matches!(err, CliError::Config(msg) if msg.contains("sharedfs_workflow_path")));
    }

    #[test]
    fn sequential_flag_selects_sequential_mode() {
        let config: PartialPipelineConfig = toml::from_str(TOML_CONFIG).unwrap();
        let settings = config.merge_with_cli(&run_args(&["--sequential"])).unwrap();
        assert_eq!(settings.mode, ExecutionMode::Sequential);
    }

    #[test]
    fn zero_workers_is_an_argument_error() {
        let config: PartialPipelineConfig = toml::from_str(TOML_CONFIG).unwrap();
        let err = config.merge_with_cli(&run_args(&["--workers", "0"])).unwrap_err();
        assert!(matches!(err, CliError::Argument(_)));
    }

    #[test]
    fn embedded_configuration_is_accepted() {
        let value = serde_json::json!({ "target_formats": ["pdb"], "desalting": "true" });
        let pipeline = PartialPipelineConfig::from_value(value)
            .unwrap()
            .build_pipeline()
            .unwrap();
        assert!(pipeline.desalting.enabled);
        assert_eq!(pipeline.target_formats, [TargetFormat::Pdb]);
    }
}
