//! Open Babel driven through its command-line tools.

use super::error::EngineError;
use super::process::{ProcessOutput, run_checked, run_command};
use super::stage::{EngineId, EngineOutput, EngineRequest, Stage, StageEngine, Toolkit};
use crate::core::models::format::TargetFormat;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};

const OBABEL: &str = "obabel";
const OBTAUTOMER: &str = "obtautomer";
const OBPROP: &str = "obprop";
const OBENERGY: &str = "obenergy";

const VERSION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Default)]
pub struct OpenBabel {
    version: OnceLock<String>,
}

impl OpenBabel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Version reported by `obabel -V`, queried once.
    pub fn version(&self) -> &str {
        self.version.get_or_init(|| {
            run_command(OBABEL, &["-V"], VERSION_TIMEOUT)
                .ok()
                .and_then(|(_, output)| parse_version(&output.stdout))
                .unwrap_or_else(|| {
                    warn!("Could not determine the Open Babel version.");
                    "unknown".to_string()
                })
        })
    }

    fn neutralize(&self, request: &EngineRequest<'_>) -> Result<EngineOutput, EngineError> {
        let input = write_input(request, "neutra")?;
        let output = scratch_file(request, "neutra", "output.smi");
        let (input, output_arg) = (input.to_string_lossy(), output.to_string_lossy());
        run_checked(
            OBABEL,
            &["-ismi", &*input, "--neutralize", "-osmi", "-O", &*output_arg],
            request.timeout,
        )?;
        read_first_line(&output).map(EngineOutput::Structure)
    }

    fn tautomerize(&self, request: &EngineRequest<'_>) -> Result<EngineOutput, EngineError> {
        let input = write_input(request, "tauto")?;
        let input = input.to_string_lossy();
        let output = run_checked(OBTAUTOMER, &[&*input], request.timeout)?;
        Ok(EngineOutput::Variants(parse_tautomers(&output.stdout)))
    }

    fn protonate(&self, request: &EngineRequest<'_>) -> Result<EngineOutput, EngineError> {
        let input = write_input(request, "proto")?;
        let output = scratch_file(request, "proto", "output.smi");
        let ph = request.ph.to_string();
        let (input, output_arg) = (input.to_string_lossy(), output.to_string_lossy());
        run_checked(
            OBABEL,
            &["-p", &ph, "-ismi", &*input, "-osmi", "-O", &*output_arg],
            request.timeout,
        )?;
        read_first_line(&output).map(EngineOutput::Structure)
    }

    fn write_pdb(&self, request: &EngineRequest<'_>, embed: bool) -> Result<PathBuf, EngineError> {
        let target = request
            .output_path
            .ok_or_else(|| EngineError::execution(OBABEL, "no output path for the PDB file"))?;
        let input = write_input(request, "conf")?;
        let (input, target_arg) = (input.to_string_lossy(), target.to_string_lossy());

        let mut args = Vec::with_capacity(6);
        if embed {
            args.push("--gen3d");
        }
        args.extend(["-ismi", &*input, "-opdb", "-O", &*target_arg]);
        run_checked(OBABEL, &args, request.timeout)?;

        if !target.is_file() {
            return Err(EngineError::execution(OBABEL, "No PDB file generated"));
        }
        Ok(target.to_path_buf())
    }
}

fn scratch_file(request: &EngineRequest<'_>, tag: &str, suffix: &str) -> PathBuf {
    request
        .scratch_dir
        .join(format!("obabel.{tag}.{}_{suffix}", request.key))
}

fn write_input(request: &EngineRequest<'_>, tag: &str) -> Result<PathBuf, EngineError> {
    let path = scratch_file(request, tag, "input.smi");
    fs::write(&path, format!("{}\n", request.smiles))?;
    Ok(path)
}

fn read_first_line(path: &Path) -> Result<String, EngineError> {
    let content = fs::read_to_string(path)
        .map_err(|_| EngineError::execution(OBABEL, "No output file from obabel"))?;
    let line = content
        .lines()
        .next()
        .ok_or_else(|| EngineError::execution(OBABEL, "No output in file from obabel"))?;
    Ok(line.replace('\t', "").trim().to_string())
}

/// Third token of `obabel -V`, e.g. `Open Babel 3.1.0 -- Oct 21 2022`.
fn parse_version(stdout: &str) -> Option<String> {
    stdout.split_whitespace().nth(2).map(str::to_string)
}

/// One tautomer per line; the trailing summary line is dropped.
fn parse_tautomers(stdout: &str) -> Vec<String> {
    let mut lines: Vec<String> = stdout.lines().map(|l| l.trim().to_string()).collect();
    lines.pop();
    lines
}

/// `obprop` prints `<name> <value>` pairs.
fn parse_properties(stdout: &str, names: &[&str]) -> HashMap<String, String> {
    stdout
        .lines()
        .filter_map(|line| line.trim().split_once(char::is_whitespace))
        .filter(|(name, _)| names.contains(name))
        .map(|(name, value)| (name.to_string(), value.trim().to_string()))
        .collect()
}

/// Last token of the first line of an `--append` conversion.
fn parse_appended(stdout: &str) -> Option<String> {
    let tokens: Vec<&str> = stdout.lines().next()?.split_whitespace().collect();
    (tokens.len() >= 2).then(|| tokens[tokens.len() - 1].to_string())
}

impl StageEngine for OpenBabel {
    fn id(&self) -> EngineId {
        EngineId::Obabel
    }

    fn describe(&self) -> String {
        format!("Open Babel version {}", self.version())
    }

    fn run(&self, stage: Stage, request: &EngineRequest<'_>) -> Result<EngineOutput, EngineError> {
        debug!(stage = %stage, key = request.key, "Running Open Babel.");
        match stage {
            Stage::Neutralization => self.neutralize(request),
            Stage::Tautomerization => self.tautomerize(request),
            Stage::Protonation => self.protonate(request),
            Stage::Conformation => self.write_pdb(request, true).map(EngineOutput::Geometry),
            Stage::StereoisomerGeneration => Err(EngineError::execution(
                OBABEL,
                "stereoisomer generation is not supported",
            )),
        }
    }

    fn properties(
        &self,
        request: &EngineRequest<'_>,
        names: &[&str],
    ) -> Result<HashMap<String, String>, EngineError> {
        Toolkit::properties(self, request, names)
    }
}

impl Toolkit for OpenBabel {
    fn id(&self) -> EngineId {
        EngineId::Obabel
    }

    fn describe(&self) -> String {
        StageEngine::describe(self)
    }

    fn generate_pdb(&self, request: &EngineRequest<'_>) -> Result<(), EngineError> {
        self.write_pdb(request, false).map(|_| ())
    }

    fn energy_report(&self, pdb: &Path, timeout: Duration) -> Result<ProcessOutput, EngineError> {
        let pdb = pdb.to_string_lossy();
        let (_, output) = run_command(OBENERGY, &[&*pdb], timeout)?;
        Ok(output)
    }

    fn convert(
        &self,
        pdb: &Path,
        format: TargetFormat,
        output: &Path,
        timeout: Duration,
    ) -> Result<(), EngineError> {
        let (pdb, output_arg) = (pdb.to_string_lossy(), output.to_string_lossy());
        run_checked(
            OBABEL,
            &["-ipdb", &*pdb, "-o", format.as_str(), "-O", &*output_arg],
            timeout,
        )?;
        if !output.is_file() {
            return Err(EngineError::execution(OBABEL, "No output file generated"));
        }
        Ok(())
    }

    fn properties(
        &self,
        request: &EngineRequest<'_>,
        names: &[&str],
    ) -> Result<HashMap<String, String>, EngineError> {
        let input = write_input(request, "prop")?;
        let input = input.to_string_lossy();
        let (_, output) = run_command(OBPROP, &[&*input], request.timeout)?;
        if output.stdout.trim().is_empty() {
            return Err(EngineError::execution(OBPROP, "No output from obprop"));
        }
        Ok(parse_properties(&output.stdout, names))
    }

    fn appended_descriptor(
        &self,
        request: &EngineRequest<'_>,
        descriptor: &str,
    ) -> Result<String, EngineError> {
        let input = write_input(request, &format!("append_{descriptor}"))?;
        let input = input.to_string_lossy();
        let output = run_checked(
            OBABEL,
            &["-ismi", &*input, "-osmi", "--append", descriptor],
            request.timeout,
        )?;
        parse_appended(&output.stdout).ok_or_else(|| {
            EngineError::execution(OBABEL, format!("Unable to parse {descriptor} from obabel"))
        })
    }
}
