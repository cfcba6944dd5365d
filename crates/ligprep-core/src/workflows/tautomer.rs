//! The per-tautomer pipeline: protonation, attributes, tranche assignment,
//! conformation or flat PDB generation, energy check and export.

use super::attributes::generate_attributes;
use super::export::export_formats;
use super::{TaskContext, stage_remark};
use crate::core::chem::energy::check_energy;
use crate::core::chem::pdb::{finalize_generated_pdb, validate_geometry};
use crate::core::models::ids::TautomerId;
use crate::core::models::ligand::{Ligand, Tautomer};
use crate::core::models::node::NodeStatus;
use crate::core::models::remarks::{DEFAULT_REMARK_ORDER, RemarkKind, RemarkStyle};
use crate::core::models::tree::LigandTree;
use crate::engine::error::{EngineError, NodeAborted};
use crate::engine::fallback::run_stage;
use crate::engine::stage::{EngineRequest, Stage};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, instrument, warn};

const PROTONATION_WARNING: &str = "WARNING: Molecule was not protonated at physiological pH (protonation with both obabel and cxcalc has failed)";

/// Runs the remaining pipeline on one tautomer and sets its terminal status.
#[instrument(skip_all, fields(tautomer = tracing::field::Empty))]
pub fn process_tautomer(task: &TaskContext<'_>, tree: &mut LigandTree, id: TautomerId) {
    let Some((ligand, tautomer)) = tree.tautomer_with_ligand_mut(id) else {
        return;
    };
    tracing::Span::current().record("tautomer", tautomer.key.as_str());
    let started = Instant::now();

    let status = match run_pipeline(task, ligand, tautomer) {
        Ok(()) => NodeStatus::Success,
        Err(aborted) => {
            error!(error = %aborted, "Tautomer processing failed.");
            NodeStatus::Failed
        }
    };
    tautomer.log.finish(status);
    tautomer.seconds = started.elapsed().as_secs_f64();
}

fn run_pipeline(
    task: &TaskContext<'_>,
    ligand: &Ligand,
    tautomer: &mut Tautomer,
) -> Result<(), NodeAborted> {
    let intermediate = task.intermediate_root.join(&tautomer.key);
    fs::create_dir_all(&intermediate)
        .map_err(|e| NodeAborted::new("intermediate-dir", e.into()))?;
    tautomer.intermediate_dir = Some(intermediate.clone());

    protonate(task, tautomer)?;
    annotate(tautomer);
    assign_attributes(task, ligand, tautomer)?;
    assign_tranche(task, tautomer)?;

    let pdb_file = intermediate.join("gen.pdb");
    build_structure(task, tautomer, &pdb_file)?;
    tautomer.pdb_file = Some(pdb_file.clone());

    check_structure_energy(task, tautomer, &pdb_file, &intermediate)?;
    export_formats(task, tautomer, &pdb_file, &intermediate);
    Ok(())
}

fn protonate(task: &TaskContext<'_>, tautomer: &mut Tautomer) -> Result<(), NodeAborted> {
    tautomer.smi_protomer = Some(tautomer.smi.clone());
    let pipeline = task.pipeline;
    let config = pipeline.config.stage(Stage::Protonation);
    if !config.enabled {
        return Ok(());
    }

    let ph = pipeline.config.protonation_ph;
    let request =
        EngineRequest::new(&tautomer.key, &tautomer.smi, task.scratch_dir).with_ph(ph);
    let outcome = run_stage(
        Stage::Protonation,
        config,
        pipeline.registry,
        &request,
        &mut tautomer.log,
    );
    let fatal = outcome.is_fatal(config.obligatory);
    match (outcome.engine, outcome.result) {
        (Some(engine), Ok(output)) => {
            tautomer.log.succeeded("protonation", "");
            tautomer
                .remarks
                .set(RemarkKind::Protonation, stage_remark(Stage::Protonation, engine, ph));
            if let Some(protomer) = output.into_structure() {
                tautomer.smi_protomer = Some(protomer);
            }
        }
        (_, result) => {
            let err = result.err().unwrap_or_else(|| {
                EngineError::Configuration("No protonation program remaining".to_string())
            });
            warn!(error = %err, "Both protonation attempts have failed.");
            tautomer.log.failed("protonation", err.to_string());
            if fatal {
                return Err(NodeAborted::new("protonation", err));
            }
            tautomer
                .remarks
                .set(RemarkKind::Protonation, PROTONATION_WARNING);
        }
    }
    Ok(())
}

fn annotate(tautomer: &mut Tautomer) {
    let current = format!("SMILES_current: {}", tautomer.current_smiles());
    let remarks = &mut tautomer.remarks;
    remarks.set(RemarkKind::Basic, "Small molecule (ligand)");
    remarks.set(RemarkKind::Compound, format!("Compound: {}", tautomer.key));
    remarks.set(
        RemarkKind::SmilesOriginal,
        format!("SMILES_orig: {}", tautomer.smi_original),
    );
    remarks.set(RemarkKind::SmilesCurrent, current);
}

fn assign_attributes(
    task: &TaskContext<'_>,
    ligand: &Ligand,
    tautomer: &mut Tautomer,
) -> Result<(), NodeAborted> {
    let started = Instant::now();
    let result = generate_attributes(task, ligand, tautomer);
    tautomer.log.time("attr-generation", started.elapsed());

    match result {
        Ok(values) => tautomer.attr = values,
        Err(err) => {
            tautomer.log.failed("attr-generation", err.to_string());
            return Err(NodeAborted::new("attr-generation", err));
        }
    }

    tautomer.remarks.init_list(RemarkKind::AdditionalAttr);
    for attribute in &task.pipeline.config.attributes {
        if let Some(value) = tautomer.attr.get(attribute.name) {
            let line = format!("{}: {}", attribute.name, value);
            tautomer.remarks.push(RemarkKind::AdditionalAttr, line);
        }
    }
    Ok(())
}

fn assign_tranche(task: &TaskContext<'_>, tautomer: &mut Tautomer) -> Result<(), NodeAborted> {
    let Some(scheme) = &task.pipeline.config.tranche else {
        tautomer.log.succeeded("tranche-assignment", "untouched");
        return Ok(());
    };
    let started = Instant::now();

    match scheme.assign(&tautomer.attr) {
        Ok(assignment) => {
            tautomer.log.succeeded("tranche-assignment", "");
            tautomer.log.time("tranche-assignment", started.elapsed());
            tautomer.remarks.init_list(RemarkKind::TrancheAssignmentAttr);
            for detail in assignment.details {
                tautomer.remarks.push(RemarkKind::TrancheAssignmentAttr, detail);
            }
            tautomer.remarks.set(
                RemarkKind::TrancheStr,
                format!("Tranche: {}", assignment.code),
            );
            debug!(code = %assignment.code, "Tranche assigned.");
            tautomer.tranche_string = Some(assignment.code);
            Ok(())
        }
        Err(err) => {
            error!(error = %err, "The tranche assignment has failed.");
            tautomer.log.failed("tranche-assignment", err.to_string());
            tautomer.log.time("tranche-assignment", started.elapsed());
            Err(NodeAborted::new("tranche-assignment", err.into()))
        }
    }
}

/// Writes the validated PDB to `pdb_file`: 3D conformation when enabled and
/// successful, otherwise a flat structure from the toolkit.
fn build_structure(
    task: &TaskContext<'_>,
    tautomer: &mut Tautomer,
    pdb_file: &Path,
) -> Result<(), NodeAborted> {
    let pipeline = task.pipeline;
    let config = pipeline.config.stage(Stage::Conformation);
    let raw_pdb = task.scratch_dir.join(format!("{}.raw.pdb", tautomer.key));
    let protomer = tautomer.current_smiles().to_string();

    if config.enabled {
        let started = Instant::now();
        let request =
            EngineRequest::new(&tautomer.key, &protomer, task.scratch_dir).with_output(&raw_pdb);
        let outcome = run_stage(
            Stage::Conformation,
            config,
            pipeline.registry,
            &request,
            &mut tautomer.log,
        );
        let fatal = outcome.is_fatal(config.obligatory);
        let result = match (outcome.engine, outcome.result) {
            (Some(engine), Ok(_)) => {
                let description = pipeline
                    .registry
                    .engine(engine)
                    .map(|e| e.describe())
                    .unwrap_or_else(|| engine.to_string());
                tautomer.remarks.set(
                    RemarkKind::Conformation,
                    format!("Generation of the 3D conformation was carried out by {description}"),
                );
                tautomer.remarks.set(
                    RemarkKind::TargetFormat,
                    "Format generated as part of conformation.",
                );
                write_final_pdb(tautomer, &raw_pdb, pdb_file)
            }
            (_, result) => Err(result.err().unwrap_or_else(|| {
                EngineError::Configuration("No conformation program remaining".to_string())
            })),
        };

        match result {
            Ok(()) => {
                tautomer.log.succeeded("conformation", "");
                tautomer.log.time("conformation", started.elapsed());
                return Ok(());
            }
            Err(err) => {
                error!(error = %err, "The conformation generation has failed.");
                tautomer.log.failed("conformation", err.to_string());
                tautomer.log.time("conformation", started.elapsed());
                if fatal {
                    return Err(NodeAborted::new("conformation", err));
                }
            }
        }
    }

    generate_flat_pdb(task, tautomer, &protomer, &raw_pdb, pdb_file)
}

fn generate_flat_pdb(
    task: &TaskContext<'_>,
    tautomer: &mut Tautomer,
    protomer: &str,
    raw_pdb: &Path,
    pdb_file: &Path,
) -> Result<(), NodeAborted> {
    let pipeline = task.pipeline;
    let toolkit = pipeline.registry.toolkit();
    let started = Instant::now();

    let request = EngineRequest::new(&tautomer.key, protomer, task.scratch_dir)
        .with_output(raw_pdb)
        .with_timeout(pipeline.config.tool_timeout);
    let result = toolkit.generate_pdb(&request).and_then(|()| {
        let content = fs::read_to_string(raw_pdb)?;
        validate_geometry(&content)?;
        Ok(())
    });
    let result = result.and_then(|()| {
        tautomer.remarks.set(
            RemarkKind::Generation,
            format!(
                "Generation of the the PDB file (without conformation generation) was carried out by {}",
                toolkit.describe()
            ),
        );
        tautomer
            .remarks
            .set(RemarkKind::TargetFormat, "Format generated as part of generation.");
        write_final_pdb(tautomer, raw_pdb, pdb_file)
    });
    tautomer
        .log
        .time(format!("{}_generation", toolkit.id()), started.elapsed());

    result.map_err(|err| {
        warn!(error = %err, "A successful PDB generation is mandatory.");
        tautomer.log.failed("pdb-generation", err.to_string());
        NodeAborted::new("pdb-generation", err)
    })
}

fn write_final_pdb(tautomer: &Tautomer, raw_pdb: &Path, pdb_file: &Path) -> Result<(), EngineError> {
    let raw = fs::read_to_string(raw_pdb)?;
    let remarks = tautomer
        .remarks
        .without(RemarkKind::Compound)
        .render(&DEFAULT_REMARK_ORDER, RemarkStyle::Pdb);
    fs::write(pdb_file, finalize_generated_pdb(&raw, &tautomer.key, &remarks))?;
    Ok(())
}

fn check_structure_energy(
    task: &TaskContext<'_>,
    tautomer: &mut Tautomer,
    pdb_file: &Path,
    intermediate: &Path,
) -> Result<(), NodeAborted> {
    let config = task.pipeline.config;
    let Some(energy) = config.energy_check else {
        return Ok(());
    };
    let started = Instant::now();
    let report = task
        .pipeline
        .registry
        .toolkit()
        .energy_report(pdb_file, energy.timeout);
    tautomer.log.time("obenergy", started.elapsed());

    let failure = match report {
        Err(err) => Some((err.to_string(), err)),
        Ok(output) => {
            if config.store_intermediate_logs {
                let log_file: PathBuf = intermediate.join("energy_check");
                if let Err(err) = fs::write(&log_file, output.transcript()) {
                    warn!(error = %err, "Could not save the energy report.");
                }
            }
            match check_energy(&output.stdout, energy.max_kj_per_mol) {
                Ok(energy_kj) => {
                    debug!(energy_kj, "Energy check passed.");
                    None
                }
                Err(err) => {
                    let report = output.stdout.lines().collect::<Vec<_>>().join("|");
                    let text = if report.is_empty() { err.to_string() } else { report };
                    Some((text, err.into()))
                }
            }
        }
    };

    match failure {
        None => {
            tautomer.log.succeeded("energy-check", "");
            Ok(())
        }
        Some((text, err)) => {
            warn!(error = %err, "Tautomer did not pass the energy check.");
            tautomer.log.failed("energy-check", text);
            Err(NodeAborted::new("energy-check", err))
        }
    }
}
