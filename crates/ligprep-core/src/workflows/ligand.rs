use super::TaskContext;
use super::stage_remark;
use super::tautomer::process_tautomer;
use crate::core::chem::desalt::{desalt, first_token};
use crate::core::chem::descriptors::is_charged;
use crate::core::models::ids::StereoisomerId;
use crate::core::models::ligand::{Ligand, LigandRecord, Stereoisomer};
use crate::core::models::node::NodeStatus;
use crate::core::models::remarks::RemarkKind;
use crate::core::models::tree::{CompletionRecord, LigandTree};
use crate::engine::config::NeutralizationMode;
use crate::engine::error::{EngineError, NodeAborted};
use crate::engine::fallback::run_stage;
use crate::engine::stage::{EngineRequest, Stage};
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Runs one ligand through the whole pipeline and returns its completion
/// record. Never fails: every problem is recorded on the node it affects.
#[instrument(skip_all, fields(ligand = %record.key))]
pub fn process_ligand(task: &TaskContext<'_>, record: LigandRecord) -> CompletionRecord {
    let started = Instant::now();
    let mut tree = LigandTree::new(Ligand::from_record(record));
    tree.ligand.remarks.set(
        RemarkKind::CollectionKey,
        format!("Original Collection: {}", task.collection.key),
    );

    if first_token(&tree.ligand.smi).is_empty() {
        error!("Ligand skipped since its SMILES is blank.");
        tree.ligand
            .log
            .failed("input", "ligand skipped since SMILES is blank");
        tree.ligand.log.finish(NodeStatus::Failed);
        return tree.into_completion(started.elapsed());
    }

    match prepare_ligand(task, &mut tree.ligand) {
        Ok(stereoisomers) => {
            let total = stereoisomers.len();
            for (index, smiles) in stereoisomers.into_iter().enumerate() {
                info!(index, total, "Processing stereoisomer.");
                let id = tree.add_stereoisomer(first_token(&smiles));
                process_stereoisomer(task, &mut tree, id);
            }
            tree.ligand.log.finish(NodeStatus::Success);
        }
        Err(aborted) => {
            warn!(error = %aborted, "Ligand will be skipped.");
            tree.ligand.log.finish(NodeStatus::Failed);
        }
    }

    tree.into_completion(started.elapsed())
}

/// Desalting, neutralization and stereoisomer enumeration on the root.
fn prepare_ligand(task: &TaskContext<'_>, ligand: &mut Ligand) -> Result<Vec<String>, NodeAborted> {
    desalt_stage(task, ligand)?;
    neutralize_stage(task, ligand)?;
    enumerate_stereoisomers(task, ligand)
}

fn desalt_stage(task: &TaskContext<'_>, ligand: &mut Ligand) -> Result<(), NodeAborted> {
    let started = Instant::now();
    let config = task.pipeline.config.desalting;

    if config.enabled {
        match desalt(&ligand.smi) {
            Ok(result) => {
                ligand.log.succeeded("desalt", result.status_text());
                ligand.remarks.set(RemarkKind::Desalting, result.remark());
                ligand.number_of_fragments = result.fragments;
                ligand.smi_desalted = Some(result.smiles);
            }
            Err(err) => {
                warn!(error = %err, "The desalting procedure has failed.");
                ligand.log.failed("desalt", "desalting failed");
                if config.obligatory {
                    return Err(NodeAborted::new("desalt", err.into()));
                }
                ligand.smi_desalted = Some(first_token(&ligand.smi).to_string());
            }
        }
    } else {
        ligand.smi_desalted = Some(first_token(&ligand.smi).to_string());
    }

    ligand.log.time("desalt", started.elapsed());
    Ok(())
}

fn needs_neutralization(mode: NeutralizationMode, ligand: &Ligand) -> bool {
    let was_salt = ligand.number_of_fragments > 1;
    match mode {
        NeutralizationMode::Always => true,
        NeutralizationMode::OnlyGenuineDesalting => was_salt,
        NeutralizationMode::OnlyGenuineDesaltingAndIfCharged => {
            was_salt && is_charged(ligand.current_smiles())
        }
    }
}

fn neutralize_stage(task: &TaskContext<'_>, ligand: &mut Ligand) -> Result<(), NodeAborted> {
    let started = Instant::now();
    let pipeline = task.pipeline;
    let config = pipeline.config.stage(Stage::Neutralization);
    let desalted = ligand.current_smiles().to_string();

    if !config.enabled {
        ligand.smi_neutralized = Some(desalted);
        return Ok(());
    }

    if !needs_neutralization(pipeline.config.neutralization_mode, ligand) {
        debug!("Ligand does not need to be neutralized, leaving it untouched.");
        ligand.log.succeeded("neutralization", "untouched");
        ligand.smi_neutralized = Some(desalted);
        ligand.log.time("neutralization", started.elapsed());
        return Ok(());
    }

    let request = EngineRequest::new(&ligand.key, &desalted, task.scratch_dir);
    let outcome = run_stage(
        Stage::Neutralization,
        config,
        pipeline.registry,
        &request,
        &mut ligand.log,
    );
    let fatal = outcome.is_fatal(config.obligatory);
    match (outcome.engine, outcome.result) {
        (Some(engine), Ok(output)) => {
            ligand.log.succeeded("neutralization", "genuine");
            ligand.remarks.set(
                RemarkKind::Neutralization,
                stage_remark(Stage::Neutralization, engine, pipeline.config.protonation_ph),
            );
            ligand.smi_neutralized = Some(output.into_structure().unwrap_or(desalted));
        }
        (_, result) => {
            let err = result.err().unwrap_or_else(|| {
                EngineError::Configuration("No neutralization program remaining".to_string())
            });
            error!(error = %err, "The neutralization has failed.");
            ligand.log.failed("neutralization", format!("Failed {err}"));
            if fatal {
                return Err(NodeAborted::new("neutralization", err));
            }
            warn!("Ligand will be further processed without neutralization.");
            ligand.smi_neutralized = Some(desalted);
        }
    }

    ligand.log.time("neutralization", started.elapsed());
    Ok(())
}

fn enumerate_stereoisomers(
    task: &TaskContext<'_>,
    ligand: &mut Ligand,
) -> Result<Vec<String>, NodeAborted> {
    let started = Instant::now();
    let pipeline = task.pipeline;
    let config = pipeline.config.stage(Stage::StereoisomerGeneration);
    let current = ligand.current_smiles().to_string();

    if !config.enabled {
        return Ok(vec![current]);
    }

    let request = EngineRequest::new(&ligand.key, &current, task.scratch_dir);
    let outcome = run_stage(
        Stage::StereoisomerGeneration,
        config,
        pipeline.registry,
        &request,
        &mut ligand.log,
    );
    let fatal = outcome.is_fatal(config.obligatory);
    let variants = match (outcome.engine, outcome.result) {
        (Some(engine), Ok(output)) => {
            ligand.log.succeeded("stereoisomer", "");
            ligand.remarks.set(
                RemarkKind::Stereoisomer,
                stage_remark(Stage::StereoisomerGeneration, engine, pipeline.config.protonation_ph),
            );
            output.into_variants()
        }
        (_, result) => {
            let err = result.err().unwrap_or_else(|| {
                EngineError::Configuration("No stereoisomer program remaining".to_string())
            });
            error!(error = %err, smiles = %current, "The stereoisomer generation has failed.");
            ligand.log.failed("stereoisomer", format!("Failed {err}"));
            if fatal {
                return Err(NodeAborted::new("stereoisomer", err));
            }
            vec![current]
        }
    };

    ligand.log.time("stereoisomer", started.elapsed());
    Ok(variants)
}

fn process_stereoisomer(task: &TaskContext<'_>, tree: &mut LigandTree, id: StereoisomerId) {
    let started = Instant::now();
    let Some(stereoisomer) = tree.stereoisomer_mut(id) else {
        return;
    };

    let status = match enumerate_tautomers(task, stereoisomer) {
        Ok(tautomers) => {
            let total = tautomers.len();
            for (index, smiles) in tautomers.into_iter().enumerate() {
                debug!(index, total, "Processing tautomer.");
                if let Some(tautomer) = tree.add_tautomer(id, first_token(&smiles)) {
                    process_tautomer(task, tree, tautomer);
                }
            }
            NodeStatus::Success
        }
        Err(aborted) => {
            warn!(error = %aborted, "Stereoisomer will be skipped.");
            NodeStatus::Failed
        }
    };

    if let Some(stereoisomer) = tree.stereoisomer_mut(id) {
        stereoisomer.log.finish(status);
        stereoisomer.seconds = started.elapsed().as_secs_f64();
    }
}

fn enumerate_tautomers(
    task: &TaskContext<'_>,
    stereoisomer: &mut Stereoisomer,
) -> Result<Vec<String>, NodeAborted> {
    let started = Instant::now();
    let pipeline = task.pipeline;
    let config = pipeline.config.stage(Stage::Tautomerization);

    if !config.enabled {
        return Ok(vec![stereoisomer.smi.clone()]);
    }

    let request = EngineRequest::new(&stereoisomer.key, &stereoisomer.smi, task.scratch_dir);
    let outcome = run_stage(
        Stage::Tautomerization,
        config,
        pipeline.registry,
        &request,
        &mut stereoisomer.log,
    );
    let fatal = outcome.is_fatal(config.obligatory);
    let variants = match (outcome.engine, outcome.result) {
        (Some(engine), Ok(output)) => {
            stereoisomer.log.succeeded("tautomerization", "");
            stereoisomer.remarks.set(
                RemarkKind::Tautomerization,
                stage_remark(Stage::Tautomerization, engine, pipeline.config.protonation_ph),
            );
            output.into_variants()
        }
        (_, result) => {
            let err = result.err().unwrap_or_else(|| {
                EngineError::Configuration("No tautomerization program remaining".to_string())
            });
            error!(error = %err, smiles = %stereoisomer.smi, "The tautomerization has failed.");
            stereoisomer
                .log
                .failed("tautomerization", format!("Failed {err}"));
            if fatal {
                stereoisomer.log.time("tautomerization", started.elapsed());
                return Err(NodeAborted::new("tautomerization", err));
            }
            vec![stereoisomer.smi.clone()]
        }
    };

    stereoisomer.log.time("tautomerization", started.elapsed());
    Ok(variants)
}
