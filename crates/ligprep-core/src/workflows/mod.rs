//! # Workflows Module
//!
//! Top-level entry points: the fan-out tree processor that takes one ligand
//! through every stage, and the collection scheduler that runs it over all
//! ligands of a collection.
//!
//! - **Ligand** ([`ligand`]) - desalting, neutralization, stereoisomer and
//!   tautomer fan-out
//! - **Tautomer** ([`tautomer`]) - protonation, attributes, tranche assignment,
//!   conformation, energy check
//! - **Export** ([`export`]) - per-format output files of one tautomer
//! - **Collection** ([`collection`]) - task dispatch, aggregation and artifacts

mod attributes;
pub mod collection;
pub mod export;
pub mod ligand;
pub mod tautomer;

use crate::core::models::collection::Collection;
use crate::engine::context::PipelineContext;
use crate::engine::stage::{EngineId, Stage};
use std::path::Path;

/// Everything one ligand task reads. Only `scratch_dir` is private to the
/// task; the staging tree is shared by the whole collection.
#[derive(Clone, Copy)]
pub struct TaskContext<'a> {
    pub pipeline: PipelineContext<'a>,
    pub collection: &'a Collection,
    /// Collection-wide root of `complete/<format>/...` output directories.
    pub staging_dir: &'a Path,
    pub scratch_dir: &'a Path,
    /// Parent of the per-tautomer intermediate directories.
    pub intermediate_root: &'a Path,
}

fn vendor(engine: EngineId) -> &'static str {
    match engine {
        EngineId::Obabel => "Open Babel",
        EngineId::Cxcalc => "cxcalc of ChemAxon",
        EngineId::Rdkit => "RDKit",
        EngineId::Standardizer => "Standardizer of ChemAxon",
        EngineId::Molconvert => "molconvert of ChemAxon",
    }
}

/// Remark recorded when `engine` satisfied `stage`.
fn stage_remark(stage: Stage, engine: EngineId, ph: f64) -> String {
    let vendor = vendor(engine);
    match stage {
        Stage::Neutralization => format!("The compound was neutralized by {vendor}."),
        Stage::StereoisomerGeneration => format!("The stereoisomers were generated by {vendor}."),
        Stage::Tautomerization => format!("The tautomeric state was generated by {vendor}."),
        Stage::Protonation => {
            format!("The protonation state was generated at pH {ph} by {vendor}.")
        }
        Stage::Conformation => format!("The 3D conformation was generated by {vendor}."),
    }
}
