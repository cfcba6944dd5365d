use super::ids::{StereoisomerId, TautomerId};
use super::ligand::{Ligand, Stereoisomer, Tautomer};
use super::node::{NodeLog, NodeStatus};
use indexmap::IndexMap;
use serde::Serialize;
use slotmap::{SecondaryMap, SlotMap};
use std::time::Duration;

/// Arena holding one ligand and every node derived from it.
///
/// Children refer to their parent by id; the tree owns all nodes. Keys are
/// assigned from zero-based sibling indices in insertion order.
#[derive(Debug)]
pub struct LigandTree {
    pub ligand: Ligand,
    stereoisomers: SlotMap<StereoisomerId, Stereoisomer>,
    tautomers: SlotMap<TautomerId, Tautomer>,
    stereoisomer_order: Vec<StereoisomerId>,
    children: SecondaryMap<StereoisomerId, Vec<TautomerId>>,
}

impl LigandTree {
    pub fn new(ligand: Ligand) -> Self {
        Self {
            ligand,
            stereoisomers: SlotMap::with_key(),
            tautomers: SlotMap::with_key(),
            stereoisomer_order: Vec::new(),
            children: SecondaryMap::new(),
        }
    }

    pub fn add_stereoisomer(&mut self, smiles: impl Into<String>) -> StereoisomerId {
        let index = self.stereoisomer_order.len();
        let key = format!("{}_S{}", self.ligand.key, index);
        let id = self.stereoisomers.insert(Stereoisomer {
            key,
            smi: smiles.into(),
            index,
            remarks: self.ligand.remarks.clone(),
            log: NodeLog::new(),
            seconds: 0.0,
        });
        self.stereoisomer_order.push(id);
        self.children.insert(id, Vec::new());
        id
    }

    /// Adds a tautomer under `parent`. Returns `None` if `parent` is not part
    /// of this tree.
    pub fn add_tautomer(
        &mut self,
        parent: StereoisomerId,
        smiles: impl Into<String>,
    ) -> Option<TautomerId> {
        let stereoisomer = self.stereoisomers.get(parent)?;
        let siblings = self.children.get(parent)?;
        let index = siblings.len();
        let tautomer = Tautomer {
            key: format!("{}_T{}", stereoisomer.key, index),
            smi: smiles.into(),
            smi_stereoisomer: stereoisomer.smi.clone(),
            smi_original: self.ligand.smi.clone(),
            smi_protomer: None,
            index,
            remarks: stereoisomer.remarks.clone(),
            log: NodeLog::new(),
            seconds: 0.0,
            attr: IndexMap::new(),
            tranche_string: None,
            parent,
            intermediate_dir: None,
            pdb_file: None,
        };
        let id = self.tautomers.insert(tautomer);
        self.children.get_mut(parent)?.push(id);
        Some(id)
    }

    pub fn stereoisomer(&self, id: StereoisomerId) -> Option<&Stereoisomer> {
        self.stereoisomers.get(id)
    }

    pub fn stereoisomer_mut(&mut self, id: StereoisomerId) -> Option<&mut Stereoisomer> {
        self.stereoisomers.get_mut(id)
    }

    pub fn tautomer(&self, id: TautomerId) -> Option<&Tautomer> {
        self.tautomers.get(id)
    }

    /// Splits the borrow so a tautomer can be mutated while the root ligand
    /// is read.
    pub fn tautomer_with_ligand_mut(&mut self, id: TautomerId) -> Option<(&Ligand, &mut Tautomer)> {
        let tautomer = self.tautomers.get_mut(id)?;
        Some((&self.ligand, tautomer))
    }

    pub fn stereoisomer_ids(&self) -> &[StereoisomerId] {
        &self.stereoisomer_order
    }

    pub fn tautomer_ids(&self, parent: StereoisomerId) -> &[TautomerId] {
        self.children.get(parent).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Consumes the tree into the record handed back to the scheduler, in
    /// enumeration order.
    pub fn into_completion(mut self, elapsed: Duration) -> CompletionRecord {
        let mut stereoisomers = IndexMap::with_capacity(self.stereoisomers.len());
        let mut tautomers = IndexMap::with_capacity(self.tautomers.len());
        for stereo_id in &self.stereoisomer_order {
            if let Some(children) = self.children.get(*stereo_id) {
                for tautomer_id in children {
                    if let Some(tautomer) = self.tautomers.remove(*tautomer_id) {
                        tautomers.insert(tautomer.key.clone(), tautomer);
                    }
                }
            }
            if let Some(stereoisomer) = self.stereoisomers.remove(*stereo_id) {
                stereoisomers.insert(stereoisomer.key.clone(), stereoisomer);
            }
        }
        CompletionRecord {
            status: self.ligand.log.status,
            base_ligand: self.ligand,
            stereoisomers,
            tautomers,
            seconds: elapsed.as_secs_f64(),
        }
    }
}

/// Ligand-level aggregate returned by the fan-out processor.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRecord {
    pub base_ligand: Ligand,
    pub stereoisomers: IndexMap<String, Stereoisomer>,
    pub tautomers: IndexMap<String, Tautomer>,
    pub status: NodeStatus,
    pub seconds: f64,
}
