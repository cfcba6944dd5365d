use super::ligand::{Stereoisomer, Tautomer};
use super::node::{NodeStatus, StatusEvent, Timer};
use super::tree::CompletionRecord;
use indexmap::IndexMap;
use serde::Serialize;

/// Identity of one input collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Collection {
    /// Key of the collection within its work unit, quoted in remarks.
    pub key: String,
    pub metatranche: String,
    pub tranche: String,
    pub name: String,
}

impl Collection {
    pub fn new(
        metatranche: impl Into<String>,
        tranche: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let (metatranche, tranche, name) = (metatranche.into(), tranche.into(), name.into());
        Self {
            key: format!("{metatranche}_{tranche}_{name}"),
            metatranche,
            tranche,
            name,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// `<metatranche>_<tranche>_<name>`, the string hashed for sharded paths.
    pub fn identity(&self) -> String {
        format!("{}_{}_{}", self.metatranche, self.tranche, self.name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LigandSummary {
    pub timers: Vec<Timer>,
    pub status: NodeStatus,
    pub status_sub: Vec<StatusEvent>,
    pub tautomers: IndexMap<String, Tautomer>,
    pub stereoisomers: IndexMap<String, Stereoisomer>,
    pub seconds: f64,
}

impl From<CompletionRecord> for LigandSummary {
    fn from(record: CompletionRecord) -> Self {
        let mut tautomers = record.tautomers;
        for tautomer in tautomers.values_mut() {
            tautomer.strip_transient();
        }
        let log = record.base_ligand.log;
        Self {
            timers: log.timers,
            status: record.status,
            status_sub: log.status_sub,
            tautomers,
            stereoisomers: record.stereoisomers,
            seconds: record.seconds,
        }
    }
}

/// Aggregate of every ligand of one collection.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectionSummary {
    pub ligands: IndexMap<String, LigandSummary>,
    pub seconds: f64,
}

impl CollectionSummary {
    pub fn count(&self, status: NodeStatus) -> usize {
        self.ligands.values().filter(|l| l.status == status).count()
    }
}
