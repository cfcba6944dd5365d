use super::ids::StereoisomerId;
use super::node::NodeLog;
use super::remarks::Remarks;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// One row of an input collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LigandRecord {
    pub key: String,
    pub smiles: String,
    /// The whole source row, consulted only by attributes read from file.
    pub file_data: IndexMap<String, String>,
}

impl LigandRecord {
    pub fn new(key: impl Into<String>, smiles: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            smiles: smiles.into(),
            file_data: IndexMap::new(),
        }
    }

    pub fn with_file_data(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.file_data.insert(name.into(), value.into());
        self
    }
}

/// Root of a fan-out tree.
#[derive(Debug, Clone, Serialize)]
pub struct Ligand {
    pub key: String,
    pub smi: String,
    pub file_data: IndexMap<String, String>,
    #[serde(flatten)]
    pub log: NodeLog,
    pub remarks: Remarks,
    pub number_of_fragments: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smi_desalted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smi_neutralized: Option<String>,
}

impl Ligand {
    pub fn from_record(record: LigandRecord) -> Self {
        Self {
            key: record.key,
            smi: record.smiles,
            file_data: record.file_data,
            log: NodeLog::new(),
            remarks: Remarks::new(),
            number_of_fragments: 1,
            smi_desalted: None,
            smi_neutralized: None,
        }
    }

    /// The structure handed to stereoisomer enumeration: the neutralized form
    /// if present, else the desalted form, else the input.
    pub fn current_smiles(&self) -> &str {
        self.smi_neutralized
            .as_deref()
            .or(self.smi_desalted.as_deref())
            .unwrap_or(&self.smi)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Stereoisomer {
    pub key: String,
    pub smi: String,
    pub index: usize,
    pub remarks: Remarks,
    #[serde(flatten)]
    pub log: NodeLog,
    pub seconds: f64,
}

/// A computed property value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Integer(i64),
    Text(String),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Integer(v) => write!(f, "{v}"),
            AttributeValue::Text(v) => f.write_str(v),
        }
    }
}

/// Leaf of the fan-out tree; carries the rest of the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct Tautomer {
    pub key: String,
    pub smi: String,
    pub smi_stereoisomer: String,
    pub smi_original: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smi_protomer: Option<String>,
    pub index: usize,
    pub remarks: Remarks,
    #[serde(flatten)]
    pub log: NodeLog,
    pub seconds: f64,
    pub attr: IndexMap<String, AttributeValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tranche_string: Option<String>,
    #[serde(skip)]
    pub parent: StereoisomerId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intermediate_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdb_file: Option<PathBuf>,
}

impl Tautomer {
    /// The structure later stages work on: the protonated form if present.
    pub fn current_smiles(&self) -> &str {
        self.smi_protomer.as_deref().unwrap_or(&self.smi)
    }

    /// Drops working-directory handles before the tautomer is summarized.
    pub fn strip_transient(&mut self) {
        self.intermediate_dir = None;
        self.pdb_file = None;
    }
}
