//! Work units: the gzip-compressed JSON file that assigns collections to
//! subjobs.

use crate::error::{CliError, Result};
use flate2::read::GzDecoder;
use indexmap::IndexMap;
use ligprep::core::models::collection::Collection;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug)]
pub struct WorkUnit {
    /// Pipeline configuration shipped with the work unit, if any.
    #[serde(default)]
    pub config: Option<serde_json::Value>,
    pub subjobs: IndexMap<String, Subjob>,
}

#[derive(Deserialize, Debug)]
pub struct Subjob {
    pub collections: IndexMap<String, CollectionEntry>,
}

/// One collection of a subjob. Storage hints for other transports are ignored.
#[derive(Deserialize, Debug, Clone)]
pub struct CollectionEntry {
    pub metatranche: String,
    pub tranche: String,
    pub collection_name: String,
    pub fieldnames: Vec<String>,
}

impl CollectionEntry {
    pub fn collection(&self, key: &str) -> Collection {
        Collection::new(&self.metatranche, &self.tranche, &self.collection_name).with_key(key)
    }
}

impl WorkUnit {
    /// Reads a work unit; files ending in `.gz` are decompressed.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading work unit from file: {:?}", path);
        let file = File::open(path)?;
        let reader: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "gz") {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(BufReader::new(file))
        };
        serde_json::from_reader(reader).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn subjob(&self, id: &str) -> Result<&Subjob> {
        self.subjobs
            .get(id)
            .ok_or_else(|| CliError::WorkUnit(format!("There is no subjob with ID '{id}'")))
    }
}
