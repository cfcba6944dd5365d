use super::IoError;
use crate::core::models::collection::Collection;
use crate::core::models::ligand::LigandRecord;
use flate2::read::GzDecoder;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const KEY_COLUMN: &str = "ligand-name";
pub const SMILES_COLUMN: &str = "smi";

/// `<root>/<metatranche>/<tranche>/<name>.txt.gz`
pub fn collection_file_path(root: &Path, collection: &Collection) -> PathBuf {
    root.join(&collection.metatranche)
        .join(&collection.tranche)
        .join(format!("{}.txt.gz", collection.name))
}

/// Reads a gzip-compressed, tab-separated collection file without a header
/// row. `fieldnames` names the columns; every row becomes the attribute bag of
/// its record. Rows without a key are skipped.
pub fn read_collection(path: &Path, fieldnames: &[String]) -> Result<Vec<LigandRecord>, IoError> {
    let key_index = fieldnames
        .iter()
        .position(|f| f == KEY_COLUMN)
        .ok_or(IoError::MissingColumn(KEY_COLUMN))?;
    let smiles_index = fieldnames
        .iter()
        .position(|f| f == SMILES_COLUMN)
        .ok_or(IoError::MissingColumn(SMILES_COLUMN))?;

    let file = File::open(path).map_err(IoError::file(path))?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(GzDecoder::new(file));

    let mut records = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = row.map_err(|source| IoError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

        let Some(key) = row.get(key_index).filter(|k| !k.is_empty()) else {
            warn!(line = line + 1, path = %path.display(), "Skipping collection row without a ligand key.");
            continue;
        };
        let smiles = row.get(smiles_index).unwrap_or_default();

        let mut record = LigandRecord::new(key, smiles);
        for (name, value) in fieldnames.iter().zip(row.iter()) {
            record.file_data.insert(name.clone(), value.to_string());
        }
        records.push(record);
    }

    debug!(path = %path.display(), ligands = records.len(), "Read collection file.");
    Ok(records)
}
