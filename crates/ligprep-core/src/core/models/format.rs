use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unsupported target format '{0}'. Expected one of: smi, pdb, pdbqt, mol2, sdf, mol.")]
pub struct UnknownFormat(pub String);

/// Output formats a finished tautomer can be exported to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Smi,
    Pdb,
    Pdbqt,
    Mol2,
    Sdf,
    Mol,
}

impl TargetFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetFormat::Smi => "smi",
            TargetFormat::Pdb => "pdb",
            TargetFormat::Pdbqt => "pdbqt",
            TargetFormat::Mol2 => "mol2",
            TargetFormat::Sdf => "sdf",
            TargetFormat::Mol => "mol",
        }
    }

    /// Formats whose atom records carry PDB-style coordinates.
    pub fn is_pdb_like(&self) -> bool {
        matches!(self, TargetFormat::Pdb | TargetFormat::Pdbqt)
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "smi" => Ok(TargetFormat::Smi),
            "pdb" => Ok(TargetFormat::Pdb),
            "pdbqt" => Ok(TargetFormat::Pdbqt),
            "mol2" => Ok(TargetFormat::Mol2),
            "sdf" => Ok(TargetFormat::Sdf),
            "mol" => Ok(TargetFormat::Mol),
            other => Err(UnknownFormat(other.to_string())),
        }
    }
}
