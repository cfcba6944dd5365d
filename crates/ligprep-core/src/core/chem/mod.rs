//! Pure chemistry helpers that do not call out to external engines.

pub mod descriptors;
pub mod desalt;
pub mod energy;
pub mod pdb;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ChemError {
    #[error("Structure string is empty")]
    EmptyStructure,

    #[error("Generated structure file is empty")]
    EmptyGeometry,

    #[error("The generated structure does not contain valid coordinates")]
    FlatGeometry,

    #[error("Energy report could not be parsed: {0}")]
    EnergyReport(String),

    #[error("Energy {energy_kj:.3} kJ/mol exceeds the maximum of {max_kj} kJ/mol")]
    EnergyTooHigh { energy_kj: f64, max_kj: f64 },
}
