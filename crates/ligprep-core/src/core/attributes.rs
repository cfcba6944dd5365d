//! Closed registry of per-tautomer attributes.
//!
//! Every attribute name accepted in configuration maps to exactly one way of
//! computing it. Unknown names are rejected when the configuration is built.

use super::chem::descriptors;
use phf::{Map, phf_map};
use std::fmt;

/// Text-level descriptors counted on the protonated SMILES.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Descriptor {
    FormalCharge,
    PositiveChargeCount,
    NegativeChargeCount,
    HalogenCount,
    SulfurCount,
    NitrogenOxygenCount,
    ElectronegativeAtomCount,
}

impl Descriptor {
    pub fn compute(&self, smiles: &str) -> i64 {
        match self {
            Descriptor::FormalCharge => descriptors::formal_charge(smiles),
            Descriptor::PositiveChargeCount => descriptors::positive_charge_count(smiles),
            Descriptor::NegativeChargeCount => descriptors::negative_charge_count(smiles),
            Descriptor::HalogenCount => descriptors::halogen_count(smiles),
            Descriptor::SulfurCount => descriptors::sulfur_count(smiles),
            Descriptor::NitrogenOxygenCount => descriptors::nitrogen_oxygen_count(smiles),
            Descriptor::ElectronegativeAtomCount => {
                descriptors::electronegative_atom_count(smiles)
            }
        }
    }
}

/// Toolkit family that owns a batch-queried property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenBabel,
    ChemAxon,
    Rdkit,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Provider::OpenBabel => "obabel",
            Provider::ChemAxon => "cxcalc",
            Provider::Rdkit => "rdkit",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeSource {
    Descriptor(Descriptor),
    /// Copied from the input record under the given column name.
    FromFile(&'static str),
    /// Read from a provider's property listing under the given name.
    Property {
        provider: Provider,
        name: &'static str,
    },
    /// Single Open Babel descriptor appended to a SMILES conversion.
    Appended(&'static str),
}

/// Value recorded when a provider cannot deliver a property.
pub const INVALID_VALUE: &str = "INVALID";

#[rustfmt::skip]
static ATTRIBUTES: Map<&'static str, AttributeSource> = phf_map! {
    "formalcharge" => AttributeSource::Descriptor(Descriptor::FormalCharge),
    "positivechargecount" => AttributeSource::Descriptor(Descriptor::PositiveChargeCount),
    "negativechargecount" => AttributeSource::Descriptor(Descriptor::NegativeChargeCount),
    "halogencount" => AttributeSource::Descriptor(Descriptor::HalogenCount),
    "sulfurcount" => AttributeSource::Descriptor(Descriptor::SulfurCount),
    "NOcount" => AttributeSource::Descriptor(Descriptor::NitrogenOxygenCount),
    "electronegativeatomcount" => AttributeSource::Descriptor(Descriptor::ElectronegativeAtomCount),

    "enamine_type" => AttributeSource::FromFile("enamine"),
    "mw_file" => AttributeSource::FromFile("mw"),
    "logp_file" => AttributeSource::FromFile("logp"),
    "hba_file" => AttributeSource::FromFile("hba"),
    "hbd_file" => AttributeSource::FromFile("hbd"),
    "rotb_file" => AttributeSource::FromFile("rotb"),
    "tpsa_file" => AttributeSource::FromFile("tpsa"),
    "logd_file" => AttributeSource::FromFile("logd"),
    "logs_file" => AttributeSource::FromFile("logs"),
    "heavyatomcount_file" => AttributeSource::FromFile("heavyatomcount"),
    "ringcount_file" => AttributeSource::FromFile("ringcount"),
    "aromaticringcount_file" => AttributeSource::FromFile("aromaticringcount"),
    "mr_file" => AttributeSource::FromFile("mr"),
    "formalcharge_file" => AttributeSource::FromFile("formalcharge"),
    "positivechargecount_file" => AttributeSource::FromFile("positivecharge"),
    "negativechargecount_file" => AttributeSource::FromFile("negativecharge"),
    "fsp3_file" => AttributeSource::FromFile("fsp3"),
    "chiralcentercount_file" => AttributeSource::FromFile("chiralcentercount"),
    "halogencount_file" => AttributeSource::FromFile("halogencount"),
    "sulfurcount_file" => AttributeSource::FromFile("sulfurcount"),
    "NOcount_file" => AttributeSource::FromFile("NOcount"),
    "electronegativeatomcount_file" => AttributeSource::FromFile("electronegativeatomcount"),

    "mw_obabel" => AttributeSource::Property { provider: Provider::OpenBabel, name: "mol_weight" },
    "logp_obabel" => AttributeSource::Property { provider: Provider::OpenBabel, name: "logP" },
    "tpsa_obabel" => AttributeSource::Property { provider: Provider::OpenBabel, name: "PSA" },
    "atomcount_obabel" => AttributeSource::Property { provider: Provider::OpenBabel, name: "num_atoms" },
    "bondcount_obabel" => AttributeSource::Property { provider: Provider::OpenBabel, name: "num_bonds" },
    "mr_obabel" => AttributeSource::Property { provider: Provider::OpenBabel, name: "MR" },
    "hba_obabel" => AttributeSource::Appended("HBA1"),
    "hbd_obabel" => AttributeSource::Appended("HBD"),

    "mw_jchem" => AttributeSource::Property { provider: Provider::ChemAxon, name: "mass" },
    "logp_jchem" => AttributeSource::Property { provider: Provider::ChemAxon, name: "logp" },
    "hbd_jchem" => AttributeSource::Property { provider: Provider::ChemAxon, name: "donorcount" },
    "hba_jchem" => AttributeSource::Property { provider: Provider::ChemAxon, name: "acceptorcount" },
    "rotb_jchem" => AttributeSource::Property { provider: Provider::ChemAxon, name: "rotatablebondcount" },
    "tpsa_jchem" => AttributeSource::Property { provider: Provider::ChemAxon, name: "polarsurfacearea" },
    "atomcount_jchem" => AttributeSource::Property { provider: Provider::ChemAxon, name: "atomcount" },
    "bondcount_jchem" => AttributeSource::Property { provider: Provider::ChemAxon, name: "bondcount" },
    "ringcount" => AttributeSource::Property { provider: Provider::ChemAxon, name: "ringcount" },
    "aromaticringcount" => AttributeSource::Property { provider: Provider::ChemAxon, name: "aromaticringcount" },
    "mr_jchem" => AttributeSource::Property { provider: Provider::ChemAxon, name: "refractivity" },
    "fsp3" => AttributeSource::Property { provider: Provider::ChemAxon, name: "fsp3" },
    "chiralcentercount" => AttributeSource::Property { provider: Provider::ChemAxon, name: "chiralcentercount" },
    "logd" => AttributeSource::Property { provider: Provider::ChemAxon, name: "logd" },
    "logs" => AttributeSource::Property { provider: Provider::ChemAxon, name: "logs" },
    "doublebondstereoisomercount_jchem" => AttributeSource::Property { provider: Provider::ChemAxon, name: "doublebondstereoisomercount" },
    "aromaticproportion_jchem" => AttributeSource::Property { provider: Provider::ChemAxon, name: "aromaticproportion" },

    "qed_rdkit" => AttributeSource::Property { provider: Provider::Rdkit, name: "qed" },
    "scaffold_rdkit" => AttributeSource::Property { provider: Provider::Rdkit, name: "scaffold" },
};

/// A registered attribute: its configured name and how it is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute {
    pub name: &'static str,
    pub source: AttributeSource,
}

impl Attribute {
    pub fn from_name(name: &str) -> Option<Self> {
        ATTRIBUTES
            .get_entry(name)
            .map(|(name, source)| Attribute {
                name: *name,
                source: *source,
            })
    }

    pub fn is_known(name: &str) -> bool {
        ATTRIBUTES.contains_key(name)
    }
}
