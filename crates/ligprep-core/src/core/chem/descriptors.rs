//! Text-level descriptors counted directly on a SMILES string.
//!
//! These are approximations that never parse the molecular graph: element
//! symbols that share letters with the counted ones are masked first.

use regex::Regex;
use std::sync::LazyLock;

static CHARGE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\-\]|\+\])").expect("valid charge regex"));
static ELECTRONEGATIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[NnOoSsPpFfXxBbIi]").expect("valid element regex"));

/// Whether the structure carries a bracketed formal charge.
pub fn is_charged(smiles: &str) -> bool {
    CHARGE_TOKEN.is_match(smiles)
}

pub fn positive_charge_count(smiles: &str) -> i64 {
    smiles.replace("+2", "++").matches('+').count() as i64
}

pub fn negative_charge_count(smiles: &str) -> i64 {
    smiles.replace("-2", "--").matches('-').count() as i64
}

pub fn formal_charge(smiles: &str) -> i64 {
    positive_charge_count(smiles) - negative_charge_count(smiles)
}

pub fn halogen_count(smiles: &str) -> i64 {
    ["F", "Cl", "Br", "I"]
        .iter()
        .map(|symbol| smiles.matches(symbol).count() as i64)
        .sum()
}

pub fn sulfur_count(smiles: &str) -> i64 {
    smiles.replace("Si", "").matches('S').count() as i64
}

pub fn nitrogen_oxygen_count(smiles: &str) -> i64 {
    let masked = smiles.replace("Na", "");
    masked.chars().filter(|c| matches!(c, 'N' | 'O' | 'n' | 'o')).count() as i64
}

pub fn electronegative_atom_count(smiles: &str) -> i64 {
    let masked = smiles.replace("Na", "").replace("Cl", "X").replace("Si", "");
    ELECTRONEGATIVE.find_iter(&masked).count() as i64
}
