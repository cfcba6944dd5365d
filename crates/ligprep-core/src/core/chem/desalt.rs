use super::ChemError;

/// Outcome of stripping counter-ions from a structure string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesaltResult {
    pub smiles: String,
    pub fragments: usize,
}

impl DesaltResult {
    pub fn was_salt(&self) -> bool {
        self.fragments > 1
    }

    /// Short status text: `genuine` when fragments were removed.
    pub fn status_text(&self) -> &'static str {
        if self.was_salt() { "genuine" } else { "untouched" }
    }

    pub fn remark(&self) -> String {
        if self.was_salt() {
            format!(
                "The ligand was desalted by extracting the largest organic fragment (out of {}) from the original structure.",
                self.fragments
            )
        } else {
            "The ligand was originally not a salt, therefore no desalting was carried out."
                .to_string()
        }
    }
}

/// First whitespace-delimited token of an input line. Collection rows may
/// carry trailing annotations after the structure.
pub fn first_token(smiles: &str) -> &str {
    smiles.split_whitespace().next().unwrap_or("")
}

/// Keeps the longest `.`-separated fragment of the first token. Ties keep the
/// earlier fragment.
pub fn desalt(smiles: &str) -> Result<DesaltResult, ChemError> {
    let token = first_token(smiles);
    if token.is_empty() {
        return Err(ChemError::EmptyStructure);
    }

    let fragments: Vec<&str> = token.split('.').filter(|f| !f.is_empty()).collect();
    let largest = fragments
        .iter()
        .copied()
        .reduce(|best, f| if f.len() > best.len() { f } else { best })
        .ok_or(ChemError::EmptyStructure)?;

    Ok(DesaltResult {
        smiles: largest.to_string(),
        fragments: fragments.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_fragment_is_untouched() {
        let result = desalt("CCO some-comment").unwrap();
        assert_eq!(result.smiles, "CCO");
        assert_eq!(result.fragments, 1);
        assert_eq!(result.status_text(), "untouched");
    }

    #[test]
    fn salt_keeps_longest_fragment() {
        let result = desalt("[Na+].CC(=O)[O-].Cl").unwrap();
        assert_eq!(result.smiles, "CC(=O)[O-]");
        assert_eq!(result.fragments, 3);
        assert_eq!(result.status_text(), "genuine");
        assert!(result.remark().contains("out of 3"));
    }

    #[test]
    fn blank_input_fails() {
        assert_eq!(desalt("   "), Err(ChemError::EmptyStructure));
        assert_eq!(desalt("."), Err(ChemError::EmptyStructure));
    }
}
