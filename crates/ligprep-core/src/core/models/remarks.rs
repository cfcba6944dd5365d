use super::format::TargetFormat;
use indexmap::IndexMap;
use serde::Serialize;

/// Remark slots attached to a node and rendered into output file headers.
///
/// The declaration order is the default rendering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RemarkKind {
    #[serde(rename = "basic")]
    Basic,
    #[serde(rename = "compound")]
    Compound,
    #[serde(rename = "smiles_original")]
    SmilesOriginal,
    #[serde(rename = "smiles_current")]
    SmilesCurrent,
    #[serde(rename = "desalting")]
    Desalting,
    #[serde(rename = "neutralization")]
    Neutralization,
    #[serde(rename = "stereoisomer")]
    Stereoisomer,
    #[serde(rename = "tautomerization")]
    Tautomerization,
    #[serde(rename = "protonation")]
    Protonation,
    #[serde(rename = "generation")]
    Generation,
    #[serde(rename = "conformation")]
    Conformation,
    #[serde(rename = "targetformat")]
    TargetFormat,
    #[serde(rename = "trancheassignment")]
    TrancheAssignment,
    #[serde(rename = "trancheassignment_attr")]
    TrancheAssignmentAttr,
    #[serde(rename = "additional_attr")]
    AdditionalAttr,
    #[serde(rename = "tranche_str")]
    TrancheStr,
    #[serde(rename = "date")]
    Date,
    #[serde(rename = "collection_key")]
    CollectionKey,
}

pub const DEFAULT_REMARK_ORDER: [RemarkKind; 18] = [
    RemarkKind::Basic,
    RemarkKind::Compound,
    RemarkKind::SmilesOriginal,
    RemarkKind::SmilesCurrent,
    RemarkKind::Desalting,
    RemarkKind::Neutralization,
    RemarkKind::Stereoisomer,
    RemarkKind::Tautomerization,
    RemarkKind::Protonation,
    RemarkKind::Generation,
    RemarkKind::Conformation,
    RemarkKind::TargetFormat,
    RemarkKind::TrancheAssignment,
    RemarkKind::TrancheAssignmentAttr,
    RemarkKind::AdditionalAttr,
    RemarkKind::TrancheStr,
    RemarkKind::Date,
    RemarkKind::CollectionKey,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Remark {
    Text(String),
    List(Vec<String>),
}

/// Line prefix convention of a remark block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemarkStyle {
    Pdb,
    Mol2,
}

impl RemarkStyle {
    pub fn for_format(format: TargetFormat) -> Option<Self> {
        match format {
            TargetFormat::Pdb | TargetFormat::Pdbqt => Some(RemarkStyle::Pdb),
            TargetFormat::Mol2 => Some(RemarkStyle::Mol2),
            _ => None,
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            RemarkStyle::Pdb => "REMARK    ",
            RemarkStyle::Mol2 => "# ",
        }
    }
}

/// Remarks keyed by slot. Keys are never removed once set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Remarks(IndexMap<RemarkKind, Remark>);

impl Remarks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, kind: RemarkKind, text: impl Into<String>) {
        self.0.insert(kind, Remark::Text(text.into()));
    }

    /// Appends an item to a list slot, creating the list if needed.
    pub fn push(&mut self, kind: RemarkKind, item: impl Into<String>) {
        let entry = self
            .0
            .entry(kind)
            .or_insert_with(|| Remark::List(Vec::new()));
        match entry {
            Remark::List(items) => items.push(item.into()),
            Remark::Text(_) => *entry = Remark::List(vec![item.into()]),
        }
    }

    /// Ensures a list slot exists, even if it stays empty.
    pub fn init_list(&mut self, kind: RemarkKind) {
        self.0.insert(kind, Remark::List(Vec::new()));
    }

    pub fn get(&self, kind: RemarkKind) -> Option<&Remark> {
        self.0.get(&kind)
    }

    pub fn contains(&self, kind: RemarkKind) -> bool {
        self.0.contains_key(&kind)
    }

    /// A copy of these remarks with one slot left out, used when a slot is
    /// rendered separately from the remark block.
    pub fn without(&self, kind: RemarkKind) -> Remarks {
        let mut copy = self.clone();
        copy.0.shift_remove(&kind);
        copy
    }

    /// Renders the remarks present in `order`, one line each. List slots expand
    /// to one ` * item` line per non-empty item; empty texts are skipped.
    pub fn render(&self, order: &[RemarkKind], style: RemarkStyle) -> String {
        let prefix = style.prefix();
        let mut lines = Vec::new();
        for kind in order {
            match self.0.get(kind) {
                Some(Remark::Text(text)) if !text.is_empty() => {
                    lines.push(format!("{prefix}{text}"));
                }
                Some(Remark::List(items)) => {
                    lines.extend(
                        items
                            .iter()
                            .filter(|item| !item.is_empty())
                            .map(|item| format!("{prefix} * {item}")),
                    );
                }
                _ => {}
            }
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_follows_order_table_not_insertion_order() {
        let mut remarks = Remarks::new();
        remarks.set(RemarkKind::CollectionKey, "Original Collection: c1");
        remarks.set(RemarkKind::Basic, "Small molecule (ligand)");
        remarks.set(RemarkKind::Desalting, "desalted");

        let rendered = remarks.render(&DEFAULT_REMARK_ORDER, RemarkStyle::Pdb);
        assert_eq!(
            rendered,
            "REMARK    Small molecule (ligand)\nREMARK    desalted\nREMARK    Original Collection: c1"
        );
    }

    #[test]
    fn render_expands_lists_and_skips_empty_entries() {
        let mut remarks = Remarks::new();
        remarks.set(RemarkKind::Desalting, "");
        remarks.push(RemarkKind::AdditionalAttr, "mw_file: 300");
        remarks.push(RemarkKind::AdditionalAttr, "");
        remarks.push(RemarkKind::AdditionalAttr, "logp_file: 2.1");

        let rendered = remarks.render(&DEFAULT_REMARK_ORDER, RemarkStyle::Mol2);
        assert_eq!(rendered, "#  * mw_file: 300\n#  * logp_file: 2.1");
    }

    #[test]
    fn render_with_custom_order_only_includes_listed_slots() {
        let mut remarks = Remarks::new();
        remarks.set(RemarkKind::Basic, "basic");
        remarks.set(RemarkKind::Date, "Created on today");
        remarks.set(RemarkKind::TargetFormat, "made by toolkit");

        let rendered = remarks.render(
            &[RemarkKind::TargetFormat, RemarkKind::Date],
            RemarkStyle::Pdb,
        );
        assert_eq!(
            rendered,
            "REMARK    made by toolkit\nREMARK    Created on today"
        );
    }

    #[test]
    fn without_leaves_original_untouched() {
        let mut remarks = Remarks::new();
        remarks.set(RemarkKind::Compound, "Compound: L1");
        let copy = remarks.without(RemarkKind::Compound);
        assert!(!copy.contains(RemarkKind::Compound));
        assert!(remarks.contains(RemarkKind::Compound));
    }

    #[test]
    fn serializes_with_snake_case_keys() {
        let mut remarks = Remarks::new();
        remarks.set(RemarkKind::TrancheStr, "Tranche: AB");
        let json = serde_json::to_string(&remarks).unwrap();
        assert_eq!(json, r#"{"tranche_str":"Tranche: AB"}"#);
    }
}
