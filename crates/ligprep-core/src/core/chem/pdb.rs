//! Post-processing of PDB-style files produced by external toolkits.

use super::ChemError;
use regex::Regex;
use std::sync::LazyLock;

static UNNAMED_RESIDUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" UN[LK] ").expect("valid residue regex"));
static CONVERTED_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"TITLE|SOURCE|KEYWDS|EXPDTA|REVDAT|HEADER|AUTHOR|REMARK\s+Name")
        .expect("valid header regex")
});

fn is_atom_record(line: &str) -> bool {
    line.starts_with("ATOM") || line.starts_with("HETATM")
}

fn coordinates(line: &str) -> Vec<f64> {
    if line.len() >= 54 && line.is_char_boundary(30) && line.is_char_boundary(54) {
        let fields = [&line[30..38], &line[38..46], &line[46..54]];
        let parsed: Vec<f64> = fields
            .iter()
            .filter_map(|f| f.trim().parse::<f64>().ok())
            .collect();
        if parsed.len() == 3 {
            return parsed;
        }
    }
    line.split_whitespace()
        .skip(5)
        .take(3)
        .filter_map(|f| f.parse::<f64>().ok())
        .collect()
}

/// True if at least one atom record carries a non-zero coordinate.
pub fn has_nonzero_coordinates(content: &str) -> bool {
    content
        .lines()
        .map(str::trim_start)
        .filter(|line| is_atom_record(line))
        .any(|line| coordinates(line).iter().any(|c| *c != 0.0))
}

/// Rejects empty files and files whose atoms all sit at the origin.
pub fn validate_geometry(content: &str) -> Result<(), ChemError> {
    if content.trim().is_empty() {
        return Err(ChemError::EmptyGeometry);
    }
    if !has_nonzero_coordinates(content) {
        return Err(ChemError::FlatGeometry);
    }
    Ok(())
}

/// Rewrites a freshly generated PDB: compound line and remark block first,
/// toolkit `COMPND`/`AUTHOR` records and blank lines dropped, anonymous
/// residues renamed to `LIG`.
pub fn finalize_generated_pdb(raw: &str, key: &str, remark_block: &str) -> String {
    let mut out = format!("COMPND    Compound: {key}\n");
    if !remark_block.is_empty() {
        out.push_str(remark_block);
        out.push('\n');
    }
    for line in raw.lines() {
        if line.contains("COMPND") || line.contains("AUTHOR") || line.trim().is_empty() {
            continue;
        }
        out.push_str(&UNNAMED_RESIDUE.replace_all(line, " LIG "));
        out.push('\n');
    }
    out
}

/// Cleans one line of a converted output file. Returns `None` for lines that
/// are dropped. `source_path` is replaced by the molecule key.
pub fn clean_converted_line(
    line: &str,
    pdb_like: bool,
    source_path: &str,
    key: &str,
) -> Option<String> {
    let mut line = line.to_string();
    if pdb_like {
        if CONVERTED_HEADER.is_match(&line) || line.trim().is_empty() {
            return None;
        }
        line = UNNAMED_RESIDUE.replace_all(&line, " LIG ").into_owned();
    }
    if !source_path.is_empty() {
        line = line.replace(source_path, key);
    }
    Some(line)
}
