//! Per-format export of a finished tautomer into the collection's staging
//! tree. A failed format is recorded and skipped; it never fails the tautomer.

use super::TaskContext;
use crate::core::chem::desalt::first_token;
use crate::core::chem::pdb::{clean_converted_line, has_nonzero_coordinates};
use crate::core::io::routing::format_dir;
use crate::core::models::format::TargetFormat;
use crate::core::models::ligand::Tautomer;
use crate::core::models::remarks::{DEFAULT_REMARK_ORDER, RemarkKind, RemarkStyle, Remarks};
use crate::engine::error::EngineError;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, instrument};

/// Writes one file per configured target format.
#[instrument(skip_all, fields(tautomer = %tautomer.key))]
pub fn export_formats(
    task: &TaskContext<'_>,
    tautomer: &mut Tautomer,
    pdb_file: &Path,
    intermediate: &Path,
) {
    let started = Instant::now();

    for &format in &task.pipeline.config.target_formats {
        let stage = format!("targetformat-generation({format})");
        match export_one(task, tautomer, format, pdb_file, intermediate) {
            Ok(path) => {
                debug!(%format, path = %path.display(), "Exported target format.");
                tautomer.log.succeeded(stage, "");
            }
            Err(err) => {
                error!(%format, error = %err, "Target format generation failed.");
                tautomer.log.failed(stage, err.to_string());
            }
        }
    }

    tautomer.log.time("targetformats", started.elapsed());
}

/// `<tranche>_<key>.<fmt>` when a tranche code was assigned, else `<key>.<fmt>`.
pub fn output_file_name(tautomer: &Tautomer, format: TargetFormat) -> String {
    match &tautomer.tranche_string {
        Some(code) => format!("{code}_{}.{format}", tautomer.key),
        None => format!("{}.{format}", tautomer.key),
    }
}

fn export_one(
    task: &TaskContext<'_>,
    tautomer: &mut Tautomer,
    format: TargetFormat,
    pdb_file: &Path,
    intermediate: &Path,
) -> Result<PathBuf, EngineError> {
    let dir = format_dir(task.staging_dir, format.as_str(), task.collection);
    fs::create_dir_all(&dir)?;
    let output = dir.join(output_file_name(tautomer, format));

    match format {
        TargetFormat::Smi => {
            fs::write(&output, format!("{}\n", first_token(tautomer.current_smiles())))?;
        }
        TargetFormat::Pdb => {
            fs::copy(pdb_file, &output)?;
        }
        _ => convert(task, tautomer, format, pdb_file, intermediate, &output)?,
    }
    Ok(output)
}

fn convert(
    task: &TaskContext<'_>,
    tautomer: &mut Tautomer,
    format: TargetFormat,
    pdb_file: &Path,
    intermediate: &Path,
    output: &Path,
) -> Result<(), EngineError> {
    let toolkit = task.pipeline.registry.toolkit();
    let started = Instant::now();
    let tmp = intermediate.join(format!("tmp.{format}"));

    let result = toolkit
        .convert(pdb_file, format, &tmp, task.pipeline.config.tool_timeout)
        .and_then(|()| read_converted(&tmp, format));
    let result = result.and_then(|converted| {
        let description = toolkit.describe();
        let header = remark_header(tautomer, format, &description);
        let source = pdb_file.to_string_lossy();

        let mut content = header;
        for line in converted.lines() {
            if let Some(line) =
                clean_converted_line(line, format.is_pdb_like(), &source, &tautomer.key)
            {
                content.push_str(&line);
                content.push('\n');
            }
        }
        fs::write(output, content)?;
        Ok(())
    });

    tautomer.log.time(
        format!("{}_generate_{format}", toolkit.id()),
        started.elapsed(),
    );
    result
}

fn read_converted(tmp: &Path, format: TargetFormat) -> Result<String, EngineError> {
    let content = fs::read_to_string(tmp)
        .map_err(|_| EngineError::Validation("No output file generated".to_string()))?;
    if content.trim().is_empty() {
        return Err(EngineError::Validation("The output file is empty.".to_string()));
    }
    if format.is_pdb_like() && !has_nonzero_coordinates(&content) {
        return Err(EngineError::Validation(
            "The output PDB(QT) file exists but does not contain valid coordinates.".to_string(),
        ));
    }
    Ok(content)
}

/// Remark block written above the converted content, ending in a newline
/// when non-empty.
fn remark_header(tautomer: &Tautomer, format: TargetFormat, toolkit: &str) -> String {
    let Some(style) = RemarkStyle::for_format(format) else {
        return String::new();
    };
    let mut remarks: Remarks = tautomer.remarks.clone();
    remarks.set(
        RemarkKind::TargetFormat,
        format!("Generation of the the target format file ({format}) was carried out by {toolkit}"),
    );
    remarks.set(
        RemarkKind::Date,
        format!("Created on {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S")),
    );

    let (mut header, rendered) = match format {
        TargetFormat::Pdbqt => (
            format!("REMARK    Compound: {}\n", tautomer.key),
            remarks
                .without(RemarkKind::Compound)
                .render(&DEFAULT_REMARK_ORDER, style),
        ),
        _ => (String::new(), remarks.render(&DEFAULT_REMARK_ORDER, style)),
    };
    if !rendered.is_empty() {
        header.push_str(&rendered);
        header.push('\n');
    }
    header
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ligand::{Ligand, LigandRecord};
    use crate::core::models::node::EventState;
    use crate::core::models::tree::LigandTree;
    use crate::engine::config::PipelineConfigBuilder;
    use crate::engine::context::PipelineContext;
    use crate::engine::progress::ProgressReporter;
    use crate::engine::registry::EngineRegistry;
    use crate::testing::{EMBEDDED_PDB, MockToolkit, TaskDirs};
    use std::sync::Arc;

    fn tautomer(smiles: &str) -> Tautomer {
        let mut tree = LigandTree::new(Ligand::from_record(LigandRecord::new("L1", smiles)));
        let s0 = tree.add_stereoisomer(smiles);
        let t0 = tree.add_tautomer(s0, smiles).unwrap();
        let mut tautomer = tree.tautomer(t0).unwrap().clone();
        tautomer.remarks.set(RemarkKind::Basic, "Small molecule (ligand)");
        tautomer
            .remarks
            .set(RemarkKind::Compound, format!("Compound: {}", tautomer.key));
        tautomer
    }

    fn export(
        formats: &[&str],
        toolkit: MockToolkit,
        tautomer: &mut Tautomer,
    ) -> TaskDirs {
        let dirs = TaskDirs::new();
        let config = PipelineConfigBuilder::new()
            .target_formats(formats.iter().copied())
            .build()
            .unwrap();
        let registry = EngineRegistry::new(Arc::new(toolkit));
        let reporter = ProgressReporter::new();
        let task = dirs.task(PipelineContext::new(&config, &registry, &reporter));

        let pdb = dirs.intermediate.join("gen.pdb");
        fs::write(&pdb, EMBEDDED_PDB).unwrap();
        export_formats(&task, tautomer, &pdb, &dirs.intermediate);
        dirs
    }

    fn output(dirs: &TaskDirs, format: &str, name: &str) -> PathBuf {
        dirs.staging
            .join("complete")
            .join(format)
            .join("AA/BB/00001")
            .join(name)
    }

    #[test]
    fn smi_and_pdb_are_written_without_conversion() {
        let mut t = tautomer("CCO");
        t.smi_protomer = Some("CC[OH2+] comment".into());
        let dirs = export(&["smi", "pdb"], MockToolkit::default(), &mut t);

        let smi = fs::read_to_string(output(&dirs, "smi", "L1_S0_T0.smi")).unwrap();
        assert_eq!(smi, "CC[OH2+]\n");
        let pdb = fs::read_to_string(output(&dirs, "pdb", "L1_S0_T0.pdb")).unwrap();
        assert_eq!(pdb, EMBEDDED_PDB);
        let timers: Vec<_> = t.log.timers.iter().map(|t| t.name()).collect();
        assert_eq!(timers, ["targetformats"]);
    }

    #[test]
    fn pdbqt_gets_compound_remark_and_cleaned_lines() {
        let mut t = tautomer("CCO");
        let dirs = export(&["pdbqt"], MockToolkit::default(), &mut t);

        let content = fs::read_to_string(output(&dirs, "pdbqt", "L1_S0_T0.pdbqt")).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines[0], "REMARK    Compound: L1_S0_T0");
        assert_eq!(lines[1], "REMARK    Small molecule (ligand)");
        assert!(lines[2].contains("target format file (pdbqt) was carried out by Mock Toolkit"));
        assert!(lines[3].starts_with("REMARK    Created on "));
        assert!(!content.contains("AUTHOR"));
        assert!(!content.contains("Name ="));
        assert!(content.contains(" LIG "));
        assert!(!content.contains(" UNL "));
    }

    #[test]
    fn mol2_header_uses_hash_prefix_and_replaces_source_path() {
        let mut t = tautomer("CCO");
        let dirs = export(&["mol2"], MockToolkit::default(), &mut t);

        let content = fs::read_to_string(output(&dirs, "mol2", "L1_S0_T0.mol2")).unwrap();
        assert!(content.starts_with("# Small molecule (ligand)\n# Compound: L1_S0_T0\n"));
        assert!(content.contains("\nL1_S0_T0\n"));
        assert!(!content.contains("gen.pdb"));
    }

    #[test]
    fn failed_format_does_not_stop_the_others() {
        let mut t = tautomer("CCO");
        let toolkit = MockToolkit {
            failing_formats: vec![TargetFormat::Mol2],
            ..Default::default()
        };
        let dirs = export(&["mol2", "sdf", "smi"], toolkit, &mut t);

        let states: Vec<_> = t
            .log
            .status_sub
            .iter()
            .map(|e| (e.stage().to_string(), e.state()))
            .collect();
        assert_eq!(
            states,
            [
                ("targetformat-generation(mol2)".to_string(), EventState::Failed),
                ("targetformat-generation(sdf)".to_string(), EventState::Success),
                ("targetformat-generation(smi)".to_string(), EventState::Success),
            ]
        );
        assert!(!output(&dirs, "mol2", "L1_S0_T0.mol2").exists());
        assert!(output(&dirs, "sdf", "L1_S0_T0.sdf").is_file());
        let timers: Vec<_> = t.log.timers.iter().map(|t| t.name()).collect();
        assert_eq!(timers, ["obabel_generate_mol2", "obabel_generate_sdf", "targetformats"]);
    }

    #[test]
    fn tranche_code_prefixes_file_names() {
        let mut t = tautomer("CCO");
        assert_eq!(output_file_name(&t, TargetFormat::Pdbqt), "L1_S0_T0.pdbqt");
        t.tranche_string = Some("BAC".into());
        assert_eq!(output_file_name(&t, TargetFormat::Smi), "BAC_L1_S0_T0.smi");
    }
}
