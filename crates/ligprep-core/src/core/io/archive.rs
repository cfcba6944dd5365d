use super::IoError;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes `value` as gzip-compressed JSON, creating parent directories.
pub fn write_summary<T: Serialize>(value: &T, path: &Path) -> Result<(), IoError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(IoError::file(parent))?;
    }
    let file = File::create(path).map_err(IoError::file(path))?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    serde_json::to_writer(&mut encoder, value)?;
    encoder
        .finish()
        .and_then(|mut writer| writer.flush())
        .map_err(IoError::file(path))?;
    debug!(path = %path.display(), "Wrote collection summary.");
    Ok(())
}

/// Packs `dir` into `<dir>.tar.gz` next to it. Entries are stored under the
/// directory's own name.
pub fn pack_directory(dir: &Path) -> Result<PathBuf, IoError> {
    if !dir.is_dir() {
        return Err(IoError::MissingDirectory(dir.to_path_buf()));
    }
    let name = dir
        .file_name()
        .ok_or_else(|| IoError::MissingDirectory(dir.to_path_buf()))?;
    let archive_path = dir.with_file_name(format!("{}.tar.gz", name.to_string_lossy()));

    let file = File::create(&archive_path).map_err(IoError::file(&archive_path))?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder
        .append_dir_all(name, dir)
        .map_err(IoError::file(dir))?;
    builder
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .map_err(IoError::file(&archive_path))?;

    debug!(archive = %archive_path.display(), "Packed directory.");
    Ok(archive_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tempfile::tempdir;

    #[test]
    fn summary_round_trips_through_gzip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("complete/status/AA/BB/c1.json.gz");
        write_summary(&serde_json::json!({"ligands": {}, "seconds": 3}), &path).unwrap();

        let mut text = String::new();
        GzDecoder::new(File::open(&path).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, r#"{"ligands":{},"seconds":3}"#);
    }

    #[test]
    fn pack_directory_stores_entries_under_directory_name() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("c1");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("L1_S0_T0.smi"), "CCO\n").unwrap();

        let archive = pack_directory(&target).unwrap();
        assert_eq!(archive, dir.path().join("c1.tar.gz"));

        let mut names = Vec::new();
        let mut reader = tar::Archive::new(GzDecoder::new(File::open(&archive).unwrap()));
        for entry in reader.entries().unwrap() {
            names.push(entry.unwrap().path().unwrap().to_string_lossy().into_owned());
        }
        assert!(names.iter().any(|n| n == "c1/L1_S0_T0.smi"));
    }

    #[test]
    fn pack_missing_directory_is_reported() {
        let dir = tempdir().unwrap();
        let err = pack_directory(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, IoError::MissingDirectory(_)));
    }
}
