//! Deterministic placement of collection artifacts.
//!
//! Paths are pure functions of the collection identity. With hash addressing
//! the first two byte pairs of the SHA-256 hex digest of
//! `<metatranche>_<tranche>_<name>` become two extra directory levels, which
//! spreads collections evenly across the output tree.

use crate::core::models::collection::Collection;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown output addressing '{0}'. Expected 'hash' or 'metatranche'.")]
pub struct UnknownAddressing(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Addressing {
    #[default]
    Plain,
    Hash,
}

impl FromStr for Addressing {
    type Err = UnknownAddressing;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hash" => Ok(Addressing::Hash),
            "metatranche" | "plain" => Ok(Addressing::Plain),
            other => Err(UnknownAddressing(other.to_string())),
        }
    }
}

/// Hex SHA-256 digest of the collection identity.
pub fn collection_digest(collection: &Collection) -> String {
    format!("{:x}", Sha256::digest(collection.identity().as_bytes()))
}

/// `<root>/complete/<output_type>/<metatranche>/<tranche>`
pub fn complete_dir(root: &Path, output_type: &str, collection: &Collection) -> PathBuf {
    root.join("complete")
        .join(output_type)
        .join(&collection.metatranche)
        .join(&collection.tranche)
}

/// Where one target format's files for a collection are written locally.
pub fn format_dir(root: &Path, output_type: &str, collection: &Collection) -> PathBuf {
    complete_dir(root, output_type, collection).join(&collection.name)
}

/// Where the intermediate logs of one collection are written locally.
pub fn intermediate_dir(root: &Path, collection: &Collection) -> PathBuf {
    root.join("intermediate")
        .join(&collection.metatranche)
        .join(&collection.tranche)
        .join(&collection.name)
}

/// Summary location under any root, without sharding.
pub fn summary_file(root: &Path, collection: &Collection) -> PathBuf {
    complete_dir(root, "status", collection).join(format!("{}.json.gz", collection.name))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRouter {
    base: PathBuf,
    addressing: Addressing,
}

impl OutputRouter {
    pub fn new(base: impl Into<PathBuf>, addressing: Addressing) -> Self {
        Self {
            base: base.into(),
            addressing,
        }
    }

    fn prefix(&self, collection: &Collection) -> PathBuf {
        match self.addressing {
            Addressing::Plain => self.base.clone(),
            Addressing::Hash => {
                let digest = collection_digest(collection);
                self.base.join(&digest[0..2]).join(&digest[2..4])
            }
        }
    }

    /// `<prefix>/complete/status/<metatranche>/<tranche>/<name>.json.gz`
    pub fn summary_path(&self, collection: &Collection) -> PathBuf {
        summary_file(&self.prefix(collection), collection)
    }

    /// `<prefix>/complete/<output_type>/<metatranche>/<tranche>/<name>.tar.gz`
    pub fn bundle_path(&self, collection: &Collection, output_type: &str) -> PathBuf {
        complete_dir(&self.prefix(collection), output_type, collection)
            .join(format!("{}.tar.gz", collection.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_paths_follow_complete_layout() {
        let router = OutputRouter::new("/work", Addressing::Plain);
        let c = Collection::new("AA", "BB", "00001");
        assert_eq!(
            router.summary_path(&c),
            PathBuf::from("/work/complete/status/AA/BB/00001.json.gz")
        );
        assert_eq!(
            router.bundle_path(&c, "pdbqt"),
            PathBuf::from("/work/complete/pdbqt/AA/BB/00001.tar.gz")
        );
    }

    #[test]
    fn hash_paths_insert_two_digest_segments() {
        let router = OutputRouter::new("/work", Addressing::Hash);
        let c = Collection::new("AA", "BB", "00001");
        let digest = collection_digest(&c);
        assert_eq!(digest.len(), 64);

        let expected = PathBuf::from("/work")
            .join(&digest[0..2])
            .join(&digest[2..4])
            .join("complete/status/AA/BB/00001.json.gz");
        assert_eq!(router.summary_path(&c), expected);
    }

    #[test]
    fn routing_is_idempotent_and_uses_full_digest() {
        let router = OutputRouter::new("/work", Addressing::Hash);
        let a = Collection::new("AA", "BB", "00001");
        assert_eq!(router.bundle_path(&a, "pdb"), router.bundle_path(&a, "pdb"));

        let digest_b = collection_digest(&Collection::new("AA", "BB", "00002"));
        assert_ne!(collection_digest(&a), digest_b);
        assert_eq!(
            collection_digest(&a),
            "6175adbf5fff3cd71901a36830a8913a1e7a8c4013d2d699deb289d9e9a6e2de"
        );
    }

    #[test]
    fn addressing_parses_known_values() {
        assert_eq!("hash".parse::<Addressing>(), Ok(Addressing::Hash));
        assert_eq!("metatranche".parse::<Addressing>(), Ok(Addressing::Plain));
        assert!("s3".parse::<Addressing>().is_err());
    }
}
