use crate::error::{CliError, Result};
use ligprep::workflows::collection::Artifact;
use std::fs;
use tracing::{debug, info, instrument};

/// Copies each artifact to its routed path on the shared filesystem, creating
/// parent directories as needed. Existing files are overwritten.
#[instrument(skip_all, fields(artifacts = artifacts.len()))]
pub fn deliver(artifacts: &[Artifact]) -> Result<()> {
    for artifact in artifacts {
        let target = &artifact.remote_path;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| CliError::Delivery {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let bytes = fs::copy(&artifact.local_path, target).map_err(|source| {
            CliError::Delivery {
                path: target.clone(),
                source,
            }
        })?;
        debug!(
            output_type = %artifact.output_type,
            from = %artifact.local_path.display(),
            to = %target.display(),
            bytes,
            "Delivered artifact."
        );
    }
    info!("Delivered collection artifacts.");
    Ok(())
}
