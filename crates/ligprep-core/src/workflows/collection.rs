//! Runs every ligand of a collection as an independent task and turns the
//! results into the collection's artifacts.

use super::TaskContext;
use super::ligand::process_ligand;
use crate::core::io::IoError;
use crate::core::io::archive::{pack_directory, write_summary};
use crate::core::io::routing::{OutputRouter, format_dir, intermediate_dir, summary_file};
use crate::core::models::collection::{Collection, CollectionSummary, LigandSummary};
use crate::core::models::ligand::{Ligand, LigandRecord};
use crate::core::models::node::NodeStatus;
use crate::core::models::tree::{CompletionRecord, LigandTree};
use crate::engine::context::PipelineContext;
use crate::engine::progress::Progress;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::{info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Output type under which intermediate logs are delivered.
pub const INTERMEDIATE_OUTPUT: &str = "intermediate";
pub const STATUS_OUTPUT: &str = "status";

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Io(#[from] IoError),

    #[error("Failed to start the worker pool: {0}")]
    Pool(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// One ligand at a time on the calling thread.
    Sequential,
    /// Ligands distributed over the global rayon pool.
    #[default]
    Parallel,
    /// A dedicated pool of `workers` threads for this collection.
    ParallelWith { workers: usize },
}

/// A finished collection file awaiting delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub output_type: String,
    pub local_path: PathBuf,
    pub remote_path: PathBuf,
}

#[derive(Debug)]
pub struct CollectionOutcome {
    pub summary: CollectionSummary,
    pub artifacts: Vec<Artifact>,
}

pub struct CollectionRunner<'a> {
    pipeline: PipelineContext<'a>,
    router: &'a OutputRouter,
    staging_dir: &'a Path,
    scratch_root: Option<&'a Path>,
    mode: ExecutionMode,
}

impl<'a> CollectionRunner<'a> {
    pub fn new(
        pipeline: PipelineContext<'a>,
        router: &'a OutputRouter,
        staging_dir: &'a Path,
    ) -> Self {
        Self {
            pipeline,
            router,
            staging_dir,
            scratch_root: None,
            mode: ExecutionMode::default(),
        }
    }

    /// Parent of the per-task scratch directories; the system temp dir if unset.
    pub fn with_scratch_root(mut self, root: &'a Path) -> Self {
        self.scratch_root = Some(root);
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    #[instrument(skip_all, name = "collection", fields(collection = %collection.identity(), ligands = ligands.len()))]
    pub fn run(
        &self,
        collection: &Collection,
        ligands: Vec<LigandRecord>,
    ) -> Result<CollectionOutcome, SchedulerError> {
        let started = Instant::now();
        let reporter = self.pipeline.reporter;
        reporter.report(Progress::CollectionStart {
            name: collection.identity(),
            total_ligands: ligands.len() as u64,
        });
        info!("Processing collection.");

        let logs_dir = self
            .pipeline
            .config
            .store_intermediate_logs
            .then(|| intermediate_dir(self.staging_dir, collection));
        let records = self.dispatch(collection, logs_dir.as_deref(), ligands)?;

        let mut summary = CollectionSummary::default();
        for record in records {
            let key = record.base_ligand.key.clone();
            if summary.ligands.contains_key(&key) {
                warn!(ligand = %key, "Duplicate ligand key; keeping the later record.");
            }
            summary.ligands.insert(key, LigandSummary::from(record));
        }
        summary.seconds = started.elapsed().as_secs_f64();

        let artifacts = self.collect_artifacts(collection, &summary, logs_dir.as_deref())?;

        info!(
            succeeded = summary.count(NodeStatus::Success),
            failed = summary.count(NodeStatus::Failed),
            artifacts = artifacts.len(),
            seconds = summary.seconds,
            "Collection finished."
        );
        reporter.report(Progress::CollectionFinish);
        Ok(CollectionOutcome { summary, artifacts })
    }

    fn dispatch(
        &self,
        collection: &Collection,
        logs_dir: Option<&Path>,
        ligands: Vec<LigandRecord>,
    ) -> Result<Vec<CompletionRecord>, SchedulerError> {
        let task = |record| self.run_task(collection, logs_dir, record);

        match self.mode {
            ExecutionMode::Sequential => Ok(ligands.into_iter().map(task).collect()),
            #[cfg(feature = "parallel")]
            ExecutionMode::Parallel => Ok(ligands.into_par_iter().map(task).collect()),
            #[cfg(feature = "parallel")]
            ExecutionMode::ParallelWith { workers } => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .build()
                    .map_err(|e| SchedulerError::Pool(e.to_string()))?;
                Ok(pool.install(|| ligands.into_par_iter().map(task).collect()))
            }
            #[cfg(not(feature = "parallel"))]
            ExecutionMode::Parallel | ExecutionMode::ParallelWith { .. } => {
                Ok(ligands.into_iter().map(task).collect())
            }
        }
    }

    fn run_task(
        &self,
        collection: &Collection,
        logs_dir: Option<&Path>,
        record: LigandRecord,
    ) -> CompletionRecord {
        let key = record.key.clone();
        let mut builder = tempfile::Builder::new();
        builder.prefix("ligprep-");
        let scratch = match self.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };

        let completion = match scratch {
            Ok(scratch) => {
                let intermediate_root = logs_dir
                    .map(|dir| dir.join(&key))
                    .unwrap_or_else(|| scratch.path().to_path_buf());
                let task = TaskContext {
                    pipeline: self.pipeline,
                    collection,
                    staging_dir: self.staging_dir,
                    scratch_dir: scratch.path(),
                    intermediate_root: &intermediate_root,
                };
                process_ligand(&task, record)
            }
            Err(err) => {
                warn!(ligand = %key, error = %err, "Could not create a scratch directory.");
                let started = Instant::now();
                let mut tree = LigandTree::new(Ligand::from_record(record));
                tree.ligand.log.failed("scratch-dir", err.to_string());
                tree.ligand.log.finish(NodeStatus::Failed);
                tree.into_completion(started.elapsed())
            }
        };

        self.pipeline.reporter.report(Progress::LigandFinish {
            key,
            success: completion.status == NodeStatus::Success,
        });
        completion
    }

    fn collect_artifacts(
        &self,
        collection: &Collection,
        summary: &CollectionSummary,
        logs_dir: Option<&Path>,
    ) -> Result<Vec<Artifact>, SchedulerError> {
        let mut artifacts = Vec::new();

        let summary_path = summary_file(self.staging_dir, collection);
        write_summary(summary, &summary_path)?;
        artifacts.push(Artifact {
            output_type: STATUS_OUTPUT.to_string(),
            local_path: summary_path,
            remote_path: self.router.summary_path(collection),
        });

        for format in &self.pipeline.config.target_formats {
            let dir = format_dir(self.staging_dir, format.as_str(), collection);
            if let Some(artifact) = self.bundle(collection, &dir, format.as_str())? {
                artifacts.push(artifact);
            }
        }

        if let Some(dir) = logs_dir {
            if let Some(artifact) = self.bundle(collection, dir, INTERMEDIATE_OUTPUT)? {
                artifacts.push(artifact);
            }
        }
        Ok(artifacts)
    }

    /// Packs `dir`; a missing directory means nothing of that type was
    /// produced and is skipped.
    fn bundle(
        &self,
        collection: &Collection,
        dir: &Path,
        output_type: &str,
    ) -> Result<Option<Artifact>, SchedulerError> {
        if !dir.is_dir() {
            warn!(
                output_type,
                path = %dir.display(),
                "No output produced; skipping bundle."
            );
            return Ok(None);
        }
        let local_path = pack_directory(dir)?;
        Ok(Some(Artifact {
            output_type: output_type.to_string(),
            local_path,
            remote_path: self.router.bundle_path(collection, output_type),
        }))
    }
}
