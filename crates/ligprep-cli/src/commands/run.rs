use crate::cli::RunArgs;
use crate::config::{PartialPipelineConfig, RunSettings};
use crate::error::{CliError, Result};
use crate::transport;
use crate::utils::progress::CliProgressHandler;
use crate::workunit::{CollectionEntry, WorkUnit};
use ligprep::core::io::collection::{collection_file_path, read_collection};
use ligprep::core::io::routing::OutputRouter;
use ligprep::core::models::collection::Collection;
use ligprep::core::models::node::NodeStatus;
use ligprep::engine::context::PipelineContext;
use ligprep::engine::progress::ProgressReporter;
use ligprep::engine::registry::EngineRegistry;
use ligprep::workflows::collection::{CollectionOutcome, CollectionRunner};
use std::fs;
use tracing::{info, instrument, warn};

pub async fn run(args: RunArgs) -> Result<()> {
    info!("Loading work unit from {:?}", &args.workunit);
    let workunit = WorkUnit::from_file(&args.workunit)?;
    let subjob = workunit.subjob(&args.subjob)?;

    let partial = match (&args.config, &workunit.config) {
        (Some(path), _) => PartialPipelineConfig::from_file(path)?,
        (None, Some(embedded)) => {
            info!("Using the configuration embedded in the work unit.");
            PartialPipelineConfig::from_value(embedded.clone())?
        }
        (None, None) => {
            return Err(CliError::Config(
                "No configuration given: pass --config or embed one in the work unit.".to_string(),
            ));
        }
    };
    info!("Merging configuration from file and CLI arguments...");
    let settings = partial.merge_with_cli(&args)?;

    let registry = EngineRegistry::open_babel();
    let progress_handler = if args.no_progress {
        CliProgressHandler::hidden()
    } else {
        CliProgressHandler::new()
    };
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let pipeline = PipelineContext::new(&settings.pipeline, &registry, &reporter);
    let router = OutputRouter::new(&settings.workflow_path, settings.addressing);
    fs::create_dir_all(&settings.temp_path)?;

    println!(
        "Processing {} collection(s) of subjob {}...",
        subjob.collections.len(),
        args.subjob
    );

    let (mut succeeded, mut failed) = (0, 0);
    for (key, entry) in &subjob.collections {
        let collection = entry.collection(key);
        let outcome = tokio::task::block_in_place(|| {
            process_collection(pipeline, &router, &settings, &collection, entry)
        })?;

        let ok = outcome.summary.count(NodeStatus::Success);
        let bad = outcome.summary.count(NodeStatus::Failed);
        println!(
            "  {}: {ok} ligand(s) prepared, {bad} failed, {} artifact(s) delivered in {:.1}s",
            collection.identity(),
            outcome.artifacts.len(),
            outcome.summary.seconds
        );
        succeeded += ok;
        failed += bad;
    }

    if succeeded == 0 && failed > 0 {
        warn!("No ligand of the subjob could be prepared.");
    }
    println!("Subjob complete: {succeeded} ligand(s) prepared, {failed} failed.");
    Ok(())
}

/// Reads, processes and delivers one collection inside a private temporary
/// workspace that is removed afterwards.
#[instrument(skip_all, fields(collection = %collection.identity()))]
fn process_collection(
    pipeline: PipelineContext<'_>,
    router: &OutputRouter,
    settings: &RunSettings,
    collection: &Collection,
    entry: &CollectionEntry,
) -> Result<CollectionOutcome> {
    let input = collection_file_path(&settings.collection_path, collection);
    info!("Reading collection file {:?}", &input);
    let ligands = read_collection(&input, &entry.fieldnames)?;

    let workspace = tempfile::Builder::new()
        .prefix("ligprep-collection-")
        .tempdir_in(&settings.temp_path)?;
    let staging = workspace.path().join("staging");
    let scratch = workspace.path().join("scratch");
    fs::create_dir_all(&staging)?;
    fs::create_dir_all(&scratch)?;

    let outcome = CollectionRunner::new(pipeline, router, &staging)
        .with_scratch_root(&scratch)
        .with_mode(settings.mode)
        .run(collection, ligands)?;

    transport::deliver(&outcome.artifacts)?;
    Ok(outcome)
}
