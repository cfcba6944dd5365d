use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu",
    version,
    about = "LigPrep CLI - prepares ligand collections for virtual screening: desalting, neutralization, stereoisomer and tautomer enumeration, protonation, 3D conformation, tranche assignment and target-format export.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Size of the global worker pool.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process every collection of one work-unit subjob.
    Run(RunArgs),
    /// Load and validate a configuration file without processing anything.
    Validate(ValidateArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    // --- Work unit ---
    /// Gzip-compressed JSON work unit listing the subjobs and their collections.
    #[arg(short, long, env = "VFLP_WORKUNIT_JSON", value_name = "PATH")]
    pub workunit: PathBuf,

    /// Subjob of the work unit to process.
    #[arg(short, long, env = "VFLP_WORKUNIT_SUBJOB", value_name = "ID")]
    pub subjob: String,

    /// Pipeline configuration (TOML, or JSON with a `.json` extension).
    /// Falls back to the `config` object embedded in the work unit.
    #[arg(short, long, env = "VFLP_CONFIG_JSON", value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Storage overrides ---
    /// Parent directory of the per-collection staging and scratch directories.
    #[arg(long, env = "VFLP_TMP_PATH", value_name = "PATH")]
    pub temp_path: Option<PathBuf>,

    /// Override `sharedfs_workflow_path`, the root that finished artifacts are delivered to.
    #[arg(long, value_name = "PATH")]
    pub workflow_path: Option<PathBuf>,

    /// Override `sharedfs_collection_path`, the root holding the input collection files.
    #[arg(long, value_name = "PATH")]
    pub collection_path: Option<PathBuf>,

    // --- Scheduling ---
    /// Process the ligands of a collection one at a time.
    #[arg(long, env = "VFLP_RUN_SEQUENTIAL", conflicts_with = "workers")]
    pub sequential: bool,

    /// Run each collection on a dedicated pool of this many workers.
    #[arg(long, env = "VFLP_VCPUS", value_name = "NUM")]
    pub workers: Option<usize>,

    /// Do not draw the progress bar.
    #[arg(long)]
    pub no_progress: bool,
}

/// Arguments for the `validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Pipeline configuration to check.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_arguments_parse_with_global_flags() {
        let cli = Cli::parse_from([
            "ligprep", "-vv", "-j", "4", "run", "--workunit", "wu.json.gz", "--subjob", "3",
            "--config", "pipeline.toml", "--sequential",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.threads, Some(4));
        let Commands::Run(args) = cli.command else {
            panic!("expected the run command");
        };
        assert_eq!(args.workunit, PathBuf::from("wu.json.gz"));
        assert_eq!(args.subjob, "3");
        assert_eq!(args.config, Some(PathBuf::from("pipeline.toml")));
        assert!(args.sequential);
        assert_eq!(args.workers, None);
    }

    #[test]
    fn sequential_conflicts_with_workers() {
        let result = Cli::try_parse_from([
            "ligprep", "run", "-w", "wu.json.gz", "-s", "1", "--sequential", "--workers", "2",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["ligprep", "-q", "-v", "validate", "-c", "a.toml"]);
        assert!(result.is_err());
    }
}
