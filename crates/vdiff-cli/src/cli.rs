use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "vdiff",
    about = "Compare a working directory against a snapshot",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show how a working directory differs from a snapshot directory
    Compare(CompareArgs),
    /// Print the root tree ID a directory would snapshot to
    Snapshot(SnapshotArgs),
}

#[derive(Args)]
pub struct CompareArgs {
    /// Working directory to inspect
    pub workdir: PathBuf,
    /// Directory whose contents form the reference snapshot
    #[arg(long)]
    pub snapshot: PathBuf,
    /// Gitignore-style rules; defaults to `<WORKDIR>/.gitignore` when present
    #[arg(long)]
    pub ignore_file: Option<PathBuf>,
    /// Do not report or descend into ignored paths
    #[arg(long)]
    pub no_ignored: bool,
    /// TOML file with diff settings
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct SnapshotArgs {
    pub dir: PathBuf,
    #[arg(long)]
    pub ignore_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_compare() {
        let cli = Cli::parse_from([
            "vdiff", "compare", "work", "--snapshot", "base", "--no-ignored", "--format", "json",
        ]);
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Command::Compare(args) => {
                assert_eq!(args.workdir, PathBuf::from("work"));
                assert_eq!(args.snapshot, PathBuf::from("base"));
                assert!(args.no_ignored);
                assert!(args.ignore_file.is_none());
            }
            Command::Snapshot(_) => panic!("expected compare"),
        }
    }

    #[test]
    fn snapshot_is_required() {
        assert!(Cli::try_parse_from(["vdiff", "compare", "work"]).is_err());
    }
}
