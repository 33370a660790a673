//! Defines the command-line interface for the application.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "cumulus",
    version,
    about = "Inject cloud-configs into cloud-formation templates."
)]
pub struct Cli {
    /// Only print warnings and errors, not progress messages.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Format a cloud-config file into an acceptable JSON structure.
    Format(FormatArgs),
    /// Inject a file into another, first removing lines START through END.
    Inject(InjectArgs),
}

/// Arguments for the `format` command.
#[derive(Parser, Debug)]
pub struct FormatArgs {
    /// The cloud-config file to format.
    #[arg(value_name = "FILE")]
    pub source: PathBuf,

    /// Write the formatted cloud-config to this file.
    #[arg(long, value_name = "PATH", conflicts_with = "tmp")]
    pub out: Option<PathBuf>,

    /// Write the formatted cloud-config to a temporary file and print its path.
    #[arg(long)]
    pub tmp: bool,

    #[command(flatten)]
    pub formatting: FormattingArgs,
}

/// Arguments for the `inject` command.
#[derive(Parser, Debug)]
pub struct InjectArgs {
    /// The cloud-config (or already formatted file) to inject.
    #[arg(value_name = "INJECT_FILE")]
    pub inject: PathBuf,

    /// The file whose line range is replaced.
    #[arg(value_name = "RECEIVER_FILE")]
    pub receiver: PathBuf,

    /// First line to remove (1-indexed, inclusive).
    #[arg(value_name = "START", allow_hyphen_values = true)]
    pub start: String,

    /// Last line to remove (1-indexed, inclusive).
    #[arg(value_name = "END", allow_hyphen_values = true)]
    pub end: String,

    /// Format the cloud-config before injecting it. Use --format=false for pre-formatted input.
    #[arg(
        long,
        value_name = "BOOL",
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value_t = true,
        default_missing_value = "true"
    )]
    pub format: bool,

    /// Keep the trailing `\n",` on the last injected line instead of closing the array.
    #[arg(long)]
    pub verbatim_tail: bool,

    /// Print the resulting receiver instead of writing it.
    #[arg(long, conflicts_with = "diff")]
    pub dry_run: bool,

    /// Print a unified diff of the pending change instead of writing it.
    #[arg(long)]
    pub diff: bool,

    #[command(flatten)]
    pub formatting: FormattingArgs,
}

/// Formatting switches shared by `format` and `inject`.
#[derive(clap::Args, Debug)]
pub struct FormattingArgs {
    /// Apply full JSON string escaping (backslashes and control characters too).
    #[arg(long)]
    pub strict: bool,

    /// Fail if the cloud-config is not valid YAML.
    #[arg(long)]
    pub validate: bool,
}
