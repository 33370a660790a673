use crate::cli::{Cli, Command, FormatArgs, FormattingArgs, InjectArgs};
use anyhow::Context;
use clap::Parser;
use cumulus_lib::formatter::Escaping;
use cumulus_lib::injector::{LineRange, TailPolicy};
use cumulus_lib::{
    format_and_inject, format_file, inject_file, FormatOptions, FormatSink, InjectMode,
    InjectOptions,
};
use std::io::{self, Write};

pub fn run() -> anyhow::Result<()> {
    let Cli { quiet, command } = Cli::parse();

    init_logger(quiet);

    match command {
        Command::Format(args) => process_format(args),
        Command::Inject(args) => process_inject(args),
    }
}

/// Progress messages go to stderr as bare lines so stdout only carries formatted output.
fn init_logger(quiet: bool) {
    let default_filter = if quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

fn process_format(args: FormatArgs) -> anyhow::Result<()> {
    let FormatArgs {
        source,
        out,
        tmp,
        formatting,
    } = args;

    let sink = match (out, tmp) {
        (Some(path), _) => FormatSink::File(path),
        (None, true) => FormatSink::Temp,
        (None, false) => FormatSink::Stdout,
    };

    let outcome = format_file(&source, &sink, &map_format_options(&formatting))
        .with_context(|| format!("Failed to format {}", source.display()))?;

    if sink == FormatSink::Temp {
        if let Some(path) = outcome.destination {
            println!("{}", path.display());
        }
    }

    Ok(())
}

fn process_inject(args: InjectArgs) -> anyhow::Result<()> {
    let InjectArgs {
        inject,
        receiver,
        start,
        end,
        format,
        verbatim_tail,
        dry_run,
        diff,
        formatting,
    } = args;

    let range = LineRange::parse(&start, &end)?;

    if !format {
        if formatting.validate {
            log::warn!("warning: --validate has no effect with --format=false");
        }
        if formatting.strict {
            log::warn!("warning: --strict has no effect with --format=false");
        }
    }

    let mode = if diff {
        InjectMode::Diff
    } else if dry_run {
        InjectMode::DryRun
    } else {
        InjectMode::Write
    };

    let options = InjectOptions {
        format: map_format_options(&formatting),
        tail: if verbatim_tail {
            TailPolicy::Verbatim
        } else {
            TailPolicy::CloseArray
        },
        mode,
        scratch_dir: None,
    };

    let result = if format {
        format_and_inject(&inject, &receiver, range, &options)
    } else {
        inject_file(&inject, &receiver, range, &options)
    };
    let outcome = result.with_context(|| {
        format!(
            "Failed to inject {} into {}",
            inject.display(),
            receiver.display()
        )
    })?;

    log::debug!(
        "replaced {} lines with {} lines",
        outcome.lines_removed,
        outcome.lines_injected
    );

    if let Some(output) = outcome.output {
        io::stdout().write_all(&output)?;
    }

    Ok(())
}

fn map_format_options(args: &FormattingArgs) -> FormatOptions {
    FormatOptions {
        escaping: if args.strict {
            Escaping::Json
        } else {
            Escaping::Quotes
        },
        validate: args.validate,
    }
}
