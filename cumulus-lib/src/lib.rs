//! `cumulus-lib` formats cloud-config files into JSON string-array bodies and
//! injects them into templates. It powers the `cumulus` CLI.
//!
//! Each line of a cloud-config becomes a quoted literal such as
//! `"write_files:\n",`, ready to be dropped into a CloudFormation `UserData`
//! array. Injection replaces an inclusive line range of a template (the
//! *receiver*) with those literals and rewrites the receiver atomically.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use cumulus_lib::injector::LineRange;
//! use cumulus_lib::{format_and_inject, InjectOptions};
//!
//! # fn demo() -> cumulus_lib::error::Result<()> {
//! let range = LineRange::new(12, 40)?;
//! format_and_inject(
//!     Path::new("cloud-config.yml"),
//!     Path::new("stack.template"),
//!     range,
//!     &InjectOptions::default(),
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod formatter;
pub mod injector;
pub mod lines;

use crate::error::{CumulusError, Result};
use crate::formatter::{format_lines, Escaping};
use crate::injector::{splice_lines, LineRange, TailPolicy};
use similar::TextDiff;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::{Builder as TempFileBuilder, NamedTempFile};

/// Prefix of the temporary files holding formatted cloud-configs.
pub const TEMP_FILE_PREFIX: &str = "cloudcfg";

/// Options shared by every formatting entry point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatOptions {
    pub escaping: Escaping,
    /// Reject sources that do not parse as YAML before formatting them.
    pub validate: bool,
}

/// Where formatted literals are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatSink {
    Stdout,
    File(PathBuf),
    /// A newly created temporary file that outlives the call.
    Temp,
}

/// Result metadata describing a completed format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOutcome {
    /// Number of literals written.
    pub lines: usize,
    /// Path written to, or `None` for stdout.
    pub destination: Option<PathBuf>,
}

/// How the result of an injection is delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InjectMode {
    /// Atomically replace the receiver.
    #[default]
    Write,
    /// Leave the receiver untouched and return the would-be contents.
    DryRun,
    /// Leave the receiver untouched and return a unified diff.
    Diff,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InjectOptions {
    /// Used by [`format_and_inject`] when formatting the inject source.
    pub format: FormatOptions,
    pub tail: TailPolicy,
    pub mode: InjectMode,
    /// Directory for the intermediate formatted file. Defaults to the OS scratch directory.
    pub scratch_dir: Option<PathBuf>,
}

/// Result metadata describing the side-effects of an injection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectOutcome {
    pub lines_removed: usize,
    pub lines_injected: usize,
    /// Rendered receiver (dry run) or unified diff (diff mode). `None` when the receiver was written.
    ///
    /// Receiver lines are carried as raw bytes, so this is not guaranteed to be UTF-8.
    pub output: Option<Vec<u8>>,
}

/// Formats `source` and writes the literals to `sink`.
pub fn format_file(
    source: &Path,
    sink: &FormatSink,
    options: &FormatOptions,
) -> Result<FormatOutcome> {
    let formatted = read_formatted(source, options)?;

    match sink {
        FormatSink::Stdout => {
            log::info!("=> Writing formatted cloud-config to STDOUT...");
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            lines::write_lines(&mut handle, &formatted)
                .map_err(|err| CumulusError::destination_write("<stdout>", err))?;
            Ok(FormatOutcome {
                lines: formatted.len(),
                destination: None,
            })
        }
        FormatSink::File(path) => {
            log::info!("=> Writing formatted cloud-config to {}...", path.display());
            std::fs::File::create(path)
                .and_then(|mut file| {
                    lines::write_lines(&mut file, &formatted)?;
                    file.sync_all()
                })
                .map_err(|err| CumulusError::destination_write(path, err))?;
            Ok(FormatOutcome {
                lines: formatted.len(),
                destination: Some(path.clone()),
            })
        }
        FormatSink::Temp => {
            log::info!("=> Writing formatted cloud-config to a temporary file...");
            let temp_file = write_temp(&formatted, None)?;
            let temp_path = temp_file.path().to_path_buf();
            let (_, path) = temp_file
                .keep()
                .map_err(|err| CumulusError::destination_write(temp_path, err.error))?;
            Ok(FormatOutcome {
                lines: formatted.len(),
                destination: Some(path),
            })
        }
    }
}

/// Replaces `range` of `receiver` with the lines of the already formatted `inject` file.
pub fn inject_file(
    inject: &Path,
    receiver: &Path,
    range: LineRange,
    options: &InjectOptions,
) -> Result<InjectOutcome> {
    splice_into(inject, inject, receiver, range, options)
}

/// Formats `inject` into a scoped temporary file, then injects that file into `receiver`.
///
/// The temporary file is removed on every path out of this function,
/// including when the injection fails.
pub fn format_and_inject(
    inject: &Path,
    receiver: &Path,
    range: LineRange,
    options: &InjectOptions,
) -> Result<InjectOutcome> {
    let formatted = read_formatted(inject, &options.format)?;
    log::info!("=> Writing formatted cloud-config to a temporary file...");
    let temp_file = write_temp(&formatted, options.scratch_dir.as_deref())?;
    log::debug!("formatted {} into {}", inject.display(), temp_file.path().display());

    splice_into(temp_file.path(), inject, receiver, range, options)
}

fn read_formatted(source: &Path, options: &FormatOptions) -> Result<Vec<String>> {
    let text = lines::read_text(source)?;
    if options.validate {
        validate_cloud_config(source, &text)?;
    }
    let source_lines: Vec<&str> = text.lines().collect();
    Ok(format_lines(&source_lines, options.escaping))
}

/// Checks that `text` parses as YAML, as cloud-init requires.
pub fn validate_cloud_config(path: &Path, text: &str) -> Result<()> {
    serde_yaml::from_str::<serde_yaml::Value>(text)
        .map(|_| ())
        .map_err(|err| CumulusError::InvalidCloudConfig {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;

    if !text.trim_start().starts_with("#cloud-config") {
        log::warn!(
            "warning: {} does not start with a '#cloud-config' header",
            path.display()
        );
    }
    Ok(())
}

fn write_temp(formatted: &[String], dir: Option<&Path>) -> Result<NamedTempFile> {
    let mut builder = TempFileBuilder::new();
    builder.prefix(TEMP_FILE_PREFIX);
    let created = match dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    };
    let scratch = dir.map_or_else(std::env::temp_dir, Path::to_path_buf);
    let mut temp_file = created.map_err(|err| CumulusError::destination_write(&scratch, err))?;

    lines::write_lines(&mut temp_file, formatted)
        .and_then(|()| temp_file.as_file().sync_all())
        .map_err(|err| CumulusError::destination_write(temp_file.path(), err))?;

    Ok(temp_file)
}

/// Reads lines from `source` and splices them into `receiver`. `label` names
/// the inject source in progress messages.
fn splice_into(
    source: &Path,
    label: &Path,
    receiver: &Path,
    range: LineRange,
    options: &InjectOptions,
) -> Result<InjectOutcome> {
    log::info!("=> Removing lines {range} in {}...", receiver.display());
    let original = lines::read_bytes(receiver)?;

    let mut inject_lines = lines::read_lines(source)?;
    options.tail.apply(&mut inject_lines);
    let lines_injected = inject_lines.len();

    let spliced = splice_lines(lines::split_lines(&original), range, inject_lines)?;
    let rendered = lines::join_lines(&spliced);

    log::info!(
        "=> Injecting {} into {}...",
        label.display(),
        receiver.display()
    );

    let output = match options.mode {
        InjectMode::Write => {
            lines::replace_file(receiver, &rendered)?;
            None
        }
        InjectMode::DryRun => Some(rendered),
        InjectMode::Diff => {
            let before = String::from_utf8_lossy(&original).into_owned();
            let after = String::from_utf8_lossy(&rendered).into_owned();
            let diff = TextDiff::from_lines(&before, &after)
                .unified_diff()
                .header("original", "modified")
                .to_string();
            Some(diff.into_bytes())
        }
    };

    Ok(InjectOutcome {
        lines_removed: range.removed_lines(),
        lines_injected,
        output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn options_in(dir: &Path) -> InjectOptions {
        InjectOptions {
            scratch_dir: Some(dir.to_path_buf()),
            ..InjectOptions::default()
        }
    }

    fn scratch_entries(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn format_to_file_writes_every_literal_with_comma() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("cloud-config.yml");
        let out = dir.path().join("out.txt");
        fs::write(&source, "hello\nsay \"hi\"\n").unwrap();

        let outcome =
            format_file(&source, &FormatSink::File(out.clone()), &FormatOptions::default()).unwrap();

        assert_eq!(outcome.lines, 2);
        assert_eq!(outcome.destination.as_deref(), Some(out.as_path()));
        assert_eq!(
            fs::read_to_string(&out).unwrap(),
            "\"hello\\n\",\n\"say \\\"hi\\\"\\n\",\n"
        );
    }

    #[test]
    fn format_to_temp_keeps_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("cloud-config.yml");
        fs::write(&source, "runcmd:\n").unwrap();

        let outcome = format_file(&source, &FormatSink::Temp, &FormatOptions::default()).unwrap();
        let path = outcome.destination.unwrap();

        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(TEMP_FILE_PREFIX));
        assert_eq!(fs::read_to_string(&path).unwrap(), "\"runcmd:\\n\",\n");
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn format_and_inject_closes_the_array() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let source = dir.path().join("cloud-config.yml");
        let receiver = dir.path().join("stack.template");
        fs::write(&source, "#cloud-config\nhostname: \"web\"\n").unwrap();
        fs::write(&receiver, "[\nPLACEHOLDER\n]\n").unwrap();

        let outcome = format_and_inject(
            &source,
            &receiver,
            LineRange::new(2, 2).unwrap(),
            &options_in(scratch.path()),
        )
        .unwrap();

        assert_eq!(outcome.lines_removed, 1);
        assert_eq!(outcome.lines_injected, 2);
        assert_eq!(outcome.output, None);
        assert_eq!(
            fs::read_to_string(&receiver).unwrap(),
            "[\n\"#cloud-config\\n\",\n\"hostname: \\\"web\\\"\"\n]\n"
        );
        assert_eq!(scratch_entries(scratch.path()), 0);
    }

    #[test]
    fn temp_file_is_removed_when_injection_fails() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let source = dir.path().join("cloud-config.yml");
        let receiver = dir.path().join("stack.template");
        fs::write(&source, "packages:\n  - nginx\n").unwrap();
        fs::write(&receiver, "only\ntwo\n").unwrap();

        let err = format_and_inject(
            &source,
            &receiver,
            LineRange::new(2, 9).unwrap(),
            &options_in(scratch.path()),
        )
        .unwrap_err();

        assert!(matches!(err, CumulusError::InvalidRange { .. }));
        assert_eq!(scratch_entries(scratch.path()), 0);
        assert_eq!(fs::read_to_string(&receiver).unwrap(), "only\ntwo\n");
    }

    #[test]
    fn temp_file_is_removed_when_receiver_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let source = dir.path().join("cloud-config.yml");
        fs::write(&source, "packages: []\n").unwrap();

        let err = format_and_inject(
            &source,
            &dir.path().join("missing.template"),
            LineRange::new(1, 1).unwrap(),
            &options_in(scratch.path()),
        )
        .unwrap_err();

        assert!(matches!(err, CumulusError::SourceRead { .. }));
        assert_eq!(scratch_entries(scratch.path()), 0);
    }

    #[test]
    fn validation_rejects_malformed_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("cloud-config.yml");
        fs::write(&source, "#cloud-config\nusers: [unclosed\n").unwrap();

        let options = FormatOptions {
            validate: true,
            ..FormatOptions::default()
        };
        let err = format_file(&source, &FormatSink::File(dir.path().join("out")), &options)
            .unwrap_err();

        assert!(matches!(err, CumulusError::InvalidCloudConfig { .. }));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn diff_mode_leaves_receiver_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let inject = dir.path().join("formatted.txt");
        let receiver = dir.path().join("stack.template");
        fs::write(&inject, "\"new\\n\",\n").unwrap();
        fs::write(&receiver, "a\nold\nc\n").unwrap();

        let options = InjectOptions {
            mode: InjectMode::Diff,
            ..InjectOptions::default()
        };
        let outcome = inject_file(&inject, &receiver, LineRange::new(2, 2).unwrap(), &options)
            .unwrap();

        let diff = String::from_utf8(outcome.output.unwrap()).unwrap();
        assert!(diff.contains("-old\n"));
        assert!(diff.contains("+\"new\"\n"));
        assert_eq!(fs::read_to_string(&receiver).unwrap(), "a\nold\nc\n");
    }

    #[test]
    fn format_and_inject_preserves_non_utf8_receiver_lines() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let source = dir.path().join("cloud-config.yml");
        let receiver = dir.path().join("stack.template");
        fs::write(&source, "#cloud-config\n").unwrap();
        fs::write(&receiver, b"a\n# caf\xe9\nPLACEHOLDER\n").unwrap();

        format_and_inject(
            &source,
            &receiver,
            LineRange::new(3, 3).unwrap(),
            &options_in(scratch.path()),
        )
        .unwrap();

        assert_eq!(
            fs::read(&receiver).unwrap(),
            b"a\n# caf\xe9\n\"#cloud-config\"\n"
        );
        assert_eq!(scratch_entries(scratch.path()), 0);
    }
}
