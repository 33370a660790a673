//! Line-oriented reading and writing of cloud-config and template files.
//!
//! Receivers and pre-formatted inject files are handled as raw bytes so that
//! lines in any encoding survive a splice unchanged. Only cloud-config sources
//! that are about to be formatted must be UTF-8.

use crate::error::{CumulusError, Result};
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::Builder as TempFileBuilder;

/// Reads a whole file as UTF-8 text.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|err| CumulusError::source_read(path, err))
}

pub fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|err| CumulusError::source_read(path, err))
}

/// Reads a file into a sequence of byte lines. Terminators (`\n` or `\r\n`) are dropped.
pub fn read_lines(path: &Path) -> Result<Vec<Vec<u8>>> {
    read_bytes(path).map(|bytes| split_lines(&bytes))
}

/// Splits on `\n`, stripping one trailing `\r` per line. A final terminator
/// does not produce an empty last line.
pub fn split_lines(bytes: &[u8]) -> Vec<Vec<u8>> {
    if bytes.is_empty() {
        return Vec::new();
    }
    let body = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    body.split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line).to_vec())
        .collect()
}

/// Joins lines back together, terminating every line (including the last) with `\n`.
pub fn join_lines<S: AsRef<[u8]>>(lines: &[S]) -> Vec<u8> {
    let capacity = lines.iter().map(|line| line.as_ref().len() + 1).sum();
    let mut out = Vec::with_capacity(capacity);
    for line in lines {
        out.extend_from_slice(line.as_ref());
        out.push(b'\n');
    }
    out
}

/// Writes each line followed by `\n`, then flushes the writer.
pub fn write_lines<W: Write, S: AsRef<[u8]>>(writer: &mut W, lines: &[S]) -> io::Result<()> {
    for line in lines {
        writer.write_all(line.as_ref())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

/// Replaces `path` with `contents` without ever leaving a truncated file behind.
///
/// Symlinks are resolved first, so the file they point at is the one
/// replaced. The new contents go to a temporary file next to it, which is
/// synced and then renamed over the destination. An existing destination
/// keeps its permissions, and a read-only destination is refused even though
/// the rename itself would only need write access to the directory.
pub fn replace_file(path: &Path, contents: &[u8]) -> Result<()> {
    let target = resolve_target(path)?;
    let metadata = match fs::metadata(&target) {
        Ok(metadata) => Some(metadata),
        Err(err) if err.kind() == ErrorKind::NotFound => None,
        Err(err) => return Err(CumulusError::destination_write(path, err)),
    };

    if let Some(metadata) = &metadata {
        if metadata.permissions().readonly() {
            return Err(CumulusError::destination_write(
                path,
                io::Error::new(ErrorKind::PermissionDenied, "file is read-only"),
            ));
        }
    }

    let parent_dir = match target.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut temp_file = TempFileBuilder::new()
        .prefix(".cumulus-")
        .suffix(".tmp")
        .tempfile_in(parent_dir)
        .map_err(|err| CumulusError::destination_write(path, err))?;

    temp_file
        .write_all(contents)
        .and_then(|()| temp_file.as_file().sync_all())
        .map_err(|err| CumulusError::destination_write(path, err))?;

    if let Some(metadata) = metadata {
        temp_file
            .as_file()
            .set_permissions(metadata.permissions())
            .map_err(|err| CumulusError::destination_write(path, err))?;
    }

    // `persist` performs the atomic rename.
    temp_file
        .persist(&target)
        .map_err(|err| CumulusError::destination_write(path, err.error))?;

    Ok(())
}

/// Follows symlinks to the real file. A path that does not exist yet is used as given.
fn resolve_target(path: &Path) -> Result<PathBuf> {
    match fs::canonicalize(path) {
        Ok(resolved) => Ok(resolved),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(path.to_path_buf()),
        Err(err) => Err(CumulusError::destination_write(path, err)),
    }
}
