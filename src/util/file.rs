use std::path::{Path, PathBuf};

use crate::foundation::error::{GapError, GapResult};

/// Number of digits used for frame numbers in generated filenames.
pub const FRAME_NR_DIGITS: usize = 6;

/// Size of a file in bytes.
pub fn file_size(path: &Path) -> GapResult<u64> {
    std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| GapError::io(format!("stat '{}': {e}", path.display())))
}

/// Load a whole file into memory.
pub fn read_file(path: &Path) -> GapResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| GapError::io(format!("read '{}': {e}", path.display())))
}

/// Write `bytes` to `path`, creating the parent directory first.
pub fn write_file(path: &Path, bytes: &[u8]) -> GapResult<()> {
    ensure_parent_dir(path)?;
    std::fs::write(path, bytes).map_err(|e| GapError::io(format!("write '{}': {e}", path.display())))
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> GapResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            GapError::io(format!(
                "failed to create output directory '{}': {e}",
                parent.display()
            ))
        })?;
    }
    Ok(())
}

/// Build the filename of frame `nr`: `basename` + zero-padded number + `ext`.
///
/// `ext` is used verbatim, so pass it with its leading dot (`".png"`).
pub fn frame_filename(basename: &str, nr: u32, ext: &str) -> PathBuf {
    PathBuf::from(format!("{basename}{nr:0width$}{ext}", width = FRAME_NR_DIGITS))
}

/// Parts of a numbered frame filename.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameName {
    /// Everything before the frame number, directory included.
    pub basename: String,
    /// Parsed frame number.
    pub nr: u32,
    /// Number of digits the number was written with.
    pub digits: usize,
    /// Extension including its leading dot, or empty.
    pub ext: String,
}

impl FrameName {
    /// Rebuild the filename for another frame number, keeping the digit count.
    pub fn with_nr(&self, nr: u32) -> PathBuf {
        PathBuf::from(format!(
            "{}{nr:0width$}{}",
            self.basename,
            self.ext,
            width = self.digits
        ))
    }
}

/// Split `name` into basename, trailing frame number and extension.
///
/// Returns `None` when no digits precede the extension.
pub fn split_frame_filename(name: &str) -> Option<FrameName> {
    let file_start = name.rfind(['/', '\\']).map(|i| i + 1).unwrap_or(0);
    let (stem, ext) = match name[file_start..].rfind('.') {
        Some(dot) if dot > 0 => name.split_at(file_start + dot),
        _ => (name, ""),
    };

    let digits = stem.bytes().rev().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let (basename, number) = stem.split_at(stem.len() - digits);
    let nr = number.parse::<u32>().ok()?;
    Some(FrameName {
        basename: basename.to_owned(),
        nr,
        digits,
        ext: ext.to_owned(),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/util/file.rs"]
mod tests;
