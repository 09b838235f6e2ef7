use camino::{Utf8DirEntry, Utf8Path};
use itertools::Itertools;

use crate::Error;

/// List the immediate (non-recursive) entries of a directory, sorted by file
/// name. Tree traversal relies on this for deterministic `sorted = true`
/// category/package ordering (spec.md §4.3, §5).
pub(crate) fn sorted_dir_list(path: &Utf8Path) -> crate::Result<Vec<Utf8DirEntry>> {
    let mut entries: Vec<_> = path
        .read_dir_utf8()
        .map_err(|e| Error::IO(format!("failed reading dir: {path}: {e}")))?
        .try_collect()?;
    entries.sort_by(|a, b| a.file_name().cmp(b.file_name()));
    Ok(entries)
}

pub(crate) fn is_dir(entry: &Utf8DirEntry) -> bool {
    entry.path().is_dir()
}

pub(crate) fn is_file(entry: &Utf8DirEntry) -> bool {
    entry.path().is_file()
}

pub(crate) fn is_hidden(entry: &Utf8DirEntry) -> bool {
    entry.file_name().starts_with('.')
}

pub(crate) fn has_ext(entry: &Utf8DirEntry, ext: &str) -> bool {
    entry
        .path()
        .extension()
        .map(|s| s == ext)
        .unwrap_or_default()
}

/// Determine if an entry is a valid ebuild file.
pub(crate) fn is_ebuild(entry: &Utf8DirEntry) -> bool {
    is_file(entry) && !is_hidden(entry) && has_ext(entry, "ebuild")
}
