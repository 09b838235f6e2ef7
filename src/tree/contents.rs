//! CONTENTS-file record parsing (spec.md §6), shared by the VDB and binpkg
//! backends: one record per installed filesystem object, in traversal order.

use camino::Utf8PathBuf;

/// A single CONTENTS line: a directory, a plain file, or a symlink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentsEntry {
    Dir(Utf8PathBuf),
    Obj {
        path: Utf8PathBuf,
        md5: String,
        mtime: u64,
    },
    Sym {
        path: Utf8PathBuf,
        target: Utf8PathBuf,
        mtime: u64,
    },
}

impl ContentsEntry {
    pub fn path(&self) -> &camino::Utf8Path {
        match self {
            Self::Dir(p) => p,
            Self::Obj { path, .. } => path,
            Self::Sym { path, .. } => path,
        }
    }
}

/// Parse an entire CONTENTS file's text into records, skipping malformed
/// lines rather than failing the whole package (a single truncated entry
/// shouldn't make the rest of an installed package's file list unusable).
pub(crate) fn parse(text: &str) -> Vec<ContentsEntry> {
    text.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<ContentsEntry> {
    let mut parts = line.splitn(2, ' ');
    let kind = parts.next()?;
    let rest = parts.next()?;
    match kind {
        "dir" => Some(ContentsEntry::Dir(Utf8PathBuf::from(rest.trim()))),
        "obj" => {
            let mut it = rest.rsplitn(3, ' ');
            let mtime: u64 = it.next()?.parse().ok()?;
            let md5 = it.next()?.to_string();
            let path = it.next()?.to_string();
            Some(ContentsEntry::Obj {
                path: Utf8PathBuf::from(path),
                md5,
                mtime,
            })
        }
        "sym" => {
            // "sym <path> -> <target> <mtime>"
            let mtime_split = rest.rsplitn(2, ' ').collect::<Vec<_>>();
            let mtime: u64 = mtime_split.first()?.parse().ok()?;
            let head = mtime_split.get(1)?;
            let (path, target) = head.split_once(" -> ")?;
            Some(ContentsEntry::Sym {
                path: Utf8PathBuf::from(path.trim()),
                target: Utf8PathBuf::from(target.trim()),
                mtime,
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_dir_obj_sym() {
        let text = "\
dir /usr/bin
obj /usr/bin/foo d41d8cd98f00b204e9800998ecf8427e 1700000000
sym /usr/bin/bar -> foo 1700000001
";
        let entries = parse(text);
        assert_eq!(entries.len(), 3);
        assert!(matches!(&entries[0], ContentsEntry::Dir(p) if p == "/usr/bin"));
        match &entries[1] {
            ContentsEntry::Obj { path, md5, mtime } => {
                assert_eq!(path, "/usr/bin/foo");
                assert_eq!(md5, "d41d8cd98f00b204e9800998ecf8427e");
                assert_eq!(*mtime, 1700000000);
            }
            other => panic!("expected Obj, got {other:?}"),
        }
        match &entries[2] {
            ContentsEntry::Sym { path, target, mtime } => {
                assert_eq!(path, "/usr/bin/bar");
                assert_eq!(target, "foo");
                assert_eq!(*mtime, 1700000001);
            }
            other => panic!("expected Sym, got {other:?}"),
        }
    }

    #[test]
    fn skips_malformed_lines() {
        let entries = parse("garbage line\ndir /ok\n");
        assert_eq!(entries.len(), 1);
    }
}
