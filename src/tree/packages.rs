//! PACKAGES backend: a single flat index file (Gentoo's `Packages` format),
//! blank-line-separated blocks of `KEY: value` lines. The first block is a
//! repository-wide header with no CPV and is discarded; every later block
//! describes one binary package (spec.md §4.3, §6). The whole file is read
//! once, on first traversal, since there's no cheaper way to discover what's
//! in it.

use std::cell::RefCell;

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;

use crate::tree::{io_err, Backend, Key, LazyList, Package, TreeFormat};

#[derive(Debug)]
pub(super) struct PackagesBackend {
    root: Utf8PathBuf,
    index_path: Utf8PathBuf,
    parsed: RefCell<Option<IndexMap<String, Vec<Package>>>>,
}

impl PackagesBackend {
    pub(super) fn open(root: &Utf8Path) -> crate::Result<Self> {
        let index_path = if root.is_file() {
            root.to_path_buf()
        } else {
            root.join("Packages")
        };
        if !index_path.is_file() {
            return Err(io_err(
                &index_path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no Packages index"),
            ));
        }
        Ok(Self {
            root: root.to_path_buf(),
            index_path,
            parsed: RefCell::new(None),
        })
    }

    fn ensure_parsed(&self) -> crate::Result<()> {
        if self.parsed.borrow().is_some() {
            return Ok(());
        }
        tracing::debug!("parsing packages index {}", self.index_path);
        let text = std::fs::read_to_string(&self.index_path).map_err(|e| io_err(&self.index_path, e))?;
        let mut by_category: IndexMap<String, Vec<Package>> = IndexMap::new();
        for block in text.split("\n\n") {
            if block.trim().is_empty() {
                continue;
            }
            match parse_block(block, &self.root) {
                Some(pkg) => {
                    by_category.entry(pkg.category().to_string()).or_default().push(pkg);
                }
                None if block.contains("CPV:") => {
                    tracing::warn!("skipping malformed packages index block");
                }
                None => {}
            }
        }
        *self.parsed.borrow_mut() = Some(by_category);
        Ok(())
    }
}

fn parse_block(block: &str, root: &Utf8Path) -> Option<Package> {
    let mut cpv = None;
    let mut rel_path = None;
    let mut buildid = None;
    let mut meta = IndexMap::new();

    for line in block.lines() {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();
        match name {
            "CPV" => cpv = Some(value),
            "PATH" => rel_path = Some(value),
            "BUILD_ID" => buildid = value.parse::<u64>().ok(),
            "MD5" => {
                meta.insert(Key::CHKSUM, value);
            }
            _ => {
                if let Ok(key) = name.to_uppercase().parse::<Key>() {
                    meta.insert(key, value);
                }
            }
        }
    }

    let cpv = cpv?;
    let (category, pf) = cpv.rsplit_once('/')?;
    let pn = crate::atom::Atom::try_new(pf, Some(category))
        .ok()
        .and_then(|a| a.pn().map(str::to_string))
        .unwrap_or_else(|| pf.to_string());
    let path = match rel_path {
        Some(p) => root.join(p),
        None => root.join(format!("{category}/{pf}.tbz2")),
    };

    let mut pkg = Package::new(category, &pn, pf, path);
    if let Some(id) = buildid {
        pkg = pkg.with_buildid(id);
    }
    pkg.set_metadata(meta);
    Some(pkg)
}

impl Backend for PackagesBackend {
    fn format(&self) -> TreeFormat {
        TreeFormat::Packages
    }

    fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn repo_name(&self) -> &str {
        "binpkgs"
    }

    fn load_categories(&self, categories: &LazyList) -> crate::Result<()> {
        self.ensure_parsed()?;
        let names = self
            .parsed
            .borrow()
            .as_ref()
            .map(|m| m.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        categories.fill(names);
        Ok(())
    }

    fn load_packages(&self, category: &str, pn: Option<&str>) -> crate::Result<Vec<Package>> {
        self.ensure_parsed()?;
        // the whole index is parsed up front, so a PN query just narrows
        // the already-materialized list rather than shortcutting any I/O.
        // A full-category query (`pn` is `None`) moves the entry out since
        // the tree-level cache takes ownership of it from here on; a PN
        // query clones out a subset and leaves the category entry in place
        // for any other PN queried against the same category later.
        match pn {
            None => Ok(self
                .parsed
                .borrow_mut()
                .as_mut()
                .and_then(|m| m.shift_remove(category))
                .unwrap_or_default()),
            Some(pn) => Ok(self
                .parsed
                .borrow()
                .as_ref()
                .and_then(|m| m.get(category))
                .map(|pkgs| pkgs.iter().filter(|p| p.pn() == pn).cloned().collect())
                .unwrap_or_default()),
        }
    }

    fn fill_metadata(&self, _pkg: &Package) -> crate::Result<()> {
        // every block's KEY: value pairs are already materialized by
        // `parse_block` at index-parse time.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cpv_and_keys() {
        let root = Utf8Path::new("/repo");
        let block = "CPV: dev-lang/python-3.11.4\nPATH: dev-lang/python-3.11.4-1.xpak\nBUILD_ID: 1\nSLOT: 3.11/3.11\nMD5: deadbeef\n";
        let pkg = parse_block(block, root).unwrap();
        assert_eq!(pkg.category(), "dev-lang");
        assert_eq!(pkg.pn(), "python");
        assert_eq!(pkg.pf(), "python-3.11.4");
        assert_eq!(pkg.buildid(), Some(1));
    }

    #[test]
    fn skips_header_block_without_cpv() {
        let root = Utf8Path::new("/repo");
        let block = "VERSION: 1\nPACKAGES: 5\n";
        assert!(parse_block(block, root).is_none());
    }
}
