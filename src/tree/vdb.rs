//! VDB (installed-package database) backend: `CATEGORY/PF/` directories,
//! each metadata key stored as its own single-line file, plus a multi-line
//! `CONTENTS` file (spec.md §4.3, §6).

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use strum::IntoEnumIterator;

use crate::atom::Atom;
use crate::files::{is_dir, is_hidden, sorted_dir_list};
use crate::tree::{io_err, is_valid_category, Backend, Key, LazyList, Package, TreeFormat};

#[derive(Debug)]
pub(super) struct VdbBackend {
    root: Utf8PathBuf,
}

impl VdbBackend {
    pub(super) fn open(root: &Utf8Path) -> crate::Result<Self> {
        if !root.is_dir() {
            return Err(io_err(
                root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            ));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }
}

impl Backend for VdbBackend {
    fn format(&self) -> TreeFormat {
        TreeFormat::Vdb
    }

    fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn repo_name(&self) -> &str {
        "installed"
    }

    fn load_categories(&self, categories: &LazyList) -> crate::Result<()> {
        let names = sorted_dir_list(&self.root)?
            .into_iter()
            .filter(is_dir)
            .filter(|e| !is_hidden(e))
            .map(|e| e.file_name().to_string())
            .filter(|name| is_valid_category(name))
            .collect::<Vec<_>>();
        categories.fill(names);
        Ok(())
    }

    fn load_packages(&self, category: &str, pn: Option<&str>) -> crate::Result<Vec<Package>> {
        let cat_path = self.root.join(category);
        if !cat_path.is_dir() {
            return Ok(Vec::new());
        }
        let mut pkgs = Vec::new();
        for entry in sorted_dir_list(&cat_path)?.into_iter().filter(is_dir) {
            let pf = entry.file_name();
            let entry_pn = Atom::try_new(pf, Some(category))
                .ok()
                .and_then(|a| a.pn().map(str::to_string))
                .unwrap_or_else(|| pf.to_string());
            if pn.is_some_and(|want| want != entry_pn) {
                continue;
            }
            pkgs.push(Package::new(category, &entry_pn, pf, entry.path().to_path_buf()));
        }
        Ok(pkgs)
    }

    fn fill_metadata(&self, pkg: &Package) -> crate::Result<()> {
        let mut meta = IndexMap::new();
        for key in Key::iter() {
            if key == Key::CONTENTS {
                continue;
            }
            let path = pkg.path().join(key.as_ref());
            if let Ok(value) = std::fs::read_to_string(&path) {
                let value = value.trim();
                if !value.is_empty() {
                    meta.insert(key, value.to_string());
                }
            }
        }
        if let Ok(contents) = std::fs::read_to_string(pkg.path().join("CONTENTS")) {
            meta.insert(Key::CONTENTS, contents);
        }
        pkg.set_metadata(meta);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pn_split_from_pf() {
        let atom = Atom::try_new("foo-1.2.3-r1", Some("cat")).unwrap();
        assert_eq!(atom.pn(), Some("foo"));
    }
}
