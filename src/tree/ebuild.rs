//! EBUILD tree backend: a `CATEGORY/PN/PN-PVR.ebuild` source layout with an
//! optional `metadata/md5-cache/CATEGORY/PF` cache of pre-parsed keys,
//! grounded on the teacher's `repo/ebuild/cache/md5_dict.rs` dictionary
//! format and falling back to direct ebuild shell-assignment parsing when
//! the cache entry is missing or its checksum doesn't match (spec.md §6).

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;

use crate::files::{is_dir, is_ebuild, is_hidden, sorted_dir_list};
use crate::tree::{io_err, is_valid_category, Backend, Key, LazyList, Package, TreeFormat};
use crate::utils::digest;

#[derive(Debug)]
pub(super) struct EbuildBackend {
    root: Utf8PathBuf,
    repo_name: String,
}

impl EbuildBackend {
    pub(super) fn open(root: &Utf8Path) -> crate::Result<Self> {
        if !root.is_dir() {
            return Err(io_err(
                root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            ));
        }
        let repo_name = std::fs::read_to_string(root.join("profiles/repo_name"))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| root.file_name().unwrap_or("ebuild-repo").to_string());
        Ok(Self {
            root: root.to_path_buf(),
            repo_name,
        })
    }

    fn md5_cache_path(&self, category: &str, pf: &str) -> Utf8PathBuf {
        self.root.join("metadata/md5-cache").join(category).join(pf)
    }

    /// Try the md5-cache entry first; fall back to a direct ebuild parse if
    /// it's absent or its recorded checksum no longer matches the ebuild.
    fn fill_from_md5_cache(&self, pkg: &Package) -> crate::Result<bool> {
        let cache_path = self.md5_cache_path(pkg.category(), pkg.pf());
        let text = match std::fs::read_to_string(&cache_path) {
            Ok(t) => t,
            Err(_) => {
                tracing::debug!("no md5-cache entry for {}/{}", pkg.category(), pkg.pf());
                return Ok(false);
            }
        };
        let entries = parse_md5_dict(&text);
        if let Some(chksum) = entries.get(&Key::CHKSUM) {
            let actual = digest::<md5::Md5>(&std::fs::read(pkg.path()).unwrap_or_default());
            if &actual != chksum {
                tracing::warn!(
                    "stale md5-cache entry for {}/{}, falling back to ebuild parse",
                    pkg.category(),
                    pkg.pf()
                );
                return Ok(false);
            }
        }
        tracing::debug!("filled {}/{} metadata from md5-cache", pkg.category(), pkg.pf());
        pkg.set_metadata(entries);
        Ok(true)
    }

    fn load_pn_dir(&self, category: &str, pn: &str, pn_path: &Utf8Path) -> crate::Result<Vec<Package>> {
        let mut pkgs = Vec::new();
        for ebuild_entry in sorted_dir_list(pn_path)?.into_iter().filter(is_ebuild) {
            let stem = ebuild_entry
                .path()
                .file_stem()
                .unwrap_or(pn)
                .to_string();
            pkgs.push(Package::new(category, pn, &stem, ebuild_entry.path().to_path_buf()));
        }
        Ok(pkgs)
    }

    fn fill_from_ebuild_file(&self, pkg: &Package) -> crate::Result<()> {
        let text = std::fs::read_to_string(pkg.path()).map_err(|e| io_err(pkg.path(), e))?;
        let mut meta = IndexMap::new();
        for (key, value) in parse_shell_assignments(&text) {
            if let Ok(k) = key.parse::<Key>() {
                meta.insert(k, value);
            }
        }
        pkg.set_metadata(meta);
        Ok(())
    }
}

impl Backend for EbuildBackend {
    fn format(&self) -> TreeFormat {
        TreeFormat::Ebuild
    }

    fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn repo_name(&self) -> &str {
        &self.repo_name
    }

    fn load_categories(&self, categories: &LazyList) -> crate::Result<()> {
        // profiles/categories lists every valid category name, one per line,
        // including ones with no packages currently checked out.
        let listed = std::fs::read_to_string(self.root.join("profiles/categories"))
            .ok()
            .map(|s| {
                s.lines()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            });

        let names = match listed {
            Some(names) if !names.is_empty() => names,
            _ => sorted_dir_list(&self.root)?
                .into_iter()
                .filter(is_dir)
                .filter(|e| !is_hidden(e))
                .map(|e| e.file_name().to_string())
                .filter(|name| is_valid_category(name))
                .collect(),
        };
        categories.fill(names);
        Ok(())
    }

    fn load_packages(&self, category: &str, pn: Option<&str>) -> crate::Result<Vec<Package>> {
        let cat_path = self.root.join(category);
        if !cat_path.is_dir() {
            return Ok(Vec::new());
        }

        // a known PN short-circuits straight to its directory instead of
        // listing (and filtering) every PN under the category.
        if let Some(pn) = pn {
            let pn_path = cat_path.join(pn);
            if !pn_path.is_dir() {
                return Ok(Vec::new());
            }
            return Ok(self.load_pn_dir(category, pn, &pn_path)?);
        }

        let mut pkgs = Vec::new();
        for pn_entry in sorted_dir_list(&cat_path)?.into_iter().filter(is_dir) {
            let pn = pn_entry.file_name();
            pkgs.extend(self.load_pn_dir(category, pn, pn_entry.path())?);
        }
        Ok(pkgs)
    }

    fn fill_metadata(&self, pkg: &Package) -> crate::Result<()> {
        if self.fill_from_md5_cache(pkg)? {
            return Ok(());
        }
        self.fill_from_ebuild_file(pkg)
    }
}

/// Parse an md5-cache file's `KEY=value` lines, remapping the two
/// underscore-prefixed lines to [`Key::INHERITED`]/[`Key::CHKSUM`].
fn parse_md5_dict(text: &str) -> IndexMap<Key, String> {
    let mut out = IndexMap::new();
    for line in text.lines() {
        let Some((name, value)) = line.split_once('=') else {
            continue;
        };
        let key = match name {
            "_eclasses_" => Key::INHERITED,
            "_md5_" => Key::CHKSUM,
            _ => match name.parse::<Key>() {
                Ok(k) => k,
                Err(_) => continue,
            },
        };
        out.insert(key, value.to_string());
    }
    out
}

/// Extract top-level `KEY="value"`/`KEY='value'`/`KEY=value` assignments
/// from raw ebuild shell source, collapsing backslash-newline continuations
/// the way the shell would before the value is considered (spec.md §6).
/// This is intentionally not a shell interpreter: only literal assignments
/// for names in [`Key`] are recognized, no variable expansion is performed.
fn parse_shell_assignments(text: &str) -> Vec<(String, String)> {
    let joined = text.replace("\\\n", "");
    let mut out = Vec::new();
    for line in joined.lines() {
        let line = line.trim_start();
        let Some((name, rest)) = line.split_once('=') else {
            continue;
        };
        if !name.chars().all(|c| c.is_ascii_uppercase() || c == '_') {
            continue;
        }
        let rest = rest.trim();
        let value = if let Some(v) = rest.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
            v
        } else if let Some(v) = rest.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')) {
            v
        } else {
            rest
        };
        out.push((name.to_string(), value.to_string()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md5_dict_remaps_underscore_keys() {
        let text = "EAPI=8\n_md5_=deadbeef\n_eclasses_=foo\tabc123\n";
        let parsed = parse_md5_dict(text);
        assert_eq!(parsed.get(&Key::EAPI).map(String::as_str), Some("8"));
        assert_eq!(parsed.get(&Key::CHKSUM).map(String::as_str), Some("deadbeef"));
        assert_eq!(parsed.get(&Key::INHERITED).map(String::as_str), Some("foo\tabc123"));
    }

    #[test]
    fn shell_assignments_strip_quotes_and_join_continuations() {
        let text = "DESCRIPTION=\"a long \\\ndescription\"\nSLOT=\"0\"\n";
        let parsed = parse_shell_assignments(text);
        assert_eq!(
            parsed.iter().find(|(k, _)| k == "DESCRIPTION").map(|(_, v)| v.as_str()),
            Some("a long description")
        );
        assert_eq!(
            parsed.iter().find(|(k, _)| k == "SLOT").map(|(_, v)| v.as_str()),
            Some("0")
        );
    }
}
