//! Explicit caller-supplied environment (spec.md §9 "Global configuration").
//!
//! The C original threads portroot, overlay, colour, and verbosity state
//! through process-wide globals. This crate makes them explicit parameters
//! instead: a [`Config`] value callers build once and pass to the tree
//! constructors, rather than state the core library reads out of the
//! environment itself. This does not implement make.conf/profile stacking
//! (an explicit Non-goal) -- it is the minimal parameter set spec.md §9
//! calls out as having been globals in the C original.

use camino::{Utf8Path, Utf8PathBuf};

use crate::tree::Tree;

/// Caller-supplied environment for opening trees and formatting output.
#[derive(Debug, Clone)]
pub struct Config {
    portroot: Utf8PathBuf,
    suppress_warnings: bool,
    colour: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            portroot: Utf8PathBuf::from("/"),
            suppress_warnings: false,
            colour: true,
        }
    }
}

impl Config {
    pub fn new(portroot: impl AsRef<Utf8Path>) -> Self {
        Self {
            portroot: portroot.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    pub fn portroot(&self) -> &Utf8Path {
        &self.portroot
    }

    pub fn with_portroot(mut self, portroot: impl AsRef<Utf8Path>) -> Self {
        self.portroot = portroot.as_ref().to_path_buf();
        self
    }

    /// Whether per-package diagnostic warnings (spec.md §7's "optionally
    /// printed to a caller-supplied stream") should be suppressed. The core
    /// itself only emits warnings through `tracing`; this flag is consulted
    /// by applets wiring up their own subscriber filter.
    pub fn suppress_warnings(&self) -> bool {
        self.suppress_warnings
    }

    pub fn with_suppressed_warnings(mut self, suppress: bool) -> Self {
        self.suppress_warnings = suppress;
        self
    }

    pub fn colour(&self) -> bool {
        self.colour
    }

    pub fn with_colour(mut self, colour: bool) -> Self {
        self.colour = colour;
        self
    }

    /// Resolve a tree-relative subpath against the configured portroot.
    fn resolve(&self, subpath: impl AsRef<Utf8Path>) -> Utf8PathBuf {
        let subpath = subpath.as_ref();
        match subpath.strip_prefix("/") {
            Ok(rel) => self.portroot.join(rel),
            Err(_) => self.portroot.join(subpath),
        }
    }

    pub fn open_ebuild(&self, subpath: impl AsRef<Utf8Path>) -> crate::Result<Tree> {
        Tree::open_ebuild(self.resolve(subpath))
    }

    pub fn open_vdb(&self, subpath: impl AsRef<Utf8Path>) -> crate::Result<Tree> {
        Tree::open_vdb(self.resolve(subpath))
    }

    pub fn open_binpkg(&self, subpath: impl AsRef<Utf8Path>) -> crate::Result<Tree> {
        Tree::open_binpkg(self.resolve(subpath))
    }

    pub fn open_packages(&self, subpath: impl AsRef<Utf8Path>) -> crate::Result<Tree> {
        Tree::open_packages(self.resolve(subpath))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_joins_relative_subpath_to_portroot() {
        let config = Config::new("/mnt/gentoo");
        assert_eq!(config.resolve("var/db/pkg"), Utf8PathBuf::from("/mnt/gentoo/var/db/pkg"));
        assert_eq!(
            config.resolve("/var/db/pkg"),
            Utf8PathBuf::from("/mnt/gentoo/var/db/pkg")
        );
    }

    #[test]
    fn default_portroot_is_root() {
        assert_eq!(Config::default().portroot(), Utf8Path::new("/"));
    }

    #[test]
    fn open_vdb_resolves_against_portroot() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        std::fs::create_dir_all(root.join("var/db/pkg/cat-egory/pkg-1")).unwrap();

        let config = Config::new(&root);
        let tree = config.open_vdb("var/db/pkg").unwrap();
        assert_eq!(tree.categories().unwrap(), vec!["cat-egory".to_string()]);
    }
}
