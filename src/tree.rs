//! On-disk tree backends (spec.md §4.3): a uniform traversal/metadata
//! interface over four physical layouts (EBUILD, VDB, BINPKGS, PACKAGES).
//!
//! Trees are single-threaded and synchronous (spec.md §5): every accessor
//! may block on disk I/O the first time it's called for a given category or
//! package, then serves from the in-memory cache. Nothing here spawns
//! background work.

use std::cell::{Cell, RefCell};
use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;
use once_cell::unsync::OnceCell;
use regex::Regex;
use strum::{AsRefStr, Display as StrumDisplay, EnumIter, EnumString};

use crate::atom::{Atom, Version};
use crate::Error;

mod binpkg;
mod contents;
mod ebuild;
mod packages;
mod vdb;

pub use contents::ContentsEntry;

/// Which of the four on-disk layouts a [`Tree`] is backed by.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TreeFormat {
    Ebuild,
    Vdb,
    Binpkg,
    Packages,
}

impl fmt::Display for TreeFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::Ebuild => "ebuild",
            Self::Vdb => "vdb",
            Self::Binpkg => "binpkg",
            Self::Packages => "packages",
        };
        write!(f, "{s}")
    }
}

/// Closed enumeration of per-package metadata keys (spec.md §4.3, §6).
#[derive(
    Debug, AsRefStr, EnumIter, EnumString, StrumDisplay, PartialEq, Eq, PartialOrd, Ord, Hash,
    Copy, Clone,
)]
#[strum(serialize_all = "UPPERCASE")]
#[allow(non_camel_case_types)]
pub enum Key {
    BDEPEND,
    DEFINED_PHASES,
    DEPEND,
    DESCRIPTION,
    EAPI,
    HOMEPAGE,
    IDEPEND,
    INHERIT,
    IUSE,
    KEYWORDS,
    LICENSE,
    PDEPEND,
    PROPERTIES,
    RDEPEND,
    REQUIRED_USE,
    RESTRICT,
    SLOT,
    SRC_URI,
    USE,
    CONTENTS,
    /// md5-cache's `_eclasses_` line.
    INHERITED,
    /// md5-cache's `_md5_` line.
    CHKSUM,
}

static CATEGORY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9+_][A-Za-z0-9+_.-]*$").unwrap());
static PACKAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9+_][A-Za-z0-9+_-]*$").unwrap());

/// Validate a bare category name (spec.md §4.3): standard filesystem-safe
/// characters, `virtual` exempted from the "must contain a hyphen" rule that
/// otherwise distinguishes a category from a lone package name.
pub fn is_valid_category(name: &str) -> bool {
    CATEGORY_RE.is_match(name) && (name == "virtual" || name.contains('-'))
}

/// Validate a bare package name (PN), rejecting anything that would parse
/// back as a trailing version component.
pub fn is_valid_package_name(name: &str) -> bool {
    if !PACKAGE_RE.is_match(name) {
        return false;
    }
    match name.rsplit_once('-') {
        Some((_, tail)) => tail.parse::<Version>().is_err(),
        None => true,
    }
}

/// A name + on-demand, insertion-ordered child list shared by the
/// tree-of-categories and category-of-packages relationships (spec.md §9's
/// "lazy caches with interior mutability" note).
#[derive(Debug, Default)]
struct LazyList {
    items: RefCell<IndexSet<String>>,
    complete: Cell<bool>,
}

impl LazyList {
    fn is_complete(&self) -> bool {
        self.complete.get()
    }

    fn fill(&self, names: impl IntoIterator<Item = String>) {
        *self.items.borrow_mut() = names.into_iter().collect();
        self.complete.set(true);
    }

    fn iter_sorted(&self) -> Vec<String> {
        let mut v: Vec<_> = self.items.borrow().iter().cloned().collect();
        v.sort();
        v
    }
}

/// A single package entry within a tree.
///
/// Metadata is filled in lazily and cached per key; which strategy fills it
/// depends on the owning tree's backend, so accessors take the tree as an
/// explicit argument rather than storing a back-pointer here (spec.md §9's
/// "drop the back-pointer" design note, applied to avoid a Package <-> Tree
/// reference cycle).
#[derive(Debug, Clone)]
pub struct Package {
    category: String,
    pn: String,
    pf: String,
    path: Utf8PathBuf,
    buildid: Option<u64>,
    atom: OnceCell<Atom>,
    meta: RefCell<IndexMap<Key, String>>,
    meta_complete: Cell<bool>,
}

impl Package {
    pub(crate) fn new(category: &str, pn: &str, pf: &str, path: Utf8PathBuf) -> Self {
        Self {
            category: category.to_string(),
            pn: pn.to_string(),
            pf: pf.to_string(),
            path,
            buildid: None,
            atom: OnceCell::new(),
            meta: RefCell::new(IndexMap::new()),
            meta_complete: Cell::new(false),
        }
    }

    pub(crate) fn with_buildid(mut self, buildid: u64) -> Self {
        self.buildid = Some(buildid);
        self
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn pn(&self) -> &str {
        &self.pn
    }

    pub fn pf(&self) -> &str {
        &self.pf
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn buildid(&self) -> Option<u64> {
        self.buildid
    }

    /// `CATEGORY/PF` atom, SLOT appended once metadata has been filled.
    pub fn atom(&self, tree: &Tree) -> crate::Result<&Atom> {
        self.atom.get_or_try_init(|| {
            let mut spec = format!("{}/{}", self.category, self.pf);
            if let Some(buildid) = self.buildid {
                spec = format!("{spec}-b{buildid}");
            }
            if let Some(slot) = self.metadata(tree, Key::SLOT)? {
                let main_slot = slot.split('/').next().unwrap_or(&slot).to_string();
                spec = format!("{spec}:{main_slot}");
            }
            spec = format!("{spec}::{}", tree.repo_name());
            Atom::try_new(&spec, None)
        })
    }

    /// Pre-populate the metadata cache directly, used by backends whose fill
    /// strategy naturally produces every key at once (md5-cache, PACKAGES
    /// index blocks).
    pub(crate) fn set_metadata(&self, meta: IndexMap<Key, String>) {
        *self.meta.borrow_mut() = meta;
        self.meta_complete.set(true);
    }

    /// Look up (filling the cache on first touch) a single metadata key.
    pub fn metadata(&self, tree: &Tree, key: Key) -> crate::Result<Option<String>> {
        if !self.meta_complete.get() {
            tree.fill_metadata(self)?;
        }
        Ok(self.meta.borrow().get(&key).cloned())
    }

    /// All cached metadata key/value pairs, filling the cache first.
    pub fn metadata_map(&self, tree: &Tree) -> crate::Result<IndexMap<Key, String>> {
        if !self.meta_complete.get() {
            tree.fill_metadata(self)?;
        }
        Ok(self.meta.borrow().clone())
    }
}

/// Per-backend behavior a [`Tree`] dispatches to.
pub(crate) trait Backend: fmt::Debug {
    fn format(&self) -> TreeFormat;
    fn root(&self) -> &Utf8Path;
    fn repo_name(&self) -> &str;

    /// Populate `categories` from disk if not already complete.
    fn load_categories(&self, categories: &LazyList) -> crate::Result<()>;

    /// Populate the package list of `category` from disk if not already
    /// complete, returning the constructed [`Package`] entries. When `pn` is
    /// given, a backend may short-circuit straight to that PN's directory
    /// instead of listing every PN under `category`.
    fn load_packages(&self, category: &str, pn: Option<&str>) -> crate::Result<Vec<Package>>;

    /// Fill in every metadata key for `pkg` this backend knows how to
    /// produce.
    fn fill_metadata(&self, pkg: &Package) -> crate::Result<()>;
}

/// An on-disk package tree: one of the four physical layouts spec.md §4.3
/// names, behind a single traversal/metadata surface.
#[derive(Debug)]
pub struct Tree {
    backend: Box<dyn Backend>,
    categories: LazyList,
    packages: RefCell<IndexMap<String, Vec<Package>>>,
}

impl Tree {
    fn new(backend: Box<dyn Backend>) -> Self {
        Self {
            backend,
            categories: LazyList::default(),
            packages: RefCell::new(IndexMap::new()),
        }
    }

    pub fn open_ebuild(path: impl AsRef<Utf8Path>) -> crate::Result<Self> {
        Ok(Self::new(Box::new(ebuild::EbuildBackend::open(
            path.as_ref(),
        )?)))
    }

    pub fn open_vdb(path: impl AsRef<Utf8Path>) -> crate::Result<Self> {
        Ok(Self::new(Box::new(vdb::VdbBackend::open(path.as_ref())?)))
    }

    pub fn open_binpkg(path: impl AsRef<Utf8Path>) -> crate::Result<Self> {
        Ok(Self::new(Box::new(binpkg::BinpkgBackend::open(
            path.as_ref(),
        )?)))
    }

    pub fn open_packages(path: impl AsRef<Utf8Path>) -> crate::Result<Self> {
        Ok(Self::new(Box::new(packages::PackagesBackend::open(
            path.as_ref(),
        )?)))
    }

    pub fn format(&self) -> TreeFormat {
        self.backend.format()
    }

    pub fn root(&self) -> &Utf8Path {
        self.backend.root()
    }

    pub fn repo_name(&self) -> &str {
        self.backend.repo_name()
    }

    fn fill_metadata(&self, pkg: &Package) -> crate::Result<()> {
        self.backend.fill_metadata(pkg)
    }

    /// Category names, sorted lexicographically, loading the list from disk
    /// on first call.
    pub fn categories(&self) -> crate::Result<Vec<String>> {
        if !self.categories.is_complete() {
            tracing::debug!("{}: loading category list from disk", self.root());
            self.backend.load_categories(&self.categories)?;
        }
        Ok(self.categories.iter_sorted())
    }

    fn ensure_packages_loaded(&self, category: &str) -> crate::Result<()> {
        if self.packages.borrow().contains_key(category) {
            return Ok(());
        }
        tracing::debug!("{}: loading packages for category {category}", self.root());
        let mut pkgs = self.backend.load_packages(category, None)?;
        pkgs.sort_by(|a, b| a.pf.cmp(&b.pf));
        self.packages.borrow_mut().insert(category.to_string(), pkgs);
        Ok(())
    }

    /// Package entries for a single category, sorted by PF, behind a
    /// [`Ref`](std::cell::Ref) guard over the lazily-filled cache.
    pub fn packages(&self, category: &str) -> crate::Result<std::cell::Ref<'_, [Package]>> {
        self.ensure_packages_loaded(category)?;
        let borrowed = self.packages.borrow();
        Ok(std::cell::Ref::map(borrowed, |m| {
            m.get(category).map(|v| v.as_slice()).unwrap_or(&[])
        }))
    }

    /// Package entries for a category, narrowed to a single PN when given.
    /// A PN query short-circuits straight to that PN's on-disk location
    /// (spec.md §4.3) instead of listing the whole category, as long as the
    /// category hasn't already been listed in full.
    pub(crate) fn packages_for(
        &self,
        category: &str,
        pn: Option<&str>,
    ) -> crate::Result<std::cell::Ref<'_, [Package]>> {
        let Some(pn) = pn else {
            return self.packages(category);
        };
        if self.packages.borrow().contains_key(category) {
            return self.packages(category);
        }
        let key = pn_cache_key(category, pn);
        if !self.packages.borrow().contains_key(&key) {
            tracing::debug!("{}: loading packages for {category}/{pn}", self.root());
            let mut pkgs = self.backend.load_packages(category, Some(pn))?;
            pkgs.sort_by(|a, b| a.pf.cmp(&b.pf));
            self.packages.borrow_mut().insert(key.clone(), pkgs);
        }
        let borrowed = self.packages.borrow();
        Ok(std::cell::Ref::map(borrowed, move |m| {
            m.get(&key).map(|v| v.as_slice()).unwrap_or(&[])
        }))
    }

    /// Visit every package in the tree, optionally narrowed to a single
    /// category and/or package name (spec.md §4.3's `foreach_pkg`). When
    /// `sorted` is `false` packages are visited in on-disk PF order; when
    /// `true` each category is visited PN-grouped, newest-version-first,
    /// using the same ordering `match_atom`'s `MatchFlags::sort` applies.
    pub fn foreach_pkg<F>(
        &self,
        category: Option<&str>,
        pn: Option<&str>,
        sorted: bool,
        mut f: F,
    ) -> crate::Result<()>
    where
        F: FnMut(&Package) -> crate::Result<()>,
    {
        let cats = match category {
            Some(c) => vec![c.to_string()],
            None => self.categories()?,
        };
        for cat in cats {
            let pkgs = self.packages_for(&cat, pn)?;

            if sorted {
                let mut entries: Vec<(&Package, Option<Atom>)> = pkgs
                    .iter()
                    .filter(|p| pn.map_or(true, |want| p.pn() == want))
                    .map(|p| (p, p.atom(self).ok().cloned()))
                    .collect();
                entries.sort_by(|(a, a_atom), (b, b_atom)| {
                    a.pn().cmp(b.pn()).then_with(|| match (a_atom, b_atom) {
                        (Some(x), Some(y)) => {
                            crate::atom::version_order(x, y).then_with(|| b.pf().cmp(a.pf()))
                        }
                        _ => a.pf().cmp(b.pf()),
                    })
                });
                for (pkg, _) in entries {
                    f(pkg)?;
                }
                continue;
            }

            for pkg in pkgs.iter() {
                if let Some(pn) = pn {
                    if pkg.pn() != pn {
                        continue;
                    }
                }
                f(pkg)?;
            }
        }
        Ok(())
    }
}

fn pn_cache_key(category: &str, pn: &str) -> String {
    format!("{category}\u{0}{pn}")
}

pub(crate) fn io_err(path: &Utf8Path, err: std::io::Error) -> Error {
    Error::TreeInit {
        path: path.to_string(),
        err: err.to_string(),
    }
}
