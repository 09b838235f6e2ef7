//! Match engine (spec.md §4.4): enumerate packages in a [`Tree`] satisfying
//! a query [`Atom`], with configurable filters for virtuals, account
//! categories, latest-only, first-only, and sort order.
//!
//! `match_atom` is a thin layer on `Tree::packages`/`Tree::categories`: it
//! narrows to the query's CATEGORY/PN when given, compares every candidate's
//! own atom against the query via [`Atom::compare`], then applies the
//! flag-driven post-filters spec.md §4.4 describes.

use std::cell::Ref;
use std::collections::HashSet;

use crate::atom::{version_order, Atom, CompareFlags, CompareResult};
use crate::dep::AtomResolver;
use crate::tree::{Package, Tree};

/// Filters controlling [`match_atom`]'s result set (spec.md §4.4).
///
/// `virtual_` and `acct` default to `true` (categories included); spec.md's
/// `~VIRTUAL`/`~ACCT` forms are expressed by clearing the field with
/// [`MatchFlags::without_virtual`]/[`MatchFlags::without_acct`].
#[derive(Debug, Clone, Copy)]
pub struct MatchFlags {
    pub latest: bool,
    pub first: bool,
    pub virtual_: bool,
    pub acct: bool,
    pub sort: bool,
    pub norev: bool,
    pub noslot: bool,
    pub nosubslot: bool,
    pub norepo: bool,
}

impl Default for MatchFlags {
    fn default() -> Self {
        Self {
            latest: false,
            first: false,
            virtual_: true,
            acct: true,
            sort: false,
            norev: false,
            noslot: false,
            nosubslot: false,
            norepo: false,
        }
    }
}

impl MatchFlags {
    pub fn latest(mut self) -> Self {
        self.latest = true;
        self
    }

    pub fn first(mut self) -> Self {
        self.first = true;
        self
    }

    pub fn sort(mut self) -> Self {
        self.sort = true;
        self
    }

    pub fn without_virtual(mut self) -> Self {
        self.virtual_ = false;
        self
    }

    pub fn without_acct(mut self) -> Self {
        self.acct = false;
        self
    }

    pub fn norev(mut self) -> Self {
        self.norev = true;
        self
    }

    pub fn noslot(mut self) -> Self {
        self.noslot = true;
        self
    }

    pub fn nosubslot(mut self) -> Self {
        self.nosubslot = true;
        self
    }

    pub fn norepo(mut self) -> Self {
        self.norepo = true;
        self
    }

    fn compare_flags(&self) -> CompareFlags {
        CompareFlags {
            norev: self.norev,
            noslot: self.noslot,
            nosubslot: self.nosubslot,
            norepo: self.norepo,
        }
    }
}

struct Candidate {
    slice_idx: usize,
    pkg_idx: usize,
    category: String,
    pn: String,
    atom: Atom,
}

/// Borrowed result of [`match_atom`]: keeps every matching category's
/// package slice borrowed for as long as the match set is alive (spec.md's
/// "callers receive borrowed references whose lifetime is that of the
/// enclosing tree").
pub struct MatchSet<'t> {
    slices: Vec<Ref<'t, [Package]>>,
    indices: Vec<(usize, usize)>,
}

impl<'t> MatchSet<'t> {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Package> {
        self.indices.iter().map(move |&(si, pi)| &self.slices[si][pi])
    }
}

/// Enumerate packages in `tree` satisfying `atom` under `flags`
/// (spec.md §4.4).
pub fn match_atom<'t>(tree: &'t Tree, atom: &Atom, flags: MatchFlags) -> crate::Result<MatchSet<'t>> {
    let categories = match atom.category() {
        Some(c) => vec![c.to_string()],
        None => tree.categories()?,
    };

    let compare_flags = flags.compare_flags();
    let mut slices: Vec<Ref<'t, [Package]>> = Vec::new();
    let mut candidates: Vec<Candidate> = Vec::new();

    for cat in categories {
        if !flags.virtual_ && cat == "virtual" {
            continue;
        }
        if !flags.acct && cat.starts_with("acct-") {
            continue;
        }

        let pkgs = tree.packages_for(&cat, atom.pn())?;
        let slice_idx = slices.len();

        for (pkg_idx, pkg) in pkgs.iter().enumerate() {
            if let Some(pn) = atom.pn() {
                if pkg.pn() != pn {
                    continue;
                }
            }
            // a package whose own atom fails to materialise (bad metadata,
            // unreadable file) is skipped, not fatal to the whole match
            // (spec.md §7: per-package failures don't abort traversal).
            let pkg_atom = match pkg.atom(tree) {
                Ok(a) => a,
                Err(e) => {
                    tracing::warn!("skipping {cat}/{}: {e}", pkg.pf());
                    continue;
                }
            };
            if pkg_atom.compare(atom, compare_flags) == CompareResult::Equal {
                candidates.push(Candidate {
                    slice_idx,
                    pkg_idx,
                    category: cat.clone(),
                    pn: pkg.pn().to_string(),
                    atom: pkg_atom.clone(),
                });
            }
        }

        slices.push(pkgs);
    }

    // traversal already visits categories lexicographically and packages in
    // PF order (spec.md §4.3), so the identity ordering is the unsorted one.
    let mut order: Vec<usize> = (0..candidates.len()).collect();

    if flags.latest || flags.sort {
        let mut by_version = order.clone();
        by_version.sort_by(|&i, &j| {
            let (a, b) = (&candidates[i], &candidates[j]);
            a.category
                .cmp(&b.category)
                .then_with(|| a.pn.cmp(&b.pn))
                .then_with(|| version_order(&a.atom, &b.atom))
                .then_with(|| b.atom.pf().cmp(&a.atom.pf()))
        });

        if flags.latest {
            let mut retained = HashSet::new();
            let mut last_key: Option<(&str, &str)> = None;
            for &i in &by_version {
                let c = &candidates[i];
                let key = (c.category.as_str(), c.pn.as_str());
                if last_key != Some(key) {
                    retained.insert(i);
                    last_key = Some(key);
                }
            }
            order.retain(|i| retained.contains(i));
            if flags.sort {
                order = by_version.into_iter().filter(|i| retained.contains(i)).collect();
            }
        } else {
            order = by_version;
        }
    }

    if flags.first {
        order.truncate(1);
    }

    let indices = order
        .into_iter()
        .map(|i| (candidates[i].slice_idx, candidates[i].pkg_idx))
        .collect();

    Ok(MatchSet { slices, indices })
}

/// Resolves a dep-expression leaf atom against this tree using `LATEST`,
/// per spec.md §4.2's "Resolve" step (dep.rs's `AtomResolver` doc comment).
impl AtomResolver<Atom> for Tree {
    fn resolve_atom(&self, atom: &Atom) -> Option<Atom> {
        let matches = match_atom(self, atom, MatchFlags::default().latest()).ok()?;
        matches.iter().next()?.atom(self).ok().cloned()
    }
}
