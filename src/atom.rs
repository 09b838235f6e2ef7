//! Atom model and comparator (spec.md §4.1).
//!
//! Parses `[!|!!|^][op]CAT/PN[-PV[-rREV][letter][_suffix[N]]...][*]
//! [:SLOT[/SUBSLOT][=|*]][USEDEPS][::REPO]` into a structured [`Atom`], and
//! decides whether a *data* atom satisfies a *query* atom under PMS
//! version-comparison rules via [`Atom::compare`].

use std::fmt;

use strum::{AsRefStr, Display as StrumDisplay, EnumString};

mod format;
mod parse;
mod use_dep;
mod version;

pub use use_dep::{UseDep, UseDepSuffix};
pub use version::{Revision, Version};

/// Blocker prefix: `!` (soft), `!!` (hard), or the `^` antislot extension
/// matching "same CATEGORY/PN, different SLOT".
#[repr(u8)]
#[derive(Debug, AsRefStr, StrumDisplay, EnumString, PartialEq, Eq, PartialOrd, Ord, Hash, Copy, Clone)]
pub enum Blocker {
    #[strum(serialize = "!!")]
    Strong = 1,
    #[strum(serialize = "!")]
    Weak,
    #[strum(serialize = "^")]
    Antislot,
}

/// Version-range operator prefixing an atom's PV (`=`, `>`, `>=`, `<`,
/// `<=`, `~`). Spec.md also names a `≠` ("not-equal") value in its field
/// table, but no atom grammar token produces it -- no parse path
/// constructs this variant; it exists only so `CompareResult` collapsing
/// logic has somewhere to route a hypothetical negated-version query.
#[repr(u8)]
#[derive(Debug, AsRefStr, StrumDisplay, EnumString, PartialEq, Eq, PartialOrd, Ord, Hash, Copy, Clone)]
pub enum PrefixOp {
    #[strum(serialize = "<")]
    Less = 1,
    #[strum(serialize = "<=")]
    LessOrEqual,
    #[strum(serialize = "=")]
    Equal,
    #[strum(serialize = "~")]
    Approximate,
    #[strum(serialize = ">=")]
    GreaterOrEqual,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = "!=")]
    NotEqual,
}

/// Trailing `*` glob-match suffix operator, only meaningful combined with
/// [`PrefixOp::Equal`] (`=cat/pkg-1.2*`).
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone, Default)]
pub enum SuffixOp {
    #[default]
    None,
    Glob,
}

/// Whether an atom's SUBSLOT was given explicitly or defaults to SLOT.
///
/// The C original derives "SUBSLOT == SLOT" via pointer identity on a
/// shared buffer (spec.md §9); we represent the distinction explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subslot {
    Same,
    Value(String),
}

/// `SLOT` operator: `=` (any-rebuild) or `*` (any-ignore).
#[repr(u8)]
#[derive(Debug, AsRefStr, StrumDisplay, EnumString, PartialEq, Eq, PartialOrd, Ord, Hash, Copy, Clone)]
pub enum SlotOperator {
    #[strum(serialize = "=")]
    Equal = 1,
    #[strum(serialize = "*")]
    Star,
}

/// A parsed package atom.
#[derive(Debug, Clone)]
pub struct Atom {
    pub(crate) blocker: Option<Blocker>,
    pub(crate) pfx_op: Option<PrefixOp>,
    pub(crate) sfx_op: SuffixOp,
    pub(crate) category: Option<String>,
    pub(crate) pn: Option<String>,
    pub(crate) version: Option<Version>,
    pub(crate) slot: Option<String>,
    pub(crate) subslot: Option<Subslot>,
    pub(crate) slot_op: Option<SlotOperator>,
    pub(crate) use_deps: Vec<UseDep>,
    pub(crate) repo: Option<String>,
    pub(crate) buildid: Option<u64>,
}

/// Flags suppressing parts of [`Atom::compare`]'s structural comparison.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CompareFlags {
    pub norev: bool,
    pub noslot: bool,
    pub nosubslot: bool,
    pub norepo: bool,
}

/// Outcome of a structural (pre-operator) atom comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareResult {
    NotEqual,
    Equal,
    Newer,
    Older,
}

impl Atom {
    /// Parse an atom from a string, optionally overriding the category.
    ///
    /// The parser is liberal: it strips a trailing `.ebuild`/`.tbz2`
    /// extension and any leading path components, treating the final path
    /// segment as PF (spec.md §4.1).
    pub fn try_new(s: &str, category: Option<&str>) -> crate::Result<Self> {
        parse::atom(s, category)
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn pn(&self) -> Option<&str> {
        self.pn.as_deref()
    }

    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    pub fn slot(&self) -> Option<&str> {
        self.slot.as_deref()
    }

    /// Resolved SUBSLOT, defaulting to SLOT when not given explicitly.
    pub fn subslot(&self) -> Option<&str> {
        match (&self.subslot, &self.slot) {
            (Some(Subslot::Value(s)), _) => Some(s.as_str()),
            (Some(Subslot::Same), Some(slot)) => Some(slot.as_str()),
            _ => None,
        }
    }

    pub fn slot_op(&self) -> Option<SlotOperator> {
        self.slot_op
    }

    pub fn repo(&self) -> Option<&str> {
        self.repo.as_deref()
    }

    pub fn blocker(&self) -> Option<Blocker> {
        self.blocker
    }

    pub fn use_deps(&self) -> &[UseDep] {
        &self.use_deps
    }

    pub fn buildid(&self) -> Option<u64> {
        self.buildid
    }

    /// Full package name: `PN-PVR`, or just `PN` when unversioned.
    pub fn pf(&self) -> Option<String> {
        let pn = self.pn.as_ref()?;
        match &self.version {
            Some(v) => Some(format!("{pn}-{v}")),
            None => Some(pn.clone()),
        }
    }

    /// Compare this atom (the *data* atom, typically from a tree) against a
    /// *query* atom, collapsing the structural outcome by the query's
    /// operators per the table in spec.md §4.1.
    pub fn compare(&self, query: &Atom, flags: CompareFlags) -> CompareResult {
        use CompareResult::*;

        // CATEGORY: both specified or neither; if both, must match.
        match (&self.category, &query.category) {
            (Some(a), Some(b)) if a != b => return NotEqual,
            (Some(_), None) | (None, Some(_)) => return NotEqual,
            _ => {}
        }

        // PN must match when both are specified.
        match (&self.pn, &query.pn) {
            (Some(a), Some(b)) if a != b => return NotEqual,
            (Some(_), None) | (None, Some(_)) => return NotEqual,
            _ => {}
        }

        if query.blocker == Some(Blocker::Antislot) {
            let same_slot = self.slot == query.slot && self.subslot() == query.subslot();
            return if !same_slot { Equal } else { NotEqual };
        }

        if !flags.noslot {
            if let (Some(a), Some(b)) = (&self.slot, &query.slot) {
                if a != b {
                    return NotEqual;
                }
            }
        }
        if !flags.nosubslot {
            if let (Some(a), Some(b)) = (self.subslot(), query.subslot()) {
                if a != b {
                    return NotEqual;
                }
            }
        }
        if !flags.norepo {
            if let (Some(a), Some(b)) = (&self.repo, &query.repo) {
                if a != b {
                    return NotEqual;
                }
            }
        }

        // no query version at all means "matches any version of this PN"
        let (v1, v2) = match (&self.version, &query.version) {
            (Some(a), Some(b)) => (a, b),
            (_, None) => return Equal,
            (None, Some(_)) => return NotEqual,
        };

        let mut structural = if flags.norev {
            match v1.cmp_non_revision(v2) {
                std::cmp::Ordering::Less => Older,
                std::cmp::Ordering::Equal => Equal,
                std::cmp::Ordering::Greater => Newer,
            }
        } else {
            match v1.cmp(v2) {
                std::cmp::Ordering::Less => Older,
                std::cmp::Ordering::Equal => Equal,
                std::cmp::Ordering::Greater => Newer,
            }
        };

        // BUILDID is the final numeric tiebreaker, consulted only once
        // everything through revision compares equal (spec.md §4.1).
        if structural == Equal {
            let b1 = self.buildid.unwrap_or(0);
            let b2 = query.buildid.unwrap_or(0);
            structural = match b1.cmp(&b2) {
                std::cmp::Ordering::Less => Older,
                std::cmp::Ordering::Equal => Equal,
                std::cmp::Ordering::Greater => Newer,
            };
        }

        self.collapse_by_operator(structural, v1, v2, query)
    }

    /// Apply the query's pfx_op/sfx_op/blocker to collapse a structural
    /// {NEWER,OLDER,EQUAL} result into {EQUAL,NOT_EQUAL}, per the table in
    /// spec.md §4.1. The C original's "swap a1 & a2 so a2 carries the
    /// operators" rule falls out naturally here: the data atom (`self`)
    /// never carries operators, the query always does.
    fn collapse_by_operator(
        &self,
        structural: CompareResult,
        data_ver: &Version,
        query_ver: &Version,
        query: &Atom,
    ) -> CompareResult {
        use CompareResult::*;

        let result = match query.pfx_op {
            None => structural,
            Some(PrefixOp::Equal) => {
                if query.sfx_op == SuffixOp::Glob {
                    if data_ver.starts_with(query_ver) {
                        Equal
                    } else {
                        NotEqual
                    }
                } else if structural == Equal {
                    Equal
                } else {
                    NotEqual
                }
            }
            Some(PrefixOp::Greater) => {
                if structural == Newer {
                    Equal
                } else {
                    NotEqual
                }
            }
            Some(PrefixOp::GreaterOrEqual) => {
                if matches!(structural, Newer | Equal) {
                    Equal
                } else {
                    NotEqual
                }
            }
            Some(PrefixOp::Less) => {
                if structural == Older {
                    Equal
                } else {
                    NotEqual
                }
            }
            Some(PrefixOp::LessOrEqual) => {
                if matches!(structural, Older | Equal) {
                    Equal
                } else {
                    NotEqual
                }
            }
            Some(PrefixOp::Approximate) => {
                if data_ver.cmp_non_revision(query_ver) == std::cmp::Ordering::Equal {
                    Equal
                } else {
                    NotEqual
                }
            }
            Some(PrefixOp::NotEqual) => {
                if structural != Equal {
                    Equal
                } else {
                    NotEqual
                }
            }
        };

        match query.blocker {
            None | Some(Blocker::Antislot) => result,
            Some(Blocker::Weak) | Some(Blocker::Strong) => {
                if result == Equal {
                    NotEqual
                } else {
                    Equal
                }
            }
        }
    }

    /// Reconstruct the canonical atom string (inverse of parsing).
    pub fn to_string_full(&self) -> String {
        format::to_string(self)
    }

    /// Render this atom using a `%{KEY}` / `%[KEY]` format template
    /// (spec.md §4.1).
    pub fn format(&self, spec: &str) -> crate::Result<String> {
        format::format(self, spec)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_string_full())
    }
}

impl std::str::FromStr for Atom {
    type Err = crate::Error;
    fn from_str(s: &str) -> crate::Result<Self> {
        Self::try_new(s, None)
    }
}

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        self.to_string_full() == other.to_string_full()
    }
}
impl Eq for Atom {}

/// Newer-first ordering between two plain (operator-less) package atoms,
/// falling back to `Equal` when the atoms aren't comparable (e.g. differing
/// SLOT) rather than attempting to impose an arbitrary order. Shared by
/// match_engine.rs's result sort and tree.rs's `foreach_pkg(sorted = true)`.
pub(crate) fn version_order(a: &Atom, b: &Atom) -> std::cmp::Ordering {
    match a.compare(b, CompareFlags::default()) {
        CompareResult::Newer => std::cmp::Ordering::Less,
        CompareResult::Older => std::cmp::Ordering::Greater,
        CompareResult::Equal | CompareResult::NotEqual => std::cmp::Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_example() {
        // spec.md §8 end-to-end scenario 1
        let a = Atom::try_new("=sys-devel/gcc-12.3.1_p20230526-r1:12/12.3=::gentoo", None)
            .unwrap();
        assert_eq!(a.pfx_op, Some(PrefixOp::Equal));
        assert_eq!(a.category(), Some("sys-devel"));
        assert_eq!(a.pn(), Some("gcc"));
        assert_eq!(a.version().unwrap().as_str(), "12.3.1_p20230526");
        assert_eq!(a.version().unwrap().revision().as_str(), "1");
        assert_eq!(a.slot(), Some("12"));
        assert_eq!(a.subslot(), Some("12.3"));
        assert_eq!(a.slot_op, Some(SlotOperator::Equal));
        assert_eq!(a.repo(), Some("gentoo"));
    }

    #[test]
    fn compare_ge_scenario() {
        let data = Atom::try_new("sys-devel/gcc-12.3.1", None).unwrap();
        let query = Atom::try_new(">=sys-devel/gcc-12", None).unwrap();
        assert_eq!(data.compare(&query, CompareFlags::default()), CompareResult::Equal);
    }

    #[test]
    fn compare_lt_scenario() {
        let data = Atom::try_new("sys-devel/gcc-12.3.1", None).unwrap();
        let query = Atom::try_new("<sys-devel/gcc-12", None).unwrap();
        assert_eq!(data.compare(&query, CompareFlags::default()), CompareResult::NotEqual);
    }

    #[test]
    fn compare_equal_glob_scenario() {
        let query = Atom::try_new("=dev-lang/python-3.11*", None).unwrap();
        let matching = Atom::try_new("dev-lang/python-3.11.5", None).unwrap();
        let not_matching = Atom::try_new("dev-lang/python-3.12.0", None).unwrap();
        assert_eq!(matching.compare(&query, CompareFlags::default()), CompareResult::Equal);
        assert_eq!(
            not_matching.compare(&query, CompareFlags::default()),
            CompareResult::NotEqual
        );
    }

    #[test]
    fn round_trip() {
        for s in [
            "cat/pkg",
            "=cat/pkg-1.2-r3",
            ">=cat/pkg-1.2:3/3.1=",
            "!cat/pkg",
            "!!cat/pkg",
            "cat/pkg[x,-y,z=,!w?]",
            "cat/pkg::repo",
        ] {
            let a = Atom::try_new(s, None).unwrap();
            let b = Atom::try_new(&a.to_string_full(), None).unwrap();
            assert_eq!(a, b, "round trip failed for {s}");
            assert_eq!(a.to_string_full(), s);
        }
    }

    #[test]
    fn antislot_blocker() {
        let data = Atom::try_new("cat/pkg-1:2", None).unwrap();
        let diff_slot = Atom::try_new("cat/pkg-1:3", None).unwrap();
        let mut query = Atom::try_new("cat/pkg:2", None).unwrap();
        query.blocker = Some(Blocker::Antislot);
        assert_eq!(data.compare(&query, CompareFlags::default()), CompareResult::NotEqual);
        assert_eq!(diff_slot.compare(&query, CompareFlags::default()), CompareResult::Equal);
    }
}
