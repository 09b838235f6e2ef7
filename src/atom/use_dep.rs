use std::cmp::Ordering;
use std::fmt;

use crate::Error;

use super::parse;

/// Trailing condition on a USE-dependency: `flag` (none), `flag=` (equal,
/// meaning "match the same setting as the querying package"), or `flag?`
/// (conditional, meaning "enabled only if the querying package has it set").
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UseDepSuffix {
    None,
    Equal,
    Conditional,
}

/// A single element of an atom's USE-dependency sequence
/// (`CAT/PN[flag1,-flag2,flag3=,!flag4?]`).
///
/// Mirrors spec.md's `(flag, prefix-cond, suffix-cond)` triple: `invert` is
/// the prefix condition (leading `!` or `-`), `suffix` the trailing one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UseDep {
    pub(crate) flag: String,
    pub(crate) invert: bool,
    pub(crate) suffix: UseDepSuffix,
    /// `(+)`/`(-)` default-value hint, kept only for display round-tripping.
    ///
    /// The original C `atom_explode` stores both `(+)` and `(-)` into the
    /// same enum slot, so any code that branches on *which* default was
    /// given observes no difference between them. We keep the parsed sign
    /// here purely so `to_string` can reconstruct the original atom text,
    /// but [`UseDep::matches`] deliberately ignores it, preserving that
    /// behaviour. See spec.md §9 "Open questions".
    // TODO: if callers ever need the true (+)/(-) semantics, this requires
    // an actual format change, not just a field read.
    pub(crate) default: Option<bool>,
}

impl UseDep {
    pub fn new(s: &str) -> crate::Result<Self> {
        parse::use_dep(s)
    }

    pub fn flag(&self) -> &str {
        &self.flag
    }

    pub fn invert(&self) -> bool {
        self.invert
    }

    pub fn suffix(&self) -> UseDepSuffix {
        self.suffix
    }

    /// Determine if this USE-dependency is satisfied given a set of enabled
    /// flags on the querying package. Only conditional forms are evaluable
    /// without knowing the dependency's own IUSE defaults; other kinds are
    /// resolved by the match engine against the candidate package directly.
    pub fn matches<'a, I>(&self, enabled: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let is_set = enabled.into_iter().any(|f| f == self.flag);
        match self.suffix {
            UseDepSuffix::Conditional => is_set == !self.invert,
            UseDepSuffix::Equal | UseDepSuffix::None => is_set == !self.invert,
        }
    }
}

impl Ord for UseDep {
    fn cmp(&self, other: &Self) -> Ordering {
        self.flag.cmp(&other.flag)
    }
}
impl PartialOrd for UseDep {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for UseDep {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // the plain form negates with a leading "-", the "=" / "?" forms
        // negate with a leading "!" -- mirrors the asymmetric grammar.
        if self.invert {
            match self.suffix {
                UseDepSuffix::None => write!(f, "-")?,
                UseDepSuffix::Equal | UseDepSuffix::Conditional => write!(f, "!")?,
            }
        }
        write!(f, "{}", self.flag)?;
        match self.default {
            Some(true) => write!(f, "(+)")?,
            Some(false) => write!(f, "(-)")?,
            None => (),
        }
        match self.suffix {
            UseDepSuffix::None => Ok(()),
            UseDepSuffix::Equal => write!(f, "="),
            UseDepSuffix::Conditional => write!(f, "?"),
        }
    }
}

impl std::str::FromStr for UseDep {
    type Err = Error;
    fn from_str(s: &str) -> crate::Result<Self> {
        Self::new(s)
    }
}
