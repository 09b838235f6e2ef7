use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::macros::cmp_not_equal;
use crate::Error;

use super::parse;

/// A single dot-separated numeric component of a version string. Kept as both
/// the raw source text (for leading-zero comparisons and reconstruction) and
/// its integer value (for the non-leading-zero case), per PMS §3.3.
#[derive(Debug, Default, Clone)]
pub(crate) struct Number {
    pub(crate) raw: String,
    pub(crate) value: u64,
}

impl Number {
    pub(crate) fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.raw
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}
impl Eq for Number {}

impl Hash for Number {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Revision (the trailing `-rN` on an atom). An empty revision compares and
/// displays identically to `-r0`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct Revision(pub(crate) Number);

impl Revision {
    pub fn try_new(s: &str) -> crate::Result<Self> {
        if s.is_empty() {
            Ok(Self::default())
        } else {
            parse::revision(s)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Ord for Revision {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.value.cmp(&other.0.value)
    }
}
impl PartialOrd for Revision {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Revision {
    type Err = Error;
    fn from_str(s: &str) -> crate::Result<Self> {
        Self::try_new(s)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered kind of a version suffix, per PMS §3.3:
/// `_alpha < _beta < _pre < _rc < (none) < _p`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum SuffixKind {
    Alpha,
    Beta,
    Pre,
    Rc,
    /// sentinel marking "no more suffixes"; sorts between Rc and P
    Norm,
    P,
}

impl fmt::Display for SuffixKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::Alpha => "alpha",
            Self::Beta => "beta",
            Self::Pre => "pre",
            Self::Rc => "rc",
            Self::Norm => "",
            Self::P => "p",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct Suffix {
    pub(crate) kind: SuffixKind,
    pub(crate) version: Option<Number>,
}

impl PartialOrd for Suffix {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Suffix {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_not_equal!(&self.kind, &other.kind);
        let v1 = self.version.as_ref().map(|n| n.value).unwrap_or(0);
        let v2 = other.version.as_ref().map(|n| n.value).unwrap_or(0);
        v1.cmp(&v2)
    }
}

impl fmt::Display for Suffix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(v) = self.version.as_ref() {
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

/// A parsed version string: `PV[letter][_suffix[N]]...[-rREV]`.
///
/// Revision is tracked separately from the dot-component/letter/suffix
/// payload so atoms that carry an explicit operator (e.g. `~cat/pkg-1.2`)
/// can compare "ignoring revision" without reparsing (see [`Version::cmp_non_rev`]).
#[derive(Debug, Default, Clone)]
pub struct Version {
    pub(crate) numbers: Vec<Number>,
    pub(crate) letter: Option<char>,
    pub(crate) suffixes: Vec<Suffix>,
    pub(crate) revision: Revision,
    raw: String,
}

impl Version {
    pub fn try_new(s: &str) -> crate::Result<Self> {
        parse::version(s)
    }

    pub fn revision(&self) -> &Revision {
        &self.revision
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Does `self` start with the numeric/letter/suffix components of `other`,
    /// ignoring anything `other` leaves unspecified? Used by the `*` (EqualGlob)
    /// atom-compare operator: only the query's leading components are compared.
    pub(crate) fn starts_with(&self, other: &Self) -> bool {
        if self.numbers.len() < other.numbers.len() {
            return false;
        }
        for (n1, n2) in self.numbers.iter().zip(other.numbers.iter()) {
            if !n1.raw.starts_with(&n2.raw) && n1.value != n2.value {
                return false;
            }
        }
        if self.numbers.len() == other.numbers.len() {
            if let Some(l2) = other.letter {
                if self.letter != Some(l2) {
                    return false;
                }
            }
        }
        if other.suffixes.is_empty() {
            return true;
        }
        if self.suffixes.len() < other.suffixes.len() {
            return false;
        }
        self.suffixes
            .iter()
            .zip(other.suffixes.iter())
            .all(|(s1, s2)| s1 == s2)
    }

    /// Compare two versions ignoring revision, used by the `~` operator.
    pub(crate) fn cmp_non_revision(&self, other: &Self) -> Ordering {
        cmp_not_equal!(cmp_numbers(&self.numbers, &other.numbers));
        cmp_not_equal!(&self.letter, &other.letter);
        cmp_not_equal!(cmp_suffixes(&self.suffixes, &other.suffixes));
        Ordering::Equal
    }
}

/// Compare suffix lists position-wise, padding the shorter list with the
/// `Norm` sentinel ("no suffix here") which sorts between `_rc` and `_p`.
fn cmp_suffixes(s1: &[Suffix], s2: &[Suffix]) -> Ordering {
    let norm = Suffix {
        kind: SuffixKind::Norm,
        version: None,
    };
    for i in 0..s1.len().max(s2.len()) {
        let a = s1.get(i).unwrap_or(&norm);
        let b = s2.get(i).unwrap_or(&norm);
        match a.cmp(b) {
            Ordering::Equal => continue,
            o => return o,
        }
    }
    Ordering::Equal
}

/// Compare dot-separated numeric component lists per PMS §3.3: the first
/// component compares purely numerically; subsequent components compare
/// numerically unless one has a leading zero, in which case both are
/// compared as zero-stripped strings (so `1.01 < 1.1` but `1.01 > 1.001`).
fn cmp_numbers(v1: &[Number], v2: &[Number]) -> Ordering {
    for (i, pair) in v1.iter().zip(v2.iter()).enumerate() {
        let (n1, n2) = pair;
        if i == 0 || (!n1.raw.starts_with('0') && !n2.raw.starts_with('0')) {
            match n1.value.cmp(&n2.value) {
                Ordering::Equal => continue,
                o => return o,
            }
        } else {
            let s1 = n1.raw.trim_end_matches('0');
            let s2 = n2.raw.trim_end_matches('0');
            match s1.cmp(s2) {
                Ordering::Equal => continue,
                o => return o,
            }
        }
    }
    v1.len().cmp(&v2.len())
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for n in &self.numbers {
            n.value.hash(state);
        }
        self.letter.hash(state);
        self.suffixes.hash(state);
        self.revision.hash(state);
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let o = self.cmp_non_revision(other);
        if o != Ordering::Equal {
            return o;
        }
        self.revision.cmp(&other.revision)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Version {
    type Err = Error;
    fn from_str(s: &str) -> crate::Result<Self> {
        Self::try_new(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

pub(super) fn build(
    raw: String,
    numbers: Vec<Number>,
    letter: Option<char>,
    suffixes: Vec<Suffix>,
    revision: Revision,
) -> Version {
    Version {
        numbers,
        letter,
        suffixes,
        revision,
        raw,
    }
}
