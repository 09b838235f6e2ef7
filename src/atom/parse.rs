use crate::error::peg_error;
use crate::Error;

use super::use_dep::{UseDep, UseDepSuffix};
use super::version::{self, Number, Revision, Suffix, SuffixKind, Version};
use super::{Atom, Blocker, PrefixOp, SlotOperator, Subslot, SuffixOp};

peg::parser! {
    grammar grammar() for str {
        pub(super) rule number() -> Number
            = s:$(['0'..='9']+) {?
                let value: u64 = s.parse().map_err(|_| "integer overflow")?;
                Ok(Number { raw: s.to_string(), value })
            }

        pub(super) rule revision() -> Revision
            = "r" n:number() { Revision(n) }
            / n:number() { Revision(n) }

        rule suffix_kind() -> SuffixKind
            = "alpha" { SuffixKind::Alpha }
            / "beta" { SuffixKind::Beta }
            / "pre" { SuffixKind::Pre }
            / "rc" { SuffixKind::Rc }
            / "p" { SuffixKind::P }

        rule version_suffix() -> Suffix
            = "_" kind:suffix_kind() version:number()? { Suffix { kind, version } }

        pub(super) rule version() -> (Vec<Number>, Option<char>, Vec<Suffix>, Option<Revision>)
            = numbers:number() ++ "." letter:['a'..='z']?
                    suffixes:version_suffix()* rev:("-r" r:number() { Revision(r) })? {
                (numbers, letter, suffixes, rev)
            }

        pub(super) rule category() -> &'input str
            = s:$(quiet!{
                ['a'..='z' | 'A'..='Z' | '0'..='9' | '_']
                ['a'..='z' | 'A'..='Z' | '0'..='9' | '+' | '_' | '.' | '-']*
            } / expected!("category name"))
            { s }

        pub(super) rule slot_name() -> &'input str
            = s:$(quiet!{
                ['a'..='z' | 'A'..='Z' | '0'..='9' | '_']
                ['a'..='z' | 'A'..='Z' | '0'..='9' | '+' | '_' | '.' | '-']*
            } / expected!("slot name"))
            { s }

        pub(super) rule repo_name() -> &'input str
            = s:$(quiet!{
                ['a'..='z' | 'A'..='Z' | '0'..='9' | '_']
                ['a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-']*
            } / expected!("repo name"))
            { s }

        rule use_flag() -> &'input str
            = s:$(quiet!{
                ['a'..='z' | 'A'..='Z' | '0'..='9']
                ['a'..='z' | 'A'..='Z' | '0'..='9' | '+' | '_' | '@' | '-']*
            } / expected!("USE flag name"))
            { s }

        rule use_dep_default() -> bool
            = "(+)" { true }
            / "(-)" { false }

        pub(super) rule use_dep() -> UseDep
            = invert:"!"? flag:use_flag() default:use_dep_default()? kind:$(['=' | '?']) {
                UseDep {
                    flag: flag.to_string(),
                    invert: invert.is_some(),
                    suffix: match kind {
                        "=" => UseDepSuffix::Equal,
                        "?" => UseDepSuffix::Conditional,
                        _ => unreachable!(),
                    },
                    default,
                }
            }
            / invert:"-"? flag:use_flag() default:use_dep_default()? {
                UseDep {
                    flag: flag.to_string(),
                    invert: invert.is_some(),
                    suffix: UseDepSuffix::None,
                    default,
                }
            }

        pub(super) rule use_deps() -> Vec<UseDep>
            = "[" deps:use_dep() ++ "," "]" { deps }
    }
}

pub(crate) fn number(s: &str) -> crate::Result<Number> {
    grammar::number(s).map_err(|e| peg_error("invalid number", s, e))
}

pub(crate) fn revision(s: &str) -> crate::Result<Revision> {
    grammar::revision(s).map_err(|e| peg_error("invalid revision", s, e))
}

pub(crate) fn version(s: &str) -> crate::Result<Version> {
    let (numbers, letter, suffixes, rev) =
        grammar::version(s).map_err(|e| peg_error("invalid version", s, e))?;
    Ok(version::build(
        s.to_string(),
        numbers,
        letter,
        suffixes,
        rev.unwrap_or_default(),
    ))
}

pub(crate) fn category(s: &str) -> crate::Result<&str> {
    grammar::category(s).map_err(|e| peg_error("invalid category", s, e))
}

pub(crate) fn slot_name(s: &str) -> crate::Result<&str> {
    grammar::slot_name(s).map_err(|e| peg_error("invalid slot name", s, e))
}

pub(crate) fn repo_name(s: &str) -> crate::Result<&str> {
    grammar::repo_name(s).map_err(|e| peg_error("invalid repo name", s, e))
}

pub(crate) fn use_dep(s: &str) -> crate::Result<UseDep> {
    grammar::use_dep(s).map_err(|e| peg_error("invalid use dep", s, e))
}

pub(crate) fn use_deps(s: &str) -> crate::Result<Vec<UseDep>> {
    grammar::use_deps(s).map_err(|e| peg_error("invalid use deps", s, e))
}

/// Parse a dot-separated version string loosely, returning the byte length
/// consumed and the parsed value, without requiring the whole input to be a
/// version (used while backtracking over `PN-PV` splits, per `atom_explode`'s
/// trailing `[-.0-9]+` scan followed by an optional letter and suffixes).
pub(crate) fn try_version_prefix(s: &str) -> Option<Version> {
    version(s).ok()
}

/// Error helper used by the liberal atom splitter below.
fn err(msg: impl Into<String>) -> Error {
    Error::InvalidAtom(msg.into())
}

/// Liberal atom parser, following spec.md §4.1's stripping order
/// (outside-in): prefix blocker, prefix operator, trailing `::REPO`,
/// trailing `[USEDEPS]`, trailing `:SLOT[/SUBSLOT][=|*]`, trailing `*`
/// suffix operator, leading `CATEGORY/`. What remains is PF, split into
/// PN-PV by the backtracking scan in [`split_pf`] (ported from
/// `atom_explode.c`).
pub(crate) fn atom(s: &str, category_override: Option<&str>) -> crate::Result<Atom> {
    if s.is_empty() {
        return Err(err("empty atom"));
    }

    // strip a trailing file-name extension used by on-disk ebuild/binpkg names
    let mut rest = s;
    for ext in [".ebuild", ".tbz2"] {
        if let Some(stripped) = rest.strip_suffix(ext) {
            rest = stripped;
        }
    }

    // prefix blocker
    let mut blocker = None;
    if let Some(r) = rest.strip_prefix("!!") {
        blocker = Some(Blocker::Strong);
        rest = r;
    } else if let Some(r) = rest.strip_prefix('^') {
        blocker = Some(Blocker::Antislot);
        rest = r;
    } else if let Some(r) = rest.strip_prefix('!') {
        blocker = Some(Blocker::Weak);
        rest = r;
    }
    if rest.starts_with('!') {
        return Err(err("blocker after prefix operator"));
    }

    // prefix operator
    let mut pfx_op = None;
    if let Some(r) = rest.strip_prefix(">=") {
        pfx_op = Some(PrefixOp::GreaterOrEqual);
        rest = r;
    } else if let Some(r) = rest.strip_prefix('>') {
        pfx_op = Some(PrefixOp::Greater);
        rest = r;
    } else if let Some(r) = rest.strip_prefix("<=") {
        pfx_op = Some(PrefixOp::LessOrEqual);
        rest = r;
    } else if let Some(r) = rest.strip_prefix('<') {
        pfx_op = Some(PrefixOp::Less);
        rest = r;
    } else if let Some(r) = rest.strip_prefix('=') {
        pfx_op = Some(PrefixOp::Equal);
        rest = r;
    } else if let Some(r) = rest.strip_prefix('~') {
        pfx_op = Some(PrefixOp::Approximate);
        rest = r;
    }
    if rest.is_empty() {
        return Err(err("empty atom after operators"));
    }

    // trailing ::REPO
    let mut repo = None;
    if let Some(idx) = rest.find("::") {
        repo = Some(rest[idx + 2..].to_string());
        if repo.as_deref() == Some("") {
            return Err(err("empty repo after '::'"));
        }
        rest = &rest[..idx];
    }

    // trailing [USEDEPS], which may itself contain '(' ')' groups but never
    // nested '[' ']', per the grammar in spec.md §4.1.
    let mut use_deps = Vec::new();
    if let Some(open) = rest.find('[') {
        if !rest.ends_with(']') {
            return Err(err("unmatched '['"));
        }
        let inner = &rest[open + 1..rest.len() - 1];
        if inner.contains('[') {
            return Err(err("nested '[' in use deps"));
        }
        if !inner.is_empty() {
            use_deps = use_deps_list(inner)?;
        }
        rest = &rest[..open];
    }

    // trailing :SLOT[/SUBSLOT][=|*]
    let mut slot = None;
    let mut subslot = None;
    let mut slot_op = None;
    if let Some(idx) = rest.rfind(':') {
        let slot_part = &rest[idx + 1..];
        rest = &rest[..idx];
        if slot_part.is_empty() {
            return Err(err("':' with no SLOT and no op"));
        }
        let (slot_part, op) = if let Some(p) = slot_part.strip_suffix('=') {
            (p, Some(SlotOperator::Equal))
        } else if let Some(p) = slot_part.strip_suffix('*') {
            (p, Some(SlotOperator::Star))
        } else {
            (slot_part, None)
        };
        slot_op = op;
        if !slot_part.is_empty() {
            if let Some((s, sub)) = slot_part.split_once('/') {
                slot = Some(self::slot_name(s)?.to_string());
                subslot = Some(Subslot::Value(self::slot_name(sub)?.to_string()));
            } else {
                slot = Some(self::slot_name(slot_part)?.to_string());
                subslot = Some(Subslot::Same);
            }
        }
    }

    // trailing '*' suffix operator (only meaningful on a bare version, not
    // inside SLOT, which was already stripped above)
    let mut sfx_op = SuffixOp::None;
    if let Some(r) = rest.strip_suffix('*') {
        sfx_op = SuffixOp::Glob;
        rest = r;
    }

    // leading CATEGORY/, tolerating (and discarding) extra leading path
    // components so on-disk paths like ".../repo/cat/pn/pn-1.ebuild" parse.
    let mut category = category_override.map(String::from);
    let pf = if let Some(idx) = rest.rfind('/') {
        let pf = &rest[idx + 1..];
        let head = &rest[..idx];
        if category.is_none() {
            let cat = head.rsplit('/').next().unwrap_or(head);
            category = Some(self::category(cat)?.to_string());
        }
        pf
    } else {
        rest
    };

    if pf.is_empty() {
        return Err(err("missing package name"));
    }

    let (pn, version, buildid) = split_pf(pf)?;

    if pfx_op.is_some() && version.is_none() {
        return Err(err("operator requires a version"));
    }

    Ok(Atom {
        blocker,
        pfx_op,
        sfx_op,
        category,
        pn: Some(pn),
        version,
        slot,
        subslot,
        slot_op,
        use_deps,
        repo,
        buildid,
    })
}

fn use_deps_list(inner: &str) -> crate::Result<Vec<super::UseDep>> {
    inner.split(',').map(use_dep).collect()
}

/// Split a package-file string (`PN-PV-rREV[-bBUILDID]`, category/slot/
/// repo/usedeps already removed) into (PN, optional Version, optional
/// BUILDID). Multi-instance binpkgs append a `-bBUILDID` suffix
/// (tree/packages.rs's `BUILD_ID:` field) mirroring the `-rREV` convention
/// already used for revisions, which is peeled off before the PN/version
/// split so it can't be confused with a bare-number version like "pkg-2".
fn split_pf(pf: &str) -> crate::Result<(String, Option<Version>, Option<u64>)> {
    let (pf, buildid) = match pf.rfind("-b") {
        Some(idx) if is_all_digits(&pf[idx + 2..]) => (&pf[..idx], pf[idx + 2..].parse().ok()),
        _ => (pf, None),
    };

    match split_version(pf)? {
        Some((pn, ver)) => Ok((pn, Some(ver), buildid)),
        None => Ok((pf.to_string(), None, buildid)),
    }
}

fn is_all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Scan `pf` from the end for the last hyphen that starts a legal version,
/// matching the C original's right-to-left pointer-walking algorithm, which
/// stops at the *last* plausible "-version". Returns `None` when `pf` has no
/// version component at all.
fn split_version(pf: &str) -> crate::Result<Option<(String, Version)>> {
    let bytes = pf.as_bytes();
    let mut i = bytes.len();
    while i > 0 {
        if bytes[i - 1] == b'-' {
            let candidate = &pf[i..];
            if let Some(v) = parse_version_suffix(candidate) {
                let pn = &pf[..i - 1];
                if pn.is_empty() {
                    return Err(err("missing package name before version"));
                }
                return Ok(Some((pn.to_string(), v)));
            }
        }
        i -= 1;
    }
    Ok(None)
}

/// Parse a candidate trailing substring as a full `PV[letter][_suffix[N]]
/// ...[-rREV]` version, requiring it to consume the whole substring.
fn parse_version_suffix(s: &str) -> Option<Version> {
    version(s).ok()
}
