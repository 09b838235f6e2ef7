use std::fmt::Write as _;

use crate::Error;

use super::{Atom, PrefixOp, SuffixOp};

/// Reconstruct the canonical atom string, the inverse of [`super::parse::atom`].
pub(super) fn to_string(atom: &Atom) -> String {
    let mut s = String::new();

    if let Some(blocker) = atom.blocker {
        let _ = write!(s, "{blocker}");
    }
    if let Some(op) = atom.pfx_op {
        let _ = write!(s, "{op}");
    }
    if let Some(cat) = &atom.category {
        let _ = write!(s, "{cat}/");
    }
    if let Some(pn) = &atom.pn {
        let _ = write!(s, "{pn}");
    }
    if let Some(ver) = &atom.version {
        let _ = write!(s, "-{ver}");
        if !ver.revision().is_empty() {
            let _ = write!(s, "-r{}", ver.revision());
        }
    }
    if atom.sfx_op == SuffixOp::Glob {
        s.push('*');
    }
    if let Some(slot) = &atom.slot {
        let _ = write!(s, ":{slot}");
        if let Some(super::Subslot::Value(sub)) = &atom.subslot {
            let _ = write!(s, "/{sub}");
        }
        if let Some(op) = atom.slot_op {
            let _ = write!(s, "{op}");
        }
    }
    if !atom.use_deps.is_empty() {
        s.push('[');
        for (i, dep) in atom.use_deps.iter().enumerate() {
            if i > 0 {
                s.push(',');
            }
            let _ = write!(s, "{dep}");
        }
        s.push(']');
    }
    if let Some(repo) = &atom.repo {
        let _ = write!(s, "::{repo}");
    }

    s
}

/// Render an atom via a `%{KEY}`/`%[KEY]` template: `%{KEY}` always prints
/// (showing `<unset>` when absent), `%[KEY]` prints only when set.
/// Recognised keys (and unambiguous prefixes thereof): CATEGORY, P, PN, PV,
/// PVR, PF, PR, SLOT, SUBSLOT, REPO, USE, pfx, sfx.
pub(super) fn format(atom: &Atom, spec: &str) -> crate::Result<String> {
    let mut out = String::new();
    let mut chars = spec.char_indices().peekable();
    let bytes = spec.as_bytes();

    while let Some((i, c)) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let (open, close) = match bytes.get(i + 1) {
            Some(b'{') => ('{', '}'),
            Some(b'[') => ('[', ']'),
            _ => {
                return Err(Error::InvalidValue(format!(
                    "invalid format spec: {spec}: expected '{{' or '[' after '%'"
                )))
            }
        };
        chars.next(); // consume the opening bracket
        let key_start = i + 2;
        let mut key_end = None;
        for (j, kc) in chars.by_ref() {
            if kc == close {
                key_end = Some(j);
                break;
            }
        }
        let key_end = key_end.ok_or_else(|| {
            Error::InvalidValue(format!("invalid format spec: {spec}: unterminated '%{open}'"))
        })?;
        let key = &spec[key_start..key_end];
        let required = open == '{';

        let resolved = resolve_key(atom, key).ok_or_else(|| {
            Error::InvalidValue(format!("invalid format spec: {spec}: unknown key {key:?}"))
        })?;

        match resolved {
            Some(value) => out.push_str(&value),
            None if required => out.push_str("<unset>"),
            None => {}
        }
    }

    Ok(out)
}

fn resolve_key(atom: &Atom, key: &str) -> Option<Option<String>> {
    // ordered longest-name-first so a prefix like "PV" resolves to the PV
    // key itself rather than accidentally matching "PVR"/"PR" below it;
    // an exact match always wins over a prefix match.
    const NAMES: &[&str] = &[
        "CATEGORY", "SUBSLOT", "SLOT", "REPO", "USE", "PVR", "PV", "PN", "PF", "PR", "P", "pfx",
        "sfx",
    ];

    if let Some(name) = NAMES.iter().find(|n| **n == key) {
        return Some(resolve_named(atom, name));
    }
    if key.is_empty() {
        return None;
    }
    let mut matches = NAMES.iter().filter(|n| n.starts_with(key));
    let first = matches.next()?;
    if matches.next().is_some() {
        return None; // ambiguous prefix
    }
    Some(resolve_named(atom, first))
}

fn resolve_named(atom: &Atom, name: &str) -> Option<String> {
    match name {
        "CATEGORY" => atom.category.clone(),
        "PVR" => atom.version.as_ref().map(|v| {
            if v.revision().is_empty() {
                v.to_string()
            } else {
                format!("{v}-r{}", v.revision())
            }
        }),
        "PV" => atom.version.as_ref().map(|v| v.to_string()),
        "PN" => atom.pn.clone(),
        // P is PN-PV: the package name with version but without revision
        // (e.g. "gcc-12.3.1" vs PN's bare "gcc"), distinct from PN (PMS;
        // atom_explode.c's `ret->P` is PN before the version/suffix
        // components are stripped off the working PN pointer).
        "P" => match (&atom.pn, &atom.version) {
            (Some(pn), Some(v)) => {
                let pv = v.to_string();
                let pv = match pv.strip_suffix(&format!("-r{}", v.revision())) {
                    Some(stripped) if !v.revision().is_empty() => stripped.to_string(),
                    _ => pv,
                };
                Some(format!("{pn}-{pv}"))
            }
            (pn, _) => pn.clone(),
        },
        "PF" => atom.pf(),
        "PR" => atom.version.as_ref().map(|v| format!("r{}", v.revision())),
        "SLOT" => atom.slot.clone(),
        "SUBSLOT" => atom.subslot().map(String::from),
        "REPO" => atom.repo.clone(),
        "USE" => (!atom.use_deps.is_empty()).then(|| {
            atom.use_deps
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(",")
        }),
        "pfx" => atom.pfx_op.map(|op| op.to_string()),
        "sfx" => (atom.sfx_op == SuffixOp::Glob).then(|| "*".to_string()),
        _ => unreachable!("unlisted key name: {name}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_always_vs_optional() {
        let atom = Atom::try_new("cat/pkg-1.2", None).unwrap();
        assert_eq!(format(&atom, "%{CATEGORY}/%{PN}").unwrap(), "cat/pkg");
        assert_eq!(format(&atom, "%{SLOT}").unwrap(), "<unset>");
        assert_eq!(format(&atom, "%[SLOT]").unwrap(), "");
    }

    #[test]
    fn format_unknown_key_fails() {
        let atom = Atom::try_new("cat/pkg", None).unwrap();
        assert!(format(&atom, "%{BOGUS}").is_err());
    }

    #[test]
    fn p_key_drops_revision_but_keeps_version() {
        let atom = Atom::try_new("sys-devel/gcc-12.3.1-r1", None).unwrap();
        assert_eq!(format(&atom, "%{PN}").unwrap(), "gcc");
        assert_eq!(format(&atom, "%{P}").unwrap(), "gcc-12.3.1");
        assert_eq!(format(&atom, "%{PVR}").unwrap(), "12.3.1-r1");
    }

    #[test]
    fn p_key_falls_back_to_pn_when_unversioned() {
        let atom = Atom::try_new("cat/pkg", None).unwrap();
        assert_eq!(format(&atom, "%{P}").unwrap(), "pkg");
    }
}
