//! Dependency-expression engine (spec.md §4.2): grow, prune, resolve, flatten,
//! and print operations over the boolean/USE-conditional atom trees found in
//! DEPEND/RDEPEND/BDEPEND/IDEPEND/PDEPEND.

use std::fmt;

use crate::atom::Atom;
use crate::types::OrderedSet;

mod parse;

/// A single node of a dependency expression (spec.md §3 "Dependency node").
///
/// `Not` models the grammar's bare `!node` inversion; in practice every
/// real-world occurrence of a leading `!` is immediately followed by a
/// `flag?(...)` group and is folded directly into `Use{invert}` by the
/// parser (see [`parse`]), so `Not` is only ever constructed for the
/// generic `!(...)`/`!atom` forms the grammar allows but ebuilds don't use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepNode {
    /// Pruned placeholder. Kept in place (not removed) so sibling indices
    /// stay stable across a prune pass; skipped by [`DepSet::flatten`].
    Null,
    Atom(Box<Atom>),
    Not(Box<DepNode>),
    Use {
        flag: String,
        invert: bool,
        children: Vec<DepNode>,
    },
    Any(Vec<DepNode>),
    All(Vec<DepNode>),
}

impl DepNode {
    fn is_null(&self) -> bool {
        matches!(self, DepNode::Null)
    }

    fn children(&self) -> Option<&[DepNode]> {
        match self {
            DepNode::Any(v) | DepNode::All(v) | DepNode::Use { children: v, .. } => Some(v),
            DepNode::Not(_) | DepNode::Atom(_) | DepNode::Null => None,
        }
    }

    /// Prune: collapse or null out USE nodes per the active flag set,
    /// recursing into every other group unconditionally.
    fn prune(&self, active: &OrderedSet<String>) -> DepNode {
        match self {
            DepNode::Null => DepNode::Null,
            DepNode::Atom(a) => DepNode::Atom(a.clone()),
            DepNode::Not(n) => DepNode::Not(Box::new(n.prune(active))),
            DepNode::Any(vals) => DepNode::Any(vals.iter().map(|n| n.prune(active)).collect()),
            DepNode::All(vals) => DepNode::All(vals.iter().map(|n| n.prune(active)).collect()),
            DepNode::Use {
                flag,
                invert,
                children,
            } => {
                let enabled = active.contains(flag);
                if enabled != *invert {
                    DepNode::All(children.iter().map(|n| n.prune(active)).collect())
                } else {
                    DepNode::Null
                }
            }
        }
    }

    /// Depth-first flatten; ANY is treated as ALL (every alternative is
    /// emitted), NULL is skipped.
    fn flatten<'a>(&'a self, out: &mut Vec<&'a Atom>) {
        match self {
            DepNode::Null => {}
            DepNode::Atom(a) => out.push(a.as_ref()),
            DepNode::Not(n) => n.flatten(out),
            DepNode::Any(vals) | DepNode::All(vals) => {
                for n in vals {
                    n.flatten(out);
                }
            }
            DepNode::Use { children, .. } => {
                for n in children {
                    n.flatten(out);
                }
            }
        }
    }

    fn header(&self) -> Option<String> {
        match self {
            DepNode::Any(_) => Some("||".to_string()),
            DepNode::All(_) => None,
            DepNode::Use { flag, invert, .. } => Some(if *invert {
                format!("!{flag}?")
            } else {
                format!("{flag}?")
            }),
            DepNode::Not(_) | DepNode::Atom(_) | DepNode::Null => None,
        }
    }

    /// Re-serialise one line per group, 4-space indent per depth; a group
    /// with a single child is collapsed onto its parent's line.
    fn print(&self, depth: usize, highlight: Option<&OrderedSet<String>>, out: &mut String) {
        let pad = "    ".repeat(depth);
        match self {
            DepNode::Null => {}
            DepNode::Atom(a) => {
                let s = a.to_string();
                let highlighted = highlight.is_some_and(|h| h.contains(&s));
                if highlighted {
                    out.push_str(&format!("{pad}*{s}*\n"));
                } else {
                    out.push_str(&format!("{pad}{s}\n"));
                }
            }
            DepNode::Not(n) => {
                out.push_str(&format!("{pad}!"));
                let mut inner = String::new();
                n.print(0, highlight, &mut inner);
                out.push_str(inner.trim_start());
            }
            _ => {
                let children = self.children().unwrap_or(&[]);
                let live: Vec<&DepNode> = children.iter().filter(|n| !n.is_null()).collect();
                let header = self.header();

                if live.len() == 1 {
                    let mut line = pad.clone();
                    if let Some(h) = &header {
                        line.push_str(h);
                        line.push(' ');
                    }
                    line.push_str("( ");
                    let mut inner = String::new();
                    live[0].print(0, highlight, &mut inner);
                    line.push_str(inner.trim_end());
                    line.push_str(" )");
                    out.push_str(&line);
                    out.push('\n');
                } else {
                    if let Some(h) = &header {
                        out.push_str(&format!("{pad}{h} (\n"));
                    } else {
                        out.push_str(&format!("{pad}(\n"));
                    }
                    for child in &live {
                        child.print(depth + 1, highlight, out);
                    }
                    out.push_str(&format!("{pad})\n"));
                }
            }
        }
    }
}

impl fmt::Display for DepNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DepNode::Null => Ok(()),
            DepNode::Atom(a) => write!(f, "{a}"),
            DepNode::Not(n) => write!(f, "!{n}"),
            DepNode::Any(vals) => write!(f, "|| ( {} )", join(vals)),
            DepNode::All(vals) => write!(f, "( {} )", join(vals)),
            DepNode::Use {
                flag,
                invert,
                children,
            } => {
                let bang = if *invert { "!" } else { "" };
                write!(f, "{bang}{flag}? ( {} )", join(children))
            }
        }
    }
}

fn join(nodes: &[DepNode]) -> String {
    nodes
        .iter()
        .filter(|n| !n.is_null())
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Anything able to resolve a leaf atom to a value during [`DepSet::resolve`].
/// Implemented by `crate::tree::Tree` (match_atom with LATEST | DEFAULT).
pub trait AtomResolver<T> {
    fn resolve_atom(&self, atom: &Atom) -> Option<T>;
}

/// The top-level `(node)*` sequence, modeled as an implicit ALL group.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DepSet(Vec<DepNode>);

impl DepSet {
    pub fn new(s: &str) -> crate::Result<Self> {
        parse::dep_set(s)
    }

    pub(crate) fn from_nodes(nodes: Vec<DepNode>) -> Self {
        Self(nodes)
    }

    pub fn nodes(&self) -> &[DepNode] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(DepNode::is_null)
    }

    /// Collapse/null USE nodes according to `(flag ∈ active) XOR invert`.
    pub fn prune(&self, active: &OrderedSet<String>) -> Self {
        Self(self.0.iter().map(|n| n.prune(active)).collect())
    }

    /// Resolve every leaf atom via `resolver`, returning matches in source
    /// order (ANY groups contribute every alternative, same as flatten).
    pub fn resolve<T>(&self, resolver: &impl AtomResolver<T>) -> Vec<(Atom, Option<T>)> {
        self.flatten()
            .into_iter()
            .map(|a| {
                let resolved = resolver.resolve_atom(a);
                (a.clone(), resolved)
            })
            .collect()
    }

    /// Depth-first list of every non-pruned leaf atom.
    pub fn flatten(&self) -> Vec<&Atom> {
        let mut out = Vec::new();
        for n in &self.0 {
            n.flatten(&mut out);
        }
        out
    }

    /// Re-serialise, one group per line, 4-space indent per depth.
    pub fn print(&self, highlight: Option<&OrderedSet<String>>) -> String {
        let mut out = String::new();
        for n in &self.0 {
            n.print(0, highlight, &mut out);
        }
        out
    }
}

impl fmt::Display for DepSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", join(&self.0))
    }
}

impl std::str::FromStr for DepSet {
    type Err = crate::Error;
    fn from_str(s: &str) -> crate::Result<Self> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active(flags: &[&str]) -> OrderedSet<String> {
        flags.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_atoms_and_groups() {
        let deps = DepSet::new("cat/pkg1 >=cat/pkg2-1.0 || ( cat/a cat/b )").unwrap();
        assert_eq!(deps.nodes().len(), 3);
        assert_eq!(deps.flatten().len(), 4);
    }

    #[test]
    fn use_conditional_grow_and_display() {
        let deps = DepSet::new("foo? ( cat/a !bar? ( cat/b ) )").unwrap();
        assert_eq!(deps.to_string(), "foo? ( cat/a !bar? ( cat/b ) )");
    }

    #[test]
    fn tolerant_of_bang_before_use_conditional() {
        // the grammar's "!use?(...)" and "use?(...)" forms are both folded
        // directly into DepNode::Use{invert}; no generic Not wrapper needed.
        let deps = DepSet::new("!foo? ( cat/a )").unwrap();
        match &deps.nodes()[0] {
            DepNode::Use { invert, .. } => assert!(invert),
            other => panic!("expected Use node, got {other:?}"),
        }
    }

    #[test]
    fn dep_grow_tree() {
        // spec.md §8 scenario: USE-conditional nested inside an any-of group.
        let deps = DepSet::new("foo? ( || ( cat/a cat/b ) ) cat/c").unwrap();
        assert_eq!(deps.nodes().len(), 2);
        let pruned_on = deps.prune(&active(&["foo"]));
        assert_eq!(pruned_on.flatten().len(), 3);
        let pruned_off = deps.prune(&active(&[]));
        assert_eq!(pruned_off.flatten().len(), 1);
    }

    #[test]
    fn prune_keeps_null_nodes_in_place() {
        let deps = DepSet::new("foo? ( cat/a ) cat/b").unwrap();
        let pruned = deps.prune(&active(&[]));
        assert_eq!(pruned.nodes().len(), 2);
        assert!(matches!(pruned.nodes()[0], DepNode::Null));
    }

    #[test]
    fn print_collapses_single_child_groups() {
        let deps = DepSet::new("foo? ( cat/a )").unwrap();
        let printed = deps.print(None);
        assert_eq!(printed, "foo? ( cat/a )\n");
    }

    #[test]
    fn print_multi_child_group_is_multiline() {
        let deps = DepSet::new("|| ( cat/a cat/b )").unwrap();
        let printed = deps.print(None);
        assert_eq!(printed, "|| (\n    cat/a\n    cat/b\n)\n");
    }

    struct AllMatch;
    impl AtomResolver<()> for AllMatch {
        fn resolve_atom(&self, _atom: &Atom) -> Option<()> {
            Some(())
        }
    }

    #[test]
    fn resolve_idempotent() {
        let deps = DepSet::new("cat/pkg1 cat/pkg2").unwrap();
        let resolver = AllMatch;
        let first = deps.resolve(&resolver);
        let second = deps.resolve(&resolver);
        assert_eq!(first.len(), second.len());
        assert!(first.iter().all(|(_, r)| r.is_some()));
    }
}
