use crate::atom::Atom;
use crate::error::peg_error;

use super::{DepNode, DepSet};

peg::parser!(grammar grammar() for str {
    rule _ = quiet!{[' ' | '\n' | '\t']+}

    // USE flag names, mirrors the atom grammar's use_flag character class.
    rule use_flag() -> &'input str
        = s:$(quiet!{
            ['a'..='z' | 'A'..='Z' | '0'..='9']
            ['a'..='z' | 'A'..='Z' | '0'..='9' | '+' | '_' | '@' | '-']*
        } / expected!("USE flag name"))
        { s }

    // Bare words (atoms) run until whitespace or a paren; `[...]` use-dep
    // spans are copied verbatim since they may contain no parens anyway.
    rule atom_word() -> &'input str
        = s:$(quiet!{(!['(' | ')' | ' ' | '\t' | '\n'] [_])+} / expected!("atom"))
        { s }

    rule parens<T>(expr: rule<T>) -> Vec<T>
        = "(" _ v:expr() ** _ _ ")" { v }

    rule any_of() -> DepNode
        = "||" _ vals:parens(<node()>) { DepNode::Any(vals) }

    rule all_of() -> DepNode
        = vals:parens(<node()>) { DepNode::All(vals) }

    // Both "flag? ( ... )" and "!flag? ( ... )" fold directly into a single
    // Use node; the parser never needs to wrap this in a generic Not.
    rule conditional() -> DepNode
        = invert:"!"? flag:use_flag() "?" _ children:parens(<node()>) {
            DepNode::Use { flag: flag.to_string(), invert: invert.is_some(), children }
        }

    // Generic "!node" for anything that isn't a use-conditional group, e.g.
    // "!( cat/a )". Tried after atom_leaf so a blocker atom like "!cat/pkg"
    // or "!!cat/pkg" is consumed whole by atom_leaf instead of being split
    // into a Not node wrapping a non-blocked atom.
    rule not() -> DepNode
        = "!" n:node() { DepNode::Not(Box::new(n)) }

    rule atom_leaf() -> DepNode
        = s:atom_word() {?
            Atom::try_new(s, None).map(|a| DepNode::Atom(Box::new(a))).map_err(|_| "invalid atom")
        }

    pub(super) rule node() -> DepNode
        = conditional()
        / any_of()
        / all_of()
        / atom_leaf()
        / not()

    pub(super) rule dep_set() -> Vec<DepNode>
        = _? v:node() ** _ _? { v }
});

pub(super) fn dep_set(s: &str) -> crate::Result<DepSet> {
    grammar::dep_set(s)
        .map(DepSet::from_nodes)
        .map_err(|e| peg_error("invalid dependency string", s, e))
}
