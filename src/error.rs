use std::convert::Infallible;
use std::io;

use crate::tree::TreeFormat;

mod peg;

pub(crate) use self::peg::peg_error;

/// Crate-wide error type, following the taxonomy of spec.md §7: input-parse
/// errors are returned to the caller to decide on; missing-data and
/// inconsistent-data conditions are resolved internally (accessors return
/// absent sentinels, caches invalidate and fall back to re-parsing) and
/// never surface here; I/O errors from [`crate::tree::Tree::open`] are fatal
/// to that tree only, never to other open trees.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    PegParse(String),
    #[error("invalid atom: {0}")]
    InvalidAtom(String),
    #[error("invalid dep string: {0}")]
    InvalidDep(String),
    #[error("{0}")]
    InvalidValue(String),
    #[error("invalid {kind} tree: {path}: {err}")]
    NotATree {
        kind: TreeFormat,
        path: String,
        err: String,
    },
    #[error("failed opening tree: {path}: {err}")]
    TreeInit { path: String, err: String },
    #[error("{pkg}::{tree}: {err}")]
    InvalidPkg {
        pkg: String,
        tree: String,
        err: String,
    },
    #[error("{0}")]
    IO(String),
    #[error("{0}")]
    Overflow(String),
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::IO(format!("{e}: {}", e.kind()))
    }
}

// Stub for infallible From<T> conversion types.
// TODO: drop this when upstream stabilizes TryFrom/From symmetry for
// Infallible, see https://github.com/rust-lang/rust/issues/64715.
impl From<Infallible> for Error {
    fn from(_: Infallible) -> Self {
        unreachable!()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
