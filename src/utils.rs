use std::env;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use digest::Digest;

use crate::Error;

/// Hash the given data using a specified digest function and return the
/// hex-encoded value. Used by the binpkg backend to compute MD5/SHA1/BLAKE2B
/// checksums on demand when a container doesn't carry them (spec.md §4.3),
/// and by the md5-cache backend to verify ebuild checksums (spec.md §6).
pub(crate) fn digest<D: Digest>(data: &[u8]) -> String {
    let mut hasher = D::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Get the current working directory as a [`Utf8PathBuf`].
pub fn current_dir() -> crate::Result<Utf8PathBuf> {
    let dir = env::current_dir()
        .map_err(|e| Error::InvalidValue(format!("can't get current dir: {e}")))?;
    Utf8PathBuf::try_from(dir)
        .map_err(|e| Error::InvalidValue(format!("invalid unicode path: {e}")))
}

/// Find and return the first existing path from a list of candidates.
pub(crate) fn find_existing_path<I>(paths: I) -> Option<Utf8PathBuf>
where
    I: IntoIterator,
    I::Item: AsRef<Utf8Path>,
{
    for p in paths {
        let path = p.as_ref();
        if let Ok(true) = path.try_exists() {
            return Some(path.into());
        }
    }
    None
}

/// Construct a relative utf8 path from a base directory to the specified path.
//
// Adapted from rustc's old path_relative_from().
pub fn relpath_utf8<P, B>(path: P, base: B) -> Option<Utf8PathBuf>
where
    P: AsRef<Utf8Path>,
    B: AsRef<Utf8Path>,
{
    let path = path.as_ref();
    let base = base.as_ref();

    if path.is_absolute() != base.is_absolute() {
        if path.is_absolute() {
            Some(Utf8PathBuf::from(path))
        } else {
            None
        }
    } else {
        let mut ita = path.components();
        let mut itb = base.components();
        let mut comps: Vec<Utf8Component> = vec![];
        loop {
            match (ita.next(), itb.next()) {
                (None, None) => break,
                (Some(a), None) => {
                    comps.push(a);
                    comps.extend(ita);
                    break;
                }
                (None, _) => comps.push(Utf8Component::ParentDir),
                (Some(a), Some(b)) if comps.is_empty() && a == b => (),
                (Some(a), Some(Utf8Component::CurDir)) => comps.push(a),
                (Some(_), Some(Utf8Component::ParentDir)) => return None,
                (Some(a), Some(_)) => {
                    comps.push(Utf8Component::ParentDir);
                    comps.extend(itb.map(|_| Utf8Component::ParentDir));
                    comps.push(a);
                    comps.extend(ita);
                    break;
                }
            }
        }
        Some(comps.iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relpaths() {
        for (path, base, expected) in [
            ("path", "path", Some("")),
            ("/path", "path", Some("/path")),
            ("path", "/path", None),
            ("/path", "/path", Some("")),
            ("/path/to/file", "/path/to", Some("file")),
            ("/path/to/file", "/path/to/", Some("file")),
        ] {
            assert_eq!(
                relpath_utf8(path, base).map(|x| x.to_string()).as_deref(),
                expected,
                "relpath failed: path {path:?}, base {base:?}"
            );
        }
    }

    #[test]
    fn digest_md5() {
        assert_eq!(digest::<md5::Md5>(b"test"), "098f6bcd4621d373cade4e832627b4f6");
    }
}
