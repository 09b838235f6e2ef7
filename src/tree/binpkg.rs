//! BINPKGS tree backend: binary packages laid out as `CATEGORY/PF.<ext>`
//! where `<ext>` is one of the three container formats spec.md §6
//! describes — legacy `.tbz2`/`.xpak` (a tar.bz2 payload with a trailing
//! xpak key/value index) and the newer `.gpkg.tar` (a plain outer tar whose
//! `metadata.tar.gz` member holds one gzipped inner tar of per-key files,
//! mirroring the VDB's single-file-per-key convention). Only gzip-compressed
//! gpkg metadata is supported, per spec.md's Non-goals.

use std::io::Read;

use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::GzDecoder;
use indexmap::IndexMap;

use crate::atom::Atom;
use crate::files::{is_dir, is_hidden, sorted_dir_list};
use crate::tree::{io_err, is_valid_category, Backend, Key, LazyList, Package, TreeFormat};

#[derive(Debug)]
pub(super) struct BinpkgBackend {
    root: Utf8PathBuf,
}

impl BinpkgBackend {
    pub(super) fn open(root: &Utf8Path) -> crate::Result<Self> {
        if !root.is_dir() {
            return Err(io_err(
                root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            ));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }
}

impl Backend for BinpkgBackend {
    fn format(&self) -> TreeFormat {
        TreeFormat::Binpkg
    }

    fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn repo_name(&self) -> &str {
        "binpkgs"
    }

    fn load_categories(&self, categories: &LazyList) -> crate::Result<()> {
        let names = sorted_dir_list(&self.root)?
            .into_iter()
            .filter(is_dir)
            .filter(|e| !is_hidden(e))
            .map(|e| e.file_name().to_string())
            .filter(|name| is_valid_category(name))
            .collect::<Vec<_>>();
        categories.fill(names);
        Ok(())
    }

    fn load_packages(&self, category: &str, pn: Option<&str>) -> crate::Result<Vec<Package>> {
        let cat_path = self.root.join(category);
        if !cat_path.is_dir() {
            return Ok(Vec::new());
        }
        let mut pkgs = Vec::new();
        for entry in sorted_dir_list(&cat_path)?.into_iter() {
            if is_hidden(&entry) {
                continue;
            }
            if is_dir(&entry) {
                // legacy multi-instance layout: CATEGORY/PN/PF.xpak, one
                // directory per PN holding one container per installed build.
                let dir_pn = entry.file_name();
                if pn.is_some_and(|want| want != dir_pn) {
                    continue;
                }
                for inner in sorted_dir_list(entry.path())?.into_iter() {
                    if is_dir(&inner) || is_hidden(&inner) {
                        continue;
                    }
                    let path = inner.path();
                    if !is_multi_instance_container(path) {
                        continue;
                    }
                    let Some(pf) = container_stem(path) else {
                        continue;
                    };
                    pkgs.push(Package::new(category, dir_pn, pf, path.to_path_buf()));
                }
                continue;
            }
            let path = entry.path();
            let Some(pf) = container_stem(path) else {
                continue;
            };
            let file_pn = Atom::try_new(pf, Some(category))
                .ok()
                .and_then(|a| a.pn().map(str::to_string))
                .unwrap_or_else(|| pf.to_string());
            if pn.is_some_and(|want| want != file_pn) {
                continue;
            }
            pkgs.push(Package::new(category, &file_pn, pf, path.to_path_buf()));
        }
        Ok(pkgs)
    }

    fn fill_metadata(&self, pkg: &Package) -> crate::Result<()> {
        let meta = match pkg.path().extension() {
            Some("tar") if pkg.path().as_str().ends_with(".gpkg.tar") => {
                read_gpkg_metadata(pkg.path())?
            }
            _ => read_xpak_metadata(pkg.path())?,
        };
        pkg.set_metadata(meta);
        Ok(())
    }
}

/// The PF for `CATEGORY/PF.tbz2`, `CATEGORY/PF.xpak`, or
/// `CATEGORY/PF.gpkg.tar`.
fn container_stem(path: &Utf8Path) -> Option<&str> {
    let name = path.file_name()?;
    for ext in [".gpkg.tar", ".tbz2", ".xpak"] {
        if let Some(stem) = name.strip_suffix(ext) {
            return Some(stem);
        }
    }
    None
}

/// Containers found one level into `CATEGORY/PN/` (the multi-instance
/// layout) are restricted to `.xpak`/`.gpkg.tar`; `.tbz2` only appears
/// directly under `CATEGORY/`.
fn is_multi_instance_container(path: &Utf8Path) -> bool {
    let Some(name) = path.file_name() else {
        return false;
    };
    name.ends_with(".xpak") || name.ends_with(".gpkg.tar")
}

/// Parse the xpak trailer appended to a `.tbz2`/`.xpak` container:
///
/// ```text
/// <tar.bz2 payload>
/// "XPAKPACK"
/// <u32 be index_len> <u32 be data_len>
/// <index_len bytes: repeated { u32 be name_len, name, u32 be offset, u32 be len }>
/// <data_len bytes: concatenated value data>
/// "XPAKSTOP"
/// <u32 be: total xpak length, index+data+16>
/// "STOP"
/// ```
fn read_xpak_metadata(path: &Utf8Path) -> crate::Result<IndexMap<Key, String>> {
    let bytes = std::fs::read(path).map_err(|e| io_err(path, e))?;
    match parse_xpak(&bytes) {
        Some(meta) => Ok(meta),
        None => {
            tracing::warn!("{path}: malformed or missing xpak trailer, skipping metadata");
            Ok(IndexMap::new())
        }
    }
}

fn parse_xpak(bytes: &[u8]) -> Option<IndexMap<Key, String>> {
    if bytes.len() < 12 || &bytes[bytes.len() - 4..] != b"STOP" {
        return None;
    }
    let len_field = u32::from_be_bytes(bytes[bytes.len() - 8..bytes.len() - 4].try_into().ok()?);
    let xpak_start = bytes.len().checked_sub(8 + len_field as usize)?;
    let xpak = &bytes[xpak_start..bytes.len() - 8];
    if xpak.len() < 16 || &xpak[..8] != b"XPAKPACK" || &xpak[xpak.len() - 8..] != b"XPAKSTOP" {
        return None;
    }
    let index_len = u32::from_be_bytes(xpak[8..12].try_into().ok()?) as usize;
    let data_len = u32::from_be_bytes(xpak[12..16].try_into().ok()?) as usize;
    let index = xpak.get(16..16 + index_len)?;
    let data = xpak.get(16 + index_len..16 + index_len + data_len)?;

    let mut meta = IndexMap::new();
    let mut pos = 0;
    while pos + 4 <= index.len() {
        let name_len = u32::from_be_bytes(index.get(pos..pos + 4)?.try_into().ok()?) as usize;
        pos += 4;
        let name = std::str::from_utf8(index.get(pos..pos + name_len)?).ok()?;
        pos += name_len;
        let offset = u32::from_be_bytes(index.get(pos..pos + 4)?.try_into().ok()?) as usize;
        pos += 4;
        let entry_len = u32::from_be_bytes(index.get(pos..pos + 4)?.try_into().ok()?) as usize;
        pos += 4;
        let value = data.get(offset..offset + entry_len)?;
        let value = String::from_utf8_lossy(value).trim().to_string();
        if let Ok(key) = name.to_uppercase().parse::<Key>() {
            meta.insert(key, value);
        }
    }
    Some(meta)
}

/// Extract `metadata.tar.gz` from a `.gpkg.tar` container and parse its
/// entries as a VDB-style one-file-per-key listing.
fn read_gpkg_metadata(path: &Utf8Path) -> crate::Result<IndexMap<Key, String>> {
    let file = std::fs::File::open(path).map_err(|e| io_err(path, e))?;
    let mut outer = tar::Archive::new(file);
    let mut meta = IndexMap::new();
    for entry in outer.entries().map_err(|e| io_err(path, e))? {
        let mut entry = entry.map_err(|e| io_err(path, e))?;
        let entry_path = entry.path().map_err(|e| io_err(path, e))?.to_path_buf();
        let Some(name) = entry_path.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        if name != "metadata.tar.gz" {
            continue;
        }
        let mut gz_bytes = Vec::new();
        entry.read_to_end(&mut gz_bytes).map_err(|e| io_err(path, e))?;
        let decoder = GzDecoder::new(gz_bytes.as_slice());
        let mut inner = tar::Archive::new(decoder);
        for inner_entry in inner.entries().map_err(|e| io_err(path, e))? {
            let mut inner_entry = inner_entry.map_err(|e| io_err(path, e))?;
            let inner_path = inner_entry.path().map_err(|e| io_err(path, e))?.to_path_buf();
            let Some(key_name) = inner_path.file_name().and_then(|s| s.to_str()) else {
                continue;
            };
            let mut value = String::new();
            inner_entry.read_to_string(&mut value).ok();
            let value = value.trim().to_string();
            if key_name == "CONTENTS" {
                meta.insert(Key::CONTENTS, value);
            } else if let Ok(key) = key_name.to_uppercase().parse::<Key>() {
                meta.insert(key, value);
            }
        }
        break;
    }
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_stem_strips_known_extensions() {
        assert_eq!(container_stem(Utf8Path::new("foo-1.0.tbz2")), Some("foo-1.0"));
        assert_eq!(container_stem(Utf8Path::new("foo-1.0.xpak")), Some("foo-1.0"));
        assert_eq!(
            container_stem(Utf8Path::new("foo-1.0.gpkg.tar")),
            Some("foo-1.0")
        );
        assert_eq!(container_stem(Utf8Path::new("foo-1.0.txt")), None);
    }

    #[test]
    fn parses_minimal_xpak_trailer() {
        let mut index = Vec::new();
        let name = b"SLOT";
        index.extend((name.len() as u32).to_be_bytes());
        index.extend(name);
        index.extend(0u32.to_be_bytes()); // offset
        index.extend(1u32.to_be_bytes()); // len

        let data = b"0".to_vec();

        let mut xpak = Vec::new();
        xpak.extend(b"XPAKPACK");
        xpak.extend((index.len() as u32).to_be_bytes());
        xpak.extend((data.len() as u32).to_be_bytes());
        xpak.extend(&index);
        xpak.extend(&data);
        xpak.extend(b"XPAKSTOP");

        let mut file = b"fake-tar-bz2-payload".to_vec();
        file.extend(&xpak);
        file.extend((xpak.len() as u32).to_be_bytes());
        file.extend(b"STOP");

        let meta = parse_xpak(&file).unwrap();
        assert_eq!(meta.get(&Key::SLOT).map(String::as_str), Some("0"));
    }
}
