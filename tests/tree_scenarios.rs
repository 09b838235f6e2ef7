//! End-to-end tree/match-engine scenarios (spec.md §8 "Tree properties").

use camino::Utf8PathBuf;

use pkgq::atom::{Atom, CompareFlags, CompareResult};
use pkgq::dep::AtomResolver;
use pkgq::match_engine::{match_atom, MatchFlags};
use pkgq::tree::{Key, Tree};

fn tmp_root() -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    (dir, root)
}

#[test]
fn repeated_metadata_lookups_are_idempotent() {
    let (_dir, root) = tmp_root();
    let pkg_dir = root.join("dev-libs").join("foo-1");
    std::fs::create_dir_all(&pkg_dir).unwrap();
    std::fs::write(pkg_dir.join("SLOT"), "0").unwrap();
    std::fs::write(pkg_dir.join("DESCRIPTION"), "a test package").unwrap();

    let tree = Tree::open_vdb(&root).unwrap();
    let pkgs = tree.packages("dev-libs").unwrap();
    let pkg = &pkgs[0];

    let first = pkg.metadata(&tree, Key::DESCRIPTION).unwrap();
    let second = pkg.metadata(&tree, Key::DESCRIPTION).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.as_deref(), Some("a test package"));
}

#[test]
fn negative_query_on_missing_category_returns_empty_without_error() {
    let (_dir, root) = tmp_root();
    std::fs::create_dir_all(root.join("dev-libs").join("foo-1")).unwrap();
    std::fs::write(root.join("dev-libs/foo-1/SLOT"), "0").unwrap();

    let tree = Tree::open_vdb(&root).unwrap();
    // cache_consistency: populate the category list and package list first
    tree.categories().unwrap();
    tree.packages("dev-libs").unwrap();

    let empty = tree.packages("nonexistent-cat").unwrap();
    assert!(empty.is_empty());
}

#[test]
fn ebuild_and_vdb_backends_agree_modulo_slot_and_repo() {
    // spec.md §8 "Backend equivalence"
    let (_ebuild_dir, ebuild_root) = tmp_root();
    let ebuild_pkg = ebuild_root.join("dev-libs").join("foo-1.2");
    std::fs::create_dir_all(&ebuild_pkg).unwrap();
    std::fs::write(ebuild_pkg.join("foo-1.2.ebuild"), "EAPI=8\nSLOT=\"0\"\n").unwrap();

    let (_vdb_dir, vdb_root) = tmp_root();
    let vdb_pkg = vdb_root.join("dev-libs").join("foo-1.2");
    std::fs::create_dir_all(&vdb_pkg).unwrap();
    std::fs::write(vdb_pkg.join("SLOT"), "1").unwrap();

    let ebuild_tree = Tree::open_ebuild(&ebuild_root).unwrap();
    let vdb_tree = Tree::open_vdb(&vdb_root).unwrap();

    let ebuild_pkgs = ebuild_tree.packages("dev-libs").unwrap();
    let vdb_pkgs = vdb_tree.packages("dev-libs").unwrap();

    let ebuild_atom = ebuild_pkgs[0].atom(&ebuild_tree).unwrap();
    let vdb_atom = vdb_pkgs[0].atom(&vdb_tree).unwrap();

    let flags = CompareFlags {
        noslot: true,
        norepo: true,
        ..Default::default()
    };
    assert_eq!(ebuild_atom.compare(vdb_atom, flags), CompareResult::Equal);
    // without NOSLOT/NOREPO, SLOT (0 vs 1) and REPO (repo name vs "installed")
    // legitimately differ between the two backends.
    assert_eq!(
        ebuild_atom.compare(vdb_atom, CompareFlags::default()),
        CompareResult::NotEqual
    );
}

#[test]
fn dep_resolve_against_a_vdb_uses_latest_match() {
    let (_dir, root) = tmp_root();
    for pf in ["bar-1.0", "bar-2.0"] {
        let pkg_dir = root.join("dev-libs").join(pf);
        std::fs::create_dir_all(&pkg_dir).unwrap();
        std::fs::write(pkg_dir.join("SLOT"), "0").unwrap();
    }
    let tree = Tree::open_vdb(&root).unwrap();

    let deps = pkgq::dep::DepSet::new("dev-libs/bar").unwrap();
    let resolved = deps.resolve(&tree);
    assert_eq!(resolved.len(), 1);
    let (_query, result) = &resolved[0];
    let atom = result.as_ref().unwrap();
    assert_eq!(atom.version().unwrap().as_str(), "2.0");
}

#[test]
fn match_atom_first_and_latest_are_independent_of_sort() {
    let (_dir, root) = tmp_root();
    for pf in ["baz-1.0", "baz-3.0", "baz-2.0"] {
        let pkg_dir = root.join("dev-libs").join(pf);
        std::fs::create_dir_all(&pkg_dir).unwrap();
        std::fs::write(pkg_dir.join("SLOT"), "0").unwrap();
    }
    let tree = Tree::open_vdb(&root).unwrap();
    let atom = Atom::try_new("dev-libs/baz", None).unwrap();

    let latest_unsorted = match_atom(&tree, &atom, MatchFlags::default().latest()).unwrap();
    assert_eq!(latest_unsorted.len(), 1);
    assert_eq!(latest_unsorted.iter().next().unwrap().pf(), "baz-3.0");

    let all_sorted = match_atom(&tree, &atom, MatchFlags::default().sort()).unwrap();
    let pfs: Vec<_> = all_sorted.iter().map(|p| p.pf().to_string()).collect();
    assert_eq!(pfs, ["baz-3.0", "baz-2.0", "baz-1.0"]);
}

#[test]
fn foreach_pkg_sorted_visits_newest_version_first_per_pn() {
    let (_dir, root) = tmp_root();
    for pf in ["bar-1.0", "bar-3.0", "bar-2.0", "qux-1.0"] {
        let pkg_dir = root.join("dev-libs").join(pf);
        std::fs::create_dir_all(&pkg_dir).unwrap();
        std::fs::write(pkg_dir.join("SLOT"), "0").unwrap();
    }
    let tree = Tree::open_vdb(&root).unwrap();

    let mut unsorted = Vec::new();
    tree.foreach_pkg(None, None, false, |pkg| {
        unsorted.push(pkg.pf().to_string());
        Ok(())
    })
    .unwrap();
    assert_eq!(unsorted, ["bar-1.0", "bar-2.0", "bar-3.0", "qux-1.0"]);

    let mut sorted = Vec::new();
    tree.foreach_pkg(None, None, true, |pkg| {
        sorted.push(pkg.pf().to_string());
        Ok(())
    })
    .unwrap();
    assert_eq!(sorted, ["bar-3.0", "bar-2.0", "bar-1.0", "qux-1.0"]);
}

#[test]
fn foreach_pkg_pn_short_circuits_without_listing_other_pns() {
    let (_dir, root) = tmp_root();
    for pf in ["bar-1.0", "qux-1.0"] {
        let pkg_dir = root.join("dev-libs").join(pf);
        std::fs::create_dir_all(&pkg_dir).unwrap();
        std::fs::write(pkg_dir.join("SLOT"), "0").unwrap();
    }
    let tree = Tree::open_vdb(&root).unwrap();

    let mut seen = Vec::new();
    tree.foreach_pkg(Some("dev-libs"), Some("bar"), false, |pkg| {
        seen.push(pkg.pf().to_string());
        Ok(())
    })
    .unwrap();
    assert_eq!(seen, ["bar-1.0"]);
}

#[test]
fn binpkg_multi_instance_layout_is_recursed() {
    let (_dir, root) = tmp_root();
    let pn_dir = root.join("dev-libs").join("foo");
    std::fs::create_dir_all(&pn_dir).unwrap();
    std::fs::write(pn_dir.join("foo-1.0-b1.xpak"), b"").unwrap();
    // a flat CATEGORY/PF.tbz2 entry alongside the multi-instance directory
    std::fs::write(root.join("dev-libs").join("other-2.0.tbz2"), b"").unwrap();

    let tree = Tree::open_binpkg(&root).unwrap();
    let pkgs = tree.packages("dev-libs").unwrap();
    let mut pfs: Vec<_> = pkgs.iter().map(|p| p.pf().to_string()).collect();
    pfs.sort();
    assert_eq!(pfs, ["foo-1.0-b1", "other-2.0"]);

    let multi_instance = pkgs.iter().find(|p| p.pf() == "foo-1.0-b1").unwrap();
    assert_eq!(multi_instance.pn(), "foo");
}

#[test]
fn buildid_round_trips_through_package_atom_and_compares_numerically() {
    // spec.md §4.1: BUILDID is the final numeric tiebreaker after revision.
    let (_dir, root) = tmp_root();
    let pn_dir = root.join("dev-libs").join("foo");
    std::fs::create_dir_all(&pn_dir).unwrap();
    std::fs::write(pn_dir.join("foo-1.0-b1.xpak"), b"").unwrap();
    std::fs::write(pn_dir.join("foo-1.0-b5.xpak"), b"").unwrap();

    let tree = Tree::open_binpkg(&root).unwrap();
    let pkgs = tree.packages("dev-libs").unwrap();
    let low = pkgs.iter().find(|p| p.pf() == "foo-1.0-b1").unwrap();
    let high = pkgs.iter().find(|p| p.pf() == "foo-1.0-b5").unwrap();

    let low_atom = low.atom(&tree).unwrap();
    let high_atom = high.atom(&tree).unwrap();
    assert_eq!(low_atom.version().unwrap().as_str(), "1.0");
    assert_eq!(low_atom.buildid(), Some(1));
    assert_eq!(high_atom.buildid(), Some(5));

    // operator-less compare is a structural passthrough: buildid is the
    // final tiebreaker once PN/version/revision already compare equal.
    assert_eq!(
        high_atom.compare(low_atom, CompareFlags::default()),
        CompareResult::Newer
    );

    let query = Atom::try_new("dev-libs/foo-1.0-b5", None).unwrap();
    assert_eq!(
        high_atom.compare(&query, CompareFlags::default()),
        CompareResult::Equal
    );
}
