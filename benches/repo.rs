use criterion::Criterion;

use pkgq::atom::Atom;
use pkgq::match_engine::{match_atom, MatchFlags};
use pkgq::tree::Tree;

fn ebuild_fixture(n: usize) -> (tempfile::TempDir, camino::Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    for i in 0..n {
        let pkg_dir = root.join("dev-libs").join(format!("pkg-{i}"));
        std::fs::create_dir_all(&pkg_dir).unwrap();
        std::fs::write(
            pkg_dir.join(format!("pkg-{i}-1.ebuild")),
            "EAPI=8\nSLOT=\"0\"\n",
        )
        .unwrap();
    }
    (dir, root)
}

pub fn bench_repo_ebuild(c: &mut Criterion) {
    let (_dir, root) = ebuild_fixture(100);
    let tree = Tree::open_ebuild(&root).unwrap();

    c.bench_function("tree-ebuild-foreach-pkg", |b| {
        let mut pkgs = 0;
        b.iter(|| {
            pkgs = 0;
            tree.foreach_pkg(None, None, false, |_| {
                pkgs += 1;
                Ok(())
            })
            .unwrap();
        });
        assert_eq!(pkgs, 100);
    });

    c.bench_function("tree-ebuild-match-atom", |b| {
        let atom = Atom::try_new("dev-libs/pkg-50-1", None).unwrap();
        b.iter(|| {
            let matched = match_atom(&tree, &atom, MatchFlags::default()).unwrap();
            assert_eq!(matched.len(), 1);
        });
    });

    c.bench_function("tree-ebuild-match-atom-latest", |b| {
        let unversioned = Atom::try_new("dev-libs/pkg-0", None).unwrap();
        b.iter(|| {
            let _ = match_atom(&tree, &unversioned, MatchFlags::default().latest());
        });
    });

    c.bench_function("tree-ebuild-metadata-fill", |b| {
        b.iter(|| {
            tree.foreach_pkg(None, None, false, |pkg| {
                pkg.metadata(&tree, pkgq::tree::Key::SLOT)?;
                Ok(())
            })
            .unwrap();
        });
    });
}
