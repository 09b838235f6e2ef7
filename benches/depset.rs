use criterion::Criterion;

use pkgq::dep::DepSet;
use pkgq::tree::Tree;

pub fn bench_depsets(c: &mut Criterion) {
    c.bench_function("depset-parse-simple", |b| {
        b.iter(|| DepSet::new("c/p1 c/p2 c/p3"));
    });

    let deps = "c/p1 u1? ( c/p2 !u2? ( c/p3 ) ) || ( c/p4 c/p5 )";
    c.bench_function("depset-parse-nested", |b| {
        b.iter(|| DepSet::new(deps).unwrap());
    });

    c.bench_function("depset-flatten", |b| {
        let depset = DepSet::new(deps).unwrap();
        b.iter(|| depset.flatten());
    });

    c.bench_function("depset-print", |b| {
        let depset = DepSet::new(deps).unwrap();
        b.iter(|| depset.print(None));
    });

    c.bench_function("depset-resolve", |b| {
        let dir = tempfile::tempdir().unwrap();
        let root = camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        for pf in ["p1-1", "p2-1", "p3-1", "p4-1", "p5-1"] {
            let pkg_dir = root.join("c").join(pf);
            std::fs::create_dir_all(&pkg_dir).unwrap();
            std::fs::write(pkg_dir.join("SLOT"), "0").unwrap();
        }
        let tree = Tree::open_vdb(&root).unwrap();
        let depset = DepSet::new(deps).unwrap();
        b.iter(|| depset.resolve(&tree));
    });
}
