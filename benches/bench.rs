use criterion::*;

mod depset;
mod repo;

criterion_group!(dep, dep::bench_atoms);
criterion_group!(repo, repo::bench_repo_ebuild);
criterion_group!(depset, depset::bench_depsets);
criterion_group!(version, version::bench_versions);

criterion_main!(dep, repo, depset, version);
