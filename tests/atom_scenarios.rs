//! End-to-end atom parsing/comparison scenarios (spec.md §8).

use pkgq::atom::{Atom, CompareFlags, CompareResult};

#[test]
fn full_component_parse() {
    // spec.md §8 scenario 1
    let atom = Atom::try_new("=sys-devel/gcc-12.3.1_p20230526-r1:12/12.3=::gentoo", None).unwrap();
    assert_eq!(atom.category(), Some("sys-devel"));
    assert_eq!(atom.pn(), Some("gcc"));
    assert_eq!(atom.version().unwrap().as_str(), "12.3.1_p20230526-r1");
    assert_eq!(atom.slot(), Some("12"));
    assert_eq!(atom.subslot(), Some("12.3"));
    assert_eq!(atom.repo(), Some("gentoo"));
}

#[test]
fn greater_or_equal_compare() {
    // spec.md §8 scenario 2
    let data = Atom::try_new("sys-devel/gcc-12.3.1", None).unwrap();
    let query = Atom::try_new(">=sys-devel/gcc-12", None).unwrap();
    assert_eq!(data.compare(&query, CompareFlags::default()), CompareResult::Equal);
}

#[test]
fn less_than_compare_not_equal() {
    // spec.md §8 scenario 3
    let data = Atom::try_new("sys-devel/gcc-12.3.1", None).unwrap();
    let query = Atom::try_new("<sys-devel/gcc-12", None).unwrap();
    assert_eq!(data.compare(&query, CompareFlags::default()), CompareResult::NotEqual);
}

#[test]
fn version_glob_compare() {
    // spec.md §8 scenario 4
    let query = Atom::try_new("=dev-lang/python-3.11*", None).unwrap();

    let matching = Atom::try_new("dev-lang/python-3.11.5", None).unwrap();
    assert_eq!(matching.compare(&query, CompareFlags::default()), CompareResult::Equal);

    let non_matching = Atom::try_new("dev-lang/python-3.12.0", None).unwrap();
    assert_eq!(non_matching.compare(&query, CompareFlags::default()), CompareResult::NotEqual);
}

#[test]
fn round_trip_preserves_comparison_under_every_flag_combination() {
    let s = ">=sys-devel/gcc-12.3.1_p20230526-r1:12/12.3=::gentoo[a,-b,c?]";
    let a = Atom::try_new(s, None).unwrap();
    let reparsed = Atom::try_new(&a.to_string_full(), None).unwrap();

    for norev in [false, true] {
        for noslot in [false, true] {
            for nosubslot in [false, true] {
                for norepo in [false, true] {
                    let flags = CompareFlags { norev, noslot, nosubslot, norepo };
                    assert_eq!(
                        a.compare(&reparsed, flags),
                        CompareResult::Equal,
                        "flags={flags:?}"
                    );
                }
            }
        }
    }
}

#[test]
fn pms_leading_zero_examples() {
    let cases: &[(&str, &str, CompareResult)] = &[
        ("cat/pkg-1.0", "cat/pkg-1.0.0", CompareResult::Older),
        ("cat/pkg-1.0a", "cat/pkg-1.0", CompareResult::Newer),
        ("cat/pkg-1.0_pre1", "cat/pkg-1.0_rc1", CompareResult::Older),
        ("cat/pkg-1.0_p1", "cat/pkg-1.0", CompareResult::Newer),
        ("cat/pkg-1.01", "cat/pkg-1.1", CompareResult::Older),
        ("cat/pkg-1.01", "cat/pkg-1.001", CompareResult::Newer),
    ];

    for (lower_spec, upper_spec, expected) in cases {
        let a = Atom::try_new(lower_spec, None).unwrap();
        let b = Atom::try_new(upper_spec, None).unwrap();
        // operator-less atoms: compare() passes the structural result
        // straight through, giving a direct version-order comparator.
        assert_eq!(a.compare(&b, CompareFlags::default()), *expected, "{lower_spec} vs {upper_spec}");
    }
}
