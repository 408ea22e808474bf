use shipyard_maven::checksum::{is_sidecar, sidecars, SIDECAR_EXTENSIONS};

#[test]
fn sidecars_cover_every_extension_in_order() {
    let sums = sidecars(b"hello");
    let exts: Vec<&str> = sums.iter().map(|(ext, _)| *ext).collect();
    assert_eq!(exts, SIDECAR_EXTENSIONS);
}

#[test]
fn sidecar_digests_match_known_values() {
    let sums = sidecars(b"hello");
    assert_eq!(sums[0].1, "5d41402abc4b2a76b9719d911017c592");
    assert_eq!(sums[1].1, "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d");
    assert_eq!(
        sums[2].1,
        "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );
    assert_eq!(sums[3].1.len(), 128);
}

#[test]
fn signatures_are_not_sidecars() {
    assert!(is_sidecar("widgets-1.2.0.jar.sha1"));
    assert!(is_sidecar("widgets-1.2.0.pom.sha512"));
    assert!(!is_sidecar("widgets-1.2.0.jar.asc"));
    assert!(!is_sidecar("widgets-1.2.0.jar"));
}
