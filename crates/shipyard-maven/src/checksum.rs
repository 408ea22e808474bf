//! Checksum sidecar files uploaded next to every artifact.

use shipyard_util::hash::{md5_hex, sha1_hex, sha256_hex, sha512_hex};

/// Extensions of the sidecars Maven repositories expect.
pub const SIDECAR_EXTENSIONS: [&str; 4] = ["md5", "sha1", "sha256", "sha512"];

/// `(extension, hex digest)` for each sidecar of `data`.
pub fn sidecars(data: &[u8]) -> Vec<(&'static str, String)> {
    SIDECAR_EXTENSIONS
        .iter()
        .map(|&ext| (ext, digest(ext, data)))
        .collect()
}

fn digest(extension: &str, data: &[u8]) -> String {
    match extension {
        "md5" => md5_hex(data),
        "sha1" => sha1_hex(data),
        "sha256" => sha256_hex(data),
        _ => sha512_hex(data),
    }
}

/// Whether `filename` is itself a checksum sidecar.
///
/// Sidecars of sidecars are never uploaded.
pub fn is_sidecar(filename: &str) -> bool {
    SIDECAR_EXTENSIONS
        .iter()
        .any(|ext| filename.ends_with(&format!(".{ext}")))
}
