//! Hex digests stored in place of secrets and alongside evidence files.

use sha2::{Digest, Sha256};

/// Lower-case hex SHA-256. Refresh tokens are persisted only in this form,
/// and every stored upload records its checksum.
pub fn sha256_hex(data: impl AsRef<[u8]>) -> String {
    Sha256::digest(data.as_ref())
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn evidence_bytes_and_text_agree() {
        let photo: &[u8] = b"site photo";
        assert_eq!(sha256_hex(photo), sha256_hex("site photo"));
        assert_eq!(sha256_hex(photo).len(), 64);
    }
}
