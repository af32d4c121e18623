//! Content digest verification for manifests and data files.
//!
//! The inventory format fixes the digest algorithm to MD5; the manifest's
//! companion checksum file and each file reference carry hex digests that
//! the raw bytes are checked against before any decoding happens.

use md5::{Digest, Md5};

/// Computes the lowercase hex MD5 digest of `data`.
#[must_use]
pub fn hex_digest(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Checks `data` against an externally supplied hex digest.
///
/// Pure function with no side effects. The expected value is trimmed of
/// trailing whitespace (checksum files are newline-terminated) and compared
/// case-insensitively. A mismatch means the input's integrity cannot be
/// assumed; callers must treat it as fatal rather than retry blindly, since
/// a transient transfer fault is the likely cause and an automatic retry
/// could mask systematic corruption.
#[must_use]
pub fn verify(data: &[u8], expected: &str) -> bool {
    hex_digest(data).eq_ignore_ascii_case(expected.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_matches_known_vector() {
        // RFC 1321 test vector
        assert_eq!(hex_digest(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_verify_accepts_own_digest() {
        for data in [&b""[..], b"a", b"hello world", &[0u8; 1024]] {
            assert!(verify(data, &hex_digest(data)));
        }
    }

    #[test]
    fn test_verify_rejects_extended_input() {
        let data = b"hello world";
        let mut extended = data.to_vec();
        extended.push(b'!');
        assert!(!verify(&extended, &hex_digest(data)));
    }

    #[test]
    fn test_verify_trims_trailing_newline() {
        let data = b"payload";
        let expected = format!("{}\n", hex_digest(data));
        assert!(verify(data, &expected));
    }

    #[test]
    fn test_verify_is_case_insensitive() {
        let data = b"payload";
        assert!(verify(data, &hex_digest(data).to_uppercase()));
    }
}
