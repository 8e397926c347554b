use sha2::{Digest, Sha256};

use crate::normalize::normalize_text;

/// Lowercase hex SHA-256 digest of `input`.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Content fingerprint of a clause's analysis text.
///
/// The text is normalized first, so invisible characters and spacing noise
/// do not change the fingerprint.
pub fn clause_fingerprint(analysis_text: &str) -> String {
    sha256_hex(&normalize_text(analysis_text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_hex_known_vector() {
        // SHA-256("") = e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855
        assert_eq!(
            sha256_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn fingerprint_ignores_spacing_noise() {
        assert_eq!(
            clause_fingerprint("O valor é  R$ 10,00."),
            clause_fingerprint("O valor é\u{a0}R$ 10,00.\u{200b}")
        );
    }

    #[test]
    fn fingerprint_differs_on_content() {
        assert_ne!(clause_fingerprint("multa de 2%"), clause_fingerprint("multa de 20%"));
    }
}
