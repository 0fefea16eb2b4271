use base64::{Engine as _, engine::general_purpose};
use rand::{Rng, thread_rng};

/// Generates a cryptographically secure API key with 256 bits of entropy.
///
/// The key is formatted as `ip-{base64url_encoded_random_bytes}` where the
/// random bytes are 32 bytes of cryptographically secure random data.
pub fn generate_api_key() -> String {
    let mut key_bytes = [0u8; 32];
    thread_rng().fill(&mut key_bytes);

    format!("ip-{}", general_purpose::URL_SAFE_NO_PAD.encode(key_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_api_key_format() {
        let key = generate_api_key();

        assert!(key.starts_with("ip-"));

        // "ip-" (3) + base64url(32 bytes) (43)
        assert_eq!(key.len(), 46);

        let key_part = &key[3..];
        assert!(key_part.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert!(!key.contains('='));
    }

    #[test]
    fn test_generate_api_key_uniqueness() {
        let mut keys = HashSet::new();

        for _ in 0..1000 {
            let key = generate_api_key();
            assert!(keys.insert(key), "Generated duplicate API key");
        }
    }
}
