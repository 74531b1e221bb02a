//! Secret generation

use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::Rng;

/// Alphabet for generated passwords
pub const SECRET_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*";

/// Default length of generated passwords
pub const DEFAULT_SECRET_LENGTH: usize = 16;

/// Generate a password of `length` characters drawn uniformly from
/// [`SECRET_ALPHABET`] using the operating system's CSPRNG.
pub fn generate_password(length: usize) -> String {
    let mut rng = OsRng;
    (0..length)
        .map(|_| *SECRET_ALPHABET.choose(&mut rng).unwrap_or(&b'x') as char)
        .collect()
}

/// Random hex token (`bytes` random bytes), used for file names and keys
pub fn generate_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    OsRng.fill(buf.as_mut_slice());
    hex::encode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_length_and_alphabet() {
        let password = generate_password(DEFAULT_SECRET_LENGTH);
        assert_eq!(password.len(), DEFAULT_SECRET_LENGTH);
        assert!(password.bytes().all(|b| SECRET_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_passwords_differ() {
        assert_ne!(generate_password(16), generate_password(16));
    }

    #[test]
    fn test_token_is_hex() {
        let token = generate_token(8);
        assert_eq!(token.len(), 16);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
