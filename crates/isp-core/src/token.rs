//! Opaque token generation.

use rand::rngs::OsRng;
use rand::RngCore;

/// Number of random bytes in a generated token.
pub const TOKEN_BYTES: usize = 128;

/// Source of fresh bearer token strings.
///
/// Implementations must be safe to share across request tasks.
pub trait TokenSource: Send + Sync {
    /// Produce a new token string.
    fn generate(&self) -> String;
}

/// [`TOKEN_BYTES`] bytes from the operating system RNG, rendered as
/// lower-case hex (256 characters).
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTokenSource;

impl TokenSource for RandomTokenSource {
    fn generate(&self) -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_token_is_256_lowercase_hex_chars() {
        let token = RandomTokenSource.generate();
        assert_eq!(token.len(), TOKEN_BYTES * 2);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn random_tokens_differ() {
        let source = RandomTokenSource;
        assert_ne!(source.generate(), source.generate());
    }

    #[test]
    fn token_source_is_object_safe() {
        let source: Box<dyn TokenSource> = Box::new(RandomTokenSource);
        assert_eq!(source.generate().len(), 256);
    }
}
