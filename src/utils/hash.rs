use rand::{rng, Rng};

const CHARSET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Generates a random base62 character (0-9, A-Z, a-z)
pub fn random_base62_char() -> char {
    let idx = rng().random_range(0..CHARSET.len());
    CHARSET[idx] as char
}
