use super::hash::random_base62_char;

/// Generates a short code of exactly `length` characters of `[0-9A-Za-z]`,
/// each drawn independently. Uniqueness is the caller's job.
pub fn generate_short_id(length: usize) -> String {
    (0..length).map(|_| random_base62_char()).collect()
}
