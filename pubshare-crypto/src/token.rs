//! Random token generation.

use rand::Rng;

/// Characters used for tokens and opaque ids. Look-alikes (`0`/`O`, `1`/`l`/`I`) are excluded.
pub const TOKEN_ALPHABET: &[u8] = b"abcdefghijkmnpqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of share tokens and opaque ids.
pub const TOKEN_LENGTH: usize = 15;

/// Returns `len` characters drawn uniformly from [`TOKEN_ALPHABET`].
pub fn random_string(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}
