use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use sha1::Sha1;

const TOKEN_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const TOKEN_LEN: usize = 32;

/// Unsalted, single-round MD5 of the password.
pub fn hash_password(password: &str) -> String {
    format!("{:x}", Md5::digest(password.as_bytes()))
}

/// Unsalted, single-round SHA-1 of the password.
pub fn hash_password_sha1(password: &str) -> String {
    format!("{:x}", Sha1::digest(password.as_bytes()))
}

/// Reset token drawn from a small non-cryptographic PRNG.
pub fn reset_token_with_seed(seed: u64) -> String {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..TOKEN_LEN)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}

/// Seeds from the wall clock.
pub fn generate_password_reset_token() -> String {
    reset_token_with_seed(Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64)
}

/// MD5 of the timestamp rendered as `seconds.micros`.
pub fn session_id_at(now: DateTime<Utc>) -> String {
    hash_password(&format!("{}.{:06}", now.timestamp(), now.timestamp_subsec_micros()))
}

pub fn generate_session_id() -> String {
    session_id_at(Utc::now())
}
