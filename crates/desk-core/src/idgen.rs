//! SHA256 + base36 ticket ID generation.

use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use num_traits::Zero;
use sha2::{Digest, Sha256};

/// Base36 alphabet (0-9, a-z).
const BASE36_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of the hash part of a ticket ID.
pub const DEFAULT_ID_LENGTH: usize = 6;

/// How many nonces the lifecycle manager tries before giving up on a
/// colliding ID.
pub const MAX_ID_ATTEMPTS: i32 = 10;

/// Converts a byte slice to a zero-padded base36 string of exactly `length`
/// characters, keeping the least significant digits.
pub fn encode_base36(data: &[u8], length: usize) -> String {
    let mut num = BigUint::from_bytes_be(data);
    let base = BigUint::from(36u32);

    let mut digits: Vec<char> = Vec::with_capacity(length);
    while !num.is_zero() {
        let rem = (&num % &base).to_u32_digits().first().copied().unwrap_or(0);
        num /= &base;
        digits.push(BASE36_ALPHABET[rem as usize] as char);
    }
    while digits.len() < length {
        digits.push('0');
    }
    digits.truncate(length);
    digits.iter().rev().collect()
}

/// Creates a hash-based ticket ID such as `tk-4f9a2c`.
///
/// The hash covers tenant, title, creator, creation instant and a nonce so a
/// caller can retry with `nonce + 1` when the store reports a collision.
pub fn generate_ticket_id(
    prefix: &str,
    tenant_id: &str,
    title: &str,
    creator: &str,
    timestamp: DateTime<Utc>,
    nonce: i32,
) -> String {
    let content = format!(
        "{}|{}|{}|{}|{}",
        tenant_id,
        title,
        creator,
        timestamp.timestamp_nanos_opt().unwrap_or(0),
        nonce
    );

    let hash = Sha256::digest(content.as_bytes());
    // 5 bytes = 40 bits ~ 7.7 base36 chars, enough for a 6-char suffix.
    let short_hash = encode_base36(&hash[..5], DEFAULT_ID_LENGTH);
    format!("{}-{}", prefix, short_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_base36_pads_empty_input() {
        assert_eq!(encode_base36(&[], 4), "0000");
    }

    #[test]
    fn encode_base36_known_value() {
        // 0xFFFF = 65535 = "1ekf" in base36
        assert_eq!(encode_base36(&[0xFF, 0xFF], 4), "1ekf");
        assert_eq!(encode_base36(&[0xFF, 0xFF], 6), "001ekf");
    }

    #[test]
    fn encode_base36_truncates_to_low_digits() {
        assert_eq!(encode_base36(&[0xFF, 0xFF], 2), "kf");
    }

    #[test]
    fn ticket_id_shape() {
        let now = Utc::now();
        let id = generate_ticket_id("tk", "t1", "Printer jam", "alice", now, 0);
        assert!(id.starts_with("tk-"));
        assert_eq!(id.len(), 3 + DEFAULT_ID_LENGTH);
    }

    #[test]
    fn nonce_changes_id() {
        let now = Utc::now();
        let a = generate_ticket_id("tk", "t1", "Printer jam", "alice", now, 0);
        let b = generate_ticket_id("tk", "t1", "Printer jam", "alice", now, 1);
        assert_ne!(a, b);
        let again = generate_ticket_id("tk", "t1", "Printer jam", "alice", now, 0);
        assert_eq!(a, again);
    }
}
