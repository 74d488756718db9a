//! Minimal ULID-shaped key generator.
//!
//! Produces the 26-character Crockford base32 string a real ULID would:
//! a 48-bit millisecond timestamp followed by 80 bits of randomness. Pulled
//! in-house instead of a crate dependency since nothing in the retrieved
//! example pack reaches for the `ulid` crate.

const CROCKFORD: &[u8] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Generate a new ULID-shaped string. Randomness comes from `uuid::Uuid::new_v4`.
pub fn generate() -> String {
    let timestamp_ms = chrono::Utc::now().timestamp_millis().max(0) as u64;
    let random = uuid::Uuid::new_v4();
    encode(timestamp_ms, random.as_bytes())
}

fn encode(timestamp_ms: u64, random_bytes: &[u8; 16]) -> String {
    let mut out = String::with_capacity(26);

    // 48-bit timestamp -> 10 base32 characters.
    for i in (0..10).rev() {
        let shift = i * 5;
        let idx = ((timestamp_ms >> shift) & 0x1F) as usize;
        out.push(CROCKFORD[idx] as char);
    }

    // 80 bits of randomness -> 16 base32 characters, taken from the first
    // 10 bytes of the UUID (the UUID's version/variant bits are in bytes
    // 6-8, which is fine here: this is a key generator, not an identity).
    let mut bits: u128 = 0;
    for b in &random_bytes[..10] {
        bits = (bits << 8) | (*b as u128);
    }
    // 80 bits held in a 128-bit accumulator, left-aligned into 16 groups of 5.
    for i in (0..16).rev() {
        let shift = i * 5;
        let idx = ((bits >> shift) & 0x1F) as usize;
        out.push(CROCKFORD[idx] as char);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_26_char_uppercase_alphanumeric() {
        let id = generate();
        assert_eq!(id.len(), 26);
        assert!(id.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn two_calls_differ() {
        assert_ne!(generate(), generate());
    }

    #[test]
    fn encodes_zero_timestamp_and_bytes_as_all_zero_char() {
        let id = encode(0, &[0u8; 16]);
        assert_eq!(id, "0".repeat(26));
    }
}
