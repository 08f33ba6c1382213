use rand::{rngs::OsRng, RngCore};

/// Returns a random hex string of `n / 2` random bytes.
///
/// Odd `n` rounds down, so the result always has an even length.
pub fn hex_string(n: usize) -> Result<String, rand::Error> {
    let mut bytes = vec![0u8; n / 2];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::hex_string;

    #[test]
    fn returns_requested_length() {
        let value = hex_string(32).expect("os rng must be available");
        assert_eq!(value.len(), 32);
        assert!(value.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn odd_length_rounds_down() {
        assert_eq!(hex_string(5).expect("os rng must be available").len(), 4);
    }
}
