use rand::{rngs::OsRng, RngCore};

/// Generates a random hex ID.
///
/// Odd lengths round up to the next even number of hex digits, so
/// `generate_id(7)` returns 8 characters.
pub fn generate_id(length: usize) -> String {
    let mut bytes = vec![0u8; length.div_ceil(2)];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
