//! XOR error-detection byte of a DCC packet.

/// Folds `byte` into a running packet checksum.
pub(crate) fn xor_update(check: u8, byte: &u8) -> u8 {
    check ^ *byte
}

/// XOR of every byte in `body`. For a packet, `body` is everything but the
/// trailing error-detection byte.
pub fn xor_checksum(body: &[u8]) -> u8 {
    body.iter().fold(0, xor_update)
}

/// Whether the last byte of `packet` equals the XOR of the bytes before it.
///
/// An empty slice has nothing to check against and is never valid.
pub fn verify(packet: &[u8]) -> bool {
    match packet.split_last() {
        Some((check, body)) => xor_checksum(body) == *check,
        None => false,
    }
}
