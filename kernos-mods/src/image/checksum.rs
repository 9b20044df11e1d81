//! Image checksum: 32-bit FNV-1a over header and sections.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use zerocopy::IntoBytes;

// Layer 3: Internal module imports
use super::layout::RawHeader;

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a.
pub fn fnv1a32(chunks: &[&[u8]]) -> u32 {
    let mut hash = FNV_OFFSET;
    for chunk in chunks {
        for &byte in *chunk {
            hash ^= u32::from(byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

/// Checksum of an image: FNV-1a over the header with the checksum and
/// signature fields zeroed, followed by the code and data sections.
pub fn image_checksum(header: &RawHeader, code: &[u8], data: &[u8]) -> u32 {
    let mut scrubbed = header.clone();
    scrubbed.checksum.set(0);
    scrubbed.signature.set(0);
    fnv1a32(&[scrubbed.as_bytes(), code, data])
}
