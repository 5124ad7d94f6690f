use crate::core::types::TermHash;

/// FNV-1a 64-bit offset basis.
pub const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
/// FNV-1a 64-bit prime.
pub const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

#[inline(always)]
pub fn fnv_step(hash: u64, byte: u8) -> u64 {
    (hash ^ byte as u64).wrapping_mul(FNV_PRIME)
}

/// Hash an already-normalized term.
pub fn hash_bytes(bytes: &[u8]) -> TermHash {
    bytes.iter().fold(FNV_OFFSET, |hash, &b| fnv_step(hash, b))
}

pub fn hash_term(term: &str) -> TermHash {
    hash_bytes(term.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_reference_fnv1a() {
        assert_eq!(hash_bytes(b""), FNV_OFFSET);
        assert_eq!(hash_bytes(b"a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(hash_term("foobar"), 0x8594_4171_f739_67e8);
    }
}
