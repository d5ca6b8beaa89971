//! Canonical hashing for exposure gating and variant selection.
//!
//! The algorithm is fixed for wire-compatibility with persisted experiments: any rewrite of this
//! engine must produce byte-identical hashes to a reference FNV-1a implementation, so the
//! constants below are not tunable.

const FNV_OFFSET_BASIS: u32 = 0x811c9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Compute the 32-bit FNV-1a hash of the UTF-8 bytes of `s`.
///
/// This function accepts an array of inputs so callers can hash a concatenation (experiment
/// salt, value group salt, user id) without allocating an intermediate string.
pub fn fnv1a32(input: &[impl AsRef<str>]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for part in input {
        for byte in part.as_ref().as_bytes() {
            hash ^= u32::from(*byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_offset_basis() {
        assert_eq!(fnv1a32(&[""]), FNV_OFFSET_BASIS);
    }

    #[test]
    fn matches_reference_vectors() {
        // Reference FNV-1a 32-bit vectors (http://www.isthe.com/chongo/tech/comp/fnv/).
        assert_eq!(fnv1a32(&["a"]), 0xe40c292c);
        assert_eq!(fnv1a32(&["foobar"]), 0xbf9cf968);
    }

    #[test]
    fn concatenation_matches_single_string() {
        let parts = fnv1a32(&["exp-salt", "group-salt", "user-42"]);
        let whole = fnv1a32(&["exp-saltgroup-saltuser-42"]);
        assert_eq!(parts, whole);
    }

    #[test]
    fn is_deterministic() {
        assert_eq!(fnv1a32(&["abc"]), fnv1a32(&["abc"]));
    }
}
