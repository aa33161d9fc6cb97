//! Hash family for the remote Bloom filter
//!
//! Each hash round runs MurmurHash64A over the item bytes with its own
//! seed, and reduces the result modulo the filter's bit count.
//!
//! The seeds come from a fixed 32-bit linear congruential generator.
//! Bits already written to a remote store were placed with exactly these
//! seeds and this hash: changing either orphans every existing filter.

/// LCG multiplier (Numerical Recipes)
pub const LCG_MULTIPLIER: u32 = 1_664_525;
/// LCG increment (Numerical Recipes)
pub const LCG_INCREMENT: u32 = 1_013_904_223;
/// First seed of every filter
pub const LCG_INITIAL_STATE: u32 = 314_159_265;

const MURMUR_M: u64 = 0xc6a4_a793_5bd1_e995;
const MURMUR_R: u32 = 47;

/// MurmurHash64A (Austin Appleby), reading blocks little-endian
///
/// Output is identical on every platform.
pub fn murmur_hash64a(data: &[u8], seed: u64) -> u64 {
    let mut h = seed ^ (data.len() as u64).wrapping_mul(MURMUR_M);

    let mut blocks = data.chunks_exact(8);
    for block in &mut blocks {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(block);
        let mut k = u64::from_le_bytes(buf);

        k = k.wrapping_mul(MURMUR_M);
        k ^= k >> MURMUR_R;
        k = k.wrapping_mul(MURMUR_M);

        h ^= k;
        h = h.wrapping_mul(MURMUR_M);
    }

    let tail = blocks.remainder();
    if !tail.is_empty() {
        for (i, &byte) in tail.iter().enumerate() {
            h ^= u64::from(byte) << (8 * i);
        }
        h = h.wrapping_mul(MURMUR_M);
    }

    h ^= h >> MURMUR_R;
    h = h.wrapping_mul(MURMUR_M);
    h ^= h >> MURMUR_R;
    h
}

/// Generate `count` hash seeds
///
/// seed[0] = 314159265, seed[i + 1] = 1664525 * seed[i] + 1013904223 (mod 2^32)
pub fn generate_seeds(count: u32) -> Vec<u32> {
    let mut state = LCG_INITIAL_STATE;
    (0..count)
        .map(|_| {
            let seed = state;
            state = LCG_MULTIPLIER
                .wrapping_mul(state)
                .wrapping_add(LCG_INCREMENT);
            seed
        })
        .collect()
}

/// Bit index in `[0, bits)` probed by one hash round
pub fn bit_index(item: &[u8], seed: u32, bits: u64) -> u64 {
    murmur_hash64a(item, u64::from(seed)) % bits
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_murmur_empty_input_seed_zero() {
        assert_eq!(murmur_hash64a(b"", 0), 0);
    }

    #[test]
    fn test_murmur_reference_vectors() {
        assert_eq!(murmur_hash64a(b"", 314_159_265), 0x96b4_cfeb_5646_7bdc);
        assert_eq!(murmur_hash64a(b"hello", 0), 0x1e68_d17c_457b_f117);
        assert_eq!(murmur_hash64a(b"hello", 314_159_265), 0x21b8_6e65_a52e_4d65);
        // exactly one block, no tail
        assert_eq!(murmur_hash64a(b"abcdefgh", 0), 0xafdb_0257_ff41_aa98);
        // one block plus a 4-byte tail
        assert_eq!(murmur_hash64a(b"hello world!", 0), 0x64db_099b_d151_2951);
        assert_eq!(
            murmur_hash64a(b"The quick brown fox jumps over the lazy dog", 0),
            0x5589_ca33_042a_861b
        );
    }

    #[test]
    fn test_seed_sequence_prefix() {
        assert_eq!(
            generate_seeds(8),
            vec![
                314_159_265,
                1_811_288_460,
                2_039_979_899,
                1_706_036_894,
                4_188_054_885,
                307_926_912,
                249_930_975,
                2_542_808_242,
            ]
        );
    }

    #[test]
    fn test_seed_count_matches_request() {
        assert!(generate_seeds(0).is_empty());
        assert_eq!(generate_seeds(17).len(), 17);
    }

    #[test]
    fn test_bit_indices_for_reference_filter() {
        // capacity 1000, error 0.01 -> 9586 bits, 7 hashes
        let indices: Vec<u64> = generate_seeds(7)
            .into_iter()
            .map(|seed| bit_index(b"hello", seed, 9586))
            .collect();
        assert_eq!(indices, vec![5711, 244, 4127, 8066, 1527, 4711, 1454]);
    }

    #[test]
    fn test_hash_uniformity() {
        let bits = 1000;
        let seeds = generate_seeds(7);
        let mut counts = vec![0usize; 10];

        for i in 0..1000 {
            let element = format!("element_{}", i);
            for &seed in &seeds {
                let bucket = bit_index(element.as_bytes(), seed, bits) / 100;
                counts[bucket as usize] += 1;
            }
        }

        // ~700 per bucket, allow 50% variance
        for (i, count) in counts.iter().enumerate() {
            assert!(
                (350..=1050).contains(count),
                "Bucket {} has {} entries, expected ~700",
                i,
                count
            );
        }
    }

    proptest! {
        #[test]
        fn prop_seed_generation_is_deterministic(count in 0u32..512) {
            prop_assert_eq!(generate_seeds(count), generate_seeds(count));
        }

        #[test]
        fn prop_shorter_sequence_is_prefix(short in 0u32..256, extra in 0u32..256) {
            let long = generate_seeds(short + extra);
            prop_assert_eq!(&long[..short as usize], &generate_seeds(short)[..]);
        }

        #[test]
        fn prop_bit_index_in_range(
            item in proptest::collection::vec(any::<u8>(), 0..64),
            seed in any::<u32>(),
            bits in 1u64..u64::MAX,
        ) {
            prop_assert!(bit_index(&item, seed, bits) < bits);
        }
    }
}
