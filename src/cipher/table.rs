//! Substitution table generation and lookup

use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;

/// Number of entries in each direction of a table
pub const TABLE_SIZE: usize = 256;

/// Encode/decode pair of 256-entry byte substitutions.
///
/// A generated table satisfies `decode[encode[v]] == v` and
/// `encode[v] != v` for every byte `v`. Tables received from a peer are
/// stored verbatim and are not checked.
#[derive(Clone, PartialEq, Eq)]
pub struct CipherTable {
    encode: [u8; TABLE_SIZE],
    decode: [u8; TABLE_SIZE],
}

impl CipherTable {
    /// Generate a fresh table from the thread-local RNG
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    /// Generate a fresh table from the given RNG.
    ///
    /// Draws uniform permutations until one has no fixed point.
    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut encode: [u8; TABLE_SIZE] = std::array::from_fn(|i| i as u8);
        loop {
            encode.shuffle(rng);
            if has_no_fixed_point(&encode) {
                break;
            }
        }

        let mut decode = [0u8; TABLE_SIZE];
        for (plain, &coded) in encode.iter().enumerate() {
            decode[coded as usize] = plain as u8;
        }

        CipherTable { encode, decode }
    }

    /// All-zero placeholder held before the real table arrives
    pub fn empty() -> Self {
        CipherTable {
            encode: [0u8; TABLE_SIZE],
            decode: [0u8; TABLE_SIZE],
        }
    }

    /// Build a table from raw encode and decode arrays as read off the wire
    pub fn from_parts(encode: [u8; TABLE_SIZE], decode: [u8; TABLE_SIZE]) -> Self {
        CipherTable { encode, decode }
    }

    /// Raw encode table
    pub fn encode_table(&self) -> &[u8; TABLE_SIZE] {
        &self.encode
    }

    /// Raw decode table
    pub fn decode_table(&self) -> &[u8; TABLE_SIZE] {
        &self.decode
    }

    /// Whether this is still the all-zero placeholder
    pub fn is_empty(&self) -> bool {
        self.encode.iter().chain(self.decode.iter()).all(|&b| b == 0)
    }

    /// Whether encode is a derangement and decode its inverse
    pub fn is_valid(&self) -> bool {
        has_no_fixed_point(&self.encode)
            && (0..TABLE_SIZE).all(|v| self.decode[self.encode[v] as usize] as usize == v)
    }

    /// Encode a byte sequence into a new buffer
    pub fn encode(&self, data: &[u8]) -> Vec<u8> {
        data.iter().map(|&b| self.encode[b as usize]).collect()
    }

    /// Decode a byte sequence into a new buffer
    pub fn decode(&self, data: &[u8]) -> Vec<u8> {
        data.iter().map(|&b| self.decode[b as usize]).collect()
    }

    /// Encode `buf` in place
    pub fn encode_in_place(&self, buf: &mut [u8]) {
        for b in buf.iter_mut() {
            *b = self.encode[*b as usize];
        }
    }

    /// Decode `buf` in place
    pub fn decode_in_place(&self, buf: &mut [u8]) {
        for b in buf.iter_mut() {
            *b = self.decode[*b as usize];
        }
    }
}

impl Default for CipherTable {
    fn default() -> Self {
        Self::empty()
    }
}

// Keep table contents out of logs.
impl fmt::Debug for CipherTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherTable")
            .field("empty", &self.is_empty())
            .finish_non_exhaustive()
    }
}

fn has_no_fixed_point(perm: &[u8; TABLE_SIZE]) -> bool {
    perm.iter().enumerate().all(|(i, &v)| i != v as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generated_table_is_derangement_and_inverse() {
        for _ in 0..50 {
            let table = CipherTable::generate();
            for v in 0..TABLE_SIZE {
                let e = table.encode[v];
                assert_ne!(e as usize, v);
                assert_eq!(table.decode[e as usize] as usize, v);
                assert_eq!(table.encode[table.decode[v] as usize] as usize, v);
            }
            assert!(table.is_valid());
        }
    }

    #[test]
    fn test_generate_with_seed_is_deterministic() {
        let a = CipherTable::generate_with(&mut StdRng::seed_from_u64(7));
        let b = CipherTable::generate_with(&mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_roundtrip_empty_and_long() {
        let table = CipherTable::generate();

        assert!(table.encode(&[]).is_empty());
        assert!(table.decode(&[]).is_empty());

        let long: Vec<u8> = (0..1000u32).map(|i| (i * 31 % 256) as u8).collect();
        assert_eq!(table.decode(&table.encode(&long)), long);
        assert_eq!(table.encode(&table.decode(&long)), long);
    }

    #[test]
    fn test_encode_preserves_length_and_order() {
        let table = CipherTable::generate();
        let data = [1u8, 2, 1, 2];
        let encoded = table.encode(&data);
        assert_eq!(encoded.len(), 4);
        assert_eq!(encoded[0], encoded[2]);
        assert_eq!(encoded[1], encoded[3]);
        assert_ne!(encoded[0], 1);
    }

    #[test]
    fn test_in_place_matches_allocating() {
        let table = CipherTable::generate();
        let data = b"the quick brown fox".to_vec();
        let mut buf = data.clone();
        table.encode_in_place(&mut buf);
        assert_eq!(buf, table.encode(&data));
        table.decode_in_place(&mut buf);
        assert_eq!(buf, data);
    }

    #[test]
    fn test_empty_table() {
        let table = CipherTable::empty();
        assert!(table.is_empty());
        assert!(!table.is_valid());
        assert_eq!(table.encode(b"abc"), vec![0, 0, 0]);
        assert_eq!(CipherTable::default(), table);
    }

    #[test]
    fn test_from_parts_stores_verbatim() {
        let source = CipherTable::generate();
        let copy = CipherTable::from_parts(*source.encode_table(), *source.decode_table());
        assert_eq!(copy, source);

        // Received tables are not validated.
        let identity: [u8; TABLE_SIZE] = std::array::from_fn(|i| i as u8);
        let bogus = CipherTable::from_parts(identity, identity);
        assert!(!bogus.is_valid());
        assert_eq!(bogus.encode(b"xyz"), b"xyz".to_vec());
    }

    #[test]
    fn test_debug_hides_contents() {
        let debug_str = format!("{:?}", CipherTable::generate());
        assert!(debug_str.contains("CipherTable"));
        assert!(debug_str.contains("empty: false"));
    }
}
