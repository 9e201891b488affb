// Window keys for fixed-width substring identity.
//
// Windows of at most 64 bits are packed into an integer, which makes the key
// exact. Longer windows use two independent polynomial rolling hashes modulo
// the Mersenne prime 2^61 - 1, combined into a 128-bit key.

const MERSENNE_61: u64 = (1 << 61) - 1;
const BASE_A: u64 = 1_000_003;
const BASE_B: u64 = 998_244_353;

/// Largest window that is compared exactly via bit packing
pub(crate) const MAX_PACKED_WINDOW: usize = 64;

/// Call `f(position, key)` for every window of `width` symbols, in order
///
/// Equal windows always receive equal keys. Distinct windows receive distinct
/// keys when `width <= 64`; otherwise a collision needs two simultaneous
/// 61-bit hash collisions.
pub(crate) fn for_each_window_key<F>(symbols: &[u8], width: usize, mut f: F)
where
    F: FnMut(usize, u128),
{
    if width == 0 || width > symbols.len() {
        return;
    }

    if width <= MAX_PACKED_WINDOW {
        let mask = if width == 64 {
            u64::MAX
        } else {
            (1u64 << width) - 1
        };
        let mut key = 0u64;
        for (i, &b) in symbols.iter().enumerate() {
            key = ((key << 1) | b as u64) & mask;
            if i + 1 >= width {
                f(i + 1 - width, key as u128);
            }
        }
        return;
    }

    let mut hash_a = RollingHash::new(BASE_A, width);
    let mut hash_b = RollingHash::new(BASE_B, width);
    for (i, &b) in symbols.iter().enumerate() {
        hash_a.push(b);
        hash_b.push(b);
        if i >= width {
            let outgoing = symbols[i - width];
            hash_a.pop(outgoing);
            hash_b.pop(outgoing);
        }
        if i + 1 >= width {
            f(i + 1 - width, ((hash_a.value as u128) << 64) | hash_b.value as u128);
        }
    }
}

struct RollingHash {
    base: u64,
    /// base^width, used to remove the outgoing symbol
    high: u64,
    value: u64,
}

impl RollingHash {
    fn new(base: u64, width: usize) -> Self {
        let mut high = 1u64;
        for _ in 0..width {
            high = mul_mod(high, base);
        }
        Self {
            base,
            high,
            value: 0,
        }
    }

    // Symbols are mapped to 1 and 2 so leading zeros still contribute.
    fn push(&mut self, symbol: u8) {
        self.value = add_mod(mul_mod(self.value, self.base), symbol as u64 + 1);
    }

    fn pop(&mut self, symbol: u8) {
        let outgoing = mul_mod(symbol as u64 + 1, self.high);
        self.value = add_mod(self.value, MERSENNE_61 - outgoing);
    }
}

fn mul_mod(a: u64, b: u64) -> u64 {
    let product = a as u128 * b as u128;
    let folded = (product & MERSENNE_61 as u128) + (product >> 61);
    let mut folded = folded as u64;
    while folded >= MERSENNE_61 {
        folded -= MERSENNE_61;
    }
    folded
}

fn add_mod(a: u64, b: u64) -> u64 {
    let sum = a + b;
    if sum >= MERSENNE_61 {
        sum - MERSENNE_61
    } else {
        sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(symbols: &[u8], width: usize) -> Vec<(usize, u128)> {
        let mut out = Vec::new();
        for_each_window_key(symbols, width, |pos, key| out.push((pos, key)));
        out
    }

    #[test]
    fn test_packed_keys_are_exact() {
        let k = keys(&[1, 0, 1, 0, 1], 2);
        assert_eq!(k.len(), 4);
        assert_eq!(k[0], (0, 0b10));
        assert_eq!(k[1], (1, 0b01));
        assert_eq!(k[0].1, k[2].1);
    }

    #[test]
    fn test_width_larger_than_input() {
        assert!(keys(&[1, 0], 3).is_empty());
        assert!(keys(&[1, 0], 0).is_empty());
    }

    #[test]
    fn test_hashed_keys_match_for_equal_windows() {
        // Two copies of a 70-bit block, shifted windows must match across copies
        let block: Vec<u8> = (0..70).map(|i| ((i * 7 + 3) % 5 % 2) as u8).collect();
        let mut symbols = block.clone();
        symbols.extend_from_slice(&block);

        let k = keys(&symbols, 70);
        assert_eq!(k.len(), 71);
        assert_eq!(k[0].1, k[70].1);
        assert_ne!(k[0].1, k[1].1);
    }

    #[test]
    fn test_hashed_keys_distinguish_leading_zero() {
        let mut a = vec![0u8; 65];
        a.push(1);
        let k = keys(&a, 65);
        assert_ne!(k[0].1, k[1].1);
    }

    #[test]
    fn test_full_width_packing() {
        let symbols = vec![1u8; 64];
        let k = keys(&symbols, 64);
        assert_eq!(k, vec![(0, u64::MAX as u128)]);
    }
}
