/// [Szudzik pairing function][szudzik-pairing].
///
/// ```text
/// (a, b) -> if (a<b) then (b^2 + a) else (a^2 + a + b)
/// ```
///
/// [szudzik-pairing]: http://szudzik.com/ElegantPairing.pdf
pub fn pairing2(a: u64, b: u64) -> u64 {
    if a < b {
        b.wrapping_mul(b).wrapping_add(a)
    } else {
        a.wrapping_mul(a).wrapping_add(a).wrapping_add(b)
    }
}

/// Pairing function for three `u64` values.
pub fn pairing3(a: u64, b: u64, c: u64) -> u64 {
    pairing2(pairing2(a, b), c)
}

pub trait MyHash {
    /// Hash used for bucket selection in the unique and computed tables.
    fn hash(&self) -> u64;
}

impl MyHash for (u64, u64) {
    fn hash(&self) -> u64 {
        pairing2(self.0, self.1)
    }
}

impl MyHash for (u64, u64, u64) {
    fn hash(&self) -> u64 {
        pairing3(self.0, self.1, self.2)
    }
}

/// Number of bits needed to encode every id in `0..=max_id`.
///
/// A single id needs no bits at all.
pub fn bit_width(max_id: usize) -> usize {
    (usize::BITS - max_id.leading_zeros()) as usize
}

/// Encode `id` as `width` bits, least significant bit first.
pub fn to_bits(id: usize, width: usize) -> Vec<bool> {
    (0..width).map(|i| (id >> i) & 1 == 1).collect()
}

/// Decode a least-significant-bit-first vector back into an id.
pub fn from_bits(bits: &[bool]) -> usize {
    bits.iter()
        .enumerate()
        .fold(0, |acc, (i, &b)| if b { acc | (1 << i) } else { acc })
}
