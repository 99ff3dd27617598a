//! Adler-32 checksum (RFC 1950 section 8.2).
//!
//! The two 16-bit sums are kept unreduced for up to [`NMAX`] bytes, the
//! largest run for which `s2` cannot overflow 32 bits, then reduced modulo
//! [`ADLER_MOD`]. Updating in pieces gives exactly the same value as a
//! single update over the concatenation.

/// Largest prime smaller than 65536.
pub const ADLER_MOD: u32 = 65521;

/// Largest n such that `255n(n+1)/2 + (n+1)(ADLER_MOD-1) <= 2^32-1`.
pub const NMAX: usize = 5552;

/// Running Adler-32 accumulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Adler32 {
    s1: u32,
    s2: u32,
}

impl Adler32 {
    /// Create an accumulator holding the checksum of the empty string (1).
    pub fn new() -> Self {
        Self { s1: 1, s2: 0 }
    }

    /// Resume from a previously returned checksum value.
    pub fn from_value(value: u32) -> Self {
        Self {
            s1: value & 0xFFFF,
            s2: value >> 16,
        }
    }

    /// Feed more data.
    pub fn update(&mut self, data: &[u8]) {
        let (mut s1, mut s2) = (self.s1, self.s2);

        for chunk in data.chunks(NMAX) {
            for &byte in chunk {
                s1 += u32::from(byte);
                s2 += s1;
            }
            s1 %= ADLER_MOD;
            s2 %= ADLER_MOD;
        }

        self.s1 = s1;
        self.s2 = s2;
    }

    /// Current checksum value, `(s2 << 16) | s1`.
    pub fn value(&self) -> u32 {
        (self.s2 << 16) | self.s1
    }

    /// Reset to the empty-string value.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

/// Fold `data` into a running checksum (`1` for a fresh stream).
pub fn update(running: u32, data: &[u8]) -> u32 {
    let mut adler = Adler32::from_value(running);
    adler.update(data);
    adler.value()
}

/// One-shot Adler-32 of `data`.
pub fn adler32(data: &[u8]) -> u32 {
    update(1, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_values() {
        assert_eq!(adler32(b""), 1);
        assert_eq!(adler32(b"a"), 0x0062_0062);
        assert_eq!(adler32(b"abc"), 0x024D_0127);
        assert_eq!(adler32(b"Hello"), 0x058C_01F5);
        assert_eq!(adler32(b"Wikipedia"), 0x11E6_0398);
    }

    #[test]
    fn test_update_empty_is_identity() {
        assert_eq!(update(0x11E6_0398, &[]), 0x11E6_0398);
        assert_eq!(update(1, &[]), 1);
    }

    #[test]
    fn test_large_input_reduces() {
        // Worst case for overflow: every byte 0xFF across several NMAX chunks
        let data = vec![0xFFu8; NMAX * 3 + 17];
        let value = adler32(&data);
        assert!(value & 0xFFFF < ADLER_MOD);
        assert!(value >> 16 < ADLER_MOD);

        let mut slow = (1u64, 0u64);
        for &byte in &data {
            slow.0 = (slow.0 + u64::from(byte)) % u64::from(ADLER_MOD);
            slow.1 = (slow.1 + slow.0) % u64::from(ADLER_MOD);
        }
        assert_eq!(value, ((slow.1 << 16) | slow.0) as u32);
    }

    #[test]
    fn test_accumulator_reset() {
        let mut adler = Adler32::new();
        adler.update(b"some data");
        adler.reset();
        assert_eq!(adler.value(), 1);
        assert_eq!(Adler32::default(), Adler32::new());
    }

    proptest! {
        #[test]
        fn prop_fold_matches_single_call(
            data in prop::collection::vec(any::<u8>(), 0..20_000),
            cuts in prop::collection::vec(any::<usize>(), 0..8),
        ) {
            let mut points: Vec<usize> = cuts.iter().map(|c| c % (data.len() + 1)).collect();
            points.sort_unstable();

            let mut running = 1;
            let mut start = 0;
            for point in points {
                running = update(running, &data[start..point]);
                start = point;
            }
            running = update(running, &data[start..]);

            prop_assert_eq!(running, adler32(&data));
        }
    }
}
