//! Canonical Huffman coding for DEFLATE.
//!
//! DEFLATE transmits a Huffman code as the list of per-symbol code lengths;
//! codes of the same length take consecutive values in symbol order
//! (RFC 1951 section 3.2.2). This module turns such a list into a decode
//! table ([`build_table`]), chooses lengths for an encoder from symbol
//! frequencies ([`build_lengths`]), and derives the bit-reversed codes an
//! LSB-first writer emits ([`canonical_codes`]).
//!
//! # Alphabets
//!
//! - **Literal/Length**: 0-285 (0-255 literals, 256 end of block, 257-285 lengths)
//! - **Distance**: 0-29
//! - **Code Length**: 0-18 (for transmitting the two codes above)

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use zflate_core::error::{Result, ZflateError};

/// Maximum code length in DEFLATE.
pub const MAX_CODE_BITS: u32 = 15;

/// Maximum code length of the code-length alphabet.
pub const MAX_CODELEN_BITS: u8 = 7;

/// Width of the direct lookup table.
const FAST_BITS: u32 = 9;

/// Outcome of one decode attempt against the bits currently held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// A complete code was recognized.
    Symbol {
        /// Decoded symbol.
        symbol: u16,
        /// Code length in bits, to be consumed by the caller.
        length: u32,
    },
    /// The held bits are a prefix of a longer code; supply more input.
    NeedBits,
    /// No code of the table matches the held bits.
    Invalid,
}

/// Canonical Huffman decode table.
///
/// Codes up to nine bits resolve with one lookup; longer codes walk the
/// per-length counts one bit at a time.
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    /// `symbol << 4 | length`, or 0 when the code is longer than `fast_bits`.
    fast: Vec<u16>,
    fast_bits: u32,
    max_length: u32,
    /// Number of codes of each length.
    counts: [u16; MAX_CODE_BITS as usize + 1],
    /// Symbols ordered by (length, symbol).
    symbols: Vec<u16>,
    /// True if the lengths use the whole code space.
    complete: bool,
}

/// Build a decode table from per-symbol code lengths (0 = unused).
///
/// Over-subscribed length sets are rejected. Incomplete sets are accepted;
/// whether they are legal depends on the alphabet and is checked by the
/// caller through [`HuffmanTable::is_complete`] and [`HuffmanTable::code_count`].
pub fn build_table(lengths: &[u8]) -> Result<HuffmanTable> {
    let mut counts = [0u16; MAX_CODE_BITS as usize + 1];
    for &len in lengths {
        if u32::from(len) > MAX_CODE_BITS {
            return Err(ZflateError::invalid_huffman(format!(
                "code length {} exceeds {}",
                len, MAX_CODE_BITS
            )));
        }
        counts[len as usize] += 1;
    }
    counts[0] = 0;

    let max_length = (1..=MAX_CODE_BITS)
        .rev()
        .find(|&len| counts[len as usize] != 0)
        .unwrap_or(0);

    // Remaining code space after each length; negative means over-subscribed
    let mut left: i32 = 1;
    for len in 1..=MAX_CODE_BITS as usize {
        left <<= 1;
        left -= i32::from(counts[len]);
        if left < 0 {
            return Err(ZflateError::invalid_huffman("over-subscribed code lengths"));
        }
    }
    let complete = left == 0;

    let mut offsets = [0u16; MAX_CODE_BITS as usize + 2];
    for len in 1..=MAX_CODE_BITS as usize {
        offsets[len + 1] = offsets[len] + counts[len];
    }
    let mut symbols = vec![0u16; offsets[MAX_CODE_BITS as usize + 1] as usize];
    for (symbol, &len) in lengths.iter().enumerate() {
        if len != 0 {
            let slot = &mut offsets[len as usize];
            symbols[*slot as usize] = symbol as u16;
            *slot += 1;
        }
    }

    let fast_bits = max_length.min(FAST_BITS);
    let mut fast = vec![0u16; 1 << fast_bits];
    if fast_bits > 0 {
        let codes = canonical_codes(lengths);
        for (symbol, &len) in lengths.iter().enumerate() {
            let len = u32::from(len);
            if len == 0 || len > fast_bits {
                continue;
            }
            let entry = ((symbol as u16) << 4) | len as u16;
            let mut index = codes[symbol] as usize;
            while index < fast.len() {
                fast[index] = entry;
                index += 1 << len;
            }
        }
    }

    Ok(HuffmanTable {
        fast,
        fast_bits,
        max_length,
        counts,
        symbols,
        complete,
    })
}

impl HuffmanTable {
    /// True if the lengths use the whole code space.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Number of symbols with a code.
    pub fn code_count(&self) -> usize {
        self.symbols.len()
    }

    /// Longest code length.
    pub fn max_length(&self) -> u32 {
        self.max_length
    }

    /// Decode the next symbol from `hold`, of which the low `available`
    /// bits are valid (higher bits must be zero). Nothing is consumed.
    #[inline]
    pub fn decode(&self, hold: u64, available: u32) -> Decoded {
        if self.fast_bits > 0 {
            let entry = self.fast[(hold & ((1 << self.fast_bits) - 1)) as usize];
            if entry != 0 {
                let length = u32::from(entry & 0xF);
                return if length <= available {
                    Decoded::Symbol {
                        symbol: entry >> 4,
                        length,
                    }
                } else {
                    Decoded::NeedBits
                };
            }
        }

        let mut code: i32 = 0;
        let mut first: i32 = 0;
        let mut index: i32 = 0;
        for length in 1..=self.max_length {
            if length > available {
                return Decoded::NeedBits;
            }
            code |= ((hold >> (length - 1)) & 1) as i32;
            let count = i32::from(self.counts[length as usize]);
            if code - count < first {
                return Decoded::Symbol {
                    symbol: self.symbols[(index + code - first) as usize],
                    length,
                };
            }
            index += count;
            first = (first + count) << 1;
            code <<= 1;
        }
        Decoded::Invalid
    }
}

/// Bit-reversed canonical codes for `lengths`, ready for LSB-first output.
///
/// Unused symbols get code 0.
pub fn canonical_codes(lengths: &[u8]) -> Vec<u16> {
    let mut counts = [0u16; MAX_CODE_BITS as usize + 1];
    for &len in lengths {
        counts[len as usize] += 1;
    }
    counts[0] = 0;

    let mut next = [0u16; MAX_CODE_BITS as usize + 1];
    let mut code = 0u16;
    for len in 1..=MAX_CODE_BITS as usize {
        code = (code + counts[len - 1]) << 1;
        next[len] = code;
    }

    lengths
        .iter()
        .map(|&len| {
            if len == 0 {
                return 0;
            }
            let code = next[len as usize];
            next[len as usize] += 1;
            reverse_bits(code, len)
        })
        .collect()
}

/// Reverse the low `len` bits of `code`.
#[inline]
pub fn reverse_bits(code: u16, len: u8) -> u16 {
    code.reverse_bits() >> (16 - u32::from(len))
}

/// Choose code lengths for `freqs`, limited to `max_bits`.
///
/// Builds an optimal Huffman tree and, if it is too deep, redistributes
/// lengths until the Kraft sum is exactly one again. Symbols with zero
/// frequency get length 0. When fewer than two symbols are used a second
/// code is added so the result is always a complete prefix code.
pub fn build_lengths(freqs: &[u32], max_bits: u8) -> Vec<u8> {
    let mut lengths = vec![0u8; freqs.len()];
    let mut used: Vec<usize> = (0..freqs.len()).filter(|&s| freqs[s] > 0).collect();

    match used.len() {
        0 => {
            if lengths.len() >= 2 {
                lengths[0] = 1;
                lengths[1] = 1;
            }
            return lengths;
        }
        1 => {
            let other = if used[0] == 0 { 1 } else { 0 };
            if other < lengths.len() {
                lengths[other] = 1;
            }
            lengths[used[0]] = 1;
            return lengths;
        }
        _ => {}
    }

    let depths = tree_depths(freqs, &used);

    // Histogram of depths, folding anything deeper than max_bits
    let max_bits = usize::from(max_bits);
    let deepest = depths.iter().copied().max().unwrap_or(0).max(max_bits);
    let mut per_length = vec![0u32; deepest + 1];
    for &depth in &depths {
        per_length[depth] += 1;
    }
    for len in max_bits + 1..=deepest {
        per_length[max_bits] += per_length[len];
        per_length[len] = 0;
    }

    let target = 1u64 << max_bits;
    let mut total: u64 = (1..=max_bits)
        .map(|len| u64::from(per_length[len]) << (max_bits - len))
        .sum();
    while total > target {
        per_length[max_bits] -= 1;
        for len in (1..max_bits).rev() {
            if per_length[len] != 0 {
                per_length[len] -= 1;
                per_length[len + 1] += 2;
                break;
            }
        }
        total -= 1;
    }

    // Most frequent symbols take the shortest codes
    used.sort_by_key(|&s| (Reverse(freqs[s]), s));
    let mut symbols = used.into_iter();
    for len in 1..=max_bits {
        for _ in 0..per_length[len] {
            if let Some(symbol) = symbols.next() {
                lengths[symbol] = len as u8;
            }
        }
    }
    lengths
}

/// Depth of each used symbol in an unrestricted Huffman tree, in `used` order.
fn tree_depths(freqs: &[u32], used: &[usize]) -> Vec<usize> {
    // Leaves are 0..used.len(); internal nodes follow
    let mut parent = vec![usize::MAX; used.len() * 2 - 1];
    let mut heap: BinaryHeap<Reverse<(u64, usize)>> = used
        .iter()
        .enumerate()
        .map(|(node, &symbol)| Reverse((u64::from(freqs[symbol]), node)))
        .collect();

    let mut next_node = used.len();
    while heap.len() > 1 {
        let (Some(Reverse((wa, a))), Some(Reverse((wb, b)))) = (heap.pop(), heap.pop()) else {
            break;
        };
        parent[a] = next_node;
        parent[b] = next_node;
        heap.push(Reverse((wa + wb, next_node)));
        next_node += 1;
    }

    let root = next_node - 1;
    let mut depth = vec![0usize; next_node];
    for node in (0..root).rev() {
        depth[node] = depth[parent[node]] + 1;
    }
    depth.truncate(used.len());
    depth
}
