//! Parameter-block wire format.
//!
//! Each hardware thread receives one flat block of 32-bit words, written by
//! the host before launch and immutable afterwards. Order matters, this is
//! the device ABI:
//!
//! ```text
//! [ self_address,
//!   P, Q, R,
//!   A_base, B_base, C_base,
//!   A_stride, B_stride, C_stride,
//!   alpha_bits, beta_bits,
//!   thread_index, thread_count ]   // last two: multi-thread kernel only
//! ```
//!
//! `alpha_bits` and `beta_bits` carry the raw IEEE754 single-precision bit
//! patterns. The kernel reinterprets them with `f32::from_bits`; no numeric
//! conversion happens on either side of the boundary.

use crate::vpu::memory::{DeviceMemory, WORD};

/// Words per parameter block, single-thread kernel.
pub const UNIFORM_WORDS: usize = 12;

/// Words per parameter block, multi-thread kernel.
pub const UNIFORM_WORDS_MT: usize = 14;

/// One thread's decoded parameter block.
///
/// For the multi-thread kernel, `p`/`r` and the three base addresses describe
/// the thread's own sub-region of the output plane, not the global problem.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParamBlock {
    /// Byte address of this block itself in device memory.
    pub self_address: u32,
    pub p: u32,
    pub q: u32,
    pub r: u32,
    pub a_base: u32,
    pub b_base: u32,
    pub c_base: u32,
    pub a_stride: u32,
    pub b_stride: u32,
    pub c_stride: u32,
    pub alpha: f32,
    pub beta: f32,
    /// 0-based hardware thread index (0 in the single-thread kernel).
    pub thread_index: u32,
    /// Total cooperating threads (1 in the single-thread kernel).
    pub thread_count: u32,
}

impl ParamBlock {
    /// Writes the block at byte address `addr` as `n_words` words (12 or 14).
    pub fn store(&self, mem: &mut DeviceMemory, addr: u32, n_words: usize) {
        assert!(n_words == UNIFORM_WORDS || n_words == UNIFORM_WORDS_MT);
        let words = [
            self.self_address,
            self.p,
            self.q,
            self.r,
            self.a_base,
            self.b_base,
            self.c_base,
            self.a_stride,
            self.b_stride,
            self.c_stride,
            self.alpha.to_bits(),
            self.beta.to_bits(),
            self.thread_index,
            self.thread_count,
        ];
        for (i, &w) in words.iter().take(n_words).enumerate() {
            mem.store_u32(addr + (i as u32) * WORD, w);
        }
    }

    /// Reads a block of `n_words` words (12 or 14) from byte address `addr`.
    ///
    /// A 12-word block decodes with `thread_index = 0`, `thread_count = 1`.
    pub fn load(mem: &DeviceMemory, addr: u32, n_words: usize) -> Self {
        assert!(n_words == UNIFORM_WORDS || n_words == UNIFORM_WORDS_MT);
        let word = |i: u32| mem.load_u32(addr + i * WORD);
        let (thread_index, thread_count) = if n_words == UNIFORM_WORDS_MT {
            (word(12), word(13))
        } else {
            (0, 1)
        };
        ParamBlock {
            self_address: word(0),
            p: word(1),
            q: word(2),
            r: word(3),
            a_base: word(4),
            b_base: word(5),
            c_base: word(6),
            a_stride: word(7),
            b_stride: word(8),
            c_stride: word(9),
            alpha: f32::from_bits(word(10)),
            beta: f32::from_bits(word(11)),
            thread_index,
            thread_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block(addr: u32) -> ParamBlock {
        ParamBlock {
            self_address: addr,
            p: 96,
            q: 363,
            r: 3072,
            a_base: 0x100,
            b_base: 0x2000,
            c_base: 0x40000,
            a_stride: 1472,
            b_stride: 12288,
            c_stride: 12288,
            alpha: 1.25,
            beta: -0.5,
            thread_index: 7,
            thread_count: 12,
        }
    }

    #[test]
    fn test_roundtrip_multi_thread() {
        let mut mem = DeviceMemory::new(4096);
        let addr = mem.alloc((UNIFORM_WORDS_MT * 4) as u32, 4).unwrap();
        let block = sample_block(addr);
        block.store(&mut mem, addr, UNIFORM_WORDS_MT);
        assert_eq!(ParamBlock::load(&mem, addr, UNIFORM_WORDS_MT), block);
    }

    #[test]
    fn test_roundtrip_single_thread_defaults() {
        let mut mem = DeviceMemory::new(4096);
        let addr = mem.alloc((UNIFORM_WORDS * 4) as u32, 4).unwrap();
        let block = sample_block(addr);
        block.store(&mut mem, addr, UNIFORM_WORDS);

        let decoded = ParamBlock::load(&mem, addr, UNIFORM_WORDS);
        assert_eq!(decoded.thread_index, 0);
        assert_eq!(decoded.thread_count, 1);
        assert_eq!(decoded.alpha, block.alpha);
        assert_eq!(decoded.q, block.q);
    }

    #[test]
    fn test_coefficients_travel_as_raw_bits() {
        let mut mem = DeviceMemory::new(4096);
        let addr = 64;
        let mut block = sample_block(addr);
        // A payload that would not survive a numeric round-trip through f64
        // string formatting or integer conversion: a signalling-ish NaN bit
        // pattern must come back bit-exact.
        block.alpha = f32::from_bits(0x7f80_0001);
        block.store(&mut mem, addr, UNIFORM_WORDS);
        assert_eq!(mem.load_u32(addr + 10 * WORD), 0x7f80_0001);
        let decoded = ParamBlock::load(&mem, addr, UNIFORM_WORDS);
        assert_eq!(decoded.alpha.to_bits(), 0x7f80_0001);
    }
}
