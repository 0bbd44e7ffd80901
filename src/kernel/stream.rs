//! Streaming accumulation engine: the software-pipelined inner-product loop.
//!
//! The multiply-add units must never wait on memory, but a streamed load
//! takes longer than one compute step, so the loop runs one fetch ahead of
//! the arithmetic: a fixed 1-step lookahead, the minimum depth that hides
//! the measured latency (deeper would only cost registers). The loop is a
//! three-phase state machine over the inner dimension Q:
//!
//! - **PRIME**: issue the first two fetches before any accumulate, filling
//!   the lookahead, then accumulate step 0;
//! - **STREAM**: Q-2 times, issue the fetch for step k+1 together with the
//!   multiply-add for step k;
//! - **DRAIN**: accumulate the last primed operands, no further fetch.
//!
//! Q = 2 is the minimum legal inner dimension: STREAM runs zero times and
//! PRIME hands straight over to DRAIN. Termination is an explicit countdown,
//! not an address comparison.

use crate::vpu::memory::{DeviceMemory, WORD};
use crate::vpu::vector::F32x16;
use crate::ACCUMULATORS;

/// One inner-product step's operands: a 16-lane vector along the tile's
/// narrow axis and one scalar per wide-axis position, ready to be broadcast.
pub struct Operands {
    pub vec: F32x16,
    pub scalars: [f32; ACCUMULATORS],
}

/// Fetches one [`Operands`] per inner-dimension step, keeping up to two
/// fetches in flight.
///
/// The vector operand is a strided gather (lane e reads `vec_addr +
/// e*vec_stride`, advancing one word per step); the scalar operands are a
/// contiguous row read (`scalar_addr`, advancing one row stride per step).
/// Lanes and scalars beyond the clipped tile extents are zero-filled instead
/// of read, keeping edge tiles in bounds.
pub struct OperandStream<'m> {
    mem: &'m DeviceMemory,
    vec_addr: u32,
    vec_stride: u32,
    lanes: usize,
    scalar_addr: u32,
    scalar_stride: u32,
    scalars: usize,
    fifo: [Option<Box<Operands>>; 2],
    head: usize,
    len: usize,
}

impl<'m> OperandStream<'m> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mem: &'m DeviceMemory,
        vec_addr: u32,
        vec_stride: u32,
        lanes: usize,
        scalar_addr: u32,
        scalar_stride: u32,
        scalars: usize,
    ) -> Self {
        debug_assert!(lanes <= crate::LANES && scalars <= ACCUMULATORS);
        OperandStream {
            mem,
            vec_addr,
            vec_stride,
            lanes,
            scalar_addr,
            scalar_stride,
            scalars,
            fifo: [None, None],
            head: 0,
            len: 0,
        }
    }

    /// Issues the fetch for the next inner-dimension step.
    pub fn prefetch(&mut self) {
        debug_assert!(self.len < 2, "operand fetch queue overrun");
        let vec = F32x16::from_fn(|e| {
            if e < self.lanes {
                self.mem.load_f32(self.vec_addr + e as u32 * self.vec_stride)
            } else {
                0.0
            }
        });
        let mut scalars = [0.0f32; ACCUMULATORS];
        for (x, slot) in scalars.iter_mut().enumerate().take(self.scalars) {
            *slot = self.mem.load_f32(self.scalar_addr + x as u32 * WORD);
        }
        let tail = (self.head + self.len) % 2;
        self.fifo[tail] = Some(Box::new(Operands { vec, scalars }));
        self.len += 1;
        self.vec_addr += WORD;
        self.scalar_addr += self.scalar_stride;
    }

    /// Retires the oldest in-flight fetch.
    pub fn consume(&mut self) -> Box<Operands> {
        debug_assert!(self.len > 0, "operand consumed with no fetch in flight");
        let ops = self.fifo[self.head].take().expect("fetch queue slot empty");
        self.head = (self.head + 1) % 2;
        self.len -= 1;
        ops
    }
}

/// The bank of vector accumulators for one tile, indexed by wide-axis
/// position.
///
/// The bound is fixed at compile time ([`ACCUMULATORS`]); how a target maps
/// the bank onto physical vector registers is a lowering concern. Every
/// accumulator starts at zero and [`AccumulatorBank::take`] replaces it with
/// zero as it is read, so the drain *is* the mandatory once-per-tile reset;
/// it cannot be skipped or doubled without changing the value read.
pub struct AccumulatorBank {
    accs: [F32x16; ACCUMULATORS],
}

impl AccumulatorBank {
    /// A bank of zeroed accumulators.
    pub fn new() -> Self {
        AccumulatorBank {
            accs: [F32x16::ZERO; ACCUMULATORS],
        }
    }

    /// One multiply-add per active accumulator: `acc[x] += vec *
    /// broadcast(scalars[x])`.
    #[inline(always)]
    pub fn accumulate(&mut self, ops: &Operands, active: usize) {
        debug_assert!(active <= ACCUMULATORS);
        for x in 0..active {
            self.accs[x] = self.accs[x] + ops.vec * F32x16::broadcast(ops.scalars[x]);
        }
    }

    /// Drains accumulator `x`, resetting it to zero in place.
    #[inline(always)]
    pub fn take(&mut self, x: usize) -> F32x16 {
        std::mem::replace(&mut self.accs[x], F32x16::ZERO)
    }
}

impl Default for AccumulatorBank {
    fn default() -> Self {
        AccumulatorBank::new()
    }
}

/// Runs the PRIME/STREAM/DRAIN loop over inner dimension `q`, accumulating
/// into the first `active` accumulators of `bank`.
pub fn stream_accumulate(
    stream: &mut OperandStream,
    bank: &mut AccumulatorBank,
    q: u32,
    active: usize,
) {
    debug_assert!(q >= 2, "inner dimension must be at least 2");

    // PRIME: two fetches in flight before any arithmetic, then step 0.
    stream.prefetch();
    stream.prefetch();
    let ops = stream.consume();
    bank.accumulate(&ops, active);

    // STREAM: fetch k+1 alongside the multiply-add for k.
    let mut remaining = q - 2;
    while remaining != 0 {
        stream.prefetch();
        let ops = stream.consume();
        bank.accumulate(&ops, active);
        remaining -= 1;
    }

    // DRAIN: the last primed operands, nothing left to fetch.
    let ops = stream.consume();
    bank.accumulate(&ops, active);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vpu::memory::DeviceMemory;

    /// Plants a rows x cols row-major f32 matrix at `base` with `stride`.
    fn plant(mem: &DeviceMemory, base: u32, stride: u32, rows: u32, cols: u32, f: impl Fn(u32, u32) -> f32) {
        for i in 0..rows {
            for j in 0..cols {
                mem.store_f32(base + i * stride + j * WORD, f(i, j));
            }
        }
    }

    #[test]
    fn test_stream_accumulates_dot_products() {
        let mem = DeviceMemory::new(64 * 1024);
        let (p, q, r) = (5u32, 7u32, 9u32);
        let (a_base, a_stride) = (64u32, 64u32);
        let (b_base, b_stride) = (1024u32, 64u32);
        plant(&mem, a_base, a_stride, p, q, |i, k| (i + 1) as f32 + k as f32 * 0.5);
        plant(&mem, b_base, b_stride, q, r, |k, j| (k as f32 - j as f32) * 0.25);

        // Single-thread addressing: vector = A column, scalars = B row.
        let mut stream = OperandStream::new(
            &mem, a_base, a_stride, p as usize, b_base, b_stride, r as usize,
        );
        let mut bank = AccumulatorBank::new();
        stream_accumulate(&mut stream, &mut bank, q, r as usize);

        for j in 0..r {
            let acc = bank.take(j as usize);
            for i in 0..p {
                let mut expected = 0.0f32;
                for k in 0..q {
                    let a = (i + 1) as f32 + k as f32 * 0.5;
                    let b = (k as f32 - j as f32) * 0.25;
                    expected += a * b;
                }
                assert_eq!(acc.lane(i as usize), expected, "C[{},{}]", i, j);
            }
            // Lanes past the tile's row extent stay zero.
            for e in p as usize..crate::LANES {
                assert_eq!(acc.lane(e), 0.0);
            }
        }
    }

    #[test]
    fn test_minimum_inner_dimension_degenerates_to_prime_drain() {
        let mem = DeviceMemory::new(4096);
        let base = 64u32;
        // A single 1x2 row [3, 5] and a 2x1 column [2; 7].
        mem.store_f32(base, 3.0);
        mem.store_f32(base + 4, 5.0);
        mem.store_f32(base + 64, 2.0);
        mem.store_f32(base + 128, 7.0);

        let mut stream = OperandStream::new(&mem, base, 64, 1, base + 64, 64, 1);
        let mut bank = AccumulatorBank::new();
        stream_accumulate(&mut stream, &mut bank, 2, 1);

        assert_eq!(bank.take(0).lane(0), 3.0 * 2.0 + 5.0 * 7.0);
    }

    #[test]
    fn test_take_resets_the_accumulator() {
        let mut bank = AccumulatorBank::new();
        let ops = Operands {
            vec: F32x16::broadcast(2.0),
            scalars: [1.0; ACCUMULATORS],
        };
        bank.accumulate(&ops, 3);
        assert_eq!(bank.take(1).lane(0), 2.0);
        // Drained exactly once: the slot reads zero afterwards.
        assert_eq!(bank.take(1), F32x16::ZERO);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "operand fetch queue overrun")]
    fn test_lookahead_depth_is_bounded() {
        let mem = DeviceMemory::new(4096);
        let mut stream = OperandStream::new(&mem, 64, 4, 1, 128, 4, 1);
        stream.prefetch();
        stream.prefetch();
        stream.prefetch();
    }
}
