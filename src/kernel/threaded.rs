//! Multi-thread transposed SGEMM kernel: `C = alpha*Aᵀ*Bᵀ + beta*C`.
//!
//! A is supplied as QxP and B as RxQ (both transposed), C is PxR, all
//! row-major. Each hardware thread runs this program over its own statically
//! assigned sub-region of the output plane; its parameter block already
//! points at the sub-region's A/B/C bases, so the tile walk below is
//! identical on every thread. Tiles are 64 rows x 16 columns: the streamed
//! vector operand is a B row segment (lane e = tile column e) and the scalar
//! operands come from one A row (one per tile row).
//!
//! Two resources are shared between threads. The DMA stride registers are
//! taken under the device mutex for the whole of each tile drain, from the
//! first stride configuration until the final store of the tile has been
//! waited for. Completion uses the counting semaphore: every thread except
//! thread 0 signals it exactly once and terminates silently; thread 0, after
//! finishing its own region, consumes one signal per sibling and is the only
//! thread that raises the host-visible interrupt.

use crate::kernel::geometry::{clip, TileShape};
use crate::kernel::params::{ParamBlock, UNIFORM_WORDS_MT};
use crate::kernel::stream::{stream_accumulate, AccumulatorBank, OperandStream};
use crate::kernel::tile_io::drain_tile;
use crate::vpu::dma::{DmaEngine, TileBuffer};
use crate::vpu::memory::WORD;
use crate::vpu::Vpu;
use crate::{TILE_NARROW, TILE_WIDE};

/// Kernel entry point for one hardware thread.
pub fn sgemm_tt_kernel(vpu: &Vpu, unif: u32) {
    let par = ParamBlock::load(&vpu.memory, unif, UNIFORM_WORDS_MT);
    let mem = &vpu.memory;

    let mut engine = DmaEngine::new();
    let mut buffer = TileBuffer::new();
    let mut bank = AccumulatorBank::new();

    for i0 in (0..par.p).step_by(TILE_WIDE) {
        let rows = clip(par.p, i0, TILE_WIDE as u32);
        for j0 in (0..par.r).step_by(TILE_NARROW) {
            let cols = clip(par.r, j0, TILE_NARROW as u32);

            // B_cur lane e reads B[j0+e, k]; A_cur reads A[k, i0..i0+rows].
            let mut stream = OperandStream::new(
                mem,
                par.b_base + j0 * par.b_stride,
                par.b_stride,
                cols as usize,
                par.a_base + i0 * WORD,
                par.a_stride,
                rows as usize,
            );
            stream_accumulate(&mut stream, &mut bank, par.q, rows as usize);

            let c_cur = par.c_base + i0 * par.c_stride + j0 * WORD;
            {
                // The stride registers are shared device state: hold the
                // lock from configuration until the tile's transfers are
                // fully retired.
                let mut strides = vpu.dma_strides.lock().unwrap();
                drain_tile(
                    mem,
                    &mut engine,
                    &mut buffer,
                    &mut bank,
                    &mut strides,
                    TileShape::wide_rows(rows, cols),
                    c_cur,
                    par.c_stride,
                    par.alpha,
                    par.beta,
                );
                engine.wait_store();
            }
        }
    }

    if par.thread_index == 0 {
        // Completion root: collect one signal per sibling, then tell the
        // host. Only this thread may raise the interrupt.
        for _ in 1..par.thread_count {
            vpu.completed.down();
        }
        vpu.host_irq.raise();
    } else {
        vpu.completed.up();
    }
}
