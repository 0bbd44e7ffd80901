//! Single-thread SGEMM kernel: `C = alpha*A*B + beta*C`.
//!
//! A is PxQ, B is QxR, C is PxR, all row-major. The output plane is walked in
//! tiles of 16 rows x 64 columns; per inner-dimension step the streamed
//! vector operand is one A column segment (lane e = row e of the tile) and
//! the scalar operands are one B row segment (one per tile column).

use crate::kernel::geometry::{clip, TileShape};
use crate::kernel::params::{ParamBlock, UNIFORM_WORDS};
use crate::kernel::stream::{stream_accumulate, AccumulatorBank, OperandStream};
use crate::kernel::tile_io::drain_tile;
use crate::vpu::dma::{DmaEngine, TileBuffer};
use crate::vpu::memory::WORD;
use crate::vpu::Vpu;
use crate::{TILE_NARROW, TILE_WIDE};

/// Kernel entry point for one hardware thread.
pub fn sgemm_kernel(vpu: &Vpu, unif: u32) {
    let par = ParamBlock::load(&vpu.memory, unif, UNIFORM_WORDS);
    let mem = &vpu.memory;

    let mut engine = DmaEngine::new();
    let mut buffer = TileBuffer::new();
    let mut bank = AccumulatorBank::new();

    // Running alone, this kernel owns the stride registers for its whole
    // lifetime.
    let mut strides = vpu.dma_strides.lock().unwrap();

    for i0 in (0..par.p).step_by(TILE_NARROW) {
        let rows = clip(par.p, i0, TILE_NARROW as u32);
        for j0 in (0..par.r).step_by(TILE_WIDE) {
            let cols = clip(par.r, j0, TILE_WIDE as u32);

            // A_cur lane e reads A[i0+e, k]; B_cur reads B[k, j0..j0+cols].
            let mut stream = OperandStream::new(
                mem,
                par.a_base + i0 * par.a_stride,
                par.a_stride,
                rows as usize,
                par.b_base + j0 * WORD,
                par.b_stride,
                cols as usize,
            );
            stream_accumulate(&mut stream, &mut bank, par.q, cols as usize);

            let c_cur = par.c_base + i0 * par.c_stride + j0 * WORD;
            drain_tile(
                mem,
                &mut engine,
                &mut buffer,
                &mut bank,
                &mut strides,
                TileShape::wide_cols(rows, cols),
                c_cur,
                par.c_stride,
                par.alpha,
                par.beta,
            );
        }
    }

    engine.wait_store();
    drop(strides);
    vpu.host_irq.raise();
}
