//! Tile drain: quad-buffered load / scale / store staggering.
//!
//! When a tile's inner-product loop finishes, its old C values are needed for
//! blending and its new values must go out: up to four 16-wide sub-block
//! transfers each way. The drain staggers them so the DMA engine is never
//! idle while the ALUs scale, and the ALUs never wait for a transfer that was
//! issued early enough:
//!
//! - load of block 0 goes out first (the moment old C is actually needed);
//! - while block b is being scaled, the load of block b+1 is in flight;
//! - block b's store is issued only after its scaling is complete, and only
//!   after the previous store has been waited for; buffer reuse is gated by
//!   explicit wait points, never by timing.
//!
//! At most one load and one store are in flight at any instant. Blocks past
//! the tile's sub-block count are skipped entirely; no wait is executed for a
//! transfer that was never issued.
//!
//! Scaling applies `alpha*acc + beta*C_old` with one multiply and one fused
//! multiply-add per element, and reading an accumulator out of the bank
//! resets it to zero for the next tile.

use crate::kernel::geometry::{Orientation, TileShape};
use crate::kernel::stream::AccumulatorBank;
use crate::vpu::dma::{DmaEngine, DmaStrides, TileBuffer};
use crate::vpu::memory::{DeviceMemory, WORD};
use crate::SUB_BLOCK;

/// Drains one finished tile at C byte address `c_addr`.
///
/// The caller must hold the device's stride-register guard for the duration
/// of the call (and, in the multi-thread kernel, until it has also waited for
/// the final store).
#[allow(clippy::too_many_arguments)]
pub fn drain_tile(
    mem: &DeviceMemory,
    engine: &mut DmaEngine,
    buffer: &mut TileBuffer,
    bank: &mut AccumulatorBank,
    strides: &mut DmaStrides,
    shape: TileShape,
    c_addr: u32,
    c_stride: u32,
    alpha: f32,
    beta: f32,
) {
    let blocks = shape.sub_blocks();

    // The buffer is about to be overwritten: the previous tile's last store
    // must have left it.
    engine.wait_store();

    strides.load = c_stride;
    let rect0 = shape.block_rect(0, c_stride);
    engine.issue_load(mem, buffer, 0, c_addr + rect0.offset, rect0.rows, rect0.cols, strides);

    for b in 0..blocks {
        let rect = shape.block_rect(b, c_stride);

        // Block b has landed; overlap its scaling with the next load.
        engine.wait_load();
        if b + 1 < blocks {
            let next = shape.block_rect(b + 1, c_stride);
            engine.issue_load(mem, buffer, b + 1, c_addr + next.offset, next.rows, next.cols, strides);
        }

        // Scale-and-combine block b, draining its accumulators to zero.
        let wide = shape.block_wide(b) as usize;
        for x in 0..wide {
            let acc = bank.take(b * SUB_BLOCK + x);
            match shape.orientation {
                Orientation::WideCols => {
                    let prev = buffer.column_vec(b, x);
                    buffer.set_column_vec(b, x, acc.scale_combine(prev, alpha, beta));
                }
                Orientation::WideRows => {
                    let prev = buffer.row_vec(b, x);
                    buffer.set_row_vec(b, x, acc.scale_combine(prev, alpha, beta));
                }
            }
        }

        // Store b goes out only once its data is ready and the previous
        // store's buffer region is free again.
        engine.wait_store();
        strides.store = c_stride - WORD * rect.cols;
        engine.issue_store(mem, buffer, b, c_addr + rect.offset, rect.rows, rect.cols, strides);
    }
}
