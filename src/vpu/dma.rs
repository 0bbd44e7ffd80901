//! Asynchronous DMA engine and the on-chip tile buffer.
//!
//! Each hardware thread drains finished output tiles through this engine, one
//! 16x16 sub-block per transfer. Two rules from the hardware carry over
//! verbatim into the model:
//!
//! - **At most one load and one store are in flight per thread.** Issuing a
//!   second transfer of the same direction without an intervening wait is a
//!   protocol violation and trips a debug assertion. Waiting while the
//!   channel is idle is a no-op, so a kernel may skip a transfer it never
//!   issued without stalling.
//! - **The stride registers are shared device state.** [`DmaStrides`] is one
//!   register set per device, not per thread; it lives behind the mutex in
//!   [`crate::vpu::Vpu`] and a thread must hold that lock from configuring a
//!   stride until the transfer using it has been issued.
//!
//! In this software model a transfer's data movement happens at issue time
//! and the wait retires the descriptor; the protocol is what is being
//! modelled, not the latency.

use crate::vpu::memory::{DeviceMemory, WORD};
use crate::vpu::vector::F32x16;
use crate::{LANES, SUB_BLOCK, SUB_BLOCKS_PER_TILE};

/// The device-wide DMA stride-configuration registers.
///
/// `load` is the row pitch used when gathering a C sub-block into the tile
/// buffer. `store` is the *skip* applied after each row of a store, i.e.
/// `C_stride - WORD * ncols` for a block of `ncols` columns; this is why it
/// must be reconfigured for every clipped edge block, and why unsynchronized
/// threads would corrupt each other's transfers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DmaStrides {
    /// Row pitch for loads, in bytes.
    pub load: u32,
    /// Post-row skip for stores, in bytes.
    pub store: u32,
}

/// On-chip staging memory for one output tile: 4 sub-blocks of 16x16 f32.
///
/// Sub-block storage is row-major with respect to C. The single-thread kernel
/// reads and writes vectors along block *columns* (a tile is 16 rows by 64
/// columns), the transposed kernel along block *rows* (64 rows by 16
/// columns); both accessors are provided and the lanes beyond a clipped edge
/// simply carry stale data that is never stored back.
pub struct TileBuffer {
    blocks: [[[f32; SUB_BLOCK]; LANES]; SUB_BLOCKS_PER_TILE],
}

impl TileBuffer {
    /// A zeroed tile buffer.
    pub fn new() -> Self {
        TileBuffer {
            blocks: [[[0.0; SUB_BLOCK]; LANES]; SUB_BLOCKS_PER_TILE],
        }
    }

    /// Column `col` of sub-block `block` as a vector, lane e = row e.
    #[inline(always)]
    pub fn column_vec(&self, block: usize, col: usize) -> F32x16 {
        F32x16::from_fn(|e| self.blocks[block][e][col])
    }

    /// Overwrites column `col` of sub-block `block`.
    #[inline(always)]
    pub fn set_column_vec(&mut self, block: usize, col: usize, v: F32x16) {
        for e in 0..LANES {
            self.blocks[block][e][col] = v.lane(e);
        }
    }

    /// Row `row` of sub-block `block` as a vector, lane e = column e.
    #[inline(always)]
    pub fn row_vec(&self, block: usize, row: usize) -> F32x16 {
        F32x16::from_slice_padded(&self.blocks[block][row])
    }

    /// Overwrites row `row` of sub-block `block`.
    #[inline(always)]
    pub fn set_row_vec(&mut self, block: usize, row: usize, v: F32x16) {
        self.blocks[block][row] = v.to_array();
    }
}

impl Default for TileBuffer {
    fn default() -> Self {
        TileBuffer::new()
    }
}

/// Per-thread DMA channel state: the in-flight descriptors.
pub struct DmaEngine {
    load_in_flight: bool,
    store_in_flight: bool,
}

impl DmaEngine {
    /// An idle engine.
    pub fn new() -> Self {
        DmaEngine {
            load_in_flight: false,
            store_in_flight: false,
        }
    }

    /// Issues an asynchronous load of a `rows` x `cols` C rectangle at byte
    /// address `addr` into sub-block `block`, using the configured load row
    /// pitch.
    #[allow(clippy::too_many_arguments)]
    pub fn issue_load(
        &mut self,
        mem: &DeviceMemory,
        buffer: &mut TileBuffer,
        block: usize,
        addr: u32,
        rows: u32,
        cols: u32,
        strides: &DmaStrides,
    ) {
        debug_assert!(!self.load_in_flight, "DMA load issued while one is in flight");
        debug_assert!(rows as usize <= LANES && cols as usize <= SUB_BLOCK);
        for r in 0..rows {
            let row_addr = addr + r * strides.load;
            for c in 0..cols {
                buffer.blocks[block][r as usize][c as usize] =
                    mem.load_f32(row_addr + c * WORD);
            }
        }
        self.load_in_flight = true;
    }

    /// Blocks until the outstanding load (if any) has completed.
    pub fn wait_load(&mut self) {
        self.load_in_flight = false;
    }

    /// Issues an asynchronous store of a `rows` x `cols` rectangle from
    /// sub-block `block` to byte address `addr`. After each row of `cols`
    /// words the write cursor advances by the configured store skip, landing
    /// on the next C row.
    #[allow(clippy::too_many_arguments)]
    pub fn issue_store(
        &mut self,
        mem: &DeviceMemory,
        buffer: &TileBuffer,
        block: usize,
        addr: u32,
        rows: u32,
        cols: u32,
        strides: &DmaStrides,
    ) {
        debug_assert!(
            !self.store_in_flight,
            "DMA store issued while one is in flight"
        );
        debug_assert!(rows as usize <= LANES && cols as usize <= SUB_BLOCK);
        let mut cursor = addr;
        for r in 0..rows {
            for c in 0..cols {
                mem.store_f32(cursor, buffer.blocks[block][r as usize][c as usize]);
                cursor += WORD;
            }
            cursor += strides.store;
        }
        self.store_in_flight = true;
    }

    /// Blocks until the outstanding store (if any) has completed.
    pub fn wait_store(&mut self) {
        self.store_in_flight = false;
    }
}

impl Default for DmaEngine {
    fn default() -> Self {
        DmaEngine::new()
    }
}
