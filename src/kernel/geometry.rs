//! Tile geometry: clipped arithmetic over the output plane.
//!
//! Edge tiles are never special-cased structurally. Every extent a kernel
//! uses comes out of `min(remaining, maximum)`, so the same code path handles
//! full and partial tiles; when an extent divides exactly, the clipped value
//! *is* the full block size, an invariant the unit tests pin down rather
//! than an accident of the arithmetic.

use std::cmp::min;

use crate::{SUB_BLOCK, SUB_BLOCKS_PER_TILE, TILE_NARROW, TILE_WIDE};

/// Number of tiles covering `extent` at `tile` granularity.
#[inline(always)]
pub fn tiles(extent: u32, tile: u32) -> u32 {
    extent.div_ceil(tile)
}

/// Effective extent of the tile starting at `origin`: `min(remaining, max)`.
#[inline(always)]
pub fn clip(extent: u32, origin: u32, max: u32) -> u32 {
    min(extent - origin, max)
}

/// Number of 16-wide DMA sub-blocks in a tile of wide extent `wide`.
#[inline(always)]
pub fn sub_blocks(wide: u32) -> usize {
    min(tiles(wide, SUB_BLOCK as u32) as usize, SUB_BLOCKS_PER_TILE)
}

/// Which matrix axis a tile's wide dimension runs along.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    /// 16 rows x 64 columns: the wide axis is columns, accumulators hold
    /// tile columns (single-thread kernel).
    WideCols,
    /// 64 rows x 16 columns: the wide axis is rows, accumulators hold tile
    /// rows (transposed multi-thread kernel).
    WideRows,
}

/// The clipped shape of one output tile.
#[derive(Clone, Copy, Debug)]
pub struct TileShape {
    pub orientation: Orientation,
    /// Extent along the narrow (vector-lane) axis, at most 16.
    pub narrow: u32,
    /// Extent along the wide (accumulator-indexed) axis, at most 64.
    pub wide: u32,
}

/// The C rectangle one DMA sub-block covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockRect {
    /// Byte offset of the rectangle from the tile's C address.
    pub offset: u32,
    pub rows: u32,
    pub cols: u32,
}

impl TileShape {
    /// A 16-row x 64-column tile, clipped to `rows` x `cols`.
    pub fn wide_cols(rows: u32, cols: u32) -> Self {
        debug_assert!(rows as usize <= TILE_NARROW && cols as usize <= TILE_WIDE);
        TileShape {
            orientation: Orientation::WideCols,
            narrow: rows,
            wide: cols,
        }
    }

    /// A 64-row x 16-column tile, clipped to `rows` x `cols`.
    pub fn wide_rows(rows: u32, cols: u32) -> Self {
        debug_assert!(rows as usize <= TILE_WIDE && cols as usize <= TILE_NARROW);
        TileShape {
            orientation: Orientation::WideRows,
            narrow: cols,
            wide: rows,
        }
    }

    /// Number of sub-blocks this tile drains through.
    pub fn sub_blocks(&self) -> usize {
        sub_blocks(self.wide)
    }

    /// Wide extent of sub-block `b` (clipped for the last block of an edge
    /// tile).
    pub fn block_wide(&self, b: usize) -> u32 {
        clip(self.wide, (b * SUB_BLOCK) as u32, SUB_BLOCK as u32)
    }

    /// The C rectangle of sub-block `b`, relative to the tile's C address.
    pub fn block_rect(&self, b: usize, c_stride: u32) -> BlockRect {
        let wide = self.block_wide(b);
        match self.orientation {
            Orientation::WideCols => BlockRect {
                offset: (b * SUB_BLOCK * 4) as u32,
                rows: self.narrow,
                cols: wide,
            },
            Orientation::WideRows => BlockRect {
                offset: (b * SUB_BLOCK) as u32 * c_stride,
                rows: wide,
                cols: self.narrow,
            },
        }
    }
}
