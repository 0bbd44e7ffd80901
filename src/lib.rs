//! Blocked single-precision matrix multiply-accumulate (`C = alpha*A*B + beta*C`)
//! for a wide-SIMD vector coprocessor without a cache: every operand moves
//! explicitly between main memory and a small on-chip tile buffer through an
//! asynchronous DMA engine.
//!
//! The crate has two halves:
//!
//! - [`vpu`] is a software model of the device: flat word-addressed memory,
//!   the DMA engine with its shared stride-configuration registers, a
//!   counting semaphore, the host-visible interrupt line, and the thread
//!   launcher.
//! - [`kernel`] holds the kernel programs that run on it: tile geometry, the
//!   software-pipelined streaming accumulator, the quad-buffered tile drain,
//!   and the static multi-core partitioning with its completion protocol.
//!
//! [`gemm`] provides the host entry points ([`gemm::sgemm`] and
//! [`gemm::sgemm_tt`]) that validate inputs, build parameter blocks and launch
//! the kernels; [`reference`] holds the data-parallel scalar implementation
//! used for validation.

pub mod error;
pub mod gemm;
pub mod kernel;
pub mod reference;
pub mod vpu;

/// Lanes per vector register (and per accumulator).
pub const LANES: usize = 16;

/// Tile extent along the wide axis: 64 columns for the single-thread kernel,
/// 64 rows for the transposed multi-thread kernel.
pub const TILE_WIDE: usize = 64;

/// Tile extent along the narrow axis, one matrix element per vector lane.
pub const TILE_NARROW: usize = LANES;

/// Wide-axis span of one DMA sub-block transfer.
pub const SUB_BLOCK: usize = 16;

/// Sub-blocks per full tile.
pub const SUB_BLOCKS_PER_TILE: usize = TILE_WIDE / SUB_BLOCK;

/// Vector accumulators live during one tile's inner-product loop, one per
/// wide-axis position.
pub const ACCUMULATORS: usize = TILE_WIDE;
