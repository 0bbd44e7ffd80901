//! The kernel programs and their building blocks.
//!
//! Two variants of the same algorithm run on the device:
//!
//! - [`single::sgemm_kernel`]: one hardware thread, row-major A (PxQ) and
//!   B (QxR), output tiles of 16 rows x 64 columns;
//! - [`threaded::sgemm_tt_kernel`]: several hardware threads over transposed
//!   inputs (A as QxP, B as RxQ), output tiles of 64 rows x 16 columns, with
//!   the mutex/semaphore completion protocol.
//!
//! The shared machinery lives beside them: clipped tile arithmetic in
//! [`geometry`], the software-pipelined inner-product engine in [`stream`],
//! the staggered sub-block drain in [`tile_io`], the static output-plane
//! split in [`partition`], and the parameter-block wire format in [`params`].

pub mod geometry;
pub mod params;
pub mod partition;
pub mod single;
pub mod stream;
pub mod threaded;
pub mod tile_io;
