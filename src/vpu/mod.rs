//! Software model of the vector coprocessor.
//!
//! The real target is a wide-SIMD coprocessor with no cache: a fixed number of
//! hardware threads, 16-lane vector registers, a small on-chip tile buffer,
//! and an asynchronous DMA engine that moves rectangles between the buffer and
//! main memory. This module models exactly the surface the kernel programs
//! depend on, so the algorithm layer stays free of target plumbing:
//!
//! - [`memory::DeviceMemory`]: the flat word-addressed memory window plus
//!   the host-side buffer allocator,
//! - [`vector::F32x16`]: the 16-lane vector register type,
//! - [`dma`]: per-thread DMA engine, tile buffer, and the *shared*
//!   stride-configuration registers,
//! - [`sync`]: counting semaphore and the host-visible interrupt line,
//! - [`launch`]: spawns one OS thread per hardware thread and blocks the
//!   host until the completion interrupt fires.
//!
//! DMA transfers complete at issue time in this model, but the issue/wait
//! protocol is enforced with debug assertions, so every ordering obligation
//! the kernel must honour on real hardware is exercised by the tests.

pub mod dma;
pub mod launch;
pub mod memory;
pub mod sync;
pub mod vector;

use std::sync::Mutex;

use crate::vpu::dma::DmaStrides;
use crate::vpu::memory::DeviceMemory;
use crate::vpu::sync::{InterruptLine, Semaphore};

/// One coprocessor instance: the memory window plus the resources shared by
/// all hardware threads.
///
/// Per-thread state (DMA engine, tile buffer, accumulators) is owned by the
/// kernel programs themselves; everything here is either host-owned
/// (`memory`, mutated only between launches) or explicitly synchronized.
pub struct Vpu {
    /// Main memory window, shared with all running threads.
    pub memory: DeviceMemory,
    /// The DMA stride-configuration registers. There is one set per device,
    /// not per thread, so concurrent kernels must hold the lock from
    /// configuration until the corresponding transfer has been issued.
    pub dma_strides: Mutex<DmaStrides>,
    /// Counting semaphore for the completion protocol: threads 1..n signal it
    /// once, thread 0 decrements it n-1 times.
    pub completed: Semaphore,
    /// Host-visible completion interrupt, raised by exactly one thread.
    pub host_irq: InterruptLine,
}

impl Vpu {
    /// Creates a device with a memory window of `bytes` bytes.
    pub fn new(bytes: usize) -> Self {
        Vpu {
            memory: DeviceMemory::new(bytes),
            dma_strides: Mutex::new(DmaStrides::default()),
            completed: Semaphore::new(0),
            host_irq: InterruptLine::new(),
        }
    }
}
