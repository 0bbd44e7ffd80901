//! Device main memory and the host-side buffer allocator.
//!
//! Memory is a flat, word-addressed window; every address the kernels handle
//! is a byte offset into it, carried as `u32` exactly like the parameter
//! block words. The allocator hands out row-major, byte-strided matrix
//! buffers whose row pitch is padded up to [`ROW_PITCH`] bytes, so strides
//! routinely exceed the logical row width, the same layout the kernels must
//! cope with on real hardware.

use std::cell::UnsafeCell;

use crate::error::{allocation_error, Result};

/// Bytes per memory word (one f32).
pub const WORD: u32 = 4;

/// Row pitch granularity for allocated matrices, in bytes.
pub const ROW_PITCH: u32 = 64;

/// First byte handed out by the allocator; address 0 stays unused.
const ALLOC_BASE: u32 = ROW_PITCH;

/// A row-major matrix buffer in device memory.
///
/// `stride` is the byte distance between consecutive rows and is at least
/// `WORD * cols`; the padding bytes past each logical row are never touched
/// by the kernels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatrixBuffer {
    /// Byte address of element (0, 0).
    pub base: u32,
    /// Row stride in bytes.
    pub stride: u32,
    /// Logical row count.
    pub rows: u32,
    /// Logical column count.
    pub cols: u32,
}

/// The device memory window.
///
/// # Concurrency
///
/// Launched kernel threads access the window through `&DeviceMemory` with raw
/// word loads and stores. This is sound under the device's resource contract:
/// A and B regions are only read while threads run, and every thread writes
/// exclusively inside its own statically partitioned C region. The host only
/// mutates memory between launches, through `&mut self` methods.
pub struct DeviceMemory {
    words: UnsafeCell<Box<[u32]>>,
    next: u32,
    limit: u32,
}

// Raw access is serialized by the partition contract described above.
unsafe impl Sync for DeviceMemory {}

impl DeviceMemory {
    /// Creates a zero-initialized memory window of `bytes` bytes (rounded up
    /// to a whole number of words).
    pub fn new(bytes: usize) -> Self {
        let n_words = bytes.div_ceil(WORD as usize);
        let limit = (n_words as u32) * WORD;
        DeviceMemory {
            words: UnsafeCell::new(vec![0u32; n_words].into_boxed_slice()),
            next: ALLOC_BASE.min(limit),
            limit,
        }
    }

    #[inline(always)]
    fn word_ptr(&self, addr: u32) -> *mut u32 {
        assert!(
            addr % WORD == 0 && addr < self.limit,
            "device address {:#x} out of window (limit {:#x})",
            addr,
            self.limit
        );
        unsafe { (*self.words.get()).as_mut_ptr().add((addr / WORD) as usize) }
    }

    /// Loads the 32-bit word at byte address `addr`.
    #[inline(always)]
    pub fn load_u32(&self, addr: u32) -> u32 {
        unsafe { self.word_ptr(addr).read() }
    }

    /// Stores a 32-bit word at byte address `addr`.
    #[inline(always)]
    pub fn store_u32(&self, addr: u32, value: u32) {
        unsafe { self.word_ptr(addr).write(value) }
    }

    /// Loads the f32 whose bit pattern sits at byte address `addr`.
    #[inline(always)]
    pub fn load_f32(&self, addr: u32) -> f32 {
        f32::from_bits(self.load_u32(addr))
    }

    /// Stores `value`'s bit pattern at byte address `addr`.
    #[inline(always)]
    pub fn store_f32(&self, addr: u32, value: f32) {
        self.store_u32(addr, value.to_bits());
    }

    /// Number of bytes still available to the allocator.
    pub fn available(&self) -> usize {
        (self.limit - self.next) as usize
    }

    /// Allocates `bytes` bytes aligned to `align` (a power of two, at least
    /// one word) and returns the base address.
    pub fn alloc(&mut self, bytes: u32, align: u32) -> Result<u32> {
        debug_assert!(align.is_power_of_two() && align >= WORD);
        let base = (self.next + align - 1) & !(align - 1);
        let end = base.checked_add(bytes).unwrap_or(u32::MAX);
        if end > self.limit {
            return Err(allocation_error(bytes as usize, self.available()));
        }
        self.next = end;
        Ok(base)
    }

    /// Allocates a `rows` x `cols` f32 matrix with the row pitch padded up to
    /// [`ROW_PITCH`] bytes.
    pub fn alloc_matrix(&mut self, rows: u32, cols: u32) -> Result<MatrixBuffer> {
        let stride = (cols * WORD).div_ceil(ROW_PITCH) * ROW_PITCH;
        let base = self.alloc(rows * stride, ROW_PITCH)?;
        Ok(MatrixBuffer {
            base,
            stride,
            rows,
            cols,
        })
    }

    /// Writes a dense row-major `data` slice into a strided device buffer.
    pub fn write_matrix(&mut self, m: &MatrixBuffer, data: &[f32]) {
        assert_eq!(data.len(), (m.rows * m.cols) as usize);
        for i in 0..m.rows {
            let row = m.base + i * m.stride;
            for j in 0..m.cols {
                self.store_f32(row + j * WORD, data[(i * m.cols + j) as usize]);
            }
        }
    }

    /// Reads a strided device buffer back into a dense row-major vector.
    pub fn read_matrix(&self, m: &MatrixBuffer) -> Vec<f32> {
        let mut out = Vec::with_capacity((m.rows * m.cols) as usize);
        for i in 0..m.rows {
            let row = m.base + i * m.stride;
            for j in 0..m.cols {
                out.push(self.load_f32(row + j * WORD));
            }
        }
        out
    }
}
