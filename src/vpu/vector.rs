//! 16-lane f32 vector register type.
//!
//! `F32x16` is the register the kernel accumulates into: one lane per
//! position along a tile's narrow axis. The type is deliberately portable;
//! binding lanes to a physical vector ISA is a lowering concern that lives
//! with whatever backend replaces the software device model, not in the
//! algorithm layer. The operation set is exactly what the kernels need:
//! broadcast, lane-wise multiply/add, and the scale-and-combine step used
//! when a tile is drained.

use std::ops::{Add, Mul};

use crate::LANES;

/// A vector register holding 16 packed f32 lanes.
#[derive(Copy, Clone, Debug, PartialEq)]
#[repr(C, align(64))]
pub struct F32x16([f32; LANES]);

impl F32x16 {
    /// The all-zero register, the state every accumulator starts from and is
    /// drained back to.
    pub const ZERO: F32x16 = F32x16([0.0; LANES]);

    /// Replicates `value` into every lane.
    ///
    /// This is the whole broadcast interface: the rotation plumbing a real
    /// target needs to get a scalar into all lanes stays behind this call and
    /// carries no persistent state.
    #[inline(always)]
    pub fn broadcast(value: f32) -> Self {
        F32x16([value; LANES])
    }

    /// Loads up to 16 lanes from `values`, zero-filling the rest.
    ///
    /// Used for edge tiles where fewer than 16 positions are valid; the zero
    /// lanes are never stored back, they only keep the gather in bounds.
    #[inline(always)]
    pub fn from_slice_padded(values: &[f32]) -> Self {
        debug_assert!(values.len() <= LANES);
        let mut lanes = [0.0f32; LANES];
        lanes[..values.len()].copy_from_slice(values);
        F32x16(lanes)
    }

    /// Builds a register from a closure over lane indices.
    #[inline(always)]
    pub fn from_fn(f: impl FnMut(usize) -> f32) -> Self {
        F32x16(std::array::from_fn(f))
    }

    /// Reads lane `e`.
    #[inline(always)]
    pub fn lane(&self, e: usize) -> f32 {
        self.0[e]
    }

    /// Returns the lanes as a plain array.
    #[inline(always)]
    pub fn to_array(self) -> [f32; LANES] {
        self.0
    }

    /// `alpha * self + beta * prev`, lane-wise, with the exact rounding shape
    /// of the drain stage: one multiply (`alpha * self`) followed by one fused
    /// multiply-add (`beta * prev + _`).
    #[inline(always)]
    pub fn scale_combine(self, prev: F32x16, alpha: f32, beta: f32) -> F32x16 {
        F32x16(std::array::from_fn(|e| {
            beta.mul_add(prev.0[e], alpha * self.0[e])
        }))
    }
}

impl Add for F32x16 {
    type Output = F32x16;

    #[inline(always)]
    fn add(self, rhs: F32x16) -> F32x16 {
        F32x16(std::array::from_fn(|e| self.0[e] + rhs.0[e]))
    }
}

impl Mul for F32x16 {
    type Output = F32x16;

    #[inline(always)]
    fn mul(self, rhs: F32x16) -> F32x16 {
        F32x16(std::array::from_fn(|e| self.0[e] * rhs.0[e]))
    }
}
