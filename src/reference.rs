//! Host-side scalar reference: `C = alpha*A*B + beta*C` in plain f32.
//!
//! The device kernels are validated against this loop. Row parallelism via
//! rayon keeps larger conformance runs fast; per element the arithmetic is
//! the straightforward accumulate-then-scale form, so comparisons with the
//! pipelined kernel are tolerance-based, not bitwise.

use rayon::iter::{IndexedParallelIterator, ParallelIterator};
use rayon::slice::ParallelSliceMut;

/// `C = alpha*A*B + beta*C` with A (PxQ), B (QxR) and C (PxR) as dense
/// row-major slices.
pub fn sgemm_ref(
    a: &[f32],
    b: &[f32],
    c: &mut [f32],
    p: usize,
    q: usize,
    r: usize,
    alpha: f32,
    beta: f32,
) {
    assert_eq!(a.len(), p * q);
    assert_eq!(b.len(), q * r);
    assert_eq!(c.len(), p * r);

    c.par_chunks_mut(r).enumerate().for_each(|(i, c_row)| {
        for (j, c_elem) in c_row.iter_mut().enumerate() {
            let mut sum = 0.0f32;
            for k in 0..q {
                sum += a[i * q + k] * b[k * r + j];
            }
            *c_elem = alpha * sum + beta * *c_elem;
        }
    });
}
