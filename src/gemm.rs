//! Host entry points: validate, partition, build parameter blocks, launch.
//!
//! Everything that can go wrong with a GEMM call is rejected here, before
//! launch; the kernels themselves run a fixed-function pipeline with no
//! branches on data validity. The only failure visible after launch is a
//! thread that never reaches its completion signal, which hangs the call and
//! must be treated as fatal by the caller.

use crate::error::{validation_error, Result};
use crate::kernel::params::{ParamBlock, UNIFORM_WORDS, UNIFORM_WORDS_MT};
use crate::kernel::partition::{choose_divisors, split_plane};
use crate::kernel::single::sgemm_kernel;
use crate::kernel::threaded::sgemm_tt_kernel;
use crate::vpu::launch::launch;
use crate::vpu::memory::{MatrixBuffer, WORD};
use crate::vpu::Vpu;
use crate::{TILE_NARROW, TILE_WIDE};

/// Hardware threads available to one launch.
pub const MAX_THREADS: u32 = 12;

fn check_buffer(name: &str, m: &MatrixBuffer, rows: u32, cols: u32) -> Result<()> {
    if m.rows != rows || m.cols != cols {
        return Err(validation_error(format!(
            "{} must be {}x{}, got {}x{}",
            name, rows, cols, m.rows, m.cols
        )));
    }
    if m.stride % WORD != 0 || m.stride < cols * WORD {
        return Err(validation_error(format!(
            "{} row stride {} invalid for {} columns",
            name, m.stride, cols
        )));
    }
    Ok(())
}

fn check_inner(q: u32) -> Result<()> {
    if q < 2 {
        return Err(validation_error(format!(
            "inner dimension must be at least 2, got {}",
            q
        )));
    }
    Ok(())
}

/// `C = alpha*A*B + beta*C` on a single hardware thread.
///
/// A is PxQ, B is QxR, C is PxR, all row-major in device memory. Blocks until
/// the device signals completion.
pub fn sgemm(
    vpu: &mut Vpu,
    alpha: f32,
    a: &MatrixBuffer,
    b: &MatrixBuffer,
    beta: f32,
    c: &MatrixBuffer,
) -> Result<()> {
    let (p, r) = (c.rows, c.cols);
    let q = a.cols;
    check_buffer("A", a, p, q)?;
    check_buffer("B", b, q, r)?;
    check_buffer("C", c, p, r)?;
    check_inner(q)?;

    let unif = vpu.memory.alloc((UNIFORM_WORDS * 4) as u32, WORD)?;
    ParamBlock {
        self_address: unif,
        p,
        q,
        r,
        a_base: a.base,
        b_base: b.base,
        c_base: c.base,
        a_stride: a.stride,
        b_stride: b.stride,
        c_stride: c.stride,
        alpha,
        beta,
        thread_index: 0,
        thread_count: 1,
    }
    .store(&mut vpu.memory, unif, UNIFORM_WORDS);

    launch(vpu, sgemm_kernel, &[unif]);
    Ok(())
}

/// `C = alpha*Aᵀ*Bᵀ + beta*C` across multiple hardware threads, partition
/// factors chosen automatically.
///
/// A is supplied as QxP and B as RxQ (both transposed), C is PxR.
pub fn sgemm_tt(
    vpu: &mut Vpu,
    alpha: f32,
    a: &MatrixBuffer,
    b: &MatrixBuffer,
    beta: f32,
    c: &MatrixBuffer,
) -> Result<()> {
    let (p_div, r_div) =
        choose_divisors(c.rows, c.cols, TILE_WIDE as u32, TILE_NARROW as u32);
    sgemm_tt_with_divisors(vpu, p_div, r_div, alpha, a, b, beta, c)
}

/// [`sgemm_tt`] with explicit partition factors.
///
/// The output plane is cut into `p_div * r_div` static per-thread regions;
/// the result is identical for every factorization.
#[allow(clippy::too_many_arguments)]
pub fn sgemm_tt_with_divisors(
    vpu: &mut Vpu,
    p_div: u32,
    r_div: u32,
    alpha: f32,
    a: &MatrixBuffer,
    b: &MatrixBuffer,
    beta: f32,
    c: &MatrixBuffer,
) -> Result<()> {
    let (p, r) = (c.rows, c.cols);
    let q = a.rows;
    check_buffer("A (transposed)", a, q, p)?;
    check_buffer("B (transposed)", b, r, q)?;
    check_buffer("C", c, p, r)?;
    check_inner(q)?;

    let n_threads = p_div * r_div;
    if p_div < 1 || r_div < 1 || n_threads > MAX_THREADS {
        return Err(validation_error(format!(
            "partition factors {}x{} exceed the {} hardware threads",
            p_div, r_div, MAX_THREADS
        )));
    }

    let regions = split_plane(p, r, p_div, r_div, TILE_WIDE as u32, TILE_NARROW as u32);
    let block_bytes = (UNIFORM_WORDS_MT * 4) as u32;
    let base = vpu.memory.alloc(n_threads * block_bytes, WORD)?;

    let mut param_addrs = Vec::with_capacity(n_threads as usize);
    for (th, region) in regions.iter().enumerate() {
        let addr = base + th as u32 * block_bytes;
        ParamBlock {
            self_address: addr,
            p: region.rows,
            q,
            r: region.cols,
            // A[0, row0], B[col0, 0], C[row0, col0] of the global matrices.
            a_base: a.base + region.row0 * WORD,
            b_base: b.base + region.col0 * b.stride,
            c_base: c.base + region.row0 * c.stride + region.col0 * WORD,
            a_stride: a.stride,
            b_stride: b.stride,
            c_stride: c.stride,
            alpha,
            beta,
            thread_index: th as u32,
            thread_count: n_threads,
        }
        .store(&mut vpu.memory, addr, UNIFORM_WORDS_MT);
        param_addrs.push(addr);
    }

    launch(vpu, sgemm_tt_kernel, &param_addrs);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inner_dimension_below_two_is_rejected() {
        let mut vpu = Vpu::new(1 << 20);
        let a = vpu.memory.alloc_matrix(4, 1).unwrap();
        let b = vpu.memory.alloc_matrix(1, 4).unwrap();
        let c = vpu.memory.alloc_matrix(4, 4).unwrap();
        let err = sgemm(&mut vpu, 1.0, &a, &b, 0.0, &c).unwrap_err();
        assert!(format!("{}", err).contains("inner dimension"));
    }

    #[test]
    fn test_dimension_mismatch_is_rejected() {
        let mut vpu = Vpu::new(1 << 20);
        let a = vpu.memory.alloc_matrix(4, 8).unwrap();
        let b = vpu.memory.alloc_matrix(9, 4).unwrap();
        let c = vpu.memory.alloc_matrix(4, 4).unwrap();
        assert!(sgemm(&mut vpu, 1.0, &a, &b, 0.0, &c).is_err());
    }

    #[test]
    fn test_oversubscribed_partition_is_rejected() {
        let mut vpu = Vpu::new(1 << 20);
        let a = vpu.memory.alloc_matrix(8, 64).unwrap();
        let b = vpu.memory.alloc_matrix(64, 8).unwrap();
        let c = vpu.memory.alloc_matrix(64, 64).unwrap();
        let err =
            sgemm_tt_with_divisors(&mut vpu, 4, 4, 1.0, &a, &b, 0.0, &c).unwrap_err();
        assert!(format!("{}", err).contains("hardware threads"));
    }
}
