//! SGEMM demo: runs both device kernels against the scalar reference and an
//! ndarray cross-check, reporting throughput and error bounds.

use std::time::Instant;

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use gemmly::gemm::{sgemm, sgemm_tt};
use gemmly::reference::sgemm_ref;
use gemmly::vpu::Vpu;

fn random_matrix(rng: &mut StdRng, rows: usize, cols: usize) -> Vec<f32> {
    (0..rows * cols).map(|_| rng.random_range(-1.0..1.0)).collect()
}

fn transposed(data: &[f32], rows: usize, cols: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; rows * cols];
    for i in 0..rows {
        for j in 0..cols {
            out[j * rows + i] = data[i * cols + j];
        }
    }
    out
}

fn max_absolute_error(c1: &[f32], c2: &[f32]) -> f32 {
    c1.iter()
        .zip(c2)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f32::max)
}

fn max_relative_error(c1: &[f32], c2: &[f32]) -> f32 {
    c1.iter()
        .zip(c2)
        .map(|(x, y)| ((x - y) / y).abs())
        .fold(0.0, f32::max)
}

fn gflops(p: usize, q: usize, r: usize, seconds: f64) -> f64 {
    (2 * p * q * r + 3 * p * r) as f64 / seconds * 1e-9
}

fn main() {
    let (p, q, r) = (96usize, 363usize, 1536usize);
    let (alpha, beta) = (0.75f32, 1.25f32);
    let mut rng = StdRng::seed_from_u64(0);

    let a = random_matrix(&mut rng, p, q);
    let b = random_matrix(&mut rng, q, r);
    let c0 = random_matrix(&mut rng, p, r);

    println!("==== sgemm ({}x{} times {}x{}) ====", p, q, q, r);
    println!("alpha = {}, beta = {}", alpha, beta);

    // Reference on the host.
    let mut c_ref = c0.clone();
    let start = Instant::now();
    sgemm_ref(&a, &b, &mut c_ref, p, q, r, alpha, beta);
    let dt = start.elapsed().as_secs_f64();
    println!("reference: {:.4} s, {:.3} Gflop/s", dt, gflops(p, q, r, dt));

    // ndarray cross-check of the reference itself.
    let na = Array2::from_shape_vec((p, q), a.clone()).unwrap();
    let nb = Array2::from_shape_vec((q, r), b.clone()).unwrap();
    let nc = Array2::from_shape_vec((p, r), c0.clone()).unwrap();
    let expected = na.dot(&nb) * alpha + &nc * beta;
    let expected: Vec<f32> = expected.into_iter().collect();
    println!(
        "reference vs ndarray: max abs err {:.3e}",
        max_absolute_error(&c_ref, &expected)
    );

    // Single-thread device kernel.
    let mut vpu = Vpu::new(32 << 20);
    let da = vpu.memory.alloc_matrix(p as u32, q as u32).unwrap();
    let db = vpu.memory.alloc_matrix(q as u32, r as u32).unwrap();
    let dc = vpu.memory.alloc_matrix(p as u32, r as u32).unwrap();
    vpu.memory.write_matrix(&da, &a);
    vpu.memory.write_matrix(&db, &b);
    vpu.memory.write_matrix(&dc, &c0);

    let start = Instant::now();
    sgemm(&mut vpu, alpha, &da, &db, beta, &dc).unwrap();
    let dt = start.elapsed().as_secs_f64();
    let c_single = vpu.memory.read_matrix(&dc);
    println!(
        "device (1 thread): {:.4} s, {:.3} Gflop/s",
        dt,
        gflops(p, q, r, dt)
    );
    println!(
        "  max abs err {:.3e}, max rel err {:.3e}",
        max_absolute_error(&c_single, &c_ref),
        max_relative_error(&c_single, &c_ref)
    );

    // Multi-thread transposed kernel on the same problem.
    let mut vpu = Vpu::new(32 << 20);
    let da = vpu.memory.alloc_matrix(q as u32, p as u32).unwrap();
    let db = vpu.memory.alloc_matrix(r as u32, q as u32).unwrap();
    let dc = vpu.memory.alloc_matrix(p as u32, r as u32).unwrap();
    vpu.memory.write_matrix(&da, &transposed(&a, p, q));
    vpu.memory.write_matrix(&db, &transposed(&b, q, r));
    vpu.memory.write_matrix(&dc, &c0);

    let start = Instant::now();
    sgemm_tt(&mut vpu, alpha, &da, &db, beta, &dc).unwrap();
    let dt = start.elapsed().as_secs_f64();
    let c_threaded = vpu.memory.read_matrix(&dc);
    println!(
        "device (multi-thread): {:.4} s, {:.3} Gflop/s",
        dt,
        gflops(p, q, r, dt)
    );
    println!(
        "  max abs err {:.3e}, max rel err {:.3e}",
        max_absolute_error(&c_threaded, &c_ref),
        max_relative_error(&c_threaded, &c_ref)
    );
}
