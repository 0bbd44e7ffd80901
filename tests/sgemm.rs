//! Conformance tests for the single-thread kernel against the scalar
//! reference.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use gemmly::gemm::sgemm;
use gemmly::reference::sgemm_ref;
use gemmly::vpu::Vpu;

fn random_matrix(rng: &mut StdRng, rows: usize, cols: usize) -> Vec<f32> {
    (0..rows * cols).map(|_| rng.random_range(-1.0..1.0)).collect()
}

/// Runs the device kernel on dense host-side inputs, returning the C it
/// produced.
#[allow(clippy::too_many_arguments)]
fn run_single(
    p: usize,
    q: usize,
    r: usize,
    alpha: f32,
    beta: f32,
    a: &[f32],
    b: &[f32],
    c: &[f32],
) -> Vec<f32> {
    let mut vpu = Vpu::new(32 << 20);
    let da = vpu.memory.alloc_matrix(p as u32, q as u32).unwrap();
    let db = vpu.memory.alloc_matrix(q as u32, r as u32).unwrap();
    let dc = vpu.memory.alloc_matrix(p as u32, r as u32).unwrap();
    vpu.memory.write_matrix(&da, a);
    vpu.memory.write_matrix(&db, b);
    vpu.memory.write_matrix(&dc, c);
    sgemm(&mut vpu, alpha, &da, &db, beta, &dc).unwrap();
    vpu.memory.read_matrix(&dc)
}

fn assert_close(actual: &[f32], expected: &[f32], context: &str) {
    assert_eq!(actual.len(), expected.len());
    for (i, (&got, &want)) in actual.iter().zip(expected).enumerate() {
        let diff = (got - want).abs();
        let max_val = got.abs().max(want.abs());
        let rel_err = if max_val > 1e-6 { diff / max_val } else { diff };
        assert!(
            rel_err < 1e-4,
            "{}: C[{}] mismatch: got {}, expected {}, rel_err {}",
            context,
            i,
            got,
            want,
            rel_err
        );
    }
}

fn check_against_reference(p: usize, q: usize, r: usize, alpha: f32, beta: f32) {
    let mut rng = StdRng::seed_from_u64((p * 1_000_000 + q * 1_000 + r) as u64);
    let a = random_matrix(&mut rng, p, q);
    let b = random_matrix(&mut rng, q, r);
    let c = random_matrix(&mut rng, p, r);

    let got = run_single(p, q, r, alpha, beta, &a, &b, &c);
    let mut expected = c.clone();
    sgemm_ref(&a, &b, &mut expected, p, q, r, alpha, beta);
    assert_close(&got, &expected, &format!("{}x{}x{}", p, q, r));
}

#[test]
fn test_matches_reference_on_assorted_shapes() {
    check_against_reference(16, 2, 64, 1.0, 1.0);
    check_against_reference(48, 17, 96, 1.0, 0.0);
    check_against_reference(96, 64, 192, 0.5, -1.5);
    check_against_reference(33, 50, 130, -0.25, 2.0);
    check_against_reference(7, 128, 40, 1.0, 1.0);
}

#[test]
fn test_tile_edges_along_both_axes() {
    // One below, at, and above a tile multiple on each axis.
    for &p in &[15, 16, 17] {
        for &r in &[63, 64, 65] {
            check_against_reference(p, 19, r, 1.0, 1.0);
        }
    }
}

#[test]
fn test_multi_tile_edges() {
    for &p in &[31, 32, 33] {
        for &r in &[127, 128, 129] {
            check_against_reference(p, 23, r, 2.0, 0.5);
        }
    }
}

#[test]
fn test_minimum_problem_size() {
    // P = 1, R = 1, Q = 2: the smallest legal problem, computed exactly.
    let a = vec![3.0f32, 5.0];
    let b = vec![2.0f32, 7.0];
    let c = vec![10.0f32];
    let got = run_single(1, 2, 1, 1.5, 0.25, &a, &b, &c);
    let dot = 3.0f32 * 2.0 + 5.0 * 7.0;
    let expected = 0.25f32.mul_add(10.0, 1.5 * dot);
    assert_eq!(got[0], expected);
}

#[test]
fn test_beta_zero_ignores_prior_c() {
    let (p, q, r) = (20, 9, 70);
    let mut rng = StdRng::seed_from_u64(7);
    let a = random_matrix(&mut rng, p, q);
    let b = random_matrix(&mut rng, q, r);
    let c1 = random_matrix(&mut rng, p, r);
    let c2 = vec![123.0f32; p * r];

    let out1 = run_single(p, q, r, 1.0, 0.0, &a, &b, &c1);
    let out2 = run_single(p, q, r, 1.0, 0.0, &a, &b, &c2);
    assert_eq!(out1, out2);
}

#[test]
fn test_accumulators_drain_between_runs() {
    // A second pass with alpha = 0, beta = 1 must leave C untouched: any
    // partial sums leaking across tiles would show up here.
    let (p, q, r) = (33, 11, 80);
    let mut rng = StdRng::seed_from_u64(11);
    let a = random_matrix(&mut rng, p, q);
    let b = random_matrix(&mut rng, q, r);
    let c = random_matrix(&mut rng, p, r);

    let mut vpu = Vpu::new(32 << 20);
    let da = vpu.memory.alloc_matrix(p as u32, q as u32).unwrap();
    let db = vpu.memory.alloc_matrix(q as u32, r as u32).unwrap();
    let dc = vpu.memory.alloc_matrix(p as u32, r as u32).unwrap();
    vpu.memory.write_matrix(&da, &a);
    vpu.memory.write_matrix(&db, &b);
    vpu.memory.write_matrix(&dc, &c);

    sgemm(&mut vpu, 1.0, &da, &db, 1.0, &dc).unwrap();
    let after_first = vpu.memory.read_matrix(&dc);

    sgemm(&mut vpu, 0.0, &da, &db, 1.0, &dc).unwrap();
    assert_eq!(vpu.memory.read_matrix(&dc), after_first);
}

#[test]
fn test_repeated_launches_on_one_device() {
    // The completion interrupt resets; the same device runs again.
    let (p, q, r) = (16, 4, 64);
    let mut rng = StdRng::seed_from_u64(3);
    let a = random_matrix(&mut rng, p, q);
    let b = random_matrix(&mut rng, q, r);
    let c = vec![0.0f32; p * r];

    let mut vpu = Vpu::new(16 << 20);
    let da = vpu.memory.alloc_matrix(p as u32, q as u32).unwrap();
    let db = vpu.memory.alloc_matrix(q as u32, r as u32).unwrap();
    let dc = vpu.memory.alloc_matrix(p as u32, r as u32).unwrap();
    vpu.memory.write_matrix(&da, &a);
    vpu.memory.write_matrix(&db, &b);
    vpu.memory.write_matrix(&dc, &c);

    sgemm(&mut vpu, 1.0, &da, &db, 0.0, &dc).unwrap();
    let first = vpu.memory.read_matrix(&dc);
    sgemm(&mut vpu, 1.0, &da, &db, 0.0, &dc).unwrap();
    assert_eq!(vpu.memory.read_matrix(&dc), first);
}
