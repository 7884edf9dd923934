//! SSE2 + rayon gate kernels
//!
//! Same pair updates as [`crate::kernels`], with the complex arithmetic done
//! in 128-bit registers (one `Complex64` per register) and large vectors
//! split across the rayon pool. Results match the reference kernels to
//! floating-point rounding.

use crate::kernels::{combined_mask, qubit_mask, step, update_pair};
use num_complex::Complex64;
use rayon::prelude::*;
use synq_gates::Matrix2;

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

/// Vectors below this many amplitudes are processed on the calling thread
pub const PARALLEL_MIN_DIMENSION: usize = 1 << 14;

/// Pairs handed to one rayon task when a single block is split
const SEGMENT_PAIRS: usize = 1 << 12;

/// Whether the running CPU supports the SSE2 path
pub fn sse2_available() -> bool {
    #[cfg(target_arch = "x86_64")]
    {
        is_x86_feature_detected!("sse2")
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        false
    }
}

/// `[re, re]` and `[-im, im]`, so that
/// `m * a = m.re * [a.re, a.im] + [-m.im, m.im] * [a.im, a.re]`
#[cfg(target_arch = "x86_64")]
#[inline(always)]
unsafe fn splat(m: Complex64) -> (__m128d, __m128d) {
    (_mm_set1_pd(m.re), _mm_set_pd(m.im, -m.im))
}

/// Apply `matrix` to every pair `(lo[j], hi[j])` using SSE2.
///
/// # Safety
/// Requires SSE2 support (available on all x86_64 CPUs).
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn update_pairs_sse2(lo: &mut [Complex64], hi: &mut [Complex64], matrix: &Matrix2) {
    debug_assert_eq!(lo.len(), hi.len());

    let (m00_re, m00_im) = splat(matrix[0][0]);
    let (m01_re, m01_im) = splat(matrix[0][1]);
    let (m10_re, m10_im) = splat(matrix[1][0]);
    let (m11_re, m11_im) = splat(matrix[1][1]);

    for (a0, a1) in lo.iter_mut().zip(hi.iter_mut()) {
        let p0 = a0 as *mut Complex64 as *mut f64;
        let p1 = a1 as *mut Complex64 as *mut f64;

        let x0 = _mm_loadu_pd(p0); // [re, im]
        let x1 = _mm_loadu_pd(p1);
        let x0_swapped = _mm_shuffle_pd::<0b01>(x0, x0); // [im, re]
        let x1_swapped = _mm_shuffle_pd::<0b01>(x1, x1);

        let new0 = _mm_add_pd(
            _mm_add_pd(_mm_mul_pd(m00_re, x0), _mm_mul_pd(m00_im, x0_swapped)),
            _mm_add_pd(_mm_mul_pd(m01_re, x1), _mm_mul_pd(m01_im, x1_swapped)),
        );
        let new1 = _mm_add_pd(
            _mm_add_pd(_mm_mul_pd(m10_re, x0), _mm_mul_pd(m10_im, x0_swapped)),
            _mm_add_pd(_mm_mul_pd(m11_re, x1), _mm_mul_pd(m11_im, x1_swapped)),
        );

        _mm_storeu_pd(p0, new0);
        _mm_storeu_pd(p1, new1);
    }
}

#[inline]
fn update_pairs(lo: &mut [Complex64], hi: &mut [Complex64], matrix: &Matrix2) {
    #[cfg(target_arch = "x86_64")]
    {
        if sse2_available() {
            // SAFETY: feature presence checked at runtime just above
            unsafe { update_pairs_sse2(lo, hi, matrix) };
            return;
        }
    }
    for (a0, a1) in lo.iter_mut().zip(hi.iter_mut()) {
        update_pair(matrix, a0, a1);
    }
}

/// Run `f(base, lo, hi)` over every block of `2 * step` amplitudes,
/// splitting across threads once the vector is large enough. `base` is the
/// basis index of `lo[0]`.
fn for_each_segment<F>(state: &mut [Complex64], step: usize, f: F)
where
    F: Fn(usize, &mut [Complex64], &mut [Complex64]) + Sync,
{
    if state.len() < PARALLEL_MIN_DIMENSION {
        for (block, chunk) in state.chunks_exact_mut(2 * step).enumerate() {
            let (lo, hi) = chunk.split_at_mut(step);
            f(block * 2 * step, lo, hi);
        }
        return;
    }

    state
        .par_chunks_exact_mut(2 * step)
        .enumerate()
        .for_each(|(block, chunk)| {
            let base = block * 2 * step;
            let (lo, hi) = chunk.split_at_mut(step);
            if step <= SEGMENT_PAIRS {
                f(base, lo, hi);
            } else {
                lo.par_chunks_mut(SEGMENT_PAIRS)
                    .zip(hi.par_chunks_mut(SEGMENT_PAIRS))
                    .enumerate()
                    .for_each(|(segment, (l, h))| f(base + segment * SEGMENT_PAIRS, l, h));
            }
        });
}

/// Single-qubit gate
pub fn apply_single(state: &mut [Complex64], matrix: &Matrix2, target: usize, num_qubits: usize) {
    for_each_segment(state, step(target, num_qubits), |_, lo, hi| {
        update_pairs(lo, hi, matrix)
    });
}

/// Controlled single-qubit gate.
///
/// Runs of pairs sharing the control bit are handed to the vector kernel
/// whole: a control above the target decides per block, a control below it
/// alternates in runs of `control_mask` pairs.
pub fn apply_controlled(
    state: &mut [Complex64],
    matrix: &Matrix2,
    control: usize,
    target: usize,
    num_qubits: usize,
) {
    let control_mask = qubit_mask(control, num_qubits);
    for_each_segment(state, step(target, num_qubits), |base, lo, hi| {
        if control_mask >= lo.len() {
            // control bit is constant across this segment
            if base & control_mask != 0 {
                update_pairs(lo, hi, matrix);
            }
            return;
        }
        let run = control_mask;
        for (l, h) in lo.chunks_mut(2 * run).zip(hi.chunks_mut(2 * run)) {
            if l.len() > run {
                update_pairs(&mut l[run..], &mut h[run..], matrix);
            }
        }
    });
}

/// Multi-controlled X
pub fn apply_mcx(state: &mut [Complex64], controls: &[usize], target: usize, num_qubits: usize) {
    let control_mask = combined_mask(controls, num_qubits);
    for_each_segment(state, step(target, num_qubits), |base, lo, hi| {
        for (j, (a0, a1)) in lo.iter_mut().zip(hi.iter_mut()).enumerate() {
            if (base + j) & control_mask == control_mask {
                std::mem::swap(a0, a1);
            }
        }
    });
}
