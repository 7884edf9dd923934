//! Reference gate kernels
//!
//! Bit convention: qubit `k` of an `n`-qubit register is bit `n-1-k` of the
//! basis index, so qubit 0 is the most significant bit and
//! `step(k) = 2^(n-1-k)`.
//!
//! These loops are the correctness oracle for every accelerated backend.
//! They run in place in O(2^n) time with O(1) extra space.

use num_complex::Complex64;
use synq_gates::Matrix2;

/// Distance between the two amplitudes a gate on `qubit` mixes
#[inline]
pub fn step(qubit: usize, num_qubits: usize) -> usize {
    1usize << (num_qubits - 1 - qubit)
}

/// Mask selecting `qubit`'s bit in a basis index
#[inline]
pub fn qubit_mask(qubit: usize, num_qubits: usize) -> usize {
    step(qubit, num_qubits)
}

/// Combined mask of several qubits
#[inline]
pub fn combined_mask(qubits: &[usize], num_qubits: usize) -> usize {
    qubits
        .iter()
        .fold(0, |mask, &q| mask | qubit_mask(q, num_qubits))
}

/// 2×2 update of one amplitude pair
#[inline(always)]
pub(crate) fn update_pair(matrix: &Matrix2, a0: &mut Complex64, a1: &mut Complex64) {
    let (x0, x1) = (*a0, *a1);
    *a0 = matrix[0][0] * x0 + matrix[0][1] * x1;
    *a1 = matrix[1][0] * x0 + matrix[1][1] * x1;
}

/// Walk every block of `2 * step` amplitudes, handing the callback the
/// block's base index and its low/high halves.
#[inline]
pub(crate) fn for_each_block<F>(state: &mut [Complex64], step: usize, mut f: F)
where
    F: FnMut(usize, &mut [Complex64], &mut [Complex64]),
{
    for (block, chunk) in state.chunks_exact_mut(2 * step).enumerate() {
        let (lo, hi) = chunk.split_at_mut(step);
        f(block * 2 * step, lo, hi);
    }
}

/// Apply a single-qubit gate
pub fn apply_single(state: &mut [Complex64], matrix: &Matrix2, target: usize, num_qubits: usize) {
    let step = step(target, num_qubits);
    for_each_block(state, step, |_, lo, hi| {
        for (a0, a1) in lo.iter_mut().zip(hi.iter_mut()) {
            update_pair(matrix, a0, a1);
        }
    });
}

/// Apply a single-qubit gate to `target` on the subspace where `control` is 1
pub fn apply_controlled(
    state: &mut [Complex64],
    matrix: &Matrix2,
    control: usize,
    target: usize,
    num_qubits: usize,
) {
    let step = step(target, num_qubits);
    let control_mask = qubit_mask(control, num_qubits);
    // only the low member of each pair is enumerated, so no pair is seen twice
    for_each_block(state, step, |base, lo, hi| {
        for (j, (a0, a1)) in lo.iter_mut().zip(hi.iter_mut()).enumerate() {
            if (base + j) & control_mask != 0 {
                update_pair(matrix, a0, a1);
            }
        }
    });
}

/// Multi-controlled X: swap `i` and `i | target_mask` wherever every
/// control bit of `i` is set and its target bit is clear.
pub fn apply_mcx(state: &mut [Complex64], controls: &[usize], target: usize, num_qubits: usize) {
    let control_mask = combined_mask(controls, num_qubits);
    let target_mask = qubit_mask(target, num_qubits);
    for i in 0..state.len() {
        if i & control_mask == control_mask && i & target_mask == 0 {
            state.swap(i, i | target_mask);
        }
    }
}

/// Exchange qubits `a` and `b` by direct index swap
pub fn apply_swap(state: &mut [Complex64], a: usize, b: usize, num_qubits: usize) {
    apply_masked_swap(state, 0, a, b, num_qubits);
}

/// Exchange qubits `a` and `b` where `control` is 1
pub fn apply_cswap(state: &mut [Complex64], control: usize, a: usize, b: usize, num_qubits: usize) {
    apply_masked_swap(state, qubit_mask(control, num_qubits), a, b, num_qubits);
}

fn apply_masked_swap(
    state: &mut [Complex64],
    control_mask: usize,
    a: usize,
    b: usize,
    num_qubits: usize,
) {
    let mask_a = qubit_mask(a, num_qubits);
    let mask_b = qubit_mask(b, num_qubits);
    // |..1..0..⟩ ↔ |..0..1..⟩, visited from the side with a=1, b=0
    for i in 0..state.len() {
        if i & control_mask == control_mask && i & mask_a != 0 && i & mask_b == 0 {
            state.swap(i, i ^ mask_a ^ mask_b);
        }
    }
}
