//! Constant 2×2 gate matrices and parameterized generators
//!
//! Every gate the engine understands acts through a single 2×2 unitary,
//! optionally gated by control qubits. Multi-qubit gates (CX, SWAP, CSWAP,
//! MCX) never materialize their full matrix; they are lowered onto these
//! 2×2 blocks or onto index swaps by [`crate::op::GateOp`].

use num_complex::Complex64;

/// A single-qubit gate matrix in row-major order.
pub type Matrix2 = [[Complex64; 2]; 2];

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);
const I: Complex64 = Complex64::new(0.0, 1.0);
const NEG_I: Complex64 = Complex64::new(0.0, -1.0);
const NEG_ONE: Complex64 = Complex64::new(-1.0, 0.0);

const INV_SQRT2: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Hadamard gate matrix
/// H = 1/√2 * [[1,  1],
///             [1, -1]]
pub const HADAMARD: Matrix2 = [
    [
        Complex64::new(INV_SQRT2, 0.0),
        Complex64::new(INV_SQRT2, 0.0),
    ],
    [
        Complex64::new(INV_SQRT2, 0.0),
        Complex64::new(-INV_SQRT2, 0.0),
    ],
];

/// Pauli-X gate matrix (NOT gate)
pub const PAULI_X: Matrix2 = [[ZERO, ONE], [ONE, ZERO]];

/// Pauli-Y gate matrix
/// Y = [[0, -i],
///      [i,  0]]
pub const PAULI_Y: Matrix2 = [[ZERO, NEG_I], [I, ZERO]];

/// Pauli-Z gate matrix
pub const PAULI_Z: Matrix2 = [[ONE, ZERO], [ZERO, NEG_ONE]];

/// Identity gate matrix
pub const IDENTITY: Matrix2 = [[ONE, ZERO], [ZERO, ONE]];

/// S gate matrix (√Z)
pub const S_GATE: Matrix2 = [[ONE, ZERO], [ZERO, I]];

/// S† gate matrix
pub const S_GATE_DAGGER: Matrix2 = [[ONE, ZERO], [ZERO, NEG_I]];

/// T gate matrix (√S)
/// T = [[1, 0],
///      [0, e^(iπ/4)]]
pub const T_GATE: Matrix2 = [
    [ONE, ZERO],
    [ZERO, Complex64::new(INV_SQRT2, INV_SQRT2)],
];

/// T† gate matrix
pub const T_GATE_DAGGER: Matrix2 = [
    [ONE, ZERO],
    [ZERO, Complex64::new(INV_SQRT2, -INV_SQRT2)],
];

/// √X gate matrix
/// SX = 1/2 * [[1+i, 1-i],
///             [1-i, 1+i]]
pub const SX_GATE: Matrix2 = [
    [Complex64::new(0.5, 0.5), Complex64::new(0.5, -0.5)],
    [Complex64::new(0.5, -0.5), Complex64::new(0.5, 0.5)],
];

/// √X† gate matrix
pub const SX_GATE_DAGGER: Matrix2 = [
    [Complex64::new(0.5, -0.5), Complex64::new(0.5, 0.5)],
    [Complex64::new(0.5, 0.5), Complex64::new(0.5, -0.5)],
];

/// Rotation about the X axis
/// RX(θ) = [[cos(θ/2),    -i·sin(θ/2)],
///          [-i·sin(θ/2),  cos(θ/2)]]
#[inline]
pub fn rotation_x(theta: f64) -> Matrix2 {
    let (sin_val, cos_val) = (theta / 2.0).sin_cos();
    [
        [Complex64::new(cos_val, 0.0), Complex64::new(0.0, -sin_val)],
        [Complex64::new(0.0, -sin_val), Complex64::new(cos_val, 0.0)],
    ]
}

/// Rotation about the Y axis
/// RY(θ) = [[cos(θ/2),  -sin(θ/2)],
///          [sin(θ/2),   cos(θ/2)]]
#[inline]
pub fn rotation_y(theta: f64) -> Matrix2 {
    let (sin_val, cos_val) = (theta / 2.0).sin_cos();
    [
        [Complex64::new(cos_val, 0.0), Complex64::new(-sin_val, 0.0)],
        [Complex64::new(sin_val, 0.0), Complex64::new(cos_val, 0.0)],
    ]
}

/// Rotation about the Z axis
/// RZ(θ) = [[e^(-iθ/2),  0       ],
///          [0,          e^(iθ/2)]]
#[inline]
pub fn rotation_z(theta: f64) -> Matrix2 {
    let half_theta = theta / 2.0;
    [
        [Complex64::from_polar(1.0, -half_theta), ZERO],
        [ZERO, Complex64::from_polar(1.0, half_theta)],
    ]
}

/// Phase gate
/// P(φ) = [[1, 0     ],
///         [0, e^(iφ)]]
#[inline]
pub fn phase(phi: f64) -> Matrix2 {
    [[ONE, ZERO], [ZERO, Complex64::from_polar(1.0, phi)]]
}

/// Matrix product `a · b`.
pub fn multiply(a: &Matrix2, b: &Matrix2) -> Matrix2 {
    let mut result = [[ZERO; 2]; 2];
    for i in 0..2 {
        for j in 0..2 {
            for k in 0..2 {
                result[i][j] += a[i][k] * b[k][j];
            }
        }
    }
    result
}

/// Conjugate transpose.
pub fn dagger(m: &Matrix2) -> Matrix2 {
    [
        [m[0][0].conj(), m[1][0].conj()],
        [m[0][1].conj(), m[1][1].conj()],
    ]
}

/// Check `U†U = I` within `epsilon` per element.
pub fn is_unitary(m: &Matrix2, epsilon: f64) -> bool {
    let product = multiply(&dagger(m), m);
    (0..2).all(|i| (0..2).all(|j| (product[i][j] - IDENTITY[i][j]).norm() <= epsilon))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn assert_matrix_eq(actual: &Matrix2, expected: &Matrix2) {
        for i in 0..2 {
            for j in 0..2 {
                assert_relative_eq!(actual[i][j].re, expected[i][j].re, epsilon = 1e-10);
                assert_relative_eq!(actual[i][j].im, expected[i][j].im, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_pauli_x_squaring() {
        assert_matrix_eq(&multiply(&PAULI_X, &PAULI_X), &IDENTITY);
    }

    #[test]
    fn test_hadamard_self_inverse() {
        assert_matrix_eq(&multiply(&HADAMARD, &HADAMARD), &IDENTITY);
    }

    #[test]
    fn test_s_gate_squaring() {
        assert_matrix_eq(&multiply(&S_GATE, &S_GATE), &PAULI_Z);
    }

    #[test]
    fn test_t_gate_squaring() {
        assert_matrix_eq(&multiply(&T_GATE, &T_GATE), &S_GATE);
    }

    #[test]
    fn test_sx_squaring() {
        assert_matrix_eq(&multiply(&SX_GATE, &SX_GATE), &PAULI_X);
        assert_matrix_eq(&multiply(&SX_GATE, &SX_GATE_DAGGER), &IDENTITY);
    }

    #[test]
    fn test_daggers_match_constants() {
        assert_matrix_eq(&dagger(&S_GATE), &S_GATE_DAGGER);
        assert_matrix_eq(&dagger(&T_GATE), &T_GATE_DAGGER);
        assert_matrix_eq(&dagger(&SX_GATE), &SX_GATE_DAGGER);
    }

    #[test]
    fn test_rotation_x_pi() {
        // RX(π) = -iX
        let rx_pi = rotation_x(PI);
        let mut expected = PAULI_X;
        for row in expected.iter_mut() {
            for value in row.iter_mut() {
                *value *= NEG_I;
            }
        }
        assert_matrix_eq(&rx_pi, &expected);
    }

    #[test]
    fn test_rotation_zero_is_identity() {
        assert_matrix_eq(&rotation_x(0.0), &IDENTITY);
        assert_matrix_eq(&rotation_y(0.0), &IDENTITY);
        assert_matrix_eq(&rotation_z(0.0), &IDENTITY);
        assert_matrix_eq(&phase(0.0), &IDENTITY);
    }

    #[test]
    fn test_phase_quarter_turn_is_s() {
        assert_matrix_eq(&phase(PI / 2.0), &S_GATE);
        assert_matrix_eq(&phase(PI / 4.0), &T_GATE);
    }

    #[test]
    fn test_all_constants_unitary() {
        for m in [
            HADAMARD,
            PAULI_X,
            PAULI_Y,
            PAULI_Z,
            S_GATE,
            S_GATE_DAGGER,
            T_GATE,
            T_GATE_DAGGER,
            SX_GATE,
            SX_GATE_DAGGER,
        ] {
            assert!(is_unitary(&m, 1e-12));
        }
        assert!(is_unitary(&rotation_y(0.37), 1e-12));
    }
}
