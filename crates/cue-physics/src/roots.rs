use std::cmp::Ordering;

use num_complex::Complex;
use thiserror::Error;

pub type C64 = Complex<f64>;

/// Relative size below which the cubic term of a depressed quartic is treated
/// as zero and the equation is solved as a biquadratic.
const BIQUADRATIC_EPS: f64 = 1e-14;
const POLISH_ITERATIONS: usize = 3;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SolverError {
    #[error("solve_quartic: leading coefficient is zero, use a lower-degree solver")]
    DegenerateEquation,
    #[error("solve_quartic: all coefficients must be finite")]
    NonFiniteCoefficient,
}

/// Solves `a·x⁴ + b·x³ + c·x² + d·x + e = 0`.
///
/// Returns exactly four roots counting multiplicity. Real roots have a zero
/// imaginary part. The roots are sorted by real part, then by imaginary part.
///
/// The quartic is reduced to its depressed form `y⁴ + p·y² + q·y + r`, which is
/// split into two quadratics using the largest real root of the resolvent
/// cubic (Ferrari). Each root is then refined with Newton steps on the
/// input polynomial.
///
/// # Errors
///
/// [`SolverError::DegenerateEquation`] if `a == 0`, and
/// [`SolverError::NonFiniteCoefficient`] for NaN or infinite coefficients.
pub fn solve_quartic(a: f64, b: f64, c: f64, d: f64, e: f64) -> Result<[C64; 4], SolverError> {
    if ![a, b, c, d, e].iter().all(|v| v.is_finite()) {
        return Err(SolverError::NonFiniteCoefficient);
    }
    if a == 0.0 {
        return Err(SolverError::DegenerateEquation);
    }

    // Monic form
    let (b, c, d, e) = (b / a, c / a, d / a, e / a);

    // x = y - b/4
    let shift = b / 4.0;
    let b2 = b * b;
    let p = c - 3.0 * b2 / 8.0;
    let q = d - b * c / 2.0 + b2 * b / 8.0;
    let r = e - b * d / 4.0 + b2 * c / 16.0 - 3.0 * b2 * b2 / 256.0;

    let depressed = if q.abs() <= BIQUADRATIC_EPS * (1.0 + p.abs().powf(1.5) + r.abs().powf(0.75))
    {
        solve_biquadratic(p, r)
    } else {
        // Resolvent cubic 8m³ + 8p·m² + (2p² - 8r)·m - q² = 0 in monic form. Its
        // value at zero is -q²/8 < 0, so the largest real root is positive.
        let m = largest_cubic_root(p, p * p / 4.0 - r, -q * q / 8.0);
        let s = (2.0 * m).sqrt();
        let [y0, y1] = solve_monic_quadratic(-s, p / 2.0 + m + q / (2.0 * s));
        let [y2, y3] = solve_monic_quadratic(s, p / 2.0 + m - q / (2.0 * s));
        [y0, y1, y2, y3]
    };

    let mut roots = depressed.map(|y| polish(y - shift, b, c, d, e));
    roots.sort_by(|l, r| l.re.total_cmp(&r.re).then(l.im.total_cmp(&r.im)));
    Ok(roots)
}

/// Solves `a·x² + b·x + c = 0` for real roots, in ascending order.
///
/// A zero discriminant yields a single root. If `a` is zero the linear
/// equation is solved instead.
pub fn solve_quadratic(a: f64, b: f64, c: f64) -> Vec<f64> {
    if a == 0.0 {
        if b == 0.0 {
            return Vec::new();
        }
        return vec![-c / b];
    }

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return Vec::new();
    }
    if discriminant == 0.0 {
        return vec![-0.5 * b / a];
    }

    // Avoid cancellation between -b and the square root
    let q = -0.5 * (b + discriminant.sqrt().copysign(b));
    let x0 = q / a;
    let x1 = c / q;
    if x0 <= x1 {
        vec![x0, x1]
    } else {
        vec![x1, x0]
    }
}

/// Keeps the roots whose imaginary part is below `eps` and returns their real
/// parts in ascending order.
pub fn real_roots(roots: &[C64], eps: f64) -> Vec<f64> {
    let mut real: Vec<f64> = roots
        .iter()
        .filter(|root| root.im.abs() < eps)
        .map(|root| root.re)
        .collect();
    real.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    real
}

/// Roots of `y⁴ + p·y² + r = 0`.
fn solve_biquadratic(p: f64, r: f64) -> [C64; 4] {
    let [z0, z1] = solve_monic_quadratic(p, r);
    let (w0, w1) = (z0.sqrt(), z1.sqrt());
    [w0, -w0, w1, -w1]
}

/// Both roots of `x² + β·x + γ = 0` with real coefficients.
fn solve_monic_quadratic(beta: f64, gamma: f64) -> [C64; 2] {
    let discriminant = beta * beta - 4.0 * gamma;
    if discriminant >= 0.0 {
        let q = -0.5 * (beta + discriminant.sqrt().copysign(beta));
        if q == 0.0 {
            return [C64::new(0.0, 0.0); 2];
        }
        [C64::new(q, 0.0), C64::new(gamma / q, 0.0)]
    } else {
        let re = -beta / 2.0;
        let im = (-discriminant).sqrt() / 2.0;
        [C64::new(re, -im), C64::new(re, im)]
    }
}

/// Largest real root of `t³ + a2·t² + a1·t + a0 = 0`.
fn largest_cubic_root(a2: f64, a1: f64, a0: f64) -> f64 {
    // t = u - a2/3 gives u³ + P·u + Q = 0
    let p = a1 - a2 * a2 / 3.0;
    let q = 2.0 * a2 * a2 * a2 / 27.0 - a2 * a1 / 3.0 + a0;
    let discriminant = (q / 2.0).powi(2) + (p / 3.0).powi(3);

    let u = if discriminant >= 0.0 {
        let s = discriminant.sqrt();
        (-q / 2.0 + s).cbrt() + (-q / 2.0 - s).cbrt()
    } else {
        // Three real roots, p < 0 here
        let r = (-p / 3.0).sqrt();
        let phi = ((-q / 2.0) / (r * r * r)).clamp(-1.0, 1.0).acos();
        2.0 * r * (phi / 3.0).cos()
    };

    let mut t = u - a2 / 3.0;
    let f = |t: f64| ((t + a2) * t + a1) * t + a0;
    for _ in 0..POLISH_ITERATIONS + 1 {
        let derivative = (3.0 * t + 2.0 * a2) * t + a1;
        if derivative == 0.0 {
            break;
        }
        let next = t - f(t) / derivative;
        if f(next).abs() < f(t).abs() {
            t = next;
        } else {
            break;
        }
    }
    t
}

/// Newton refinement of a root of the monic quartic `x⁴ + b·x³ + c·x² + d·x + e`.
/// A step is only taken if it lowers the residual.
fn polish(mut x: C64, b: f64, c: f64, d: f64, e: f64) -> C64 {
    let f = |x: C64| (((x + b) * x + c) * x + d) * x + e;
    let df = |x: C64| ((x * 4.0 + 3.0 * b) * x + 2.0 * c) * x + d;

    for _ in 0..POLISH_ITERATIONS {
        let derivative = df(x);
        if derivative.norm() == 0.0 {
            break;
        }
        let next = x - f(x) / derivative;
        if f(next).norm() < f(x).norm() {
            x = next;
        } else {
            break;
        }
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn residual(coeffs: [f64; 5], x: C64) -> f64 {
        let [a, b, c, d, e] = coeffs;
        ((((x * a + b) * x + c) * x + d) * x + e).norm()
    }

    fn assert_roots(actual: [C64; 4], expected: [(f64, f64); 4]) {
        for (root, (re, im)) in actual.iter().zip(expected) {
            assert_abs_diff_eq!(root.re, re, epsilon = 1e-4);
            assert_abs_diff_eq!(root.im, im, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_four_real_roots() {
        let roots = solve_quartic(1.0, -4.0, 0.0, 8.0, 1.0).unwrap();
        assert_roots(
            roots,
            [(-1.1753, 0.0), (-0.12603, 0.0), (2.1260, 0.0), (3.1753, 0.0)],
        );
        for root in roots {
            assert_eq!(root.im, 0.0);
        }
    }

    #[test]
    fn test_two_real_two_complex_roots() {
        let roots = solve_quartic(1.0, -4.0, 3.0, 8.0, 1.0).unwrap();
        assert_roots(
            roots,
            [
                (-0.91904, 0.0),
                (-0.13283, 0.0),
                (2.5259, -1.3459),
                (2.5259, 1.3459),
            ],
        );
    }

    #[test]
    fn test_small_coefficients() {
        let roots = solve_quartic(0.009604, -0.0274841, 0.0327719, -0.018757, 0.00174089).unwrap();
        assert_roots(
            roots,
            [
                (0.11314, 0.0),
                (0.715435, -0.839049),
                (0.715435, 0.839049),
                (1.31773, 0.0),
            ],
        );
    }

    #[test]
    fn test_repeated_roots() {
        // (x - 1)⁴
        let roots = solve_quartic(1.0, -4.0, 6.0, -4.0, 1.0).unwrap();
        for root in roots {
            assert_abs_diff_eq!(root.re, 1.0, epsilon = 1e-4);
            assert_abs_diff_eq!(root.im, 0.0, epsilon = 1e-4);
        }

        // (x² - 1)²
        let roots = solve_quartic(1.0, 0.0, -2.0, 0.0, 1.0).unwrap();
        assert_eq!(real_roots(&roots, 1e-9), vec![-1.0, -1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_biquadratic_complex() {
        // x⁴ + 1 has the four primitive 8th roots of unity
        let roots = solve_quartic(1.0, 0.0, 0.0, 0.0, 1.0).unwrap();
        let h = std::f64::consts::FRAC_1_SQRT_2;
        assert_roots(roots, [(-h, -h), (-h, h), (h, -h), (h, h)]);
    }

    #[test]
    fn test_degenerate_equation() {
        assert_eq!(
            solve_quartic(0.0, 1.0, 2.0, 3.0, 4.0),
            Err(SolverError::DegenerateEquation)
        );
        assert_eq!(
            solve_quartic(1.0, f64::NAN, 0.0, 0.0, 0.0),
            Err(SolverError::NonFiniteCoefficient)
        );
    }

    #[test]
    fn test_deterministic_output() {
        let a = solve_quartic(2.0, 3.0, -7.0, 1.0, 0.5).unwrap();
        let b = solve_quartic(2.0, 3.0, -7.0, 1.0, 0.5).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_random_residuals() {
        let mut rng = StdRng::seed_from_u64(42);
        for i in 0..20_000 {
            let coeffs = if i % 2 == 0 {
                let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
                [
                    sign * rng.gen_range(1.0..10.0),
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                ]
            } else {
                let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
                [
                    sign * rng.gen_range(1e3..1e4),
                    rng.gen_range(-1e4..1e4),
                    rng.gen_range(-1e4..1e4),
                    rng.gen_range(-1e4..1e4),
                    rng.gen_range(-1e4..1e4),
                ]
            };
            let [a, b, c, d, e] = coeffs;
            for root in solve_quartic(a, b, c, d, e).unwrap() {
                let res = residual(coeffs, root);
                assert!(res < 1e-4, "residual {res} for {coeffs:?} at {root}");
            }
        }
    }

    #[test]
    fn test_solve_quadratic() {
        assert_eq!(solve_quadratic(1.0, -3.0, 2.0), vec![1.0, 2.0]);
        assert_eq!(solve_quadratic(1.0, 2.0, 1.0), vec![-1.0]);
        assert!(solve_quadratic(1.0, 0.0, 1.0).is_empty());
        assert_eq!(solve_quadratic(0.0, 2.0, -4.0), vec![2.0]);
        assert!(solve_quadratic(0.0, 0.0, 1.0).is_empty());
    }

    #[test]
    fn test_real_roots_filter() {
        let roots = [
            C64::new(3.0, 0.0),
            C64::new(1.0, 2.0),
            C64::new(-1.0, 1e-12),
            C64::new(1.0, -2.0),
        ];
        assert_eq!(real_roots(&roots, 1e-9), vec![-1.0, 3.0]);
    }
}
