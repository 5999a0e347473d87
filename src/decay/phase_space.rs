//! Approximate phase-space volumes
//!
//! Exact for two bodies. For N bodies the lightest particle is split off
//! and the rest treated as one system of invariant mass μ; each factor of
//! the recursion Φ_N(M) = ∫ dμ²/2π Φ_2(M; m_1, μ) Φ_{N-1}(μ) is replaced by
//! its largest value over the window of μ, which gives an upper bound.

use std::f64::consts::PI;

/// Källén function λ(a, b, c)
pub fn kallen(a: f64, b: f64, c: f64) -> f64 {
    a * a + b * b + c * c - 2.0 * a * b - 2.0 * a * c - 2.0 * b * c
}

/// Two-body phase space of a particle of mass `m` into masses `m1`, `m2`
pub fn two_body(m: f64, m1: f64, m2: f64) -> f64 {
    if m <= 0.0 || m <= m1 + m2 {
        return 0.0;
    }
    let lambda = kallen(m * m, m1 * m1, m2 * m2).max(0.0);
    lambda.sqrt() / (8.0 * PI * m * m)
}

/// Upper bound on the N-body phase space of mass `m` decaying to `masses`
///
/// Masses are sorted ascending first; zero when the channel is closed.
pub fn apx_psarea(m: f64, masses: &[f64]) -> f64 {
    let mut sorted = masses.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    psarea_sorted(m, &sorted)
}

fn psarea_sorted(m: f64, masses: &[f64]) -> f64 {
    match masses {
        [] | [_] => 0.0,
        [m1, m2] => two_body(m, *m1, *m2),
        [first, rest @ ..] => {
            let lo: f64 = rest.iter().sum();
            let hi = m - first;
            if hi <= lo {
                return 0.0;
            }
            (hi * hi - lo * lo) / (2.0 * PI) * two_body(m, *first, lo) * psarea_sorted(hi, rest)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_massless_two_body() {
        assert!((two_body(10.0, 0.0, 0.0) - 1.0 / (8.0 * PI)).abs() < 1e-12);
    }

    #[test]
    fn test_closed_channel() {
        assert_eq!(two_body(10.0, 6.0, 5.0), 0.0);
        assert_eq!(apx_psarea(10.0, &[4.0, 4.0, 3.0]), 0.0);
    }

    #[test]
    fn test_phase_space_shrinks_with_masses() {
        let light = apx_psarea(100.0, &[0.0, 0.0, 0.0]);
        let heavy = apx_psarea(100.0, &[30.0, 20.0, 10.0]);
        assert!(light > heavy && heavy > 0.0);
        assert_eq!(apx_psarea(100.0, &[30.0, 10.0, 20.0]), heavy);
    }
}
