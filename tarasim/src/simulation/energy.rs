//! Energy and momentum diagnostics.
//!
//! These are sanity checks reported around a run; the integrator never
//! consumes them.

use crate::simulation::states::{Body, NVec3};

/// Σ 0.5 m |v|²
pub fn kinetic_energy(bodies: &[Body]) -> f64 {
    bodies.iter().map(Body::kinetic_energy).sum()
}

/// Σ_{i<j} -m_i m_j / sqrt(|x_i - x_j|² + ε²), each unordered pair once.
/// Pairs at zero softened distance are skipped, matching the force kernel.
pub fn potential_energy(bodies: &[Body], eps2: f64) -> f64 {
    let mut epot = 0.0;
    for (i, bi) in bodies.iter().enumerate() {
        for bj in &bodies[i + 1..] {
            let d2 = (bj.x - bi.x).norm_squared() + eps2;
            if d2 > 0.0 {
                epot -= bi.m * bj.m / d2.sqrt();
            }
        }
    }
    epot
}

pub fn total_energy(bodies: &[Body], eps2: f64) -> f64 {
    kinetic_energy(bodies) + potential_energy(bodies, eps2)
}

/// Σ m v
pub fn total_momentum(bodies: &[Body]) -> NVec3 {
    bodies.iter().map(Body::momentum).sum()
}

/// Mass-weighted mean position, or the origin for an empty system.
pub fn center_of_mass(bodies: &[Body]) -> NVec3 {
    let mass: f64 = bodies.iter().map(|b| b.m).sum();
    if mass == 0.0 {
        return NVec3::zeros();
    }
    bodies.iter().map(|b| b.x * b.m).sum::<NVec3>() / mass
}

/// Snapshot of the conserved quantities at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyReport {
    pub kinetic: f64,
    pub potential: f64,
    pub momentum: NVec3,
}

impl EnergyReport {
    pub fn measure(bodies: &[Body], eps2: f64) -> Self {
        Self {
            kinetic: kinetic_energy(bodies),
            potential: potential_energy(bodies, eps2),
            momentum: total_momentum(bodies),
        }
    }

    pub fn total(&self) -> f64 {
        self.kinetic + self.potential
    }

    /// |E - E₀| / |E₀|, or the absolute difference when E₀ is ~0
    pub fn relative_drift(&self, baseline: &EnergyReport) -> f64 {
        let e0 = baseline.total();
        let de = (self.total() - e0).abs();
        if e0.abs() > 1e-12 {
            de / e0.abs()
        } else {
            de
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn potential_counts_each_pair_once() {
        let bodies = vec![
            Body::new(0, 1.0, NVec3::new(0.0, 0.0, 0.0), NVec3::zeros()),
            Body::new(1, 2.0, NVec3::new(1.0, 0.0, 0.0), NVec3::zeros()),
            Body::new(2, 3.0, NVec3::new(0.0, 2.0, 0.0), NVec3::zeros()),
        ];
        let expected = -(1.0 * 2.0 / 1.0) - (1.0 * 3.0 / 2.0) - (2.0 * 3.0 / 5f64.sqrt());
        assert_relative_eq!(potential_energy(&bodies, 0.0), expected, max_relative = 1e-14);
    }

    #[test]
    fn softening_enters_potential_in_quadrature() {
        let bodies = vec![
            Body::new(0, 1.0, NVec3::zeros(), NVec3::zeros()),
            Body::new(1, 1.0, NVec3::new(3.0, 0.0, 0.0), NVec3::zeros()),
        ];
        assert_relative_eq!(potential_energy(&bodies, 16.0), -0.2, max_relative = 1e-14);
    }

    #[test]
    fn report_tracks_momentum_and_drift() {
        let bodies = vec![
            Body::new(0, 2.0, NVec3::zeros(), NVec3::new(1.0, 0.0, 0.0)),
            Body::new(1, 1.0, NVec3::new(1.0, 0.0, 0.0), NVec3::new(-2.0, 0.0, 0.0)),
        ];
        let r = EnergyReport::measure(&bodies, 0.0);
        assert_eq!(r.momentum, NVec3::zeros());
        assert_relative_eq!(r.total(), 1.0 + 2.0 - 2.0);
        assert_eq!(r.relative_drift(&r), 0.0);
    }

    #[test]
    fn center_of_mass_is_mass_weighted() {
        let bodies = vec![
            Body::new(0, 3.0, NVec3::zeros(), NVec3::zeros()),
            Body::new(1, 1.0, NVec3::new(4.0, 0.0, 0.0), NVec3::zeros()),
        ];
        assert_eq!(center_of_mass(&bodies), NVec3::new(1.0, 0.0, 0.0));
    }
}
