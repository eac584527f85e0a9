use std::time::Instant;

use crate::error::Result;
use crate::simulation::barnes_hut::CoincidentPolicy;
use crate::simulation::forces::{BarnesHutGravity, DirectGravity, ForceModel};
use crate::simulation::integrator::{refresh_accelerations, Integrator, Leapfrog};
use crate::simulation::states::{Body, NVec3};

const EPS2: f64 = 1e-4;
const THETA: f64 = 0.5;

/// Helper to build a deterministic system of size `n`
pub fn make_bodies(n: usize) -> Vec<Body> {
    (0..n)
        .map(|i| {
            let i_f = i as f64;
            // deterministic positions, no rand needed
            let x = NVec3::new(
                (i_f * 0.37).sin() * 5.0,
                (i_f * 0.13).cos() * 5.0,
                (i_f * 0.07).sin() * 5.0,
            );
            Body::new(i as u64, 1.0, x, NVec3::zeros())
        })
        .collect()
}

/// Time one direct and one Barnes–Hut force evaluation for growing N.
/// Returns `(n, direct seconds, tree seconds)` rows and prints them.
pub fn bench_forces(ns: &[usize]) -> Result<Vec<(usize, f64, f64)>> {
    let mut rows = Vec::with_capacity(ns.len());
    println!("N,direct_s,bh_s");

    for &n in ns {
        let bodies = make_bodies(n);
        let mut out = vec![NVec3::zeros(); n];

        let mut direct = DirectGravity { eps2: EPS2 };
        let mut bh = BarnesHutGravity::new(EPS2, THETA, CoincidentPolicy::Merge);

        // Warm up
        direct.accelerations(&bodies, &mut out)?;
        bh.accelerations(&bodies, &mut out)?;

        let t0 = Instant::now();
        direct.accelerations(&bodies, &mut out)?;
        let dt_direct = t0.elapsed().as_secs_f64();

        let t1 = Instant::now();
        bh.accelerations(&bodies, &mut out)?;
        let dt_bh = t1.elapsed().as_secs_f64();

        println!("{n},{dt_direct:.6},{dt_bh:.6}");
        rows.push((n, dt_direct, dt_bh));
    }
    Ok(rows)
}

/// Average wall time of a full leapfrog step, direct vs tree, for growing N.
/// Large N takes a single step to keep the run short.
pub fn bench_steps(ns: &[usize]) -> Result<Vec<(usize, f64, f64)>> {
    let mut rows = Vec::with_capacity(ns.len());
    println!("N,direct_ms,bh_ms");

    for &n in ns {
        let steps = if n <= 800 { 5 } else { 1 };
        let template = make_bodies(n);

        let ms_direct = time_steps(template.clone(), &mut DirectGravity { eps2: EPS2 }, steps)?;
        let ms_bh = time_steps(
            template,
            &mut BarnesHutGravity::new(EPS2, THETA, CoincidentPolicy::Merge),
            steps,
        )?;

        println!("{n},{ms_direct:.6},{ms_bh:.6}");
        rows.push((n, ms_direct, ms_bh));
    }
    Ok(rows)
}

fn time_steps(mut bodies: Vec<Body>, forces: &mut dyn ForceModel, steps: usize) -> Result<f64> {
    let mut scratch = Vec::new();
    refresh_accelerations(&mut bodies, forces, &mut scratch)?;
    let mut lf = Leapfrog::default();

    let t0 = Instant::now();
    for _ in 0..steps {
        lf.step(&mut bodies, forces, 0.001)?;
    }
    Ok(t0.elapsed().as_secs_f64() * 1000.0 / steps as f64)
}
