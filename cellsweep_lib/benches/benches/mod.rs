pub mod bench_sweeps;

use nalgebra::Vector3;

/// Particles on a jittered cubic lattice filling the unit cube
pub fn particle_block(particles_per_dim: usize) -> Vec<Vector3<f64>> {
    let spacing = 1.0 / particles_per_dim as f64;
    let n = particles_per_dim;
    (0..n * n * n)
        .map(|i| {
            let ijk = Vector3::new((i / (n * n)) as f64, ((i / n) % n) as f64, (i % n) as f64);
            let jitter = (Vector3::<f64>::new_random() - Vector3::repeat(0.5)) * 0.2;
            (ijk + Vector3::repeat(0.5) + jitter) * spacing
        })
        .collect()
}
