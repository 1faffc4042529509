mod test_cell_linked_list;
mod test_coloring;
mod test_damping;
mod test_neighborhood_search;
mod test_reduce;
mod test_region;
mod test_sweeps;

use cellsweep_lib::{Aabb2d, Aabb3d};
use nalgebra::{Vector2, Vector3};

/// Particles on the centers of an `n x n` lattice with the given spacing, starting at the origin
pub fn lattice_2d(n: usize, spacing: f64) -> Vec<Vector2<f64>> {
    (0..n * n)
        .map(|i| Vector2::new((i % n) as f64 + 0.5, (i / n) as f64 + 0.5) * spacing)
        .collect()
}

/// Uniformly distributed particles in the unit cube
pub fn random_particles_3d(n: usize) -> Vec<Vector3<f64>> {
    (0..n).map(|_| Vector3::new_random()).collect()
}

pub fn unit_square() -> Aabb2d<f64> {
    Aabb2d::new(Vector2::zeros(), Vector2::repeat(1.0))
}

pub fn unit_cube() -> Aabb3d<f64> {
    Aabb3d::new(Vector3::zeros(), Vector3::repeat(1.0))
}
