//! Per-particle state arrays of a body, indexed by the same particle indices as the cell linked list

use nalgebra::SVector;

use crate::Real;

/// Flags marking which particles may be reordered (e.g. sorted along a space filling curve)
///
/// Particles that are referenced by index from a body part must keep their index, otherwise the
/// body part silently refers to different particles.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Sortability {
    sortable: Vec<bool>,
}

impl Sortability {
    /// Marks all of the given number of particles as sortable
    pub fn all_sortable(num_particles: usize) -> Self {
        Self {
            sortable: vec![true; num_particles],
        }
    }

    /// Returns whether the particle may be reordered, particles unknown to this set are not sortable
    pub fn is_sortable(&self, particle: usize) -> bool {
        self.sortable.get(particle).copied().unwrap_or(false)
    }

    /// Marks the given particles as not reorderable
    pub fn mark_unsortable(&mut self, particles: &[usize]) {
        for &i in particles {
            if let Some(flag) = self.sortable.get_mut(i) {
                *flag = false;
            }
        }
    }

    /// Returns the number of particles that may be reordered
    pub fn count_sortable(&self) -> usize {
        self.sortable.iter().filter(|s| **s).count()
    }
}

/// Kinematic state of all particles of a body
#[derive(Clone, Debug)]
pub struct ParticleState<R: Real, const D: usize> {
    /// Current positions
    pub positions: Vec<SVector<R, D>>,
    /// Positions at construction, used as reference configuration by constraints
    pub initial_positions: Vec<SVector<R, D>>,
    /// Current velocities
    pub velocities: Vec<SVector<R, D>>,
    /// Current accelerations
    pub accelerations: Vec<SVector<R, D>>,
    sortability: Sortability,
}

impl<R: Real, const D: usize> ParticleState<R, D> {
    /// Creates particles at rest at the given positions
    pub fn from_positions(positions: Vec<SVector<R, D>>) -> Self {
        let n = positions.len();
        Self {
            initial_positions: positions.clone(),
            positions,
            velocities: vec![SVector::zeros(); n],
            accelerations: vec![SVector::zeros(); n],
            sortability: Sortability::all_sortable(n),
        }
    }

    /// Returns the number of particles
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns whether the body has no particles
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Returns the flags marking which particles may be reordered
    pub fn sortability(&self) -> &Sortability {
        &self.sortability
    }

    pub(crate) fn sortability_mut(&mut self) -> &mut Sortability {
        &mut self.sortability
    }
}

#[test]
fn test_sortability() {
    let mut sortability = Sortability::all_sortable(4);
    sortability.mark_unsortable(&[1, 3, 10]);
    assert!(sortability.is_sortable(0));
    assert!(!sortability.is_sortable(1));
    assert!(!sortability.is_sortable(10));
    assert_eq!(sortability.count_sortable(), 2);
}
