//! Pairwise velocity damping by operator splitting
//!
//! For every particle `i` and every neighbor `j` within the cutoff radius the velocity difference of
//! the pair is relaxed implicitly:
//! ```text
//! w   = 1 - r_ij / h
//! k   = eta * dt * w / (1 + 2 * eta * dt * w)
//! v_i = v_i + k * (v_j - v_i)
//! v_j = v_j - k * (v_j - v_i)
//! ```
//! The update writes to neighbor particles, so it has to run with a traversal that never processes
//! two particles sharing a neighbor stencil at the same time. The total momentum of each pair is
//! preserved and a uniform velocity field is left unchanged.

use nalgebra::SVector;
use thiserror::Error as ThisError;

use crate::cell_linked_list::CellLinkedList;
use crate::iteration::Traversal;
use crate::utils::UnsafeSlice;
use crate::workspace::SweepWorkspace;
use crate::{Index, Real, profile};

/// Error type returned by the damping operator
#[derive(Clone, Eq, PartialEq, Debug, ThisError)]
pub enum DampingError {
    /// The traversal processes particles with shared neighbors concurrently
    #[error("traversal {0:?} is not race free for operators writing to neighbor particles")]
    TraversalNotRaceFree(Traversal),
    /// The number of velocities does not match the number of particles
    #[error("got {velocities} velocities for {particles} particles")]
    ParticleCountMismatch {
        /// Number of particles in the cell linked list
        particles: usize,
        /// Number of velocities
        velocities: usize,
    },
    /// A particle has a velocity with NaN or infinite components
    #[error("velocity of particle {particle} is not finite")]
    NonFiniteVelocity {
        /// Index of the offending particle
        particle: usize,
    },
}

/// Pairwise damping operator with a viscosity-like coefficient `eta`
#[derive(Copy, Clone, Debug)]
pub struct PairwiseDamping<R: Real> {
    eta: R,
}

impl<R: Real> PairwiseDamping<R> {
    /// Creates the operator with the given damping coefficient
    pub fn new(eta: R) -> Self {
        Self { eta }
    }

    /// Returns the damping coefficient
    pub fn eta(&self) -> R {
        self.eta
    }

    /// Damps the velocities of all particles using the given traversal
    ///
    /// The cell linked list has to be rebuilt from `positions` before. With a splitting traversal the
    /// time step handed to every particle is the one chosen by the traversal (e.g. `dt/2` per sweep
    /// direction).
    pub fn apply<I: Index, const D: usize>(
        &self,
        cell_linked_list: &CellLinkedList<I, R, D>,
        positions: &[SVector<R, D>],
        velocities: &mut [SVector<R, D>],
        dt: R,
        traversal: Traversal,
        workspace: &SweepWorkspace<R>,
    ) -> Result<(), DampingError> {
        profile!("PairwiseDamping::apply");

        if !traversal.is_race_free_for_pairwise_writes() {
            return Err(DampingError::TraversalNotRaceFree(traversal));
        }
        if velocities.len() != cell_linked_list.num_particles()
            || positions.len() != cell_linked_list.num_particles()
        {
            return Err(DampingError::ParticleCountMismatch {
                particles: cell_linked_list.num_particles(),
                velocities: velocities.len(),
            });
        }

        let h = cell_linked_list.cutoff_radius();
        let h_squared = h * h;
        let velocities = UnsafeSlice::new(velocities);

        traversal.for_each_particle(cell_linked_list, dt, |i, dt| {
            let mut local = workspace.get_local().borrow_mut();
            local.clear();

            let pos_i = positions[i];
            let mut neighbors = std::mem::take(&mut local.neighbors);
            let mut weights = std::mem::take(&mut local.weights);
            cell_linked_list.for_each_neighbor_candidate_of_flat_cell(
                cell_linked_list.particle_cell(i),
                |j| {
                    let r_squared = (positions[j] - pos_i).norm_squared();
                    if j != i && r_squared < h_squared {
                        neighbors.push(j);
                        weights.push(R::one() - r_squared.sqrt() / h);
                    }
                },
            );

            // SAFETY: the traversal is race free, no other thread accesses particles of this stencil
            let result = unsafe { self.damp_particle(i, &neighbors, &weights, dt, &velocities) };

            local.neighbors = neighbors;
            local.weights = weights;
            result
        })
    }

    /// Relaxes the velocity of particle `i` against all given neighbors
    ///
    /// # Safety
    /// No other thread may access the velocities of `i` and its neighbors during the call.
    unsafe fn damp_particle<const D: usize>(
        &self,
        i: usize,
        neighbors: &[usize],
        weights: &[R],
        dt: R,
        velocities: &UnsafeSlice<'_, SVector<R, D>>,
    ) -> Result<(), DampingError> {
        let two = R::one() + R::one();
        let mut v_i = unsafe { velocities.read(i) };
        if !is_finite(&v_i) {
            return Err(DampingError::NonFiniteVelocity { particle: i });
        }

        for (&j, &w) in neighbors.iter().zip(weights) {
            let v_j = unsafe { velocities.read(j) };
            if !is_finite(&v_j) {
                return Err(DampingError::NonFiniteVelocity { particle: j });
            }
            let eta_dt_w = self.eta * dt * w;
            let k = eta_dt_w / (R::one() + two * eta_dt_w);
            let dv = (v_j - v_i) * k;
            v_i += dv;
            unsafe { velocities.write(j, v_j - dv) };
        }

        unsafe { velocities.write(i, v_i) };
        Ok(())
    }
}

fn is_finite<R: Real, const D: usize>(v: &SVector<R, D>) -> bool {
    v.iter().all(|x| x.is_finite())
}
