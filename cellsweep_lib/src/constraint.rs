//! Motion constraints applied to the particles of a body part (e.g. clamped or driven boundaries)

use nalgebra::SVector;
use rayon::prelude::*;

use crate::context::SimulationContext;
use crate::particles::ParticleState;
use crate::region::BodyPartByParticle;
use crate::utils::UnsafeSlice;
use crate::{Real, ThreadSafe, profile};

/// Kinematic state of one constrained particle
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct ConstrainedParticle<R: Real, const D: usize> {
    /// Index of the particle
    pub index: usize,
    /// Position in the reference configuration
    pub initial_position: SVector<R, D>,
    /// Current position
    pub position: SVector<R, D>,
    /// Current velocity
    pub velocity: SVector<R, D>,
    /// Current acceleration
    pub acceleration: SVector<R, D>,
}

/// Strategy computing the constrained kinematic state of a particle
pub trait MotionConstraint<R: Real, const D: usize>: ThreadSafe {
    /// Returns the constrained position of the particle
    fn displacement(
        &self,
        context: &SimulationContext<R>,
        particle: &ConstrainedParticle<R, D>,
    ) -> SVector<R, D>;

    /// Returns the constrained velocity of the particle
    fn velocity(
        &self,
        context: &SimulationContext<R>,
        particle: &ConstrainedParticle<R, D>,
    ) -> SVector<R, D>;

    /// Returns the constrained acceleration of the particle
    fn acceleration(
        &self,
        context: &SimulationContext<R>,
        particle: &ConstrainedParticle<R, D>,
    ) -> SVector<R, D>;
}

/// Pins particles to their initial positions at rest
#[derive(Copy, Clone, Debug, Default)]
pub struct FixedConstraint;

impl<R: Real, const D: usize> MotionConstraint<R, D> for FixedConstraint {
    fn displacement(
        &self,
        _context: &SimulationContext<R>,
        particle: &ConstrainedParticle<R, D>,
    ) -> SVector<R, D> {
        particle.initial_position
    }

    fn velocity(
        &self,
        _context: &SimulationContext<R>,
        _particle: &ConstrainedParticle<R, D>,
    ) -> SVector<R, D> {
        SVector::zeros()
    }

    fn acceleration(
        &self,
        _context: &SimulationContext<R>,
        _particle: &ConstrainedParticle<R, D>,
    ) -> SVector<R, D> {
        SVector::zeros()
    }
}

/// Prescribes the velocity of particles as a function of time and initial position
///
/// Positions are left to the time integration, the acceleration is set to zero.
pub struct PrescribedVelocity<F> {
    velocity_fn: F,
}

impl<F> PrescribedVelocity<F> {
    /// Creates the constraint from a function `(time, initial_position) -> velocity`
    pub fn new(velocity_fn: F) -> Self {
        Self { velocity_fn }
    }
}

impl<R, const D: usize, F> MotionConstraint<R, D> for PrescribedVelocity<F>
where
    R: Real,
    F: Fn(R, &SVector<R, D>) -> SVector<R, D> + ThreadSafe,
{
    fn displacement(
        &self,
        _context: &SimulationContext<R>,
        particle: &ConstrainedParticle<R, D>,
    ) -> SVector<R, D> {
        particle.position
    }

    fn velocity(
        &self,
        context: &SimulationContext<R>,
        particle: &ConstrainedParticle<R, D>,
    ) -> SVector<R, D> {
        (self.velocity_fn)(context.time(), &particle.initial_position)
    }

    fn acceleration(
        &self,
        _context: &SimulationContext<R>,
        _particle: &ConstrainedParticle<R, D>,
    ) -> SVector<R, D> {
        SVector::zeros()
    }
}

/// Applies a motion constraint to all particles of a body part
#[derive(Clone, Debug)]
pub struct ConstrainRegion<C> {
    constraint: C,
    enable_multi_threading: bool,
}

impl<C> ConstrainRegion<C> {
    /// Creates the driver for the given constraint strategy
    pub fn new(constraint: C, enable_multi_threading: bool) -> Self {
        Self {
            constraint,
            enable_multi_threading,
        }
    }

    /// Returns the constraint strategy
    pub fn constraint(&self) -> &C {
        &self.constraint
    }

    /// Overwrites position, velocity and acceleration of all particles in the body part
    pub fn apply<R: Real, const D: usize>(
        &self,
        body_part: &BodyPartByParticle,
        particles: &mut ParticleState<R, D>,
        context: &SimulationContext<R>,
    ) where
        C: MotionConstraint<R, D>,
    {
        profile!("ConstrainRegion::apply");

        let ParticleState {
            positions,
            initial_positions,
            velocities,
            accelerations,
            ..
        } = particles;

        let constrain = |i: usize,
                         position: &mut SVector<R, D>,
                         velocity: &mut SVector<R, D>,
                         acceleration: &mut SVector<R, D>| {
            let particle = ConstrainedParticle {
                index: i,
                initial_position: initial_positions[i],
                position: *position,
                velocity: *velocity,
                acceleration: *acceleration,
            };
            *position = self.constraint.displacement(context, &particle);
            *velocity = self.constraint.velocity(context, &particle);
            *acceleration = self.constraint.acceleration(context, &particle);
        };

        if self.enable_multi_threading {
            let positions = UnsafeSlice::new(positions.as_mut_slice());
            let velocities = UnsafeSlice::new(velocities.as_mut_slice());
            let accelerations = UnsafeSlice::new(accelerations.as_mut_slice());

            // SAFETY: the particle indices of a body part are unique, every element is accessed by one thread only
            body_part.particles().par_iter().for_each(|&i| unsafe {
                constrain(
                    i,
                    positions.get_mut(i),
                    velocities.get_mut(i),
                    accelerations.get_mut(i),
                )
            });
        } else {
            for &i in body_part.particles() {
                constrain(
                    i,
                    &mut positions[i],
                    &mut velocities[i],
                    &mut accelerations[i],
                );
            }
        }
    }
}
