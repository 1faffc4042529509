//! Simulation time passed explicitly through the step functions

use crate::Real;

/// Physical time and step count of a running simulation
///
/// ```
/// use cellsweep_lib::SimulationContext;
///
/// let mut context = SimulationContext::<f64>::new();
/// context.advance(0.25);
/// context.advance(0.5);
/// assert_eq!(context.time(), 0.75);
/// assert_eq!(context.step(), 2);
/// ```
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct SimulationContext<R: Real> {
    time: R,
    step: usize,
}

impl<R: Real> SimulationContext<R> {
    /// Creates a context at time zero
    pub fn new() -> Self {
        Self::starting_at(R::zero())
    }

    /// Creates a context at the given time, e.g. when a simulation is resumed
    pub fn starting_at(time: R) -> Self {
        Self { time, step: 0 }
    }

    /// Returns the current physical time
    pub fn time(&self) -> R {
        self.time
    }

    /// Returns the number of completed steps
    pub fn step(&self) -> usize {
        self.step
    }

    /// Completes a step of the given size
    pub fn advance(&mut self, dt: R) {
        self.time += dt;
        self.step += 1;
    }
}
