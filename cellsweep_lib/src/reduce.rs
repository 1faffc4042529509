//! Generic reductions of per-particle quantities over a body or a body part
//!
//! The reduced quantity and the way it is combined are decoupled from the traversal: a
//! [`ReduceOperation`] provides the identity element and the combine function, the drivers in
//! this module only decide which particles are visited and in which order.

use std::marker::PhantomData;
use std::ops::Add;

use num_traits::{Bounded, Zero};
use rayon::prelude::*;

use crate::cell_linked_list::CellLinkedList;
use crate::iteration::{SweepDirection, particles_in_colored_order};
use crate::region::BodyPartByParticle;
use crate::{Index, Real, profile};

/// Associative combine function with an identity element
pub trait ReduceOperation<T> {
    /// Returns the identity element, i.e. `combine(identity(), x) == x`
    fn identity(&self) -> T;
    /// Combines two partial results
    fn combine(&self, a: T, b: T) -> T;
}

/// Sum of all values
#[derive(Copy, Clone, Debug, Default)]
pub struct ReduceSum;

impl<T: Zero + Add<Output = T>> ReduceOperation<T> for ReduceSum {
    fn identity(&self) -> T {
        T::zero()
    }

    fn combine(&self, a: T, b: T) -> T {
        a + b
    }
}

/// Maximum of all values, the identity is the smallest representable value
#[derive(Copy, Clone, Debug, Default)]
pub struct ReduceMax;

impl<T: Bounded + PartialOrd> ReduceOperation<T> for ReduceMax {
    fn identity(&self) -> T {
        T::min_value()
    }

    fn combine(&self, a: T, b: T) -> T {
        if b > a { b } else { a }
    }
}

/// Minimum of all values, the identity is the largest representable value
#[derive(Copy, Clone, Debug, Default)]
pub struct ReduceMin;

impl<T: Bounded + PartialOrd> ReduceOperation<T> for ReduceMin {
    fn identity(&self) -> T {
        T::max_value()
    }

    fn combine(&self, a: T, b: T) -> T {
        if b < a { b } else { a }
    }
}

/// Reduction defined by an identity value and a closure
///
/// ```
/// use cellsweep_lib::reduce::{ReduceFn, ReduceOperation};
///
/// let product = ReduceFn::new(1i64, |a, b| a * b);
/// assert_eq!((1..=5).fold(product.identity(), |acc, x| product.combine(acc, x)), 120);
/// ```
pub struct ReduceFn<T, C> {
    identity: T,
    combine: C,
}

impl<T: Clone, C: Fn(T, T) -> T> ReduceFn<T, C> {
    /// Creates a reduction from the identity element and an associative combine function
    pub fn new(identity: T, combine: C) -> Self {
        Self { identity, combine }
    }
}

impl<T: Clone, C: Fn(T, T) -> T> ReduceOperation<T> for ReduceFn<T, C> {
    fn identity(&self) -> T {
        self.identity.clone()
    }

    fn combine(&self, a: T, b: T) -> T {
        (self.combine)(a, b)
    }
}

/// Reduction of a per-particle quantity over the particles of a body
///
/// ```
/// use cellsweep_lib::reduce::{ParticleReduce, ReduceMax};
///
/// let values = [3.0, 7.5, -1.0];
/// let max = ParticleReduce::new(ReduceMax, |i: usize, _dt: f64| values[i]);
/// assert_eq!(max.reduce(values.len(), 0.0), 7.5);
/// assert_eq!(max.par_reduce(values.len(), 0.0), 7.5);
/// ```
pub struct ParticleReduce<T, Op, F> {
    operation: Op,
    reduce_fn: F,
    marker: PhantomData<fn() -> T>,
}

impl<T, Op, F> ParticleReduce<T, Op, F>
where
    T: Send,
    Op: ReduceOperation<T> + Sync,
{
    /// Creates a reduction of the values returned by `reduce_fn` for every particle
    pub fn new<R: Real>(operation: Op, reduce_fn: F) -> Self
    where
        F: Fn(usize, R) -> T,
    {
        Self {
            operation,
            reduce_fn,
            marker: PhantomData,
        }
    }

    /// Returns the combine operation
    pub fn operation(&self) -> &Op {
        &self.operation
    }

    fn fold<R: Real, It: Iterator<Item = usize>>(&self, particles: It, dt: R) -> T
    where
        F: Fn(usize, R) -> T,
    {
        particles.fold(self.operation.identity(), |acc, i| {
            self.operation.combine(acc, (self.reduce_fn)(i, dt))
        })
    }

    /// Reduces over all particles `0..num_particles` in ascending order
    pub fn reduce<R: Real>(&self, num_particles: usize, dt: R) -> T
    where
        F: Fn(usize, R) -> T,
    {
        profile!("ParticleReduce::reduce");
        self.fold(0..num_particles, dt)
    }

    /// Reduces over all particles `0..num_particles` in parallel
    pub fn par_reduce<R: Real>(&self, num_particles: usize, dt: R) -> T
    where
        F: Fn(usize, R) -> T + Sync,
    {
        profile!("ParticleReduce::par_reduce");
        (0..num_particles)
            .into_par_iter()
            .fold(
                || self.operation.identity(),
                |acc, i| self.operation.combine(acc, (self.reduce_fn)(i, dt)),
            )
            .reduce(
                || self.operation.identity(),
                |a, b| self.operation.combine(a, b),
            )
    }

    /// Reduces over all particles of the cell linked list in colored sweep order
    pub fn reduce_colored<I: Index, R: Real, const D: usize>(
        &self,
        cell_linked_list: &CellLinkedList<I, R, D>,
        direction: SweepDirection,
        dt: R,
    ) -> T
    where
        F: Fn(usize, R) -> T,
    {
        profile!("ParticleReduce::reduce_colored");
        self.fold(particles_in_colored_order(cell_linked_list, direction), dt)
    }

    /// Reduces over all particles of the cell linked list, all cells of one color are reduced in parallel
    pub fn par_reduce_colored<I: Index, R: Real, const D: usize>(
        &self,
        cell_linked_list: &CellLinkedList<I, R, D>,
        dt: R,
    ) -> T
    where
        F: Fn(usize, R) -> T + Sync,
    {
        profile!("ParticleReduce::par_reduce_colored");
        let split_cell_lists = cell_linked_list.split_cell_lists();
        split_cell_lists
            .groups()
            .iter()
            .map(|group| {
                group
                    .par_iter()
                    .map(|&cell| {
                        self.fold(
                            cell_linked_list.particles_in_flat_cell(cell).iter().copied(),
                            dt,
                        )
                    })
                    .reduce(
                        || self.operation.identity(),
                        |a, b| self.operation.combine(a, b),
                    )
            })
            .fold(self.operation.identity(), |a, b| self.operation.combine(a, b))
    }

    /// Reduces over the particles of a body part in the order they were tagged
    pub fn reduce_body_part<R: Real>(&self, body_part: &BodyPartByParticle, dt: R) -> T
    where
        F: Fn(usize, R) -> T,
    {
        profile!("ParticleReduce::reduce_body_part");
        self.fold(body_part.particles().iter().copied(), dt)
    }

    /// Reduces over the particles of a body part in parallel
    pub fn par_reduce_body_part<R: Real>(&self, body_part: &BodyPartByParticle, dt: R) -> T
    where
        F: Fn(usize, R) -> T + Sync,
    {
        profile!("ParticleReduce::par_reduce_body_part");
        body_part
            .particles()
            .par_iter()
            .fold(
                || self.operation.identity(),
                |acc, &i| self.operation.combine(acc, (self.reduce_fn)(i, dt)),
            )
            .reduce(
                || self.operation.identity(),
                |a, b| self.operation.combine(a, b),
            )
    }
}
