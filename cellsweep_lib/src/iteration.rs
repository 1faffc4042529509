//! Iteration drivers dispatching per-particle and per-cell operations over a body
//!
//! All drivers take an operation returning a `Result`. The first failing unit aborts the remaining
//! units of the sweep and its error is returned unchanged.
//!
//! | Driver                                | Unit     | Order                                  | Concurrency        |
//! |---------------------------------------|----------|----------------------------------------|--------------------|
//! | [`for_each_particle`]                 | particle | `0..N`                                 | sequential         |
//! | [`par_for_each_particle`]             | particle | arbitrary                              | thread pool        |
//! | [`for_each_particle_colored`]         | particle | by color, cell and particle order      | sequential         |
//! | [`par_for_each_particle_colored`]     | particle | by color, any order within a color     | parallel per color |
//! | [`for_each_cell_colored`]             | cell     | by color and cell order                | sequential         |
//! | [`par_for_each_cell_colored`]         | cell     | by color, any order within a color     | parallel per color |
//! | [`for_each_particle_split_sweeping`]  | particle | forward with `dt/2`, backward with `dt/2` | sequential      |
//! | [`par_for_each_particle_split_sweeping`] | particle | forward with `dt/2`, backward with `dt/2` | parallel per color |
//! | [`for_each_cell_split_sweeping`]      | cell     | forward with `dt`, backward with `dt`  | sequential         |
//! | [`par_for_each_cell_split_sweeping`]  | cell     | forward with `dt`, backward with `dt`  | parallel per color |
//!
//! Plain particle sweeps are only safe for operations that write nothing but the state of the
//! particle they are called for. Operations that write to neighbor particles have to use one of
//! the colored drivers: the parallel variants process one color at a time and wait for all cells of
//! a color to complete before the next color starts. No two cells processed at the same time share
//! a neighbor stencil.

use itertools::Either;
use rayon::prelude::*;

use crate::cell_linked_list::{CellLinkedList, CellRecord};
use crate::utils::{ChunkSize, ParallelPolicy};
use crate::{Index, Real, profile};

/// Direction of a colored sweep
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SweepDirection {
    /// Colors in ascending order, cells and particles in ascending order within a color
    Forward,
    /// Colors in descending order, cells and particles in descending order within a color
    Backward,
}

impl SweepDirection {
    /// Returns the opposite direction
    pub fn reversed(self) -> Self {
        match self {
            SweepDirection::Forward => SweepDirection::Backward,
            SweepDirection::Backward => SweepDirection::Forward,
        }
    }
}

/// Traversal schemes for per-particle operations, selectable at runtime
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Traversal {
    /// Ascending particle index, sequential
    Plain,
    /// Arbitrary partition of the particle range, parallel
    Parallel,
    /// Forward colored sweep, sequential
    Split,
    /// Forward colored sweep, parallel within every color
    ParallelSplit,
    /// Forward then backward colored sweep with half the time step each, sequential
    SplitSweeping,
    /// Forward then backward colored sweep with half the time step each, parallel within every color
    ParallelSplitSweeping,
}

impl Traversal {
    /// Returns whether operations writing to neighbor particles can be run with this traversal without races
    pub fn is_race_free_for_pairwise_writes(&self) -> bool {
        !matches!(self, Traversal::Parallel)
    }

    /// Runs the per-particle operation with this traversal
    pub fn for_each_particle<I, R, const D: usize, E, F>(
        &self,
        cell_linked_list: &CellLinkedList<I, R, D>,
        dt: R,
        f: F,
    ) -> Result<(), E>
    where
        I: Index,
        R: Real,
        E: Send,
        F: Fn(usize, R) -> Result<(), E> + Sync,
    {
        let n = cell_linked_list.num_particles();
        match self {
            Traversal::Plain => for_each_particle(n, dt, f),
            Traversal::Parallel => par_for_each_particle(n, dt, f),
            Traversal::Split => {
                for_each_particle_colored(cell_linked_list, SweepDirection::Forward, dt, f)
            }
            Traversal::ParallelSplit => {
                par_for_each_particle_colored(cell_linked_list, SweepDirection::Forward, dt, f)
            }
            Traversal::SplitSweeping => for_each_particle_split_sweeping(cell_linked_list, dt, f),
            Traversal::ParallelSplitSweeping => {
                par_for_each_particle_split_sweeping(cell_linked_list, dt, f)
            }
        }
    }
}

/// Calls the operation for all particles `0..num_particles` in ascending order
pub fn for_each_particle<R, E, F>(num_particles: usize, dt: R, mut f: F) -> Result<(), E>
where
    R: Real,
    F: FnMut(usize, R) -> Result<(), E>,
{
    profile!("for_each_particle");
    (0..num_particles).try_for_each(|i| f(i, dt))
}

/// Calls the operation for all particles `0..num_particles` in parallel, in no particular order
pub fn par_for_each_particle<R, E, F>(num_particles: usize, dt: R, f: F) -> Result<(), E>
where
    R: Real,
    E: Send,
    F: Fn(usize, R) -> Result<(), E> + Sync,
{
    profile!("par_for_each_particle");
    let chunk_size = ChunkSize::new(&ParallelPolicy::default(), num_particles);
    (0..num_particles)
        .into_par_iter()
        .with_min_len(chunk_size.chunk_size)
        .try_for_each(|i| f(i, dt))
}

/// Returns the flat cell indices of one color in the order given by the sweep direction
fn ordered_cells(group: &[usize], direction: SweepDirection) -> impl Iterator<Item = &usize> {
    match direction {
        SweepDirection::Forward => Either::Left(group.iter()),
        SweepDirection::Backward => Either::Right(group.iter().rev()),
    }
}

/// Returns the colors in the order given by the sweep direction
fn ordered_colors(num_colors: usize, direction: SweepDirection) -> Vec<usize> {
    match direction {
        SweepDirection::Forward => (0..num_colors).collect(),
        SweepDirection::Backward => (0..num_colors).rev().collect(),
    }
}

/// Returns all particles in the order visited by a sequential colored sweep in the given direction
pub(crate) fn particles_in_colored_order<I: Index, R: Real, const D: usize>(
    cell_linked_list: &CellLinkedList<I, R, D>,
    direction: SweepDirection,
) -> impl Iterator<Item = usize> + '_ {
    let split_cell_lists = cell_linked_list.split_cell_lists();
    ordered_colors(split_cell_lists.num_colors(), direction)
        .into_iter()
        .flat_map(move |color| ordered_cells(split_cell_lists.group(color), direction))
        .flat_map(move |&cell| {
            let particles = cell_linked_list.particles_in_flat_cell(cell);
            match direction {
                SweepDirection::Forward => Either::Left(particles.iter()),
                SweepDirection::Backward => Either::Right(particles.iter().rev()),
            }
        })
        .copied()
}

/// Calls the operation for all particles of one cell in the order given by the sweep direction
#[inline(always)]
fn particles_of_cell<R, E, F>(
    particles: &[usize],
    direction: SweepDirection,
    dt: R,
    f: &mut F,
) -> Result<(), E>
where
    R: Real,
    F: FnMut(usize, R) -> Result<(), E>,
{
    match direction {
        SweepDirection::Forward => particles.iter().try_for_each(|&i| f(i, dt)),
        SweepDirection::Backward => particles.iter().rev().try_for_each(|&i| f(i, dt)),
    }
}

/// Calls the operation for all particles, color by color and cell by cell
pub fn for_each_particle_colored<I, R, const D: usize, E, F>(
    cell_linked_list: &CellLinkedList<I, R, D>,
    direction: SweepDirection,
    dt: R,
    mut f: F,
) -> Result<(), E>
where
    I: Index,
    R: Real,
    F: FnMut(usize, R) -> Result<(), E>,
{
    profile!("for_each_particle_colored");
    let split_cell_lists = cell_linked_list.split_cell_lists();
    for color in ordered_colors(split_cell_lists.num_colors(), direction) {
        for &cell in ordered_cells(split_cell_lists.group(color), direction) {
            particles_of_cell(
                cell_linked_list.particles_in_flat_cell(cell),
                direction,
                dt,
                &mut f,
            )?;
        }
    }
    Ok(())
}

/// Calls the operation for all particles, color by color with all cells of one color processed in parallel
///
/// Returns after the first color containing a failing particle has completed.
pub fn par_for_each_particle_colored<I, R, const D: usize, E, F>(
    cell_linked_list: &CellLinkedList<I, R, D>,
    direction: SweepDirection,
    dt: R,
    f: F,
) -> Result<(), E>
where
    I: Index,
    R: Real,
    E: Send,
    F: Fn(usize, R) -> Result<(), E> + Sync,
{
    profile!(sweep_scope, "par_for_each_particle_colored");
    let split_cell_lists = cell_linked_list.split_cell_lists();
    for color in ordered_colors(split_cell_lists.num_colors(), direction) {
        // `try_for_each` returns only once all cells of this color are done, this is the barrier between colors
        split_cell_lists
            .group(color)
            .par_iter()
            .try_for_each(|&cell| {
                profile!("color_cell", parent = sweep_scope);
                let mut f = &f;
                particles_of_cell(
                    cell_linked_list.particles_in_flat_cell(cell),
                    direction,
                    dt,
                    &mut f,
                )
            })?;
    }
    Ok(())
}

/// Calls the operation for all cells, color by color
pub fn for_each_cell_colored<I, R, const D: usize, E, F>(
    cell_linked_list: &CellLinkedList<I, R, D>,
    direction: SweepDirection,
    dt: R,
    mut f: F,
) -> Result<(), E>
where
    I: Index,
    R: Real,
    F: FnMut(CellRecord<'_>, R) -> Result<(), E>,
{
    profile!("for_each_cell_colored");
    let split_cell_lists = cell_linked_list.split_cell_lists();
    for color in ordered_colors(split_cell_lists.num_colors(), direction) {
        for &cell in ordered_cells(split_cell_lists.group(color), direction) {
            f(cell_linked_list.cell_record(cell), dt)?;
        }
    }
    Ok(())
}

/// Calls the operation for all cells, color by color with all cells of one color processed in parallel
pub fn par_for_each_cell_colored<I, R, const D: usize, E, F>(
    cell_linked_list: &CellLinkedList<I, R, D>,
    direction: SweepDirection,
    dt: R,
    f: F,
) -> Result<(), E>
where
    I: Index,
    R: Real,
    E: Send,
    F: Fn(CellRecord<'_>, R) -> Result<(), E> + Sync,
{
    profile!("par_for_each_cell_colored");
    let split_cell_lists = cell_linked_list.split_cell_lists();
    for color in ordered_colors(split_cell_lists.num_colors(), direction) {
        split_cell_lists
            .group(color)
            .par_iter()
            .try_for_each(|&cell| f(cell_linked_list.cell_record(cell), dt))?;
    }
    Ok(())
}

/// Forward colored particle sweep with `dt/2` followed by a backward colored particle sweep with `dt/2`
pub fn for_each_particle_split_sweeping<I, R, const D: usize, E, F>(
    cell_linked_list: &CellLinkedList<I, R, D>,
    dt: R,
    mut f: F,
) -> Result<(), E>
where
    I: Index,
    R: Real,
    F: FnMut(usize, R) -> Result<(), E>,
{
    let half_dt = dt.half();
    for_each_particle_colored(cell_linked_list, SweepDirection::Forward, half_dt, &mut f)?;
    for_each_particle_colored(cell_linked_list, SweepDirection::Backward, half_dt, &mut f)
}

/// Parallel version of [`for_each_particle_split_sweeping`]
pub fn par_for_each_particle_split_sweeping<I, R, const D: usize, E, F>(
    cell_linked_list: &CellLinkedList<I, R, D>,
    dt: R,
    f: F,
) -> Result<(), E>
where
    I: Index,
    R: Real,
    E: Send,
    F: Fn(usize, R) -> Result<(), E> + Sync,
{
    let half_dt = dt.half();
    par_for_each_particle_colored(cell_linked_list, SweepDirection::Forward, half_dt, &f)?;
    par_for_each_particle_colored(cell_linked_list, SweepDirection::Backward, half_dt, &f)
}

/// Forward colored cell sweep followed by a backward colored cell sweep, both with the full `dt`
pub fn for_each_cell_split_sweeping<I, R, const D: usize, E, F>(
    cell_linked_list: &CellLinkedList<I, R, D>,
    dt: R,
    mut f: F,
) -> Result<(), E>
where
    I: Index,
    R: Real,
    F: FnMut(CellRecord<'_>, R) -> Result<(), E>,
{
    for_each_cell_colored(cell_linked_list, SweepDirection::Forward, dt, &mut f)?;
    for_each_cell_colored(cell_linked_list, SweepDirection::Backward, dt, &mut f)
}

/// Parallel version of [`for_each_cell_split_sweeping`]
pub fn par_for_each_cell_split_sweeping<I, R, const D: usize, E, F>(
    cell_linked_list: &CellLinkedList<I, R, D>,
    dt: R,
    f: F,
) -> Result<(), E>
where
    I: Index,
    R: Real,
    E: Send,
    F: Fn(CellRecord<'_>, R) -> Result<(), E> + Sync,
{
    par_for_each_cell_colored(cell_linked_list, SweepDirection::Forward, dt, &f)?;
    par_for_each_cell_colored(cell_linked_list, SweepDirection::Backward, dt, &f)
}
