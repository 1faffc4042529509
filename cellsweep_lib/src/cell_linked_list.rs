//! Cell linked list: the per-cell particle index lists of a body on its uniform background grid

use itertools::{Itertools, MinMaxResult};
use log::{debug, info};
use nalgebra::SVector;
use rayon::prelude::*;
use thiserror::Error as ThisError;

use crate::split_cell_lists::SplitCellLists;
use crate::uniform_grid::{CellIndex, GridConstructionError, UniformGrid};
use crate::utils::{ChunkSize, ParallelPolicy};
use crate::{AxisAlignedBoundingBox, Index, Real, profile};

/// Error type for the construction of a [`CellLinkedList`]
#[rustfmt::skip]
#[derive(Clone, Eq, PartialEq, Debug, ThisError)]
pub enum CellLinkedListError<I: Index, R: Real> {
    /// The background grid could not be constructed
    #[error("failed to construct background grid: {0}")]
    GridConstruction(#[from] GridConstructionError<I, R>),
    /// The grid has fewer than three cells along an axis, such grids cannot be colored for race-free parallel sweeps
    #[error("grid has only {cells} cell(s) along axis {axis}, at least 3 cells per axis are required for cell coloring")]
    GridTooSmallForColoring {
        axis: usize,
        cells: I,
    },
    /// A neighborhood query used a radius that is larger than the cell size of the grid
    #[error("search radius {radius} exceeds the cell size {cell_size} of the cell linked list")]
    SearchRadiusExceedsCellSize {
        radius: R,
        cell_size: R,
    },
    /// A query was made with a different number of particles than the cell linked list was built from
    #[error("got {positions} particle positions but the cell linked list was built from {particles} particles")]
    ParticleCountMismatch {
        positions: usize,
        particles: usize,
    },
}

/// A cell together with the indices of all particles located in it
#[derive(Copy, Clone, Debug)]
pub struct CellRecord<'a> {
    /// Flat index of the cell in the grid
    pub flat_index: usize,
    /// Indices of the particles in the cell, in the order they were inserted during the last rebuild
    pub particles: &'a [usize],
}

/// Spatial index mapping every particle of a body to the grid cell containing it
///
/// The cell size is the cutoff radius of the pairwise interactions, so all interaction partners of
/// a particle are located in the neighbor stencil of its cell. The lists are rebuilt wholesale from
/// the current particle positions, typically once per time step.
#[derive(Clone, Debug)]
pub struct CellLinkedList<I: Index, R: Real, const D: usize> {
    grid: UniformGrid<I, R, D>,
    /// Particle indices of every cell, indexed by flat cell index
    cell_particles: Vec<Vec<usize>>,
    /// Flat cell index of every particle at the time of the last rebuild
    particle_cells: Vec<usize>,
    split_cell_lists: SplitCellLists,
}

/// Cell linked list in 2D
pub type CellLinkedList2d<I, R> = CellLinkedList<I, R, 2>;
/// Cell linked list in 3D
pub type CellLinkedList3d<I, R> = CellLinkedList<I, R, 3>;

impl<I: Index, R: Real, const D: usize> CellLinkedList<I, R, D> {
    /// Allocates an empty cell linked list covering the given domain with cells of the size of the cutoff radius
    ///
    /// Fails if the grid cannot be constructed or if it has fewer than three cells along any axis.
    pub fn new(
        domain: &AxisAlignedBoundingBox<R, D>,
        cutoff_radius: R,
    ) -> Result<Self, CellLinkedListError<I, R>> {
        let grid = UniformGrid::from_aabb(domain, cutoff_radius)?;
        Self::from_grid(grid)
    }

    /// Allocates an empty cell linked list on the given grid
    pub fn from_grid(grid: UniformGrid<I, R, D>) -> Result<Self, CellLinkedListError<I, R>> {
        let split_cell_lists = SplitCellLists::new(&grid)?;

        info!(
            "Allocated cell linked list with {:?} cells (total: {}, cell size: {})",
            grid.cells_per_dim(),
            grid.num_cells(),
            grid.cell_size()
        );

        Ok(Self {
            cell_particles: vec![Vec::new(); grid.num_cells()],
            particle_cells: Vec::new(),
            grid,
            split_cell_lists,
        })
    }

    /// Returns the background grid
    pub fn grid(&self) -> &UniformGrid<I, R, D> {
        &self.grid
    }

    /// Returns the cutoff radius (equal to the cell size)
    pub fn cutoff_radius(&self) -> R {
        self.grid.cell_size()
    }

    /// Returns the number of particles that were distributed during the last rebuild
    pub fn num_particles(&self) -> usize {
        self.particle_cells.len()
    }

    /// Returns the color groups of the cells
    pub fn split_cell_lists(&self) -> &SplitCellLists {
        &self.split_cell_lists
    }

    /// Returns the indices of the particles in the cell with the given flat index
    #[inline(always)]
    pub fn particles_in_flat_cell(&self, flat_index: usize) -> &[usize] {
        &self.cell_particles[flat_index]
    }

    /// Returns the indices of the particles in the given cell
    #[inline(always)]
    pub fn particles_in_cell(&self, cell: &CellIndex<I, D>) -> &[usize] {
        self.particles_in_flat_cell(self.grid.flatten_cell_index(cell))
    }

    /// Returns the record of the cell with the given flat index
    #[inline(always)]
    pub fn cell_record(&self, flat_index: usize) -> CellRecord<'_> {
        CellRecord {
            flat_index,
            particles: &self.cell_particles[flat_index],
        }
    }

    /// Returns the flat index of the cell the particle was assigned to during the last rebuild
    #[inline(always)]
    pub fn particle_cell(&self, particle: usize) -> usize {
        self.particle_cells[particle]
    }

    /// Returns an iterator over the particle lists of all cells in ascending flat cell order
    pub fn cells(&self) -> impl Iterator<Item = CellRecord<'_>> + '_ {
        (0..self.cell_particles.len()).map(move |flat| self.cell_record(flat))
    }

    /// Clears all cells and distributes the particles according to their positions
    pub fn rebuild(&mut self, particle_positions: &[SVector<R, D>]) {
        profile!("CellLinkedList::rebuild");

        self.particle_cells.clear();
        self.particle_cells.extend(
            particle_positions
                .iter()
                .map(|p| self.grid.flatten_cell_index(&self.grid.enclosing_cell(p))),
        );

        self.scatter_particles();
    }

    /// Clears all cells and distributes the particles according to their positions, parallel version
    ///
    /// The enclosing cells are computed in parallel, the particle indices are then inserted in ascending
    /// order so that the result is identical to [`rebuild`](Self::rebuild).
    pub fn par_rebuild(&mut self, particle_positions: &[SVector<R, D>]) {
        profile!("CellLinkedList::par_rebuild");

        let chunk_size = ChunkSize::new(&ParallelPolicy::default(), particle_positions.len())
            .with_log("particles", "cell index computation");

        let grid = &self.grid;
        particle_positions
            .par_iter()
            .with_min_len(chunk_size.chunk_size)
            .map(|p| grid.flatten_cell_index(&grid.enclosing_cell(p)))
            .collect_into_vec(&mut self.particle_cells);

        self.scatter_particles();
    }

    fn scatter_particles(&mut self) {
        for cell in self.cell_particles.iter_mut() {
            cell.clear();
        }

        for (particle, &flat_cell) in self.particle_cells.iter().enumerate() {
            self.cell_particles[flat_cell].push(particle);
        }

        self.split_cell_lists.recompute(&self.grid);
        self.log_occupancy();
    }

    fn log_occupancy(&self) {
        if !log::log_enabled!(log::Level::Debug) {
            return;
        }

        let occupied = self.cell_particles.iter().filter(|c| !c.is_empty()).count();
        let (min, max) = match self.cell_particles.iter().map(Vec::len).minmax() {
            MinMaxResult::NoElements => (0, 0),
            MinMaxResult::OneElement(n) => (n, n),
            MinMaxResult::MinMax(min, max) => (min, max),
        };

        debug!(
            "Distributed {} particles into {} of {} cells (particles per cell: min {}, max {})",
            self.particle_cells.len(),
            occupied,
            self.cell_particles.len(),
            min,
            max
        );
    }

    /// Calls the closure with every particle of the neighbor stencil of the cell enclosing the given position
    ///
    /// These are the candidates for all particles within the cutoff radius of the position. The stencil
    /// is visited in ascending flat cell order.
    pub fn for_each_neighbor_candidate<F: FnMut(usize)>(&self, position: &SVector<R, D>, f: F) {
        let cell = self.grid.enclosing_cell(position);
        self.for_each_candidate_of_cell(&cell, f);
    }

    /// Calls the closure with every particle of the neighbor stencil of the cell with the given flat index
    pub fn for_each_neighbor_candidate_of_flat_cell<F: FnMut(usize)>(
        &self,
        flat_index: usize,
        f: F,
    ) {
        if let Some(cell) = self.grid.try_unflatten_cell_index(flat_index) {
            self.for_each_candidate_of_cell(&cell, f);
        }
    }

    fn for_each_candidate_of_cell<F: FnMut(usize)>(&self, cell: &CellIndex<I, D>, mut f: F) {
        for stencil_cell in self.grid.neighbor_stencil(cell) {
            for &particle in self.particles_in_cell(&stencil_cell) {
                f(particle);
            }
        }
    }

    /// Checks that a neighborhood query with the given radius can be answered using the neighbor stencil
    pub fn check_search_radius(&self, radius: R) -> Result<(), CellLinkedListError<I, R>> {
        if radius > self.cutoff_radius() {
            Err(CellLinkedListError::SearchRadiusExceedsCellSize {
                radius,
                cell_size: self.cutoff_radius(),
            })
        } else {
            Ok(())
        }
    }
}
