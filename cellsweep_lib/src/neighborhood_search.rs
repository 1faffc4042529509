//! Neighborhood search on top of a [`CellLinkedList`]
//!
//! This module provides sequential and parallel neighborhood search implementations that return a
//! per-particle list with the indices of all other particles within the search radius. Candidates
//! are taken from the neighbor stencil of a particle's cell, so the search radius may not exceed the
//! cell size of the cell linked list.

use nalgebra::SVector;
use rayon::prelude::*;

use crate::cell_linked_list::{CellLinkedList, CellLinkedListError};
use crate::utils::{ChunkSize, ParallelPolicy};
use crate::workspace::SweepWorkspace;
use crate::{Index, Real, profile};

/// Performs a neighborhood search, returning the indices of all neighboring particles in the given search radius per particle
///
/// The cell linked list has to be rebuilt from the same particle positions before, otherwise an
/// error is returned.
pub fn search<I: Index, R: Real, const D: usize>(
    cell_linked_list: &CellLinkedList<I, R, D>,
    particle_positions: &[SVector<R, D>],
    search_radius: R,
    enable_multi_threading: bool,
) -> Result<Vec<Vec<usize>>, CellLinkedListError<I, R>> {
    let mut particle_neighbor_lists = Vec::new();
    search_inplace(
        cell_linked_list,
        particle_positions,
        search_radius,
        enable_multi_threading,
        &mut particle_neighbor_lists,
    )?;
    Ok(particle_neighbor_lists)
}

/// Performs a neighborhood search inplace, stores the indices of all neighboring particles in the given search radius per particle in the given vector
pub fn search_inplace<I: Index, R: Real, const D: usize>(
    cell_linked_list: &CellLinkedList<I, R, D>,
    particle_positions: &[SVector<R, D>],
    search_radius: R,
    enable_multi_threading: bool,
    particle_neighbor_lists: &mut Vec<Vec<usize>>,
) -> Result<(), CellLinkedListError<I, R>> {
    cell_linked_list.check_search_radius(search_radius)?;
    if particle_positions.len() != cell_linked_list.num_particles() {
        return Err(CellLinkedListError::ParticleCountMismatch {
            positions: particle_positions.len(),
            particles: cell_linked_list.num_particles(),
        });
    }

    if enable_multi_threading {
        neighborhood_search_cell_list_parallel(
            cell_linked_list,
            particle_positions,
            search_radius,
            particle_neighbor_lists,
        );
    } else {
        neighborhood_search_cell_list(
            cell_linked_list,
            particle_positions,
            search_radius,
            particle_neighbor_lists,
        );
    }
    Ok(())
}

/// Performs a naive neighborhood search with `O(N^2)` complexity, only recommended for testing
pub fn neighborhood_search_naive<R: Real, const D: usize>(
    particle_positions: &[SVector<R, D>],
    search_radius: R,
    neighborhood_list: &mut Vec<Vec<usize>>,
) {
    profile!("neighborhood_search_naive");

    init_neighborhood_list(neighborhood_list, particle_positions.len());
    let search_radius_squared = search_radius * search_radius;

    for (idx_i, (pos_i, neighbors_i)) in particle_positions
        .iter()
        .zip(neighborhood_list.iter_mut())
        .enumerate()
    {
        for (idx_j, pos_j) in particle_positions.iter().enumerate() {
            if idx_j != idx_i && (pos_j - pos_i).norm_squared() <= search_radius_squared {
                neighbors_i.push(idx_j);
            }
        }
    }
}

/// Allocates enough storage for the given number of particles and clears all existing neighborhood lists
fn init_neighborhood_list(neighborhood_list: &mut Vec<Vec<usize>>, new_len: usize) {
    let old_len = neighborhood_list.len();
    for particle_list in neighborhood_list.iter_mut().take(old_len.min(new_len)) {
        particle_list.clear();
    }
    neighborhood_list.resize_with(new_len, || Vec::with_capacity(15));
}

/// Collects the neighbors of particle `i` in ascending index order into the given buffer
#[inline(always)]
fn collect_neighbors<I: Index, R: Real, const D: usize>(
    cell_linked_list: &CellLinkedList<I, R, D>,
    particle_positions: &[SVector<R, D>],
    search_radius_squared: R,
    i: usize,
    buffer: &mut Vec<usize>,
) {
    let pos_i = particle_positions[i];
    cell_linked_list.for_each_neighbor_candidate_of_flat_cell(
        cell_linked_list.particle_cell(i),
        |j| {
            if j != i && (particle_positions[j] - pos_i).norm_squared() <= search_radius_squared {
                buffer.push(j);
            }
        },
    );
    buffer.sort_unstable();
}

/// Performs a neighborhood search using the particle lists of the cell linked list (sequential implementation)
pub fn neighborhood_search_cell_list<I: Index, R: Real, const D: usize>(
    cell_linked_list: &CellLinkedList<I, R, D>,
    particle_positions: &[SVector<R, D>],
    search_radius: R,
    neighborhood_list: &mut Vec<Vec<usize>>,
) {
    profile!("neighborhood_search_cell_list");

    init_neighborhood_list(neighborhood_list, particle_positions.len());
    let search_radius_squared = search_radius * search_radius;

    for (i, neighbors_i) in neighborhood_list.iter_mut().enumerate() {
        collect_neighbors(
            cell_linked_list,
            particle_positions,
            search_radius_squared,
            i,
            neighbors_i,
        );
    }
}

/// Performs a neighborhood search using the particle lists of the cell linked list (multithreaded implementation)
///
/// Neighbors are first collected in thread local buffers and then copied into the exactly sized
/// neighborhood list of each particle.
pub fn neighborhood_search_cell_list_parallel<I: Index, R: Real, const D: usize>(
    cell_linked_list: &CellLinkedList<I, R, D>,
    particle_positions: &[SVector<R, D>],
    search_radius: R,
    neighborhood_list: &mut Vec<Vec<usize>>,
) {
    profile!("neighborhood_search_cell_list_parallel");

    neighborhood_list.resize_with(particle_positions.len(), Vec::new);
    let search_radius_squared = search_radius * search_radius;
    let workspace = SweepWorkspace::<R>::default();

    let chunk_size = ChunkSize::new(&ParallelPolicy::default(), particle_positions.len())
        .with_log("particles", "neighborhood search");

    neighborhood_list
        .par_iter_mut()
        .enumerate()
        .with_min_len(chunk_size.chunk_size)
        .for_each(|(i, neighbors_i)| {
            let mut local = workspace.get_local().borrow_mut();
            local.clear();
            collect_neighbors(
                cell_linked_list,
                particle_positions,
                search_radius_squared,
                i,
                &mut local.neighbors,
            );
            neighbors_i.clear();
            neighbors_i.extend_from_slice(&local.neighbors);
        });
}

/// Stats of a neighborhood list
#[derive(Clone, Debug)]
pub struct NeighborhoodStats {
    /// Histogram of neighborhood sizes (index: number of neighbors, value: number of particles with that number of neighbors)
    pub histogram: Vec<usize>,
    /// Number of particles that have neighbors
    pub particles_with_neighbors: usize,
    /// The size of the largest neighborhood
    pub max_neighbors: usize,
    /// Average number of neighbors per particle (excluding particles without neighbors)
    pub avg_neighbors: f64,
}

/// Computes stats (avg. neighbors, histogram) of the given neighborhood list
pub fn compute_neighborhood_stats(neighborhood_list: &[Vec<usize>]) -> NeighborhoodStats {
    let mut max_neighbors = 0;
    let mut total_neighbors = 0;
    let mut particles_with_neighbors = 0;
    let mut histogram: Vec<usize> = vec![0; 1];

    for neighborhood in neighborhood_list {
        let n = neighborhood.len();
        if histogram.len() < n + 1 {
            histogram.resize(n + 1, 0);
        }
        histogram[n] += 1;

        if n > 0 {
            max_neighbors = max_neighbors.max(n);
            total_neighbors += n;
            particles_with_neighbors += 1;
        }
    }

    let avg_neighbors = if particles_with_neighbors > 0 {
        total_neighbors as f64 / particles_with_neighbors as f64
    } else {
        0.0
    };

    NeighborhoodStats {
        histogram,
        particles_with_neighbors,
        max_neighbors,
        avg_neighbors,
    }
}
