//! Tagging of cells and particles that belong to a region given by a [`Shape`]
//!
//! All tagging functions compute a snapshot from the current particle positions and the shape. They
//! have to be called again if the particles move or the shape changes. Tagged indices are always
//! returned in ascending order, so retagging an unchanged configuration reproduces the same result.

use log::info;
use nalgebra::SVector;
use rayon::prelude::*;

use crate::cell_linked_list::CellLinkedList;
use crate::particles::Sortability;
use crate::shape::Shape;
use crate::{Index, Real, profile};

/// Name of the body part containing the particles close to the body surface
pub const SURFACE: &str = "Surface";
/// Name of the body part containing the particles of the layers below the body surface
pub const INNER_LAYERS: &str = "InnerLayers";
/// Name of the body part containing the cells close to the body surface
pub const NEAR_BODY_SURFACE: &str = "NearBodySurface";

/// Named set of grid cells, stored by flat cell index
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BodyPartByCell {
    name: String,
    cells: Vec<usize>,
}

impl BodyPartByCell {
    /// Returns the name of the body part
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the flat indices of the cells in ascending order
    pub fn cells(&self) -> &[usize] {
        &self.cells
    }

    /// Returns the number of cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns whether no cell belongs to the body part
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Named set of particles, stored by particle index
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BodyPartByParticle {
    name: String,
    particles: Vec<usize>,
}

impl BodyPartByParticle {
    /// Returns the name of the body part
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the particle indices in ascending order
    pub fn particles(&self) -> &[usize] {
        &self.particles
    }

    /// Returns the number of particles
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// Returns whether no particle belongs to the body part
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}

/// Result of tagging particles
///
/// The tagged particles are referenced by index, so they must not be reordered afterwards. The body
/// part can only be obtained by clearing their sortable flags with [`mark_unsortable`](Self::mark_unsortable).
#[must_use = "the tagged particles have to be marked as unsortable to obtain the body part"]
#[derive(Clone, Debug)]
pub struct TaggedParticles {
    part: BodyPartByParticle,
}

impl TaggedParticles {
    /// Returns the tagged body part without consuming the result
    pub fn part(&self) -> &BodyPartByParticle {
        &self.part
    }

    /// Clears the sortable flag of all tagged particles and returns the body part
    pub fn mark_unsortable(self, sortability: &mut Sortability) -> BodyPartByParticle {
        sortability.mark_unsortable(&self.part.particles);
        self.part
    }
}

fn collect_matching<P: Fn(usize) -> bool + Sync>(
    n: usize,
    parallel: bool,
    predicate: P,
) -> Vec<usize> {
    if parallel {
        (0..n).into_par_iter().filter(|&i| predicate(i)).collect()
    } else {
        (0..n).filter(|&i| predicate(i)).collect()
    }
}

/// Tags all cells with a neighbor stencil that reaches into the shape
///
/// A cell is tagged if the center of any cell of its stencil is not far from the shape (with the
/// grid spacing as tolerance) and contained in the shape.
pub fn tag_cells_by_shape<I, R, const D: usize, S>(
    name: &str,
    cell_linked_list: &CellLinkedList<I, R, D>,
    shape: &S,
    parallel: bool,
) -> BodyPartByCell
where
    I: Index,
    R: Real,
    S: Shape<R, D> + ?Sized,
{
    profile!("tag_cells_by_shape");
    let grid = cell_linked_list.grid();
    let spacing = grid.cell_size();

    let cells = collect_matching(grid.num_cells(), parallel, |flat| {
        grid.try_unflatten_cell_index(flat).is_some_and(|cell| {
            grid.neighbor_stencil(&cell).iter().any(|stencil_cell| {
                let center = grid.cell_center(stencil_cell);
                shape.check_not_far(&center, spacing) && shape.check_contain(&center)
            })
        })
    });

    info!("Number of cells of body part \"{}\": {}", name, cells.len());
    BodyPartByCell {
        name: name.to_string(),
        cells,
    }
}

/// Tags all cells with a neighbor stencil that has a cell center within one grid spacing of the shape's surface
pub fn tag_cells_near_surface<I, R, const D: usize, S>(
    cell_linked_list: &CellLinkedList<I, R, D>,
    shape: &S,
    parallel: bool,
) -> BodyPartByCell
where
    I: Index,
    R: Real,
    S: Shape<R, D> + ?Sized,
{
    profile!("tag_cells_near_surface");
    let grid = cell_linked_list.grid();
    let spacing = grid.cell_size();

    let cells = collect_matching(grid.num_cells(), parallel, |flat| {
        grid.try_unflatten_cell_index(flat).is_some_and(|cell| {
            grid.neighbor_stencil(&cell).iter().any(|stencil_cell| {
                let center = grid.cell_center(stencil_cell);
                if !shape.check_not_far(&center, spacing) {
                    return false;
                }
                let phi = shape.find_signed_distance(&center);
                phi <= spacing && phi >= -spacing
            })
        })
    });

    info!("Number of near surface cells: {}", cells.len());
    BodyPartByCell {
        name: NEAR_BODY_SURFACE.to_string(),
        cells,
    }
}

/// Tags all particles inside of the shape
pub fn tag_particles_in_volume<R, const D: usize, S>(
    name: &str,
    positions: &[SVector<R, D>],
    shape: &S,
    parallel: bool,
) -> TaggedParticles
where
    R: Real,
    S: Shape<R, D> + ?Sized,
{
    profile!("tag_particles_in_volume");
    let particles = collect_matching(positions.len(), parallel, |i| {
        shape.check_contain(&positions[i])
    });

    info!("Number of particles of body part \"{}\": {}", name, particles.len());
    TaggedParticles {
        part: BodyPartByParticle {
            name: name.to_string(),
            particles,
        },
    }
}

/// Tags all particles with an absolute signed distance to the shape's surface smaller than the particle spacing
pub fn tag_surface_particles<R, const D: usize, S>(
    positions: &[SVector<R, D>],
    shape: &S,
    particle_spacing: R,
    parallel: bool,
) -> TaggedParticles
where
    R: Real,
    S: Shape<R, D> + ?Sized,
{
    profile!("tag_surface_particles");
    let particles = collect_matching(positions.len(), parallel, |i| {
        let phi = shape.find_signed_distance(&positions[i]);
        phi < particle_spacing && phi > -particle_spacing
    });

    info!("Number of surface particles: {}", particles.len());
    TaggedParticles {
        part: BodyPartByParticle {
            name: SURFACE.to_string(),
            particles,
        },
    }
}

/// Tags all particles closer to the shape's surface than `particle_spacing * layer_thickness`
pub fn tag_inner_layer_particles<R, const D: usize, S>(
    positions: &[SVector<R, D>],
    shape: &S,
    particle_spacing: R,
    layer_thickness: R,
    parallel: bool,
) -> TaggedParticles
where
    R: Real,
    S: Shape<R, D> + ?Sized,
{
    profile!("tag_inner_layer_particles");
    let max_distance = particle_spacing * layer_thickness;
    let particles = collect_matching(positions.len(), parallel, |i| {
        let position = &positions[i];
        (shape.find_closest_point(position) - position).norm() < max_distance
    });

    info!("Number of inner layers particles: {}", particles.len());
    TaggedParticles {
        part: BodyPartByParticle {
            name: INNER_LAYERS.to_string(),
            particles,
        },
    }
}
