//! A particle body owning its cell linked list and a registry of named body parts

use std::collections::hash_map::Entry;

use log::info;

use crate::cell_linked_list::{CellLinkedList, CellLinkedListError};
use crate::particles::ParticleState;
use crate::region::{self, BodyPartByCell, BodyPartByParticle};
use crate::shape::Shape;
use crate::{Index, MapType, Parameters, Real, new_map, profile};

/// Particle body with its spatial index and tagged body parts
#[derive(Clone, Debug)]
pub struct SphBody<I: Index, R: Real, const D: usize> {
    name: String,
    particle_spacing: R,
    enable_multi_threading: bool,
    cell_linked_list: CellLinkedList<I, R, D>,
    particles: ParticleState<R, D>,
    particle_parts: MapType<String, BodyPartByParticle>,
    cell_parts: MapType<String, BodyPartByCell>,
}

impl<I: Index, R: Real, const D: usize> SphBody<I, R, D> {
    /// Creates the body, allocates its cell linked list and sorts the particles into the cells
    pub fn new(
        name: &str,
        parameters: &Parameters<R, D>,
        particles: ParticleState<R, D>,
    ) -> Result<Self, CellLinkedListError<I, R>> {
        let cell_linked_list = CellLinkedList::new(&parameters.domain, parameters.cutoff_radius)?;
        info!(
            "Creating body \"{}\" with {} particles (spacing: {})",
            name,
            particles.len(),
            parameters.particle_spacing
        );

        let mut body = Self {
            name: name.to_string(),
            particle_spacing: parameters.particle_spacing,
            enable_multi_threading: parameters.enable_multi_threading,
            cell_linked_list,
            particles,
            particle_parts: new_map(),
            cell_parts: new_map(),
        };
        body.update_cell_linked_list();
        Ok(body)
    }

    /// Returns the name of the body
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the initial particle spacing
    pub fn particle_spacing(&self) -> R {
        self.particle_spacing
    }

    /// Returns the cell linked list, rebuilt by the last call to [`update_cell_linked_list`](Self::update_cell_linked_list)
    pub fn cell_linked_list(&self) -> &CellLinkedList<I, R, D> {
        &self.cell_linked_list
    }

    /// Returns the particles
    pub fn particles(&self) -> &ParticleState<R, D> {
        &self.particles
    }

    /// Returns the particles for modification, the cell linked list has to be updated after moving particles
    pub fn particles_mut(&mut self) -> &mut ParticleState<R, D> {
        &mut self.particles
    }

    /// Returns the cell linked list together with mutable particles for running sweeps
    pub fn split_mut(&mut self) -> (&CellLinkedList<I, R, D>, &mut ParticleState<R, D>) {
        (&self.cell_linked_list, &mut self.particles)
    }

    /// Sorts all particles into the cells of the cell linked list according to their current positions
    pub fn update_cell_linked_list(&mut self) {
        profile!("SphBody::update_cell_linked_list");
        if self.enable_multi_threading {
            self.cell_linked_list.par_rebuild(&self.particles.positions);
        } else {
            self.cell_linked_list.rebuild(&self.particles.positions);
        }
    }

    /// Tags the particles close to the surface of the shape and registers them as [`region::SURFACE`]
    pub fn tag_surface<S: Shape<R, D> + ?Sized>(&mut self, shape: &S) -> &BodyPartByParticle {
        let tagged = region::tag_surface_particles(
            &self.particles.positions,
            shape,
            self.particle_spacing,
            self.enable_multi_threading,
        );
        let part = tagged.mark_unsortable(self.particles.sortability_mut());
        self.register_particle_part(part)
    }

    /// Tags the particles of the layers below the surface of the shape and registers them as [`region::INNER_LAYERS`]
    pub fn tag_inner_layers<S: Shape<R, D> + ?Sized>(
        &mut self,
        shape: &S,
        layer_thickness: R,
    ) -> &BodyPartByParticle {
        let tagged = region::tag_inner_layer_particles(
            &self.particles.positions,
            shape,
            self.particle_spacing,
            layer_thickness,
            self.enable_multi_threading,
        );
        let part = tagged.mark_unsortable(self.particles.sortability_mut());
        self.register_particle_part(part)
    }

    /// Tags the particles inside of the shape and registers them under the given name
    pub fn tag_part_by_particle<S: Shape<R, D> + ?Sized>(
        &mut self,
        name: &str,
        shape: &S,
    ) -> &BodyPartByParticle {
        let tagged = region::tag_particles_in_volume(
            name,
            &self.particles.positions,
            shape,
            self.enable_multi_threading,
        );
        let part = tagged.mark_unsortable(self.particles.sortability_mut());
        self.register_particle_part(part)
    }

    /// Tags the cells near the surface of the shape and registers them as [`region::NEAR_BODY_SURFACE`]
    pub fn tag_near_surface_cells<S: Shape<R, D> + ?Sized>(
        &mut self,
        shape: &S,
    ) -> &BodyPartByCell {
        let part =
            region::tag_cells_near_surface(&self.cell_linked_list, shape, self.enable_multi_threading);
        Self::register(&mut self.cell_parts, part.name().to_string(), part)
    }

    /// Tags the cells reaching into the shape and registers them under the given name
    pub fn tag_part_by_cell<S: Shape<R, D> + ?Sized>(
        &mut self,
        name: &str,
        shape: &S,
    ) -> &BodyPartByCell {
        let part = region::tag_cells_by_shape(
            name,
            &self.cell_linked_list,
            shape,
            self.enable_multi_threading,
        );
        Self::register(&mut self.cell_parts, name.to_string(), part)
    }

    /// Returns the particle body part with the given name
    pub fn particle_part(&self, name: &str) -> Option<&BodyPartByParticle> {
        self.particle_parts.get(name)
    }

    /// Returns the cell body part with the given name
    pub fn cell_part(&self, name: &str) -> Option<&BodyPartByCell> {
        self.cell_parts.get(name)
    }

    /// Returns the sorted names of all registered body parts
    pub fn body_part_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self
            .particle_parts
            .keys()
            .chain(self.cell_parts.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    fn register_particle_part(&mut self, part: BodyPartByParticle) -> &BodyPartByParticle {
        Self::register(&mut self.particle_parts, part.name().to_string(), part)
    }

    /// Inserts or replaces a body part, retagging under an existing name overwrites the old part
    fn register<T>(parts: &mut MapType<String, T>, name: String, part: T) -> &T {
        match parts.entry(name) {
            Entry::Occupied(mut entry) => {
                entry.insert(part);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(part),
        }
    }
}
