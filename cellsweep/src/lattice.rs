//! Particle boxes on a regular lattice used as input by the subcommands

use anyhow::{Context, anyhow};
use cellsweep_lib::nalgebra::SVector;
use cellsweep_lib::particles::ParticleState;
use cellsweep_lib::{AxisAlignedBoundingBox, Parameters, SphBody};
use log::info;

use crate::cli::Switch;

static ARGS_BODY: &str = "Particle box";

/// Command line arguments describing the lattice particle box shared by all subcommands
#[derive(Clone, Debug, clap::Args)]
#[command(next_help_heading = ARGS_BODY)]
pub struct BodyArgs {
    /// Spatial dimension of the particle box
    #[arg(long, default_value = "3", value_parser = clap::value_parser!(u8).range(2..=3))]
    pub dim: u8,
    /// Edge length of the particle box, its lower corner is at the origin
    #[arg(long, default_value = "1.0")]
    pub box_size: f64,
    /// Distance between neighboring particles of the lattice
    #[arg(short = 's', long, default_value = "0.025")]
    pub particle_spacing: f64,
    /// Cutoff radius of the particle interactions in multiples of the particle spacing, used as cell size
    #[arg(short = 'c', long, default_value = "2.6")]
    pub cutoff_factor: f64,
    /// Enable multithreading for rebuilding the cell linked list and tagging
    #[arg(
        long = "mt-particles",
        default_value = "on",
        value_name = "off|on",
        ignore_case = true,
        require_equals = true
    )]
    pub parallelize_over_particles: Switch,
    /// Set the number of threads for the worker thread pool
    #[arg(long, short = 'n')]
    pub num_threads: Option<usize>,
}

impl BodyArgs {
    /// Returns the parameters of a body filling the box with particles of the configured spacing
    pub fn parameters<const D: usize>(&self) -> Result<Parameters<f64, D>, anyhow::Error> {
        if !(self.box_size > 0.0) {
            return Err(anyhow!("The box size has to be positive (got {})", self.box_size));
        }
        if !(self.particle_spacing > 0.0) {
            return Err(anyhow!(
                "The particle spacing has to be positive (got {})",
                self.particle_spacing
            ));
        }

        Ok(Parameters {
            cutoff_radius: self.cutoff_factor * self.particle_spacing,
            particle_spacing: self.particle_spacing,
            domain: AxisAlignedBoundingBox::new(
                SVector::zeros(),
                SVector::repeat(self.box_size),
            ),
            enable_multi_threading: self.parallelize_over_particles.into_bool(),
        })
    }

    /// Fills the box with a particle lattice and builds the body with its cell linked list
    pub fn build_body<const D: usize>(&self) -> Result<SphBody<i64, f64, D>, anyhow::Error> {
        let parameters = self.parameters::<D>()?;
        let positions = fill_box_with_lattice(&parameters.domain, parameters.particle_spacing)?;
        if positions.is_empty() {
            return Err(anyhow!(
                "The particle spacing {} does not fit into the box of size {}",
                parameters.particle_spacing,
                self.box_size
            ));
        }

        let particle_aabb = if parameters.enable_multi_threading {
            AxisAlignedBoundingBox::par_from_points(&positions)
        } else {
            AxisAlignedBoundingBox::from_points(&positions)
        };
        info!(
            "Generated {} particles on a {}D lattice (spacing: {}, cutoff radius: {})",
            positions.len(),
            D,
            parameters.particle_spacing,
            parameters.cutoff_radius
        );
        info!(
            "Particle bounding box: min {:?}, max {:?}",
            particle_aabb.min().as_slice(),
            particle_aabb.max().as_slice()
        );

        SphBody::new("Box", &parameters, ParticleState::from_positions(positions))
            .context("Failed to construct the cell linked list of the particle box")
    }
}

/// Fills the box with particles on a regular lattice
///
/// Particles sit at the centers of the lattice cells, i.e. half a spacing away from the faces of
/// the box. They are numbered in row-major order with the first axis varying slowest.
pub fn fill_box_with_lattice<const D: usize>(
    domain: &AxisAlignedBoundingBox<f64, D>,
    spacing: f64,
) -> Result<Vec<SVector<f64, D>>, anyhow::Error> {
    if !(spacing > 0.0) {
        return Err(anyhow!("The lattice spacing has to be positive (got {})", spacing));
    }

    let extents = domain.extents();
    let counts: [usize; D] =
        std::array::from_fn(|d| (extents[d] / spacing).floor().max(0.0) as usize);
    let num_particles = counts
        .iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n))
        .ok_or_else(|| {
            anyhow!(
                "Too many lattice particles for the box (counts per axis: {:?})",
                counts
            )
        })?;

    let mut positions = Vec::with_capacity(num_particles);
    for flat_index in 0..num_particles {
        let mut remainder = flat_index;
        let mut position = *domain.min();
        for d in (0..D).rev() {
            let i = remainder % counts[d];
            remainder /= counts[d];
            position[d] += (i as f64 + 0.5) * spacing;
        }
        positions.push(position);
    }

    Ok(positions)
}
