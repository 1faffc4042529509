//! Implementation of the `tag` subcommand of the cellsweep CLI.

use anyhow::anyhow;
use cellsweep_lib::nalgebra::SVector;
use cellsweep_lib::region::{INNER_LAYERS, NEAR_BODY_SURFACE, SURFACE};
use cellsweep_lib::shape::Ball;
use cellsweep_lib::profile;
use log::info;

use crate::lattice::BodyArgs;

static ARGS_SHAPE: &str = "Tagged region";

/// Command line arguments for the `tag` subcommand
#[derive(Clone, Debug, clap::Parser)]
pub struct TagSubcommandArgs {
    #[command(flatten)]
    pub body: BodyArgs,
    /// Center of the tagged ball (default: center of the particle box)
    #[arg(
        help_heading = ARGS_SHAPE,
        long,
        num_args = 2..=3,
        value_names = ["X", "Y", "Z"],
        allow_negative_numbers = true
    )]
    pub ball_center: Option<Vec<f64>>,
    /// Radius of the tagged ball
    #[arg(help_heading = ARGS_SHAPE, short = 'r', long, default_value = "0.3")]
    pub ball_radius: f64,
    /// Thickness of the tagged inner layers in multiples of the particle spacing
    #[arg(help_heading = ARGS_SHAPE, long, default_value = "3.0")]
    pub inner_layers: f64,
}

/// Number of particles and cells of every tagged region
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct TagSummary {
    pub num_particles: usize,
    pub num_cells: usize,
    pub volume_particles: usize,
    pub surface_particles: usize,
    pub inner_layer_particles: usize,
    pub volume_cells: usize,
    pub near_surface_cells: usize,
    pub sortable_particles: usize,
}

/// Executes the `tag` subcommand
pub fn tag_subcommand(cmd_args: &TagSubcommandArgs) -> Result<(), anyhow::Error> {
    profile!("tag cli");

    if let Some(num_threads) = cmd_args.body.num_threads {
        cellsweep_lib::initialize_thread_pool(num_threads)?;
    }

    let summary = match cmd_args.body.dim {
        2 => tag_ball::<2>(cmd_args)?,
        3 => tag_ball::<3>(cmd_args)?,
        dim => return Err(anyhow!("Unsupported dimension {}", dim)),
    };

    info!(
        "Tagged {} of {} particles inside of the ball, {} on its surface and {} in its inner layers",
        summary.volume_particles,
        summary.num_particles,
        summary.surface_particles,
        summary.inner_layer_particles
    );
    info!(
        "Tagged {} of {} cells reaching into the ball and {} cells near its surface",
        summary.volume_cells, summary.num_cells, summary.near_surface_cells
    );
    info!("{} particles remain sortable", summary.sortable_particles);

    Ok(())
}

/// Fills the particle box and tags all regions defined by the ball
pub fn tag_ball<const D: usize>(cmd_args: &TagSubcommandArgs) -> Result<TagSummary, anyhow::Error> {
    let mut body = cmd_args.body.build_body::<D>()?;
    let ball = Ball::new(ball_center::<D>(cmd_args)?, cmd_args.ball_radius);

    let volume_particles = body.tag_part_by_particle("Ball", &ball).len();
    let surface_particles = body.tag_surface(&ball).len();
    let inner_layer_particles = body.tag_inner_layers(&ball, cmd_args.inner_layers).len();
    let volume_cells = body.tag_part_by_cell("Ball", &ball).len();
    let near_surface_cells = body.tag_near_surface_cells(&ball).len();

    info!("Registered body parts: {:?}", body.body_part_names());
    debug_assert!(body.particle_part(SURFACE).is_some());
    debug_assert!(body.particle_part(INNER_LAYERS).is_some());
    debug_assert!(body.cell_part(NEAR_BODY_SURFACE).is_some());

    Ok(TagSummary {
        num_particles: body.particles().len(),
        num_cells: body.cell_linked_list().grid().num_cells(),
        volume_particles,
        surface_particles,
        inner_layer_particles,
        volume_cells,
        near_surface_cells,
        sortable_particles: body.particles().sortability().count_sortable(),
    })
}

fn ball_center<const D: usize>(
    cmd_args: &TagSubcommandArgs,
) -> Result<SVector<f64, D>, anyhow::Error> {
    match &cmd_args.ball_center {
        Some(center) if center.len() == D => Ok(SVector::from_column_slice(center)),
        Some(center) => Err(anyhow!(
            "The ball center has {} coordinates but the particle box is {}-dimensional",
            center.len(),
            D
        )),
        None => Ok(SVector::repeat(0.5 * cmd_args.body.box_size)),
    }
}
