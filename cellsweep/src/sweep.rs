//! Implementation of the `sweep` subcommand of the cellsweep CLI.

use anyhow::{Context, anyhow};
use cellsweep_lib::constraint::{ConstrainRegion, FixedConstraint};
use cellsweep_lib::damping::PairwiseDamping;
use cellsweep_lib::iteration::Traversal;
use cellsweep_lib::nalgebra::SVector;
use cellsweep_lib::reduce::{ParticleReduce, ReduceSum};
use cellsweep_lib::workspace::SweepWorkspace;
use cellsweep_lib::{AxisAlignedBoundingBox, SimulationContext, profile};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use rayon::prelude::*;

use crate::cli::Switch;
use crate::lattice::BodyArgs;
use crate::logging;

static ARGS_SWEEP: &str = "Time stepping";

/// Race-free traversal schemes that can be selected for the damping sweeps
#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum TraversalArg {
    /// Sequential, ascending particle index
    Plain,
    /// Sequential forward colored sweep
    Split,
    /// Parallel forward colored sweep
    ParSplit,
    /// Sequential forward and backward colored sweep
    SplitSweeping,
    /// Parallel forward and backward colored sweep
    ParSplitSweeping,
}

impl From<TraversalArg> for Traversal {
    fn from(arg: TraversalArg) -> Self {
        match arg {
            TraversalArg::Plain => Traversal::Plain,
            TraversalArg::Split => Traversal::Split,
            TraversalArg::ParSplit => Traversal::ParallelSplit,
            TraversalArg::SplitSweeping => Traversal::SplitSweeping,
            TraversalArg::ParSplitSweeping => Traversal::ParallelSplitSweeping,
        }
    }
}

/// Command line arguments for the `sweep` subcommand
#[derive(Clone, Debug, clap::Parser)]
pub struct SweepSubcommandArgs {
    #[command(flatten)]
    pub body: BodyArgs,
    /// Number of time steps to simulate
    #[arg(help_heading = ARGS_SWEEP, long, default_value = "100")]
    pub steps: usize,
    /// Size of a single time step
    #[arg(help_heading = ARGS_SWEEP, long, default_value = "0.001")]
    pub dt: f64,
    /// Viscosity of the pairwise damping
    #[arg(help_heading = ARGS_SWEEP, long, default_value = "1.0")]
    pub viscosity: f64,
    /// Traversal scheme of the damping sweeps
    #[arg(
        help_heading = ARGS_SWEEP,
        short = 't',
        long,
        value_enum,
        default_value = "par-split-sweeping"
    )]
    pub traversal: TraversalArg,
    /// Pin the particles next to the lower face of the box along the first axis
    #[arg(
        help_heading = ARGS_SWEEP,
        long,
        default_value = "on",
        value_name = "off|on",
        ignore_case = true,
        require_equals = true
    )]
    pub fixed_wall: Switch,
    /// Show a progress bar while stepping
    #[arg(
        help_heading = ARGS_SWEEP,
        long,
        default_value = "on",
        value_name = "off|on",
        ignore_case = true,
        require_equals = true
    )]
    pub progress: Switch,
}

/// Outcome of a damping run
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct SweepSummary {
    pub num_particles: usize,
    pub steps: usize,
    pub final_time: f64,
    pub initial_kinetic_energy: f64,
    pub final_kinetic_energy: f64,
    pub initial_momentum: f64,
    pub final_momentum: f64,
}

/// Executes the `sweep` subcommand
pub fn sweep_subcommand(cmd_args: &SweepSubcommandArgs) -> Result<(), anyhow::Error> {
    profile!("sweep cli");

    if let Some(num_threads) = cmd_args.body.num_threads {
        cellsweep_lib::initialize_thread_pool(num_threads)?;
    }

    let summary = match cmd_args.body.dim {
        2 => run_damping::<2>(cmd_args)?,
        3 => run_damping::<3>(cmd_args)?,
        dim => return Err(anyhow!("Unsupported dimension {}", dim)),
    };

    info!(
        "Simulated {} steps of {} particles up to time {:.6}",
        summary.steps, summary.num_particles, summary.final_time
    );
    info!(
        "Kinetic energy: {:.6e} -> {:.6e}",
        summary.initial_kinetic_energy, summary.final_kinetic_energy
    );
    info!(
        "Momentum along the second axis: {:.6e} -> {:.6e}",
        summary.initial_momentum, summary.final_momentum
    );

    Ok(())
}

/// Fills the particle box with a shear flow and runs the damping sweeps
pub fn run_damping<const D: usize>(
    cmd_args: &SweepSubcommandArgs,
) -> Result<SweepSummary, anyhow::Error> {
    let mut body = cmd_args.body.build_body::<D>()?;
    let traversal = Traversal::from(cmd_args.traversal);
    let damping = PairwiseDamping::new(cmd_args.viscosity);
    let workspace = SweepWorkspace::default();
    let mut context = SimulationContext::new();
    let dt = cmd_args.dt;
    let enable_multi_threading = cmd_args.body.parallelize_over_particles.into_bool();

    // Shear flow along the second axis varying over the first axis
    let particles = body.particles_mut();
    for (position, velocity) in particles.positions.iter().zip(particles.velocities.iter_mut()) {
        let phase = 2.0 * std::f64::consts::PI * position[0] / cmd_args.body.box_size;
        *velocity = SVector::zeros();
        velocity[1] = phase.sin();
    }

    let wall = if cmd_args.fixed_wall.into_bool() {
        let cutoff_radius = cmd_args.body.cutoff_factor * cmd_args.body.particle_spacing;
        let mut wall_max = SVector::repeat(cmd_args.body.box_size);
        wall_max[0] = cutoff_radius;
        let wall_box = AxisAlignedBoundingBox::new(SVector::zeros(), wall_max);
        let wall = body.tag_part_by_particle("Wall", &wall_box).clone();
        info!("Pinned {} particles of the wall", wall.len());
        let constrain = ConstrainRegion::new(FixedConstraint, enable_multi_threading);
        constrain.apply(&wall, body.particles_mut(), &context);
        Some((wall, constrain))
    } else {
        None
    };

    let (initial_kinetic_energy, initial_momentum) =
        energy_and_momentum(&body.particles().velocities);

    let pb = if cmd_args.progress.into_bool() {
        let pb = ProgressBar::new(cmd_args.steps as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40}] {pos}/{len} steps - remaining: [{eta_precise}]",
            )?
            .progress_chars("=> "),
        );
        logging::set_progress_bar(Some(pb.downgrade()));
        Some(pb)
    } else {
        None
    };

    let result = (0..cmd_args.steps).try_for_each(|step| {
        profile!("damping step");

        let (cell_linked_list, particles) = body.split_mut();
        damping
            .apply(
                cell_linked_list,
                &particles.positions,
                &mut particles.velocities,
                dt,
                traversal,
                &workspace,
            )
            .with_context(|| format!("Damping sweep failed in step {}", step))?;

        if enable_multi_threading {
            particles
                .positions
                .par_iter_mut()
                .zip(particles.velocities.par_iter())
                .for_each(|(x, v)| *x += v * dt);
        } else {
            for (x, v) in particles.positions.iter_mut().zip(particles.velocities.iter()) {
                *x += v * dt;
            }
        }

        if let Some((wall, constrain)) = &wall {
            constrain.apply(wall, particles, &context);
        }

        context.advance(dt);
        body.update_cell_linked_list();
        debug!("Finished step {} at time {:.6}", context.step(), context.time());

        if let Some(pb) = logging::progress_bar() {
            pb.inc(1)
        }
        Ok::<_, anyhow::Error>(())
    });

    if let Some(pb) = pb {
        pb.finish();
        logging::set_progress_bar(None);
    }
    result?;

    let (final_kinetic_energy, final_momentum) = energy_and_momentum(&body.particles().velocities);

    Ok(SweepSummary {
        num_particles: body.particles().len(),
        steps: context.step(),
        final_time: context.time(),
        initial_kinetic_energy,
        final_kinetic_energy,
        initial_momentum,
        final_momentum,
    })
}

/// Returns the total kinetic energy (unit masses) and the total momentum along the second axis
fn energy_and_momentum<const D: usize>(velocities: &[SVector<f64, D>]) -> (f64, f64) {
    let energy = ParticleReduce::new(ReduceSum, |i: usize, _dt: f64| {
        0.5 * velocities[i].norm_squared()
    });
    let momentum = ParticleReduce::new(ReduceSum, |i: usize, _dt: f64| velocities[i][1]);
    (
        energy.par_reduce(velocities.len(), 0.0),
        momentum.par_reduce(velocities.len(), 0.0),
    )
}
