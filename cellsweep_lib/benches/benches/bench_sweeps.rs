use criterion::{Criterion, criterion_group};
use nalgebra::Vector3;
use cellsweep_lib::damping::PairwiseDamping;
use cellsweep_lib::iteration::Traversal;
use cellsweep_lib::workspace::SweepWorkspace;
use cellsweep_lib::{Aabb3d, CellLinkedList3d};
use std::time::Duration;

use super::particle_block;

static PARTICLES_PER_DIM: usize = 48;
static CUTOFF_RADIUS: f64 = 2.6 / PARTICLES_PER_DIM as f64;
static TIME_STEP: f64 = 1e-3;

pub fn damping_sweeps(c: &mut Criterion) {
    let particle_positions = particle_block(PARTICLES_PER_DIM);
    let domain = Aabb3d::new(Vector3::zeros(), Vector3::repeat(1.0));
    let mut list = CellLinkedList3d::<i32, f64>::new(&domain, CUTOFF_RADIUS).unwrap();
    list.par_rebuild(&particle_positions);

    let initial_velocities: Vec<_> = particle_positions
        .iter()
        .map(|p| Vector3::new(p.y.sin(), p.z.cos(), p.x))
        .collect();
    let damping = PairwiseDamping::new(0.5);
    let workspace = SweepWorkspace::default();

    let mut group = c.benchmark_group("sweeps");
    group.sample_size(30);
    group.warm_up_time(Duration::from_secs(3));
    group.measurement_time(Duration::from_secs(15));

    for (name, traversal) in [
        ("damping_plain", Traversal::Plain),
        ("damping_split", Traversal::Split),
        ("damping_par_split", Traversal::ParallelSplit),
        ("damping_split_sweeping", Traversal::SplitSweeping),
        ("damping_par_split_sweeping", Traversal::ParallelSplitSweeping),
    ] {
        let mut velocities = initial_velocities.clone();
        group.bench_function(name, |b| {
            b.iter(|| {
                damping
                    .apply(
                        &list,
                        &particle_positions,
                        &mut velocities,
                        TIME_STEP,
                        traversal,
                        &workspace,
                    )
                    .unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(bench_sweeps, damping_sweeps);
