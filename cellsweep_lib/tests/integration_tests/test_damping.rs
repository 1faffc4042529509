use cellsweep_lib::damping::{DampingError, PairwiseDamping};
use cellsweep_lib::iteration::Traversal;
use cellsweep_lib::workspace::SweepWorkspace;
use cellsweep_lib::{CellLinkedList, build_thread_pool};
use nalgebra::Vector3;

use crate::{random_particles_3d, unit_cube};

const SAFE_TRAVERSALS: [Traversal; 5] = [
    Traversal::Plain,
    Traversal::Split,
    Traversal::ParallelSplit,
    Traversal::SplitSweeping,
    Traversal::ParallelSplitSweeping,
];

fn setup(n: usize) -> (CellLinkedList<i32, f64, 3>, Vec<Vector3<f64>>) {
    let positions = random_particles_3d(n);
    let mut list = CellLinkedList::new(&unit_cube(), 0.1).unwrap();
    list.rebuild(&positions);
    (list, positions)
}

#[test]
fn test_uniform_velocity_field_is_unchanged() {
    let (list, positions) = setup(5000);
    let initial = vec![Vector3::new(0.3, -1.25, 2.0); positions.len()];
    let workspace = SweepWorkspace::default();

    for traversal in SAFE_TRAVERSALS {
        let mut velocities = initial.clone();
        PairwiseDamping::new(10.0)
            .apply(&list, &positions, &mut velocities, 0.01, traversal, &workspace)
            .unwrap();
        assert_eq!(velocities, initial);
    }
}

#[test]
fn test_zero_viscosity_is_identity() {
    let (list, positions) = setup(5000);
    let initial: Vec<_> = (0..positions.len()).map(|_| Vector3::new_random()).collect();
    let workspace = SweepWorkspace::default();

    let pool = build_thread_pool(4).unwrap();
    for traversal in SAFE_TRAVERSALS {
        let mut velocities = initial.clone();
        pool.install(|| {
            PairwiseDamping::new(0.0)
                .apply(&list, &positions, &mut velocities, 0.01, traversal, &workspace)
                .unwrap()
        });
        assert_eq!(velocities, initial);
    }
}

#[test]
fn test_parallel_sweeps_match_sequential_sweeps() {
    let (list, positions) = setup(8000);
    let initial: Vec<_> = (0..positions.len()).map(|_| Vector3::new_random()).collect();
    let damping = PairwiseDamping::new(5.0);
    let workspace = SweepWorkspace::default();

    let run = |traversal| {
        let mut velocities = initial.clone();
        damping
            .apply(&list, &positions, &mut velocities, 0.02, traversal, &workspace)
            .unwrap();
        velocities
    };

    // Within a color, cells touch disjoint particles, so the result does not depend on their order
    let pool = build_thread_pool(3).unwrap();
    let split = run(Traversal::Split);
    let parallel_split = pool.install(|| run(Traversal::ParallelSplit));
    let sweeping = run(Traversal::SplitSweeping);
    let parallel_sweeping = pool.install(|| run(Traversal::ParallelSplitSweeping));

    for i in 0..positions.len() {
        assert!((split[i] - parallel_split[i]).norm() < 1e-12);
        assert!((sweeping[i] - parallel_sweeping[i]).norm() < 1e-12);
    }

    let momentum = |v: &[Vector3<f64>]| v.iter().fold(Vector3::zeros(), |acc, x| acc + x);
    assert!((momentum(&parallel_sweeping) - momentum(&initial)).norm() < 1e-9);
}

#[test]
fn test_errors() {
    let (list, positions) = setup(100);
    let workspace = SweepWorkspace::default();

    let mut too_few = vec![Vector3::zeros(); 99];
    assert_eq!(
        PairwiseDamping::new(1.0).apply(
            &list,
            &positions,
            &mut too_few,
            0.1,
            Traversal::Plain,
            &workspace
        ),
        Err(DampingError::ParticleCountMismatch {
            particles: 100,
            velocities: 99
        })
    );

    let mut velocities = vec![Vector3::zeros(); 100];
    assert_eq!(
        PairwiseDamping::new(1.0).apply(
            &list,
            &positions,
            &mut velocities,
            0.1,
            Traversal::Parallel,
            &workspace
        ),
        Err(DampingError::TraversalNotRaceFree(Traversal::Parallel))
    );

    velocities[42] = Vector3::new(0.0, f64::INFINITY, 0.0);
    let result = PairwiseDamping::new(1.0).apply(
        &list,
        &positions,
        &mut velocities,
        0.1,
        Traversal::ParallelSplitSweeping,
        &workspace,
    );
    assert!(matches!(result, Err(DampingError::NonFiniteVelocity { .. })));
}
