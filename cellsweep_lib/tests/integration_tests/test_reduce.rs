use cellsweep_lib::iteration::{SweepDirection, for_each_particle_colored};
use cellsweep_lib::particles::Sortability;
use cellsweep_lib::reduce::{ParticleReduce, ReduceFn, ReduceMax, ReduceMin, ReduceSum};
use cellsweep_lib::region::tag_particles_in_volume;
use cellsweep_lib::shape::Ball;
use cellsweep_lib::{CellLinkedList, build_thread_pool};
use nalgebra::Vector3;

use crate::{random_particles_3d, unit_cube};

#[test]
fn test_reductions_agree_for_any_thread_count() {
    let positions = random_particles_3d(10_000);
    let mut list = CellLinkedList::<i32, f64, 3>::new(&unit_cube(), 0.1).unwrap();
    list.rebuild(&positions);

    // Integer valued summands, so the sum is exact in any order
    let values: Vec<f64> = (0..positions.len()).map(|i| ((i * 7919) % 1000) as f64).collect();
    let sum = ParticleReduce::new(ReduceSum, |i: usize, _dt: f64| values[i]);
    let max = ParticleReduce::new(ReduceMax, |i: usize, _dt: f64| positions[i].x);
    let min = ParticleReduce::new(ReduceMin, |i: usize, _dt: f64| positions[i].y);

    let expected_sum = sum.reduce(positions.len(), 0.1);
    let expected_max = max.reduce(positions.len(), 0.1);
    let expected_min = min.reduce(positions.len(), 0.1);
    assert_eq!(expected_sum, values.iter().sum::<f64>());

    for direction in [SweepDirection::Forward, SweepDirection::Backward] {
        assert_eq!(sum.reduce_colored(&list, direction, 0.1), expected_sum);
        assert_eq!(max.reduce_colored(&list, direction, 0.1), expected_max);
    }

    for num_threads in [1, 2, 4] {
        let pool = build_thread_pool(num_threads).unwrap();
        pool.install(|| {
            assert_eq!(sum.par_reduce(positions.len(), 0.1), expected_sum);
            assert_eq!(sum.par_reduce_colored(&list, 0.1), expected_sum);
            assert_eq!(max.par_reduce_colored(&list, 0.1), expected_max);
            assert_eq!(min.par_reduce(positions.len(), 0.1), expected_min);
            assert_eq!(min.par_reduce_colored(&list, 0.1), expected_min);
        });
    }
}

#[test]
fn test_reduce_over_body_part() {
    let positions = random_particles_3d(3000);
    let ball = Ball::new(Vector3::repeat(0.5), 0.25);
    let part = tag_particles_in_volume("ball", &positions, &ball, true)
        .mark_unsortable(&mut Sortability::all_sortable(positions.len()));

    let count = ParticleReduce::new(ReduceSum, |_: usize, _dt: f64| 1usize);
    assert_eq!(count.reduce_body_part(&part, 0.0), part.len());
    assert_eq!(count.par_reduce_body_part(&part, 0.0), part.len());

    let farthest = ParticleReduce::new(ReduceMax, |i: usize, _dt: f64| {
        (positions[i] - ball.center()).norm()
    });
    assert!(farthest.par_reduce_body_part(&part, 0.0) <= 0.25);
}

#[test]
fn test_closure_reduction() {
    let positions = random_particles_3d(500);
    let bounds = ParticleReduce::new(
        ReduceFn::new((f64::MAX, f64::MIN), |a: (f64, f64), b: (f64, f64)| {
            (a.0.min(b.0), a.1.max(b.1))
        }),
        |i: usize, _dt: f64| (positions[i].z, positions[i].z),
    );
    let (lo, hi) = bounds.par_reduce(positions.len(), 0.0);
    assert!(positions.iter().all(|p| p.z >= lo && p.z <= hi));

    let empty = bounds.reduce(0, 0.0);
    assert_eq!(empty, (f64::MAX, f64::MIN));
}

#[test]
fn test_colored_reduction_visits_particles_in_sweep_order() {
    let positions = random_particles_3d(2000);
    let mut list = CellLinkedList::<i32, f64, 3>::new(&unit_cube(), 0.1).unwrap();
    list.rebuild(&positions);

    let order = ParticleReduce::new(
        ReduceFn::new(Vec::new(), |mut a: Vec<usize>, b: Vec<usize>| {
            a.extend(b);
            a
        }),
        |i: usize, _dt: f64| vec![i],
    );

    for direction in [SweepDirection::Forward, SweepDirection::Backward] {
        let mut expected = Vec::with_capacity(positions.len());
        for_each_particle_colored(&list, direction, 0.0, |i, _dt| {
            expected.push(i);
            Ok::<_, ()>(())
        })
        .unwrap();

        let visited = order.reduce_colored(&list, direction, 0.0);
        assert_eq!(visited.len(), positions.len());
        assert_eq!(visited, expected);
    }
}
