use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use cellsweep_lib::iteration::*;
use cellsweep_lib::{CellLinkedList, UnsafeSlice, build_thread_pool};

use crate::{lattice_2d, random_particles_3d, unit_cube, unit_square};

fn lattice_list() -> CellLinkedList<i32, f64, 2> {
    let mut list = CellLinkedList::new(&unit_square(), 0.1).unwrap();
    list.rebuild(&lattice_2d(40, 0.025));
    list
}

fn sweep_order(list: &CellLinkedList<i32, f64, 2>, direction: SweepDirection) -> Vec<usize> {
    let mut order = Vec::new();
    for_each_particle_colored(list, direction, 1.0, |i, _| {
        order.push(i);
        Ok::<_, ()>(())
    })
    .unwrap();
    order
}

#[test]
fn test_colored_sweeps_visit_every_particle_once() {
    let list = lattice_list();
    let n = list.num_particles();

    let mut forward = sweep_order(&list, SweepDirection::Forward);
    forward.sort_unstable();
    assert_eq!(forward, (0..n).collect::<Vec<_>>());

    for direction in [SweepDirection::Forward, SweepDirection::Backward] {
        let visits: Vec<_> = (0..n).map(|_| AtomicUsize::new(0)).collect();
        par_for_each_particle_colored(&list, direction, 1.0, |i, _| {
            visits[i].fetch_add(1, Ordering::Relaxed);
            Ok::<_, ()>(())
        })
        .unwrap();
        assert!(visits.iter().all(|v| v.load(Ordering::Relaxed) == 1));
    }
}

#[test]
fn test_backward_sweep_reverses_forward_sweep() {
    let list = lattice_list();
    let forward = sweep_order(&list, SweepDirection::Forward);
    let mut backward = sweep_order(&list, SweepDirection::Backward);
    backward.reverse();
    assert_eq!(forward, backward);
}

#[test]
fn test_colors_are_processed_in_order() {
    let list = lattice_list();
    let split_cell_lists = list.split_cell_lists();
    let color_of_cell = |flat: usize| {
        split_cell_lists
            .groups()
            .iter()
            .position(|g| g.contains(&flat))
            .unwrap()
    };

    let colors = Mutex::new(Vec::new());
    par_for_each_cell_colored(&list, SweepDirection::Backward, 1.0, |cell, _| {
        colors.lock().unwrap().push(color_of_cell(cell.flat_index));
        Ok::<_, ()>(())
    })
    .unwrap();

    let colors = colors.into_inner().unwrap();
    assert_eq!(colors.len(), list.grid().num_cells());
    assert!(colors.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn test_split_sweeping_time_steps() {
    let list = lattice_list();
    let n = list.num_particles();

    let steps = Mutex::new(Vec::new());
    par_for_each_particle_split_sweeping(&list, 0.5, |_, dt| {
        steps.lock().unwrap().push(dt);
        Ok::<_, ()>(())
    })
    .unwrap();
    let steps = steps.into_inner().unwrap();
    assert_eq!(steps.len(), 2 * n);
    assert!(steps.iter().all(|&dt| dt == 0.25));

    let mut cell_steps = Vec::new();
    for_each_cell_split_sweeping(&list, 0.5, |cell, dt| {
        cell_steps.push((cell.flat_index, dt));
        Ok::<_, ()>(())
    })
    .unwrap();
    let num_cells = list.grid().num_cells();
    assert_eq!(cell_steps.len(), 2 * num_cells);
    assert!(cell_steps.iter().all(|&(_, dt)| dt == 0.5));

    // The second half revisits the cells in reverse order
    let (first, second) = cell_steps.split_at(num_cells);
    assert!(first.iter().zip(second.iter().rev()).all(|(a, b)| a.0 == b.0));
}

#[test]
fn test_failure_aborts_sweep() {
    let list = lattice_list();
    let order = sweep_order(&list, SweepDirection::Forward);
    let failing = order[order.len() / 3];

    let mut calls = 0;
    let result = for_each_particle_colored(&list, SweepDirection::Forward, 1.0, |i, _| {
        calls += 1;
        if i == failing { Err(i) } else { Ok(()) }
    });
    assert_eq!(result, Err(failing));
    assert_eq!(calls, order.len() / 3 + 1);

    let result = par_for_each_particle_split_sweeping(&list, 1.0, |i, _| {
        if i == failing { Err("kernel failed") } else { Ok(()) }
    });
    assert_eq!(result, Err("kernel failed"));

    let result = par_for_each_cell_colored(&list, SweepDirection::Forward, 1.0, |cell, _| {
        if cell.particles.contains(&failing) { Err(cell.flat_index) } else { Ok(()) }
    });
    assert_eq!(result, Err(list.particle_cell(failing)));

    let result = par_for_each_particle(list.num_particles(), 1.0, |i, _| {
        if i == failing { Err(()) } else { Ok(()) }
    });
    assert!(result.is_err());
}

/// Every particle increments a counter of all particles in its neighbor stencil without synchronization
fn stencil_counts(list: &CellLinkedList<i32, f64, 3>, traversal: Traversal) -> Vec<usize> {
    let mut counts = vec![0usize; list.num_particles()];
    let shared = UnsafeSlice::new(&mut counts);
    traversal
        .for_each_particle(list, 1.0, |i, _| {
            list.for_each_neighbor_candidate_of_flat_cell(list.particle_cell(i), |j| unsafe {
                *shared.get_mut(j) += 1;
            });
            Ok::<_, ()>(())
        })
        .unwrap();
    counts
}

#[test]
fn test_colored_traversals_have_no_lost_updates() {
    let positions = random_particles_3d(20_000);
    let mut list = CellLinkedList::new(&unit_cube(), 0.1).unwrap();
    list.par_rebuild(&positions);

    let expected = stencil_counts(&list, Traversal::Plain);
    let pool = build_thread_pool(4).unwrap();
    for traversal in [Traversal::Split, Traversal::ParallelSplit] {
        let counts = pool.install(|| stencil_counts(&list, traversal));
        assert_eq!(counts, expected);
    }
    for traversal in [Traversal::SplitSweeping, Traversal::ParallelSplitSweeping] {
        let counts = pool.install(|| stencil_counts(&list, traversal));
        let doubled: Vec<_> = expected.iter().map(|c| 2 * c).collect();
        assert_eq!(counts, doubled);
    }
}

#[test]
fn test_traversal_race_freedom() {
    assert!(Traversal::Plain.is_race_free_for_pairwise_writes());
    assert!(!Traversal::Parallel.is_race_free_for_pairwise_writes());
    assert!(Traversal::ParallelSplit.is_race_free_for_pairwise_writes());
    assert!(Traversal::ParallelSplitSweeping.is_race_free_for_pairwise_writes());
    assert_eq!(SweepDirection::Forward.reversed(), SweepDirection::Backward);
}
