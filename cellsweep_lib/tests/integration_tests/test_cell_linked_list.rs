use cellsweep_lib::{CellLinkedList, CellLinkedList3d, CellLinkedListError};
use nalgebra::{Vector2, Vector3};

use crate::{random_particles_3d, unit_cube, unit_square};

fn check_partition(list: &CellLinkedList3d<i32, f64>, positions: &[Vector3<f64>]) {
    let mut seen = vec![0usize; positions.len()];
    for cell in list.cells() {
        assert!(cell.particles.windows(2).all(|w| w[0] < w[1]));
        for &i in cell.particles {
            seen[i] += 1;
            assert_eq!(list.particle_cell(i), cell.flat_index);
        }
    }
    assert!(seen.iter().all(|&n| n == 1), "every particle has to be in exactly one cell");

    let grid = list.grid();
    for (i, p) in positions.iter().enumerate() {
        let cell = grid.enclosing_cell(p);
        assert_eq!(list.particle_cell(i), grid.flatten_cell_index(&cell));
        assert!(list.particles_in_cell(&cell).contains(&i));
    }
}

#[test]
fn test_rebuild_partitions_particles() {
    let positions = random_particles_3d(5000);
    let mut list = CellLinkedList::<i32, f64, 3>::new(&unit_cube(), 0.08).unwrap();
    assert_eq!(list.grid().cells_per_dim(), &[13, 13, 13]);

    list.rebuild(&positions);
    assert_eq!(list.num_particles(), positions.len());
    check_partition(&list, &positions);
}

#[test]
fn test_par_rebuild_matches_rebuild() {
    let positions = random_particles_3d(20_000);
    let mut seq = CellLinkedList::<i32, f64, 3>::new(&unit_cube(), 0.1).unwrap();
    let mut par = seq.clone();

    seq.rebuild(&positions);
    par.par_rebuild(&positions);
    check_partition(&par, &positions);

    for (a, b) in seq.cells().zip(par.cells()) {
        assert_eq!(a.flat_index, b.flat_index);
        assert_eq!(a.particles, b.particles);
    }
}

#[test]
fn test_out_of_domain_particles_are_clamped() {
    let mut positions = random_particles_3d(100);
    positions.push(Vector3::new(-5.0, 0.5, 0.5));
    positions.push(Vector3::new(0.5, 7.0, 0.5));
    positions.push(Vector3::new(f64::NAN, 0.5, 0.5));

    let mut list = CellLinkedList::<i32, f64, 3>::new(&unit_cube(), 0.25).unwrap();
    list.rebuild(&positions);
    check_partition(&list, &positions);

    let grid = list.grid();
    assert_eq!(grid.enclosing_cell(&positions[100]).index()[0], 0);
    assert_eq!(grid.enclosing_cell(&positions[101]).index()[1], 3);
    assert_eq!(grid.enclosing_cell(&positions[102]).index()[0], 0);
}

#[test]
fn test_rebuild_replaces_previous_state() {
    let mut list = CellLinkedList::<i32, f64, 2>::new(&unit_square(), 0.25).unwrap();
    list.rebuild(&[Vector2::new(0.1, 0.1), Vector2::new(0.9, 0.9)]);
    assert_eq!(list.particles_in_flat_cell(0), &[0]);
    assert_eq!(list.particles_in_flat_cell(15), &[1]);

    list.rebuild(&[Vector2::new(0.9, 0.9)]);
    assert_eq!(list.num_particles(), 1);
    assert!(list.particles_in_flat_cell(0).is_empty());
    assert_eq!(list.particles_in_flat_cell(15), &[0]);

    list.rebuild(&[]);
    assert!(list.cells().all(|cell| cell.particles.is_empty()));
}

#[test]
fn test_neighbor_candidates_contain_all_neighbors() {
    let positions = random_particles_3d(2000);
    let cutoff = 0.1;
    let mut list = CellLinkedList::<i32, f64, 3>::new(&unit_cube(), cutoff).unwrap();
    list.rebuild(&positions);

    for (i, pos_i) in positions.iter().enumerate().step_by(37) {
        let mut candidates = Vec::new();
        list.for_each_neighbor_candidate(pos_i, |j| candidates.push(j));
        assert!(candidates.contains(&i));
        for (j, pos_j) in positions.iter().enumerate() {
            if (pos_j - pos_i).norm() <= cutoff {
                assert!(candidates.contains(&j));
            }
        }
    }
}

#[test]
fn test_construction_errors() {
    assert!(matches!(
        CellLinkedList::<i32, f64, 2>::new(&unit_square(), 0.0),
        Err(CellLinkedListError::GridConstruction(_))
    ));
    assert!(matches!(
        CellLinkedList::<i32, f64, 2>::new(&unit_square(), -0.1),
        Err(CellLinkedListError::GridConstruction(_))
    ));

    // Two cells along the first axis cannot be colored
    let narrow = cellsweep_lib::Aabb2d::new(Vector2::zeros(), Vector2::new(0.4, 1.0));
    assert_eq!(
        CellLinkedList::<i32, f64, 2>::new(&narrow, 0.25).err(),
        Some(CellLinkedListError::GridTooSmallForColoring { axis: 0, cells: 2 })
    );
    let shallow = cellsweep_lib::Aabb3d::new(Vector3::zeros(), Vector3::new(1.0, 1.0, 0.5));
    assert_eq!(
        CellLinkedList::<i32, f64, 3>::new(&shallow, 0.25).err(),
        Some(CellLinkedListError::GridTooSmallForColoring { axis: 2, cells: 2 })
    );

    assert!(CellLinkedList::<i32, f64, 2>::new(&unit_square(), 1.0 / 3.0).is_ok());
}
