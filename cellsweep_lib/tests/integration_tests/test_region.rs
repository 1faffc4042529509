use cellsweep_lib::particles::Sortability;
use cellsweep_lib::region::*;
use cellsweep_lib::shape::{Ball, Shape};
use cellsweep_lib::{Aabb2d, CellLinkedList};
use nalgebra::Vector2;

use crate::{lattice_2d, unit_square};

/// Shape without any points
struct EmptyShape;

impl Shape<f64, 2> for EmptyShape {
    fn check_contain(&self, _point: &Vector2<f64>) -> bool {
        false
    }

    fn find_signed_distance(&self, _point: &Vector2<f64>) -> f64 {
        f64::INFINITY
    }

    fn find_closest_point(&self, point: &Vector2<f64>) -> Vector2<f64> {
        point.add_scalar(f64::INFINITY)
    }

    fn find_bounds(&self) -> Aabb2d<f64> {
        Aabb2d::from_point(Vector2::repeat(1e6))
    }
}

fn setup() -> (CellLinkedList<i32, f64, 2>, Vec<Vector2<f64>>) {
    let positions = lattice_2d(10, 0.1);
    let mut list = CellLinkedList::new(&unit_square(), 0.1).unwrap();
    list.rebuild(&positions);
    (list, positions)
}

#[test]
fn test_surface_of_circle_at_corner() {
    let (_, positions) = setup();
    let circle = Ball::new(Vector2::zeros(), 0.3);

    let expected: Vec<usize> = (0..positions.len())
        .filter(|&i| (positions[i].norm() - 0.3).abs() < 0.1)
        .collect();
    assert!(!expected.is_empty());

    for parallel in [false, true] {
        let tagged = tag_surface_particles(&positions, &circle, 0.1, parallel);
        assert_eq!(tagged.part().name(), SURFACE);
        assert_eq!(tagged.part().particles(), expected.as_slice());
    }
}

#[test]
fn test_inner_layers_of_circle() {
    let (_, positions) = setup();
    let center = Vector2::new(0.5, 0.5);
    let circle = Ball::new(center, 0.3);

    let expected: Vec<usize> = (0..positions.len())
        .filter(|&i| ((positions[i] - center).norm() - 0.3).abs() < 0.2 - 1e-12)
        .collect();

    let tagged = tag_inner_layer_particles(&positions, &circle, 0.1, 2.0, false);
    assert_eq!(tagged.part().name(), INNER_LAYERS);
    for i in expected {
        assert!(tagged.part().particles().contains(&i));
    }
    assert!(tagged.part().len() < positions.len());
}

#[test]
fn test_empty_shape_tags_nothing() {
    let (list, positions) = setup();

    for parallel in [false, true] {
        assert!(
            tag_particles_in_volume("empty", &positions, &EmptyShape, parallel)
                .part()
                .is_empty()
        );
        assert!(tag_surface_particles(&positions, &EmptyShape, 0.1, parallel).part().is_empty());
        assert!(
            tag_inner_layer_particles(&positions, &EmptyShape, 0.1, 3.0, parallel)
                .part()
                .is_empty()
        );
        assert!(tag_cells_by_shape("empty", &list, &EmptyShape, parallel).is_empty());
        assert!(tag_cells_near_surface(&list, &EmptyShape, parallel).is_empty());
    }
}

#[test]
fn test_whole_domain_shape_tags_everything() {
    let (list, positions) = setup();
    let everything = unit_square().grown(0.01);

    for parallel in [false, true] {
        let volume = tag_particles_in_volume("all", &positions, &everything, parallel);
        assert_eq!(volume.part().particles(), (0..positions.len()).collect::<Vec<_>>().as_slice());

        let cells = tag_cells_by_shape("all", &list, &everything, parallel);
        assert_eq!(cells.name(), "all");
        assert_eq!(cells.cells(), (0..list.grid().num_cells()).collect::<Vec<_>>().as_slice());
    }

    // Particles of the outermost lattice layer are the only ones close to the boundary of the box
    let surface = tag_surface_particles(&positions, &everything, 0.1, false);
    assert_eq!(surface.part().len(), 36);
}

#[test]
fn test_cells_near_circle() {
    let (list, _) = setup();
    let circle = Ball::new(Vector2::new(0.5, 0.5), 0.3);

    let near = tag_cells_near_surface(&list, &circle, false);
    let inside = tag_cells_by_shape("circle", &list, &circle, false);
    assert_eq!(near.name(), NEAR_BODY_SURFACE);
    assert!(!near.is_empty());
    assert!(near.len() < list.grid().num_cells());

    let flat_cell = |x: f64, y: f64| {
        let grid = list.grid();
        grid.flatten_cell_index(&grid.enclosing_cell(&Vector2::new(x, y)))
    };
    assert!(near.cells().contains(&flat_cell(0.8, 0.5)));
    assert!(inside.cells().contains(&flat_cell(0.5, 0.5)));
    assert!(inside.cells().contains(&flat_cell(0.8, 0.5)));

    // Corner cells are too far from the circle for both predicates
    assert!(!near.cells().contains(&0));
    assert!(!inside.cells().contains(&0));
}

#[test]
fn test_retagging_is_idempotent() {
    let (list, positions) = setup();
    let circle = Ball::new(Vector2::new(0.3, 0.6), 0.25);

    for parallel in [false, true] {
        let first = tag_surface_particles(&positions, &circle, 0.1, parallel);
        let second = tag_surface_particles(&positions, &circle, 0.1, parallel);
        assert_eq!(first.part(), second.part());

        assert_eq!(
            tag_cells_by_shape("c", &list, &circle, parallel),
            tag_cells_by_shape("c", &list, &circle, parallel)
        );
        assert_eq!(
            tag_cells_near_surface(&list, &circle, parallel),
            tag_cells_near_surface(&list, &circle, !parallel)
        );
    }
}

#[test]
fn test_tagged_particles_become_unsortable() {
    let (_, positions) = setup();
    let mut sortability = Sortability::all_sortable(positions.len());

    let corner = Ball::new(Vector2::zeros(), 0.2);
    let part = tag_particles_in_volume("corner", &positions, &corner, false)
        .mark_unsortable(&mut sortability);
    assert_eq!(part.particles(), &[0, 1, 10]);
    assert_eq!(sortability.count_sortable(), positions.len() - 3);
    assert!(part.particles().iter().all(|&i| !sortability.is_sortable(i)));
}
