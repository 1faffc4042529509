use cellsweep_lib::neighborhood_search::*;
use cellsweep_lib::{Aabb3d, CellLinkedList, CellLinkedListError};
use nalgebra::Vector3;

use crate::random_particles_3d;

fn generate_simple_test_cases(search_radius: f64) -> Vec<(Vec<Vector3<f64>>, Vec<Vec<usize>>)> {
    vec![
        (
            vec![
                Vector3::new(1.0, 1.0, 1.0),
                Vector3::new(
                    1.0 + search_radius,
                    1.0 + search_radius,
                    1.0 + search_radius,
                ),
            ],
            vec![Vec::new(), Vec::new()],
        ),
        (
            vec![
                Vector3::new(1.0, 1.0, 1.0),
                Vector3::new(1.0 + 0.9999 * search_radius, 1.0, 1.0),
            ],
            vec![vec![1], vec![0]],
        ),
        (
            vec![
                Vector3::new(1.0, 1.0, 1.0),
                Vector3::new(1.0 + search_radius * 1.0001, 1.0, 1.0),
            ],
            vec![Vec::new(), Vec::new()],
        ),
        (
            vec![
                Vector3::new(1.0, 1.0, 1.0),
                Vector3::new(1.0 + 0.9 * search_radius, 1.0, 1.0),
                Vector3::new(1.0 - 0.9 * search_radius, 1.0, 1.0),
                Vector3::new(1.0, 1.0 + 0.2 * search_radius, 1.0),
            ],
            vec![vec![1, 2, 3], vec![0, 3], vec![0, 3], vec![0, 1, 2]],
        ),
    ]
}

fn domain_around(positions: &[Vector3<f64>], search_radius: f64) -> Aabb3d<f64> {
    let mut domain = Aabb3d::from_points(positions);
    // At least three cells per axis
    domain.grow_uniformly(2.0 * search_radius);
    domain
}

#[test]
fn test_neighborhood_search_naive_simple() {
    let search_radius = 0.3;
    for (positions, expected) in generate_simple_test_cases(search_radius) {
        let mut neighborhood_list = Vec::new();
        neighborhood_search_naive(&positions, search_radius, &mut neighborhood_list);
        assert_eq!(neighborhood_list, expected);
    }
}

#[test]
fn test_neighborhood_search_cell_list_simple() {
    let search_radius = 0.3;
    for (positions, expected) in generate_simple_test_cases(search_radius) {
        let domain = domain_around(&positions, search_radius);
        let mut list = CellLinkedList::<i32, f64, 3>::new(&domain, search_radius).unwrap();
        list.rebuild(&positions);

        for parallel in [false, true] {
            let neighborhood_list = search(&list, &positions, search_radius, parallel).unwrap();
            assert_eq!(neighborhood_list, expected);
        }
    }
}

#[test]
fn test_cell_list_search_matches_naive() {
    let positions = random_particles_3d(3000);
    let search_radius = 0.08;
    let domain = Aabb3d::new(Vector3::zeros(), Vector3::repeat(1.0));
    let mut list = CellLinkedList::<i32, f64, 3>::new(&domain, 0.1).unwrap();
    list.par_rebuild(&positions);

    let mut expected = Vec::new();
    neighborhood_search_naive(&positions, search_radius, &mut expected);

    let mut seq = Vec::new();
    search_inplace(&list, &positions, search_radius, false, &mut seq).unwrap();
    let par = search(&list, &positions, search_radius, true).unwrap();

    assert_eq!(seq, expected);
    assert_eq!(par, expected);

    let stats = compute_neighborhood_stats(&par);
    assert_eq!(stats.histogram.iter().sum::<usize>(), positions.len());
    assert_eq!(
        stats.max_neighbors,
        expected.iter().map(Vec::len).max().unwrap_or(0)
    );
}

#[test]
fn test_search_inplace_reuses_lists() {
    let positions = vec![Vector3::new(0.5, 0.5, 0.5), Vector3::new(0.55, 0.5, 0.5)];
    let domain = Aabb3d::new(Vector3::zeros(), Vector3::repeat(1.0));
    let mut list = CellLinkedList::<i32, f64, 3>::new(&domain, 0.1).unwrap();
    list.rebuild(&positions);

    let mut neighborhood_list = vec![vec![7, 8, 9]; 5];
    search_inplace(&list, &positions, 0.1, false, &mut neighborhood_list).unwrap();
    assert_eq!(neighborhood_list, vec![vec![1], vec![0]]);

    let mut neighborhood_list = vec![vec![7, 8, 9]; 5];
    search_inplace(&list, &positions, 0.1, true, &mut neighborhood_list).unwrap();
    assert_eq!(neighborhood_list, vec![vec![1], vec![0]]);

    assert_eq!(
        search(&list, &positions, 0.11, false),
        Err(CellLinkedListError::SearchRadiusExceedsCellSize {
            radius: 0.11,
            cell_size: 0.1
        })
    );
}

#[test]
fn test_search_rejects_stale_cell_linked_list() {
    let positions = vec![Vector3::new(0.5, 0.5, 0.5), Vector3::new(0.55, 0.5, 0.5)];
    let domain = Aabb3d::new(Vector3::zeros(), Vector3::repeat(1.0));
    let mut list = CellLinkedList::<i32, f64, 3>::new(&domain, 0.1).unwrap();
    list.rebuild(&positions[..1]);

    for enable_multi_threading in [false, true] {
        assert_eq!(
            search(&list, &positions, 0.1, enable_multi_threading),
            Err(CellLinkedListError::ParticleCountMismatch {
                positions: 2,
                particles: 1
            })
        );
    }

    let mut neighborhood_list = Vec::new();
    assert!(search_inplace(&list, &positions[..1], 0.1, true, &mut neighborhood_list).is_ok());
    assert_eq!(neighborhood_list, vec![Vec::<usize>::new()]);
}
