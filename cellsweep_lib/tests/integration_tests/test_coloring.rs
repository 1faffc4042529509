use cellsweep_lib::split_cell_lists::{SplitCellLists, cell_color, num_colors};
use cellsweep_lib::uniform_grid::{UniformGrid, UniformGrid2d, UniformGrid3d};
use cellsweep_lib::{CellLinkedListError, Index, Real};
use nalgebra::{Vector2, Vector3};

fn check_coloring<I: Index, R: Real, const D: usize>(grid: &UniformGrid<I, R, D>) {
    let split_cell_lists = SplitCellLists::new(grid).unwrap();
    assert_eq!(split_cell_lists.num_colors(), num_colors(D));

    // Every cell is in exactly one group
    let mut all: Vec<_> = split_cell_lists.groups().iter().flatten().copied().collect();
    all.sort_unstable();
    assert_eq!(all, (0..grid.num_cells()).collect::<Vec<_>>());

    for (color, group) in split_cell_lists.groups().iter().enumerate() {
        assert!(group.windows(2).all(|w| w[0] < w[1]));
        assert!(!group.is_empty(), "grids with at least three cells per axis use all colors");

        let cells: Vec<_> = group
            .iter()
            .map(|&flat| grid.try_unflatten_cell_index(flat).unwrap())
            .collect();
        for a in &cells {
            assert_eq!(cell_color(a), color);
            let stencil_a = grid.neighbor_stencil(a);
            for b in cells.iter().filter(|b| *b != a) {
                assert!(!grid.are_stencil_neighbors(a, b));
                let stencil_b = grid.neighbor_stencil(b);
                assert!(
                    stencil_a.iter().all(|c| !stencil_b.contains(c)),
                    "cells {:?} and {:?} of color {} share stencil cells",
                    a,
                    b,
                    color
                );
            }
        }
    }
}

#[test]
fn test_coloring_independence_2d() {
    for n in [[3, 3], [3, 7], [8, 5], [10, 10]] {
        let grid = UniformGrid2d::<i32, f64>::new(&Vector2::zeros(), &n, 0.5).unwrap();
        check_coloring(&grid);
    }
}

#[test]
fn test_coloring_independence_3d() {
    for n in [[3, 3, 3], [4, 5, 6], [7, 3, 9]] {
        let grid = UniformGrid3d::<i64, f32>::new(&Vector3::zeros(), &n, 1.0).unwrap();
        check_coloring(&grid);
    }
}

#[test]
fn test_coloring_rejects_small_grids() {
    let grid = UniformGrid2d::<i32, f64>::new(&Vector2::zeros(), &[5, 2], 1.0).unwrap();
    assert_eq!(
        SplitCellLists::new(&grid).err(),
        Some(CellLinkedListError::GridTooSmallForColoring { axis: 1, cells: 2 })
    );

    let grid = UniformGrid3d::<i32, f64>::new(&Vector3::zeros(), &[1, 4, 4], 1.0).unwrap();
    assert_eq!(
        SplitCellLists::new(&grid).err(),
        Some(CellLinkedListError::GridTooSmallForColoring { axis: 0, cells: 1 })
    );
}
