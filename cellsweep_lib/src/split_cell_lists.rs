//! Coloring of grid cells into independent groups ("split cell lists")
//!
//! Every cell gets one of `3^D` colors computed from its index modulo three along every axis.
//! Two distinct cells of the same color differ by a multiple of three along at least one axis,
//! so their neighbor stencils are disjoint. All cells of one color can therefore be processed
//! concurrently, even by kernels that write to particles of the whole stencil.

use log::trace;

use crate::cell_linked_list::CellLinkedListError;
use crate::uniform_grid::{CellIndex, UniformGrid};
use crate::{Index, Real};

/// Returns the number of colors used in `D` dimensions (`3^D`)
pub const fn num_colors(dim: usize) -> usize {
    3usize.pow(dim as u32)
}

/// Returns the color of a cell
///
/// ```
/// use cellsweep_lib::split_cell_lists::cell_color;
/// use cellsweep_lib::uniform_grid::UniformGrid2d;
/// use nalgebra::Vector2;
///
/// let grid = UniformGrid2d::<i32, f64>::new(&Vector2::zeros(), &[6, 6], 1.0).unwrap();
/// assert_eq!(cell_color(&grid.get_cell([0, 0]).unwrap()), 0);
/// assert_eq!(cell_color(&grid.get_cell([1, 0]).unwrap()), 1);
/// assert_eq!(cell_color(&grid.get_cell([0, 1]).unwrap()), 3);
/// assert_eq!(cell_color(&grid.get_cell([5, 4]).unwrap()), 2 + 3 * 1);
/// ```
pub fn cell_color<I: Index, const D: usize>(cell: &CellIndex<I, D>) -> usize {
    let mut color = 0;
    let mut weight = 1;
    for c in cell.index() {
        color += (*c % I::three()).to_usize_unchecked() * weight;
        weight *= 3;
    }
    color
}

/// Checks that the grid has at least three cells along every axis which is required for a valid coloring
pub fn check_colorable<I: Index, R: Real, const D: usize>(
    grid: &UniformGrid<I, R, D>,
) -> Result<(), CellLinkedListError<I, R>> {
    for (axis, cells) in grid.cells_per_dim().iter().enumerate() {
        if *cells < I::three() {
            return Err(CellLinkedListError::GridTooSmallForColoring {
                axis,
                cells: *cells,
            });
        }
    }
    Ok(())
}

/// Partition of all grid cells into `3^D` color groups
///
/// Cells are stored by their flat index. Within every group, the cells are ordered by ascending flat index.
#[derive(Clone, Debug, Default)]
pub struct SplitCellLists {
    color_groups: Vec<Vec<usize>>,
}

impl SplitCellLists {
    /// Computes the coloring of all cells of the given grid
    pub fn new<I: Index, R: Real, const D: usize>(
        grid: &UniformGrid<I, R, D>,
    ) -> Result<Self, CellLinkedListError<I, R>> {
        check_colorable(grid)?;

        let mut split_cell_lists = Self {
            color_groups: vec![Vec::new(); num_colors(D)],
        };
        split_cell_lists.recompute(grid);
        Ok(split_cell_lists)
    }

    /// Recomputes the color groups from scratch, the grid has to be colorable
    pub(crate) fn recompute<I: Index, R: Real, const D: usize>(
        &mut self,
        grid: &UniformGrid<I, R, D>,
    ) {
        self.color_groups.resize_with(num_colors(D), Vec::new);
        let expected_group_size = grid.num_cells() / num_colors(D) + 1;
        for group in self.color_groups.iter_mut() {
            group.clear();
            group.reserve(expected_group_size);
        }

        for (flat_index, cell) in grid.cells().enumerate() {
            self.color_groups[cell_color(&cell)].push(flat_index);
        }

        trace!(
            "Colored {} cells into {} groups (group sizes: {:?})",
            grid.num_cells(),
            self.color_groups.len(),
            self.color_groups.iter().map(Vec::len).collect::<Vec<_>>()
        );
    }

    /// Returns the number of color groups
    pub fn num_colors(&self) -> usize {
        self.color_groups.len()
    }

    /// Returns the flat cell indices of the given color
    pub fn group(&self, color: usize) -> &[usize] {
        &self.color_groups[color]
    }

    /// Returns all color groups in ascending color order
    pub fn groups(&self) -> &[Vec<usize>] {
        &self.color_groups
    }
}
