//! Uniform background grid over the simulation domain with cells sized to the interaction cutoff radius

use arrayvec::ArrayVec;
use nalgebra::SVector;
use num_traits::Bounded;
use thiserror::Error as ThisError;

use crate::{AxisAlignedBoundingBox, Index, Real};

/// Maximum number of cells in a neighbor stencil (`3^3` in 3D)
pub const MAX_STENCIL_SIZE: usize = 27;

/// Stack allocated storage for the cells of one neighbor stencil
pub type CellStencil<I, const D: usize> = ArrayVec<CellIndex<I, D>, MAX_STENCIL_SIZE>;

/// An index tuple of a cell in a `D`-dimensional cartesian grid (index along each axis)
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct CellIndex<I: Index, const D: usize> {
    index: [I; D],
}

/// Cell index in a 2D grid
pub type CellIndex2d<I> = CellIndex<I, 2>;
/// Cell index in a 3D grid
pub type CellIndex3d<I> = CellIndex<I, 3>;

/// Uniform cartesian grid of square (2D) or cubic (3D) cells
///
/// **Grid construction** The origin of the grid is placed on the min coordinates of the domain AABB.
/// The domain is then filled with uniformly sized cells. The last layer of cells that may not fit
/// entirely within the upper extents of the domain is still considered part of the grid, so the
/// grid's own AABB can be larger than the domain by less than one `cell_size`.
///
/// **Cell indices** Cells can either be addressed by an index tuple along the cartesian axes or by a flat
/// index in row-major order (the first axis varies slowest). Strongly typed [`CellIndex`] values are
/// obtained through [`get_cell`](UniformGrid::get_cell) or [`enclosing_cell`](UniformGrid::enclosing_cell)
/// which both guarantee that the cell is part of the grid.
#[derive(Clone, PartialEq, Debug)]
pub struct UniformGrid<I: Index, R: Real, const D: usize> {
    /// AABB of the grid, the max corner is aligned to the cell layers
    aabb: AxisAlignedBoundingBox<R, D>,
    /// The edge length of the cells
    cell_size: R,
    /// The number of cells of the grid in each cartesian direction
    n_cells_per_dim: [I; D],
    /// Total number of cells
    n_cells: usize,
}

/// Uniform grid in 2D
pub type UniformGrid2d<I, R> = UniformGrid<I, R, 2>;
/// Uniform grid in 3D
pub type UniformGrid3d<I, R> = UniformGrid<I, R, 3>;

/// Error type for the construction of a [`UniformGrid`]
#[rustfmt::skip]
#[derive(Clone, Eq, PartialEq, Debug, ThisError)]
pub enum GridConstructionError<I: Index, R: Real> {
    /// The cell size is invalid, it has to be larger than zero
    #[error("invalid cell size `{0}` supplied, cell size has to be larger than zero")]
    InvalidCellSize(R),
    /// The AABB is degenerate, every dimension of the AABB has to have non-zero extents
    #[error("degenerate AABB supplied, every dimension of the AABB has to have non-zero extents")]
    DegenerateAabb,
    /// The AABB is inconsistent, the min corner has to be smaller than the max corner along every axis
    #[error("inconsistent AABB supplied, every dimension of the AABB has to have an extent larger than zero")]
    InconsistentAabb,
    /// The index type is too small to index the number of cells in each dimension of the domain
    #[error("index type is too small to index number of cells per dimension of the domain (max index: {max})", max = <I as Bounded>::max_value())]
    IndexTypeTooSmallCellsPerDim,
    /// The index type is too small to index the total number of cells in the whole domain
    #[error("index type is too small to index the total number of cells in the whole domain ({0:?}, max index: {max})", max = <I as Bounded>::max_value())]
    IndexTypeTooSmallTotalCells(Vec<I>),
    /// The real type is too small to store the coordinates of all cells in the domain
    #[error("real type is too small to store the coordinates of all cells in the domain (max value: {max})", max = <R as Bounded>::max_value())]
    RealTypeTooSmallDomainSize,
}

impl<I: Index, R: Real, const D: usize> UniformGrid<I, R, D> {
    /// Constructs a new grid covering the given domain AABB with cells of the given size
    ///
    /// The grid will at least contain the AABB but may be larger depending on the cell size.
    pub fn from_aabb(
        aabb: &AxisAlignedBoundingBox<R, D>,
        cell_size: R,
    ) -> Result<Self, GridConstructionError<I, R>> {
        if !(cell_size > R::zero()) {
            return Err(GridConstructionError::InvalidCellSize(cell_size));
        }

        if !aabb.is_consistent() {
            return Err(GridConstructionError::InconsistentAabb);
        }

        if aabb.is_degenerate() {
            return Err(GridConstructionError::DegenerateAabb);
        }

        let n_cells_real = aabb.extents() / cell_size;
        let n_cells_per_dim = Self::checked_n_cells_per_dim(&n_cells_real)
            .ok_or(GridConstructionError::IndexTypeTooSmallCellsPerDim)?;

        Self::new(aabb.min(), &n_cells_per_dim, cell_size)
    }

    /// Constructs a new grid extending in positive axis directions from the min coordinate by the specified number of cells of the given size
    pub fn new(
        min: &SVector<R, D>,
        n_cells_per_dim: &[I; D],
        cell_size: R,
    ) -> Result<Self, GridConstructionError<I, R>> {
        if !(cell_size > R::zero()) {
            return Err(GridConstructionError::InvalidCellSize(cell_size));
        }

        if n_cells_per_dim.iter().any(|n| *n <= I::zero()) {
            return Err(GridConstructionError::DegenerateAabb);
        }

        let aabb = Self::checked_aabb(min, n_cells_per_dim, cell_size)
            .ok_or(GridConstructionError::RealTypeTooSmallDomainSize)?;

        // Flat cell indices have to be representable by the index type and by `usize`
        let n_cells = Self::checked_num_cells(n_cells_per_dim).ok_or_else(|| {
            GridConstructionError::IndexTypeTooSmallTotalCells(n_cells_per_dim.to_vec())
        })?;

        Ok(Self {
            aabb,
            cell_size,
            n_cells_per_dim: *n_cells_per_dim,
            n_cells,
        })
    }

    /// Returns the bounding box of the grid
    #[inline(always)]
    pub fn aabb(&self) -> &AxisAlignedBoundingBox<R, D> {
        &self.aabb
    }

    /// Returns the cell size used by the grid
    #[inline(always)]
    pub fn cell_size(&self) -> R {
        self.cell_size
    }

    /// Returns the number of grid cells per dimension of the grid
    #[inline(always)]
    pub fn cells_per_dim(&self) -> &[I; D] {
        &self.n_cells_per_dim
    }

    /// Returns the total number of cells of the grid
    #[inline(always)]
    pub fn num_cells(&self) -> usize {
        self.n_cells
    }

    /// Converts a cell index tuple into a strongly typed index, returns `None` if the corresponding cell is not part of the grid
    #[inline(always)]
    pub fn get_cell(&self, ijk: [I; D]) -> Option<CellIndex<I, D>> {
        if self.cell_exists(&ijk) {
            Some(CellIndex::from_ijk(ijk))
        } else {
            None
        }
    }

    /// Returns whether a cell with the given index tuple exists in the grid
    #[inline(always)]
    pub fn cell_exists(&self, ijk: &[I; D]) -> bool {
        ijk.iter()
            .zip(self.n_cells_per_dim.iter())
            .all(|(c, n)| *c >= I::zero() && c < n)
    }

    /// Flattens the cell index to a single row-major index
    #[inline(always)]
    pub fn flatten_cell_index(&self, cell: &CellIndex<I, D>) -> usize {
        let mut flat = 0;
        for (c, n) in cell.index.iter().zip(self.n_cells_per_dim.iter()) {
            flat = flat * n.to_usize_unchecked() + c.to_usize_unchecked();
        }
        flat
    }

    /// Converts a flat cell index back to a cell index tuple, does not check if the cell is part of the grid
    #[inline(always)]
    fn unflatten_cell_index(&self, mut flat_index: usize) -> [I; D] {
        let mut ijk = [I::zero(); D];
        for dim in (0..D).rev() {
            let n = self.n_cells_per_dim[dim].to_usize_unchecked();
            ijk[dim] = I::from_usize(flat_index % n).unwrap_or_else(I::zero);
            flat_index /= n;
        }
        ijk
    }

    /// Converts a flat cell index back to a strongly typed cell index, returns `None` if the index is not part of the grid
    #[inline(always)]
    pub fn try_unflatten_cell_index(&self, flat_index: usize) -> Option<CellIndex<I, D>> {
        if flat_index < self.n_cells {
            Some(CellIndex::from_ijk(self.unflatten_cell_index(flat_index)))
        } else {
            None
        }
    }

    /// Returns an iterator over all cells of the grid in ascending flat index order
    pub fn cells(&self) -> impl Iterator<Item = CellIndex<I, D>> + '_ {
        (0..self.n_cells).map(move |flat| CellIndex::from_ijk(self.unflatten_cell_index(flat)))
    }

    /// Returns the cell enclosing a point with the given coordinates
    ///
    /// The index along every axis is the floor of the distance to the grid origin divided by the cell size,
    /// clamped to the valid index range of the grid. Points outside of the grid (or with non-finite
    /// coordinates) are therefore assigned to the closest boundary cell.
    #[inline(always)]
    pub fn enclosing_cell(&self, coord: &SVector<R, D>) -> CellIndex<I, D> {
        let normalized_coord = (coord - self.aabb.min()) / self.cell_size;
        let mut ijk = [I::zero(); D];
        for dim in 0..D {
            let max_index = self.n_cells_per_dim[dim] - I::one();
            let floored = normalized_coord[dim].floor();
            ijk[dim] = if !(floored > R::zero()) {
                I::zero()
            } else {
                floored
                    .to_index::<I>()
                    .map(|c| c.min(max_index))
                    .unwrap_or(max_index)
            };
        }
        CellIndex::from_ijk(ijk)
    }

    /// Returns the real-valued coordinates of the lower corner of a cell
    #[inline(always)]
    pub fn cell_origin(&self, cell: &CellIndex<I, D>) -> SVector<R, D> {
        let mut origin = *self.aabb.min();
        for dim in 0..D {
            origin[dim] += cell.index[dim].to_real_unchecked::<R>() * self.cell_size;
        }
        origin
    }

    /// Returns the real-valued coordinates of the geometric center of a cell
    #[inline(always)]
    pub fn cell_center(&self, cell: &CellIndex<I, D>) -> SVector<R, D> {
        self.cell_origin(cell).add_scalar(self.cell_size.half())
    }

    /// Returns all cells within a Chebyshev distance of one cell step of the given cell (including the cell itself)
    ///
    /// The stencil is clipped to the grid, i.e. boundary cells have fewer than `3^D` stencil cells.
    /// The cells are returned in ascending flat index order.
    pub fn neighbor_stencil(&self, cell: &CellIndex<I, D>) -> CellStencil<I, D> {
        let mut lower = [I::zero(); D];
        let mut upper = [I::zero(); D];
        for dim in 0..D {
            let c = cell.index[dim];
            lower[dim] = if c > I::zero() { c - I::one() } else { c };
            upper[dim] = (c + I::one()).min(self.n_cells_per_dim[dim] - I::one());
        }

        let mut stencil = CellStencil::new();
        let mut current = lower;
        loop {
            stencil.push(CellIndex::from_ijk(current));

            // Odometer style increment with the last axis varying fastest
            let mut dim = D;
            loop {
                if dim == 0 {
                    return stencil;
                }
                dim -= 1;
                if current[dim] < upper[dim] {
                    current[dim] += I::one();
                    break;
                }
                current[dim] = lower[dim];
            }
        }
    }

    /// Returns whether the two cells are equal or direct neighbors (Chebyshev distance of at most one cell step)
    pub fn are_stencil_neighbors(&self, a: &CellIndex<I, D>, b: &CellIndex<I, D>) -> bool {
        a.index
            .iter()
            .zip(b.index.iter())
            .all(|(ca, cb)| (*ca.max(cb) - *ca.min(cb)) <= I::one())
    }

    fn checked_n_cells_per_dim(n_cells_real: &SVector<R, D>) -> Option<[I; D]> {
        let mut n_cells_per_dim = [I::zero(); D];
        for dim in 0..D {
            n_cells_per_dim[dim] = I::one().max(n_cells_real[dim].ceil().to_index()?);
        }
        Some(n_cells_per_dim)
    }

    fn checked_aabb(
        min: &SVector<R, D>,
        n_cells_per_dim: &[I; D],
        cell_size: R,
    ) -> Option<AxisAlignedBoundingBox<R, D>> {
        let mut max = *min;
        for dim in 0..D {
            max[dim] += cell_size * n_cells_per_dim[dim].to_real()?;
            if !max[dim].is_finite() {
                return None;
            }
        }

        Some(AxisAlignedBoundingBox::new(*min, max))
    }

    fn checked_num_cells(n_cells_per_dim: &[I; D]) -> Option<usize> {
        let mut n_cells = I::one();
        for n in n_cells_per_dim {
            n_cells = n_cells.checked_mul(n)?;
        }
        n_cells.to_usize()
    }
}

impl<I: Index, const D: usize> CellIndex<I, D> {
    #[inline(always)]
    pub(crate) fn from_ijk(cell_ijk: [I; D]) -> Self {
        Self { index: cell_ijk }
    }

    /// Returns a reference to the index tuple of the cell
    #[inline(always)]
    pub fn index(&self) -> &[I; D] {
        &self.index
    }
}
