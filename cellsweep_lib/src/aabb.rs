//! Axis-aligned bounding boxes used for domain bounds and shape bounds

use std::fmt;
use std::fmt::Debug;

use nalgebra::SVector;
use rayon::prelude::*;

use crate::{Real, RealConvert, ThreadSafe};

/// Type representing an axis aligned bounding box in arbitrary dimensions
#[derive(Clone, PartialEq)]
pub struct AxisAlignedBoundingBox<R: Real, const D: usize> {
    min: SVector<R, D>,
    max: SVector<R, D>,
}

/// Convenience type alias for an AABB in two dimensions
pub type Aabb2d<R> = AxisAlignedBoundingBox<R, 2>;
/// Convenience type alias for an AABB in three dimensions
pub type Aabb3d<R> = AxisAlignedBoundingBox<R, 3>;

impl<R, const D: usize> AxisAlignedBoundingBox<R, D>
where
    R: Real,
    SVector<R, D>: ThreadSafe,
{
    /// Constructs the smallest AABB fitting around all the given points, parallel version
    pub fn par_from_points(points: &[SVector<R, D>]) -> Self {
        match points.split_first() {
            None => Self::zeros(),
            Some((first, rest)) => {
                let initial_aabb = Self::from_point(*first);
                rest.par_iter()
                    .fold(
                        || initial_aabb.clone(),
                        |mut aabb, next_point| {
                            aabb.join_with_point(next_point);
                            aabb
                        },
                    )
                    .reduce(
                        || initial_aabb.clone(),
                        |mut final_aabb, aabb| {
                            final_aabb.join(&aabb);
                            final_aabb
                        },
                    )
            }
        }
    }
}

impl<R, const D: usize> AxisAlignedBoundingBox<R, D>
where
    R: Real,
{
    /// Constructs a degenerate AABB with min and max set to zero
    #[inline(always)]
    pub fn zeros() -> Self {
        Self::from_point(SVector::zeros())
    }

    /// Constructs an AABB with the given min and max bounding points
    #[inline(always)]
    pub fn new(min: SVector<R, D>, max: SVector<R, D>) -> Self {
        Self { min, max }
    }

    /// Constructs a degenerate AABB with zero extents centered at the given point
    #[inline(always)]
    pub fn from_point(point: SVector<R, D>) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Constructs the smallest AABB fitting around all the given points
    /// ```
    /// use cellsweep_lib::Aabb2d;
    /// use nalgebra::Vector2;
    ///
    /// assert_eq!(Aabb2d::<f64>::from_points(&[]), Aabb2d::<f64>::zeros());
    ///
    /// let aabb = Aabb2d::<f64>::from_points(&[
    ///     Vector2::new(1.0, 1.0),
    ///     Vector2::new(0.5, 3.0),
    ///     Vector2::new(-1.0, 1.0)
    /// ]);
    /// assert_eq!(aabb.min(), &Vector2::new(-1.0, 1.0));
    /// assert_eq!(aabb.max(), &Vector2::new(1.0, 3.0));
    /// ```
    pub fn from_points(points: &[SVector<R, D>]) -> Self {
        let mut point_iter = points.iter();
        if let Some(first_point) = point_iter.next().cloned() {
            let mut aabb = Self::from_point(first_point);
            for next_point in point_iter {
                aabb.join_with_point(next_point)
            }
            aabb
        } else {
            Self::zeros()
        }
    }

    /// Tries to convert the AABB from one real type to another real type, returns None if conversion fails
    pub fn try_convert<T>(&self) -> Option<AxisAlignedBoundingBox<T, D>>
    where
        T: Real,
    {
        Some(AxisAlignedBoundingBox::new(
            self.min.try_convert()?,
            self.max.try_convert()?,
        ))
    }

    /// Returns the min coordinate of the bounding box
    #[inline(always)]
    pub fn min(&self) -> &SVector<R, D> {
        &self.min
    }

    /// Returns the max coordinate of the bounding box
    #[inline(always)]
    pub fn max(&self) -> &SVector<R, D> {
        &self.max
    }

    /// Returns whether the AABB is consistent, i.e. `aabb.min()[i] <= aabb.max()[i]` for all `i`
    pub fn is_consistent(&self) -> bool {
        self.min.iter().zip(self.max.iter()).all(|(lo, hi)| lo <= hi)
    }

    /// Returns whether the AABB is degenerate in any dimension, i.e. `aabb.min()[i] == aabb.max()[i]` for any `i`
    /// ```
    /// use cellsweep_lib::Aabb2d;
    /// use nalgebra::Vector2;
    /// assert_eq!(Aabb2d::<f64>::zeros().is_degenerate(), true);
    /// assert_eq!(Aabb2d::new(Vector2::new(0.0, 1.0), Vector2::new(1.0, 1.0)).is_degenerate(), true);
    /// assert_eq!(Aabb2d::new(Vector2::new(-1.0, 0.0), Vector2::new(2.0, 2.0)).is_degenerate(), false);
    /// ```
    pub fn is_degenerate(&self) -> bool {
        self.min.iter().zip(self.max.iter()).any(|(lo, hi)| lo == hi)
    }

    /// Returns the extents of the bounding box (vector connecting min and max point of the box)
    #[inline(always)]
    pub fn extents(&self) -> SVector<R, D> {
        self.max - self.min
    }

    /// Returns the geometric centroid of the AABB (mean of the corner points)
    pub fn centroid(&self) -> SVector<R, D> {
        self.min + self.extents().map(|e| e.half())
    }

    /// Checks if the given point is inside of the AABB, the AABB is considered to be half-open to its max coordinate
    pub fn contains_point(&self, point: &SVector<R, D>) -> bool {
        (0..D).all(|i| point[i] >= self.min[i] && point[i] < self.max[i])
    }

    /// Checks if the given point is inside of the AABB including all of its faces
    pub fn contains_point_closed(&self, point: &SVector<R, D>) -> bool {
        (0..D).all(|i| point[i] >= self.min[i] && point[i] <= self.max[i])
    }

    /// Enlarges this AABB to the smallest AABB enclosing both itself and another AABB
    pub fn join(&mut self, other: &Self) {
        self.min = self.min.inf(&other.min);
        self.max = self.max.sup(&other.max);
    }

    /// Enlarges this AABB to the smallest AABB enclosing both itself and another point
    pub fn join_with_point(&mut self, point: &SVector<R, D>) {
        self.min = self.min.inf(point);
        self.max = self.max.sup(point);
    }

    /// Grows this AABB uniformly in all directions by the given scalar margin (i.e. adding the margin to min/max extents)
    pub fn grow_uniformly(&mut self, margin: R) {
        self.min -= SVector::repeat(margin);
        self.max += SVector::repeat(margin);
    }

    /// Returns a copy of this AABB grown uniformly by the given margin
    pub fn grown(&self, margin: R) -> Self {
        let mut aabb = self.clone();
        aabb.grow_uniformly(margin);
        aabb
    }
}

impl<R, const D: usize> Debug for AxisAlignedBoundingBox<R, D>
where
    R: Real,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AxisAlignedBoundingBox")
            .field("min", &self.min.as_slice())
            .field("max", &self.max.as_slice())
            .finish()
    }
}

#[test]
fn test_aabb_contains_point() {
    use nalgebra::Vector3;
    let aabb = Aabb3d::<f64>::new(Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0));

    assert!(aabb.contains_point(&Vector3::new(0.5, 0.5, 0.5)));
    assert!(aabb.contains_point(&Vector3::new(0.0, 0.0, 0.0)));
    assert!(!aabb.contains_point(&Vector3::new(1.0, 0.0, 0.0)));
    assert!(!aabb.contains_point(&Vector3::new(1.0, 1.0, 1.0)));

    assert!(aabb.contains_point_closed(&Vector3::new(1.0, 1.0, 1.0)));
    assert!(!aabb.contains_point_closed(&Vector3::new(1.0, 1.0, 1.0001)));
}

#[test]
fn test_aabb_par_from_points() {
    use nalgebra::Vector2;
    let points: Vec<_> = (0..1000)
        .map(|i| Vector2::new(i as f64 * 0.01, -(i as f64) * 0.02))
        .collect();

    let aabb = Aabb2d::par_from_points(&points);
    assert_eq!(aabb, Aabb2d::from_points(&points));
    assert_eq!(aabb.min(), &Vector2::new(0.0, -19.98));
    assert_eq!(aabb.max(), &Vector2::new(9.99, 0.0));
}
