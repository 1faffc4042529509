//! Geometric queries consumed by the region tagging and basic shapes implementing them

use nalgebra::SVector;

use crate::{AxisAlignedBoundingBox, Real, ThreadSafe};

/// Geometric region queried by the region tagging functions
///
/// Signed distances are negative inside of the shape and positive outside.
pub trait Shape<R: Real, const D: usize>: ThreadSafe {
    /// Returns whether the point is inside of the shape
    fn check_contain(&self, point: &SVector<R, D>) -> bool;

    /// Returns the signed distance of the point to the boundary of the shape
    fn find_signed_distance(&self, point: &SVector<R, D>) -> R;

    /// Returns the point on the boundary of the shape that is closest to the given point
    fn find_closest_point(&self, point: &SVector<R, D>) -> SVector<R, D>;

    /// Returns the bounding box of the shape
    fn find_bounds(&self) -> AxisAlignedBoundingBox<R, D>;

    /// Cheap test whether the point is within the given distance of the shape's bounds
    ///
    /// Used to skip more expensive queries, may return `true` for points that are farther away.
    fn check_not_far(&self, point: &SVector<R, D>, tolerance: R) -> bool {
        self.find_bounds()
            .grown(tolerance)
            .contains_point_closed(point)
    }
}

/// Disk (2D) or ball (3D) shape
#[derive(Clone, PartialEq, Debug)]
pub struct Ball<R: Real, const D: usize> {
    center: SVector<R, D>,
    radius: R,
}

impl<R: Real, const D: usize> Ball<R, D> {
    /// Creates a ball with the given center and radius
    pub fn new(center: SVector<R, D>, radius: R) -> Self {
        Self { center, radius }
    }

    /// Returns the center of the ball
    pub fn center(&self) -> &SVector<R, D> {
        &self.center
    }

    /// Returns the radius of the ball
    pub fn radius(&self) -> R {
        self.radius
    }
}

impl<R: Real, const D: usize> Shape<R, D> for Ball<R, D> {
    fn check_contain(&self, point: &SVector<R, D>) -> bool {
        (point - self.center).norm_squared() <= self.radius * self.radius
    }

    fn find_signed_distance(&self, point: &SVector<R, D>) -> R {
        (point - self.center).norm() - self.radius
    }

    fn find_closest_point(&self, point: &SVector<R, D>) -> SVector<R, D> {
        let dir = point - self.center;
        let dist = dir.norm();
        if dist > R::zero() {
            self.center + dir * (self.radius / dist)
        } else {
            // Every boundary point is closest to the center
            let mut boundary = self.center;
            boundary[0] += self.radius;
            boundary
        }
    }

    fn find_bounds(&self) -> AxisAlignedBoundingBox<R, D> {
        AxisAlignedBoundingBox::from_point(self.center).grown(self.radius)
    }

    fn check_not_far(&self, point: &SVector<R, D>, tolerance: R) -> bool {
        let reach = self.radius + tolerance;
        (point - self.center).norm_squared() <= reach * reach
    }
}

/// An axis aligned box is a shape as well, its faces belong to the shape
impl<R: Real, const D: usize> Shape<R, D> for AxisAlignedBoundingBox<R, D> {
    fn check_contain(&self, point: &SVector<R, D>) -> bool {
        self.contains_point_closed(point)
    }

    fn find_signed_distance(&self, point: &SVector<R, D>) -> R {
        let half_extents = self.extents().map(|e| e.half());
        let q = (point - self.centroid()).map(abs) - half_extents;
        let outside = q.sup(&SVector::zeros()).norm();
        let inside = q.max().min(R::zero());
        outside + inside
    }

    fn find_closest_point(&self, point: &SVector<R, D>) -> SVector<R, D> {
        if !self.contains_point_closed(point) {
            return point.sup(self.min()).inf(self.max());
        }

        // Project onto the closest face
        let mut closest: Option<(R, usize, R)> = None;
        for dim in 0..D {
            for target in [self.min()[dim], self.max()[dim]] {
                let dist = abs(point[dim] - target);
                if closest.is_none_or(|(closest_dist, _, _)| dist < closest_dist) {
                    closest = Some((dist, dim, target));
                }
            }
        }
        let mut projected = *point;
        if let Some((_, dim, target)) = closest {
            projected[dim] = target;
        }
        projected
    }

    fn find_bounds(&self) -> AxisAlignedBoundingBox<R, D> {
        self.clone()
    }
}

fn abs<R: Real>(x: R) -> R {
    if x < R::zero() { -x } else { x }
}
