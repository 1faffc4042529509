#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! Library for cell linked lists with split-cell coloring for SPH particle simulations.
//!
//! The particles of a body are sorted into the cells of a uniform background grid with cells of
//! the size of the cutoff radius ([`CellLinkedList`]). All cells are partitioned into `3^D` colors
//! ([`split_cell_lists`]) such that no two cells of the same color share a neighbor stencil. This
//! allows operators that write to neighboring particles to run in parallel without locks, one color
//! at a time ([`iteration`]). Particles and cells of a body can be tagged by geometric regions
//! ([`region`]) to apply boundary conditions ([`constraint`]) or reductions ([`reduce`]) to them.
//!
//! ## Feature flags
//! The following features are all non-default features to reduce the amount of additional dependencies.
//!
//! - **`profiling`**: Enables profiling of internal functions. The resulting data can be displayed using the functions from the [`profiling`] module of this crate.
//!   Furthermore, it exposes the [`profile`] macro that can be used e.g. by binary crates calling into this library to add their own profiling scopes to the measurements.
//!   If this feature is not enabled, the macro will just expand to a no-op and remove the (small) performance overhead of the profiling.
//!

/// Re-export the version of `nalgebra` used by this crate
pub use nalgebra;

#[cfg(feature = "profiling")]
#[cfg_attr(docsrs, doc(cfg(feature = "profiling")))]
pub mod profiling;
#[doc(hidden)]
pub mod profiling_macro;

mod aabb;
/// A particle body owning its cell linked list and named body parts
pub mod body;
pub mod cell_linked_list;
/// Motion constraints applied to tagged particles
pub mod constraint;
mod context;
pub mod damping;
pub mod iteration;
pub mod neighborhood_search;
mod numeric_types;
/// Per-particle kinematic state and sortable flags
pub mod particles;
pub mod reduce;
pub mod region;
/// Shape queries used by the region tagging
pub mod shape;
pub mod split_cell_lists;
pub mod uniform_grid;
mod utils;
/// Thread local scratch buffers for particle kernels
pub mod workspace;

pub use aabb::{Aabb2d, Aabb3d, AxisAlignedBoundingBox};
pub use body::SphBody;
pub use cell_linked_list::{CellLinkedList, CellLinkedList2d, CellLinkedList3d, CellLinkedListError};
pub use context::SimulationContext;
pub use numeric_types::{Index, Real, RealConvert, ThreadSafe};
pub use uniform_grid::{GridConstructionError, UniformGrid};
pub use utils::{ParallelPolicy, UnsafeSlice};

pub(crate) type HashState = fxhash::FxBuildHasher;
pub(crate) type MapType<K, V> = std::collections::HashMap<K, V, HashState>;
pub(crate) fn new_map<K, V>() -> MapType<K, V> {
    MapType::with_hasher(HashState::default())
}

/// Parameters of a particle body and its cell linked list
#[derive(Clone, Debug)]
pub struct Parameters<R: Real, const D: usize> {
    /// Cutoff radius of the particle interactions, used as cell size of the cell linked list
    pub cutoff_radius: R,
    /// Initial distance between neighboring particles, used as tolerance by the region tagging
    pub particle_spacing: R,
    /// Domain covered by the cell linked list, particles outside are clamped into the boundary cells
    pub domain: AxisAlignedBoundingBox<R, D>,
    /// Whether to allow multi threading when rebuilding the cell linked list and tagging regions
    pub enable_multi_threading: bool,
}

impl<R: Real, const D: usize> Parameters<R, D> {
    /// Tries to convert the parameters from one [Real] type to another [Real] type, returns None if conversion fails
    pub fn try_convert<T: Real>(&self) -> Option<Parameters<T, D>> {
        Some(Parameters {
            cutoff_radius: self.cutoff_radius.try_convert()?,
            particle_spacing: self.particle_spacing.try_convert()?,
            domain: self.domain.try_convert()?,
            enable_multi_threading: self.enable_multi_threading,
        })
    }
}

/// Initializes the global thread pool used by this library with the given parameters.
///
/// Initialization of the global thread pool happens exactly once.
/// Therefore, if you call `initialize_thread_pool` a second time, it will return an error.
/// An `Ok` result indicates that this is the first initialization of the thread pool.
pub fn initialize_thread_pool(num_threads: usize) -> Result<(), anyhow::Error> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()?;
    Ok(())
}

/// Builds a local thread pool with the given number of threads, sweeps run on it via [`rayon::ThreadPool::install`]
pub fn build_thread_pool(num_threads: usize) -> Result<rayon::ThreadPool, anyhow::Error> {
    Ok(rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()?)
}

#[test]
fn test_parameters_try_convert() {
    use nalgebra::Vector2;

    let parameters = Parameters {
        cutoff_radius: 0.5f64,
        particle_spacing: 0.25,
        domain: AxisAlignedBoundingBox::new(Vector2::zeros(), Vector2::repeat(2.0)),
        enable_multi_threading: true,
    };
    let converted = parameters.try_convert::<f32>().unwrap();
    assert_eq!(converted.cutoff_radius, 0.5f32);
    assert_eq!(converted.domain.max(), &Vector2::repeat(2.0f32));
    assert!(converted.enable_multi_threading);
}
