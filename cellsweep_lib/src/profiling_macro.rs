//! Provides the [`profile`](crate::profile) macro or a dummy implementation depending on the selected feature

#[cfg(feature = "profiling")]
/// Opens a named profiling scope that is closed at the end of the enclosing block
///
/// Only records anything with the `profiling` feature. Without it, all rules expand to nothing, so
/// the macro can stay in hot loops of release builds.
///
/// Every thread records into its own [`Profiler`](crate::profiling::Profiler) stored in the static
/// [`PROFILER`](static@crate::profiling::PROFILER). Scopes are keyed by their full path from the
/// root, so timings of the same scope called from different threads are accumulated. A report of
/// all threads is produced by [`write`](crate::profiling::write):
/// ```text
/// sweep step: 100.00%, 12.31ms avg, 50 calls (total: 0.616s)
///   CellLinkedList::par_rebuild: 18.02%, 2.22ms avg, 50 calls (total: 0.111s)
///   par_for_each_particle_split_sweeping: 81.45%, 10.03ms avg, 50 calls (total: 0.501s)
///     par_for_each_particle_colored: 98.90%, 4.96ms avg, 100 calls (total: 0.496s)
/// ```
///
/// The guard returned by the macro is bound to `_profiling_scope_guard`. Nesting is inferred from
/// the scopes open on the current thread. Work that rayon moves to other threads has to name its
/// parent explicitly:
///  1. A named scope:
///     ```ignore
///     profile!("rebuild");
///     ```
///  2. A named scope whose id is bound to a variable for use as parent:
///     ```ignore
///     profile!(sweep_scope, "sweep");
///     ```
///  3. A scope with an explicit parent, e.g. inside a parallel iterator:
///     ```ignore
///     profile!(color_scope, "color");
///     cells.par_iter().for_each(|cell| {
///         profile!("cell", parent = color_scope);
///     });
///     ```
///  4. Both combined:
///     ```ignore
///     profile!(inner_scope, "inner", parent = outer_scope);
///     ```
#[macro_export]
#[cfg_attr(docsrs, doc(cfg(feature = "profiling")))]
macro_rules! profile {
    ($name:expr) => {
        use $crate::profile_impl;
        profile_impl!($name);
    };
    ($scope_id:ident, $name:expr) => {
        use $crate::profile_impl;
        profile_impl!($scope_id, $name);
    };
    ($name:expr, parent = $parent_id:ident) => {
        use $crate::profile_impl;
        profile_impl!($name, parent = $parent_id);
    };
    ($scope_id:ident, $name:expr, parent = $parent_id:ident) => {
        use $crate::profile_impl;
        profile_impl!($scope_id, $name, parent = $parent_id);
    };
}

#[cfg(not(feature = "profiling"))]
/// No-op macro if profiling is disabled
#[macro_export]
macro_rules! profile {
    ($name:expr) => {};
    ($scope_id:ident, $name:expr) => {};
    ($name:expr, parent = $parent_id:ident) => {};
    ($scope_id:ident, $name:expr, parent = $parent_id:ident) => {};
}
