use std::cell::RefCell;
use std::fmt;
use std::fmt::Debug;

use thread_local::ThreadLocal;

use crate::Real;

/// Collection of thread local scratch buffers used by per-particle kernels to avoid allocations in every call
#[derive(Default)]
pub struct SweepWorkspace<R: Real> {
    local_workspaces: ThreadLocal<RefCell<LocalSweepWorkspace<R>>>,
}

impl<R: Real> SweepWorkspace<R> {
    /// Returns a reference to the workspace of the current thread, initializes it if not already initialized
    pub fn get_local(&self) -> &RefCell<LocalSweepWorkspace<R>> {
        self.local_workspaces.get_or_default()
    }
}

impl<R: Real> Clone for SweepWorkspace<R> {
    /// Returns a new default workspace without any allocated memory
    fn clone(&self) -> Self {
        SweepWorkspace::default()
    }
}

impl<R: Real> Debug for SweepWorkspace<R> {
    /// Only print the name of type to the formatter
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SweepWorkspace").finish()
    }
}

/// Scratch buffers of one thread
#[derive(Clone, Debug)]
pub struct LocalSweepWorkspace<R: Real> {
    /// Indices of the neighbors of the particle currently processed
    pub neighbors: Vec<usize>,
    /// Per-neighbor values (e.g. kernel weights), parallel to `neighbors`
    pub weights: Vec<R>,
}

impl<R: Real> Default for LocalSweepWorkspace<R> {
    fn default() -> Self {
        Self::with_capacity(32)
    }
}

impl<R: Real> LocalSweepWorkspace<R> {
    /// Constructs a workspace with buffers for the given number of neighbors
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            neighbors: Vec::with_capacity(capacity),
            weights: Vec::with_capacity(capacity),
        }
    }

    /// Clears all buffers, keeping their allocations
    pub fn clear(&mut self) {
        self.neighbors.clear();
        self.weights.clear();
    }
}
