//! Helper types for sharing mutable particle data between threads and for partitioning parallel work

use std::cell::UnsafeCell;

use log::debug;

/// Slice wrapper that allows unsynchronized mutable access to its elements from multiple threads
///
/// This is the primitive the colored sweeps are built on: kernels running concurrently on cells of
/// the same color only ever touch particles of disjoint neighbor stencils, so every element is
/// accessed by at most one thread at a time. The wrapper does not check this in any way.
#[derive(Copy, Clone)]
pub struct UnsafeSlice<'a, T> {
    slice: &'a [UnsafeCell<T>],
}

unsafe impl<T: Send + Sync> Send for UnsafeSlice<'_, T> {}
unsafe impl<T: Send + Sync> Sync for UnsafeSlice<'_, T> {}

impl<'a, T> UnsafeSlice<'a, T> {
    /// Wraps a mutable slice, the slice stays borrowed for the lifetime of the wrapper
    pub fn new(slice: &'a mut [T]) -> Self {
        let ptr = slice as *mut [T] as *const [UnsafeCell<T>];
        // SAFETY: `UnsafeCell<T>` has the same memory layout as `T`
        Self {
            slice: unsafe { &*ptr },
        }
    }

    /// Returns the number of elements
    pub fn len(&self) -> usize {
        self.slice.len()
    }

    /// Returns whether the slice is empty
    pub fn is_empty(&self) -> bool {
        self.slice.is_empty()
    }

    /// Returns a shared reference to the element at index `i`
    ///
    /// # Safety
    /// No other thread may hold a mutable reference to the same element while the returned reference is alive.
    pub unsafe fn get(&self, i: usize) -> &T {
        unsafe { &*self.slice[i].get() }
    }

    /// Returns a mutable reference to the element at index `i`
    ///
    /// # Safety
    /// No other reference to the same element may exist while the returned reference is alive.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get_mut(&self, i: usize) -> &mut T {
        unsafe { &mut *self.slice[i].get() }
    }

    /// Overwrites the element at index `i`
    ///
    /// # Safety
    /// No other reference to the same element may exist during the write.
    pub unsafe fn write(&self, i: usize, value: T) {
        unsafe { *self.slice[i].get() = value }
    }
}

impl<T: Copy> UnsafeSlice<'_, T> {
    /// Returns a copy of the element at index `i`
    ///
    /// # Safety
    /// No other thread may write to the same element during the read.
    pub unsafe fn read(&self, i: usize) -> T {
        unsafe { *self.slice[i].get() }
    }
}

/// Controls how a range of work items is split into tasks for the thread pool
#[derive(Copy, Clone, Debug)]
pub struct ParallelPolicy {
    /// Lower bound for the number of work items per task
    pub min_task_size: usize,
    /// Desired number of tasks per worker thread
    pub tasks_per_thread: usize,
}

impl Default for ParallelPolicy {
    fn default() -> Self {
        Self {
            min_task_size: 256,
            tasks_per_thread: 8,
        }
    }
}

/// Result of splitting a number of work items into chunks according to a [`ParallelPolicy`]
#[derive(Copy, Clone, Debug)]
pub(crate) struct ChunkSize {
    pub num_items: usize,
    pub num_chunks: usize,
    pub chunk_size: usize,
}

impl ChunkSize {
    pub(crate) fn new(parallel_policy: &ParallelPolicy, num_items: usize) -> Self {
        let num_threads = rayon::current_num_threads().max(1);

        // Chunk size for one chunk per thread
        let equal_distribution = num_items / num_threads;

        let chunk_size = if parallel_policy.min_task_size > equal_distribution {
            equal_distribution
        } else {
            let num_tasks = parallel_policy.tasks_per_thread.max(1) * num_threads;
            (num_items / num_tasks).max(parallel_policy.min_task_size)
        }
        .max(16);

        Self {
            num_items,
            num_chunks: num_items.div_ceil(chunk_size),
            chunk_size,
        }
    }

    pub(crate) fn with_log<S: AsRef<str>>(self, item_name: S, purpose: S) -> Self {
        debug!(
            "Splitting {} {} into {} chunks (with {} {} each) for {}",
            self.num_items,
            item_name.as_ref(),
            self.num_chunks,
            self.chunk_size,
            item_name.as_ref(),
            purpose.as_ref(),
        );
        self
    }
}
