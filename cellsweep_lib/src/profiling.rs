//! Implementation details for the [`profile`](crate::profile) macro
//!
//! Every thread records its scopes in its own [`Profiler`]. A scope is identified by its full path
//! of scope names from the outermost scope of the thread (or from a manually assigned parent scope)
//! down to the scope itself. Scopes with equal paths are accumulated, also across threads.

use std::error::Error;
use std::io;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use fxhash::FxHashMap;
use parking_lot::RwLock;
use thread_local::ThreadLocal;

/// Thread local storage of the [`Profiler`]s storing all scopes of the thread
pub static PROFILER: LazyLock<ThreadLocal<RwLock<Profiler>>> = LazyLock::new(ThreadLocal::new);

/// Implementation of the profile macro, use [`profile`](crate::profile) instead
#[doc(hidden)]
#[macro_export]
macro_rules! profile_impl {
    ($name:expr) => {
        let (_profiling_scope_guard, _) = $crate::profiling::PROFILER
            .get_or(Default::default)
            .write()
            .enter($name);
    };
    ($scope_id:ident, $name:expr) => {
        let (_profiling_scope_guard, $scope_id) = $crate::profiling::PROFILER
            .get_or(Default::default)
            .write()
            .enter($name);
    };
    ($name:expr, parent = $parent_id:ident) => {
        let (_profiling_scope_guard, _) = $crate::profiling::PROFILER
            .get_or(Default::default)
            .write()
            .enter_with_parent($name, &$parent_id);
    };
    ($scope_id:ident, $name:expr, parent = $parent_id:ident) => {
        let (_profiling_scope_guard, $scope_id) = $crate::profiling::PROFILER
            .get_or(Default::default)
            .write()
            .enter_with_parent($name, &$parent_id);
    };
}

/// Path of scope names identifying a scope across threads
#[derive(Clone, Hash, Eq, PartialEq, Debug)]
pub struct ScopeId {
    path: Arc<[&'static str]>,
}

impl ScopeId {
    fn root(name: &'static str) -> Self {
        Self {
            path: Arc::from([name].as_slice()),
        }
    }

    fn child(&self, name: &'static str) -> Self {
        let mut path = self.path.to_vec();
        path.push(name);
        Self {
            path: Arc::from(path),
        }
    }

    /// Returns the name of the scope (the last element of its path)
    pub fn name(&self) -> &'static str {
        self.path.last().copied().unwrap_or_default()
    }

    /// Returns the nesting depth of the scope, roots have a depth of zero
    pub fn depth(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    fn is_child_of(&self, parent: &ScopeId) -> bool {
        self.path.len() == parent.path.len() + 1 && self.path.starts_with(&parent.path)
    }
}

/// A scope guard recording the elapsed time of the scope
pub struct Guard {
    enter_time: Instant,
}

/// Dropping a `Guard` adds its recorded elapsed time to the scope on top of the current thread's scope stack
impl Drop for Guard {
    fn drop(&mut self) {
        let duration = self.enter_time.elapsed();
        if let Some(profiler) = PROFILER.get() {
            profiler.write().leave(duration);
        }
    }
}

#[derive(Copy, Clone, Debug)]
struct ScopeStats {
    num_calls: usize,
    duration_sum: Duration,
    first_call: Instant,
}

impl ScopeStats {
    fn new() -> Self {
        Self {
            num_calls: 0,
            duration_sum: Duration::default(),
            first_call: Instant::now(),
        }
    }

    fn merge(&mut self, other: &Self) {
        self.num_calls += other.num_calls;
        self.duration_sum += other.duration_sum;
        self.first_call = self.first_call.min(other.first_call);
    }
}

/// Profiler storing all scopes of one thread and the thread's current stack of open scopes
#[derive(Default)]
pub struct Profiler {
    scopes: FxHashMap<ScopeId, ScopeStats>,
    scope_stack: Vec<ScopeId>,
}

impl Profiler {
    /// Resets all profiling data of this profiler
    pub fn reset(&mut self) {
        self.scopes.clear();
        self.scope_stack.clear();
    }

    /// Enters a scope as a child of the scope on top of the current stack (or as a root if the stack is empty)
    pub fn enter(&mut self, name: &'static str) -> (Guard, ScopeId) {
        let id = match self.scope_stack.last() {
            Some(parent) => parent.child(name),
            None => ScopeId::root(name),
        };
        self.enter_with_id(id)
    }

    /// Enters a scope that is manually assigned as a child of the given parent scope
    pub fn enter_with_parent(&mut self, name: &'static str, parent: &ScopeId) -> (Guard, ScopeId) {
        self.enter_with_id(parent.child(name))
    }

    fn enter_with_id(&mut self, id: ScopeId) -> (Guard, ScopeId) {
        self.scopes.entry(id.clone()).or_insert_with(ScopeStats::new);
        self.scope_stack.push(id.clone());
        (
            Guard {
                enter_time: Instant::now(),
            },
            id,
        )
    }

    fn leave(&mut self, duration: Duration) {
        if let Some(id) = self.scope_stack.pop() {
            if let Some(stats) = self.scopes.get_mut(&id) {
                stats.num_calls += 1;
                stats.duration_sum += duration;
            }
        }
    }
}

fn write_recursively<W: io::Write>(
    out: &mut W,
    scopes: &[(ScopeId, ScopeStats)],
    current: &(ScopeId, ScopeStats),
    parent_duration: Option<Duration>,
) -> io::Result<()> {
    let (id, stats) = current;

    for _ in 0..id.depth() {
        write!(out, "  ")?;
    }

    let total_secs = stats.duration_sum.as_secs_f64();
    let parent_secs = parent_duration.map_or(total_secs, |t| t.as_secs_f64());
    let percent = if parent_secs > 0.0 {
        total_secs / parent_secs * 100.0
    } else {
        100.0
    };

    writeln!(
        out,
        "{}: {:3.2}%, {:>4.2}ms avg, {} {} (total: {:.3}s)",
        id.name(),
        percent,
        total_secs * 1000.0 / (stats.num_calls.max(1) as f64),
        stats.num_calls,
        if stats.num_calls == 1 { "call" } else { "calls" },
        total_secs
    )?;

    // Children run on worker threads may sum up to more than the parent's own runtime
    let children_runtime: Duration = scopes
        .iter()
        .filter(|(child, _)| child.is_child_of(id))
        .map(|(_, s)| s.duration_sum)
        .sum();
    let reference_runtime = children_runtime.max(stats.duration_sum);

    for child in scopes.iter().filter(|(child, _)| child.is_child_of(id)) {
        write_recursively(out, scopes, child, Some(reference_runtime))?;
    }

    Ok(())
}

/// Pretty prints the collected profiling data of all thread local [`Profiler`]s to the given writer
pub fn write<W: io::Write>(out: &mut W) -> io::Result<()> {
    let mut merged = FxHashMap::<ScopeId, ScopeStats>::default();
    for profiler in PROFILER.iter() {
        let profiler = profiler.read();
        for (id, stats) in &profiler.scopes {
            merged
                .entry(id.clone())
                .and_modify(|s| s.merge(stats))
                .or_insert(*stats);
        }
    }

    let mut scopes = merged.into_iter().collect::<Vec<_>>();
    scopes.sort_unstable_by_key(|(_, s)| s.first_call);

    for root in scopes.iter().filter(|(id, _)| id.depth() == 0) {
        write_recursively(out, &scopes, root, None)?;
    }

    Ok(())
}

/// Returns the pretty printed output of the collected profiling data as a `String`
pub fn write_to_string() -> Result<String, Box<dyn Error>> {
    let mut buffer = Vec::new();
    write(&mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Resets the profiling data of all thread local [`Profiler`]s
///
/// Should be called outside of any open scope, otherwise the timings of scopes that are still open get lost.
pub fn reset() {
    for profiler in PROFILER.iter() {
        profiler.write().reset();
    }
}
