//! Dependency-aware lifecycle coordination for long-running components.
//!
//! Every participating component owns one [`LifecycleCoordinator`]. A
//! coordinator carries two flags (a cooperative shutdown request and a "work
//! finished" marker) plus the set of components it depends on. A component
//! is *deletable* once its own work is finished and nothing it depends on is
//! still alive.
//!
//! Dependency edges are recorded by [`ProcessId`] in a shared
//! [`LifecycleTable`]. When a coordinator is dropped it walks its observer
//! list and, for each dependent id still present in the table, removes the
//! edge pointing at itself. Nobody polls anybody else's liveness.
//!
//! # Examples
//!
//! ```
//! use console_writer::{LifecycleCoordinator, LifecycleTable};
//!
//! let table = LifecycleTable::new();
//! let writer = LifecycleCoordinator::new(&table, "writer");
//! let console = LifecycleCoordinator::new(&table, "console");
//!
//! writer.add_dependency(&console);
//! writer.mark_finished();
//! assert!(!writer.is_deletable());
//!
//! drop(console);
//! assert!(writer.is_deletable());
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::debug;

/// Unique identifier issued by a [`LifecycleTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(u64);

impl ProcessId {
    /// The raw numeric value.
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Callback run once when the observed component is torn down.
pub type TeardownCallback = Box<dyn FnOnce(ProcessId) + Send>;

enum Observer {
    /// A component that depends on this one.
    Dependent(ProcessId),
    Callback(TeardownCallback),
}

#[derive(Default)]
struct Edges {
    dependencies: HashSet<ProcessId>,
    observers: Vec<Observer>,
}

struct ProcessState {
    id: ProcessId,
    name: Box<str>,
    shutdown: AtomicBool,
    finished: AtomicBool,
    edges: Mutex<Edges>,
}

impl ProcessState {
    fn edges(&self) -> MutexGuard<'_, Edges> {
        self.edges.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn drop_dependency(&self, dependency: ProcessId) -> bool {
        self.edges().dependencies.remove(&dependency)
    }

    fn drop_dependent(&self, dependent: ProcessId) {
        self.edges()
            .observers
            .retain(|o| !matches!(o, Observer::Dependent(id) if *id == dependent));
    }
}

#[derive(Default)]
struct TableInner {
    next_id: AtomicU64,
    processes: Mutex<HashMap<ProcessId, Weak<ProcessState>>>,
}

/// Shared registry of live coordinators, keyed by [`ProcessId`].
///
/// Cloning the table is cheap and yields a handle to the same registry.
/// Components that should be able to depend on each other must be created
/// from the same table.
#[derive(Clone, Default)]
pub struct LifecycleTable {
    inner: Arc<TableInner>,
}

impl LifecycleTable {
    /// Create a new empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live coordinators registered in this table.
    pub fn len(&self) -> usize {
        self.processes().len()
    }

    /// Check if no coordinator is alive.
    pub fn is_empty(&self) -> bool {
        self.processes().is_empty()
    }

    /// Check whether a process is still alive.
    pub fn contains(&self, id: ProcessId) -> bool {
        self.lookup(id).is_some()
    }

    fn processes(&self) -> MutexGuard<'_, HashMap<ProcessId, Weak<ProcessState>>> {
        self.inner
            .processes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, name: Box<str>) -> Arc<ProcessState> {
        // Ids start at 1 so that a zeroed id is never handed out.
        let id = ProcessId(self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let state = Arc::new(ProcessState {
            id,
            name,
            shutdown: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            edges: Mutex::new(Edges::default()),
        });
        self.processes().insert(id, Arc::downgrade(&state));
        state
    }

    fn unregister(&self, id: ProcessId) {
        self.processes().remove(&id);
    }

    fn lookup(&self, id: ProcessId) -> Option<Arc<ProcessState>> {
        self.processes().get(&id).and_then(Weak::upgrade)
    }
}

impl std::fmt::Debug for LifecycleTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleTable")
            .field("live", &self.len())
            .finish()
    }
}

/// Lifecycle state owned by a single long-lived component.
///
/// Dropping the coordinator is the component's destruction: every teardown
/// observer fires exactly once and dependents lose their edge to it.
pub struct LifecycleCoordinator {
    state: Arc<ProcessState>,
    table: LifecycleTable,
}

impl LifecycleCoordinator {
    /// Register a new component in `table`.
    pub fn new(table: &LifecycleTable, name: impl Into<Box<str>>) -> Self {
        let state = table.register(name.into());
        debug!("Lifecycle: registered '{}' as {}", state.name, state.id);
        Self {
            state,
            table: table.clone(),
        }
    }

    /// The identifier issued for this component.
    #[inline]
    pub fn id(&self) -> ProcessId {
        self.state.id
    }

    /// The component name given at registration.
    #[inline]
    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// The table this component is registered in.
    pub fn table(&self) -> &LifecycleTable {
        &self.table
    }

    /// Record that this component depends on `other`.
    ///
    /// While `other` is alive, [`is_deletable`](Self::is_deletable) reports
    /// `false`. When `other` is dropped the edge is removed automatically.
    /// Returns `false` if the edge already existed, or if `other` is this
    /// component or lives in a different table.
    pub fn add_dependency(&self, other: &LifecycleCoordinator) -> bool {
        if other.id() == self.id() || !Arc::ptr_eq(&self.table.inner, &other.table.inner) {
            return false;
        }

        let is_new = self.state.edges().dependencies.insert(other.id());
        if is_new {
            other
                .state
                .edges()
                .observers
                .push(Observer::Dependent(self.id()));
            debug!(
                "Lifecycle: '{}' now depends on '{}'",
                self.name(),
                other.name()
            );
        }
        is_new
    }

    /// Remove a dependency edge. Does nothing if the edge is absent.
    pub fn remove_dependency(&self, id: ProcessId) {
        if self.state.drop_dependency(id) {
            if let Some(dependency) = self.table.lookup(id) {
                dependency.drop_dependent(self.id());
            }
        }
    }

    /// Check if any dependency is still alive.
    pub fn has_dependencies(&self) -> bool {
        !self.state.edges().dependencies.is_empty()
    }

    /// The ids of all live dependencies, sorted.
    pub fn dependencies(&self) -> Vec<ProcessId> {
        let mut deps: Vec<ProcessId> = self.state.edges().dependencies.iter().copied().collect();
        deps.sort();
        deps
    }

    /// Register a callback that runs once when this component is dropped.
    pub fn on_teardown<F>(&self, callback: F)
    where
        F: FnOnce(ProcessId) + Send + 'static,
    {
        self.state
            .edges()
            .observers
            .push(Observer::Callback(Box::new(callback)));
    }

    /// True when this component's work is finished and it has no live dependencies.
    pub fn is_deletable(&self) -> bool {
        self.is_finished() && !self.has_dependencies()
    }

    /// Ask the component's workers to stop. Never interrupts a thread.
    pub fn request_shutdown(&self) {
        self.signal().request_shutdown();
    }

    /// Check if a shutdown has been requested.
    pub fn is_shutdown_requested(&self) -> bool {
        self.state.shutdown.load(Ordering::Acquire)
    }

    /// Mark the component's own work as finished.
    pub fn mark_finished(&self) {
        self.signal().mark_finished();
    }

    /// Check if the component's own work is finished.
    pub fn is_finished(&self) -> bool {
        self.state.finished.load(Ordering::Acquire)
    }

    /// A non-owning view of this component's flags for worker threads.
    pub fn signal(&self) -> LifecycleSignal {
        LifecycleSignal {
            state: Arc::clone(&self.state),
        }
    }

    fn teardown(&mut self) {
        let id = self.id();
        self.table.unregister(id);

        let (dependencies, observers) = {
            let mut edges = self.state.edges();
            (
                std::mem::take(&mut edges.dependencies),
                std::mem::take(&mut edges.observers),
            )
        };

        // Things we depended on no longer need to notify us.
        for dep in dependencies {
            if let Some(dependency) = self.table.lookup(dep) {
                dependency.drop_dependent(id);
            }
        }

        for observer in observers {
            match observer {
                Observer::Dependent(dependent) => {
                    if let Some(dependent) = self.table.lookup(dependent) {
                        dependent.drop_dependency(id);
                    }
                }
                Observer::Callback(callback) => callback(id),
            }
        }

        debug!("Lifecycle: '{}' ({}) torn down", self.name(), id);
    }
}

impl Drop for LifecycleCoordinator {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for LifecycleCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleCoordinator")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("finished", &self.is_finished())
            .field("shutdown_requested", &self.is_shutdown_requested())
            .field("dependencies", &self.dependencies())
            .finish()
    }
}

/// Cloneable view of a component's flags, handed to its worker threads.
///
/// Holding a signal does not keep the component registered; only the
/// [`LifecycleCoordinator`] owns the component's lifetime.
#[derive(Clone)]
pub struct LifecycleSignal {
    state: Arc<ProcessState>,
}

impl LifecycleSignal {
    /// The owning component's id.
    pub fn id(&self) -> ProcessId {
        self.state.id
    }

    /// Ask the component's workers to stop.
    pub fn request_shutdown(&self) {
        if !self.state.shutdown.swap(true, Ordering::AcqRel) {
            debug!("Lifecycle: shutdown requested for '{}'", self.state.name);
        }
    }

    /// Check if a shutdown has been requested.
    pub fn is_shutdown_requested(&self) -> bool {
        self.state.shutdown.load(Ordering::Acquire)
    }

    /// Mark the component's own work as finished.
    pub fn mark_finished(&self) {
        self.state.finished.store(true, Ordering::Release);
    }

    /// Check if the component's own work is finished.
    pub fn is_finished(&self) -> bool {
        self.state.finished.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for LifecycleSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleSignal")
            .field("id", &self.state.id)
            .finish_non_exhaustive()
    }
}
