// src/dag/graph.rs

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use tracing::{debug, warn};

use crate::dag::task::{TaskRecord, TaskSpec};
use crate::errors::{RegistrationError, ValidationError};
use crate::types::{TaskName, TaskStatus};

/// Stable index of a task inside a [`DependencyGraph`].
///
/// Indices are only stable while the graph is not mutated; the orchestrator
/// refuses registration changes during a run, so the scheduler can hand them
/// to workers safely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(usize);

/// Arena of task records keyed by unique name.
///
/// Records are kept in registration order, which is also the tie-break
/// order for planning, so plans are deterministic.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    tasks: Vec<TaskRecord>,
    index: HashMap<TaskName, usize>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Register a new task.
    ///
    /// Dependencies are not checked here; they may be registered later and
    /// are verified by [`DependencyGraph::validate`].
    pub fn add_task(&mut self, spec: TaskSpec) -> Result<TaskId, RegistrationError> {
        if self.index.contains_key(spec.name()) {
            return Err(RegistrationError::DuplicateTask(spec.name().to_string()));
        }
        if spec.dependencies().iter().any(|d| d == spec.name()) {
            return Err(RegistrationError::SelfDependency(spec.name().to_string()));
        }

        let record = TaskRecord::from_spec(spec);
        let id = self.tasks.len();
        debug!(task = %record.name(), deps = ?record.dependencies(), "task added to graph");
        self.index.insert(record.name().to_string(), id);
        self.tasks.push(record);

        Ok(TaskId(id))
    }

    /// Remove a task that nothing else depends on.
    pub fn remove_task(&mut self, name: &str) -> Result<TaskRecord, RegistrationError> {
        let Some(&id) = self.index.get(name) else {
            return Err(RegistrationError::TaskNotFound(name.to_string()));
        };

        let dependents = self.dependents_of(name);
        if !dependents.is_empty() {
            return Err(RegistrationError::DependentsExist {
                task: name.to_string(),
                dependents,
            });
        }

        let record = self.tasks.remove(id);
        self.rebuild_index();
        debug!(task = %name, "task removed from graph");

        Ok(record)
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name().to_string(), i))
            .collect();
    }

    pub fn id_of(&self, name: &str) -> Option<TaskId> {
        self.index.get(name).copied().map(TaskId)
    }

    pub fn get(&self, name: &str) -> Option<&TaskRecord> {
        self.index.get(name).map(|&i| &self.tasks[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut TaskRecord> {
        match self.index.get(name) {
            Some(&i) => Some(&mut self.tasks[i]),
            None => None,
        }
    }

    /// Record by id.
    ///
    /// Panics if `id` did not come from this graph; ids are never handed out
    /// across mutations.
    pub fn task(&self, id: TaskId) -> &TaskRecord {
        &self.tasks[id.0]
    }

    pub fn task_mut(&mut self, id: TaskId) -> &mut TaskRecord {
        &mut self.tasks[id.0]
    }

    /// Records in registration order.
    pub fn records(&self) -> impl Iterator<Item = &TaskRecord> {
        self.tasks.iter()
    }

    /// Task names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.name())
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.get(name).map(|t| t.dependencies()).unwrap_or(&[])
    }

    /// Tasks that list `name` as a dependency, in registration order.
    pub fn dependents_of(&self, name: &str) -> Vec<TaskName> {
        self.tasks
            .iter()
            .filter(|t| t.depends_on(name))
            .map(|t| t.name().to_string())
            .collect()
    }

    /// One error per dependency that references an unregistered task.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for task in &self.tasks {
            for dep in task.dependencies() {
                if !self.index.contains_key(dep) {
                    errors.push(ValidationError::UnknownDependency {
                        task: task.name().to_string(),
                        dependency: dep.clone(),
                    });
                }
            }
        }
        errors
    }

    /// Validate, then compute the topological order.
    pub fn plan(&self) -> Result<Vec<TaskId>, ValidationError> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(ValidationError::Invalid {
                errors: errors.iter().map(ToString::to_string).collect(),
            });
        }
        self.topological_order()
    }

    /// Kahn's algorithm with registration order as the tie-break.
    ///
    /// Unknown dependencies are ignored here; call [`DependencyGraph::plan`]
    /// to reject them first.
    pub fn topological_order(&self) -> Result<Vec<TaskId>, ValidationError> {
        let n = self.tasks.len();
        let mut in_degree = vec![0usize; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

        for (i, task) in self.tasks.iter().enumerate() {
            for dep in task.dependencies() {
                if let Some(&d) = self.index.get(dep) {
                    in_degree[i] += 1;
                    dependents[d].push(i);
                }
            }
        }

        let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);

        while let Some(current) = queue.pop_front() {
            order.push(TaskId(current));
            for &next in &dependents[current] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        if order.len() < n {
            let members = self.cycle_members();
            warn!(?members, "cycle detected while planning");
            return Err(ValidationError::CyclicDependency { members });
        }

        Ok(order)
    }

    /// Names of every task that sits on a dependency cycle, in registration
    /// order.
    fn cycle_members(&self) -> Vec<TaskName> {
        // Edge direction: dep -> task.
        let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
        for i in 0..self.tasks.len() {
            graph.add_node(i);
        }
        for (i, task) in self.tasks.iter().enumerate() {
            for dep in task.dependencies() {
                if let Some(&d) = self.index.get(dep) {
                    graph.add_edge(d, i, ());
                }
            }
        }

        let mut on_cycle: HashSet<usize> = HashSet::new();
        for component in tarjan_scc(&graph) {
            let is_cycle = component.len() > 1
                || component
                    .first()
                    .is_some_and(|&node| graph.contains_edge(node, node));
            if is_cycle {
                on_cycle.extend(component);
            }
        }

        let mut members: Vec<usize> = on_cycle.into_iter().collect();
        members.sort_unstable();
        members
            .into_iter()
            .map(|i| self.tasks[i].name().to_string())
            .collect()
    }

    /// Tasks from `order` that are `Pending`, not yet dispatched, and whose
    /// dependencies are all `Completed`.
    pub fn ready_set(&self, order: &[TaskId], dispatched: &HashSet<TaskId>) -> Vec<TaskId> {
        order
            .iter()
            .copied()
            .filter(|id| !dispatched.contains(id))
            .filter(|&id| {
                let task = self.task(id);
                task.status() == TaskStatus::Pending && self.deps_completed(task)
            })
            .collect()
    }

    fn deps_completed(&self, task: &TaskRecord) -> bool {
        task.dependencies().iter().all(|dep| {
            self.get(dep)
                .is_some_and(|d| d.status() == TaskStatus::Completed)
        })
    }

    /// Names of tasks that have not reached `Completed`.
    pub fn incomplete(&self) -> Vec<TaskName> {
        self.tasks
            .iter()
            .filter(|t| t.status() != TaskStatus::Completed)
            .map(|t| t.name().to_string())
            .collect()
    }

    /// Reset the runtime state of every task.
    pub fn reset_all(&mut self) {
        for task in &mut self.tasks {
            task.reset();
        }
    }
}

/// Shared handle to the graph used by the orchestrator, scheduler workers
/// and status readers.
///
/// Guards must not be held across `.await`. A poisoned lock is recovered:
/// every mutation leaves the graph consistent before anything can panic.
#[derive(Debug, Clone, Default)]
pub struct SharedGraph {
    inner: Arc<RwLock<DependencyGraph>>,
}

impl SharedGraph {
    pub fn new(graph: DependencyGraph) -> Self {
        Self {
            inner: Arc::new(RwLock::new(graph)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, DependencyGraph> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, DependencyGraph> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
