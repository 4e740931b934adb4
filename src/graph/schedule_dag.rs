use crate::error::ScheduleError;
use crate::task::{Task, TaskId};
use petgraph::Direction;
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// Dependency graph of one project. Edges run predecessor -> successor.
pub struct ScheduleDag {
    pub graph: DiGraph<TaskId, ()>,
    pub id_to_index: HashMap<TaskId, NodeIndex>,
    dangling: Vec<(TaskId, TaskId)>,
}

impl ScheduleDag {
    /// References to unknown tasks are dropped and remembered as `(task, missing_pred)`.
    pub fn build(tasks: &[Task]) -> Self {
        let mut graph: DiGraph<TaskId, ()> = DiGraph::with_capacity(tasks.len(), tasks.len());
        let mut id_to_index: HashMap<TaskId, NodeIndex> = HashMap::with_capacity(tasks.len());

        // Add nodes first
        for task in tasks {
            if id_to_index.contains_key(&task.id) {
                continue;
            }
            let node_ix = graph.add_node(task.id);
            id_to_index.insert(task.id, node_ix);
        }

        // Add edges: pred -> task
        let mut dangling = Vec::new();
        for task in tasks {
            let Some(&v) = id_to_index.get(&task.id) else {
                continue;
            };
            for pred_id in task.dependency_set() {
                match id_to_index.get(&pred_id) {
                    Some(&u) => {
                        graph.update_edge(u, v, ());
                    }
                    None => dangling.push((task.id, pred_id)),
                }
            }
        }

        if !dangling.is_empty() {
            tracing::warn!(
                count = dangling.len(),
                references = ?dangling,
                "dropping dependencies on unknown tasks"
            );
        }

        Self {
            graph,
            id_to_index,
            dangling,
        }
    }

    pub fn task_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn dangling_references(&self) -> &[(TaskId, TaskId)] {
        &self.dangling
    }

    /// Task ids ordered so every predecessor comes before its successors.
    pub fn topological_order(&self) -> Result<Vec<TaskId>, ScheduleError> {
        toposort(&self.graph, None)
            .map(|order| order.into_iter().map(|ix| self.graph[ix]).collect())
            .map_err(|_| ScheduleError::CycleDetected {
                task_ids: self.cycle_members(),
            })
    }

    /// Every task that sits on a dependency cycle, sorted.
    pub fn cycle_members(&self) -> Vec<TaskId> {
        let mut members: Vec<TaskId> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|&ix| self.graph.contains_edge(ix, ix))
            })
            .flatten()
            .map(|ix| self.graph[ix])
            .collect();
        members.sort_unstable();
        members
    }

    pub fn predecessors(&self, task_id: TaskId) -> Vec<TaskId> {
        self.neighbors(task_id, Direction::Incoming)
    }

    pub fn successors(&self, task_id: TaskId) -> Vec<TaskId> {
        self.neighbors(task_id, Direction::Outgoing)
    }

    fn neighbors(&self, task_id: TaskId, direction: Direction) -> Vec<TaskId> {
        let Some(&ix) = self.id_to_index.get(&task_id) else {
            return Vec::new();
        };
        let mut ids: Vec<TaskId> = self
            .graph
            .neighbors_directed(ix, direction)
            .map(|n| self.graph[n])
            .collect();
        ids.sort_unstable();
        ids
    }
}
