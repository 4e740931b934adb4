//! Work-breakdown templates: named phase/task structures stamped into a
//! project's task list.

use crate::task::{Exposure, Task, TaskId};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub const RESIDENTIAL: &str = "Residential";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateTask {
    pub name: String,
    pub duration: i64,
    #[serde(default)]
    pub material_lead_time: i64,
    /// Stored templates use `0`/`1` as often as booleans.
    #[serde(default, deserialize_with = "bool_or_int")]
    pub inspection_required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplatePhase {
    pub name: String,
    #[serde(default)]
    pub exposure: Exposure,
    pub tasks: Vec<TemplateTask>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WbsTemplate {
    pub phases: Vec<TemplatePhase>,
}

/// How instantiated tasks are wired together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chaining {
    /// No dependencies; every task floats at the project start.
    #[default]
    None,
    /// Each task depends on the one before it, across phase boundaries.
    Sequential,
}

fn bool_or_int<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }
    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => value,
        Flag::Int(value) => value != 0,
    })
}

fn template_task(name: &str, duration: i64) -> TemplateTask {
    TemplateTask {
        name: name.to_string(),
        duration,
        material_lead_time: 0,
        inspection_required: false,
    }
}

impl WbsTemplate {
    pub fn residential() -> Self {
        Self {
            phases: vec![
                TemplatePhase {
                    name: "Foundation".to_string(),
                    exposure: Exposure::Outdoor,
                    tasks: vec![
                        template_task("Excavation", 3),
                        TemplateTask {
                            inspection_required: true,
                            ..template_task("Pour Footings", 1)
                        },
                        template_task("Cure Time", 7),
                    ],
                },
                TemplatePhase {
                    name: "Framing".to_string(),
                    exposure: Exposure::Outdoor,
                    tasks: vec![
                        template_task("First Floor Frame", 5),
                        template_task("Sheathing", 3),
                        TemplateTask {
                            material_lead_time: 21,
                            ..template_task("Window Install", 3)
                        },
                        TemplateTask {
                            inspection_required: true,
                            ..template_task("Framing Inspection", 1)
                        },
                    ],
                },
            ],
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn task_count(&self) -> usize {
        self.phases.iter().map(|phase| phase.tasks.len()).sum()
    }

    /// Tasks numbered from `first_id`, carrying their phase name and exposure.
    pub fn instantiate(&self, first_id: TaskId, chaining: Chaining) -> Vec<Task> {
        let mut tasks = Vec::with_capacity(self.task_count());
        let mut next_id = first_id;
        for phase in &self.phases {
            for item in &phase.tasks {
                let mut task = Task::new(next_id, item.name.clone(), item.duration)
                    .with_phase(phase.name.clone());
                task.exposure = phase.exposure;
                task.material_lead_time_days = item.material_lead_time;
                task.inspection_required = item.inspection_required;
                if chaining == Chaining::Sequential && next_id > first_id {
                    task.predecessors = vec![next_id - 1];
                }
                tasks.push(task);
                next_id += 1;
            }
        }
        tasks
    }
}

/// Templates keyed by category name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateLibrary {
    templates: BTreeMap<String, WbsTemplate>,
}

impl TemplateLibrary {
    pub fn builtin() -> Self {
        let mut library = Self::default();
        library.insert(RESIDENTIAL, WbsTemplate::residential());
        library
    }

    pub fn insert(&mut self, category: impl Into<String>, template: WbsTemplate) {
        self.templates.insert(category.into(), template);
    }

    pub fn get(&self, category: &str) -> Option<&WbsTemplate> {
        self.templates.get(category)
    }

    pub fn categories(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &WbsTemplate)> {
        self.templates
            .iter()
            .map(|(category, template)| (category.as_str(), template))
    }
}
