use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub project_id: i32,
    pub project_name: String,
    #[serde(default)]
    pub client_name: String,
    #[serde(default = "default_status")]
    pub status: String,
    /// Anchor date for tasks without dependencies or overrides.
    pub project_start_date: NaiveDate,
    /// Project-scoped blocked dates (holidays, shutdowns).
    #[serde(default)]
    pub non_working_days: BTreeSet<NaiveDate>,
}

fn default_status() -> String {
    "Planning".to_string()
}

impl Default for ProjectMetadata {
    fn default() -> Self {
        Self {
            project_id: 1,
            project_name: "New Project".to_string(),
            client_name: String::new(),
            status: default_status(),
            project_start_date: chrono::Local::now().date_naive(),
            non_working_days: BTreeSet::new(),
        }
    }
}

impl ProjectMetadata {
    pub fn new(project_id: i32, project_name: impl Into<String>, start: NaiveDate) -> Self {
        Self {
            project_id,
            project_name: project_name.into(),
            project_start_date: start,
            ..Self::default()
        }
    }
}
