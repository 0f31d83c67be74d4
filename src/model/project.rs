use super::{FacultyId, PanelId, Scope, StudentId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct ProjectId(pub i64);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Active,
    Completed,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ProjectStatus::Active),
            "completed" => Some(ProjectStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(flatten)]
    pub scope: Scope,
    pub guide_faculty: FacultyId,
    pub students: Vec<StudentId>,
    pub panel: Option<PanelId>,
    pub specialization: Option<String>,
    pub status: ProjectStatus,
    pub best_project: bool,
}

impl Project {
    pub fn is_unassigned(&self) -> bool {
        self.panel.is_none()
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.name, self.id)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub scope: Scope,
    #[serde(default)]
    pub guide_employee_id: String,
    #[serde(default)]
    pub student_reg_nos: Vec<String>,
    pub specialization: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFilter {
    pub academic_year: Option<String>,
    pub school: Option<String>,
    pub department: Option<String>,
    pub status: Option<ProjectStatus>,
    pub guide_faculty: Option<FacultyId>,
    pub panel: Option<PanelId>,
}
