use super::{FacultyId, ProjectId, Scope};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct PanelId(pub i64);

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Chair,
    Member,
}

impl MemberRole {
    /// The first member of a panel chairs it.
    pub fn for_position(position: usize) -> Self {
        if position == 0 {
            MemberRole::Chair
        } else {
            MemberRole::Member
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelMember {
    pub faculty: FacultyId,
    pub employee_id: String,
    pub name: String,
    pub role: MemberRole,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Panel {
    pub id: PanelId,
    pub panel_name: String,
    pub members: Vec<PanelMember>,
    pub venue: String,
    #[serde(flatten)]
    pub scope: Scope,
    pub specializations: BTreeSet<String>,
    pub max_projects: u32,
    pub assigned_projects_count: u32,
    pub is_active: bool,
}

impl Panel {
    pub fn is_at_capacity(&self) -> bool {
        self.assigned_projects_count >= self.max_projects
    }

    pub fn covers(&self, specialization: &str) -> bool {
        self.specializations.contains(specialization)
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.panel_name, self.id)
    }
}

/// A project placed on a panel.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub project_id: ProjectId,
    pub panel_id: PanelId,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPanel {
    #[serde(default)]
    pub member_employee_ids: Vec<String>,
    #[serde(flatten)]
    pub scope: Scope,
    #[serde(default)]
    pub venue: String,
    #[serde(default)]
    pub specializations: BTreeSet<String>,
    pub panel_name: Option<String>,
    pub max_projects: Option<u32>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelUpdate {
    pub venue: Option<String>,
    pub specializations: Option<BTreeSet<String>>,
    pub max_projects: Option<u32>,
    pub is_active: Option<bool>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelFilter {
    pub academic_year: Option<String>,
    pub school: Option<String>,
    pub department: Option<String>,
    pub specialization: Option<String>,
}
